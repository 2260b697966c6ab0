use chrono::Utc;

use orggate_auth::{User, UserStatus, normalize_email};
use orggate_core::UserId;

use crate::db::{StoreError, Tx};

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
}

impl NewUser {
    pub fn new(username: &str, email: &str, password_hash: &str) -> Self {
        Self {
            username: username.trim().to_string(),
            email: normalize_email(email),
            password_hash: password_hash.to_string(),
            first_name: String::new(),
            last_name: String::new(),
        }
    }
}

/// User accounts. Usernames and emails are unique case-insensitively.
pub trait UserDirectory {
    fn create_user(&mut self, new: NewUser) -> Result<User, StoreError>;

    fn user(&self, id: UserId) -> Result<Option<User>, StoreError>;

    fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    /// Email when the input contains `@`, username otherwise.
    fn find_by_login(&self, username_or_email: &str) -> Result<Option<User>, StoreError> {
        let key = username_or_email.trim();
        if key.contains('@') {
            self.find_by_email(key)
        } else {
            self.find_by_username(key)
        }
    }

    fn set_password(&mut self, id: UserId, password_hash: String) -> Result<(), StoreError>;

    fn set_active(&mut self, id: UserId, active: bool) -> Result<(), StoreError>;
}

impl UserDirectory for Tx<'_> {
    fn create_user(&mut self, new: NewUser) -> Result<User, StoreError> {
        if self.find_by_username(&new.username)?.is_some() {
            return Err(StoreError::Conflict("username".to_string()));
        }
        if self.find_by_email(&new.email)?.is_some() {
            return Err(StoreError::Conflict("email".to_string()));
        }
        let user = User {
            id: UserId::new(),
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
            first_name: new.first_name,
            last_name: new.last_name,
            status: UserStatus::Active,
            date_joined: Utc::now(),
        };
        self.tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    fn user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.tables.users.get(&id).cloned())
    }

    fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let email = normalize_email(email);
        Ok(self
            .tables
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .tables
            .users
            .values()
            .find(|u| u.username.eq_ignore_ascii_case(username.trim()))
            .cloned())
    }

    fn set_password(&mut self, id: UserId, password_hash: String) -> Result<(), StoreError> {
        let user = self
            .tables
            .users
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("user {id}")))?;
        user.password_hash = password_hash;
        Ok(())
    }

    fn set_active(&mut self, id: UserId, active: bool) -> Result<(), StoreError> {
        let user = self
            .tables
            .users
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("user {id}")))?;
        user.status = if active { UserStatus::Active } else { UserStatus::Inactive };
        Ok(())
    }
}
