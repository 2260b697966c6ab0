//! Runs against a live Postgres when `ORGGATE_TEST_DATABASE_URL` is set and
//! is skipped otherwise. Every test uses fresh names, so the database can be
//! reused between runs.

use std::sync::Arc;

use chrono::Duration;
use uuid::Uuid;

use orggate_auth::{PasswordConfig, PasswordHasher, Role, TenantContext, ContextSource};
use orggate_core::OrgId;
use orggate_infra::services::{InviteError, InviteMail, InviteService};
use orggate_infra::store::{MembershipStore, NewOrganization, NewUser, OrganizationStore, UserDirectory};
use orggate_infra::{Database, PgDatabase, PostgresSessionStore, RecordingOutbox, SessionStore, StoreError};

async fn database() -> Option<Arc<Database>> {
    let Ok(url) = std::env::var("ORGGATE_TEST_DATABASE_URL") else {
        eprintln!("ORGGATE_TEST_DATABASE_URL not set; skipping");
        return None;
    };
    let pg = PgDatabase::connect(&url, 8).await.expect("connect to test database");
    Some(Arc::new(Database::Postgres(pg)))
}

fn unique(prefix: &str) -> String {
    format!("{prefix}_{}", Uuid::now_v7().simple())
}

fn seed_org(db: &Database) -> (orggate_core::UserId, OrgId) {
    let name = unique("owner");
    db.transaction(|tx| {
        let owner = tx.create_user(NewUser::new(&name, &format!("{name}@example.com"), "h"))?;
        let org = tx.create_organization(
            NewOrganization {
                name: "Org".to_string(),
                country: "US".to_string(),
                base_currency: "USD".to_string(),
                timezone: "UTC".to_string(),
            },
            owner.id,
        )?;
        tx.assign(owner.id, &org.id, Role::OrgAdmin)?;
        Ok::<_, StoreError>((owner.id, org.id))
    })
    .unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_assigns_leave_one_row() {
    let Some(db) = database().await else { return };
    let (_, org) = seed_org(&db);
    let name = unique("member");
    let user = db
        .transaction(|tx| tx.create_user(NewUser::new(&name, &format!("{name}@example.com"), "h")))
        .unwrap()
        .id;

    let tasks: Vec<_> = Role::ALL
        .into_iter()
        .cycle()
        .take(16)
        .map(|role| {
            let db = Arc::clone(&db);
            let org = org.clone();
            tokio::task::spawn_blocking(move || db.transaction(|tx| tx.assign(user, &org, role)))
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let rows = db.read(|tx| tx.list_for_org(&org)).unwrap();
    assert_eq!(rows.iter().filter(|m| m.user_id == user).count(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn unique_indexes_surface_as_conflicts_and_roll_back() {
    let Some(db) = database().await else { return };
    let name = unique("dup");
    db.transaction(|tx| tx.create_user(NewUser::new(&name, &format!("{name}@example.com"), "h")))
        .unwrap();

    let again = db.transaction(|tx| {
        tx.create_user(NewUser::new(&name.to_uppercase(), "other@example.com", "h"))
    });
    assert_eq!(again.unwrap_err(), StoreError::Conflict("username".to_string()));

    let other = unique("rolled");
    let aborted: Result<(), StoreError> = db.transaction(|tx| {
        tx.create_user(NewUser::new(&other, &format!("{other}@example.com"), "h"))?;
        Err(StoreError::Injected("abort"))
    });
    assert!(aborted.is_err());
    assert!(db.read(|tx| tx.find_by_username(&other)).unwrap().is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn invite_acceptance_races_have_one_winner() {
    let Some(db) = database().await else { return };
    let (owner, org) = seed_org(&db);
    let outbox = Arc::new(RecordingOutbox::new());
    let invites = Arc::new(InviteService::new(
        db.clone(),
        outbox.clone(),
        PasswordHasher::new(PasswordConfig::fast()),
        InviteMail::default(),
    ));
    let ctx = TenantContext::new(owner, org.clone(), Role::OrgAdmin, ContextSource::Token);
    let email = format!("{}@example.com", unique("invitee"));
    invites.invite(&ctx, &email, Role::Finance).unwrap();
    assert_eq!(
        invites.invite(&ctx, &email, Role::Viewer),
        Err(InviteError::DuplicateInvite)
    );
    let body = outbox.sent().last().unwrap().body.clone();
    let token = body.rsplit(' ').next().unwrap().to_string();

    let tasks: Vec<_> = (0..4)
        .map(|_| {
            let invites = Arc::clone(&invites);
            let token = token.clone();
            tokio::task::spawn_blocking(move || invites.accept(&token, "password-123"))
        })
        .collect();
    let mut winners = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => winners += 1,
            Err(InviteError::AlreadyAccepted) => {}
            Err(other) => panic!("unexpected acceptance error: {other}"),
        }
    }

    assert_eq!(winners, 1);
    let members = db.read(|tx| tx.list_for_org(&org)).unwrap();
    assert_eq!(members.len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn admin_count_and_sessions_round_trip() {
    let Some(db) = database().await else { return };
    let (owner, org) = seed_org(&db);
    assert_eq!(db.read(|tx| tx.count_active_admins(&org)).unwrap(), 1);
    db.transaction(|tx| tx.set_active(owner, false)).unwrap();
    assert_eq!(db.read(|tx| tx.count_active_admins(&org)).unwrap(), 0);

    let Database::Postgres(pg) = db.as_ref() else {
        unreachable!()
    };
    let live = PostgresSessionStore::new(pg, Duration::hours(1));
    let session = live.create(owner, Some(org.clone())).unwrap();
    assert_eq!(live.get(&session.id).unwrap().and_then(|s| s.org_id), Some(org));
    assert!(live.destroy(&session.id).unwrap());
    assert!(live.get(&session.id).unwrap().is_none());

    let expired = PostgresSessionStore::new(pg, Duration::zero());
    let stale = expired.create(owner, None).unwrap();
    assert!(expired.get(&stale.id).unwrap().is_none());
}
