use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use axum::body::Bytes;
use axum::http::StatusCode;
use orggate_auth::Role;
use orggate_core::{OrgId, UserId};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub role: Option<String>,
    pub org_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: String,
    pub org_id: Option<String>,
}

impl LoginRequest {
    /// Username wins when both are sent.
    pub fn login_name(&self) -> Option<&str> {
        [self.username.as_deref(), self.email.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|s| !s.is_empty())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RefreshTokenRequest {
    #[serde(alias = "refresh")]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreatorCredentials {
    pub username_or_email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrganizationRequest {
    pub name: String,
    pub country: String,
    pub base_currency: Option<String>,
    pub timezone: Option<String>,
    pub creator: Option<CreatorCredentials>,
}

#[derive(Debug, Deserialize)]
pub struct CreateInviteRequest {
    pub email: String,
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct AcceptInviteRequest {
    pub token: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangeRoleRequest {
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateVendorRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct UploadInvoiceRequest {
    pub invoice_id: String,
    pub amount: i64,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct DetailResponse {
    pub detail: &'static str,
}

#[derive(Debug, Serialize)]
pub struct VendorResponse {
    pub vendor_id: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct InvoiceSummary {
    pub invoice_id: String,
    pub amount: i64,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct InvoiceListResponse {
    pub invoices: Vec<InvoiceSummary>,
}

#[derive(Debug, Serialize)]
pub struct InvoiceStatusResponse {
    pub invoice_id: String,
    pub status: &'static str,
}

// -------------------------
// Parsing helpers
// -------------------------

pub fn parse_role(raw: &str) -> Result<Role, axum::response::Response> {
    raw.parse::<Role>()
        .map_err(|e| errors::json_error(StatusCode::BAD_REQUEST, "invalid_role", e.to_string()))
}

pub fn parse_org_id(raw: &str) -> Result<OrgId, axum::response::Response> {
    raw.trim()
        .parse::<OrgId>()
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_org_id", "invalid org_id"))
}

pub fn parse_user_id(raw: &str) -> Result<UserId, axum::response::Response> {
    raw.parse::<UserId>()
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid user id"))
}

/// Decode a JSON body. Gated handlers call this after the role check so a
/// caller without the role never learns anything about the body's shape.
pub fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, axum::response::Response> {
    serde_json::from_slice(body)
        .map_err(|e| errors::json_error(StatusCode::BAD_REQUEST, "invalid_body", e.to_string()))
}
