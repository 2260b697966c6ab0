//! Internal (staff-facing) vendor and invoice endpoints. Business data lives
//! elsewhere; these handlers gate, log and echo identifiers.

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Extension, Path},
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use tracing::info;

use orggate_auth::{PathClass, Role, RoleRequirement, TenantContext};

use crate::app::{dto, errors};
use crate::authz;

const CREATE_VENDORS: RoleRequirement =
    RoleRequirement::new("create vendors", &[Role::OrgAdmin, Role::Finance]);
const LIST_INVOICES: RoleRequirement = RoleRequirement::new(
    "list invoices",
    &[Role::OrgAdmin, Role::Finance, Role::Approver, Role::Viewer],
);
const APPROVE_INVOICES: RoleRequirement = RoleRequirement::new("approve invoices", &[Role::Approver]);

pub fn router() -> Router {
    Router::new()
        .route("/vendors", post(create_vendor))
        .route("/invoices", get(list_invoices))
        .route("/invoices/:id/approve", post(approve_invoice))
}

pub async fn create_vendor(
    Extension(ctx): Extension<TenantContext>,
    Extension(class): Extension<PathClass>,
    method: Method,
    body: Bytes,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&ctx, &CREATE_VENDORS, &method, class) {
        return resp;
    }
    let body: dto::CreateVendorRequest = match dto::parse_body(&body) {
        Ok(body) => body,
        Err(resp) => return resp,
    };
    let name = body.name.trim();
    if name.is_empty() || name.chars().count() > 200 {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "name must be between 1 and 200 characters.",
        );
    }

    let simple = uuid::Uuid::now_v7().simple().to_string();
    let vendor_id = format!("ven_{}", &simple[simple.len() - 10..]);
    info!(org_id = %ctx.org_id(), vendor_id = %vendor_id, "vendor created");
    (
        StatusCode::CREATED,
        Json(dto::VendorResponse {
            vendor_id,
            name: name.to_string(),
        }),
    )
        .into_response()
}

pub async fn list_invoices(
    Extension(ctx): Extension<TenantContext>,
    Extension(class): Extension<PathClass>,
    method: Method,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&ctx, &LIST_INVOICES, &method, class) {
        return resp;
    }
    Json(dto::InvoiceListResponse { invoices: Vec::new() }).into_response()
}

pub async fn approve_invoice(
    Extension(ctx): Extension<TenantContext>,
    Extension(class): Extension<PathClass>,
    method: Method,
    Path(invoice_id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&ctx, &APPROVE_INVOICES, &method, class) {
        return resp;
    }
    info!(org_id = %ctx.org_id(), invoice_id = %invoice_id, "invoice approved");
    Json(dto::InvoiceStatusResponse {
        invoice_id,
        status: "approved",
    })
    .into_response()
}
