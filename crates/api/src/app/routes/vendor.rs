use axum::{
    Json, Router,
    body::Bytes,
    extract::Extension,
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::post,
};
use tracing::info;

use orggate_auth::{PathClass, Role, RoleRequirement, TenantContext};

use crate::app::{dto, errors};
use crate::authz;

const UPLOAD_INVOICES: RoleRequirement = RoleRequirement::new("upload invoices", &[Role::Vendor]);

pub fn router() -> Router {
    Router::new().route("/invoices/upload", post(upload_invoice))
}

pub async fn upload_invoice(
    Extension(ctx): Extension<TenantContext>,
    Extension(class): Extension<PathClass>,
    method: Method,
    body: Bytes,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&ctx, &UPLOAD_INVOICES, &method, class) {
        return resp;
    }
    let body: dto::UploadInvoiceRequest = match dto::parse_body(&body) {
        Ok(body) => body,
        Err(resp) => return resp,
    };
    if body.amount < 0 || body.invoice_id.trim().is_empty() {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "invoice_id is required and amount must be non-negative.",
        );
    }

    info!(org_id = %ctx.org_id(), invoice_id = %body.invoice_id, amount = body.amount, "invoice uploaded");
    (
        StatusCode::CREATED,
        Json(dto::InvoiceStatusResponse {
            invoice_id: body.invoice_id,
            status: "uploaded",
        }),
    )
        .into_response()
}
