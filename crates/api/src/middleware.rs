use std::sync::Arc;

use axum::{extract::State, middleware::Next, response::Response};
use tracing::{debug, warn};

use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::extract_credentials;

/// Bind the request to a tenant context before any handler runs.
///
/// Enforced paths get a `TenantContext` (plus its `Identity`) or are rejected
/// here. Exempt paths only get a best-effort `Identity` and are never failed
/// by this layer. Every request gets its `PathClass`.
pub async fn tenant_context(
    State(services): State<Arc<AppServices>>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let path = req.uri().path().to_owned();
    let paths = &services.config.paths;
    req.extensions_mut().insert(paths.classify(&path));

    let creds = extract_credentials(req.headers(), &services.config);

    if !paths.should_enforce(&path) {
        let identity = creds
            .ok()
            .and_then(|c| services.resolver.resolve_identity(&c).ok().flatten());
        if let Some(identity) = identity {
            debug!(user_id = %identity.user_id, path = %path, "identity attached on exempt path");
            req.extensions_mut().insert(identity);
        }
        return next.run(req).await;
    }

    let creds = match creds {
        Ok(creds) => creds,
        Err(reason) => {
            warn!(path = %path, reason = reason.as_str(), "tenant context rejected");
            return errors::unauthenticated(reason);
        }
    };

    let ctx = match services.resolver.resolve(&creds) {
        Ok(ctx) => ctx,
        Err(err) => return errors::context_error(err),
    };

    req.extensions_mut().insert(ctx.identity());
    req.extensions_mut().insert(ctx);
    next.run(req).await
}
