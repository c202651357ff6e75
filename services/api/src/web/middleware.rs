//! services/api/src/web/middleware.rs
//!
//! Identity middleware shared by every insights route.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::error;

use crate::identity::{session_cookie, CurrentUser};
use crate::web::state::AppState;

/// Resolves the auth session cookie into a `CurrentUser` request extension.
///
/// Never rejects: a missing, unknown or unverifiable session yields an anonymous
/// request and each handler decides what anonymity means for it.
pub async fn resolve_identity(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let auth_session_id = req
        .headers()
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(session_cookie)
        .map(str::to_owned);

    let user = match auth_session_id {
        Some(id) => state
            .auth_sessions
            .resolve_auth_session(&id)
            .await
            .unwrap_or_else(|e| {
                error!("Failed to validate auth session: {:?}", e);
                None
            }),
        None => None,
    };

    req.extensions_mut().insert(CurrentUser(user));
    next.run(req).await
}
