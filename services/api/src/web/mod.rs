pub mod middleware;
pub mod rest;
pub mod state;

pub use middleware::resolve_identity;
pub use rest::{get_report_handler, get_summary_handler};

use axum::{middleware as axum_middleware, routing::get, Router};
use std::sync::Arc;

use crate::web::state::AppState;

/// Builds the insights routes with identity resolution applied to all of them.
pub fn router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/insights/report", get(get_report_handler))
        .route("/insights/summary", get(get_summary_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            resolve_identity,
        ))
        .with_state(app_state)
}
