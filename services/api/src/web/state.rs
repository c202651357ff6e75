//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use crate::identity::AuthSessionStore;
use std::sync::Arc;
use study_insights_core::{InsightsService, NarrativeOrchestrator};

/// The shared application state, created once at startup and passed to all handlers.
///
/// Holds no per-user data: every report and narrative run lives only as long as
/// the request that produced it.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub insights: InsightsService,
    pub narrator: NarrativeOrchestrator,
    pub auth_sessions: Arc<dyn AuthSessionStore>,
}
