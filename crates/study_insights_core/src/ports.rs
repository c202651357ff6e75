//! crates/study_insights_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, so the core stays
//! independent of the activity database, the identity layer and the text-generation API.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{MoodCheckIn, QuizAttempt, StudySession, TimeRange, User};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    /// The activity store could not be reached or returned unusable data.
    #[error("Activity data unavailable: {0}")]
    DataUnavailable(String),
    /// The narrative service failed, timed out, or answered with nothing usable.
    #[error("Narrative service error: {0}")]
    NarrativeService(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Read access to a user's raw activity log.
///
/// Implementations report every failure as `PortError::DataUnavailable`.
#[async_trait]
pub trait ActivityStore: Send + Sync {
    async fn get_study_sessions(
        &self,
        user_id: Uuid,
        range: &TimeRange,
    ) -> PortResult<Vec<StudySession>>;

    async fn get_quiz_attempts(
        &self,
        user_id: Uuid,
        range: &TimeRange,
    ) -> PortResult<Vec<QuizAttempt>>;

    async fn get_mood_check_ins(
        &self,
        user_id: Uuid,
        range: &TimeRange,
    ) -> PortResult<Vec<MoodCheckIn>>;

    async fn get_completed_pomodoro_count(
        &self,
        user_id: Uuid,
        range: &TimeRange,
    ) -> PortResult<u32>;
}

/// Supplies the currently signed-in user. `None` is a normal state.
pub trait IdentityProvider: Send + Sync {
    fn current_user(&self) -> Option<User>;
}

impl IdentityProvider for Option<User> {
    fn current_user(&self) -> Option<User> {
        self.clone()
    }
}

#[async_trait]
pub trait NarrativeGenerationService: Send + Sync {
    /// Turns the serialized report payload into a short prose summary.
    async fn generate_summary(&self, payload_text: &str) -> PortResult<String>;
}
