//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `ActivityStore` port from the `core` crate. It also resolves browser auth
//! sessions for the identity middleware. All access goes through `sqlx` on PostgreSQL.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use study_insights_core::domain::{
    Mood, MoodCheckIn, QuizAttempt, StudySession, TimeRange, User,
};
use study_insights_core::ports::{ActivityStore, PortError, PortResult};
use uuid::Uuid;

use crate::identity::AuthSessionStore;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `ActivityStore` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

fn unavailable(e: sqlx::Error) -> PortError {
    PortError::DataUnavailable(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct StudySessionRecord {
    tool: String,
    course_id: Option<String>,
    duration_seconds: i64,
    started_at: DateTime<Utc>,
}
impl StudySessionRecord {
    fn to_domain(self) -> PortResult<StudySession> {
        let duration_seconds = u64::try_from(self.duration_seconds).map_err(|_| {
            PortError::DataUnavailable(format!(
                "negative study duration {} recorded",
                self.duration_seconds
            ))
        })?;
        Ok(StudySession {
            tool: self.tool,
            course_id: self.course_id,
            duration_seconds,
            started_at: self.started_at,
        })
    }
}

#[derive(FromRow)]
struct QuizAttemptRecord {
    topic: Option<String>,
    correct: bool,
    attempted_at: DateTime<Utc>,
}
impl QuizAttemptRecord {
    fn to_domain(self) -> QuizAttempt {
        QuizAttempt {
            topic: self.topic,
            correct: self.correct,
            timestamp: self.attempted_at,
        }
    }
}

#[derive(FromRow)]
struct MoodCheckInRecord {
    mood: String,
    checked_in_at: DateTime<Utc>,
}
impl MoodCheckInRecord {
    fn to_domain(self) -> PortResult<MoodCheckIn> {
        let mood = self
            .mood
            .parse::<Mood>()
            .map_err(|e| PortError::DataUnavailable(e.to_string()))?;
        Ok(MoodCheckIn {
            mood,
            timestamp: self.checked_in_at,
        })
    }
}

//=========================================================================================
// `ActivityStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl ActivityStore for DbAdapter {
    async fn get_study_sessions(
        &self,
        user_id: Uuid,
        range: &TimeRange,
    ) -> PortResult<Vec<StudySession>> {
        let records = sqlx::query_as::<_, StudySessionRecord>(
            "SELECT tool, course_id, duration_seconds, started_at FROM study_sessions \
             WHERE user_id = $1 AND started_at >= $2 AND started_at < $3 \
             ORDER BY started_at ASC",
        )
        .bind(user_id)
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.pool)
        .await
        .map_err(unavailable)?;

        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn get_quiz_attempts(
        &self,
        user_id: Uuid,
        range: &TimeRange,
    ) -> PortResult<Vec<QuizAttempt>> {
        let records = sqlx::query_as::<_, QuizAttemptRecord>(
            "SELECT topic, correct, attempted_at FROM quiz_attempts \
             WHERE user_id = $1 AND attempted_at >= $2 AND attempted_at < $3 \
             ORDER BY attempted_at ASC",
        )
        .bind(user_id)
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.pool)
        .await
        .map_err(unavailable)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_mood_check_ins(
        &self,
        user_id: Uuid,
        range: &TimeRange,
    ) -> PortResult<Vec<MoodCheckIn>> {
        let records = sqlx::query_as::<_, MoodCheckInRecord>(
            "SELECT mood, checked_in_at FROM mood_check_ins \
             WHERE user_id = $1 AND checked_in_at >= $2 AND checked_in_at < $3 \
             ORDER BY checked_in_at ASC",
        )
        .bind(user_id)
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.pool)
        .await
        .map_err(unavailable)?;

        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn get_completed_pomodoro_count(
        &self,
        user_id: Uuid,
        range: &TimeRange,
    ) -> PortResult<u32> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM pomodoro_completions \
             WHERE user_id = $1 AND completed_at >= $2 AND completed_at < $3",
        )
        .bind(user_id)
        .bind(range.start)
        .bind(range.end)
        .fetch_one(&self.pool)
        .await
        .map_err(unavailable)?;

        u32::try_from(count)
            .map_err(|_| PortError::DataUnavailable(format!("pomodoro count {} out of range", count)))
    }
}

//=========================================================================================
// Auth Session Lookup
//=========================================================================================

#[async_trait]
impl AuthSessionStore for DbAdapter {
    async fn resolve_auth_session(&self, session_id: &str) -> PortResult<Option<User>> {
        let user_id = sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > NOW()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(user_id.map(|user_id| User { user_id }))
    }
}
