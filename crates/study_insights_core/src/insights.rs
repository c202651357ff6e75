//! crates/study_insights_core/src/insights.rs
//!
//! The report-loading use case: read one snapshot of a user's activity and
//! aggregate it. Either a complete report is returned or the whole call fails.

use std::sync::Arc;

use tracing::{error, info};
use uuid::Uuid;

use crate::domain::{ProductivityReport, TimeRange};
use crate::mastery::MasteryPolicy;
use crate::ports::{ActivityStore, PortError, PortResult};
use crate::report::build_report;

#[derive(Clone)]
pub struct InsightsService {
    store: Arc<dyn ActivityStore>,
    policy: MasteryPolicy,
}

impl InsightsService {
    pub fn new(store: Arc<dyn ActivityStore>, policy: MasteryPolicy) -> Self {
        Self { store, policy }
    }

    /// Loads the raw records for `user_id` within `range` and builds the report.
    ///
    /// Any store failure surfaces as `PortError::DataUnavailable`.
    pub async fn load_report(
        &self,
        user_id: Uuid,
        range: &TimeRange,
    ) -> PortResult<ProductivityReport> {
        let fetched = futures::try_join!(
            self.store.get_study_sessions(user_id, range),
            self.store.get_quiz_attempts(user_id, range),
            self.store.get_mood_check_ins(user_id, range),
            self.store.get_completed_pomodoro_count(user_id, range),
        );

        let (sessions, attempts, moods, pomodoros) = fetched.map_err(|e| {
            error!("Failed to load activity for user {}: {:?}", user_id, e);
            match e {
                PortError::DataUnavailable(msg) => PortError::DataUnavailable(msg),
                other => PortError::DataUnavailable(other.to_string()),
            }
        })?;

        info!(
            "Building report for user {} from {} sessions, {} quiz attempts, {} check-ins",
            user_id,
            sessions.len(),
            attempts.len(),
            moods.len()
        );
        Ok(build_report(sessions, &attempts, &moods, pomodoros, &self.policy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MoodCheckIn, QuizAttempt, StudySession};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};

    struct FixedStore {
        fail_quizzes: bool,
    }

    #[async_trait]
    impl ActivityStore for FixedStore {
        async fn get_study_sessions(&self, _: Uuid, range: &TimeRange) -> PortResult<Vec<StudySession>> {
            Ok(vec![StudySession {
                tool: "pomodoro".to_string(),
                course_id: Some("CS101".to_string()),
                duration_seconds: 1500,
                started_at: range.start,
            }])
        }

        async fn get_quiz_attempts(&self, _: Uuid, range: &TimeRange) -> PortResult<Vec<QuizAttempt>> {
            if self.fail_quizzes {
                return Err(PortError::DataUnavailable("connection refused".to_string()));
            }
            Ok(vec![
                QuizAttempt { topic: Some("Math".to_string()), correct: true, timestamp: range.start },
                QuizAttempt { topic: Some("Math".to_string()), correct: true, timestamp: range.start },
            ])
        }

        async fn get_mood_check_ins(&self, _: Uuid, _: &TimeRange) -> PortResult<Vec<MoodCheckIn>> {
            Ok(Vec::new())
        }

        async fn get_completed_pomodoro_count(&self, _: Uuid, _: &TimeRange) -> PortResult<u32> {
            Ok(3)
        }
    }

    fn week() -> TimeRange {
        TimeRange::last_days(7, Utc.with_ymd_and_hms(2024, 3, 8, 0, 0, 0).unwrap())
    }

    #[tokio::test]
    async fn loads_a_complete_report() {
        let service = InsightsService::new(
            Arc::new(FixedStore { fail_quizzes: false }),
            MasteryPolicy::default(),
        );
        let report = service.load_report(Uuid::new_v4(), &week()).await.unwrap();
        assert_eq!(report.total_study_time_seconds, 1500);
        assert_eq!(report.quiz_accuracy, 100);
        assert_eq!(report.completed_pomodoros, 3);
        assert_eq!(report.strengths[0].topic, "Math");
    }

    #[tokio::test]
    async fn store_failure_means_no_report() {
        let service = InsightsService::new(
            Arc::new(FixedStore { fail_quizzes: true }),
            MasteryPolicy::default(),
        );
        let result = service.load_report(Uuid::new_v4(), &week()).await;
        assert!(matches!(result, Err(PortError::DataUnavailable(_))));
    }

    #[tokio::test]
    async fn repeated_loads_are_identical() {
        let service = InsightsService::new(
            Arc::new(FixedStore { fail_quizzes: false }),
            MasteryPolicy::default(),
        );
        let user = Uuid::new_v4();
        let first = service.load_report(user, &week()).await.unwrap();
        let second = service.load_report(user, &week()).await.unwrap();
        assert_eq!(first, second);
    }
}
