//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the insights endpoints and the master
//! definition for the OpenAPI specification.

use crate::identity::CurrentUser;
use crate::web::state::AppState;
use axum::{
    extract::{Extension, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use study_insights_core::domain::{
    NarrativeResult, ProductivityReport, StudySession, TimeRange, TopicStat,
};
use study_insights_core::ports::{IdentityProvider, PortError};
use study_insights_core::NarrativeRun;
use tracing::{error, info};
use utoipa::{IntoParams, OpenApi, ToSchema};

const MAX_WINDOW_DAYS: u32 = 366;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        get_report_handler,
        get_summary_handler,
    ),
    components(
        schemas(
            ReportResponse,
            TopicStatResponse,
            StudySessionResponse,
            SummaryResponse,
            SummaryState
        )
    ),
    tags(
        (name = "Study Insights API", description = "Productivity report and weekly AI summary.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct WindowQuery {
    /// Length of the reporting window in days, ending now.
    pub days: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TopicStatResponse {
    pub topic: String,
    pub attempts: u32,
    pub correct: u32,
    pub accuracy: u8,
}

impl From<TopicStat> for TopicStatResponse {
    fn from(stat: TopicStat) -> Self {
        Self {
            topic: stat.topic,
            attempts: stat.attempts,
            correct: stat.correct,
            accuracy: stat.accuracy,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StudySessionResponse {
    pub tool: String,
    pub course_id: Option<String>,
    pub duration_seconds: u64,
    pub started_at: DateTime<Utc>,
}

impl From<StudySession> for StudySessionResponse {
    fn from(session: StudySession) -> Self {
        Self {
            tool: session.tool,
            course_id: session.course_id,
            duration_seconds: session.duration_seconds,
            started_at: session.started_at,
        }
    }
}

/// The productivity report for the requested window.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReportResponse {
    pub range_start: DateTime<Utc>,
    pub range_end: DateTime<Utc>,
    pub total_study_time_seconds: u64,
    pub total_quizzes: u32,
    pub correct_quizzes: u32,
    pub quiz_accuracy: u8,
    pub strengths: Vec<TopicStatResponse>,
    pub weaknesses: Vec<TopicStatResponse>,
    /// False when no topic had enough attempts to be classified.
    pub has_mastery_data: bool,
    pub completed_pomodoros: u32,
    pub sessions: Vec<StudySessionResponse>,
    pub mood_counts: BTreeMap<String, u32>,
    pub study_time_by_tool: BTreeMap<String, u64>,
}

impl ReportResponse {
    fn new(report: ProductivityReport, range: &TimeRange) -> Self {
        let has_mastery_data = report.has_mastery_data();
        Self {
            range_start: range.start,
            range_end: range.end,
            total_study_time_seconds: report.total_study_time_seconds,
            total_quizzes: report.total_quizzes,
            correct_quizzes: report.correct_quizzes,
            quiz_accuracy: report.quiz_accuracy,
            strengths: report.strengths.into_iter().map(Into::into).collect(),
            weaknesses: report.weaknesses.into_iter().map(Into::into).collect(),
            has_mastery_data,
            completed_pomodoros: report.completed_pomodoros,
            sessions: report.sessions.into_iter().map(Into::into).collect(),
            mood_counts: report
                .mood_counts
                .into_iter()
                .map(|(mood, count)| (mood.to_string(), count))
                .collect(),
            study_time_by_tool: report.study_time_by_tool,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SummaryState {
    Idle,
    Loading,
    Ready,
    Failed,
}

/// The weekly narrative. `failed` carries a user-safe fallback message in `text`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SummaryResponse {
    pub state: SummaryState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl From<NarrativeResult> for SummaryResponse {
    fn from(result: NarrativeResult) -> Self {
        match result {
            NarrativeResult::Idle => Self { state: SummaryState::Idle, text: None },
            NarrativeResult::Loading => Self { state: SummaryState::Loading, text: None },
            NarrativeResult::Ready(text) => Self { state: SummaryState::Ready, text: Some(text) },
            NarrativeResult::Failed(text) => Self { state: SummaryState::Failed, text: Some(text) },
        }
    }
}

impl From<&NarrativeResult> for SummaryState {
    fn from(result: &NarrativeResult) -> Self {
        match result {
            NarrativeResult::Idle => SummaryState::Idle,
            NarrativeResult::Loading => SummaryState::Loading,
            NarrativeResult::Ready(_) => SummaryState::Ready,
            NarrativeResult::Failed(_) => SummaryState::Failed,
        }
    }
}

//=========================================================================================
// Helpers
//=========================================================================================

fn window(app_state: &AppState, query: &WindowQuery) -> Result<TimeRange, (StatusCode, String)> {
    let days = query.days.unwrap_or(app_state.config.report_window_days);
    if days == 0 || days > MAX_WINDOW_DAYS {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("days must be between 1 and {}", MAX_WINDOW_DAYS),
        ));
    }
    Ok(TimeRange::last_days(days, Utc::now()))
}

fn load_failure(e: PortError) -> (StatusCode, String) {
    error!("Failed to build productivity report: {:?}", e);
    match e {
        PortError::DataUnavailable(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            "Could not load insights".to_string(),
        ),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Could not load insights".to_string(),
        ),
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Get the productivity report for the signed-in user.
#[utoipa::path(
    get,
    path = "/insights/report",
    params(WindowQuery),
    responses(
        (status = 200, description = "Report computed", body = ReportResponse),
        (status = 400, description = "Invalid window"),
        (status = 401, description = "No signed-in user"),
        (status = 503, description = "Activity data unavailable")
    )
)]
pub async fn get_report_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<WindowQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user = current.current_user().ok_or_else(|| {
        (StatusCode::UNAUTHORIZED, "Sign in to view insights".to_string())
    })?;
    let range = window(&app_state, &query)?;

    let report = app_state
        .insights
        .load_report(user.user_id, &range)
        .await
        .map_err(load_failure)?;

    Ok(Json(ReportResponse::new(report, &range)))
}

/// Get the AI-written weekly summary for the signed-in user.
///
/// Anonymous requests get `idle`. Narrative failures are reported as `failed`
/// with a fallback message, never as an HTTP error.
#[utoipa::path(
    get,
    path = "/insights/summary",
    params(WindowQuery),
    responses(
        (status = 200, description = "Narrative state", body = SummaryResponse),
        (status = 400, description = "Invalid window"),
        (status = 503, description = "Activity data unavailable")
    )
)]
pub async fn get_summary_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<WindowQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let Some(user) = current.current_user() else {
        return Ok(Json(SummaryResponse::from(NarrativeResult::Idle)));
    };
    let range = window(&app_state, &query)?;

    let report = app_state
        .insights
        .load_report(user.user_id, &range)
        .await
        .map_err(load_failure)?;

    // Dropping this handler (client went away) tears the run down.
    let run = NarrativeRun::new();
    let _teardown = run.liveness().drop_guard();

    let result = app_state
        .narrator
        .build_narrative(&run, &current, &report)
        .await;
    info!("Weekly summary for user {} settled as {:?}", user.user_id, SummaryState::from(&result));

    Ok(Json(SummaryResponse::from(result)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::identity::AuthSessionStore;
    use crate::web::router;
    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{header, Request},
    };
    use std::time::Duration;
    use study_insights_core::domain::{Mood, MoodCheckIn, QuizAttempt, User};
    use study_insights_core::ports::{ActivityStore, NarrativeGenerationService, PortResult};
    use study_insights_core::{
        InsightsService, MasteryPolicy, NarrativeOrchestrator, FALLBACK_SUMMARY,
    };
    use tower::ServiceExt;
    use uuid::Uuid;

    struct MemoryStore {
        available: bool,
    }

    #[async_trait]
    impl ActivityStore for MemoryStore {
        async fn get_study_sessions(&self, _: Uuid, range: &TimeRange) -> PortResult<Vec<StudySession>> {
            if !self.available {
                return Err(PortError::DataUnavailable("pool timed out".to_string()));
            }
            Ok(vec![
                StudySession {
                    tool: "flashcards".to_string(),
                    course_id: Some("BIO-110".to_string()),
                    duration_seconds: 600,
                    started_at: range.start,
                },
                StudySession {
                    tool: "reader".to_string(),
                    course_id: None,
                    duration_seconds: 1800,
                    started_at: range.start,
                },
            ])
        }

        async fn get_quiz_attempts(&self, _: Uuid, range: &TimeRange) -> PortResult<Vec<QuizAttempt>> {
            let quiz = |topic: &str, correct: bool| QuizAttempt {
                topic: Some(topic.to_string()),
                correct,
                timestamp: range.start,
            };
            Ok(vec![
                quiz("A", true),
                quiz("A", true),
                quiz("A", true),
                quiz("A", false),
                quiz("B", true),
                quiz("B", false),
            ])
        }

        async fn get_mood_check_ins(&self, _: Uuid, range: &TimeRange) -> PortResult<Vec<MoodCheckIn>> {
            Ok(vec![MoodCheckIn { mood: Mood::Calm, timestamp: range.start }])
        }

        async fn get_completed_pomodoro_count(&self, _: Uuid, _: &TimeRange) -> PortResult<u32> {
            Ok(5)
        }
    }

    struct OneSession {
        user: User,
    }

    #[async_trait]
    impl AuthSessionStore for OneSession {
        async fn resolve_auth_session(&self, session_id: &str) -> PortResult<Option<User>> {
            Ok((session_id == "valid").then(|| self.user.clone()))
        }
    }

    struct FixedNarrative(Option<&'static str>);

    #[async_trait]
    impl NarrativeGenerationService for FixedNarrative {
        async fn generate_summary(&self, _: &str) -> PortResult<String> {
            self.0
                .map(str::to_string)
                .ok_or_else(|| PortError::NarrativeService("upstream 500: quota".to_string()))
        }
    }

    fn config() -> Config {
        Config {
            bind_address: "127.0.0.1:0".parse().unwrap(),
            database_url: "postgres://unused".to_string(),
            log_level: tracing::Level::INFO,
            cors_origin: "http://localhost:3000".to_string(),
            openai_api_key: "test-key".to_string(),
            summary_model: "test-model".to_string(),
            narrative_timeout: Duration::from_secs(1),
            narrative_cache_capacity: 0,
            narrative_cache_ttl: Duration::from_secs(3600),
            report_window_days: 7,
            mastery: MasteryPolicy::default(),
        }
    }

    fn app(store_available: bool, narrative: Option<&'static str>) -> axum::Router {
        let state = Arc::new(AppState {
            config: Arc::new(config()),
            insights: InsightsService::new(
                Arc::new(MemoryStore { available: store_available }),
                MasteryPolicy::default(),
            ),
            narrator: NarrativeOrchestrator::new(
                Arc::new(FixedNarrative(narrative)),
                Duration::from_secs(1),
            ),
            auth_sessions: Arc::new(OneSession { user: User { user_id: Uuid::new_v4() } }),
        });
        router(state)
    }

    async fn get(app: axum::Router, uri: &str, signed_in: bool) -> (StatusCode, Vec<u8>) {
        let mut request = Request::builder().uri(uri);
        if signed_in {
            request = request.header(header::COOKIE, "theme=dark; session=valid");
        }
        let response = app
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body.to_vec())
    }

    #[tokio::test]
    async fn report_requires_a_user() {
        let (status, _) = get(app(true, None), "/insights/report", false).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn report_totals_for_signed_in_user() {
        let (status, body) = get(app(true, None), "/insights/report?days=7", true).await;
        assert_eq!(status, StatusCode::OK);
        let report: ReportResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(report.total_study_time_seconds, 2400);
        assert_eq!(report.total_quizzes, 6);
        assert_eq!(report.correct_quizzes, 4);
        assert_eq!(report.quiz_accuracy, 67);
        assert_eq!(report.strengths[0].topic, "A");
        assert_eq!(report.weaknesses[0].topic, "B");
        assert!(report.has_mastery_data);
        assert_eq!(report.completed_pomodoros, 5);
        assert_eq!(report.mood_counts["calm"], 1);
        assert_eq!(report.study_time_by_tool["reader"], 1800);
    }

    #[tokio::test]
    async fn unknown_session_cookie_is_anonymous() {
        let app = app(true, None);
        let request = Request::builder()
            .uri("/insights/report")
            .header(header::COOKIE, "session=forged")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn invalid_window_is_rejected() {
        let (status, _) = get(app(true, None), "/insights/report?days=0", true).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unavailable_store_is_an_explicit_error() {
        let (status, body) = get(app(false, Some("unused")), "/insights/report", true).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(String::from_utf8(body).unwrap(), "Could not load insights");
    }

    #[test]
    fn summary_state_follows_the_narrative_result() {
        assert_eq!(SummaryState::from(&NarrativeResult::Idle), SummaryState::Idle);
        assert_eq!(SummaryState::from(&NarrativeResult::Loading), SummaryState::Loading);
        let ready = NarrativeResult::Ready("ok".to_string());
        assert_eq!(SummaryState::from(&ready), SummaryResponse::from(ready.clone()).state);
        let failed = NarrativeResult::Failed(FALLBACK_SUMMARY.to_string());
        assert_eq!(SummaryState::from(&failed), SummaryState::Failed);
    }

    #[tokio::test]
    async fn anonymous_summary_is_idle() {
        let (status, body) = get(app(true, Some("unused")), "/insights/summary", false).await;
        assert_eq!(status, StatusCode::OK);
        let summary: SummaryResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(summary.state, SummaryState::Idle);
        assert!(summary.text.is_none());
    }

    #[tokio::test]
    async fn summary_is_ready_with_service_text() {
        let (status, body) = get(app(true, Some("Great job!")), "/insights/summary", true).await;
        assert_eq!(status, StatusCode::OK);
        let summary: SummaryResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(summary.state, SummaryState::Ready);
        assert_eq!(summary.text.as_deref(), Some("Great job!"));
    }

    #[tokio::test]
    async fn summary_failure_is_a_fallback_not_an_error() {
        let (status, body) = get(app(true, None), "/insights/summary", true).await;
        assert_eq!(status, StatusCode::OK);
        let summary: SummaryResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(summary.state, SummaryState::Failed);
        let text = summary.text.unwrap();
        assert_eq!(text, FALLBACK_SUMMARY);
        assert!(!text.contains("quota"));
    }
}
