pub mod domain;
pub mod insights;
pub mod mastery;
pub mod narrative;
pub mod ports;
pub mod report;

pub use domain::{
    Mood, MoodCheckIn, NarrativeResult, ProductivityReport, QuizAttempt, StudySession,
    TimeRange, TopicStat, User,
};
pub use insights::InsightsService;
pub use mastery::{aggregate_topics, classify_mastery, Mastery, MasteryPolicy, PolicyError};
pub use narrative::{
    NarrativeCache, NarrativeOrchestrator, NarrativePayload, NarrativeRun, FALLBACK_SUMMARY,
};
pub use ports::{
    ActivityStore, IdentityProvider, NarrativeGenerationService, PortError, PortResult,
};
pub use report::build_report;
