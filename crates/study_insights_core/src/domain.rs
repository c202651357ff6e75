//! crates/study_insights_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! Raw activity records are read-only inputs; everything derived from them
//! (topic stats, reports, narrative results) is recomputed on demand.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

//=========================================================================================
// Identity and Time Window
//=========================================================================================

/// The authenticated user a report is computed for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub user_id: Uuid,
}

/// A half-open time window `[start, end)` used to query the activity store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// The `days`-long window ending at `now`.
    pub fn last_days(days: u32, now: DateTime<Utc>) -> Self {
        Self {
            start: now - Duration::days(i64::from(days)),
            end: now,
        }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant < self.end
    }
}

//=========================================================================================
// Raw Activity Records
//=========================================================================================

/// One logged block of study time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudySession {
    pub tool: String,
    pub course_id: Option<String>,
    pub duration_seconds: u64,
    pub started_at: DateTime<Utc>,
}

/// A single answered quiz question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizAttempt {
    /// `None` or an empty string means the attempt is unattributed.
    pub topic: Option<String>,
    pub correct: bool,
    pub timestamp: DateTime<Utc>,
}

impl QuizAttempt {
    /// The attempt's topic, if it has a usable one.
    pub fn topic_label(&self) -> Option<&str> {
        self.topic.as_deref().filter(|t| !t.is_empty())
    }
}

/// The fixed set of moods a check-in can record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    Happy,
    Calm,
    Neutral,
    Thoughtful,
    Tired,
    Stressed,
}

impl Mood {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Happy => "happy",
            Mood::Calm => "calm",
            Mood::Neutral => "neutral",
            Mood::Thoughtful => "thoughtful",
            Mood::Tired => "tired",
            Mood::Stressed => "stressed",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized mood label '{0}'")]
pub struct UnknownMood(pub String);

impl FromStr for Mood {
    type Err = UnknownMood;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "happy" => Ok(Mood::Happy),
            "calm" => Ok(Mood::Calm),
            "neutral" => Ok(Mood::Neutral),
            "thoughtful" => Ok(Mood::Thoughtful),
            "tired" => Ok(Mood::Tired),
            "stressed" => Ok(Mood::Stressed),
            _ => Err(UnknownMood(s.to_string())),
        }
    }
}

/// A mood check-in recorded by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoodCheckIn {
    pub mood: Mood,
    pub timestamp: DateTime<Utc>,
}

//=========================================================================================
// Derived Values
//=========================================================================================

/// Aggregated quiz performance for one topic.
///
/// Only ever built with `attempts >= 1`, so `accuracy` is always defined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicStat {
    pub topic: String,
    pub attempts: u32,
    pub correct: u32,
    pub accuracy: u8,
}

/// Integer percentage `round(100 * part / whole)`, rounding halves up.
/// Returns 0 when `whole` is 0.
pub fn percentage(part: u32, whole: u32) -> u8 {
    if whole == 0 {
        return 0;
    }
    let part = u64::from(part.min(whole));
    let whole = u64::from(whole);
    // Bounded by 100 because part <= whole.
    ((200 * part + whole) / (2 * whole)) as u8
}

/// The structured productivity report for one user and time window.
///
/// Recomputed for every request; never patched in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductivityReport {
    pub total_study_time_seconds: u64,
    pub total_quizzes: u32,
    pub correct_quizzes: u32,
    pub quiz_accuracy: u8,
    pub strengths: Vec<TopicStat>,
    pub weaknesses: Vec<TopicStat>,
    pub completed_pomodoros: u32,
    pub sessions: Vec<StudySession>,
    /// Check-in counts per mood, for the mood chart.
    pub mood_counts: BTreeMap<Mood, u32>,
    /// Seconds studied per tool, for the time-spent chart.
    pub study_time_by_tool: BTreeMap<String, u64>,
}

impl ProductivityReport {
    /// True when no topic cleared the mastery policy; presentation shows an
    /// explicit "not enough data" state.
    pub fn has_mastery_data(&self) -> bool {
        !self.strengths.is_empty() || !self.weaknesses.is_empty()
    }
}

/// The observable state of one narrative orchestration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NarrativeResult {
    /// No request has been issued (e.g. no signed-in user yet).
    Idle,
    Loading,
    Ready(String),
    Failed(String),
}

impl NarrativeResult {
    pub fn is_terminal(&self) -> bool {
        matches!(self, NarrativeResult::Ready(_) | NarrativeResult::Failed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn percentage_rounds_half_up() {
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(1, 2), 50);
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(1, 8), 13);
        assert_eq!(percentage(0, 5), 0);
        assert_eq!(percentage(5, 5), 100);
        assert_eq!(percentage(0, 0), 0);
    }

    #[test]
    fn topic_label_ignores_missing_and_empty() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let mut attempt = QuizAttempt { topic: None, correct: true, timestamp: ts };
        assert_eq!(attempt.topic_label(), None);
        attempt.topic = Some(String::new());
        assert_eq!(attempt.topic_label(), None);
        attempt.topic = Some("Math".to_string());
        assert_eq!(attempt.topic_label(), Some("Math"));
    }

    #[test]
    fn mood_labels_parse_case_insensitively() {
        assert_eq!("Happy".parse::<Mood>(), Ok(Mood::Happy));
        assert_eq!(" stressed ".parse::<Mood>(), Ok(Mood::Stressed));
        assert!("ecstatic".parse::<Mood>().is_err());
        assert_eq!(Mood::Thoughtful.to_string(), "thoughtful");
    }

    #[test]
    fn last_days_window_is_half_open() {
        let now = Utc.with_ymd_and_hms(2024, 3, 8, 0, 0, 0).unwrap();
        let range = TimeRange::last_days(7, now);
        assert_eq!(range.start, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
        assert!(range.contains(range.start));
        assert!(!range.contains(now));
    }
}
