//! crates/study_insights_core/src/report.rs
//!
//! Builds the immutable `ProductivityReport` from raw activity records.

use std::collections::BTreeMap;

use crate::domain::{percentage, MoodCheckIn, ProductivityReport, QuizAttempt, StudySession};
use crate::mastery::{aggregate_topics, classify_mastery, MasteryPolicy};

/// Aggregates one snapshot of raw records into a report.
///
/// Quiz totals are summed over the same topic grouping that feeds the mastery
/// lists, so unattributed attempts count toward neither.
pub fn build_report(
    sessions: Vec<StudySession>,
    attempts: &[QuizAttempt],
    moods: &[MoodCheckIn],
    completed_pomodoros: u32,
    policy: &MasteryPolicy,
) -> ProductivityReport {
    let topics = aggregate_topics(attempts);
    let mastery = classify_mastery(&topics, policy);

    let (total_quizzes, correct_quizzes) = topics
        .values()
        .fold((0u32, 0u32), |(total, correct), stat| {
            (total + stat.attempts, correct + stat.correct)
        });

    let mut total_study_time_seconds = 0u64;
    let mut study_time_by_tool: BTreeMap<String, u64> = BTreeMap::new();
    for session in &sessions {
        total_study_time_seconds = total_study_time_seconds.saturating_add(session.duration_seconds);
        let slot = study_time_by_tool.entry(session.tool.clone()).or_insert(0);
        *slot = slot.saturating_add(session.duration_seconds);
    }

    let mut mood_counts = BTreeMap::new();
    for check_in in moods {
        *mood_counts.entry(check_in.mood).or_insert(0u32) += 1;
    }

    ProductivityReport {
        total_study_time_seconds,
        total_quizzes,
        correct_quizzes,
        quiz_accuracy: percentage(correct_quizzes, total_quizzes),
        strengths: mastery.strengths,
        weaknesses: mastery.weaknesses,
        completed_pomodoros,
        sessions,
        mood_counts,
        study_time_by_tool,
    }
}
