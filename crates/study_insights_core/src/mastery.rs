//! crates/study_insights_core/src/mastery.rs
//!
//! Groups quiz attempts by topic and partitions the resulting topic stats into
//! ranked, size-bounded strength and weakness lists.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::domain::{percentage, QuizAttempt, TopicStat};

//=========================================================================================
// Mastery Policy
//=========================================================================================

/// Policy constants for mastery classification. Thresholds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MasteryPolicy {
    /// Topics with fewer attempts than this are never classified.
    pub min_attempts: u32,
    /// Accuracy at or above this makes a topic a strength.
    pub strength_threshold: u8,
    /// Accuracy at or below this makes a topic a weakness.
    pub weakness_threshold: u8,
    /// Maximum length of each list.
    pub top_k: usize,
}

impl Default for MasteryPolicy {
    fn default() -> Self {
        Self {
            min_attempts: 2,
            strength_threshold: 75,
            weakness_threshold: 50,
            top_k: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    #[error("min_attempts must be at least 1")]
    ZeroMinAttempts,
    #[error("strength threshold {0} is above 100")]
    StrengthOutOfRange(u8),
    #[error("weakness threshold {weakness} must be below strength threshold {strength}")]
    OverlappingThresholds { weakness: u8, strength: u8 },
}

impl MasteryPolicy {
    /// Checks the policy can never place one topic in both lists.
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.min_attempts == 0 {
            return Err(PolicyError::ZeroMinAttempts);
        }
        if self.strength_threshold > 100 {
            return Err(PolicyError::StrengthOutOfRange(self.strength_threshold));
        }
        if self.weakness_threshold >= self.strength_threshold {
            return Err(PolicyError::OverlappingThresholds {
                weakness: self.weakness_threshold,
                strength: self.strength_threshold,
            });
        }
        Ok(())
    }
}

//=========================================================================================
// Topic Aggregator
//=========================================================================================

/// Groups attempts by exact topic string and computes per-topic accuracy.
///
/// Attempts without a topic are skipped. Accuracy is derived only after every
/// attempt has been counted.
pub fn aggregate_topics(attempts: &[QuizAttempt]) -> BTreeMap<String, TopicStat> {
    let mut counts: BTreeMap<&str, (u32, u32)> = BTreeMap::new();
    for attempt in attempts {
        let Some(topic) = attempt.topic_label() else {
            continue;
        };
        let entry = counts.entry(topic).or_insert((0, 0));
        entry.0 += 1;
        if attempt.correct {
            entry.1 += 1;
        }
    }

    counts
        .into_iter()
        .map(|(topic, (attempts, correct))| {
            let stat = TopicStat {
                topic: topic.to_string(),
                attempts,
                correct,
                accuracy: percentage(correct, attempts),
            };
            (topic.to_string(), stat)
        })
        .collect()
}

//=========================================================================================
// Mastery Classifier
//=========================================================================================

/// Strength and weakness lists, each already ranked and truncated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mastery {
    pub strengths: Vec<TopicStat>,
    pub weaknesses: Vec<TopicStat>,
}

/// Attempts descending, then topic name ascending.
fn tie_break(a: &TopicStat, b: &TopicStat) -> Ordering {
    b.attempts
        .cmp(&a.attempts)
        .then_with(|| a.topic.cmp(&b.topic))
}

/// Partitions eligible topics into strengths and weaknesses.
///
/// A topic matching neither threshold is left out of both lists.
pub fn classify_mastery(topics: &BTreeMap<String, TopicStat>, policy: &MasteryPolicy) -> Mastery {
    let mut strengths = Vec::new();
    let mut weaknesses = Vec::new();

    for stat in topics.values().filter(|s| s.attempts >= policy.min_attempts) {
        if stat.accuracy >= policy.strength_threshold {
            strengths.push(stat.clone());
        } else if stat.accuracy <= policy.weakness_threshold {
            weaknesses.push(stat.clone());
        }
    }

    strengths.sort_by(|a, b| b.accuracy.cmp(&a.accuracy).then_with(|| tie_break(a, b)));
    weaknesses.sort_by(|a, b| a.accuracy.cmp(&b.accuracy).then_with(|| tie_break(a, b)));
    strengths.truncate(policy.top_k);
    weaknesses.truncate(policy.top_k);

    Mastery {
        strengths,
        weaknesses,
    }
}
