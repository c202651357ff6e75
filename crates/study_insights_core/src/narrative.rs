//! crates/study_insights_core/src/narrative.rs
//!
//! Bridges a `ProductivityReport` and the external narrative service.
//!
//! Each orchestration is one `NarrativeRun` moving `Idle -> Loading -> {Ready, Failed}`.
//! Failures of the external call are logged and replaced by a fixed fallback message;
//! they never propagate past this module. Once a run is torn down, no further state
//! is written to it.

use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;
use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::domain::{NarrativeResult, ProductivityReport, TopicStat};
use crate::ports::{IdentityProvider, NarrativeGenerationService, PortError, PortResult};

/// Shown to the user whenever the summary could not be produced.
pub const FALLBACK_SUMMARY: &str =
    "Couldn't generate your weekly summary. Please try again later.";

//=========================================================================================
// Request Payload
//=========================================================================================

/// The aggregated fields sent to the narrative service.
///
/// Session- and mood-level records are deliberately not part of this payload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrativePayload<'a> {
    pub total_study_time: u64,
    pub quiz_accuracy: u8,
    pub strengths: &'a [TopicStat],
    pub weaknesses: &'a [TopicStat],
    pub completed_pomodoros: u32,
}

impl<'a> NarrativePayload<'a> {
    pub fn from_report(report: &'a ProductivityReport) -> Self {
        Self {
            total_study_time: report.total_study_time_seconds,
            quiz_accuracy: report.quiz_accuracy,
            strengths: &report.strengths,
            weaknesses: &report.weaknesses,
            completed_pomodoros: report.completed_pomodoros,
        }
    }

    pub fn to_request_text(&self) -> PortResult<String> {
        serde_json::to_string(self).map_err(|e| PortError::Unexpected(e.to_string()))
    }
}

//=========================================================================================
// Run Handle
//=========================================================================================

/// State and liveness of a single orchestration.
///
/// Owned by whoever triggered the orchestration; observers use `subscribe`.
pub struct NarrativeRun {
    state: watch::Sender<NarrativeResult>,
    liveness: CancellationToken,
}

impl Default for NarrativeRun {
    fn default() -> Self {
        Self::new()
    }
}

impl NarrativeRun {
    pub fn new() -> Self {
        let (state, _) = watch::channel(NarrativeResult::Idle);
        Self {
            state,
            liveness: CancellationToken::new(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<NarrativeResult> {
        self.state.subscribe()
    }

    pub fn current(&self) -> NarrativeResult {
        self.state.borrow().clone()
    }

    /// Marks the owning context as gone. Later transitions are dropped.
    pub fn teardown(&self) {
        self.liveness.cancel();
    }

    /// A token that is cancelled when the run is torn down.
    pub fn liveness(&self) -> CancellationToken {
        self.liveness.clone()
    }

    fn begin_loading(&self) -> bool {
        let liveness = &self.liveness;
        self.state.send_if_modified(|state| {
            if liveness.is_cancelled() || *state != NarrativeResult::Idle {
                return false;
            }
            *state = NarrativeResult::Loading;
            true
        })
    }

    fn settle(&self, outcome: NarrativeResult) -> bool {
        let liveness = &self.liveness;
        self.state.send_if_modified(move |state| {
            if liveness.is_cancelled() || *state != NarrativeResult::Loading {
                return false;
            }
            *state = outcome;
            true
        })
    }
}

//=========================================================================================
// Narrative Cache
//=========================================================================================

/// Successful summaries keyed by user and blake3 hash of the payload.
///
/// Any change to the report changes the hash, so stale entries are never hit.
/// Eviction is per entry (TinyLFU), bounded by `max_capacity` and a time-to-live.
pub struct NarrativeCache {
    cache: Cache<(Uuid, String), String>,
}

impl NarrativeCache {
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();
        Self { cache }
    }

    pub fn fingerprint(payload_text: &str) -> String {
        blake3::hash(payload_text.as_bytes()).to_hex().to_string()
    }

    pub fn get(&self, user_id: Uuid, fingerprint: &str) -> Option<String> {
        self.cache.get(&(user_id, fingerprint.to_string()))
    }

    pub fn insert(&self, user_id: Uuid, fingerprint: String, text: String) {
        self.cache.insert((user_id, fingerprint), text);
    }

    /// Number of live entries, after pending evictions are applied.
    pub fn len(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

//=========================================================================================
// Orchestrator
//=========================================================================================

#[derive(Clone)]
pub struct NarrativeOrchestrator {
    service: Arc<dyn NarrativeGenerationService>,
    timeout: Duration,
    cache: Option<Arc<NarrativeCache>>,
}

impl NarrativeOrchestrator {
    pub fn new(service: Arc<dyn NarrativeGenerationService>, timeout: Duration) -> Self {
        Self {
            service,
            timeout,
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: Arc<NarrativeCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Produces the narrative for `report` into `run` and returns the state it ends in.
    ///
    /// Stays `Idle` when nobody is signed in. Otherwise issues exactly one request:
    /// no retries, a failed run is final.
    pub async fn build_narrative(
        &self,
        run: &NarrativeRun,
        identity: &dyn IdentityProvider,
        report: &ProductivityReport,
    ) -> NarrativeResult {
        let Some(user) = identity.current_user() else {
            debug!("No signed-in user; narrative stays idle.");
            return run.current();
        };

        if !run.begin_loading() {
            return run.current();
        }

        let payload_text = match NarrativePayload::from_report(report).to_request_text() {
            Ok(text) => text,
            Err(e) => {
                error!("Failed to serialize narrative payload: {:?}", e);
                run.settle(NarrativeResult::Failed(FALLBACK_SUMMARY.to_string()));
                return run.current();
            }
        };

        let fingerprint = NarrativeCache::fingerprint(&payload_text);
        if let Some(text) = self.cache.as_ref().and_then(|c| c.get(user.user_id, &fingerprint)) {
            debug!("Narrative cache hit for user {}", user.user_id);
            run.settle(NarrativeResult::Ready(text));
            return run.current();
        }

        let liveness = run.liveness();
        let outcome = tokio::select! {
            _ = liveness.cancelled() => {
                info!("Narrative run for user {} torn down while loading.", user.user_id);
                return run.current();
            }
            result = tokio::time::timeout(self.timeout, self.service.generate_summary(&payload_text)) => {
                result.unwrap_or_else(|_| {
                    Err(PortError::NarrativeService(format!("timed out after {:?}", self.timeout)))
                })
            }
        };

        let settled = match outcome {
            Ok(text) if !text.trim().is_empty() => {
                if let Some(cache) = &self.cache {
                    cache.insert(user.user_id, fingerprint, text.clone());
                }
                NarrativeResult::Ready(text)
            }
            Ok(_) => {
                error!("Narrative service returned an empty summary for user {}", user.user_id);
                NarrativeResult::Failed(FALLBACK_SUMMARY.to_string())
            }
            Err(e) => {
                error!("Narrative generation failed for user {}: {:?}", user.user_id, e);
                NarrativeResult::Failed(FALLBACK_SUMMARY.to_string())
            }
        };

        if !run.settle(settled) {
            info!("Narrative run for user {} was torn down; result dropped.", user.user_id);
        }
        run.current()
    }
}
