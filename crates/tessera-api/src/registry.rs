//! # Job Registry
//!
//! The dedup cache: one [`JobRecord`] per [`Fingerprint`], created on first
//! submission and never removed.
//!
//! ## Concurrency
//!
//! Records live in [`SHARDS`] `parking_lot::Mutex<HashMap>` shards selected by
//! the fingerprint's first byte, so submissions for unrelated fingerprints
//! rarely contend. Locks are never held across `.await` points.
//!
//! [`JobRegistry::register_or_lookup`] is the only way to create a record.
//! It looks up, runs the caller's admission check and inserts under a single
//! shard lock, so two concurrent submissions of the same fingerprint cannot
//! both observe "absent", and a rejected admission never leaves a
//! placeholder behind.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use tessera_core::{Fingerprint, ProveResponse};

/// Number of registry shards.
pub const SHARDS: usize = 16;

/// Lifecycle of one proof job. `Pending` transitions exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PollResult {
    /// The backend has not finished.
    Pending,
    /// The proof is ready.
    Done {
        /// The backend's answer.
        response: ProveResponse,
    },
    /// The backend failed; resubmitting the same request returns this again.
    Failed {
        /// What went wrong.
        message: String,
    },
}

impl PollResult {
    /// Whether this is `Done` or `Failed`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PollResult::Pending)
    }
}

/// One registry entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobRecord {
    /// Current state.
    #[serde(flatten)]
    pub state: PollResult,
    /// When the job was admitted.
    pub submitted_at: DateTime<Utc>,
    /// When the job reached a terminal state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Outcome of [`JobRegistry::register_or_lookup`].
#[derive(Debug)]
pub enum Registration<P, E> {
    /// The fingerprint was already known.
    Existing(JobRecord),
    /// Admission succeeded and a `Pending` record was inserted.
    NewlyCreated(P),
    /// Admission failed; nothing was inserted.
    Rejected(E),
}

/// Snapshot of record counts by state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JobCounts {
    /// Jobs still running.
    pub pending: usize,
    /// Jobs that produced a proof.
    pub done: usize,
    /// Jobs that failed.
    pub failed: usize,
}

/// Sharded fingerprint → job map.
#[derive(Debug)]
pub struct JobRegistry {
    shards: Vec<Mutex<HashMap<Fingerprint, JobRecord>>>,
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl JobRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            shards: (0..SHARDS).map(|_| Mutex::new(HashMap::new())).collect(),
        }
    }

    fn shard(&self, fp: &Fingerprint) -> &Mutex<HashMap<Fingerprint, JobRecord>> {
        &self.shards[fp.as_bytes()[0] as usize % SHARDS]
    }

    /// Atomically return the existing record for `fp`, or run `admit` and,
    /// if it succeeds, insert a `Pending` record.
    ///
    /// `admit` runs under the shard lock and must not block.
    pub fn register_or_lookup<P, E>(
        &self,
        fp: Fingerprint,
        admit: impl FnOnce() -> Result<P, E>,
    ) -> Registration<P, E> {
        let mut shard = self.shard(&fp).lock();
        if let Some(record) = shard.get(&fp) {
            return Registration::Existing(record.clone());
        }
        match admit() {
            Ok(permit) => {
                shard.insert(
                    fp,
                    JobRecord {
                        state: PollResult::Pending,
                        submitted_at: Utc::now(),
                        completed_at: None,
                    },
                );
                Registration::NewlyCreated(permit)
            }
            Err(e) => Registration::Rejected(e),
        }
    }

    /// The record for `fp`, if any. No side effects.
    pub fn get(&self, fp: &Fingerprint) -> Option<JobRecord> {
        self.shard(fp).lock().get(fp).cloned()
    }

    /// Move `fp` from `Pending` to `outcome`.
    ///
    /// Returns `false`, leaving the record untouched, if `fp` is unknown,
    /// already terminal, or `outcome` is `Pending`.
    pub fn complete(&self, fp: &Fingerprint, outcome: PollResult) -> bool {
        if !outcome.is_terminal() {
            return false;
        }
        let mut shard = self.shard(fp).lock();
        match shard.get_mut(fp) {
            Some(record) if record.state == PollResult::Pending => {
                record.state = outcome;
                record.completed_at = Some(Utc::now());
                true
            }
            _ => false,
        }
    }

    /// Count records by state.
    pub fn counts(&self) -> JobCounts {
        let mut counts = JobCounts::default();
        for shard in &self.shards {
            for record in shard.lock().values() {
                match record.state {
                    PollResult::Pending => counts.pending += 1,
                    PollResult::Done { .. } => counts.done += 1,
                    PollResult::Failed { .. } => counts.failed += 1,
                }
            }
        }
        counts
    }
}
