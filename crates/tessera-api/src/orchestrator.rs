//! # Job Orchestrator
//!
//! Turns proof requests into at most one backend invocation per
//! fingerprint.
//!
//! ## Submission
//!
//! ```text
//! validate → fingerprint → register_or_lookup ─┬─ Existing      → current state
//!                                              ├─ NewlyCreated  → spawn job, Pending
//!                                              └─ Rejected      → Busy
//! ```
//!
//! Validation and fingerprinting happen synchronously, so malformed requests
//! never occupy a slot or a registry entry. A new job runs the backend on
//! tokio's blocking pool; `submit` itself never blocks.
//!
//! ## Completion
//!
//! Backend errors, panics and deadline overruns are all recorded as
//! `Failed(message)` and observed through polling, never returned from
//! `submit`. The job's admission slot is dropped by the blocking closure, so
//! a call that outlives its deadline keeps its slot until the backend
//! actually returns.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use tessera_core::{CanonicalizationError, Fingerprint, ProveRequest, ProveResponse, ValidationError};
use tessera_zkp::{BackendStats, ProvingBackend};

use crate::admission::{AdmissionController, Busy, JobPermit};
use crate::registry::{JobCounts, JobRegistry, PollResult, Registration};

/// Message recorded for a job that ran past its deadline.
pub const DEADLINE_EXCEEDED: &str = "deadline exceeded";

/// Tuning for an [`Orchestrator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorSettings {
    /// Maximum concurrently executing backend calls.
    pub max_jobs: usize,
    /// Per-job wall-clock limit. `None` lets jobs run to completion.
    pub job_deadline: Option<Duration>,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            max_jobs: 4,
            job_deadline: None,
        }
    }
}

/// Bounded polling for [`Orchestrator::prove_sync`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Polls before giving up.
    pub attempts: u32,
    /// Sleep between polls.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 120,
            backoff: Duration::from_millis(500),
        }
    }
}

/// Synchronous rejection of a submission.
#[derive(Error, Debug)]
pub enum SubmitError {
    /// The request violates a structural bound.
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    /// The request could not be fingerprinted.
    #[error(transparent)]
    Fingerprint(#[from] CanonicalizationError),
    /// No job slot is free. Nothing was recorded; retry the submission.
    #[error(transparent)]
    Busy(#[from] Busy),
}

/// Why [`Orchestrator::prove_sync`] returned without a proof.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The request was rejected outright.
    #[error(transparent)]
    Submit(SubmitError),
    /// The job failed.
    #[error("proof job failed: {0}")]
    Failed(String),
    /// The job was still pending, or slots stayed busy, after every attempt.
    #[error("no result after {attempts} polls")]
    Exhausted {
        /// Polls made.
        attempts: u32,
    },
}

/// Job and backend statistics for `QueryStats`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrchestratorStats {
    /// Registry counts by state.
    pub jobs: JobCounts,
    /// Admission slots in use.
    pub active_slots: usize,
    /// Admission slots configured.
    pub max_slots: usize,
    /// Circuit and key statistics.
    pub backend: BackendStats,
}

/// Dedup registry, admission control and the backend, wired together.
pub struct Orchestrator {
    registry: Arc<JobRegistry>,
    admission: AdmissionController,
    backend: Arc<dyn ProvingBackend>,
    settings: OrchestratorSettings,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("backend", &self.backend.kind())
            .field("settings", &self.settings)
            .field("active_slots", &self.admission.active())
            .finish()
    }
}

impl Orchestrator {
    /// An orchestrator over `backend`.
    pub fn new(backend: Arc<dyn ProvingBackend>, settings: OrchestratorSettings) -> Self {
        Self {
            registry: Arc::new(JobRegistry::new()),
            admission: AdmissionController::new(settings.max_jobs),
            backend,
            settings,
        }
    }

    /// The backend jobs run on.
    pub fn backend(&self) -> &Arc<dyn ProvingBackend> {
        &self.backend
    }

    /// `submit`: the current state of `request`'s job, starting it if this
    /// is the first time its fingerprint is seen.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(&self, request: &ProveRequest) -> Result<(Fingerprint, PollResult), SubmitError> {
        request.validate()?;
        let fp = request.fingerprint()?;
        match self
            .registry
            .register_or_lookup(fp, || self.admission.try_admit())
        {
            Registration::Existing(record) => Ok((fp, record.state)),
            Registration::NewlyCreated(permit) => {
                tracing::info!(
                    fingerprint = %fp,
                    active = self.admission.active(),
                    max = self.admission.max(),
                    "job admitted"
                );
                self.spawn_job(fp, request.clone(), permit);
                Ok((fp, PollResult::Pending))
            }
            Registration::Rejected(busy) => {
                tracing::warn!(fingerprint = %fp, max = busy.max, "job rejected: busy");
                Err(busy.into())
            }
        }
    }

    /// `poll`: identical to [`submit`](Self::submit). Repeated calls observe
    /// `Pending*` followed by one terminal state, forever.
    pub fn poll(&self, request: &ProveRequest) -> Result<(Fingerprint, PollResult), SubmitError> {
        self.submit(request)
    }

    /// The state of `fp`'s job, without submitting anything.
    pub fn status(&self, fp: &Fingerprint) -> Option<PollResult> {
        self.registry.get(fp).map(|record| record.state)
    }

    /// `ProveSync`: poll until terminal, sleeping `retry.backoff` between
    /// attempts. `Busy` counts as "not yet".
    pub async fn prove_sync(
        &self,
        request: &ProveRequest,
        retry: RetryPolicy,
    ) -> Result<ProveResponse, SyncError> {
        for attempt in 0..retry.attempts {
            if attempt > 0 {
                tokio::time::sleep(retry.backoff).await;
            }
            match self.poll(request) {
                Ok((_, PollResult::Done { response })) => return Ok(response),
                Ok((_, PollResult::Failed { message })) => return Err(SyncError::Failed(message)),
                Ok((_, PollResult::Pending)) | Err(SubmitError::Busy(_)) => {}
                Err(e) => return Err(SyncError::Submit(e)),
            }
        }
        Err(SyncError::Exhausted {
            attempts: retry.attempts,
        })
    }

    /// Job counts, slot usage and backend statistics.
    pub fn stats(&self) -> OrchestratorStats {
        OrchestratorStats {
            jobs: self.registry.counts(),
            active_slots: self.admission.active(),
            max_slots: self.admission.max(),
            backend: self.backend.stats(),
        }
    }

    fn spawn_job(&self, fp: Fingerprint, request: ProveRequest, permit: JobPermit) {
        let registry = Arc::clone(&self.registry);
        let backend = Arc::clone(&self.backend);
        let deadline = self.settings.job_deadline;

        tokio::spawn(async move {
            let call = tokio::task::spawn_blocking(move || {
                let _slot = permit;
                backend.prove(&request)
            });
            let joined = match deadline {
                Some(limit) => match tokio::time::timeout(limit, call).await {
                    Ok(joined) => joined,
                    Err(_) => {
                        tracing::warn!(fingerprint = %fp, ?limit, "job deadline exceeded");
                        registry.complete(
                            &fp,
                            PollResult::Failed {
                                message: DEADLINE_EXCEEDED.to_string(),
                            },
                        );
                        return;
                    }
                },
                None => call.await,
            };
            let outcome = match joined {
                Ok(Ok(response)) => {
                    tracing::info!(fingerprint = %fp, "job completed");
                    PollResult::Done { response }
                }
                Ok(Err(e)) => {
                    tracing::error!(fingerprint = %fp, error = %e, "job failed");
                    PollResult::Failed {
                        message: e.to_string(),
                    }
                }
                Err(e) => {
                    tracing::error!(fingerprint = %fp, error = %e, "job panicked");
                    PollResult::Failed {
                        message: "proving backend panicked".to_string(),
                    }
                }
            };
            registry.complete(&fp, outcome);
        });
    }
}
