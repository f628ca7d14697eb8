//! # Daemon Bootstrap
//!
//! Turns an [`AppConfig`] into a ready [`AppState`].
//!
//! ## Bootstrap Sequence
//!
//! 1. **Check Policy**: refuse a backend the proof policy forbids before
//!    doing any expensive work.
//! 2. **Build Backend**: `compile_or_load` the Groth16 artifacts on a
//!    blocking thread, or construct the mock. An empty artifact directory
//!    means single-party key generation, which only the development
//!    policy permits.
//! 3. **Assemble Orchestrator**: registry, admission slots, deadline.
//! 4. **Log Identity**: structured start-up banner.

use std::sync::Arc;

use tessera_zkp::{
    ArtifactPaths, BackendError, Groth16Backend, MockBackend, PolicyError, ProofBackend,
    ProvingBackend,
};

use crate::orchestrator::Orchestrator;
use crate::state::{AppConfig, AppState};

/// Errors during daemon bootstrap.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    /// The configured backend violates the proof policy.
    #[error(transparent)]
    Policy(#[from] PolicyError),

    /// Circuit compilation or key loading failed.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// The artifact directory could not be created.
    #[error("cannot create artifact directory {path}: {source}")]
    ArtifactDir {
        /// Directory path.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The blocking setup task panicked or was cancelled.
    #[error("backend setup task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Build the backend named by `config`.
pub async fn build_backend(config: &AppConfig) -> Result<Arc<dyn ProvingBackend>, BootstrapError> {
    match config.backend {
        ProofBackend::Mock => {
            tracing::warn!("serving proofs with the mock backend; proofs carry no soundness");
            Ok(Arc::new(MockBackend::new()))
        }
        ProofBackend::Groth16 => {
            let dir = config.artifact_dir.clone();
            std::fs::create_dir_all(&dir).map_err(|source| BootstrapError::ArtifactDir {
                path: dir.display().to_string(),
                source,
            })?;
            let paths = ArtifactPaths::in_dir(&dir);
            if paths.none_exist() {
                config.policy.validate_key_generation(&dir)?;
            }
            let backend = tokio::task::spawn_blocking(move || {
                Groth16Backend::compile_or_load(&paths, &mut rand::thread_rng())
            })
            .await??;
            Ok(Arc::new(backend))
        }
    }
}

/// Run the bootstrap sequence.
pub async fn bootstrap(config: &AppConfig) -> Result<AppState, BootstrapError> {
    config.policy.validate(config.backend)?;

    let backend = build_backend(config).await?;
    let stats = backend.stats();
    let orchestrator = Orchestrator::new(backend, config.orchestrator.clone());

    tracing::info!(
        backend = stats.backend.name(),
        policy = ?config.policy.mode(),
        constraints = stats.constraints,
        public_inputs = stats.public_inputs,
        verifying_key_bytes = stats.verifying_key_bytes,
        max_jobs = config.orchestrator.max_jobs,
        job_deadline = ?config.orchestrator.job_deadline,
        "tessera daemon bootstrapped"
    );

    Ok(AppState::new(orchestrator, config.sync_retry))
}
