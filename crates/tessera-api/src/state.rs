//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers via
//! the `State` extractor, and the daemon configuration it is built from.
//!
//! ## Configuration
//!
//! [`AppConfig::from_env`] reads:
//!
//! | Variable                    | Default       |
//! |-----------------------------|---------------|
//! | `PORT`                      | `8080`        |
//! | `TESSERA_MAX_JOBS`          | `4`           |
//! | `TESSERA_JOB_DEADLINE_SECS` | unset         |
//! | `TESSERA_SYNC_ATTEMPTS`     | `120`         |
//! | `TESSERA_SYNC_BACKOFF_MS`   | `500`         |
//! | `TESSERA_ARTIFACT_DIR`      | `./artifacts` |
//! | `TESSERA_BACKEND`           | `groth16`     |
//! | `TESSERA_PROOF_POLICY`      | build profile |
//! | `TESSERA_LOG_FORMAT`        | `text`        |
//!
//! A present but unparsable value is a [`ConfigError`].

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tessera_zkp::policy::POLICY_ENV;
use tessera_zkp::{PolicyError, ProofBackend, ProofPolicy};
use tokio::sync::Semaphore;

use crate::orchestrator::{Orchestrator, OrchestratorSettings, RetryPolicy};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Daemon configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Orchestrator tuning.
    pub orchestrator: OrchestratorSettings,
    /// Polling used by `POST /v1/proofs/sync`.
    pub sync_retry: RetryPolicy,
    /// Directory holding `consensus.r1cs`, `consensus.pk` and `consensus.vk`.
    pub artifact_dir: PathBuf,
    /// Which backend to serve proofs with.
    pub backend: ProofBackend,
    /// Which backends are acceptable.
    pub policy: ProofPolicy,
    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            orchestrator: OrchestratorSettings::default(),
            sync_retry: RetryPolicy::default(),
            artifact_dir: PathBuf::from("./artifacts"),
            backend: ProofBackend::Groth16,
            policy: ProofPolicy::build_default(),
            log_format: LogFormat::Text,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A variable is set to something unparsable.
    #[error("invalid value {value:?} for {var}: {reason}")]
    Invalid {
        /// Variable name.
        var: &'static str,
        /// The offending value.
        value: String,
        /// What was expected.
        reason: String,
    },
    /// The proof policy is unrecognised.
    #[error(transparent)]
    Policy(#[from] PolicyError),
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(var)
        .map(|value| {
            value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
                var,
                value,
                reason: e.to_string(),
            })
        })
        .transpose()
}

fn invalid(var: &'static str, value: String, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        var,
        value,
        reason: reason.to_string(),
    }
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let max_jobs: usize =
            parse_var(&lookup, "TESSERA_MAX_JOBS")?.unwrap_or(defaults.orchestrator.max_jobs);
        if max_jobs == 0 {
            return Err(invalid("TESSERA_MAX_JOBS", "0".into(), "must be at least 1"));
        }
        if max_jobs > Semaphore::MAX_PERMITS {
            return Err(invalid(
                "TESSERA_MAX_JOBS",
                max_jobs.to_string(),
                &format!("must be at most {}", Semaphore::MAX_PERMITS),
            ));
        }
        let job_deadline = match parse_var::<u64>(&lookup, "TESSERA_JOB_DEADLINE_SECS")? {
            Some(0) => {
                return Err(invalid("TESSERA_JOB_DEADLINE_SECS", "0".into(), "must be at least 1"))
            }
            secs => secs.map(Duration::from_secs),
        };

        let backend = match lookup("TESSERA_BACKEND") {
            None => defaults.backend,
            Some(v) => match v.trim() {
                "groth16" => ProofBackend::Groth16,
                "mock" => ProofBackend::Mock,
                _ => return Err(invalid("TESSERA_BACKEND", v, "expected \"groth16\" or \"mock\"")),
            },
        };

        let log_format = match lookup("TESSERA_LOG_FORMAT") {
            None => LogFormat::Text,
            Some(v) => match v.trim() {
                "text" => LogFormat::Text,
                "json" => LogFormat::Json,
                _ => return Err(invalid("TESSERA_LOG_FORMAT", v, "expected \"text\" or \"json\"")),
            },
        };

        Ok(Self {
            port: parse_var(&lookup, "PORT")?.unwrap_or(defaults.port),
            orchestrator: OrchestratorSettings {
                max_jobs,
                job_deadline,
            },
            sync_retry: RetryPolicy {
                attempts: parse_var(&lookup, "TESSERA_SYNC_ATTEMPTS")?
                    .unwrap_or(defaults.sync_retry.attempts),
                backoff: parse_var(&lookup, "TESSERA_SYNC_BACKOFF_MS")?
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.sync_retry.backoff),
            },
            artifact_dir: lookup("TESSERA_ARTIFACT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.artifact_dir),
            backend,
            policy: ProofPolicy::from_value(lookup(POLICY_ENV).as_deref())?,
            log_format,
        })
    }
}

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The job orchestrator.
    pub orchestrator: Arc<Orchestrator>,
    /// Polling used by `POST /v1/proofs/sync`.
    pub sync_retry: RetryPolicy,
}

impl AppState {
    /// State around an existing orchestrator.
    pub fn new(orchestrator: Orchestrator, sync_retry: RetryPolicy) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            sync_retry,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use tessera_zkp::PolicyMode;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(move |k| vars.get(k).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.orchestrator.max_jobs, 4);
        assert_eq!(cfg.orchestrator.job_deadline, None);
        assert_eq!(cfg.sync_retry, RetryPolicy::default());
        assert_eq!(cfg.artifact_dir, PathBuf::from("./artifacts"));
        assert_eq!(cfg.backend, ProofBackend::Groth16);
        assert_eq!(cfg.log_format, LogFormat::Text);
    }

    #[test]
    fn reads_every_variable() {
        let cfg = config(&[
            ("PORT", "9000"),
            ("TESSERA_MAX_JOBS", "8"),
            ("TESSERA_JOB_DEADLINE_SECS", "30"),
            ("TESSERA_SYNC_ATTEMPTS", "10"),
            ("TESSERA_SYNC_BACKOFF_MS", "50"),
            ("TESSERA_ARTIFACT_DIR", "/var/lib/tessera"),
            ("TESSERA_BACKEND", "mock"),
            ("TESSERA_PROOF_POLICY", "development"),
            ("TESSERA_LOG_FORMAT", "json"),
        ])
        .unwrap();
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.orchestrator.max_jobs, 8);
        assert_eq!(cfg.orchestrator.job_deadline, Some(Duration::from_secs(30)));
        assert_eq!(cfg.sync_retry.attempts, 10);
        assert_eq!(cfg.sync_retry.backoff, Duration::from_millis(50));
        assert_eq!(cfg.artifact_dir, PathBuf::from("/var/lib/tessera"));
        assert_eq!(cfg.backend, ProofBackend::Mock);
        assert_eq!(cfg.policy.mode(), PolicyMode::Development);
        assert_eq!(cfg.log_format, LogFormat::Json);
    }

    #[test]
    fn invalid_values_are_errors() {
        for (var, value) in [
            ("PORT", "http"),
            ("TESSERA_MAX_JOBS", "0"),
            ("TESSERA_MAX_JOBS", "-1"),
            ("TESSERA_JOB_DEADLINE_SECS", "0"),
            ("TESSERA_SYNC_BACKOFF_MS", "soon"),
            ("TESSERA_BACKEND", "plonk"),
            ("TESSERA_LOG_FORMAT", "xml"),
        ] {
            assert!(
                matches!(config(&[(var, value)]), Err(ConfigError::Invalid { .. })),
                "{var}={value} should be rejected"
            );
        }
    }

    #[test]
    fn max_jobs_beyond_semaphore_capacity_is_rejected() {
        let limit = Semaphore::MAX_PERMITS.to_string();
        let cfg = config(&[("TESSERA_MAX_JOBS", &limit)]).unwrap();
        assert_eq!(cfg.orchestrator.max_jobs, Semaphore::MAX_PERMITS);

        let over = (Semaphore::MAX_PERMITS + 1).to_string();
        let err = config(&[("TESSERA_MAX_JOBS", &over)]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "TESSERA_MAX_JOBS", .. }));
        assert!(matches!(
            config(&[("TESSERA_MAX_JOBS", &usize::MAX.to_string())]),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn unknown_policy_is_an_error() {
        assert!(matches!(
            config(&[("TESSERA_PROOF_POLICY", "lenient")]),
            Err(ConfigError::Policy(PolicyError::UnknownMode(_)))
        ));
    }
}
