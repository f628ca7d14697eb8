//! # Proof Backend Policy
//!
//! The mock backend answers every request with a SHA-256 digest. A daemon
//! serving those to a light client would let anyone forge an update, so the
//! daemon checks its backend against a [`ProofPolicy`] before it starts
//! accepting jobs. In production mode the mock backend is refused.
//!
//! ## Configuration
//!
//! The policy mode is determined by:
//! 1. The `TESSERA_PROOF_POLICY` environment variable (`production` or
//!    `development`). Any other value is an error, never a silent default.
//! 2. Otherwise the build profile: release builds are `Production`, debug
//!    builds are `Development`.

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable selecting the policy mode.
pub const POLICY_ENV: &str = "TESSERA_PROOF_POLICY";

/// Errors from proof policy enforcement.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    /// Mock backend rejected in production mode.
    #[error("mock backend rejected: production mode requires a real proof backend ({backend})")]
    MockBackendRejected {
        /// The backend that was rejected.
        backend: &'static str,
    },
    /// No ceremony keys are installed and production mode refuses to
    /// generate single-party ones.
    #[error("no circuit artifacts in {dir}: production mode refuses single-party key generation")]
    KeyGenerationRejected {
        /// Artifact directory that was empty.
        dir: String,
    },
    /// The configured mode is not recognised.
    #[error("unknown proof policy {0:?} (expected \"production\" or \"development\")")]
    UnknownMode(String),
}

/// The kind of backend serving proofs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProofBackend {
    /// Deterministic SHA-256 mock with no cryptographic security.
    Mock,
    /// Groth16 over BN254.
    Groth16,
}

impl ProofBackend {
    /// Whether this backend provides real cryptographic security.
    pub fn is_real(self) -> bool {
        matches!(self, ProofBackend::Groth16)
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            ProofBackend::Mock => "mock-sha256",
            ProofBackend::Groth16 => "groth16",
        }
    }
}

/// Proof policy mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyMode {
    /// Reject the mock backend unconditionally.
    Production,
    /// Accept the mock backend (tests and local development only).
    Development,
}

impl FromStr for PolicyMode {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "production" | "prod" => Ok(PolicyMode::Production),
            "development" | "dev" => Ok(PolicyMode::Development),
            _ => Err(PolicyError::UnknownMode(s.to_string())),
        }
    }
}

/// Runtime policy deciding whether a backend may serve proofs.
///
/// ```rust
/// use tessera_zkp::policy::{ProofBackend, ProofPolicy};
///
/// let policy = ProofPolicy::production();
/// assert!(policy.validate(ProofBackend::Groth16).is_ok());
/// assert!(policy.validate(ProofBackend::Mock).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct ProofPolicy {
    mode: PolicyMode,
}

impl ProofPolicy {
    /// Create a policy with the given mode.
    pub fn new(mode: PolicyMode) -> Self {
        Self { mode }
    }

    /// A production policy (rejects the mock backend).
    pub fn production() -> Self {
        Self::new(PolicyMode::Production)
    }

    /// A development policy (accepts the mock backend).
    pub fn development() -> Self {
        Self::new(PolicyMode::Development)
    }

    /// The build-profile default: release is production, debug is
    /// development.
    pub fn build_default() -> Self {
        if cfg!(not(debug_assertions)) {
            Self::production()
        } else {
            Self::development()
        }
    }

    /// Policy from an optional configured value, falling back to
    /// [`build_default`](Self::build_default) when unset.
    pub fn from_value(value: Option<&str>) -> Result<Self, PolicyError> {
        match value {
            Some(v) => Ok(Self::new(v.parse()?)),
            None => Ok(Self::build_default()),
        }
    }

    /// Policy from [`POLICY_ENV`].
    pub fn from_environment() -> Result<Self, PolicyError> {
        Self::from_value(std::env::var(POLICY_ENV).ok().as_deref())
    }

    /// Validate whether `backend` is acceptable under this policy.
    pub fn validate(&self, backend: ProofBackend) -> Result<(), PolicyError> {
        match self.mode {
            PolicyMode::Production if !backend.is_real() => Err(PolicyError::MockBackendRejected {
                backend: backend.name(),
            }),
            PolicyMode::Production | PolicyMode::Development => Ok(()),
        }
    }

    /// Whether the daemon may generate its own keys when `dir` holds no
    /// circuit artifacts. Production keys must come from a ceremony.
    pub fn validate_key_generation(&self, dir: &Path) -> Result<(), PolicyError> {
        match self.mode {
            PolicyMode::Production => Err(PolicyError::KeyGenerationRejected {
                dir: dir.display().to_string(),
            }),
            PolicyMode::Development => Ok(()),
        }
    }

    /// Current policy mode.
    pub fn mode(&self) -> PolicyMode {
        self.mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn production_rejects_mock() {
        assert_eq!(
            ProofPolicy::production().validate(ProofBackend::Mock),
            Err(PolicyError::MockBackendRejected { backend: "mock-sha256" })
        );
    }

    #[test]
    fn production_accepts_groth16() {
        assert!(ProofPolicy::production().validate(ProofBackend::Groth16).is_ok());
    }

    #[test]
    fn development_accepts_everything() {
        let policy = ProofPolicy::development();
        assert!(policy.validate(ProofBackend::Mock).is_ok());
        assert!(policy.validate(ProofBackend::Groth16).is_ok());
    }

    #[test]
    fn only_development_may_generate_keys() {
        let dir = Path::new("/var/lib/tessera");
        assert!(ProofPolicy::development().validate_key_generation(dir).is_ok());
        assert_eq!(
            ProofPolicy::production().validate_key_generation(dir),
            Err(PolicyError::KeyGenerationRejected {
                dir: "/var/lib/tessera".to_string()
            })
        );
    }

    #[test]
    fn backend_names_and_realness() {
        assert_eq!(ProofBackend::Mock.name(), "mock-sha256");
        assert_eq!(ProofBackend::Groth16.name(), "groth16");
        assert!(!ProofBackend::Mock.is_real());
        assert!(ProofBackend::Groth16.is_real());
    }

    #[test]
    fn mode_parsing_accepts_aliases() {
        assert_eq!("production".parse::<PolicyMode>(), Ok(PolicyMode::Production));
        assert_eq!(" PROD ".parse::<PolicyMode>(), Ok(PolicyMode::Production));
        assert_eq!("dev".parse::<PolicyMode>(), Ok(PolicyMode::Development));
    }

    #[test]
    fn unknown_mode_is_an_error_not_a_default() {
        assert_eq!(
            ProofPolicy::from_value(Some("lenient")).unwrap_err(),
            PolicyError::UnknownMode("lenient".to_string())
        );
    }

    #[test]
    fn unset_value_uses_the_build_default() {
        let policy = ProofPolicy::from_value(None).unwrap();
        let expected = if cfg!(debug_assertions) {
            PolicyMode::Development
        } else {
            PolicyMode::Production
        };
        assert_eq!(policy.mode(), expected);
    }

    #[test]
    fn error_message_includes_backend() {
        let msg = PolicyError::MockBackendRejected { backend: "mock-sha256" }.to_string();
        assert!(msg.contains("mock-sha256"));
        assert!(msg.contains("production mode"));
    }

    #[test]
    fn serde_uses_snake_case() {
        assert_eq!(serde_json::to_string(&ProofBackend::Groth16).unwrap(), "\"groth16\"");
        let mode: PolicyMode = serde_json::from_str("\"production\"").unwrap();
        assert_eq!(mode, PolicyMode::Production);
    }
}
