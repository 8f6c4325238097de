//! Static shared-secret check in front of the record input stage

use crate::types::RunnerError;
use tracing::warn;

/// Environment variable holding the shared secret
pub const SECRET_ENV: &str = "BATCH_RUNNER_SECRET";

/// Shared-secret gate
///
/// A gate built without a secret admits every caller.
#[derive(Clone, Default)]
pub struct AccessGate {
    secret: Option<String>,
}

impl AccessGate {
    pub fn new(secret: Option<String>) -> Self {
        // An empty secret would otherwise accept an empty code only.
        let secret = secret.filter(|s| !s.is_empty());
        Self { secret }
    }

    /// Build the gate from [`SECRET_ENV`]; unset means open
    pub fn from_env() -> Self {
        Self::new(std::env::var(SECRET_ENV).ok())
    }

    /// Whether a secret is configured
    pub fn is_open(&self) -> bool {
        self.secret.is_none()
    }

    /// Check `candidate` against the configured secret
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The gate is open or the code matches
    /// * `Err(RunnerError::AccessDenied)` - The code does not match
    pub fn verify(&self, candidate: Option<&str>) -> Result<(), RunnerError> {
        match &self.secret {
            None => Ok(()),
            Some(secret) if candidate.map(str::trim) == Some(secret.as_str()) => Ok(()),
            Some(_) => {
                warn!("Rejected access code");
                Err(RunnerError::AccessDenied)
            }
        }
    }
}

impl std::fmt::Debug for AccessGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessGate")
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
