// src/infra/errors.rs — Error types for Viral Daily

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ViralDailyError {
    // Backend errors (retriable when transient)
    #[error("Backend call '{endpoint}' failed: {message}")]
    Backend {
        endpoint: String,
        message: String,
        retriable: bool,
    },

    #[error("Rate limited on '{endpoint}', retry after {retry_after_ms}ms")]
    RateLimited {
        endpoint: String,
        retry_after_ms: u64,
    },

    /// The backend rejected the bearer credential (HTTP 401).
    #[error("Credential rejected by '{endpoint}'")]
    Unauthorized { endpoint: String },

    /// The credential is valid but the tier does not allow the call (HTTP 403).
    #[error("'{endpoint}' requires a higher subscription tier: {message}")]
    Forbidden { endpoint: String, message: String },

    #[error("Unexpected response from '{endpoint}': {message}")]
    InvalidResponse { endpoint: String, message: String },

    // Session errors
    #[error("Stored session is corrupt: {0}")]
    SessionCorrupt(String),

    #[error("Registration failed: {0}")]
    RegistrationFailed(String),

    #[error("Not signed in. Run `viral-daily signup <email>` first.")]
    NoSession,

    // Infra
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ViralDailyError {
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            ViralDailyError::Backend {
                retriable: true,
                ..
            } | ViralDailyError::RateLimited { .. }
        )
    }

    /// True when the backend refused the credential itself.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ViralDailyError::Unauthorized { .. })
    }
}
