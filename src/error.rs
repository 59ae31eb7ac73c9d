//! Error types shared by the resolution cache, rewriters and coordinator.
//!
//! Integration bugs ([`ArbiterError::Configuration`], [`ArbiterError::MalformedRecord`])
//! surface synchronously and are meant to be caught while wiring up a vendor.
//! Runtime failures of the classification backend travel as
//! [`ArbiterError::Network`] through the asynchronous half of a
//! [`TwoStepResponse`](crate::domain::entities::TwoStepResponse).

use thiserror::Error;

/// Errors raised by the core.
#[derive(Debug, Clone, Error)]
pub enum ArbiterError {
    /// A resolver returned a value that does not satisfy the two-step contract.
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// A rewrite record (synchronous or resolved asynchronous) is invalid.
    #[error("malformed rewrite record: {message}")]
    MalformedRecord { message: String },

    /// The classification backend request failed.
    #[error("classification request failed: {0}")]
    Network(#[from] ClassifyError),

    /// The background task driving an asynchronous scan phase did not finish.
    #[error("scan task failed: {0}")]
    Task(String),
}

impl ArbiterError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn malformed_record(message: impl Into<String>) -> Self {
        Self::MalformedRecord {
            message: message.into(),
        }
    }

    /// Returns true for errors caused by a vendor integration rather than the network.
    pub fn is_integration_error(&self) -> bool {
        matches!(
            self,
            Self::Configuration { .. } | Self::MalformedRecord { .. }
        )
    }
}

/// Errors produced by a [`ClassificationBackend`](crate::domain::ports::ClassificationBackend).
///
/// `Clone` because one in-flight request is shared by every caller waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifyError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("backend returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response: {0}")]
    Decode(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        let err = ArbiterError::configuration("bad resolver");
        assert!(matches!(err, ArbiterError::Configuration { ref message } if message == "bad resolver"));
        assert!(err.is_integration_error());

        let err = ArbiterError::malformed_record("unknown link");
        assert_eq!(err.to_string(), "malformed rewrite record: unknown link");
        assert!(err.is_integration_error());
    }

    #[test]
    fn test_network_error_from_classify_error() {
        let err: ArbiterError = ClassifyError::Status {
            status: 503,
            body: "unavailable".to_string(),
        }
        .into();

        assert!(!err.is_integration_error());
        assert_eq!(
            err.to_string(),
            "classification request failed: backend returned status 503: unavailable"
        );
    }
}
