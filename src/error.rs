//! Error types for the SmartSense core.
//!
//! Absence of data is an expected outcome, so the store and the engine report
//! it through these enums instead of panicking. Only `RuleSetError` is meant
//! to stop the process, because it signals a deployment misconfiguration.

use thiserror::Error;

/// Errors returned by the device state store.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// No reading has ever been ingested for the device.
    #[error("No telemetry data for device '{0}'")]
    NotFound(String),
}

/// Errors returned by the recommendation engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// The reading lacks the metric used for the primary classification.
    #[error("Reading has no value for primary metric '{0}'")]
    MissingPrimaryMetric(String),
}

/// Invalid threshold rule configuration, detected at construction time.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuleSetError {
    #[error("Primary metric name must not be empty")]
    EmptyPrimaryMetric,

    #[error("Classification table must contain at least one tier")]
    NoTiers,

    #[error("Tier {index} ('{label}') has a bound that is not finite or not ascending")]
    UnorderedTier { index: usize, label: String },

    #[error("Only the last tier may be open-ended, but tier {0} has no upper bound")]
    OpenTierNotLast(usize),

    #[error("Rule {index} for metric '{metric}' has neither 'min' nor 'max'")]
    RuleWithoutComparator { metric: String, index: usize },

    #[error("Empty advice text in {0}")]
    EmptyAdvice(String),
}

/// Payloads rejected at the ingestion boundary.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IngestError {
    #[error("Payload is not a JSON object")]
    NotAnObject,

    #[error("Payload has no device identifier")]
    MissingDeviceId,

    #[error("Malformed JSON payload: {0}")]
    Json(String),
}

impl RuleSetError {
    /// Create a new `UnorderedTier` error
    #[must_use]
    pub fn unordered(index: usize, label: &str) -> Self {
        Self::UnorderedTier {
            index,
            label: label.to_string(),
        }
    }
}
