use serde::Serialize;
use thiserror::Error;

use crate::api::model::Identifier;

/// Used when a failed call carries no description of its own.
pub const FALLBACK_ERROR_MESSAGE: &str = "Unknown error";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Processing failed. [identifier = {identifier}, message = {message}]")]
pub struct ItemProcessingFailure {
    pub identifier: Identifier,
    pub message: String,
}

impl ItemProcessingFailure {
    pub fn new(identifier: Identifier, message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            FALLBACK_ERROR_MESSAGE.to_string()
        } else {
            message
        };

        Self {
            identifier,
            message,
        }
    }
}

/// Result of one processing attempt. Never changes once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub identifier: Identifier,
    pub succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl Outcome {
    pub fn success(identifier: Identifier) -> Self {
        Self {
            identifier,
            succeeded: true,
            error_message: None,
        }
    }

    pub fn failure(failure: ItemProcessingFailure) -> Self {
        Self {
            identifier: failure.identifier,
            succeeded: false,
            error_message: Some(failure.message),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn from_outcomes(outcomes: &[Outcome]) -> Self {
        let succeeded = outcomes.iter().filter(|outcome| outcome.succeeded).count();

        Self {
            succeeded,
            failed: outcomes.len() - succeeded,
        }
    }
}
