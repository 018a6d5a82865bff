//! Local executor failures
//!
//! These are decided before anything reaches the wallet, so they are never
//! passed through the classifier. [`ExecutorError::to_parsed`] synthesizes
//! the typed failure directly.

use thiserror::Error;

use crate::error_classifier::{ErrorType, ParsedError, Severity};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutorError {
    /// The connection-request flow failed or was declined
    #[error("{0}")]
    Connection(String),

    /// The interface descriptor has no such operation
    #[error("Unknown operation {operation} on {contract}")]
    UnknownOperation { contract: String, operation: String },

    /// Arguments do not match the operation's parameter types
    #[error("Invalid arguments for {operation}: {reason}")]
    Encoding { operation: String, reason: String },
}

impl ExecutorError {
    pub fn category(&self) -> &'static str {
        match self {
            ExecutorError::Connection(_) => "connection",
            ExecutorError::UnknownOperation { .. } | ExecutorError::Encoding { .. } => "preparation",
        }
    }

    pub fn to_parsed(&self) -> ParsedError {
        let suggestions: &[&str] = match self {
            ExecutorError::Connection(_) => &["Connect your wallet and try again"],
            _ => &["Check the request parameters"],
        };
        ParsedError::new(ErrorType::ValidationError, Severity::Medium, false, self.to_string())
            .with_suggestions(suggestions.iter().copied())
    }
}
