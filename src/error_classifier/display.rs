//! Presentation helpers for classified errors

use super::types::{ErrorContext, ErrorType, ParsedError, Severity};
use serde::Serialize;

/// What a UI shows for a failed operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayError {
    pub title: &'static str,
    pub message: String,
    pub suggestions: Vec<String>,
}

/// Map a parsed error to one of the fixed presentation titles
pub fn display_title(parsed: &ParsedError) -> &'static str {
    if parsed.severity == Severity::Critical {
        return "Critical Error";
    }
    match parsed.error_type {
        ErrorType::UserRejection => "Transaction Cancelled",
        ErrorType::InsufficientFunds => "Insufficient Funds",
        ErrorType::ContractError => "Transaction Failed",
        ErrorType::NetworkError => "Network Error",
        ErrorType::ValidationError => "Invalid Request",
        ErrorType::Unknown => "Unexpected Error",
    }
}

pub fn format_for_display(parsed: &ParsedError) -> DisplayError {
    DisplayError {
        title: display_title(parsed),
        message: parsed.message.clone(),
        suggestions: parsed.suggestions.clone(),
    }
}

/// Emit a structured log event for a classified failure
pub fn log_error(parsed: &ParsedError, context: &ErrorContext) {
    let operation = context.operation.as_deref().unwrap_or("unknown");
    let contract = context.contract.as_deref().unwrap_or("-");
    let original = parsed.original_error.as_deref().unwrap_or("");
    match parsed.severity {
        Severity::Low => tracing::debug!(
            error_type = %parsed.error_type,
            operation,
            contract,
            original,
            "{}",
            parsed.message
        ),
        Severity::Medium => tracing::info!(
            error_type = %parsed.error_type,
            operation,
            contract,
            original,
            "{}",
            parsed.message
        ),
        Severity::High => tracing::warn!(
            error_type = %parsed.error_type,
            operation,
            contract,
            original,
            "{}",
            parsed.message
        ),
        Severity::Critical => tracing::error!(
            error_type = %parsed.error_type,
            operation,
            contract,
            original,
            "{}",
            parsed.message
        ),
    }
}
