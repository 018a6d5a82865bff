//! Output types of the error classifier

use serde::{Deserialize, Serialize};
use std::fmt;

/// Public error taxonomy. Never more granular than this at the boundary;
/// raw diagnostic text is kept in [`ParsedError::original_error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    UserRejection,
    InsufficientFunds,
    ContractError,
    NetworkError,
    ValidationError,
    Unknown,
}

impl ErrorType {
    /// Stable label for metrics and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserRejection => "user_rejection",
            Self::InsufficientFunds => "insufficient_funds",
            Self::ContractError => "contract_error",
            Self::NetworkError => "network_error",
            Self::ValidationError => "validation_error",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Optional metadata attached to an operation for better diagnostics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Operation name ("delegate", "approve", ...)
    pub operation: Option<String>,
    /// Target contract identifier ("EMARK_TOKEN", ...)
    pub contract: Option<String>,
    /// Requested amount, already formatted for humans
    pub amount: Option<String>,
    /// Token or item identifier
    pub token_id: Option<String>,
    /// Acting principal's address
    pub user_address: Option<String>,
    /// Backend method name
    pub method_name: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    pub fn with_contract(mut self, contract: impl Into<String>) -> Self {
        self.contract = Some(contract.into());
        self
    }

    pub fn with_amount(mut self, amount: impl Into<String>) -> Self {
        self.amount = Some(amount.into());
        self
    }

    pub fn with_token_id(mut self, token_id: impl Into<String>) -> Self {
        self.token_id = Some(token_id.into());
        self
    }

    pub fn with_user_address(mut self, user_address: impl Into<String>) -> Self {
        self.user_address = Some(user_address.into());
        self
    }

    pub fn with_method_name(mut self, method_name: impl Into<String>) -> Self {
        self.method_name = Some(method_name.into());
        self
    }

    /// Fill every unset field from `fallback`; fields already set win
    pub fn merged_over(self, fallback: &ErrorContext) -> Self {
        Self {
            operation: self.operation.or_else(|| fallback.operation.clone()),
            contract: self.contract.or_else(|| fallback.contract.clone()),
            amount: self.amount.or_else(|| fallback.amount.clone()),
            token_id: self.token_id.or_else(|| fallback.token_id.clone()),
            user_address: self.user_address.or_else(|| fallback.user_address.clone()),
            method_name: self.method_name.or_else(|| fallback.method_name.clone()),
        }
    }

    /// Short token label derived from the contract id ("EMARK_TOKEN" -> "EMARK")
    pub(crate) fn token_label(&self) -> String {
        match self.contract.as_deref() {
            Some(contract) => {
                let label = contract.trim_end_matches("_TOKEN");
                if label.is_empty() {
                    "token".to_string()
                } else {
                    label.to_string()
                }
            }
            None => "token".to_string(),
        }
    }
}

/// The classifier's output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedError {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: ErrorType,
    pub is_retryable: bool,
    pub suggestions: Vec<String>,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ParsedError {
    pub fn new(
        error_type: ErrorType,
        severity: Severity,
        is_retryable: bool,
        message: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            error_type,
            is_retryable,
            suggestions: Vec::new(),
            severity,
            original_error: None,
            details: None,
        }
    }

    pub fn with_suggestions<I, S>(mut self, suggestions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.suggestions = suggestions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_original(mut self, original: impl Into<String>) -> Self {
        let original = original.into();
        if !original.is_empty() {
            self.original_error = Some(original);
        }
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Whether an automatic retry loop may re-submit after this error.
    ///
    /// Narrower than `is_retryable`: only connectivity failures and transient
    /// contract conditions qualify. The user may still retry anything marked
    /// retryable by hand.
    pub fn allows_auto_retry(&self) -> bool {
        self.is_retryable
            && matches!(
                self.error_type,
                ErrorType::NetworkError | ErrorType::ContractError
            )
    }
}

impl fmt::Display for ParsedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.error_type, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_label() {
        let ctx = ErrorContext::new().with_contract("EMARK_TOKEN");
        assert_eq!(ctx.token_label(), "EMARK");
        let ctx = ErrorContext::new().with_contract("WEMARK");
        assert_eq!(ctx.token_label(), "WEMARK");
        assert_eq!(ErrorContext::new().token_label(), "token");
    }

    #[test]
    fn test_context_merge_prefers_explicit_fields() {
        let base = ErrorContext::new()
            .with_operation("delegate")
            .with_contract("EVERMARK_VOTING");
        let merged = ErrorContext::new().with_operation("delegateBatch").merged_over(&base);
        assert_eq!(merged.operation.as_deref(), Some("delegateBatch"));
        assert_eq!(merged.contract.as_deref(), Some("EVERMARK_VOTING"));
    }

    #[test]
    fn test_auto_retry_excludes_rejections() {
        let rejection = ParsedError::new(ErrorType::UserRejection, Severity::Low, true, "x");
        assert!(!rejection.allows_auto_retry());
        let network = ParsedError::new(ErrorType::NetworkError, Severity::Medium, true, "x");
        assert!(network.allows_auto_retry());
        let permanent = ParsedError::new(ErrorType::ContractError, Severity::High, false, "x");
        assert!(!permanent.allows_auto_retry());
    }

    #[test]
    fn test_serialized_shape() {
        let parsed = ParsedError::new(ErrorType::NetworkError, Severity::Medium, true, "offline");
        let json = serde_json::to_value(&parsed).unwrap();
        assert_eq!(json["type"], "network_error");
        assert_eq!(json["severity"], "medium");
        assert!(json.get("original_error").is_none());
    }
}
