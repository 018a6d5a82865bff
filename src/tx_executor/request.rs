//! Request and result types for the executor

use ethers::abi::Token;
use ethers::types::{H256, U256};
use serde::Serialize;

use crate::contracts::ContractId;
use crate::error_classifier::{ErrorContext, ParsedError};

/// Per-call options. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionOptions {
    /// Native currency to attach, in wei
    pub value: Option<U256>,
    /// Success message; `{hash}` is replaced with the transaction hash
    pub success_message: Option<String>,
    /// Overrides merged over the context the executor assembles
    pub error_context: Option<ErrorContext>,
}

impl TransactionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_success_message(mut self, message: impl Into<String>) -> Self {
        self.success_message = Some(message.into());
        self
    }

    pub fn with_error_context(mut self, context: ErrorContext) -> Self {
        self.error_context = Some(context);
        self
    }
}

/// One call in a batch
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionSpec {
    pub contract: ContractId,
    pub operation: String,
    pub args: Vec<Token>,
    pub options: TransactionOptions,
}

impl TransactionSpec {
    pub fn new(contract: ContractId, operation: impl Into<String>, args: Vec<Token>) -> Self {
        Self {
            contract,
            operation: operation.into(),
            args,
            options: TransactionOptions::default(),
        }
    }

    pub fn with_options(mut self, options: TransactionOptions) -> Self {
        self.options = options;
        self
    }
}

/// Outcome of one executor call: exactly one of success or failure
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TransactionResult {
    Success {
        transaction_hash: H256,
        message: String,
    },
    Failure {
        /// User-facing message, never raw backend text
        error: String,
        /// Classification behind `error`, when there is one
        #[serde(skip_serializing_if = "Option::is_none")]
        parsed: Option<ParsedError>,
    },
}

impl TransactionResult {
    pub fn success(transaction_hash: H256, message: impl Into<String>) -> Self {
        TransactionResult::Success {
            transaction_hash,
            message: message.into(),
        }
    }

    /// Failure synthesized from a classification
    pub fn failure(parsed: ParsedError) -> Self {
        TransactionResult::Failure {
            error: parsed.message.clone(),
            parsed: Some(parsed),
        }
    }

    /// Failure decided locally with a plain message
    pub fn rejected(message: impl Into<String>) -> Self {
        TransactionResult::Failure {
            error: message.into(),
            parsed: None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TransactionResult::Success { .. })
    }

    pub fn transaction_hash(&self) -> Option<H256> {
        match self {
            TransactionResult::Success { transaction_hash, .. } => Some(*transaction_hash),
            TransactionResult::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            TransactionResult::Failure { error, .. } => Some(error),
            TransactionResult::Success { .. } => None,
        }
    }

    pub fn parsed(&self) -> Option<&ParsedError> {
        match self {
            TransactionResult::Failure { parsed, .. } => parsed.as_ref(),
            TransactionResult::Success { .. } => None,
        }
    }
}

pub(crate) fn render_success_message(template: Option<&str>, operation: &str, hash: H256) -> String {
    match template {
        Some(template) => template.replace("{hash}", &format!("{hash:?}")),
        None => format!("{operation} submitted successfully"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_classifier::{ErrorType, Severity};

    #[test]
    fn test_result_accessors() {
        let ok = TransactionResult::success(H256::repeat_byte(1), "done");
        assert!(ok.is_success());
        assert_eq!(ok.transaction_hash(), Some(H256::repeat_byte(1)));
        assert!(ok.error().is_none());

        let parsed = ParsedError::new(ErrorType::NetworkError, Severity::Medium, true, "offline");
        let failed = TransactionResult::failure(parsed);
        assert_eq!(failed.error(), Some("offline"));
        assert_eq!(failed.parsed().unwrap().error_type, ErrorType::NetworkError);
    }

    #[test]
    fn test_success_message_template() {
        let hash = H256::repeat_byte(0xab);
        let rendered = render_success_message(Some("Delegated! tx {hash}"), "delegateVotes", hash);
        assert!(rendered.starts_with("Delegated! tx 0xabab"));
        assert_eq!(
            render_success_message(None, "delegateVotes", hash),
            "delegateVotes submitted successfully"
        );
    }

    #[test]
    fn test_serialized_shape() {
        let failed = TransactionResult::rejected("nope");
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["status"], "failure");
        assert_eq!(json["error"], "nope");
    }
}
