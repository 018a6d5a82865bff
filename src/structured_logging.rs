//! Structured logging and per-operation context

use crate::observability::CorrelationId;
use uuid::Uuid;

/// Structured logger for executor events
///
/// Every event carries the request, trace and span ids of the step it was
/// created for.
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    request_id: CorrelationId,
    trace_id: String,
    span_id: String,
    parent_span_id: Option<String>,
    step: String,
}

impl StructuredLogger {
    pub fn log_submit(&self, operation: &str, contract: &str, strategy: &str) {
        tracing::info!(
            request_id = %self.request_id,
            trace_id = %self.trace_id,
            span_id = %self.span_id,
            parent_span_id = ?self.parent_span_id,
            step = %self.step,
            operation = %operation,
            contract = %contract,
            strategy = %strategy,
            "Submitting transaction"
        );
    }

    pub fn log_success(&self, operation: &str, tx_hash: &str, latency_ms: u64) {
        tracing::info!(
            request_id = %self.request_id,
            trace_id = %self.trace_id,
            span_id = %self.span_id,
            step = %self.step,
            operation = %operation,
            tx_hash = %tx_hash,
            latency_ms = %latency_ms,
            "Transaction submitted successfully"
        );
    }

    pub fn log_failure(&self, operation: &str, error_type: &str, message: &str, latency_ms: u64) {
        tracing::warn!(
            request_id = %self.request_id,
            trace_id = %self.trace_id,
            span_id = %self.span_id,
            step = %self.step,
            operation = %operation,
            error_type = %error_type,
            error = %message,
            latency_ms = %latency_ms,
            "Transaction failed"
        );
    }

    /// Failure decided locally, before anything crossed the wallet boundary
    pub fn log_local_rejection(&self, operation: &str, category: &str, reason: &str) {
        tracing::info!(
            request_id = %self.request_id,
            trace_id = %self.trace_id,
            span_id = %self.span_id,
            step = %self.step,
            operation = %operation,
            category = %category,
            reason = %reason,
            "Rejected locally"
        );
    }

    pub fn log_retry(&self, operation: &str, attempt: u32, max_attempts: u32, backoff_ms: u64) {
        tracing::debug!(
            request_id = %self.request_id,
            trace_id = %self.trace_id,
            span_id = %self.span_id,
            operation = %operation,
            attempt = attempt,
            max_attempts = max_attempts,
            backoff_ms = backoff_ms,
            "Retrying transaction"
        );
    }
}

/// Execution context for one public operation
#[derive(Debug, Clone)]
pub struct PipelineContext {
    /// Shared by the operation and every nested step
    pub request_id: CorrelationId,

    /// Step-scoped logger
    pub logger: StructuredLogger,
}

impl PipelineContext {
    pub fn new(operation: &str) -> Self {
        let request_id = CorrelationId::new();
        Self {
            request_id: request_id.clone(),
            logger: StructuredLogger {
                request_id,
                trace_id: Uuid::new_v4().to_string(),
                span_id: Uuid::new_v4().to_string(),
                parent_span_id: None,
                step: operation.to_string(),
            },
        }
    }

    /// Child context for a nested step (one batch item, one retry attempt)
    pub fn child(&self, step: &str) -> Self {
        Self {
            request_id: self.request_id.clone(),
            logger: StructuredLogger {
                request_id: self.request_id.clone(),
                trace_id: self.logger.trace_id.clone(),
                span_id: Uuid::new_v4().to_string(),
                parent_span_id: Some(self.logger.span_id.clone()),
                step: step.to_string(),
            },
        }
    }

    pub fn trace_id(&self) -> &str {
        &self.logger.trace_id
    }

    pub fn span_id(&self) -> &str {
        &self.logger.span_id
    }
}
