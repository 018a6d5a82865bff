//! Transaction executor
//!
//! One backend-agnostic entry point over both wallet paradigms. Every path
//! resolves to exactly one [`TransactionResult`]; nothing escapes as a panic
//! or an `Err`.

use ethers::abi::Token;
use ethers::types::Address;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::errors::ExecutorError;
use super::request::{render_success_message, TransactionOptions, TransactionResult, TransactionSpec};
use super::retry::RetryConfig;
use super::strategy::strategy_for;
use crate::config::ExecutorConfig;
use crate::contracts::{ContractId, RemoteAccessContext};
use crate::error_classifier::{classify, log_error, ErrorContext, RawError};
use crate::metrics::{Metrics, Timer};
use crate::structured_logging::PipelineContext;
use crate::types::format_amount;
use crate::wallet::{SendOutcome, StrategyKind};

pub struct TransactionExecutor {
    ctx: Arc<RemoteAccessContext>,
    retry: RetryConfig,
    submit_timeout: Option<Duration>,
    in_flight: Arc<AtomicUsize>,
    metrics: Option<Arc<Metrics>>,
}

impl TransactionExecutor {
    pub fn new(ctx: Arc<RemoteAccessContext>) -> Self {
        Self {
            ctx,
            retry: RetryConfig::default(),
            submit_timeout: None,
            in_flight: Arc::new(AtomicUsize::new(0)),
            metrics: None,
        }
    }

    pub fn from_config(ctx: Arc<RemoteAccessContext>, config: &ExecutorConfig) -> Self {
        Self::new(ctx)
            .with_retry_config(RetryConfig::from(config))
            .with_submit_timeout(config.submit_timeout())
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Bound the wallet confirmation wait; `None` waits for the user
    pub fn with_submit_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.submit_timeout = timeout;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn context(&self) -> &Arc<RemoteAccessContext> {
        &self.ctx
    }

    /// True while any call is between entry and resolution
    pub fn is_processing(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    pub fn active_strategy(&self) -> StrategyKind {
        self.ctx.wallet().strategy_kind()
    }

    pub async fn execute(
        &self,
        contract: ContractId,
        operation: &str,
        args: Vec<Token>,
        options: TransactionOptions,
    ) -> TransactionResult {
        let pipeline = PipelineContext::new(operation);
        self.execute_in(&pipeline, contract, operation, args, &options).await
    }

    pub async fn execute_spec(&self, spec: &TransactionSpec) -> TransactionResult {
        let pipeline = PipelineContext::new(&spec.operation);
        self.run_spec(&pipeline, spec).await
    }

    /// Execute in list order; stop at the first failure.
    ///
    /// The returned list holds every result up to and including the failing one.
    pub async fn execute_batch(&self, specs: &[TransactionSpec]) -> Vec<TransactionResult> {
        let pipeline = PipelineContext::new("batch");
        let mut results = Vec::with_capacity(specs.len());
        for (index, spec) in specs.iter().enumerate() {
            let child = pipeline.child(&format!("batch[{index}]:{}", spec.operation));
            let result = self.run_spec(&child, spec).await;
            let failed = !result.is_success();
            results.push(result);
            if failed {
                tracing::warn!(
                    request_id = %pipeline.request_id,
                    trace_id = %pipeline.trace_id(),
                    index,
                    remaining = specs.len() - index - 1,
                    "batch aborted after failure"
                );
                break;
            }
        }
        results
    }

    /// Execute with automatic retry on connectivity and transient contract
    /// failures. Anything else, user rejections included, gets one attempt.
    pub async fn execute_with_retry(&self, spec: &TransactionSpec) -> TransactionResult {
        let pipeline = PipelineContext::new(&spec.operation);
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            let child = pipeline.child(&format!("{}#{}", spec.operation, attempt + 1));
            let result = self.run_spec(&child, spec).await;
            if result.is_success() || !self.retry.should_retry(result.parsed()) {
                return result;
            }
            if attempt + 1 >= max_attempts {
                tracing::warn!(
                    request_id = %pipeline.request_id,
                    trace_id = %pipeline.trace_id(),
                    span_id = %pipeline.span_id(),
                    operation = %spec.operation,
                    attempts = attempt + 1,
                    "All retry attempts exhausted"
                );
                return result;
            }

            let backoff = self.retry.calculate_backoff(attempt);
            pipeline.logger.log_retry(
                &spec.operation,
                attempt + 1,
                max_attempts,
                backoff.as_millis() as u64,
            );
            if let Some(metrics) = &self.metrics {
                metrics.tx_retries.inc();
            }
            tokio::time::sleep(backoff).await;
            attempt += 1;
        }
    }

    async fn run_spec(&self, pipeline: &PipelineContext, spec: &TransactionSpec) -> TransactionResult {
        self.execute_in(pipeline, spec.contract, &spec.operation, spec.args.clone(), &spec.options)
            .await
    }

    async fn execute_in(
        &self,
        pipeline: &PipelineContext,
        contract: ContractId,
        operation: &str,
        args: Vec<Token>,
        options: &TransactionOptions,
    ) -> TransactionResult {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let metrics = self.metrics.clone();
        if let Some(metrics) = &metrics {
            metrics.tx_in_flight.inc();
        }
        let _in_flight = scopeguard::guard(Arc::clone(&self.in_flight), move |counter| {
            counter.fetch_sub(1, Ordering::SeqCst);
            if let Some(metrics) = &metrics {
                metrics.tx_in_flight.dec();
            }
        });

        let principal = match self.ensure_connected().await {
            Ok(address) => address,
            Err(err) => {
                pipeline
                    .logger
                    .log_local_rejection(operation, err.category(), &err.to_string());
                return TransactionResult::rejected(err.to_string());
            }
        };

        let wallet = self.ctx.wallet();
        let kind = wallet.strategy_kind();
        let target = self.ctx.target(contract);
        let request = match strategy_for(kind).prepare(target, operation, args, options.value) {
            Ok(request) => request,
            Err(err) => {
                pipeline
                    .logger
                    .log_local_rejection(operation, err.category(), &err.to_string());
                return TransactionResult::failure(err.to_parsed());
            }
        };

        let error_context = self.error_context(contract, operation, principal, options);
        pipeline
            .logger
            .log_submit(operation, contract.as_str(), &format!("{kind:?}"));
        if let Some(metrics) = &self.metrics {
            metrics.tx_submitted.inc();
        }

        let timer = Timer::new();
        let sent = match self.submit_timeout {
            Some(limit) => match tokio::time::timeout(limit, wallet.send(request)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(RawError::message(format!(
                    "Request timeout: no wallet response within {}s",
                    limit.as_secs()
                ))),
            },
            None => wallet.send(request).await,
        };
        if let Some(metrics) = &self.metrics {
            timer.observe_duration(&metrics.submit_latency);
        }

        let raw = match sent {
            Ok(SendOutcome {
                success: true,
                transaction_hash: Some(hash),
                ..
            }) => {
                pipeline
                    .logger
                    .log_success(operation, &format!("{hash:?}"), timer.elapsed_ms());
                if let Some(metrics) = &self.metrics {
                    metrics.tx_success.inc();
                }
                let message = render_success_message(options.success_message.as_deref(), operation, hash);
                return TransactionResult::success(hash, message);
            }
            Ok(SendOutcome { success: true, .. }) => {
                RawError::message("Wallet reported success without a transaction hash")
            }
            Ok(SendOutcome { error, .. }) => error.unwrap_or(RawError::Unknown),
            Err(raw) => raw,
        };

        let parsed = classify(&raw, Some(&error_context));
        log_error(&parsed, &error_context);
        pipeline.logger.log_failure(
            operation,
            parsed.error_type.as_str(),
            &parsed.message,
            timer.elapsed_ms(),
        );
        if let Some(metrics) = &self.metrics {
            metrics.record_failure(parsed.error_type.as_str());
        }
        TransactionResult::failure(parsed)
    }

    async fn ensure_connected(&self) -> Result<Address, ExecutorError> {
        let wallet = self.ctx.wallet();
        if wallet.is_connected() {
            if let Some(address) = wallet.address() {
                return Ok(address);
            }
        }
        wallet
            .request_connection()
            .await
            .map_err(|e| ExecutorError::Connection(e.to_string()))
    }

    fn error_context(
        &self,
        contract: ContractId,
        operation: &str,
        principal: Address,
        options: &TransactionOptions,
    ) -> ErrorContext {
        let mut assembled = ErrorContext::new()
            .with_operation(operation)
            .with_contract(contract.as_str())
            .with_method_name(operation)
            .with_user_address(format!("{principal:?}"));
        if let Some(value) = options.value {
            assembled = assembled.with_amount(format!("{} ETH", format_amount(value)));
        }
        match &options.error_context {
            Some(overrides) => overrides.clone().merged_over(&assembled),
            None => assembled,
        }
    }
}
