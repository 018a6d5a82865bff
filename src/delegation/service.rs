//! Delegation domain service
//!
//! Reads the cached snapshot for pre-flight checks, submits through the
//! executor and refreshes the cache after a successful write.

use ethers::abi::Token;
use ethers::types::{Address, U256};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};

use super::validation::{
    batch_total, check_available, check_delegated, parse_batch, parse_request, DelegationError,
    DelegationRequest,
};
use crate::config::DelegationConfig;
use crate::contracts::ContractId;
use crate::error_classifier::ErrorContext;
use crate::metrics::Metrics;
use crate::state_cache::{UserDataCache, UserDataSnapshot};
use crate::tx_executor::{TransactionExecutor, TransactionOptions, TransactionResult};
use crate::types::{format_amount, SubjectId};

/// Observable lifecycle of one delegation call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DelegationPhase {
    Idle,
    Validating,
    RejectedLocally,
    Submitting,
    SubmittedSuccess,
    CacheRefreshing,
    SubmittedFailure,
}

const TRANSITION_BUFFER: usize = 32;

/// Current phase plus an ordered feed of every transition.
///
/// `CacheRefreshing` outlives the call that entered it and is cleared by
/// the immediate refresh, unless a newer call has moved the phase on.
struct PhaseCell {
    current: watch::Sender<DelegationPhase>,
    transitions: broadcast::Sender<DelegationPhase>,
    refresh_generation: AtomicU64,
}

impl PhaseCell {
    fn new() -> Self {
        let (current, _) = watch::channel(DelegationPhase::Idle);
        let (transitions, _) = broadcast::channel(TRANSITION_BUFFER);
        Self {
            current,
            transitions,
            refresh_generation: AtomicU64::new(0),
        }
    }

    fn set(&self, phase: DelegationPhase) {
        self.current.send_replace(phase);
        // no subscribers is fine
        let _ = self.transitions.send(phase);
    }

    /// End of a call; a pending refresh keeps its phase
    fn settle(&self) {
        if *self.current.borrow() != DelegationPhase::CacheRefreshing {
            self.set(DelegationPhase::Idle);
        }
    }

    fn begin_refresh(&self) -> u64 {
        self.set(DelegationPhase::CacheRefreshing);
        self.refresh_generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn finish_refresh(&self, generation: u64) {
        let latest = self.refresh_generation.load(Ordering::SeqCst) == generation;
        if latest && *self.current.borrow() == DelegationPhase::CacheRefreshing {
            self.set(DelegationPhase::Idle);
        }
    }
}

pub struct DelegationService {
    executor: Arc<TransactionExecutor>,
    cache: Arc<UserDataCache>,
    config: DelegationConfig,
    phase: Arc<PhaseCell>,
    metrics: Option<Arc<Metrics>>,
}

impl DelegationService {
    pub fn new(executor: Arc<TransactionExecutor>, cache: Arc<UserDataCache>, config: DelegationConfig) -> Self {
        Self {
            executor,
            cache,
            config,
            phase: Arc::new(PhaseCell::new()),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Latest phase only
    pub fn subscribe(&self) -> watch::Receiver<DelegationPhase> {
        self.phase.current.subscribe()
    }

    /// Every transition in order, including short-lived ones such as
    /// `SubmittedSuccess`
    pub fn transitions(&self) -> broadcast::Receiver<DelegationPhase> {
        self.phase.transitions.subscribe()
    }

    pub fn phase(&self) -> DelegationPhase {
        *self.phase.current.borrow()
    }

    fn set_phase(&self, phase: DelegationPhase) {
        self.phase.set(phase);
    }

    fn principal(&self) -> Option<Address> {
        self.executor.context().principal()
    }

    fn cached_snapshot(&self) -> Result<(Address, Arc<UserDataSnapshot>), DelegationError> {
        let principal = self.principal().ok_or(DelegationError::NotConnected)?;
        let snapshot = self
            .cache
            .snapshot(principal)
            .unwrap_or_else(|| Arc::new(UserDataSnapshot::empty(principal)));
        Ok((principal, snapshot))
    }

    /// Add a subject to the delegations section and read it, so `undelegate`
    /// can check against it
    pub async fn track_subject(&self, subject: SubjectId) -> Option<Arc<UserDataSnapshot>> {
        let principal = self.principal()?;
        self.cache.watch_subject(principal, subject);
        Some(self.cache.refetch_delegations(principal).await)
    }

    pub async fn delegate(&self, subject: &str, amount: &str) -> TransactionResult {
        let _settle = scopeguard::guard(&self.phase, |phase| phase.settle());
        self.set_phase(DelegationPhase::Validating);

        let checked = parse_request(subject, amount).and_then(|request| {
            let (principal, snapshot) = self.cached_snapshot()?;
            check_available(request.amount, snapshot.voting.data.as_ref())?;
            Ok((principal, request))
        });
        let (principal, request) = match checked {
            Ok(checked) => checked,
            Err(err) => return self.reject("delegate", err),
        };
        self.cache.watch_subject(principal, request.subject);

        let options = self.options(
            "delegate",
            &request,
            format!(
                "Delegated {} wEMARK to Evermark #{}",
                format_amount(request.amount),
                request.subject
            ),
        );
        let args = vec![Token::Uint(request.subject.as_u256()), Token::Uint(request.amount)];
        self.submit(principal, "delegateVotes", args, options).await
    }

    pub async fn undelegate(&self, subject: &str, amount: &str) -> TransactionResult {
        let _settle = scopeguard::guard(&self.phase, |phase| phase.settle());
        self.set_phase(DelegationPhase::Validating);

        let checked = parse_request(subject, amount).and_then(|request| {
            let (principal, snapshot) = self.cached_snapshot()?;
            self.cache.watch_subject(principal, request.subject);
            check_delegated(request.subject, request.amount, snapshot.delegated_to(request.subject))?;
            Ok((principal, request))
        });
        let (principal, request) = match checked {
            Ok(checked) => checked,
            Err(err) => return self.reject("undelegate", err),
        };

        let options = self.options(
            "undelegate",
            &request,
            format!(
                "Removed {} wEMARK from Evermark #{}",
                format_amount(request.amount),
                request.subject
            ),
        );
        let args = vec![Token::Uint(request.subject.as_u256()), Token::Uint(request.amount)];
        self.submit(principal, "undelegateVotes", args, options).await
    }

    pub async fn delegate_batch<S, A>(&self, subjects: &[S], amounts: &[A]) -> TransactionResult
    where
        S: AsRef<str>,
        A: AsRef<str>,
    {
        let _settle = scopeguard::guard(&self.phase, |phase| phase.settle());
        self.set_phase(DelegationPhase::Validating);

        let checked = parse_batch(subjects, amounts, self.config.max_batch_size).and_then(|requests| {
            let (principal, snapshot) = self.cached_snapshot()?;
            check_available(batch_total(&requests), snapshot.voting.data.as_ref())?;
            Ok((principal, requests))
        });
        let (principal, requests) = match checked {
            Ok(checked) => checked,
            Err(err) => return self.reject("delegate_batch", err),
        };
        for request in requests.iter() {
            self.cache.watch_subject(principal, request.subject);
        }

        let total = batch_total(&requests);
        let ids = requests.iter().map(|r| Token::Uint(r.subject.as_u256())).collect();
        let values = requests.iter().map(|r| Token::Uint(r.amount)).collect();
        let options = TransactionOptions::new()
            .with_success_message(format!(
                "Delegated {} wEMARK across {} Evermarks",
                format_amount(total),
                requests.len()
            ))
            .with_error_context(
                ErrorContext::new()
                    .with_operation("delegate_batch")
                    .with_amount(format!("{} wEMARK", format_amount(total))),
            );
        self.submit(
            principal,
            "delegateVotesBatch",
            vec![Token::Array(ids), Token::Array(values)],
            options,
        )
        .await
    }

    fn options(&self, operation: &str, request: &DelegationRequest, success: String) -> TransactionOptions {
        TransactionOptions::new()
            .with_success_message(success)
            .with_error_context(
                ErrorContext::new()
                    .with_operation(operation)
                    .with_amount(format!("{} wEMARK", format_amount(request.amount)))
                    .with_token_id(request.subject.to_string()),
            )
    }

    fn reject(&self, operation: &str, err: DelegationError) -> TransactionResult {
        self.set_phase(DelegationPhase::RejectedLocally);
        tracing::info!(operation, reason = %err, "delegation rejected locally");
        if let Some(metrics) = &self.metrics {
            metrics.delegation_local_rejections.inc();
        }
        TransactionResult::failure(err.to_parsed())
    }

    async fn submit(
        &self,
        principal: Address,
        operation: &str,
        args: Vec<Token>,
        options: TransactionOptions,
    ) -> TransactionResult {
        self.set_phase(DelegationPhase::Submitting);
        let result = self
            .executor
            .execute(ContractId::EvermarkVoting, operation, args, options)
            .await;
        if result.is_success() {
            self.set_phase(DelegationPhase::SubmittedSuccess);
            self.schedule_refresh(principal);
        } else {
            self.set_phase(DelegationPhase::SubmittedFailure);
        }
        result
    }

    /// Immediate best-effort refresh plus a delayed one for indexing lag.
    /// Both are detached from the caller; the phase stays `CacheRefreshing`
    /// until the immediate one lands.
    fn schedule_refresh(&self, principal: Address) {
        self.cache.invalidate(principal);
        let generation = self.phase.begin_refresh();

        let cache = Arc::clone(&self.cache);
        let phase = Arc::clone(&self.phase);
        tokio::spawn(async move {
            cache.refetch(principal).await;
            phase.finish_refresh(generation);
        });

        let cache = Arc::clone(&self.cache);
        let delay: Duration = self.config.refresh_delay();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            cache.invalidate(principal);
            let snapshot = cache.refetch(principal).await;
            tracing::debug!(
                principal = ?principal,
                available = ?snapshot.available_voting_power().map(format_amount),
                "post-delegation refresh complete"
            );
        });
    }

    pub fn available_voting_power(&self) -> Option<U256> {
        let principal = self.principal()?;
        self.cache.snapshot(principal)?.available_voting_power()
    }
}
