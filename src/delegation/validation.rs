//! Local pre-flight checks for delegation requests
//!
//! Everything here is deterministic and runs against the cached snapshot
//! only. Failures are reported as [`DelegationError`] and never classified.

use ethers::types::U256;
use nonempty::NonEmpty;
use serde::Serialize;
use thiserror::Error;

use crate::error_classifier::{ErrorType, ParsedError, Severity};
use crate::state_cache::VotingPower;
use crate::types::{format_amount, parse_positive_amount, InputError, SubjectId};

/// Delegate `amount` voting power to `subject` in the current cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DelegationRequest {
    pub subject: SubjectId,
    pub amount: U256,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DelegationError {
    #[error("{0}")]
    Input(#[from] InputError),

    #[error("Please connect your wallet first")]
    NotConnected,

    #[error("Voting power is not loaded yet. Please wait and try again.")]
    VotingPowerUnavailable,

    #[error("Insufficient voting power. Available: {available} wEMARK")]
    ExceedsAvailable { requested: String, available: String },

    #[error("Delegation data for Evermark #{0} is not loaded yet. Please wait and try again.")]
    DelegationUnavailable(SubjectId),

    #[error("Cannot undelegate more than delegated. Currently delegated: {delegated} wEMARK")]
    ExceedsDelegated { requested: String, delegated: String },

    #[error("Batch must contain at least one delegation")]
    EmptyBatch,

    #[error("Got {subjects} items but {amounts} amounts")]
    LengthMismatch { subjects: usize, amounts: usize },

    #[error("Batch of {len} exceeds the limit of {max} delegations")]
    BatchTooLarge { len: usize, max: usize },
}

impl DelegationError {
    /// Typed failure synthesized directly, without classification
    pub fn to_parsed(&self) -> ParsedError {
        let retryable = matches!(
            self,
            DelegationError::VotingPowerUnavailable | DelegationError::DelegationUnavailable(_)
        );
        let suggestions: &[&str] = match self {
            DelegationError::ExceedsAvailable { .. } => &[
                "Reduce the amount",
                "Stake more EMARK to increase your voting power",
            ],
            DelegationError::ExceedsDelegated { .. } => &["Reduce the amount to at most what you delegated"],
            DelegationError::NotConnected => &["Connect your wallet"],
            _ => &["Check your input and try again"],
        };
        ParsedError::new(ErrorType::ValidationError, Severity::Low, retryable, self.to_string())
            .with_suggestions(suggestions.iter().copied())
    }
}

pub fn parse_request(subject: &str, amount: &str) -> Result<DelegationRequest, DelegationError> {
    let amount = parse_positive_amount(amount)?;
    let subject = subject.parse::<SubjectId>()?;
    Ok(DelegationRequest { subject, amount })
}

/// Shape checks first, then each pair, all before any network interaction
pub fn parse_batch<S, A>(
    subjects: &[S],
    amounts: &[A],
    max_batch_size: usize,
) -> Result<NonEmpty<DelegationRequest>, DelegationError>
where
    S: AsRef<str>,
    A: AsRef<str>,
{
    if subjects.len() != amounts.len() {
        return Err(DelegationError::LengthMismatch {
            subjects: subjects.len(),
            amounts: amounts.len(),
        });
    }
    if subjects.len() > max_batch_size {
        return Err(DelegationError::BatchTooLarge {
            len: subjects.len(),
            max: max_batch_size,
        });
    }
    let requests = subjects
        .iter()
        .zip(amounts)
        .map(|(subject, amount)| parse_request(subject.as_ref(), amount.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;
    NonEmpty::from_vec(requests).ok_or(DelegationError::EmptyBatch)
}

pub fn batch_total(requests: &NonEmpty<DelegationRequest>) -> U256 {
    requests
        .iter()
        .fold(U256::zero(), |acc, r| acc.saturating_add(r.amount))
}

pub fn check_available(requested: U256, voting: Option<&VotingPower>) -> Result<(), DelegationError> {
    let voting = voting.ok_or(DelegationError::VotingPowerUnavailable)?;
    if requested > voting.available() {
        return Err(DelegationError::ExceedsAvailable {
            requested: format_amount(requested),
            available: format_amount(voting.available()),
        });
    }
    Ok(())
}

pub fn check_delegated(
    subject: SubjectId,
    requested: U256,
    delegated: Option<U256>,
) -> Result<(), DelegationError> {
    let delegated = delegated.ok_or(DelegationError::DelegationUnavailable(subject))?;
    if requested > delegated {
        return Err(DelegationError::ExceedsDelegated {
            requested: format_amount(requested),
            delegated: format_amount(delegated),
        });
    }
    Ok(())
}
