//! Ordered pattern rules
//!
//! The order of [`RULES`] is part of the contract: the first rule whose
//! predicate matches wins, so earlier rules take precedence on overlap.

use super::raw::Inspection;
use super::revert::{classify_revert_reason, reason_of};
use super::types::{ErrorContext, ErrorType, ParsedError, Severity};

pub(crate) struct Rule {
    pub name: &'static str,
    pub matches: fn(&Inspection) -> bool,
    pub build: fn(&Inspection, &ErrorContext) -> ParsedError,
}

pub(crate) const RULES: &[Rule] = &[
    Rule {
        name: "user_rejection",
        matches: matches_user_rejection,
        build: build_user_rejection,
    },
    Rule {
        name: "network",
        matches: matches_network,
        build: build_network,
    },
    Rule {
        name: "insufficient_funds",
        matches: matches_insufficient_funds,
        build: build_insufficient_funds,
    },
    Rule {
        name: "insufficient_allowance",
        matches: matches_allowance,
        build: build_allowance,
    },
    Rule {
        name: "insufficient_voting_power",
        matches: matches_voting_power,
        build: build_voting_power,
    },
    Rule {
        name: "nonexistent_subject",
        matches: matches_nonexistent,
        build: build_nonexistent,
    },
    Rule {
        name: "incorrect_owner",
        matches: matches_incorrect_owner,
        build: build_incorrect_owner,
    },
    Rule {
        name: "self_delegation",
        matches: matches_self_delegation,
        build: build_self_delegation,
    },
    Rule {
        name: "cycle_ended",
        matches: matches_cycle_ended,
        build: build_cycle_ended,
    },
    Rule {
        name: "already_claimed",
        matches: matches_already_claimed,
        build: build_already_claimed,
    },
    Rule {
        name: "paused",
        matches: matches_paused,
        build: build_paused,
    },
    Rule {
        name: "revert_reason",
        matches: matches_revert_with_reason,
        build: build_revert_with_reason,
    },
    Rule {
        name: "access",
        matches: matches_access,
        build: build_access,
    },
];

const REJECTION_PHRASES: &[&str] = &[
    "user rejected",
    "user denied",
    "action rejected",
    "action_rejected",
    "user cancelled",
    "user canceled",
    "rejected by user",
];
const REJECTION_CODES: &[&str] = &["4001", "ACTION_REJECTED"];

const NETWORK_PHRASES: &[&str] = &[
    "network",
    "rpc",
    "timeout",
    "timed out",
    "fetch failed",
    "failed to fetch",
    "econnrefused",
    "connection refused",
];

const FUNDS_PHRASES: &[&str] = &[
    "insufficient funds",
    "insufficient balance",
    "insufficientbalance",
    "exceeds balance",
];

const ALLOWANCE_PHRASES: &[&str] = &[
    "insufficientallowance",
    "insufficient allowance",
    "exceeds allowance",
    "allowance exceeded",
];

const VOTING_POWER_PHRASES: &[&str] = &[
    "insufficient voting power",
    "not enough voting power",
    "exceeds available voting power",
];

const NONEXISTENT_PHRASES: &[&str] = &[
    "nonexistenttoken",
    "nonexistent token",
    "does not exist",
    "invalid token id",
    "invalid evermark",
];

const OWNER_PHRASES: &[&str] = &["incorrectowner", "incorrect owner", "not token owner"];

const SELF_DELEGATION_PHRASES: &[&str] = &[
    "cannot delegate to self",
    "cannot vote for own",
    "cannot vote on own",
    "self-delegation",
    "self delegation",
];

const CYCLE_ENDED_PHRASES: &[&str] = &[
    "cycle ended",
    "cycle has ended",
    "voting period ended",
    "cycle not active",
];

const PAUSED_PHRASES: &[&str] = &["enforcedpause", "contract is paused", "paused"];

const ACCESS_PHRASES: &[&str] = &[
    "unauthorized",
    "not authorized",
    "access denied",
    "accesscontrol",
    "forbidden",
    "permission denied",
];

pub(crate) fn matches_user_rejection(i: &Inspection) -> bool {
    i.code_is_any(REJECTION_CODES) || i.contains_any(REJECTION_PHRASES)
}

pub(crate) fn matches_network(i: &Inspection) -> bool {
    i.contains_any(NETWORK_PHRASES)
}

pub(crate) fn matches_insufficient_funds(i: &Inspection) -> bool {
    i.contains_any(FUNDS_PHRASES)
}

fn matches_allowance(i: &Inspection) -> bool {
    i.contains_any(ALLOWANCE_PHRASES)
}

fn matches_voting_power(i: &Inspection) -> bool {
    i.contains_any(VOTING_POWER_PHRASES)
}

fn matches_nonexistent(i: &Inspection) -> bool {
    i.contains_any(NONEXISTENT_PHRASES)
}

fn matches_incorrect_owner(i: &Inspection) -> bool {
    i.contains_any(OWNER_PHRASES)
}

fn matches_self_delegation(i: &Inspection) -> bool {
    i.contains_any(SELF_DELEGATION_PHRASES)
}

fn matches_cycle_ended(i: &Inspection) -> bool {
    i.contains_any(CYCLE_ENDED_PHRASES)
}

fn matches_already_claimed(i: &Inspection) -> bool {
    i.contains_any(&["already claimed"])
}

fn matches_paused(i: &Inspection) -> bool {
    i.contains_any(PAUSED_PHRASES)
}

/// Any domain-specific contract condition handled before the revert sub-table
pub(crate) fn matches_contract_condition(i: &Inspection) -> bool {
    matches_allowance(i)
        || matches_voting_power(i)
        || matches_nonexistent(i)
        || matches_incorrect_owner(i)
        || matches_self_delegation(i)
        || matches_cycle_ended(i)
        || matches_already_claimed(i)
        || matches_paused(i)
}

fn matches_revert_with_reason(i: &Inspection) -> bool {
    i.text.contains("revert") && reason_of(i).is_some()
}

fn matches_access(i: &Inspection) -> bool {
    i.contains_any(ACCESS_PHRASES)
}

fn build_user_rejection(_i: &Inspection, _ctx: &ErrorContext) -> ParsedError {
    ParsedError::new(
        ErrorType::UserRejection,
        Severity::Low,
        true,
        "Transaction was cancelled in your wallet",
    )
    .with_suggestions(["Try again when you are ready to confirm"])
}

fn build_network(_i: &Inspection, _ctx: &ErrorContext) -> ParsedError {
    ParsedError::new(
        ErrorType::NetworkError,
        Severity::Medium,
        true,
        "Network connection problem. Please check your connection and try again.",
    )
    .with_suggestions([
        "Check your internet connection",
        "Try again in a few moments",
        "Switch to a different RPC endpoint if the problem persists",
    ])
}

fn build_insufficient_funds(_i: &Inspection, ctx: &ErrorContext) -> ParsedError {
    let message = match &ctx.amount {
        Some(amount) => format!(
            "Insufficient funds to complete this transaction. You need at least {amount} plus gas."
        ),
        None => "Insufficient funds to complete this transaction".to_string(),
    };
    ParsedError::new(ErrorType::InsufficientFunds, Severity::High, true, message).with_suggestions([
        "Check your wallet balance",
        "Make sure you have enough ETH for gas",
        "Try a smaller amount",
    ])
}

fn build_allowance(_i: &Inspection, ctx: &ErrorContext) -> ParsedError {
    let token = ctx.token_label();
    ParsedError::new(
        ErrorType::ContractError,
        Severity::Medium,
        true,
        format!("Insufficient {token} allowance. Please approve {token} spending first."),
    )
    .with_suggestions([
        format!("Approve {token} for the staking contract"),
        "Wait for the approval to confirm, then retry".to_string(),
    ])
}

fn build_voting_power(_i: &Inspection, ctx: &ErrorContext) -> ParsedError {
    let message = match &ctx.amount {
        Some(amount) => format!("Insufficient voting power to delegate {amount}"),
        None => "Insufficient voting power for this delegation".to_string(),
    };
    ParsedError::new(ErrorType::ContractError, Severity::Medium, true, message).with_suggestions([
        "Stake more EMARK to increase your voting power",
        "Undelegate from another item first",
        "Reduce the amount",
    ])
}

fn build_nonexistent(_i: &Inspection, ctx: &ErrorContext) -> ParsedError {
    let message = match &ctx.token_id {
        Some(id) => format!("Item #{id} does not exist"),
        None => "This item does not exist".to_string(),
    };
    ParsedError::new(ErrorType::ContractError, Severity::Medium, false, message)
        .with_suggestions(["Check the item id", "Refresh the page to see current items"])
}

fn build_incorrect_owner(_i: &Inspection, ctx: &ErrorContext) -> ParsedError {
    let message = match &ctx.token_id {
        Some(id) => format!("You do not own item #{id}"),
        None => "You do not own this item".to_string(),
    };
    ParsedError::new(ErrorType::ContractError, Severity::High, false, message)
        .with_suggestions(["Make sure the correct wallet is connected"])
}

fn build_self_delegation(_i: &Inspection, _ctx: &ErrorContext) -> ParsedError {
    ParsedError::new(
        ErrorType::ContractError,
        Severity::Medium,
        false,
        "You cannot delegate voting power to your own item",
    )
    .with_suggestions(["Support items created by other users"])
}

fn build_cycle_ended(_i: &Inspection, _ctx: &ErrorContext) -> ParsedError {
    ParsedError::new(
        ErrorType::ContractError,
        Severity::Medium,
        true,
        "The voting cycle has ended",
    )
    .with_suggestions(["Wait for the next cycle to start", "Refresh to load the current cycle"])
}

fn build_already_claimed(_i: &Inspection, _ctx: &ErrorContext) -> ParsedError {
    ParsedError::new(
        ErrorType::ContractError,
        Severity::Low,
        false,
        "These rewards have already been claimed",
    )
    .with_suggestions(["Refresh to see your current rewards"])
}

fn build_paused(_i: &Inspection, _ctx: &ErrorContext) -> ParsedError {
    ParsedError::new(
        ErrorType::ContractError,
        Severity::Critical,
        false,
        "The contract is currently paused",
    )
    .with_suggestions(["Wait until the contract is unpaused", "Check project announcements"])
}

fn build_revert_with_reason(i: &Inspection, ctx: &ErrorContext) -> ParsedError {
    match reason_of(i) {
        Some(reason) => classify_revert_reason(&reason, ctx),
        None => build_unknown(i, ctx),
    }
}

fn build_access(_i: &Inspection, _ctx: &ErrorContext) -> ParsedError {
    ParsedError::new(
        ErrorType::ValidationError,
        Severity::High,
        false,
        "You are not authorized to perform this action",
    )
    .with_suggestions(["Make sure the correct wallet is connected"])
}

pub(crate) fn build_unknown(_i: &Inspection, ctx: &ErrorContext) -> ParsedError {
    let message = match &ctx.operation {
        Some(operation) => format!("An unexpected error occurred during {operation}. Please try again."),
        None => "An unexpected error occurred. Please try again.".to_string(),
    };
    ParsedError::new(ErrorType::Unknown, Severity::Medium, true, message)
        .with_suggestions(["Try again", "Refresh the page if the problem persists"])
}
