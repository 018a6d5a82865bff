//! Revert-reason sub-classifier
//!
//! Applied when a failure says "reverted" and a reason string can be pulled
//! out of it. Same first-match-wins discipline as the top-level rules, over a
//! smaller table of phrases contracts put in `require` messages.

use super::raw::Inspection;
use super::types::{ErrorContext, ErrorType, ParsedError, Severity};
use once_cell::sync::Lazy;
use regex::Regex;

static REVERT_REASON: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r#"(?i)\brevert(?:ed)?\b(?:\s+with\s+reason\s+string\s*|\s*:\s*)(.+?)\s*(?:$|\n|\()"#)
        .ok()
});

/// Pull the reason string out of a revert message, if there is one
pub fn extract_revert_reason(message: &str) -> Option<String> {
    let regex = REVERT_REASON.as_ref()?;
    let captured = regex.captures(message)?.get(1)?.as_str().trim();
    let cleaned = strip_wrapping_quotes(captured).trim_end_matches(['.', ',']).trim();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

/// Remove one pair of quotes only when they wrap the whole reason
fn strip_wrapping_quotes(text: &str) -> &str {
    for quote in ['\'', '"'] {
        if let Some(inner) = text.strip_prefix(quote).and_then(|t| t.strip_suffix(quote)) {
            return inner.trim();
        }
    }
    text
}

pub(crate) fn reason_of(inspection: &Inspection) -> Option<String> {
    inspection
        .reason
        .clone()
        .filter(|r| !r.trim().is_empty())
        .or_else(|| extract_revert_reason(&inspection.original))
}

struct RevertRule {
    phrases: &'static [&'static str],
    build: fn(&str, &ErrorContext) -> ParsedError,
}

const REVERT_RULES: &[RevertRule] = &[
    RevertRule {
        phrases: &["insufficient balance", "exceeds balance", "balance too low", "balance"],
        build: revert_balance,
    },
    RevertRule {
        phrases: &["allowance"],
        build: revert_allowance,
    },
    RevertRule {
        phrases: &["already claimed"],
        build: revert_already_claimed,
    },
    RevertRule {
        phrases: &["not owner", "not the owner", "caller is not"],
        build: revert_not_owner,
    },
    RevertRule {
        phrases: &["invalid amount", "amount must be", "zero amount"],
        build: revert_invalid_amount,
    },
    RevertRule {
        phrases: &["cycle not ended", "cycle not finalized", "cycle has not ended"],
        build: revert_cycle_not_ended,
    },
    RevertRule {
        phrases: &["already voted"],
        build: revert_already_voted,
    },
    RevertRule {
        phrases: &["deadline passed", "deadline", "expired"],
        build: revert_deadline_passed,
    },
];

/// Classify a revert reason. Unmatched reasons become a generic retryable
/// contract error that keeps the raw reason text.
pub fn classify_revert_reason(reason: &str, context: &ErrorContext) -> ParsedError {
    let lowered = reason.to_lowercase();
    let parsed = REVERT_RULES
        .iter()
        .find(|rule| rule.phrases.iter().any(|p| lowered.contains(p)))
        .map(|rule| (rule.build)(reason, context))
        .unwrap_or_else(|| {
            ParsedError::new(
                ErrorType::ContractError,
                Severity::Medium,
                true,
                format!("Transaction reverted: {reason}"),
            )
            .with_suggestions([
                "Check the transaction parameters",
                "Try again in a few moments",
            ])
        });
    parsed.with_details(serde_json::json!({ "revert_reason": reason }))
}

fn revert_balance(_reason: &str, ctx: &ErrorContext) -> ParsedError {
    let token = ctx.token_label();
    let message = match &ctx.amount {
        Some(amount) => format!("Insufficient {token} balance for {amount}"),
        None => format!("Insufficient {token} balance"),
    };
    ParsedError::new(ErrorType::InsufficientFunds, Severity::High, true, message)
        .with_suggestions([
            format!("Check your {token} balance"),
            "Reduce the amount and try again".to_string(),
        ])
}

fn revert_allowance(_reason: &str, ctx: &ErrorContext) -> ParsedError {
    let token = ctx.token_label();
    ParsedError::new(
        ErrorType::ContractError,
        Severity::Medium,
        true,
        format!("Insufficient {token} allowance. Please approve {token} spending first."),
    )
    .with_suggestions([format!("Approve {token} spending"), "Then retry the transaction".to_string()])
}

fn revert_already_claimed(_reason: &str, _ctx: &ErrorContext) -> ParsedError {
    ParsedError::new(
        ErrorType::ContractError,
        Severity::Low,
        false,
        "These rewards have already been claimed",
    )
    .with_suggestions(["Refresh to see your current rewards"])
}

fn revert_not_owner(_reason: &str, ctx: &ErrorContext) -> ParsedError {
    let message = match &ctx.token_id {
        Some(id) => format!("You are not the owner of item #{id}"),
        None => "You are not the owner of this item".to_string(),
    };
    ParsedError::new(ErrorType::ContractError, Severity::High, false, message)
        .with_suggestions(["Make sure the correct wallet is connected"])
}

fn revert_invalid_amount(_reason: &str, _ctx: &ErrorContext) -> ParsedError {
    ParsedError::new(
        ErrorType::ValidationError,
        Severity::Medium,
        false,
        "The amount is not valid for this operation",
    )
    .with_suggestions(["Enter an amount greater than zero", "Check the allowed range"])
}

fn revert_cycle_not_ended(_reason: &str, _ctx: &ErrorContext) -> ParsedError {
    ParsedError::new(
        ErrorType::ContractError,
        Severity::Low,
        true,
        "The current voting cycle has not ended yet",
    )
    .with_suggestions(["Wait for the cycle to end and try again"])
}

fn revert_already_voted(_reason: &str, _ctx: &ErrorContext) -> ParsedError {
    ParsedError::new(
        ErrorType::ContractError,
        Severity::Low,
        false,
        "You have already voted for this item in the current cycle",
    )
    .with_suggestions(["Choose a different item", "Wait for the next cycle"])
}

fn revert_deadline_passed(_reason: &str, _ctx: &ErrorContext) -> ParsedError {
    ParsedError::new(
        ErrorType::ContractError,
        Severity::Medium,
        false,
        "The deadline for this action has passed",
    )
    .with_suggestions(["Refresh to see the current cycle"])
}
