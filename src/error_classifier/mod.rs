//! Error classification engine
//!
//! Turns opaque, inconsistently shaped failures (wallet rejections, RPC
//! faults, contract revert strings) into a typed [`ParsedError`].
//!
//! ## Contract
//!
//! - [`classify`] is total: it never panics and always returns a non-empty
//!   message.
//! - Matching is a first-match-wins walk over an ordered rule table:
//!   cancellation, connectivity, funds, domain contract conditions, revert
//!   reasons, access, then the unknown fallback.
//! - Type, severity and retryability are derived from the same matched rule,
//!   so the output is a pure function of `(raw, context)`.

mod display;
mod raw;
mod revert;
mod rules;
mod types;

pub use display::{display_title, format_for_display, log_error, DisplayError};
pub use raw::{RawError, StructuredError};
pub use revert::{classify_revert_reason, extract_revert_reason};
pub use types::{ErrorContext, ErrorType, ParsedError, Severity};

use rules::{build_unknown, RULES};

/// Classify a raw failure, optionally enriched with call-site context
pub fn classify(raw: &RawError, context: Option<&ErrorContext>) -> ParsedError {
    let empty = ErrorContext::default();
    let ctx = context.unwrap_or(&empty);
    let inspection = raw.inspect();

    let (rule_name, parsed) = RULES
        .iter()
        .find(|rule| (rule.matches)(&inspection))
        .map(|rule| (rule.name, (rule.build)(&inspection, ctx)))
        .unwrap_or_else(|| ("unknown", build_unknown(&inspection, ctx)));

    tracing::trace!(rule = rule_name, error_type = %parsed.error_type, "classified error");

    let parsed = parsed.with_original(inspection.original);
    match (parsed.details.is_none(), raw.details()) {
        (true, Some(details)) => parsed.with_details(details.clone()),
        _ => parsed,
    }
}

/// Cancellation phrase or code
pub fn is_user_rejection(raw: &RawError) -> bool {
    rules::matches_user_rejection(&raw.inspect())
}

/// Balance or funds shortfall
pub fn is_insufficient_funds(raw: &RawError) -> bool {
    rules::matches_insufficient_funds(&raw.inspect())
}

/// Connectivity or RPC transport failure
pub fn is_network_error(raw: &RawError) -> bool {
    rules::matches_network(&raw.inspect())
}

/// Contract revert or a known contract condition
pub fn is_contract_error(raw: &RawError) -> bool {
    let inspection = raw.inspect();
    inspection.text.contains("revert") || rules::matches_contract_condition(&inspection)
}

pub fn is_retryable(raw: &RawError) -> bool {
    classify(raw, None).is_retryable
}
