//! Property tests for the error classifier and derived snapshot values

use emark_client::error_classifier::{classify, display_title, ErrorContext, ErrorType, RawError};
use emark_client::state_cache::VotingPower;
use emark_client::types::{format_amount, parse_amount};
use ethers::types::U256;
use proptest::prelude::*;

proptest! {
    #[test]
    fn classify_is_total(text in ".{0,200}", operation in proptest::option::of("[a-zA-Z]{1,16}")) {
        let context = operation.map(|op| ErrorContext::new().with_operation(op));
        let parsed = classify(&RawError::message(text), context.as_ref());
        prop_assert!(!parsed.message.is_empty());
        prop_assert!(!display_title(&parsed).is_empty());
    }

    #[test]
    fn classify_is_deterministic(text in ".{0,120}") {
        let raw = RawError::message(text);
        prop_assert_eq!(classify(&raw, None), classify(&raw, None));
    }

    #[test]
    fn cancellation_phrase_always_wins(
        prefix in "[a-z ]{0,20}",
        suffix in "[a-z ]{0,20}",
        phrase in prop::sample::select(vec!["user rejected", "User denied", "ACTION_REJECTED"]),
    ) {
        let parsed = classify(&RawError::message(format!("{prefix}{phrase}{suffix} network timeout")), None);
        prop_assert_eq!(parsed.error_type, ErrorType::UserRejection);
        prop_assert!(parsed.is_retryable);
        prop_assert!(!parsed.allows_auto_retry());
    }

    #[test]
    fn structured_json_shapes_are_total(code in any::<i64>(), message in ".{0,60}") {
        let raw = RawError::from(serde_json::json!({ "code": code, "message": message }));
        prop_assert!(!classify(&raw, None).message.is_empty());
    }

    #[test]
    fn reserved_power_identity(total in any::<u64>(), available in any::<u64>()) {
        let power = VotingPower::new(U256::from(total), U256::from(available), U256::zero());
        prop_assert!(power.available() <= power.total());
        prop_assert_eq!(power.reserved() + power.available(), power.total());
    }

    #[test]
    fn amount_format_parses_back(whole in 0u64..1_000_000, frac in 0u32..1_000) {
        let text = format!("{whole}.{frac:03}");
        let amount = parse_amount(&text).unwrap();
        prop_assert_eq!(parse_amount(&format_amount(amount)).unwrap(), amount);
    }
}
