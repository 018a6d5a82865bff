//! Integration tests for vote delegation
//!
//! This test validates:
//! - Local rejections never reach the wallet
//! - Error messages name the relevant limit
//! - Batch shape checks
//! - Immediate and delayed cache refresh after success
//! - Phase transitions, with idle reached once the refresh lands

mod common;

use std::time::Duration;

use common::{script_reads, tokens, u, Harness, PRINCIPAL};
use emark_client::contracts::ContractId;
use emark_client::delegation::DelegationPhase;
use emark_client::error_classifier::ErrorType;
use emark_client::types::SubjectId;
use emark_client::wallet::{MockWallet, StrategyKind, WalletRequest};
use ethers::abi::Token;

async fn loaded(available: u64) -> Harness {
    let harness = Harness::new(StrategyKind::Declarative);
    script_reads(&harness.reader, 100, available);
    harness.cache.load(PRINCIPAL).await;
    harness
}

#[tokio::test]
async fn test_delegate_over_available_rejected_locally() {
    let harness = loaded(40).await;
    let service = harness.delegation(2_000);

    let result = service.delegate("7", "50").await;

    assert!(!result.is_success());
    assert_eq!(result.error(), Some("Insufficient voting power. Available: 40 wEMARK"));
    let parsed = result.parsed().unwrap();
    assert_eq!(parsed.error_type, ErrorType::ValidationError);
    assert_eq!(harness.wallet.send_count(), 0);
    assert_eq!(service.phase(), DelegationPhase::Idle);
}

#[tokio::test]
async fn test_delegate_without_snapshot_rejected() {
    let harness = Harness::new(StrategyKind::Declarative);
    let service = harness.delegation(2_000);

    let result = service.delegate("7", "1").await;

    assert!(!result.is_success());
    assert!(result.error().unwrap().contains("not loaded"));
    assert_eq!(harness.wallet.send_count(), 0);
    assert_eq!(harness.reader.call_count(), 0);
}

#[tokio::test]
async fn test_delegate_rejects_bad_input() {
    let harness = loaded(40).await;
    let service = harness.delegation(2_000);

    for (subject, amount) in [("7", "0"), ("7", "-1"), ("7", "abc"), ("0", "1"), ("x", "1")] {
        let result = service.delegate(subject, amount).await;
        assert!(!result.is_success(), "{subject}/{amount}");
    }
    assert_eq!(harness.wallet.send_count(), 0);
}

#[tokio::test]
async fn test_delegate_when_disconnected() {
    let harness = Harness::with_wallet(MockWallet::new_disconnected(PRINCIPAL, StrategyKind::Declarative));
    let service = harness.delegation(2_000);

    let result = service.delegate("7", "1").await;

    assert_eq!(result.error(), Some("Please connect your wallet first"));
    assert_eq!(harness.wallet.send_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_delegate_success_submits_and_refreshes_twice() {
    let harness = loaded(40).await;
    let service = harness.delegation(2_000);
    let before = harness.reader.calls_to("getCurrentCycle");

    let result = service.delegate("7", "10").await;

    assert!(result.is_success());
    assert_eq!(service.phase(), DelegationPhase::CacheRefreshing);
    match result {
        emark_client::TransactionResult::Success { message, .. } => {
            assert_eq!(message, "Delegated 10 wEMARK to Evermark #7");
        }
        other => panic!("unexpected {other:?}"),
    }

    match &harness.wallet.sent()[0] {
        WalletRequest::Prepared(call) => {
            assert_eq!(call.contract, ContractId::EvermarkVoting);
            assert_eq!(call.function.name, "delegateVotes");
            assert_eq!(call.args, vec![u(7), Token::Uint(tokens(10))]);
        }
        other => panic!("expected prepared call, got {other:?}"),
    }
    assert!(harness
        .cache
        .watched_subjects(PRINCIPAL)
        .contains(&SubjectId::new(7).unwrap()));

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(harness.reader.calls_to("getCurrentCycle"), before + 1);
    assert_eq!(service.phase(), DelegationPhase::Idle);

    tokio::time::sleep(Duration::from_millis(2_100)).await;
    assert_eq!(harness.reader.calls_to("getCurrentCycle"), before + 2);
    assert_eq!(service.phase(), DelegationPhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_failed_submission_does_not_refresh() {
    let harness = loaded(40).await;
    let service = harness.delegation(2_000);
    harness.wallet.push_failure("User rejected the request.");
    let before = harness.reader.call_count();

    let result = service.delegate("7", "10").await;

    assert_eq!(result.parsed().unwrap().error_type, ErrorType::UserRejection);
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(harness.reader.call_count(), before);
    assert_eq!(service.phase(), DelegationPhase::Idle);
}

#[tokio::test]
async fn test_undelegate_over_delegated_names_delegated_amount() {
    let harness = loaded(40).await;
    harness.reader.set_for_args(
        ContractId::EvermarkVoting,
        "getUserVotesForEvermark",
        vec![Token::Address(PRINCIPAL), u(7)],
        vec![Token::Uint(tokens(5))],
    );
    let service = harness.delegation(2_000);
    service.track_subject(SubjectId::new(7).unwrap()).await;

    let result = service.undelegate("7", "10").await;

    assert_eq!(
        result.error(),
        Some("Cannot undelegate more than delegated. Currently delegated: 5 wEMARK")
    );
    assert_eq!(harness.wallet.send_count(), 0);
}

#[tokio::test]
async fn test_undelegate_untracked_subject_rejected_then_tracked() {
    let harness = loaded(40).await;
    let service = harness.delegation(2_000);

    let result = service.undelegate("9", "1").await;

    assert!(!result.is_success());
    assert!(result.parsed().unwrap().is_retryable);
    assert!(harness
        .cache
        .watched_subjects(PRINCIPAL)
        .contains(&SubjectId::new(9).unwrap()));
    assert_eq!(harness.wallet.send_count(), 0);
}

#[tokio::test]
async fn test_undelegate_within_delegated_submits() {
    let harness = loaded(40).await;
    harness.reader.set_for_args(
        ContractId::EvermarkVoting,
        "getUserVotesForEvermark",
        vec![Token::Address(PRINCIPAL), u(7)],
        vec![Token::Uint(tokens(5))],
    );
    let service = harness.delegation(2_000);
    service.track_subject(SubjectId::new(7).unwrap()).await;

    let result = service.undelegate("7", "5").await;

    assert!(result.is_success());
    match &harness.wallet.sent()[0] {
        WalletRequest::Prepared(call) => assert_eq!(call.function.name, "undelegateVotes"),
        other => panic!("expected prepared call, got {other:?}"),
    }
}

#[tokio::test]
async fn test_batch_shape_checks_before_network() {
    let harness = loaded(40).await;
    let service = harness.delegation(2_000);
    let reads = harness.reader.call_count();

    let mismatch = service.delegate_batch(&["1", "2"], &["1"]).await;
    assert_eq!(mismatch.error(), Some("Got 2 items but 1 amounts"));

    let empty = service.delegate_batch::<&str, &str>(&[], &[]).await;
    assert_eq!(empty.error(), Some("Batch must contain at least one delegation"));

    let over = service.delegate_batch(&["1", "2"], &["30", "20"]).await;
    assert_eq!(over.error(), Some("Insufficient voting power. Available: 40 wEMARK"));

    let too_many: Vec<String> = (1..=11).map(|i| i.to_string()).collect();
    let amounts = vec!["1"; 11];
    let large = service.delegate_batch(&too_many, &amounts).await;
    assert!(!large.is_success());

    assert_eq!(harness.wallet.send_count(), 0);
    assert_eq!(harness.reader.call_count(), reads);
}

#[tokio::test]
async fn test_batch_submits_parallel_arrays() {
    let harness = Harness::new(StrategyKind::ManualEncoding);
    script_reads(&harness.reader, 100, 40);
    harness.cache.load(PRINCIPAL).await;
    let service = harness.delegation(2_000);

    let result = service.delegate_batch(&["1", "2"], &["15", "25"]).await;

    assert!(result.is_success());
    match &harness.wallet.sent()[0] {
        WalletRequest::Raw(tx) => {
            assert_eq!(tx.to, harness.address(ContractId::EvermarkVoting));
            let function = harness
                .context
                .target(ContractId::EvermarkVoting)
                .function("delegateVotesBatch")
                .unwrap();
            assert_eq!(&tx.data[..4], &function.short_signature()[..]);
        }
        other => panic!("expected raw envelope, got {other:?}"),
    }
    assert_eq!(harness.cache.watched_subjects(PRINCIPAL).len(), 2);
}

#[tokio::test]
async fn test_phase_observable_and_reset() {
    let harness = loaded(40).await;
    let service = harness.delegation(2_000);
    let mut phases = service.subscribe();

    service.delegate("7", "500").await;

    assert!(phases.has_changed().unwrap());
    assert_eq!(*phases.borrow_and_update(), DelegationPhase::Idle);
    assert_eq!(service.phase(), DelegationPhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_success_transitions_through_refresh() {
    let harness = loaded(40).await;
    let service = harness.delegation(2_000);
    let mut transitions = service.transitions();

    let result = service.delegate("7", "10").await;
    assert!(result.is_success());
    tokio::time::sleep(Duration::from_millis(10)).await;

    let mut seen = Vec::new();
    while let Ok(phase) = transitions.try_recv() {
        seen.push(phase);
    }
    assert_eq!(
        seen,
        vec![
            DelegationPhase::Validating,
            DelegationPhase::Submitting,
            DelegationPhase::SubmittedSuccess,
            DelegationPhase::CacheRefreshing,
            DelegationPhase::Idle,
        ]
    );
}

#[tokio::test]
async fn test_rejection_transitions_straight_to_idle() {
    let harness = loaded(40).await;
    let service = harness.delegation(2_000);
    let mut transitions = service.transitions();

    service.delegate("7", "500").await;

    let mut seen = Vec::new();
    while let Ok(phase) = transitions.try_recv() {
        seen.push(phase);
    }
    assert_eq!(
        seen,
        vec![
            DelegationPhase::Validating,
            DelegationPhase::RejectedLocally,
            DelegationPhase::Idle,
        ]
    );
}
