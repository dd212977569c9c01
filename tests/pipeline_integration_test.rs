//! End-to-end flows against a simulated ledger node

mod common;

use common::{program_logs, SimulatedEvents, SimulatedNode, UnavailableEvents};
use solana_sdk::{
    bpf_loader_upgradeable,
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};
use solconfirm::confirmation::{ConfirmStrategy, TrackerConfig};
use solconfirm::flows::{Pipeline, PipelineError};
use solconfirm::rpc_manager::RpcManagerError;
use solconfirm::tx_builder::{method_discriminator, TransactionBuilderError};
use solconfirm::types::{ConfirmSource, ConfirmationStatus};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

fn pipeline(node: &Arc<SimulatedNode>) -> Pipeline {
    Pipeline::new(node.clone(), TrackerConfig::default())
}

#[tokio::test(start_paused = true)]
async fn test_transfer_by_polling_finalizes() {
    let node = SimulatedNode::new();
    let payer = Keypair::new();
    let recipient = Pubkey::new_unique();

    let start = Instant::now();
    let confirmation = pipeline(&node)
        .transfer(&payer, &recipient, 100_000, ConfirmStrategy::Polling)
        .await
        .unwrap();

    assert!(confirmation.status >= ConfirmationStatus::Confirmed);
    assert_eq!(confirmation.status, ConfirmationStatus::Finalized);
    assert_eq!(confirmation.source, ConfirmSource::Polling);
    // t = 0 s unknown, 1 s confirmed, 2 s finalized
    assert_eq!(confirmation.attempts, 3);
    assert!(!confirmation.timed_out);
    assert!(start.elapsed() <= Duration::from_secs(20));

    let sent = node.submitted();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].signatures[0], confirmation.signature);
    assert_eq!(sent[0].message.header.num_required_signatures, 1);
}

#[tokio::test(start_paused = true)]
async fn test_transfer_by_subscription_releases_handle() {
    let node = SimulatedNode::new();
    let events = SimulatedEvents::new(node.clone());
    let pipeline = pipeline(&node).with_events(events.clone());
    let payer = Keypair::new();

    let confirmation = pipeline
        .transfer(
            &payer,
            &Pubkey::new_unique(),
            5_000,
            ConfirmStrategy::Subscription {
                fallback_to_polling: false,
            },
        )
        .await
        .unwrap();

    assert_eq!(confirmation.status, ConfirmationStatus::Finalized);
    assert_eq!(confirmation.source, ConfirmSource::SignatureSubscription);
    assert!(!confirmation.timed_out);
    assert!(confirmation.elapsed >= Duration::from_secs(2));
    assert!(confirmation.elapsed < Duration::from_secs(3));
    assert_eq!(events.releases(), 1);
    assert_eq!(node.submission_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_subscription_falls_back_to_polling() {
    let node = SimulatedNode::new();
    let pipeline = pipeline(&node).with_events(Arc::new(UnavailableEvents));

    let confirmation = pipeline
        .transfer(
            &Keypair::new(),
            &Pubkey::new_unique(),
            5_000,
            ConfirmStrategy::Subscription {
                fallback_to_polling: true,
            },
        )
        .await
        .unwrap();

    assert_eq!(confirmation.source, ConfirmSource::Polling);
    assert_eq!(confirmation.status, ConfirmationStatus::Finalized);
}

#[tokio::test(start_paused = true)]
async fn test_slow_finality_times_out_with_signature() {
    let node = SimulatedNode::with_finality(Duration::from_secs(60));
    let payer = Keypair::new();

    let start = Instant::now();
    let confirmation = pipeline(&node)
        .transfer(&payer, &Pubkey::new_unique(), 1, ConfirmStrategy::Polling)
        .await
        .unwrap();

    assert!(confirmation.timed_out);
    assert_eq!(confirmation.status, ConfirmationStatus::Confirmed);
    assert_eq!(confirmation.attempts, 20);
    assert!(start.elapsed() <= Duration::from_secs(20));
    assert_eq!(node.submission_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_zero_transfer_never_submits() {
    let node = SimulatedNode::new();
    let err = pipeline(&node)
        .transfer(
            &Keypair::new(),
            &Pubkey::new_unique(),
            0,
            ConfirmStrategy::Polling,
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Build(TransactionBuilderError::InvalidInstructionSet(_))
    ));
    assert_eq!(node.submission_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_expired_blockhash_asks_for_rebuild() {
    let node = SimulatedNode::new();
    node.reject_submissions(RpcManagerError::ExpiredBlockhash {
        endpoint: "simulated".to_string(),
    });
    let events = SimulatedEvents::new(node.clone());
    let pipeline = pipeline(&node).with_events(events.clone());

    let err = pipeline
        .transfer(
            &Keypair::new(),
            &Pubkey::new_unique(),
            5_000,
            ConfirmStrategy::Subscription {
                fallback_to_polling: false,
            },
        )
        .await
        .unwrap_err();

    assert!(err.requires_rebuild());
    assert_eq!(err.category(), "expired_blockhash");
    // Subscription opened before the failed send is still released
    assert_eq!(events.releases(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_rejected_submission_reports_signature() {
    let node = SimulatedNode::new();
    node.reject_submissions(RpcManagerError::transport("simulated", "connection reset"));

    let err = pipeline(&node)
        .transfer(
            &Keypair::new(),
            &Pubkey::new_unique(),
            5_000,
            ConfirmStrategy::Polling,
        )
        .await
        .unwrap_err();

    let rejected = node.rejected();
    assert_eq!(rejected.len(), 1);
    assert_eq!(err.signature(), Some(rejected[0].signatures[0]));
    assert!(matches!(err, PipelineError::Submission { .. }));
    assert!(err.is_retryable());
    assert!(!err.requires_rebuild());
    assert_eq!(node.submission_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_deploy_creates_rent_exempt_account() {
    let node = SimulatedNode::new();
    let events = SimulatedEvents::new(node.clone());
    let pipeline = pipeline(&node).with_events(events.clone());
    let payer = Keypair::new();
    let program_bytes = vec![0x7f; 2_048];

    let outcome = pipeline.deploy(&program_bytes, &payer).await.unwrap();

    assert!(outcome.is_deployed());
    assert_eq!(outcome.program_len, 2_048);
    assert_eq!(outcome.rent_exempt_lamports, node.rent_for(2_048));
    assert_eq!(
        outcome.confirmation.source,
        ConfirmSource::SignatureSubscription
    );
    assert_eq!(events.releases(), 1);

    let sent = node.submitted();
    assert_eq!(sent.len(), 1);
    let tx = &sent[0];
    assert_eq!(tx.message.header.num_required_signatures, 2);
    assert_eq!(tx.signatures.len(), 2);
    assert!(tx.verify().is_ok());
    assert!(tx.message.account_keys.contains(&outcome.program_id));
    assert!(tx
        .message
        .account_keys
        .contains(&solana_sdk::system_program::id()));
    // Owner is passed as instruction data, not as an account
    assert!(!tx
        .message
        .account_keys
        .contains(&bpf_loader_upgradeable::id()));
}

#[tokio::test(start_paused = true)]
async fn test_deploy_without_events_submits_nothing() {
    let node = SimulatedNode::new();
    let pipeline = pipeline(&node).with_events(Arc::new(UnavailableEvents));

    let err = pipeline
        .deploy(&[1, 2, 3], &Keypair::new())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Confirmation(_)));
    assert_eq!(err.category(), "subscription_setup_failed");
    assert_eq!(node.submission_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_deploy_rejects_empty_program() {
    let node = SimulatedNode::new();
    let err = pipeline(&node)
        .deploy(&[], &Keypair::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Build(TransactionBuilderError::InvalidInstructionSet(_))
    ));
    assert_eq!(node.submission_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_invoke_reads_only_its_own_logs() {
    let node = SimulatedNode::new();
    let events = SimulatedEvents::new(node.clone());
    let pipeline = pipeline(&node).with_events(events.clone());
    let payer = Keypair::new();
    let program_id = Pubkey::new_unique();
    let recipient = Pubkey::new_unique();

    let outcome = pipeline
        .invoke_amount_call(
            &program_id,
            "transfer_sol_with_cpi",
            100_000,
            &payer,
            &recipient,
        )
        .await
        .unwrap();

    assert_eq!(outcome.logs, program_logs(&program_id));
    assert_eq!(outcome.slot, Some(1_000));
    assert!(!outcome.confirmation.timed_out);
    assert_eq!(outcome.confirmation.source, ConfirmSource::LogSubscription);
    // Noise event plus the match
    assert_eq!(outcome.confirmation.attempts, 2);
    assert_eq!(events.releases(), 1);

    let sent = node.submitted();
    let message = &sent[0].message;
    let ix = &message.instructions[0];
    assert_eq!(message.account_keys[ix.program_id_index as usize], program_id);
    assert_eq!(&ix.data[..8], &method_discriminator("transfer_sol_with_cpi"));
    assert_eq!(&ix.data[8..], &100_000u64.to_le_bytes());

    let accounts: Vec<Pubkey> = ix
        .accounts
        .iter()
        .map(|i| message.account_keys[*i as usize])
        .collect();
    assert_eq!(
        accounts,
        vec![payer.pubkey(), recipient, solana_sdk::system_program::id()]
    );
}

#[tokio::test(start_paused = true)]
async fn test_invoke_needs_log_subscription() {
    let node = SimulatedNode::new();
    let pipeline = pipeline(&node).with_events(Arc::new(UnavailableEvents));

    let err = pipeline
        .invoke(
            &Pubkey::new_unique(),
            vec![0; 8],
            &Keypair::new(),
            &Pubkey::new_unique(),
        )
        .await
        .unwrap_err();

    assert!(err.is_retryable());
    assert_eq!(node.submission_count(), 0);
}
