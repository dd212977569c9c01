#![cfg(feature = "devnet")]

//! Live checks against the public devnet cluster.
//!
//! Run with `--features devnet -- --ignored`. The transfer test also needs a
//! funded devnet keypair in `payerKey` (environment or `.env`).

use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey};
use solconfirm::confirmation::{await_event, EventSource, LogFilter, PubsubEvents, WaitOutcome};
use solconfirm::rpc_manager::{Cluster, RpcEndpointConfig};
use solconfirm::wallet::{Wallet, DEFAULT_PAYER_ENV};
use solconfirm::{ConfirmStrategy, ConfirmationStatus, LedgerRpc, Pipeline, SolanaRpc, TrackerConfig};
use std::sync::Arc;
use std::time::Duration;

fn devnet_rpc() -> SolanaRpc {
    SolanaRpc::new(RpcEndpointConfig::default(), CommitmentConfig::confirmed())
        .expect("default endpoint config is valid")
}

#[tokio::test]
#[ignore] // Ignore by default as it requires network access
async fn test_devnet_blockhash_and_block() {
    let rpc = devnet_rpc();
    assert_eq!(rpc.endpoint(), Cluster::Devnet.http_url());

    let blockhash = rpc.latest_blockhash().await.expect("Failed to fetch blockhash");
    assert!(blockhash.last_valid_block_height > 0);

    let block = rpc.block(None).await;
    assert!(block.is_ok(), "Failed to fetch latest block: {:?}", block);
}

#[tokio::test]
#[ignore] // Ignore by default as it requires network access
async fn test_devnet_unknown_signature_has_no_status() {
    let rpc = devnet_rpc();
    let status = rpc
        .signature_status(&solana_sdk::signature::Signature::default())
        .await
        .expect("Status query failed");
    assert!(status.is_none());
}

#[tokio::test]
#[ignore] // Ignore by default as it requires network access
async fn test_devnet_log_subscription_delivers() {
    let events = PubsubEvents::connect(Cluster::Devnet.ws_url())
        .await
        .expect("Failed to connect to pubsub");

    let handle = events
        .subscribe_logs(LogFilter::All, CommitmentConfig::confirmed())
        .await
        .expect("Log subscription rejected");

    let outcome = await_event(handle, Duration::from_secs(60)).await;
    assert!(
        matches!(outcome, WaitOutcome::Event(_)),
        "No log notification: {:?}",
        outcome
    );
}

#[tokio::test]
#[ignore] // Ignore by default as it requires network access and a funded payer
async fn test_devnet_transfer_confirms() {
    dotenvy::dotenv().ok();
    let wallet = Wallet::from_env(DEFAULT_PAYER_ENV).expect("payerKey must hold a devnet keypair");

    let events = PubsubEvents::connect(Cluster::Devnet.ws_url())
        .await
        .expect("Failed to connect to pubsub");
    let config = TrackerConfig {
        target: ConfirmationStatus::Confirmed,
        ..TrackerConfig::default()
    };
    let pipeline = Pipeline::new(Arc::new(devnet_rpc()), config).with_events(Arc::new(events));

    // Above the rent-exempt minimum, so the new account is accepted
    let confirmation = pipeline
        .transfer(
            wallet.keypair(),
            &Pubkey::new_unique(),
            1_000_000,
            ConfirmStrategy::Subscription {
                fallback_to_polling: true,
            },
        )
        .await
        .expect("Transfer failed");

    assert!(confirmation.is_confirmed(), "Not confirmed: {:?}", confirmation);
}
