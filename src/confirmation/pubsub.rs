//! Event sources for subscription-based confirmation
//!
//! [`PubsubEvents`] opens websocket subscriptions on a shared
//! `PubsubClient`. Each subscription runs in its own task that forwards
//! notifications into the handle's channel and unsubscribes when the handle
//! is released.

use crate::confirmation::errors::ConfirmationError;
use crate::confirmation::subscription::SubscriptionHandle;
use crate::types::ConfirmationEvent;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use solana_client::nonblocking::pubsub_client::PubsubClient;
use solana_client::rpc_config::{
    RpcSignatureSubscribeConfig, RpcTransactionLogsConfig, RpcTransactionLogsFilter,
};
use solana_client::rpc_response::{Response, RpcLogsResponse, RpcSignatureResult};
use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey, signature::Signature};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// Which transactions a log subscription reports
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFilter {
    /// Every non-vote transaction
    All,
    /// Transactions that reference this account
    Mentions(Pubkey),
}

impl LogFilter {
    fn to_rpc(&self) -> RpcTransactionLogsFilter {
        match self {
            LogFilter::All => RpcTransactionLogsFilter::All,
            LogFilter::Mentions(key) => RpcTransactionLogsFilter::Mentions(vec![key.to_string()]),
        }
    }
}

impl fmt::Display for LogFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFilter::All => f.write_str("logs:all"),
            LogFilter::Mentions(key) => write!(f, "logs:{}", key),
        }
    }
}

/// Source of confirmation events
#[async_trait]
pub trait EventSource: Send + Sync {
    fn endpoint(&self) -> &str;

    /// Subscribe to the confirmation of one signature at `commitment`
    async fn subscribe_signature(
        &self,
        signature: &Signature,
        commitment: CommitmentConfig,
    ) -> Result<SubscriptionHandle, ConfirmationError>;

    /// Subscribe to program log output matching `filter`
    async fn subscribe_logs(
        &self,
        filter: LogFilter,
        commitment: CommitmentConfig,
    ) -> Result<SubscriptionHandle, ConfirmationError>;
}

/// Websocket event source
pub struct PubsubEvents {
    ws_url: String,
    client: Arc<PubsubClient>,
}

impl PubsubEvents {
    pub async fn connect(ws_url: &str) -> Result<Self, ConfirmationError> {
        info!(ws_url, "Connecting to pubsub endpoint");
        let client = PubsubClient::new(ws_url)
            .await
            .map_err(|e| ConfirmationError::setup_failed(ws_url, "connection", e.to_string()))?;
        Ok(Self {
            ws_url: ws_url.to_string(),
            client: Arc::new(client),
        })
    }

    /// Spawn the forwarding task and wait until it reports whether the
    /// subscription was accepted
    async fn open<Fut>(
        &self,
        label: String,
        task: impl FnOnce(mpsc::UnboundedSender<ConfirmationEvent>, oneshot::Sender<Result<(), String>>, oneshot::Receiver<()>) -> Fut,
    ) -> Result<SubscriptionHandle, ConfirmationError>
    where
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = oneshot::channel();
        let (close_tx, close_rx) = oneshot::channel();

        tokio::spawn(task(event_tx, ready_tx, close_rx));

        match ready_rx.await {
            Ok(Ok(())) => {
                debug!(subscription = %label, "Subscription opened");
                Ok(SubscriptionHandle::new(label, event_rx, move || {
                    let _ = close_tx.send(());
                }))
            }
            Ok(Err(reason)) => {
                warn!(subscription = %label, %reason, "Subscription rejected");
                Err(ConfirmationError::setup_failed(&self.ws_url, label, reason))
            }
            Err(_) => Err(ConfirmationError::setup_failed(
                &self.ws_url,
                label,
                "subscription task ended before setup",
            )),
        }
    }
}

/// Forward notifications until the stream ends, the handle is released, or
/// the receiver is gone
async fn forward<T, S, F>(
    mut stream: S,
    mut close_rx: oneshot::Receiver<()>,
    events: mpsc::UnboundedSender<ConfirmationEvent>,
    map: F,
) where
    S: Stream<Item = T> + Unpin,
    F: Fn(T) -> ConfirmationEvent,
{
    loop {
        tokio::select! {
            _ = &mut close_rx => break,
            item = stream.next() => match item {
                Some(item) => {
                    if events.send(map(item)).is_err() {
                        break;
                    }
                }
                None => break,
            },
        }
    }
}

pub(crate) fn signature_event(
    signature: Signature,
    response: Response<RpcSignatureResult>,
) -> ConfirmationEvent {
    let slot = response.context.slot;
    match response.value {
        RpcSignatureResult::ProcessedSignature(result) => ConfirmationEvent::Signature {
            signature,
            slot,
            err: result.err.map(|e| format!("{:?}", e)),
        },
        RpcSignatureResult::ReceivedSignature(_) => ConfirmationEvent::Received { signature, slot },
    }
}

pub(crate) fn logs_event(response: Response<RpcLogsResponse>) -> ConfirmationEvent {
    let value = response.value;
    ConfirmationEvent::Logs {
        signature: value.signature,
        slot: response.context.slot,
        logs: value.logs,
        err: value.err.map(|e| format!("{:?}", e)),
    }
}

#[async_trait]
impl EventSource for PubsubEvents {
    fn endpoint(&self) -> &str {
        &self.ws_url
    }

    async fn subscribe_signature(
        &self,
        signature: &Signature,
        commitment: CommitmentConfig,
    ) -> Result<SubscriptionHandle, ConfirmationError> {
        let client = self.client.clone();
        let signature = *signature;

        self.open(format!("signature {}", signature), move |events, ready, close_rx| async move {
            let config = RpcSignatureSubscribeConfig {
                commitment: Some(commitment),
                enable_received_notification: Some(false),
            };
            let (stream, unsubscribe) = match client.signature_subscribe(&signature, Some(config)).await {
                Ok(subscription) => subscription,
                Err(e) => {
                    let _ = ready.send(Err(e.to_string()));
                    return;
                }
            };
            let _ = ready.send(Ok(()));
            forward(stream, close_rx, events, |response| signature_event(signature, response)).await;
            unsubscribe().await;
        })
        .await
    }

    async fn subscribe_logs(
        &self,
        filter: LogFilter,
        commitment: CommitmentConfig,
    ) -> Result<SubscriptionHandle, ConfirmationError> {
        let client = self.client.clone();

        self.open(filter.to_string(), move |events, ready, close_rx| async move {
            let config = RpcTransactionLogsConfig {
                commitment: Some(commitment),
            };
            let (stream, unsubscribe) = match client.logs_subscribe(filter.to_rpc(), config).await {
                Ok(subscription) => subscription,
                Err(e) => {
                    let _ = ready.send(Err(e.to_string()));
                    return;
                }
            };
            let _ = ready.send(Ok(()));
            forward(stream, close_rx, events, logs_event).await;
            unsubscribe().await;
        })
        .await
    }
}
