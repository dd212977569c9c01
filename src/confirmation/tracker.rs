//! Confirmation tracker
//!
//! Turns a submitted signature into a [`Confirmation`], either by polling or
//! by waiting on a subscription opened by the caller.

use crate::confirmation::errors::ConfirmationError;
use crate::confirmation::poller::{poll_until, PollPolicy};
use crate::confirmation::pubsub::{EventSource, LogFilter};
use crate::confirmation::subscription::{await_matching, SubscriptionHandle, WaitOutcome};
use crate::metrics::metrics;
use crate::rpc_manager::LedgerRpc;
use crate::types::{ConfirmSource, Confirmation, ConfirmationEvent, ConfirmationStatus};
use serde::{Deserialize, Serialize};
use solana_sdk::{pubkey::Pubkey, signature::Signature};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// How to wait for a submitted signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ConfirmStrategy {
    /// Repeated status queries
    Polling,
    /// Signature subscription raced against the subscription timeout.
    ///
    /// With `fallback_to_polling`, a subscription that cannot be opened (or
    /// whose stream ends early) is replaced by polling. Without it, setup
    /// failure aborts the flow before anything is submitted.
    Subscription { fallback_to_polling: bool },
}

impl Default for ConfirmStrategy {
    fn default() -> Self {
        ConfirmStrategy::Polling
    }
}

/// Settings shared by every wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerConfig {
    pub target: ConfirmationStatus,
    pub poll: PollPolicy,
    pub subscription_timeout: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            target: ConfirmationStatus::Finalized,
            poll: PollPolicy::default(),
            subscription_timeout: Duration::from_secs(30),
        }
    }
}

/// Log lines matched to one signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogsWait {
    pub confirmation: Confirmation,
    pub logs: Vec<String>,
    pub slot: Option<u64>,
}

pub struct ConfirmationTracker {
    rpc: Arc<dyn LedgerRpc>,
    events: Option<Arc<dyn EventSource>>,
    config: TrackerConfig,
}

impl ConfirmationTracker {
    pub fn new(rpc: Arc<dyn LedgerRpc>, config: TrackerConfig) -> Self {
        Self {
            rpc,
            events: None,
            config,
        }
    }

    pub fn with_events(mut self, events: Arc<dyn EventSource>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn has_events(&self) -> bool {
        self.events.is_some()
    }

    /// Status a matching subscription event stands for
    fn subscribed_status(&self) -> ConfirmationStatus {
        self.config.target.max(ConfirmationStatus::Processed)
    }

    fn event_source(&self, target: &str) -> Result<&Arc<dyn EventSource>, ConfirmationError> {
        self.events.as_ref().ok_or_else(|| {
            ConfirmationError::setup_failed("none", target, "no event source configured")
        })
    }

    /// Poll until the target status or the poll policy runs out
    pub async fn poll(&self, signature: &Signature) -> Confirmation {
        let outcome = poll_until(
            self.rpc.as_ref(),
            signature,
            self.config.target,
            &self.config.poll,
        )
        .await;

        let confirmation = Confirmation {
            signature: *signature,
            status: outcome.status,
            err: outcome.err,
            source: ConfirmSource::Polling,
            attempts: outcome.attempts,
            elapsed: outcome.elapsed,
            timed_out: !outcome.reached_target,
        };
        record(&confirmation);
        confirmation
    }

    pub async fn subscribe_signature(
        &self,
        signature: &Signature,
    ) -> Result<SubscriptionHandle, ConfirmationError> {
        let target = format!("signature {}", signature);
        self.event_source(&target)?
            .subscribe_signature(signature, self.config.target.commitment())
            .await
    }

    /// Log subscription for transactions mentioning `program_id`
    pub async fn subscribe_program_logs(
        &self,
        program_id: &Pubkey,
    ) -> Result<SubscriptionHandle, ConfirmationError> {
        let filter = LogFilter::Mentions(*program_id);
        self.event_source(&filter.to_string())?
            .subscribe_logs(filter, self.config.target.commitment())
            .await
    }

    /// Wait on an open signature subscription.
    ///
    /// `started` is when the transaction was submitted. On timeout one last
    /// status query fills in whatever the node knows, without waiting further.
    pub async fn await_signature(
        &self,
        signature: &Signature,
        handle: SubscriptionHandle,
        started: Instant,
        fallback_to_polling: bool,
    ) -> Confirmation {
        let mut events_read = 0u32;
        let outcome = await_matching(handle, self.config.subscription_timeout, |event| {
            events_read += 1;
            event.is_terminal() && event.signature_str() == signature.to_string()
        })
        .await;

        let confirmation = match outcome {
            WaitOutcome::Event(event) => {
                debug!(%signature, slot = event.slot(), "Signature notification received");
                Confirmation {
                    signature: *signature,
                    status: self.subscribed_status(),
                    err: event.err().map(str::to_string),
                    source: ConfirmSource::SignatureSubscription,
                    attempts: events_read,
                    elapsed: started.elapsed(),
                    timed_out: false,
                }
            }
            WaitOutcome::StreamEnded if fallback_to_polling => {
                warn!(%signature, "Subscription stream ended, falling back to polling");
                return self.poll(signature).await;
            }
            WaitOutcome::StreamEnded | WaitOutcome::TimedOut => {
                let (status, err) = self.last_known_status(signature).await;
                info!(%signature, %status, "Confirmation wait timed out");
                Confirmation {
                    signature: *signature,
                    status,
                    err,
                    source: ConfirmSource::SignatureSubscription,
                    attempts: events_read,
                    elapsed: started.elapsed(),
                    timed_out: status < self.config.target,
                }
            }
        };
        record(&confirmation);
        confirmation
    }

    /// Wait on an open log subscription for the logs of `signature`.
    ///
    /// Log events for other transactions touching the same program are
    /// skipped.
    pub async fn await_logs(
        &self,
        signature: &Signature,
        handle: SubscriptionHandle,
        started: Instant,
    ) -> LogsWait {
        let wanted = signature.to_string();
        let mut events_read = 0u32;
        let outcome = await_matching(handle, self.config.subscription_timeout, |event| {
            events_read += 1;
            matches!(event, ConfirmationEvent::Logs { .. }) && event.signature_str() == wanted
        })
        .await;

        let wait = match outcome {
            WaitOutcome::Event(ConfirmationEvent::Logs {
                slot, logs, err, ..
            }) => {
                for line in &logs {
                    debug!(%signature, log = %line, "Program log");
                }
                LogsWait {
                    confirmation: Confirmation {
                        signature: *signature,
                        status: self.subscribed_status(),
                        err,
                        source: ConfirmSource::LogSubscription,
                        attempts: events_read,
                        elapsed: started.elapsed(),
                        timed_out: false,
                    },
                    logs,
                    slot: Some(slot),
                }
            }
            _ => {
                let (status, err) = self.last_known_status(signature).await;
                info!(%signature, %status, "Log wait ended without matching logs");
                LogsWait {
                    confirmation: Confirmation {
                        signature: *signature,
                        status,
                        err,
                        source: ConfirmSource::LogSubscription,
                        attempts: events_read,
                        elapsed: started.elapsed(),
                        timed_out: true,
                    },
                    logs: Vec::new(),
                    slot: None,
                }
            }
        };
        record(&wait.confirmation);
        wait
    }

    /// Single best-effort status lookup
    async fn last_known_status(
        &self,
        signature: &Signature,
    ) -> (ConfirmationStatus, Option<String>) {
        match self.rpc.signature_status(signature).await {
            Ok(Some(s)) => (s.status, s.err),
            Ok(None) => (ConfirmationStatus::Unknown, None),
            Err(e) => {
                warn!(%signature, error = %e, "Final status lookup failed");
                (ConfirmationStatus::Unknown, None)
            }
        }
    }
}

fn record(confirmation: &Confirmation) {
    let outcome = if confirmation.err.is_some() {
        "failed"
    } else if confirmation.timed_out {
        "timed_out"
    } else {
        confirmation.status.as_str()
    };
    metrics().record_confirmation(outcome, confirmation.elapsed.as_secs_f64());
}
