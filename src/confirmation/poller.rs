//! Fixed-interval signature status polling

use crate::metrics::metrics;
use crate::rpc_manager::LedgerRpc;
use crate::types::ConfirmationStatus;
use serde::{Deserialize, Serialize};
use solana_sdk::signature::Signature;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Polling bounds: `max_attempts` queries spaced `interval` apart, each
/// allowed at most `query_timeout`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollPolicy {
    #[serde(with = "duration_millis")]
    pub interval: Duration,
    pub max_attempts: u32,
    #[serde(with = "duration_millis", default = "default_query_timeout")]
    pub query_timeout: Duration,
}

fn default_query_timeout() -> Duration {
    Duration::from_secs(5)
}

impl PollPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
            query_timeout: default_query_timeout(),
        }
    }

    pub fn with_query_timeout(mut self, query_timeout: Duration) -> Self {
        self.query_timeout = query_timeout;
        self
    }

    /// Worst-case length of a poll loop: every attempt hits `query_timeout`
    /// and every gap between attempts is a full `interval`
    pub fn deadline(&self) -> Duration {
        let gaps = self.max_attempts.saturating_sub(1);
        self.interval
            .saturating_mul(gaps)
            .saturating_add(self.query_timeout.saturating_mul(self.max_attempts))
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), 20)
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

/// What a poll loop observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOutcome {
    /// Highest status seen across all attempts
    pub status: ConfirmationStatus,
    /// Execution error reported alongside the status, if any
    pub err: Option<String>,
    pub attempts: u32,
    pub reached_target: bool,
    pub elapsed: Duration,
}

/// Query `signature` until its status is at least `target` or the policy is
/// exhausted.
///
/// Running out of attempts is not an error: the last observed status comes
/// back with `reached_target == false`. A failed or timed-out query still
/// counts as an attempt, and every attempt is made unless the target is
/// reached first. Statuses are folded with `max`, so a lagging node can never
/// make the reported status go backwards. The loop never outlives
/// [`PollPolicy::deadline`].
pub async fn poll_until<R>(
    rpc: &R,
    signature: &Signature,
    target: ConfirmationStatus,
    policy: &PollPolicy,
) -> PollOutcome
where
    R: LedgerRpc + ?Sized,
{
    let started = Instant::now();
    let mut status = ConfirmationStatus::Unknown;
    let mut err = None;
    let mut attempts = 0u32;

    while attempts < policy.max_attempts {
        attempts += 1;
        metrics().poll_attempts.inc();

        match tokio::time::timeout(policy.query_timeout, rpc.signature_status(signature)).await {
            Ok(Ok(Some(observed))) => {
                status = status.max(observed.status);
                if observed.err.is_some() {
                    err = observed.err;
                }
                debug!(%signature, attempt = attempts, status = %observed.status, "Polled signature status");
            }
            Ok(Ok(None)) => {
                debug!(%signature, attempt = attempts, "Signature not yet known to node");
            }
            Ok(Err(e)) => {
                metrics().poll_query_errors.inc();
                warn!(%signature, attempt = attempts, error = %e, "Status query failed");
            }
            Err(_) => {
                metrics().poll_query_errors.inc();
                warn!(
                    %signature,
                    attempt = attempts,
                    timeout_ms = policy.query_timeout.as_millis() as u64,
                    "Status query timed out"
                );
            }
        }

        if status >= target {
            break;
        }
        if attempts < policy.max_attempts {
            tokio::time::sleep(policy.interval).await;
        }
    }

    PollOutcome {
        status,
        err,
        attempts,
        reached_target: status >= target,
        elapsed: started.elapsed(),
    }
}
