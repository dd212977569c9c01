//! Subscription handles and the event/timeout race
//!
//! A [`SubscriptionHandle`] is the exclusive owner of one live event channel.
//! Its release callback runs exactly once: on [`SubscriptionHandle::close`]
//! or, failing that, when the handle is dropped. The wait functions take the
//! handle by value and close it on every exit path.

use crate::metrics::metrics;
use crate::types::ConfirmationEvent;
use std::fmt;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::debug;

type ReleaseFn = Box<dyn FnOnce() + Send>;

/// Live event channel bound to a signature or a log filter
pub struct SubscriptionHandle {
    label: String,
    events: mpsc::UnboundedReceiver<ConfirmationEvent>,
    release_fn: Option<ReleaseFn>,
    opened_at: Instant,
}

impl SubscriptionHandle {
    /// Wrap an event receiver; `release_fn` tears the subscription down
    pub fn new<F>(
        label: impl Into<String>,
        events: mpsc::UnboundedReceiver<ConfirmationEvent>,
        release_fn: F,
    ) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        metrics().subscription_opened();
        Self {
            label: label.into(),
            events,
            release_fn: Some(Box::new(release_fn)),
            opened_at: Instant::now(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Next event, or `None` once the source has closed the channel
    pub async fn next_event(&mut self) -> Option<ConfirmationEvent> {
        self.events.recv().await
    }

    /// Release the subscription now
    pub fn close(mut self) {
        self.release("explicit");
    }

    fn release(&mut self, release_type: &'static str) {
        if let Some(release_fn) = self.release_fn.take() {
            release_fn();
            metrics().subscription_released();
            debug!(
                subscription = %self.label,
                held_for_ms = self.opened_at.elapsed().as_millis() as u64,
                release_type,
                "Subscription released"
            );
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.release("drop");
    }
}

impl fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("label", &self.label)
            .field("released", &self.release_fn.is_none())
            .finish_non_exhaustive()
    }
}

/// How a subscription wait ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    Event(ConfirmationEvent),
    /// No matching event before the deadline
    TimedOut,
    /// The source closed the channel before any matching event
    StreamEnded,
}

impl WaitOutcome {
    pub fn event(&self) -> Option<&ConfirmationEvent> {
        match self {
            WaitOutcome::Event(event) => Some(event),
            _ => None,
        }
    }

    pub fn is_timed_out(&self) -> bool {
        matches!(self, WaitOutcome::TimedOut)
    }
}

/// Wait for the first event, racing it against `timeout`.
///
/// The handle is closed before returning, whichever side wins.
pub async fn await_event(handle: SubscriptionHandle, timeout: Duration) -> WaitOutcome {
    await_matching(handle, timeout, |_| true).await
}

/// Read events until one satisfies `predicate`, all under one deadline.
///
/// Non-matching events are discarded. When the deadline passes the wait ends
/// immediately with [`WaitOutcome::TimedOut`], regardless of how many events
/// are still arriving.
pub async fn await_matching<P>(
    mut handle: SubscriptionHandle,
    timeout: Duration,
    mut predicate: P,
) -> WaitOutcome
where
    P: FnMut(&ConfirmationEvent) -> bool,
{
    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);
    let mut skipped = 0u32;

    let outcome = loop {
        // Checked every iteration: a flooding source keeps the event branch
        // ready and can exhaust the task budget before the sleep is polled.
        if deadline.is_elapsed() {
            break WaitOutcome::TimedOut;
        }
        tokio::select! {
            biased;

            _ = &mut deadline => break WaitOutcome::TimedOut,
            event = handle.next_event() => match event {
                Some(event) if predicate(&event) => break WaitOutcome::Event(event),
                Some(_) => skipped += 1,
                None => break WaitOutcome::StreamEnded,
            },
        }
    };

    if outcome.is_timed_out() {
        metrics().subscription_timeouts.inc();
    }
    debug!(
        subscription = %handle.label(),
        skipped,
        timed_out = outcome.is_timed_out(),
        "Subscription wait finished"
    );
    handle.close();
    outcome
}
