//! Confirmation Tracker
//!
//! Decides whether a submitted signature reached its target status.
//!
//! - **poller**: fixed-interval status queries under an attempt count and a deadline
//! - **subscription**: exclusively owned event channels and the event/timeout race
//! - **pubsub**: websocket event source
//! - **tracker**: strategy selection and [`Confirmation`](crate::types::Confirmation) assembly

pub mod errors;
pub use errors::ConfirmationError;

pub mod poller;
pub mod pubsub;
pub mod subscription;
mod tracker;

pub use poller::{poll_until, PollOutcome, PollPolicy};
pub use pubsub::{EventSource, LogFilter, PubsubEvents};
pub use subscription::{await_event, await_matching, SubscriptionHandle, WaitOutcome};
pub use tracker::{ConfirmStrategy, ConfirmationTracker, LogsWait, TrackerConfig};
