//! Structured logging and pipeline context

use crate::types::Confirmation;
use solana_sdk::signature::Signature;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Structured logger for submission pipeline events
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    context_id: String,
}

impl StructuredLogger {
    pub fn new(context_id: String) -> Self {
        Self { context_id }
    }

    pub fn context_id(&self) -> &str {
        &self.context_id
    }

    pub fn log_build(&self, instructions: usize, signers: usize, size: usize) {
        tracing::debug!(
            context_id = %self.context_id,
            instructions = %instructions,
            signers = %signers,
            size_bytes = %size,
            "Transaction built"
        );
    }

    pub fn log_submission(&self, signature: &Signature, latency_ms: u64) {
        tracing::info!(
            context_id = %self.context_id,
            signature = %signature,
            latency_ms = %latency_ms,
            "Transaction submitted"
        );
    }

    pub fn log_submission_failure(&self, category: &str, error: &str) {
        tracing::warn!(
            context_id = %self.context_id,
            category = %category,
            error = %error,
            "Transaction submission failed"
        );
    }

    pub fn log_subscription(&self, target: &str, opened: bool) {
        tracing::debug!(
            context_id = %self.context_id,
            target = %target,
            opened = %opened,
            "Subscription setup"
        );
    }

    pub fn log_confirmation(&self, confirmation: &Confirmation) {
        let elapsed_ms = confirmation.elapsed.as_millis() as u64;
        if confirmation.timed_out {
            tracing::warn!(
                context_id = %self.context_id,
                signature = %confirmation.signature,
                status = %confirmation.status,
                source = %confirmation.source,
                attempts = %confirmation.attempts,
                elapsed_ms = %elapsed_ms,
                "Confirmation not reached before timeout"
            );
        } else if let Some(err) = &confirmation.err {
            tracing::warn!(
                context_id = %self.context_id,
                signature = %confirmation.signature,
                status = %confirmation.status,
                error = %err,
                "Transaction landed with an error"
            );
        } else {
            tracing::info!(
                context_id = %self.context_id,
                signature = %confirmation.signature,
                status = %confirmation.status,
                source = %confirmation.source,
                attempts = %confirmation.attempts,
                elapsed_ms = %elapsed_ms,
                "Transaction confirmed"
            );
        }
    }
}

/// Per-flow execution context
#[derive(Debug, Clone)]
pub struct PipelineContext {
    /// Correlation ID shared by every event of one flow
    pub correlation_id: String,

    /// Operation name
    pub operation: String,

    /// Unix timestamp (seconds) the flow started
    pub timestamp: u64,

    pub logger: StructuredLogger,
}

impl PipelineContext {
    pub fn new(operation: &str) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let correlation_id = Uuid::new_v4().to_string();

        Self {
            correlation_id: correlation_id.clone(),
            operation: operation.to_string(),
            timestamp,
            logger: StructuredLogger::new(correlation_id),
        }
    }

    /// Span carrying the correlation id for everything the flow logs
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "flow",
            operation = %self.operation,
            correlation_id = %self.correlation_id
        )
    }
}

impl Default for PipelineContext {
    fn default() -> Self {
        Self::new("default")
    }
}
