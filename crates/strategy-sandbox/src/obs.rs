//! Structured observability hooks for sandbox invocations.
//!
//! This module provides:
//! - The invocation-scoped `ExecutionSpan`
//! - Emission functions for lifecycle events: start, context degradation,
//!   program synthesis, and the terminal outcome
//!
//! Verbosity follows `RUST_LOG`; see [`crate::telemetry::init_tracing`].

use tracing::instrument::Instrumented;
use tracing::{info, warn, Instrument};

/// Invocation-scoped span carrying the execution id.
///
/// Async work is wrapped with [`ExecutionSpan::wrap`] rather than holding an
/// entered guard across `.await` points.
///
/// # Example
///
/// ```ignore
/// let span = ExecutionSpan::new("6f1c...");
/// span.wrap(async { /* events carry execution_id */ }).await;
/// ```
#[derive(Debug, Clone)]
pub struct ExecutionSpan {
    span: tracing::Span,
}

impl ExecutionSpan {
    pub fn new(execution_id: &str) -> Self {
        Self {
            span: tracing::info_span!("sandbox.execution", execution_id = %execution_id),
        }
    }

    pub fn wrap<F: std::future::Future>(&self, future: F) -> Instrumented<F> {
        future.instrument(self.span.clone())
    }
}

/// Emit event: invocation accepted.
pub fn emit_execution_started(execution_id: &str, symbols: usize, include_portfolio: bool) {
    info!(
        event = "sandbox.started",
        execution_id = %execution_id,
        symbols = symbols,
        include_portfolio = include_portfolio,
    );
}

/// Emit event: a collaborator read failed and its field was left empty.
pub fn emit_context_degraded(source: &str, symbol: Option<&str>, error: &dyn std::fmt::Display) {
    warn!(
        event = "context.degraded",
        source = %source,
        symbol = symbol.unwrap_or("-"),
        error = %error,
    );
}

/// Emit event: context gathered.
pub fn emit_context_gathered(positions: usize, symbols: usize, tracked: usize) {
    info!(
        event = "context.gathered",
        positions = positions,
        symbols = symbols,
        tracked = tracked,
    );
}

/// Emit event: program synthesized, with its content digest.
pub fn emit_program_synthesized(digest: &str, bytes: usize, requirements: &[String]) {
    info!(
        event = "program.synthesized",
        digest = %digest,
        bytes = bytes,
        requirements = ?requirements,
    );
}

/// Emit event: terminal outcome.
pub fn emit_execution_finished(execution_id: &str, outcome: &str, duration_ms: u64) {
    info!(
        event = "sandbox.finished",
        execution_id = %execution_id,
        outcome = %outcome,
        duration_ms = duration_ms,
    );
}

/// Emit event: invocation failed before or while spawning (warning level).
pub fn emit_execution_failed(execution_id: &str, kind: &str, error: &dyn std::fmt::Display) {
    warn!(
        event = "sandbox.failed",
        execution_id = %execution_id,
        kind = %kind,
        error = %error,
    );
}
