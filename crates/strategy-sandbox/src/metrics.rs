//! Global atomic counters for sandbox observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. on daemon shutdown).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lock-free atomic counters.
pub struct Metrics {
    executions_started: AtomicU64,
    executions_completed: AtomicU64,
    executions_timed_out: AtomicU64,
    executions_failed: AtomicU64,
    context_degradations: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            executions_started: AtomicU64::new(0),
            executions_completed: AtomicU64::new(0),
            executions_timed_out: AtomicU64::new(0),
            executions_failed: AtomicU64::new(0),
            context_degradations: AtomicU64::new(0),
        }
    }

    pub fn inc_started(&self) {
        self.executions_started.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "executions_started", "counter incremented");
    }

    pub fn inc_completed(&self) {
        self.executions_completed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "executions_completed", "counter incremented");
    }

    pub fn inc_timed_out(&self) {
        self.executions_timed_out.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "executions_timed_out", "counter incremented");
    }

    pub fn inc_failed(&self) {
        self.executions_failed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "executions_failed", "counter incremented");
    }

    /// One collaborator read replaced by an empty default.
    pub fn inc_context_degraded(&self) {
        self.context_degradations.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "context_degradations", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            executions_started = self.executions_started(),
            executions_completed = self.executions_completed(),
            executions_timed_out = self.executions_timed_out(),
            executions_failed = self.executions_failed(),
            context_degradations = self.context_degradations(),
        );
    }

    pub fn executions_started(&self) -> u64 {
        self.executions_started.load(Ordering::Relaxed)
    }

    pub fn executions_completed(&self) -> u64 {
        self.executions_completed.load(Ordering::Relaxed)
    }

    pub fn executions_timed_out(&self) -> u64 {
        self.executions_timed_out.load(Ordering::Relaxed)
    }

    pub fn executions_failed(&self) -> u64 {
        self.executions_failed.load(Ordering::Relaxed)
    }

    pub fn context_degradations(&self) -> u64 {
        self.context_degradations.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.executions_started.store(0, Ordering::Relaxed);
        self.executions_completed.store(0, Ordering::Relaxed);
        self.executions_timed_out.store(0, Ordering::Relaxed);
        self.executions_failed.store(0, Ordering::Relaxed);
        self.context_degradations.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_increment() {
        let m = Metrics::new();
        m.inc_started();
        m.inc_started();
        m.inc_completed();
        m.inc_timed_out();
        m.inc_failed();
        m.inc_context_degraded();
        m.inc_context_degraded();
        m.inc_context_degraded();

        assert_eq!(m.executions_started(), 2);
        assert_eq!(m.executions_completed(), 1);
        assert_eq!(m.executions_timed_out(), 1);
        assert_eq!(m.executions_failed(), 1);
        assert_eq!(m.context_degradations(), 3);
    }

    #[test]
    fn reset_zeroes_all() {
        let m = Metrics::new();
        m.inc_started();
        m.inc_failed();
        m.inc_context_degraded();
        m.reset();
        assert_eq!(m.executions_started(), 0);
        assert_eq!(m.executions_failed(), 0);
        assert_eq!(m.context_degradations(), 0);
    }
}
