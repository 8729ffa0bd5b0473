//! Terminal result of one script invocation.

use std::time::Duration;

use crate::error::SandboxError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeKind {
    /// The child exited on its own, whatever its exit status.
    Completed,
    /// The budget expired and the child was killed.
    TimedOut { budget: Duration },
    /// The invocation never produced a running program.
    Failed { error_kind: String, message: String },
}

impl OutcomeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::TimedOut { .. } => "timed_out",
            Self::Failed { .. } => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
    pub kind: OutcomeKind,
    pub stdout: String,
    pub stderr: String,
    pub exit_status: Option<i32>,
    pub duration: Duration,
}

impl ExecutionOutcome {
    pub fn failed(err: &SandboxError) -> Self {
        Self {
            kind: OutcomeKind::Failed {
                error_kind: err.kind_name().to_string(),
                message: err.to_string(),
            },
            stdout: String::new(),
            stderr: String::new(),
            exit_status: None,
            duration: Duration::ZERO,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.kind, OutcomeKind::Completed)
    }

    pub fn is_timed_out(&self) -> bool {
        matches!(self.kind, OutcomeKind::TimedOut { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.kind, OutcomeKind::Failed { .. })
    }

    pub fn duration_ms(&self) -> u64 {
        u64::try_from(self.duration.as_millis()).unwrap_or(u64::MAX)
    }
}
