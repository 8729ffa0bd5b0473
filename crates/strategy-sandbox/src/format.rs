//! Rendering outcomes for callers.

use serde::{Deserialize, Serialize};

use crate::outcome::{ExecutionOutcome, OutcomeKind};

const STDERR_SEPARATOR: &str = "\n--- STDERR ---\n";

/// Render an outcome as the text handed back to the caller. Never fails.
pub fn format_outcome(outcome: &ExecutionOutcome) -> String {
    match &outcome.kind {
        OutcomeKind::Completed => {
            let mut text = outcome.stdout.clone();
            if !outcome.stderr.trim().is_empty() {
                text.push_str(STDERR_SEPARATOR);
                text.push_str(&outcome.stderr);
            }
            text
        }
        OutcomeKind::TimedOut { budget } => format!(
            "TIMEOUT: Strategy execution exceeded {} second limit",
            budget_seconds(budget.as_secs_f64())
        ),
        OutcomeKind::Failed {
            error_kind,
            message,
        } => format!("EXECUTION ERROR: {error_kind}: {message}"),
    }
}

/// `30` for whole seconds, `1.5` otherwise.
fn budget_seconds(secs: f64) -> String {
    if secs.fract() == 0.0 {
        format!("{secs:.0}")
    } else {
        format!("{secs}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Success,
    Timeout,
    Error,
}

/// Machine-readable form of [`format_outcome`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedResult {
    pub status: ResultStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_status: Option<i32>,
    pub duration_ms: u64,
}

pub fn format_structured(outcome: &ExecutionOutcome) -> FormattedResult {
    let (status, error_type) = match &outcome.kind {
        OutcomeKind::Completed => (ResultStatus::Success, None),
        OutcomeKind::TimedOut { .. } => (ResultStatus::Timeout, Some("TimeoutError".to_string())),
        OutcomeKind::Failed { error_kind, .. } => (ResultStatus::Error, Some(error_kind.clone())),
    };
    FormattedResult {
        status,
        message: format_outcome(outcome),
        error_type,
        exit_status: outcome.exit_status,
        duration_ms: outcome.duration_ms(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn completed(stdout: &str, stderr: &str) -> ExecutionOutcome {
        ExecutionOutcome {
            kind: OutcomeKind::Completed,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            exit_status: Some(0),
            duration: Duration::from_millis(42),
        }
    }

    #[test]
    fn test_completed_stdout_only() {
        assert_eq!(format_outcome(&completed("2\n", "")), "2\n");
        assert_eq!(format_outcome(&completed("2\n", " \n\t")), "2\n");
    }

    #[test]
    fn test_completed_with_stderr() {
        assert_eq!(
            format_outcome(&completed("out\n", "warning: x\n")),
            "out\n\n--- STDERR ---\nwarning: x\n"
        );
    }

    #[test]
    fn test_timeout_message() {
        let mut outcome = completed("partial", "");
        outcome.kind = OutcomeKind::TimedOut {
            budget: Duration::from_secs(30),
        };
        assert_eq!(
            format_outcome(&outcome),
            "TIMEOUT: Strategy execution exceeded 30 second limit"
        );
        outcome.kind = OutcomeKind::TimedOut {
            budget: Duration::from_millis(1500),
        };
        assert_eq!(
            format_outcome(&outcome),
            "TIMEOUT: Strategy execution exceeded 1.5 second limit"
        );
    }

    #[test]
    fn test_failed_message() {
        let outcome = ExecutionOutcome {
            kind: OutcomeKind::Failed {
                error_kind: "SpawnError".to_string(),
                message: "failed to spawn uv: not found".to_string(),
            },
            stdout: String::new(),
            stderr: String::new(),
            exit_status: None,
            duration: Duration::ZERO,
        };
        assert_eq!(
            format_outcome(&outcome),
            "EXECUTION ERROR: SpawnError: failed to spawn uv: not found"
        );
    }

    #[test]
    fn test_structured_serialization() {
        let value = serde_json::to_value(format_structured(&completed("2\n", ""))).unwrap();
        assert_eq!(
            value,
            json!({"status": "success", "message": "2\n", "exit_status": 0, "duration_ms": 42})
        );

        let mut timed_out = completed("", "");
        timed_out.kind = OutcomeKind::TimedOut {
            budget: Duration::from_secs(1),
        };
        timed_out.exit_status = None;
        let result = format_structured(&timed_out);
        assert_eq!(result.status, ResultStatus::Timeout);
        assert_eq!(result.error_type.as_deref(), Some("TimeoutError"));
    }
}
