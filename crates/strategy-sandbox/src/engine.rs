//! The sandbox engine: gather, synthesize, run, format.

use std::sync::Arc;
use std::time::{Duration, Instant};

use strategy_context::{AccountSource, EntityRegistry, MarketDataSource};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::{SandboxError, SandboxResult};
use crate::format::{format_outcome, format_structured, FormattedResult};
use crate::gather::ContextGatherer;
use crate::metrics::METRICS;
use crate::obs::{self, ExecutionSpan};
use crate::outcome::{ExecutionOutcome, OutcomeKind};
use crate::request::ExecutionRequest;
use crate::runner::ProcessRunner;
use crate::synth::synthesize;

/// Entry point for script execution.
///
/// Invocations share nothing but the collaborators and may run
/// concurrently on one engine.
#[derive(Clone)]
pub struct SandboxEngine {
    gatherer: ContextGatherer,
    runner: ProcessRunner,
    default_timeout: Duration,
}

impl SandboxEngine {
    pub fn new(
        config: &EngineConfig,
        accounts: Arc<dyn AccountSource>,
        market: Arc<dyn MarketDataSource>,
        registry: Arc<dyn EntityRegistry>,
    ) -> SandboxResult<Self> {
        config.validate()?;
        let gatherer = ContextGatherer::new(accounts, market, registry)
            .with_history_window(config.history_window);
        Ok(Self::from_parts(
            gatherer,
            ProcessRunner::from_config(config),
            config.timeout(),
        ))
    }

    pub fn from_parts(gatherer: ContextGatherer, runner: ProcessRunner, default_timeout: Duration) -> Self {
        Self {
            gatherer,
            runner,
            default_timeout,
        }
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Run `source_code` and return the caller-facing text.
    ///
    /// `symbols` is a comma-separated list; `None` or empty means no market
    /// data. Never fails: every error is rendered into the returned text.
    pub async fn execute(
        &self,
        source_code: &str,
        symbols: Option<&str>,
        include_portfolio: bool,
    ) -> String {
        let request = ExecutionRequest::new(source_code)
            .with_symbols_csv(symbols)
            .with_portfolio(include_portfolio);
        format_outcome(&self.run(request).await)
    }

    pub async fn execute_structured(&self, request: ExecutionRequest) -> FormattedResult {
        format_structured(&self.run(request).await)
    }

    /// Run one request to its terminal outcome. Nothing is retried.
    pub async fn run(&self, request: ExecutionRequest) -> ExecutionOutcome {
        let execution_id = Uuid::new_v4().to_string();
        let span = ExecutionSpan::new(&execution_id);
        span.wrap(self.run_inner(&execution_id, request)).await
    }

    async fn run_inner(&self, execution_id: &str, request: ExecutionRequest) -> ExecutionOutcome {
        let start = Instant::now();
        METRICS.inc_started();
        obs::emit_execution_started(
            execution_id,
            request.symbols().len(),
            request.include_portfolio(),
        );

        let outcome = match self.attempt(&request).await {
            Ok(outcome) => outcome,
            Err(err) => {
                let mut outcome = ExecutionOutcome::failed(&err);
                outcome.duration = start.elapsed();
                outcome
            }
        };

        match &outcome.kind {
            OutcomeKind::Completed => METRICS.inc_completed(),
            OutcomeKind::TimedOut { .. } => METRICS.inc_timed_out(),
            OutcomeKind::Failed {
                error_kind,
                message,
            } => {
                METRICS.inc_failed();
                obs::emit_execution_failed(execution_id, error_kind, message);
            }
        }
        obs::emit_execution_finished(execution_id, outcome.kind.as_str(), outcome.duration_ms());
        outcome
    }

    /// Gather, synthesize and run. Errors here happen before any child exists.
    async fn attempt(&self, request: &ExecutionRequest) -> SandboxResult<ExecutionOutcome> {
        let budget = self.budget_for(request)?;
        let snapshot = self
            .gatherer
            .gather(
                request.symbols(),
                request.include_portfolio(),
                request.params(),
            )
            .await;

        let program = synthesize(request, &snapshot)?;
        obs::emit_program_synthesized(program.digest(), program.len(), program.requirements());
        Ok(self.runner.run(&program, budget).await)
    }

    fn budget_for(&self, request: &ExecutionRequest) -> SandboxResult<Duration> {
        match request.timeout() {
            Some(budget) if budget.is_zero() => Err(SandboxError::InvalidConfig(
                "per-request timeout must be greater than zero".to_string(),
            )),
            Some(budget) => Ok(budget),
            None => Ok(self.default_timeout),
        }
    }
}
