//! Sandboxed execution of user strategy scripts.
//!
//! A request flows through five stages:
//! - [`gather`]: read account, positions, market data and tracked entities,
//!   degrading per field on failure
//! - [`embed`]: write that context as Python literals
//! - [`synth`]: assemble literals, helper library and caller code into one
//!   program with an exception boundary
//! - [`runner`]: run it in a separate interpreter process under a budget
//! - [`format`]: turn the outcome into caller-facing text
//!
//! [`SandboxEngine`] ties them together.

pub mod config;
pub mod embed;
pub mod engine;
pub mod error;
pub mod format;
pub mod gather;
pub mod metrics;
pub mod obs;
pub mod outcome;
pub mod request;
pub mod runner;
pub mod snapshot;
pub mod synth;
pub mod telemetry;

pub use config::{EngineConfig, Launcher};
pub use embed::{embed, EmbedError};
pub use engine::SandboxEngine;
pub use error::{SandboxError, SandboxResult};
pub use format::{format_outcome, format_structured, FormattedResult, ResultStatus};
pub use gather::ContextGatherer;
pub use metrics::METRICS;
pub use outcome::{ExecutionOutcome, OutcomeKind};
pub use request::{parse_symbols, ExecutionRequest, StrategyPreset, SAMPLE_DATASET};
pub use runner::ProcessRunner;
pub use snapshot::{ContextSnapshot, SymbolMarketData};
pub use synth::{synthesize, SynthesizedProgram};
pub use telemetry::init_tracing;
