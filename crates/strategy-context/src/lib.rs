//! Strategy-Context: collaborator contracts for the strategy sandbox
//!
//! This crate defines the read-only context surface the sandbox engine
//! gathers from before running a script: account summary, open positions,
//! per-symbol market data and the tracked-entity registry.
//!
//! ## Key Components
//!
//! - `AccountSource`, `MarketDataSource`, `EntityRegistry`: collaborator traits
//! - `Account`, `Position`, `MarketSnapshot`, `Bar`, `TrackedEntity`: record types
//! - `InMemoryEntityRegistry`: explicitly owned, injectable registry
//! - `fakes`: in-memory sources for tests

mod error;
pub mod fakes;
pub mod records;
mod registry;
pub mod sources;

pub use error::{ContextError, ContextResult};
pub use records::{
    Account, Bar, DailyBar, EntityRole, MarketSnapshot, Position, Quote, TrackedEntity, Trade,
};
pub use registry::InMemoryEntityRegistry;
pub use sources::{AccountSource, EntityRegistry, MarketDataSource};
