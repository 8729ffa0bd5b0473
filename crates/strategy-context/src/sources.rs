//! Collaborator contracts consumed by the sandbox engine.
//!
//! These traits define the read-only context surface:
//! - `AccountSource`: account summary and open positions
//! - `MarketDataSource`: per-symbol snapshot and bounded bar history
//! - `EntityRegistry`: symbols currently tracked by the surrounding system
//!
//! Account and market reads are async and may fail; the registry read is
//! infallible by contract. In-memory fakes are provided via the `fakes`
//! module.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::ContextResult;
use crate::records::{Account, Bar, MarketSnapshot, Position, TrackedEntity};

/// Account and portfolio reads.
#[async_trait]
pub trait AccountSource: Send + Sync {
    /// Current account summary.
    async fn account(&self) -> ContextResult<Account>;

    /// All open positions, in broker order.
    async fn positions(&self) -> ContextResult<Vec<Position>>;
}

/// Market data reads.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Latest quote, trade and session bar for `symbol`.
    async fn snapshot(&self, symbol: &str) -> ContextResult<MarketSnapshot>;

    /// The most recent `limit` daily bars for `symbol`, oldest first.
    async fn history(&self, symbol: &str, limit: usize) -> ContextResult<Vec<Bar>>;
}

/// Read access to the tracked-entity store.
///
/// Implementations own their synchronisation; readers always receive a
/// detached copy keyed by symbol.
pub trait EntityRegistry: Send + Sync {
    fn all_tracked(&self) -> BTreeMap<String, TrackedEntity>;
}
