//! Context gathering with per-call degradation.
//!
//! Every collaborator read is independent: a failure empties only the field
//! it was meant to fill, is logged, and counted. `gather` itself cannot fail.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use serde_json::{Map, Value};
use strategy_context::{AccountSource, EntityRegistry, MarketDataSource, Position};

use crate::metrics::METRICS;
use crate::obs;
use crate::snapshot::{ContextSnapshot, SymbolMarketData};

/// Bars of history fetched per symbol unless configured otherwise.
pub const DEFAULT_HISTORY_WINDOW: usize = 30;

/// Assembles a [`ContextSnapshot`] from injected collaborators.
#[derive(Clone)]
pub struct ContextGatherer {
    accounts: Arc<dyn AccountSource>,
    market: Arc<dyn MarketDataSource>,
    registry: Arc<dyn EntityRegistry>,
    history_window: usize,
}

impl ContextGatherer {
    pub fn new(
        accounts: Arc<dyn AccountSource>,
        market: Arc<dyn MarketDataSource>,
        registry: Arc<dyn EntityRegistry>,
    ) -> Self {
        Self {
            accounts,
            market,
            registry,
            history_window: DEFAULT_HISTORY_WINDOW,
        }
    }

    pub fn with_history_window(mut self, bars: usize) -> Self {
        self.history_window = bars;
        self
    }

    pub fn history_window(&self) -> usize {
        self.history_window
    }

    /// Read everything the invocation needs. Reads are issued concurrently.
    pub async fn gather(
        &self,
        symbols: &[String],
        include_portfolio: bool,
        params: &Map<String, Value>,
    ) -> ContextSnapshot {
        let portfolio = async {
            if include_portfolio {
                self.gather_portfolio().await
            } else {
                (Map::new(), Vec::new())
            }
        };
        let ((account, positions), market_data) =
            tokio::join!(portfolio, self.gather_market(symbols));

        let tracked_entities = self.registry.all_tracked();
        obs::emit_context_gathered(positions.len(), market_data.len(), tracked_entities.len());

        ContextSnapshot {
            portfolio_requested: include_portfolio,
            account,
            positions,
            tracked_entities,
            market_data,
            params: params.clone(),
        }
    }

    async fn gather_portfolio(&self) -> (Map<String, Value>, Vec<Position>) {
        let (account, positions) =
            tokio::join!(self.accounts.account(), self.accounts.positions());

        let account = match account.map(serde_json::to_value) {
            Ok(Ok(Value::Object(map))) => map,
            Ok(Ok(other)) => {
                degraded("account", None, &format!("expected an object, got {other}"));
                Map::new()
            }
            Ok(Err(e)) => {
                degraded("account", None, &e);
                Map::new()
            }
            Err(e) => {
                degraded("account", None, &e);
                Map::new()
            }
        };

        let positions = positions.unwrap_or_else(|e| {
            degraded("positions", None, &e);
            Vec::new()
        });

        (account, positions)
    }

    async fn gather_market(&self, symbols: &[String]) -> BTreeMap<String, SymbolMarketData> {
        join_all(symbols.iter().map(|symbol| self.gather_symbol(symbol)))
            .await
            .into_iter()
            .map(|data| (data.symbol.clone(), data))
            .collect()
    }

    async fn gather_symbol(&self, symbol: &str) -> SymbolMarketData {
        let (snapshot, history) = tokio::join!(
            self.market.snapshot(symbol),
            self.market.history(symbol, self.history_window)
        );

        let mut data = match snapshot {
            Ok(snapshot) => SymbolMarketData::from_snapshot(snapshot),
            Err(e) => {
                degraded("snapshot", Some(symbol), &e);
                SymbolMarketData::empty(symbol)
            }
        };
        data.symbol = symbol.to_string();

        match history {
            Ok(bars) => data.historical_bars = bars,
            Err(e) => degraded("history", Some(symbol), &e),
        }
        data
    }
}

fn degraded(source: &str, symbol: Option<&str>, error: &dyn std::fmt::Display) {
    METRICS.inc_context_degraded();
    obs::emit_context_degraded(source, symbol, error);
}
