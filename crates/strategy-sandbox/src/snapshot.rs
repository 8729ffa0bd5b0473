//! The read-only context bundle embedded into a synthesized program.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};
use strategy_context::{Bar, DailyBar, MarketSnapshot, Position, Quote, TrackedEntity, Trade};

/// Market view of one symbol as scripts see it under `market_data[SYMBOL]`.
///
/// Every key is always present. Parts whose fetch failed are `None`
/// (`latest_*`, `daily_bar`) or empty (`historical_bars`).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SymbolMarketData {
    pub symbol: String,
    pub latest_quote: Option<Quote>,
    pub latest_trade: Option<Trade>,
    pub daily_bar: Option<DailyBar>,
    pub historical_bars: Vec<Bar>,
}

impl SymbolMarketData {
    pub fn empty(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            ..Self::default()
        }
    }

    pub fn from_snapshot(snapshot: MarketSnapshot) -> Self {
        Self {
            symbol: snapshot.symbol,
            latest_quote: snapshot.latest_quote,
            latest_trade: snapshot.latest_trade,
            daily_bar: snapshot.daily_bar,
            historical_bars: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.latest_quote.is_none()
            && self.latest_trade.is_none()
            && self.daily_bar.is_none()
            && self.historical_bars.is_empty()
    }
}

/// Everything gathered for one invocation. Never mutated once built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextSnapshot {
    /// Whether portfolio context was requested; decides if `portfolio` is
    /// populated in the program.
    pub portfolio_requested: bool,
    pub account: Map<String, Value>,
    pub positions: Vec<Position>,
    pub tracked_entities: BTreeMap<String, TrackedEntity>,
    pub market_data: BTreeMap<String, SymbolMarketData>,
    pub params: Map<String, Value>,
}

impl ContextSnapshot {
    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    pub fn symbol_count(&self) -> usize {
        self.market_data.len()
    }

    /// The `portfolio` binding: `{}` unless portfolio context was requested.
    pub fn portfolio_view(&self) -> PortfolioView<'_> {
        PortfolioView { snapshot: self }
    }
}

/// Serializes as the `portfolio` dict scripts index into.
pub struct PortfolioView<'a> {
    snapshot: &'a ContextSnapshot,
}

impl Serialize for PortfolioView<'_> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let snapshot = self.snapshot;
        if !snapshot.portfolio_requested {
            return serializer.serialize_map(Some(0))?.end();
        }
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("account", &snapshot.account)?;
        map.serialize_entry("positions", &snapshot.positions)?;
        map.serialize_entry("tracked_symbols", &snapshot.tracked_entities)?;
        map.end()
    }
}
