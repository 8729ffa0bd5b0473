//! In-memory fakes for collaborator traits (testing only)
//!
//! Provides `MemoryAccountSource` and `MemoryMarketData` that satisfy the
//! trait contracts without a brokerage connection, with per-call failure
//! injection so degradation paths can be exercised.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::error::{ContextError, ContextResult};
use crate::records::{Account, Bar, DailyBar, MarketSnapshot, Position, Quote, Trade};
use crate::sources::{AccountSource, MarketDataSource};

// ---------------------------------------------------------------------------
// MemoryAccountSource
// ---------------------------------------------------------------------------

/// Account source returning fixed (or failing) responses.
#[derive(Debug)]
pub struct MemoryAccountSource {
    account: ContextResult<Account>,
    positions: ContextResult<Vec<Position>>,
}

impl MemoryAccountSource {
    pub fn new(account: Account, positions: Vec<Position>) -> Self {
        Self {
            account: Ok(account),
            positions: Ok(positions),
        }
    }

    /// Source whose every call fails with `err`.
    pub fn failing(err: ContextError) -> Self {
        Self {
            account: Err(err.clone()),
            positions: Err(err),
        }
    }

    pub fn with_account_error(mut self, err: ContextError) -> Self {
        self.account = Err(err);
        self
    }

    pub fn with_positions_error(mut self, err: ContextError) -> Self {
        self.positions = Err(err);
        self
    }
}

#[async_trait]
impl AccountSource for MemoryAccountSource {
    async fn account(&self) -> ContextResult<Account> {
        self.account.clone()
    }

    async fn positions(&self) -> ContextResult<Vec<Position>> {
        self.positions.clone()
    }
}

// ---------------------------------------------------------------------------
// MemoryMarketData
// ---------------------------------------------------------------------------

/// Market data source backed by per-symbol maps.
///
/// Unknown symbols yield `ContextError::SymbolNotFound`. Every `history`
/// request is recorded so tests can assert the requested window.
#[derive(Debug, Default)]
pub struct MemoryMarketData {
    snapshots: HashMap<String, ContextResult<MarketSnapshot>>,
    histories: HashMap<String, ContextResult<Vec<Bar>>>,
    history_requests: Mutex<Vec<(String, usize)>>,
}

impl MemoryMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(mut self, snapshot: MarketSnapshot) -> Self {
        self.snapshots.insert(snapshot.symbol.clone(), Ok(snapshot));
        self
    }

    pub fn with_snapshot_error(mut self, symbol: &str, err: ContextError) -> Self {
        self.snapshots.insert(symbol.to_string(), Err(err));
        self
    }

    pub fn with_history(mut self, symbol: &str, bars: Vec<Bar>) -> Self {
        self.histories.insert(symbol.to_string(), Ok(bars));
        self
    }

    pub fn with_history_error(mut self, symbol: &str, err: ContextError) -> Self {
        self.histories.insert(symbol.to_string(), Err(err));
        self
    }

    /// `(symbol, limit)` pairs seen by `history`, in call order.
    pub fn history_requests(&self) -> Vec<(String, usize)> {
        self.history_requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl MarketDataSource for MemoryMarketData {
    async fn snapshot(&self, symbol: &str) -> ContextResult<MarketSnapshot> {
        self.snapshots
            .get(symbol)
            .cloned()
            .unwrap_or_else(|| {
                Err(ContextError::SymbolNotFound {
                    symbol: symbol.to_string(),
                })
            })
    }

    async fn history(&self, symbol: &str, limit: usize) -> ContextResult<Vec<Bar>> {
        self.history_requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((symbol.to_string(), limit));

        let bars = self.histories.get(symbol).cloned().unwrap_or_else(|| {
            Err(ContextError::SymbolNotFound {
                symbol: symbol.to_string(),
            })
        })?;
        let skip = bars.len().saturating_sub(limit);
        Ok(bars.into_iter().skip(skip).collect())
    }
}

// ---------------------------------------------------------------------------
// Sample data builders
// ---------------------------------------------------------------------------

fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 2, 21, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Daily bars with the given closes, one day apart, opening at the prior close.
pub fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
    let start = epoch();
    let mut prev = closes.first().copied().unwrap_or_default();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = prev;
            prev = close;
            Bar {
                timestamp: start + Duration::days(i as i64),
                open,
                high: open.max(close),
                low: open.min(close),
                close,
                volume: 1_000_000,
            }
        })
        .collect()
}

/// Snapshot with quote, trade and daily bar around `price`.
pub fn sample_snapshot(symbol: &str, open: f64, price: f64) -> MarketSnapshot {
    let ts = epoch();
    MarketSnapshot {
        symbol: symbol.to_string(),
        latest_quote: Some(Quote {
            bid_price: price - 0.01,
            ask_price: price + 0.01,
            bid_size: 100,
            ask_size: 200,
            timestamp: ts,
        }),
        latest_trade: Some(Trade {
            price,
            size: 50,
            timestamp: ts,
        }),
        daily_bar: Some(DailyBar::from_ohlcv(
            open,
            open.max(price),
            open.min(price),
            price,
            2_500_000,
            ts,
        )),
    }
}

/// Account with the given value figures.
pub fn sample_account(portfolio_value: f64, buying_power: f64) -> Account {
    Account {
        account_id: "acct-0001".to_string(),
        status: "ACTIVE".to_string(),
        currency: "USD".to_string(),
        buying_power,
        cash: buying_power,
        portfolio_value,
        equity: portfolio_value,
        long_market_value: portfolio_value - buying_power,
        short_market_value: 0.0,
        pattern_day_trader: false,
        daytrade_count: 0,
    }
}

/// Long position of `quantity` shares bought at `entry`, marked at `price`.
pub fn sample_position(symbol: &str, quantity: f64, entry: f64, price: f64) -> Position {
    let market_value = quantity * price;
    let unrealized_pl = quantity * (price - entry);
    Position {
        symbol: symbol.to_string(),
        quantity,
        market_value,
        avg_entry_price: entry,
        current_price: price,
        unrealized_pl,
        unrealized_plpc: if entry > 0.0 {
            (price - entry) / entry
        } else {
            0.0
        },
        unrealized_intraday_pl: unrealized_pl / 4.0,
        extra: Default::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_history_returns_most_recent_window() {
        let market =
            MemoryMarketData::new().with_history("SPY", bars_from_closes(&[1.0, 2.0, 3.0, 4.0]));
        let bars = market.history("SPY", 2).await.unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, 3.0);
        assert_eq!(bars[1].close, 4.0);
        assert_eq!(market.history_requests(), vec![("SPY".to_string(), 2)]);
    }

    #[tokio::test]
    async fn test_unknown_symbol_is_not_found() {
        let market = MemoryMarketData::new();
        let err = market.snapshot("NOPE").await.unwrap_err();
        assert_eq!(
            err,
            ContextError::SymbolNotFound {
                symbol: "NOPE".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_failing_account_source() {
        let source = MemoryAccountSource::failing(ContextError::Unavailable("down".into()));
        assert!(source.account().await.is_err());
        assert!(source.positions().await.is_err());
    }

    #[test]
    fn test_bars_from_closes_chain_opens() {
        let bars = bars_from_closes(&[10.0, 11.0, 9.5]);
        assert_eq!(bars[0].open, 10.0);
        assert_eq!(bars[1].open, 10.0);
        assert_eq!(bars[2].open, 11.0);
        assert_eq!(bars[2].low, 9.5);
        assert!(bars[1].timestamp > bars[0].timestamp);
    }
}
