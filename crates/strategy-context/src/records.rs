//! Plain-data records served by context collaborators.
//!
//! Field names follow the brokerage payload shape that strategy scripts
//! index into (`data['latest_trade']['price']`, `pos['market_value']`, ...).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Account summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub account_id: String,
    pub status: String,
    pub currency: String,
    pub buying_power: f64,
    pub cash: f64,
    pub portfolio_value: f64,
    pub equity: f64,
    pub long_market_value: f64,
    pub short_market_value: f64,
    pub pattern_day_trader: bool,
    pub daytrade_count: u32,
}

/// One open position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    #[serde(alias = "qty")]
    pub quantity: f64,
    pub market_value: f64,
    pub avg_entry_price: f64,
    pub current_price: f64,
    pub unrealized_pl: f64,
    pub unrealized_plpc: f64,
    #[serde(default)]
    pub unrealized_intraday_pl: f64,
    /// Broker-specific fields passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Latest top-of-book quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub bid_price: f64,
    pub ask_price: f64,
    pub bid_size: u64,
    pub ask_size: u64,
    pub timestamp: DateTime<Utc>,
}

/// Latest trade print.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub price: f64,
    pub size: u64,
    pub timestamp: DateTime<Utc>,
}

/// Current session bar with derived change fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    pub daily_change: f64,
    pub daily_change_percent: f64,
    pub timestamp: DateTime<Utc>,
}

impl DailyBar {
    /// Build a daily bar, deriving `daily_change` and `daily_change_percent`
    /// (both rounded to 4 decimals; percent is 0 when `open` is not positive).
    pub fn from_ohlcv(
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: u64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let change = close - open;
        let change_pct = if open > 0.0 {
            change / open * 100.0
        } else {
            0.0
        };
        Self {
            open,
            high,
            low,
            close,
            volume,
            daily_change: round4(change),
            daily_change_percent: round4(change_pct),
            timestamp,
        }
    }
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

/// Historical OHLCV bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Point-in-time market view of one symbol.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub symbol: String,
    pub latest_quote: Option<Quote>,
    pub latest_trade: Option<Trade>,
    pub daily_bar: Option<DailyBar>,
}

/// Descriptive role assigned to a tracked symbol by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityRole {
    LiquidAsset,
    VolatileAsset,
    IncomeGenerator,
    GrowthCandidate,
    HedgeInstrument,
    Speculative,
}

impl EntityRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LiquidAsset => "liquid_asset",
            Self::VolatileAsset => "volatile_asset",
            Self::IncomeGenerator => "income_generator",
            Self::GrowthCandidate => "growth_candidate",
            Self::HedgeInstrument => "hedge_instrument",
            Self::Speculative => "speculative",
        }
    }
}

impl std::fmt::Display for EntityRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registry entry for a symbol the surrounding system is tracking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedEntity {
    #[serde(rename = "suggested_role")]
    pub role: EntityRole,
    #[serde(default)]
    pub characteristics: Map<String, Value>,
}

impl TrackedEntity {
    pub fn new(role: EntityRole) -> Self {
        Self {
            role,
            characteristics: Map::new(),
        }
    }

    pub fn with_characteristic(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.characteristics.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 21, 0, 0).unwrap()
    }

    #[test]
    fn test_daily_bar_derives_change() {
        let bar = DailyBar::from_ohlcv(100.0, 105.0, 99.0, 103.123456, 1_000, ts());
        assert_eq!(bar.daily_change, 3.1235);
        assert_eq!(bar.daily_change_percent, 3.1235);
    }

    #[test]
    fn test_daily_bar_zero_open() {
        let bar = DailyBar::from_ohlcv(0.0, 1.0, 0.0, 1.0, 10, ts());
        assert_eq!(bar.daily_change_percent, 0.0);
        assert_eq!(bar.daily_change, 1.0);
    }

    #[test]
    fn test_position_accepts_qty_alias_and_keeps_extras() {
        let pos: Position = serde_json::from_value(json!({
            "symbol": "AAPL",
            "qty": 10.0,
            "market_value": 1900.0,
            "avg_entry_price": 180.0,
            "current_price": 190.0,
            "unrealized_pl": 100.0,
            "unrealized_plpc": 0.0555,
            "side": "long"
        }))
        .unwrap();
        assert_eq!(pos.quantity, 10.0);
        assert_eq!(pos.unrealized_intraday_pl, 0.0);
        assert_eq!(pos.extra.get("side"), Some(&json!("long")));

        let value = serde_json::to_value(&pos).unwrap();
        assert_eq!(value["side"], json!("long"));
        assert_eq!(value["quantity"], json!(10.0));
    }

    #[test]
    fn test_tracked_entity_serializes_role_as_suggested_role() {
        let entity =
            TrackedEntity::new(EntityRole::VolatileAsset).with_characteristic("price_trend", "up");
        let value = serde_json::to_value(&entity).unwrap();
        assert_eq!(value["suggested_role"], json!("volatile_asset"));
        assert_eq!(value["characteristics"]["price_trend"], json!("up"));
    }

    #[test]
    fn test_entity_role_display_matches_serde() {
        for role in [
            EntityRole::LiquidAsset,
            EntityRole::VolatileAsset,
            EntityRole::IncomeGenerator,
            EntityRole::GrowthCandidate,
            EntityRole::HedgeInstrument,
            EntityRole::Speculative,
        ] {
            assert_eq!(serde_json::to_value(role).unwrap(), json!(role.to_string()));
        }
    }
}
