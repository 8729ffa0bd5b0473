//! Collaborator contracts exercised through trait objects, the way the
//! sandbox engine holds them.

use std::sync::Arc;

use strategy_context::fakes::{
    bars_from_closes, sample_account, sample_position, sample_snapshot, MemoryAccountSource,
    MemoryMarketData,
};
use strategy_context::{
    AccountSource, ContextError, EntityRegistry, EntityRole, InMemoryEntityRegistry,
    MarketDataSource, Position, TrackedEntity,
};

/// Test: sources behind `Arc<dyn _>` answer and fail independently
#[tokio::test]
async fn test_sources_as_trait_objects() {
    let accounts: Arc<dyn AccountSource> = Arc::new(
        MemoryAccountSource::new(
            sample_account(1_000.0, 500.0),
            vec![sample_position("AAPL", 1.0, 100.0, 110.0)],
        )
        .with_account_error(ContextError::Upstream {
            status: 401,
            message: "unauthorized".to_string(),
        }),
    );
    assert!(matches!(
        accounts.account().await,
        Err(ContextError::Upstream { status: 401, .. })
    ));
    assert_eq!(accounts.positions().await.expect("positions").len(), 1);

    let market: Arc<dyn MarketDataSource> = Arc::new(
        MemoryMarketData::new()
            .with_snapshot(sample_snapshot("SPY", 500.0, 510.0))
            .with_history("SPY", bars_from_closes(&[500.0, 505.0, 510.0])),
    );
    let snapshot = market.snapshot("SPY").await.expect("snapshot");
    let bar = snapshot.daily_bar.expect("daily bar");
    assert_eq!(bar.daily_change, 10.0);
    assert_eq!(bar.daily_change_percent, 2.0);
    assert_eq!(market.history("SPY", 2).await.expect("history").len(), 2);
    assert_eq!(
        market.snapshot("QQQ").await,
        Err(ContextError::SymbolNotFound {
            symbol: "QQQ".to_string()
        })
    );
}

/// Test: the registry is shared state owned by whoever injects it
#[test]
fn test_registry_shared_through_arc() {
    let registry = Arc::new(InMemoryEntityRegistry::new());
    let view: Arc<dyn EntityRegistry> = registry.clone();

    registry.track("tlt", TrackedEntity::new(EntityRole::HedgeInstrument));
    registry.track(
        "NVDA",
        TrackedEntity::new(EntityRole::Speculative).with_characteristic("beta", 1.8),
    );

    let all = view.all_tracked();
    assert_eq!(all.keys().collect::<Vec<_>>(), ["NVDA", "TLT"]);
    assert_eq!(all["TLT"].role, EntityRole::HedgeInstrument);

    registry.untrack("NVDA");
    assert_eq!(view.all_tracked().len(), 1);
}

/// Test: brokerage position payloads using `qty` deserialize with extras kept
#[test]
fn test_position_from_brokerage_payload() {
    let position: Position = serde_json::from_value(serde_json::json!({
        "symbol": "AAPL",
        "qty": 12.0,
        "market_value": 2280.0,
        "avg_entry_price": 150.0,
        "current_price": 190.0,
        "unrealized_pl": 480.0,
        "unrealized_plpc": 0.2667,
        "side": "long"
    }))
    .expect("position");
    assert_eq!(position.quantity, 12.0);
    assert_eq!(position.unrealized_intraday_pl, 0.0);
    assert_eq!(position.extra["side"], "long");
}
