//! Collaborators for running without a brokerage connection.

use async_trait::async_trait;
use strategy_context::{
    Account, AccountSource, Bar, ContextError, ContextResult, MarketDataSource, MarketSnapshot,
    Position,
};

const NOT_CONNECTED: &str = "no brokerage connection configured";

/// Every read fails, so the engine degrades each field to empty.
pub struct OfflineBroker;

#[async_trait]
impl AccountSource for OfflineBroker {
    async fn account(&self) -> ContextResult<Account> {
        Err(ContextError::Unavailable(NOT_CONNECTED.to_string()))
    }

    async fn positions(&self) -> ContextResult<Vec<Position>> {
        Err(ContextError::Unavailable(NOT_CONNECTED.to_string()))
    }
}

#[async_trait]
impl MarketDataSource for OfflineBroker {
    async fn snapshot(&self, _symbol: &str) -> ContextResult<MarketSnapshot> {
        Err(ContextError::Unavailable(NOT_CONNECTED.to_string()))
    }

    async fn history(&self, _symbol: &str, _limit: usize) -> ContextResult<Vec<Bar>> {
        Err(ContextError::Unavailable(NOT_CONNECTED.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_offline_reads_are_unavailable() {
        let broker = OfflineBroker;
        assert!(matches!(
            broker.account().await,
            Err(ContextError::Unavailable(_))
        ));
        assert!(broker.history("SPY", 30).await.is_err());
    }
}
