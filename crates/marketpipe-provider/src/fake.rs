//! In-memory [`MarketDataProvider`] test double, used by this crate's own
//! tests and by `marketpipe-testkit` so downstream crates don't need a real
//! vendor to exercise the ingestion path end to end.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::provider::{FetchRequest, MarketDataProvider, ProviderError, RawBar};

pub struct FakeProvider {
    bars: Vec<RawBar>,
    /// When set, every call fails with this error instead of returning `bars`.
    pub fail_with: Mutex<Option<String>>,
}

impl FakeProvider {
    pub fn new(bars: Vec<RawBar>) -> Self {
        Self { bars, fail_with: Mutex::new(None) }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self { bars: Vec::new(), fail_with: Mutex::new(Some(message.into())) }
    }
}

#[async_trait]
impl MarketDataProvider for FakeProvider {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn fetch_historical(&self, req: &FetchRequest) -> Result<Vec<RawBar>, ProviderError> {
        if let Some(msg) = self.fail_with.lock().unwrap().clone() {
            return Err(ProviderError::Transport(msg));
        }
        Ok(self
            .bars
            .iter()
            .filter(|b| req.symbols.iter().any(|s| s == &b.symbol))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(symbol: &str) -> RawBar {
        RawBar {
            symbol: symbol.to_string(),
            timeframe: "1d".to_string(),
            end_ts: 0,
            open: "1".to_string(),
            high: "1".to_string(),
            low: "1".to_string(),
            close: "1".to_string(),
            volume: 0,
            is_complete: true,
        }
    }

    fn req(symbols: &[&str]) -> FetchRequest {
        FetchRequest {
            symbols: symbols.iter().map(|s| s.to_string()).collect(),
            timeframe: "1d".to_string(),
            start: chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end: chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
        }
    }

    #[tokio::test]
    async fn filters_to_requested_symbols() {
        let provider = FakeProvider::new(vec![bar("AAPL"), bar("MSFT")]);
        let result = provider.fetch_historical(&req(&["AAPL"])).await.unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].symbol, "AAPL");
    }

    #[tokio::test]
    async fn failing_provider_always_errors() {
        let provider = FakeProvider::failing("simulated outage");
        assert!(provider.fetch_historical(&req(&["AAPL"])).await.is_err());
    }
}
