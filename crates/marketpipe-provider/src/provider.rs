//! Provider boundary for OHLCV market-data ingestion.
//!
//! This module defines the raw bar type, the fetch request, and the
//! vendor-neutral [`MarketDataProvider`] trait. Concrete vendor adapters
//! (e.g. `twelvedata.rs`) implement a smaller per-vendor extension trait and
//! get retry/backoff, auth, and canonical normalization for free from the
//! shared [`HttpAdapter`] in `http_adapter.rs`.

use std::fmt;

use async_trait::async_trait;
use chrono::NaiveDate;

// ---------------------------------------------------------------------------
// Raw bar
// ---------------------------------------------------------------------------

/// A single OHLCV bar as returned verbatim by an upstream data provider.
///
/// Prices are kept as decimal strings so downstream callers can normalize
/// deterministically (via `rust_decimal`) without floating-point rounding
/// being introduced at the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBar {
    /// Ticker symbol exactly as given to the provider (e.g. `"AAPL"`).
    pub symbol: String,
    /// Canonical timeframe string (e.g. `"1D"`, `"1m"`, `"5m"`).
    pub timeframe: String,
    /// Bar end timestamp as UTC epoch seconds.
    pub end_ts: i64,
    pub open: String,
    pub high: String,
    pub low: String,
    pub close: String,
    pub volume: i64,
    /// `true` when the bar period has fully closed; `false` for a live/partial bar.
    pub is_complete: bool,
}

// ---------------------------------------------------------------------------
// Fetch request
// ---------------------------------------------------------------------------

/// Parameters for a historical fetch request passed to a [`MarketDataProvider`].
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub symbols: Vec<String>,
    /// Canonical timeframe string (e.g. `"1D"`, `"1m"`, `"5m"`).
    pub timeframe: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that a [`MarketDataProvider`] implementation may return.
#[derive(Debug)]
pub enum ProviderError {
    /// Network or transport failure.
    Transport(String),
    /// The upstream API returned an application-level error.
    Api { code: Option<i64>, message: String },
    /// A response payload could not be decoded.
    Decode(String),
    /// Vendor signalled backpressure, optionally with a `Retry-After` hint.
    RateLimited { retry_after_secs: Option<u64> },
    /// A required configuration value (e.g. API key) is missing or invalid.
    Config(String),
}

impl ProviderError {
    /// Whether a retry policy should attempt this request again.
    ///
    /// `Config` errors never clear on retry; `Decode`/`Api` with no code are
    /// treated as non-retryable parse failures unless the vendor explicitly
    /// signalled throttling.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Transport(_) => true,
            ProviderError::RateLimited { .. } => true,
            ProviderError::Api { code: Some(c), .. } => *c >= 500,
            ProviderError::Api { code: None, .. } => false,
            ProviderError::Decode(_) => false,
            ProviderError::Config(_) => false,
        }
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Transport(msg) => write!(f, "transport error: {msg}"),
            ProviderError::Api { code: Some(c), message } => {
                write!(f, "provider api error code={c}: {message}")
            }
            ProviderError::Api { code: None, message } => {
                write!(f, "provider api error: {message}")
            }
            ProviderError::Decode(msg) => write!(f, "decode error: {msg}"),
            ProviderError::RateLimited { retry_after_secs: Some(s) } => {
                write!(f, "rate limited, retry after {s}s")
            }
            ProviderError::RateLimited { retry_after_secs: None } => write!(f, "rate limited"),
            ProviderError::Config(msg) => write!(f, "config error: {msg}"),
        }
    }
}

impl std::error::Error for ProviderError {}

// ---------------------------------------------------------------------------
// Auth strategy
// ---------------------------------------------------------------------------

/// How a vendor expects credentials attached to a request. Kept as data so a
/// new vendor can be onboarded by constructing a value, not writing code.
#[derive(Clone)]
pub enum AuthStrategy {
    QueryParam { name: &'static str, value: String },
    HeaderToken { header: &'static str, prefix: &'static str, value: String },
}

impl AuthStrategy {
    pub fn apply(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self {
            AuthStrategy::QueryParam { name, value } => builder.query(&[(*name, value.as_str())]),
            AuthStrategy::HeaderToken { header, prefix, value } => {
                builder.header(*header, format!("{prefix}{value}"))
            }
        }
    }

    /// The literal credential value, for masking it out of error messages
    /// that might otherwise echo a failed request's URL or headers.
    pub fn secret_value(&self) -> &str {
        match self {
            AuthStrategy::QueryParam { value, .. } => value,
            AuthStrategy::HeaderToken { value, .. } => value,
        }
    }
}

impl fmt::Debug for AuthStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthStrategy::QueryParam { name, .. } => {
                f.debug_struct("QueryParam").field("name", name).field("value", &"<REDACTED>").finish()
            }
            AuthStrategy::HeaderToken { header, prefix, .. } => f
                .debug_struct("HeaderToken")
                .field("header", header)
                .field("prefix", prefix)
                .field("value", &"<REDACTED>")
                .finish(),
        }
    }
}

// ---------------------------------------------------------------------------
// Provider trait
// ---------------------------------------------------------------------------

/// Upstream market-data provider contract.
///
/// Implementations must be `Send + Sync` and object-safe so the coordinator
/// can hold `Arc<dyn MarketDataProvider>` without knowing the concrete type.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Human-readable name identifying this provider (e.g. `"twelvedata"`).
    fn name(&self) -> &'static str;

    /// Fetch historical OHLCV bars for the symbols and date range in `req`.
    ///
    /// Returns bars in the order supplied by the upstream API; callers are
    /// responsible for sorting and deduplication.
    async fn fetch_historical(&self, req: &FetchRequest) -> Result<Vec<RawBar>, ProviderError>;

    /// Cheap connectivity + auth check used by operational tooling before an
    /// ingestion run is scheduled. The default implementation issues a
    /// one-day, one-symbol historical fetch and discards the result.
    async fn test_connection(&self) -> Result<(), ProviderError> {
        let today = chrono::Utc::now().date_naive();
        let req = FetchRequest {
            symbols: vec!["AAPL".to_string()],
            timeframe: "1D".to_string(),
            start: today - chrono::Duration::days(1),
            end: today,
        };
        self.fetch_historical(&req).await.map(|_| ())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    struct MockProvider {
        bars: Vec<RawBar>,
    }

    #[async_trait]
    impl MarketDataProvider for MockProvider {
        fn name(&self) -> &'static str {
            "mock"
        }

        async fn fetch_historical(&self, _req: &FetchRequest) -> Result<Vec<RawBar>, ProviderError> {
            Ok(self.bars.clone())
        }
    }

    fn sample_bar(symbol: &str) -> RawBar {
        RawBar {
            symbol: symbol.to_string(),
            timeframe: "1D".to_string(),
            end_ts: 1_700_000_000,
            open: "100.00".to_string(),
            high: "105.00".to_string(),
            low: "99.00".to_string(),
            close: "103.00".to_string(),
            volume: 1_000_000,
            is_complete: true,
        }
    }

    #[tokio::test]
    async fn mock_provider_returns_configured_bars() {
        let bars = vec![sample_bar("AAPL"), sample_bar("MSFT")];
        let provider: Box<dyn MarketDataProvider> = Box::new(MockProvider { bars: bars.clone() });

        let req = FetchRequest {
            symbols: vec!["AAPL".to_string(), "MSFT".to_string()],
            timeframe: "1D".to_string(),
            start: NaiveDate::from_ymd_opt(2023, 11, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2023, 11, 14).unwrap(),
        };

        let result = provider.fetch_historical(&req).await.unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].symbol, "AAPL");
    }

    #[test]
    fn provider_error_display_api_with_code() {
        let err = ProviderError::Api { code: Some(400), message: "bad symbol".to_string() };
        assert_eq!(err.to_string(), "provider api error code=400: bad symbol");
    }

    #[test]
    fn rate_limited_is_retryable_config_is_not() {
        assert!(ProviderError::RateLimited { retry_after_secs: Some(30) }.is_retryable());
        assert!(!ProviderError::Config("missing key".to_string()).is_retryable());
    }

    #[test]
    fn server_error_api_code_is_retryable_client_error_is_not() {
        assert!(ProviderError::Api { code: Some(503), message: "x".into() }.is_retryable());
        assert!(!ProviderError::Api { code: Some(404), message: "x".into() }.is_retryable());
    }

    #[test]
    fn provider_is_object_safe_via_box() {
        let _p: Box<dyn MarketDataProvider> = Box::new(MockProvider { bars: vec![] });
    }
}
