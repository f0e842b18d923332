//! Concrete TwelveData adapter (§4.3), built on [`crate::http_adapter`].

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use marketpipe_ratelimit::RateLimiter;

use crate::http_adapter::{HttpAdapter, VendorEndpoint};
use crate::provider::{AuthStrategy, FetchRequest, MarketDataProvider, ProviderError, RawBar};

const DEFAULT_BASE_URL: &str = "https://api.twelvedata.com";

fn interval_for(timeframe: &str) -> Result<&'static str, ProviderError> {
    match timeframe.to_ascii_lowercase().as_str() {
        "1d" => Ok("1day"),
        "1m" => Ok("1min"),
        "5m" => Ok("5min"),
        "15m" => Ok("15min"),
        "1h" => Ok("1h"),
        other => Err(ProviderError::Config(format!("twelvedata has no interval mapping for '{other}'"))),
    }
}

pub struct TwelveDataEndpoint {
    base_url: String,
    auth: AuthStrategy,
}

impl TwelveDataEndpoint {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self { base_url, auth: AuthStrategy::QueryParam { name: "apikey", value: api_key } }
    }
}

#[async_trait]
impl VendorEndpoint for TwelveDataEndpoint {
    type Response = TimeSeriesResponse;

    fn vendor_name(&self) -> &'static str {
        "twelvedata"
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn auth(&self) -> &AuthStrategy {
        &self.auth
    }

    fn build_request_params(&self, req: &FetchRequest, symbol: &str, cursor: Option<&str>) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("symbol", symbol.to_string()),
            ("interval", interval_for(&req.timeframe).unwrap_or("1day").to_string()),
            ("start_date", req.start.format("%Y-%m-%d").to_string()),
            ("end_date", req.end.format("%Y-%m-%d").to_string()),
            ("timezone", "UTC".to_string()),
            ("format", "JSON".to_string()),
        ];
        if let Some(cursor) = cursor {
            params.push(("next_cursor", cursor.to_string()));
        }
        params
    }

    async fn fetch_symbol(
        &self,
        client: &reqwest::Client,
        req: &FetchRequest,
        symbol: &str,
        cursor: Option<&str>,
    ) -> Result<Self::Response, ProviderError> {
        interval_for(&req.timeframe)?;
        let url = format!("{}/time_series", self.base_url.trim_end_matches('/'));
        let params = self.build_request_params(req, symbol, cursor);
        let builder = self.auth.apply(client.get(url).query(&params));

        let resp = builder
            .send()
            .await
            .map_err(|e| ProviderError::Transport(marketpipe_config::mask_secret(&e.to_string(), self.auth.secret_value())))?;
        let status = resp.status();

        if status.as_u16() == 429 {
            let retry_after_secs = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok());
            return Err(ProviderError::RateLimited { retry_after_secs });
        }

        let body: TimeSeriesResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::Decode(marketpipe_config::mask_secret(&e.to_string(), self.auth.secret_value())))?;

        if let Some("error") = body.status.as_deref() {
            return Err(ProviderError::Api { code: body.code, message: body.message.clone().unwrap_or_else(|| "unknown error".to_string()) });
        }
        if !status.is_success() {
            return Err(ProviderError::Api { code: Some(status.as_u16() as i64), message: body.message.clone().unwrap_or_else(|| status.to_string()) });
        }

        Ok(body)
    }

    fn parse_bars(&self, response: &Self::Response, req: &FetchRequest, symbol: &str) -> Result<Vec<RawBar>, ProviderError> {
        let values = response.values.clone().unwrap_or_default();
        let mut out = Vec::with_capacity(values.len());
        for v in values {
            let dt = chrono::DateTime::parse_from_rfc3339(&v.datetime)
                .or_else(|_| chrono::DateTime::parse_from_str(&format!("{} +0000", v.datetime), "%Y-%m-%d %H:%M:%S %z"))
                .or_else(|_| chrono::DateTime::parse_from_str(&format!("{} +0000", v.datetime), "%Y-%m-%d %z"))
                .map_err(|e| ProviderError::Decode(format!("unparseable datetime '{}': {e}", v.datetime)))?;
            out.push(RawBar {
                symbol: symbol.to_string(),
                timeframe: req.timeframe.clone(),
                end_ts: dt.with_timezone(&chrono::Utc).timestamp(),
                open: v.open,
                high: v.high,
                low: v.low,
                close: v.close,
                volume: v.volume.and_then(|s| s.parse::<i64>().ok()).unwrap_or(0),
                is_complete: true,
            });
        }
        Ok(out)
    }

    fn next_cursor(&self, response: &Self::Response) -> Option<String> {
        // TwelveData's `time_series` endpoint has no cursor of its own today;
        // this only fires if a response payload ever carries one (or a test
        // double supplies one), which is also why the field stays optional.
        response.next_cursor.clone()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimeSeriesResponse {
    status: Option<String>,
    message: Option<String>,
    code: Option<i64>,
    values: Option<Vec<TimeSeriesValue>>,
    #[serde(default)]
    next_cursor: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct TimeSeriesValue {
    datetime: String,
    open: String,
    high: String,
    low: String,
    close: String,
    #[serde(default)]
    volume: Option<String>,
}

/// Vendor-neutral entry point wrapping [`HttpAdapter`] so the coordinator
/// only ever holds a `dyn MarketDataProvider`.
pub struct TwelveDataProvider(HttpAdapter<TwelveDataEndpoint>);

impl TwelveDataProvider {
    pub fn new(api_key: String, limiter: Arc<RateLimiter>) -> Self {
        Self(HttpAdapter::new(TwelveDataEndpoint::new(api_key), limiter))
    }
}

#[async_trait]
impl MarketDataProvider for TwelveDataProvider {
    fn name(&self) -> &'static str {
        self.0.name()
    }

    async fn fetch_historical(&self, req: &FetchRequest) -> Result<Vec<RawBar>, ProviderError> {
        self.0.fetch_historical(req).await
    }
}
