//! Shared HTTP plumbing for vendor adapters (§4.3): retry/backoff with
//! jitter, rate-limiter admission, `Retry-After` pushback, and cursor-based
//! pagination. A concrete vendor implements [`VendorEndpoint`];
//! [`HttpAdapter::fetch_historical`] drives the retry and pagination loops
//! around it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use marketpipe_ratelimit::{RateLimiter, RateLimiterLabel};

use crate::provider::{AuthStrategy, FetchRequest, ProviderError, RawBar};
use crate::retry::RetryPolicy;

/// Per-vendor extension point: everything that differs between vendors
/// (URL shape, query params, response shape, pagination) lives behind this
/// trait; retry/backoff/rate-limit/auth plumbing is shared.
#[async_trait]
pub trait VendorEndpoint: Send + Sync {
    /// The vendor's decoded response payload for one page of one symbol's
    /// request.
    type Response: Send + Sync;

    fn vendor_name(&self) -> &'static str;
    fn base_url(&self) -> &str;
    fn auth(&self) -> &AuthStrategy;

    /// Build the vendor-specific query params for one page of one symbol's
    /// request. `cursor` is `None` for the first page and `Some` for every
    /// page after, carrying the previous page's [`Self::next_cursor`].
    fn build_request_params(&self, req: &FetchRequest, symbol: &str, cursor: Option<&str>) -> Vec<(&'static str, String)>;

    /// Issue the request for one page and decode the vendor's response, or
    /// classify the failure (including `Retry-After` into
    /// [`ProviderError::RateLimited`]).
    async fn fetch_symbol(
        &self,
        client: &reqwest::Client,
        req: &FetchRequest,
        symbol: &str,
        cursor: Option<&str>,
    ) -> Result<Self::Response, ProviderError>;

    /// Extract this page's bars from the decoded response.
    fn parse_bars(&self, response: &Self::Response, req: &FetchRequest, symbol: &str) -> Result<Vec<RawBar>, ProviderError>;

    /// The cursor for the next page, or `None` once there is no more data.
    /// A page with zero bars but a non-null cursor is not the end of the
    /// sequence; the caller keeps requesting until this returns `None`.
    fn next_cursor(&self, response: &Self::Response) -> Option<String>;
}

pub struct HttpAdapter<E: VendorEndpoint> {
    endpoint: E,
    client: reqwest::Client,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
}

impl<E: VendorEndpoint> HttpAdapter<E> {
    pub fn new(endpoint: E, limiter: Arc<RateLimiter>) -> Self {
        Self { endpoint, client: reqwest::Client::new(), limiter, retry: RetryPolicy::default() }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn name(&self) -> &'static str {
        self.endpoint.vendor_name()
    }

    pub async fn fetch_historical(&self, req: &FetchRequest) -> Result<Vec<RawBar>, ProviderError> {
        let mut out = Vec::new();
        for symbol in &req.symbols {
            out.extend(self.fetch_symbol_with_retry(req, symbol).await?);
        }
        Ok(out)
    }

    /// Fetch every page for `symbol`, following [`VendorEndpoint::next_cursor`]
    /// until it returns `None`, concatenating each page's bars in order.
    async fn fetch_symbol_with_retry(&self, req: &FetchRequest, symbol: &str) -> Result<Vec<RawBar>, ProviderError> {
        let label = RateLimiterLabel::new(self.endpoint.vendor_name(), "async");
        let mut out = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let response = self.fetch_page_with_retry(&label, req, symbol, cursor.as_deref()).await?;
            out.extend(self.endpoint.parse_bars(&response, req, symbol)?);
            match self.endpoint.next_cursor(&response) {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        Ok(out)
    }

    /// Retry loop for a single page; a page that comes back empty but still
    /// carries a cursor is not a failure, it's just handed back to the
    /// pagination loop in [`Self::fetch_symbol_with_retry`].
    async fn fetch_page_with_retry(
        &self,
        label: &RateLimiterLabel,
        req: &FetchRequest,
        symbol: &str,
        cursor: Option<&str>,
    ) -> Result<E::Response, ProviderError> {
        let mut last_err = None;
        for attempt in 0..self.retry.max_attempts {
            self.limiter
                .acquire_async(label, None)
                .await
                .map_err(|_| ProviderError::Transport("rate limiter admission failed".to_string()))?;

            match self.endpoint.fetch_symbol(&self.client, req, symbol, cursor).await {
                Ok(response) => return Ok(response),
                Err(ProviderError::RateLimited { retry_after_secs: Some(secs) }) => {
                    self.limiter.notify_retry_after(Duration::from_secs(secs)).await;
                    last_err = Some(ProviderError::RateLimited { retry_after_secs: Some(secs) });
                }
                Err(e) if e.is_retryable() && attempt + 1 < self.retry.max_attempts => {
                    tokio::time::sleep(self.retry.backoff_delay(attempt)).await;
                    last_err = Some(e);
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_err.unwrap_or(ProviderError::Transport("retries exhausted".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn bar(symbol: &str, end_ts: i64) -> RawBar {
        RawBar {
            symbol: symbol.to_string(),
            timeframe: "1d".to_string(),
            end_ts,
            open: "1".to_string(),
            high: "1".to_string(),
            low: "1".to_string(),
            close: "1".to_string(),
            volume: 0,
            is_complete: true,
        }
    }

    fn req() -> FetchRequest {
        FetchRequest {
            symbols: vec!["AAPL".to_string()],
            timeframe: "1d".to_string(),
            start: chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end: chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
        }
    }

    struct FlakyEndpoint {
        auth: AuthStrategy,
        fail_times: AtomicU32,
    }

    #[async_trait]
    impl VendorEndpoint for FlakyEndpoint {
        type Response = Vec<RawBar>;

        fn vendor_name(&self) -> &'static str {
            "flaky"
        }
        fn base_url(&self) -> &str {
            "http://example.invalid"
        }
        fn auth(&self) -> &AuthStrategy {
            &self.auth
        }
        fn build_request_params(&self, _req: &FetchRequest, _symbol: &str, _cursor: Option<&str>) -> Vec<(&'static str, String)> {
            vec![]
        }
        async fn fetch_symbol(
            &self,
            _client: &reqwest::Client,
            _req: &FetchRequest,
            symbol: &str,
            _cursor: Option<&str>,
        ) -> Result<Self::Response, ProviderError> {
            if self.fail_times.fetch_sub(1, Ordering::SeqCst) as i64 > 0 {
                return Err(ProviderError::Transport("simulated".to_string()));
            }
            Ok(vec![bar(symbol, 0)])
        }
        fn parse_bars(&self, response: &Self::Response, _req: &FetchRequest, _symbol: &str) -> Result<Vec<RawBar>, ProviderError> {
            Ok(response.clone())
        }
        fn next_cursor(&self, _response: &Self::Response) -> Option<String> {
            None
        }
    }

    #[tokio::test]
    async fn retries_transient_failures_then_succeeds() {
        let endpoint = FlakyEndpoint { auth: AuthStrategy::QueryParam { name: "key", value: "x".into() }, fail_times: AtomicU32::new(2) };
        let limiter = RateLimiter::new("flaky", 100, 1000.0);
        let adapter = HttpAdapter::new(endpoint, limiter).with_retry_policy(RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        });

        let bars = adapter.fetch_historical(&req()).await.unwrap();
        assert_eq!(bars.len(), 1);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let endpoint = FlakyEndpoint { auth: AuthStrategy::QueryParam { name: "key", value: "x".into() }, fail_times: AtomicU32::new(99) };
        let limiter = RateLimiter::new("flaky", 100, 1000.0);
        let adapter = HttpAdapter::new(endpoint, limiter).with_retry_policy(RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        });
        assert!(adapter.fetch_historical(&req()).await.is_err());
    }

    /// Endpoint whose pages are scripted by index: `pages[0]` is served for
    /// `cursor == None`, `pages[1]` for the cursor handed back by page 0, etc.
    /// The last page in the script returns `next_cursor = None`.
    struct PagedEndpoint {
        auth: AuthStrategy,
        pages: Vec<Vec<RawBar>>,
    }

    impl PagedEndpoint {
        fn new(pages: Vec<Vec<RawBar>>) -> Self {
            Self { auth: AuthStrategy::QueryParam { name: "key", value: "x".into() }, pages }
        }

        fn page_index(cursor: Option<&str>) -> usize {
            match cursor {
                None => 0,
                Some(c) => c.parse().expect("cursor is a page index"),
            }
        }
    }

    #[async_trait]
    impl VendorEndpoint for PagedEndpoint {
        type Response = (Vec<RawBar>, Option<String>);

        fn vendor_name(&self) -> &'static str {
            "paged"
        }
        fn base_url(&self) -> &str {
            "http://example.invalid"
        }
        fn auth(&self) -> &AuthStrategy {
            &self.auth
        }
        fn build_request_params(&self, _req: &FetchRequest, _symbol: &str, cursor: Option<&str>) -> Vec<(&'static str, String)> {
            cursor.map(|c| vec![("cursor", c.to_string())]).unwrap_or_default()
        }
        async fn fetch_symbol(
            &self,
            _client: &reqwest::Client,
            _req: &FetchRequest,
            _symbol: &str,
            cursor: Option<&str>,
        ) -> Result<Self::Response, ProviderError> {
            let index = Self::page_index(cursor);
            let bars = self.pages.get(index).cloned().unwrap_or_default();
            let next = if index + 1 < self.pages.len() { Some((index + 1).to_string()) } else { None };
            Ok((bars, next))
        }
        fn parse_bars(&self, response: &Self::Response, _req: &FetchRequest, _symbol: &str) -> Result<Vec<RawBar>, ProviderError> {
            Ok(response.0.clone())
        }
        fn next_cursor(&self, response: &Self::Response) -> Option<String> {
            response.1.clone()
        }
    }

    #[tokio::test]
    async fn follows_cursor_across_pages_and_concatenates_bars() {
        let endpoint = PagedEndpoint::new(vec![vec![bar("AAPL", 1), bar("AAPL", 2)], vec![bar("AAPL", 3)]]);
        let limiter = RateLimiter::new("paged", 100, 1000.0);
        let adapter = HttpAdapter::new(endpoint, limiter);

        let bars = adapter.fetch_historical(&req()).await.unwrap();
        let ts: Vec<i64> = bars.iter().map(|b| b.end_ts).collect();
        assert_eq!(ts, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn empty_page_with_a_cursor_does_not_terminate_the_sequence() {
        // Page 0 is empty but still hands back a cursor; page 1 is populated
        // and terminal. The adapter must keep requesting past the empty page.
        let endpoint = PagedEndpoint::new(vec![vec![], vec![bar("AAPL", 9)]]);
        let limiter = RateLimiter::new("paged", 100, 1000.0);
        let adapter = HttpAdapter::new(endpoint, limiter);

        let bars = adapter.fetch_historical(&req()).await.unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].end_ts, 9);
    }

    #[tokio::test]
    async fn single_page_response_requests_cursor_none_then_stops() {
        let endpoint = PagedEndpoint::new(vec![vec![bar("AAPL", 1)]]);
        let limiter = RateLimiter::new("paged", 100, 1000.0);
        let adapter = HttpAdapter::new(endpoint, limiter);
        let bars = adapter.fetch_historical(&req()).await.unwrap();
        assert_eq!(bars.len(), 1);
    }
}
