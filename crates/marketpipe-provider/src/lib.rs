//! HTTP Adapter Framework (§4.3): the vendor-neutral [`MarketDataProvider`]
//! trait, shared retry/backoff/rate-limit plumbing, the canonical
//! normalization boundary into `marketpipe_core::OHLCVBar`, and concrete
//! vendor adapters. No database or filesystem writes happen in this crate —
//! callers fetch bars and hand normalized bars to `marketpipe-repo`/
//! `marketpipe-storage`.

pub mod fake;
pub mod http_adapter;
pub mod normalizer;
pub mod provider;
pub mod quality;
pub mod retry;
pub mod twelvedata;

pub use normalizer::{normalize, normalize_all, sort_normalized, NormalizationError};
pub use provider::{AuthStrategy, FetchRequest, MarketDataProvider, ProviderError, RawBar};
pub use quality::{build_fetch_quality_report, FetchQualityReport};
pub use retry::RetryPolicy;
pub use twelvedata::TwelveDataProvider;
