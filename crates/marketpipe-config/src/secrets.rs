//! Vendor credential resolution (§6, §7).
//!
//! Config YAML / settings files never carry secret values, only the vendor
//! name the coordinator was asked to use. At startup, callers resolve
//! credentials from the environment via [`resolve_vendor_credentials`]; the
//! returned [`VendorCredentials`] is passed into the adapter constructor.
//! `Debug` redacts both fields so a credential never lands in a log line
//! via a stray `{:?}`.

use std::fmt;

/// Resolved API key/secret pair for one vendor. Either field may be absent
/// if the corresponding env var was unset or blank — callers decide whether
/// that's fatal for the mode they're running in.
#[derive(Clone, Default)]
pub struct VendorCredentials {
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
}

impl fmt::Debug for VendorCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VendorCredentials")
            .field("api_key", &self.api_key.as_ref().map(|_| "<REDACTED>"))
            .field("api_secret", &self.api_secret.as_ref().map(|_| "<REDACTED>"))
            .finish()
    }
}

/// Resolve a non-empty environment variable, treating blank values as unset.
fn resolve_env(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

/// Vendor-specific env var names kept for compatibility alongside the
/// canonical `MP_<VENDOR>_*` pattern.
fn compat_var_names(vendor_upper: &str) -> (Option<&'static str>, Option<&'static str>) {
    match vendor_upper {
        "ALPACA" => (Some("ALPACA_KEY"), Some("ALPACA_SECRET")),
        "TWELVEDATA" => (Some("TWELVEDATA_API_KEY"), None),
        _ => (None, None),
    }
}

/// Resolve `(api_key, api_secret)` for `vendor` from the environment.
///
/// Checks `MP_<VENDOR>_API_KEY` / `MP_<VENDOR>_API_SECRET` first (vendor
/// name upper-cased), then falls back to the vendor's compatibility
/// variable names if the canonical one is unset.
pub fn resolve_vendor_credentials(vendor: &str) -> VendorCredentials {
    let vendor_upper = vendor.to_ascii_uppercase();
    let canonical_key_var = format!("MP_{vendor_upper}_API_KEY");
    let canonical_secret_var = format!("MP_{vendor_upper}_API_SECRET");
    let (compat_key_var, compat_secret_var) = compat_var_names(&vendor_upper);

    let api_key = resolve_env(&canonical_key_var).or_else(|| compat_key_var.and_then(resolve_env));
    let api_secret = resolve_env(&canonical_secret_var).or_else(|| compat_secret_var.and_then(resolve_env));

    VendorCredentials { api_key, api_secret }
}

/// Replace every occurrence of `secret` in `haystack` with `<REDACTED>`.
/// Used by adapters so an error message that happens to echo a request URL
/// or query string never carries the literal credential value. A no-op if
/// `secret` is empty, since an empty needle would match everywhere.
pub fn mask_secret(haystack: &str, secret: &str) -> String {
    if secret.is_empty() {
        return haystack.to_string();
    }
    haystack.replace(secret, "<REDACTED>")
}

/// Apply [`mask_secret`] for every credential present, in order.
pub fn mask_secrets(haystack: &str, credentials: &VendorCredentials) -> String {
    let mut masked = haystack.to_string();
    if let Some(key) = &credentials.api_key {
        masked = mask_secret(&masked, key);
    }
    if let Some(secret) = &credentials.api_secret {
        masked = mask_secret(&masked, secret);
    }
    masked
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Env var mutation races across parallel tests in the same process;
    // serialize just the tests that touch process env.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn resolves_canonical_vendor_env_vars() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("MP_TESTVENDOR_API_KEY", "key123");
        std::env::set_var("MP_TESTVENDOR_API_SECRET", "secret456");

        let creds = resolve_vendor_credentials("testvendor");
        assert_eq!(creds.api_key.as_deref(), Some("key123"));
        assert_eq!(creds.api_secret.as_deref(), Some("secret456"));

        std::env::remove_var("MP_TESTVENDOR_API_KEY");
        std::env::remove_var("MP_TESTVENDOR_API_SECRET");
    }

    #[test]
    fn falls_back_to_compat_var_for_alpaca() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::remove_var("MP_ALPACA_API_KEY");
        std::env::remove_var("MP_ALPACA_API_SECRET");
        std::env::set_var("ALPACA_KEY", "legacy-key");
        std::env::set_var("ALPACA_SECRET", "legacy-secret");

        let creds = resolve_vendor_credentials("alpaca");
        assert_eq!(creds.api_key.as_deref(), Some("legacy-key"));
        assert_eq!(creds.api_secret.as_deref(), Some("legacy-secret"));

        std::env::remove_var("ALPACA_KEY");
        std::env::remove_var("ALPACA_SECRET");
    }

    #[test]
    fn missing_vendor_credentials_resolve_to_none() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::remove_var("MP_NOSUCHVENDOR_API_KEY");
        std::env::remove_var("MP_NOSUCHVENDOR_API_SECRET");
        let creds = resolve_vendor_credentials("nosuchvendor");
        assert!(creds.api_key.is_none());
        assert!(creds.api_secret.is_none());
    }

    #[test]
    fn debug_output_never_contains_the_secret_value() {
        let creds = VendorCredentials { api_key: Some("super-secret-key".to_string()), api_secret: None };
        let rendered = format!("{creds:?}");
        assert!(!rendered.contains("super-secret-key"));
        assert!(rendered.contains("REDACTED"));
    }

    #[test]
    fn mask_secret_replaces_every_occurrence() {
        let haystack = "GET /time_series?apikey=abc123&symbol=AAPL failed, retried with apikey=abc123 again";
        let masked = mask_secret(haystack, "abc123");
        assert!(!masked.contains("abc123"));
        assert_eq!(masked.matches("<REDACTED>").count(), 2);
    }

    #[test]
    fn mask_secret_is_noop_for_empty_needle() {
        let haystack = "unchanged";
        assert_eq!(mask_secret(haystack, ""), haystack);
    }
}
