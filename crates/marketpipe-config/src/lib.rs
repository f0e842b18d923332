//! marketpipe-config
//!
//! Layered settings loading (§6): merge YAML files in override order, hash
//! the canonical result so callers can detect a config change across runs,
//! then layer env var overrides (`MP_DATA_DIR`, `MP_DB`,
//! `METRICS_DB_PATH`) and per-vendor secret resolution on top.

pub mod secrets;

use anyhow::{Context, Result};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::PathBuf;

pub use secrets::{mask_secret, resolve_vendor_credentials, VendorCredentials};

pub const ENV_DATA_DIR: &str = "MP_DATA_DIR";
pub const ENV_DB_URL: &str = "MP_DB";
pub const ENV_METRICS_DB_PATH: &str = "METRICS_DB_PATH";

const DEFAULT_DATA_DIR: &str = "./data";
const DEFAULT_DB_URL: &str = "sqlite://marketpipe.db";

/// Load + merge YAML files in order, then canonicalize to JSON and hash.
/// Later files override earlier files via deep-merge.
pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let mut merged = Value::Object(Default::default());

    for p in paths {
        let s = fs::read_to_string(p).with_context(|| format!("read config: {p}"))?;
        let yaml_val: serde_yaml::Value =
            serde_yaml::from_str(&s).with_context(|| format!("parse yaml: {p}"))?;
        let json_val = serde_json::to_value(yaml_val).context("yaml->json conversion failed")?;
        deep_merge(&mut merged, json_val);
    }

    let canonical = canonicalize_json(&merged);

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    let hash = hex::encode(hasher.finalize());

    Ok(LoadedConfig {
        config_json: serde_json::from_str(&canonical).context("canonical json parse failed")?,
        canonical_json: canonical,
        config_hash: hash,
    })
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_json: Value,
    pub canonical_json: String,
    pub config_hash: String,
}

/// Deep-merge: objects merge recursively; arrays replaced; scalars overwritten.
fn deep_merge(dst: &mut Value, src: Value) {
    match (dst, src) {
        (Value::Object(dst_map), Value::Object(src_map)) => {
            for (k, v) in src_map {
                match dst_map.get_mut(&k) {
                    Some(existing) => deep_merge(existing, v),
                    None => {
                        dst_map.insert(k, v);
                    }
                }
            }
        }
        (dst_slot, src_val) => {
            *dst_slot = src_val;
        }
    }
}

/// Canonicalize JSON by sorting all object keys recursively and emitting compact JSON.
fn canonicalize_json(v: &Value) -> String {
    let sorted = sort_keys(v);
    serde_json::to_string(&sorted).expect("json serialization must not fail")
}

fn sort_keys(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut keys: Vec<_> = map.keys().cloned().collect();
            keys.sort();
            let mut new = serde_json::Map::new();
            for k in keys {
                new.insert(k.clone(), sort_keys(&map[&k]));
            }
            Value::Object(new)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_keys).collect()),
        _ => v.clone(),
    }
}

/// Rate limit, keyed by vendor name, read from `/rate_limits/<vendor>` in
/// the merged config (capacity in requests, refill rate per second).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimitSetting {
    pub capacity: u32,
    pub refill_per_sec: f64,
}

/// Resolved, ready-to-use settings for one MarketPipe run. Built by layering
/// config-file values under env var overrides, matching the precedence
/// every other ambient setting in this crate follows (env wins).
#[derive(Debug, Clone)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub db_url: String,
    pub metrics_db_path: Option<PathBuf>,
    pub retention_days: Option<u32>,
    pub config_hash: String,
}

impl Settings {
    /// Load layered YAML config files, then apply env var overrides.
    /// `dotenvy::dotenv()` is attempted first (ignored if no `.env` file is
    /// present) so local development doesn't require exporting vars by hand.
    pub fn load(paths: &[&str]) -> Result<Self> {
        let _ = dotenvy::dotenv();
        let loaded = if paths.is_empty() {
            LoadedConfig { config_json: Value::Object(Default::default()), canonical_json: "{}".to_string(), config_hash: empty_hash() }
        } else {
            load_layered_yaml(paths)?
        };
        Ok(Self::from_loaded(&loaded))
    }

    fn from_loaded(loaded: &LoadedConfig) -> Self {
        let data_dir = std::env::var(ENV_DATA_DIR)
            .ok()
            .or_else(|| read_str_at(&loaded.config_json, "/data_dir"))
            .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string());

        let db_url = std::env::var(ENV_DB_URL)
            .ok()
            .or_else(|| read_str_at(&loaded.config_json, "/db_url"))
            .unwrap_or_else(|| DEFAULT_DB_URL.to_string());

        let metrics_db_path = std::env::var(ENV_METRICS_DB_PATH)
            .ok()
            .or_else(|| read_str_at(&loaded.config_json, "/metrics_db_path"))
            .map(PathBuf::from);

        let retention_days = loaded
            .config_json
            .pointer("/retention_days")
            .and_then(Value::as_u64)
            .map(|n| n as u32);

        Self {
            data_dir: PathBuf::from(data_dir),
            db_url,
            metrics_db_path,
            retention_days,
            config_hash: loaded.config_hash.clone(),
        }
    }

    /// Rate limit configured for `vendor` at `/rate_limits/<vendor>`, or
    /// `None` if the config doesn't mention it (callers fall back to a
    /// vendor-specific default).
    pub fn rate_limit_for(&self, loaded: &LoadedConfig, vendor: &str) -> Option<RateLimitSetting> {
        let pointer = format!("/rate_limits/{vendor}");
        let node = loaded.config_json.pointer(&pointer)?;
        let capacity = node.get("capacity")?.as_u64()? as u32;
        let refill_per_sec = node.get("refill_per_sec")?.as_f64()?;
        Some(RateLimitSetting { capacity, refill_per_sec })
    }
}

fn read_str_at(config: &Value, pointer: &str) -> Option<String> {
    let s = config.pointer(pointer)?.as_str()?;
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn empty_hash() -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"{}");
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn write_yaml(dir: &tempfile::TempDir, name: &str, contents: &str) -> String {
        let path = dir.path().join(name);
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path.to_str().unwrap().to_string()
    }

    #[test]
    fn deep_merge_overrides_scalars_and_merges_nested_objects() {
        let dir = tempfile::tempdir().unwrap();
        let base = write_yaml(&dir, "base.yaml", "data_dir: /base\nrate_limits:\n  twelvedata:\n    capacity: 8\n    refill_per_sec: 8.0\n");
        let override_file = write_yaml(&dir, "override.yaml", "data_dir: /override\nrate_limits:\n  twelvedata:\n    capacity: 16\n");

        let loaded = load_layered_yaml(&[&base, &override_file]).unwrap();
        assert_eq!(loaded.config_json.pointer("/data_dir").unwrap().as_str().unwrap(), "/override");
        assert_eq!(loaded.config_json.pointer("/rate_limits/twelvedata/capacity").unwrap().as_u64().unwrap(), 16);
        // Untouched nested key from the base file survives the merge.
        assert_eq!(loaded.config_json.pointer("/rate_limits/twelvedata/refill_per_sec").unwrap().as_f64().unwrap(), 8.0);
    }

    #[test]
    fn canonical_hash_is_stable_regardless_of_key_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_yaml(&dir, "a.yaml", "b: 2\na: 1\n");
        let b = write_yaml(&dir, "b.yaml", "a: 1\nb: 2\n");

        let loaded_a = load_layered_yaml(&[&a]).unwrap();
        let loaded_b = load_layered_yaml(&[&b]).unwrap();
        assert_eq!(loaded_a.config_hash, loaded_b.config_hash);
    }

    #[test]
    fn settings_env_override_wins_over_config_file() {
        let _guard = ENV_LOCK.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = write_yaml(&dir, "base.yaml", "data_dir: /from-config\n");

        std::env::set_var(ENV_DATA_DIR, "/from-env");
        let settings = Settings::load(&[&path]).unwrap();
        std::env::remove_var(ENV_DATA_DIR);

        assert_eq!(settings.data_dir, PathBuf::from("/from-env"));
    }

    #[test]
    fn settings_falls_back_to_config_file_value_when_no_env_override() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::remove_var(ENV_DATA_DIR);
        let dir = tempfile::tempdir().unwrap();
        let path = write_yaml(&dir, "base.yaml", "data_dir: /from-config\ndb_url: sqlite://from-config.db\nretention_days: 30\n");

        let settings = Settings::load(&[&path]).unwrap();
        assert_eq!(settings.data_dir, PathBuf::from("/from-config"));
        assert_eq!(settings.db_url, "sqlite://from-config.db");
        assert_eq!(settings.retention_days, Some(30));
    }

    #[test]
    fn settings_with_no_config_files_uses_defaults() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::remove_var(ENV_DATA_DIR);
        std::env::remove_var(ENV_DB_URL);
        let settings = Settings::load(&[]).unwrap();
        assert_eq!(settings.data_dir, PathBuf::from(DEFAULT_DATA_DIR));
        assert_eq!(settings.db_url, DEFAULT_DB_URL);
    }

    #[test]
    fn rate_limit_for_reads_vendor_specific_section() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_yaml(&dir, "base.yaml", "rate_limits:\n  twelvedata:\n    capacity: 8\n    refill_per_sec: 8.0\n");
        let loaded = load_layered_yaml(&[&path]).unwrap();
        let settings = Settings::from_loaded(&loaded);

        let limit = settings.rate_limit_for(&loaded, "twelvedata").unwrap();
        assert_eq!(limit.capacity, 8);
        assert_eq!(limit.refill_per_sec, 8.0);
        assert!(settings.rate_limit_for(&loaded, "unknown_vendor").is_none());
    }
}
