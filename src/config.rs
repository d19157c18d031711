//! Service configuration module.
//!
//! Handles loading, validating, and merging `photo-veil.toml`. Stock
//! defaults are the base layer; the user file is a sparse overlay on top.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [storage]
//! records_path = "photo-veil-data/records.json"
//! blob_dir = "photo-veil-data/blobs"
//! public_base_url = "http://localhost:8080/photos"
//! max_upload_bytes = 10485760
//!
//! [annotation]
//! endpoint = "https://vision.googleapis.com"
//! api_key_env = "VISION_API_KEY"
//! timeout_secs = 30
//!
//! [transform]
//! focus_blur_sigma = 25.0
//! blur_sigma = 15.0
//! thumbnail_size = [400, 400]
//! quality = 90
//! timeout_secs = 60
//!
//! [publish]
//! commit = "last-writer-wins"   # or "compare-and-set"
//!
//! [processing]
//! max_processes = 4             # Omit for auto = CPU cores
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "photo-veil.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Service configuration loaded from `photo-veil.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Where records and artifacts live.
    pub storage: StorageConfig,
    /// Vision annotation service.
    pub annotation: AnnotationConfig,
    /// Mask transform and thumbnail settings.
    pub transform: TransformSettings,
    /// Commit policy for publishes.
    pub publish: PublishConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl ServiceConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.transform;
        if t.quality == 0 || t.quality > 100 {
            return Err(ConfigError::Validation(
                "transform.quality must be 1-100".into(),
            ));
        }
        if t.thumbnail_size[0] == 0 || t.thumbnail_size[1] == 0 {
            return Err(ConfigError::Validation(
                "transform.thumbnail_size values must be non-zero".into(),
            ));
        }
        for (name, sigma) in [
            ("focus_blur_sigma", t.focus_blur_sigma),
            ("blur_sigma", t.blur_sigma),
        ] {
            if !(sigma.is_finite() && sigma > 0.0) {
                return Err(ConfigError::Validation(format!(
                    "transform.{name} must be a positive number"
                )));
            }
        }
        if t.timeout_secs == 0 || self.annotation.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "timeout_secs must be at least 1".into(),
            ));
        }
        if self.storage.max_upload_bytes == 0 {
            return Err(ConfigError::Validation(
                "storage.max_upload_bytes must be non-zero".into(),
            ));
        }
        if self.annotation.endpoint.trim().is_empty() {
            return Err(ConfigError::Validation(
                "annotation.endpoint must not be empty".into(),
            ));
        }
        if self.annotation.api_key_env.trim().is_empty() {
            return Err(ConfigError::Validation(
                "annotation.api_key_env must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Record store and blob store locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// JSON file holding every photo record.
    pub records_path: PathBuf,
    /// Directory holding artifact objects.
    pub blob_dir: PathBuf,
    /// Prefix of public artifact URLs.
    pub public_base_url: String,
    /// Largest accepted upload.
    pub max_upload_bytes: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            records_path: PathBuf::from("photo-veil-data/records.json"),
            blob_dir: PathBuf::from("photo-veil-data/blobs"),
            public_base_url: "http://localhost:8080/photos".to_string(),
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Vision service connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnnotationConfig {
    pub endpoint: String,
    /// Environment variable the API key is read from.
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl AnnotationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://vision.googleapis.com".to_string(),
            api_key_env: "VISION_API_KEY".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Blur strengths, thumbnail size, encoding quality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransformSettings {
    /// Gaussian sigma for the background in focus mode.
    pub focus_blur_sigma: f32,
    /// Gaussian sigma for selected regions in blur mode.
    pub blur_sigma: f32,
    /// Thumbnail crop as `[width, height]`.
    pub thumbnail_size: [u32; 2],
    /// JPEG quality (1-100).
    pub quality: u32,
    pub timeout_secs: u64,
}

impl TransformSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for TransformSettings {
    fn default() -> Self {
        Self {
            focus_blur_sigma: 25.0,
            blur_sigma: 15.0,
            thumbnail_size: [400, 400],
            quality: 90,
            timeout_secs: 60,
        }
    }
}

/// How the final record commit treats a concurrent publish.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommitPolicy {
    /// Commit unconditionally; a concurrent publish may be overwritten.
    #[default]
    LastWriterWins,
    /// Commit only if the stored version is still the base version.
    CompareAndSet,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PublishConfig {
    pub commit: CommitPolicy,
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of worker threads.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(ServiceConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value. `Ok(None)` if it doesn't exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    Ok(Some(toml::from_str(&content)?))
}

/// Merge an optional overlay onto the stock defaults, then deserialize and validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<ServiceConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: ServiceConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`, falling back to stock defaults if it's missing.
pub fn load_config(path: &Path) -> Result<ServiceConfig, ConfigError> {
    resolve_config(load_raw_config(path)?)
}

/// Returns a fully-commented stock `photo-veil.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Photo Veil Configuration
# ========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Storage
# ---------------------------------------------------------------------------
[storage]
# JSON file holding every photo record.
records_path = "photo-veil-data/records.json"

# Directory holding the original, full-size and thumbnail artifacts.
blob_dir = "photo-veil-data/blobs"

# Artifact URLs are "{public_base_url}/{id}_{version}-{kind}.jpeg".
public_base_url = "http://localhost:8080/photos"

# Largest accepted upload in bytes (10 MiB).
max_upload_bytes = 10485760

# ---------------------------------------------------------------------------
# Annotation service
# ---------------------------------------------------------------------------
[annotation]
# Base URL; requests go to "{endpoint}/v1/images:annotate".
endpoint = "https://vision.googleapis.com"

# Environment variable holding the API key.
api_key_env = "VISION_API_KEY"

# Give up on an annotation call after this many seconds.
timeout_secs = 30

# ---------------------------------------------------------------------------
# Transform
# ---------------------------------------------------------------------------
[transform]
# Gaussian sigma (pixels) applied outside the selection in Focus mode.
focus_blur_sigma = 25.0

# Gaussian sigma (pixels) applied inside the selection in Blur mode.
blur_sigma = 15.0

# Thumbnail crop as [width, height], taken from the full-size image.
thumbnail_size = [400, 400]

# JPEG encoding quality (1 = worst, 100 = best).
quality = 90

# Give up on the transform after this many seconds.
timeout_secs = 60

# ---------------------------------------------------------------------------
# Publish
# ---------------------------------------------------------------------------
[publish]
# "last-writer-wins": concurrent edits of one photo may overwrite each other.
# "compare-and-set": the commit fails if another publish landed first.
commit = "last-writer-wins"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum worker threads.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(toml_str: &str) -> Result<ServiceConfig, ConfigError> {
        resolve_config(Some(toml::from_str(toml_str)?))
    }

    // =========================================================================
    // Defaults and parsing
    // =========================================================================

    #[test]
    fn default_config_values() {
        let config = ServiceConfig::default();
        assert_eq!(config.transform.thumbnail_size, [400, 400]);
        assert_eq!(config.transform.focus_blur_sigma, 25.0);
        assert_eq!(config.transform.blur_sigma, 15.0);
        assert_eq!(config.storage.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.publish.commit, CommitPolicy::LastWriterWins);
        assert_eq!(config.processing.max_processes, None);
    }

    #[test]
    fn focus_background_blur_is_stronger_than_region_blur() {
        let t = ServiceConfig::default().transform;
        assert!(t.focus_blur_sigma > t.blur_sigma);
    }

    #[test]
    fn parse_partial_config() {
        let config = parse(
            r#"
            [transform]
            quality = 75
            "#,
        )
        .unwrap();
        assert_eq!(config.transform.quality, 75);
        assert_eq!(config.transform.thumbnail_size, [400, 400]);
        assert_eq!(config.storage, StorageConfig::default());
    }

    #[test]
    fn parse_commit_policy() {
        let config = parse(
            r#"
            [publish]
            commit = "compare-and-set"
            "#,
        )
        .unwrap();
        assert_eq!(config.publish.commit, CommitPolicy::CompareAndSet);
    }

    #[test]
    fn unknown_commit_policy_rejected() {
        assert!(parse("[publish]\ncommit = \"first-wins\"").is_err());
    }

    #[test]
    fn timeouts_as_durations() {
        let config = ServiceConfig::default();
        assert_eq!(config.annotation.timeout(), Duration::from_secs(30));
        assert_eq!(config.transform.timeout(), Duration::from_secs(60));
    }

    // =========================================================================
    // Loading from disk
    // =========================================================================

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join(DEFAULT_CONFIG_FILE)).unwrap();
        assert_eq!(config, ServiceConfig::default());
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(DEFAULT_CONFIG_FILE);
        fs::write(
            &path,
            r#"
            [storage]
            public_base_url = "https://storage.googleapis.com/my-bucket"

            [processing]
            max_processes = 2
            "#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(
            config.storage.public_base_url,
            "https://storage.googleapis.com/my-bucket"
        );
        assert_eq!(config.processing.max_processes, Some(2));
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(DEFAULT_CONFIG_FILE);
        fs::write(&path, "this is not valid toml [[[").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Toml(_))));
    }

    // =========================================================================
    // Unknown keys
    // =========================================================================

    #[test]
    fn unknown_key_rejected() {
        assert!(parse("[transform]\nqualty = 90").is_err());
    }

    #[test]
    fn unknown_section_rejected() {
        assert!(parse("[storrage]\nblob_dir = \"x\"").is_err());
    }

    // =========================================================================
    // Validation
    // =========================================================================

    #[test]
    fn validate_default_config_passes() {
        ServiceConfig::default().validate().unwrap();
    }

    #[test]
    fn validate_quality_bounds() {
        assert!(parse("[transform]\nquality = 0").is_err());
        assert!(parse("[transform]\nquality = 101").is_err());
        assert!(parse("[transform]\nquality = 100").is_ok());
    }

    #[test]
    fn validate_thumbnail_size_zero() {
        let err = parse("[transform]\nthumbnail_size = [0, 400]").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(msg) if msg.contains("thumbnail_size")));
    }

    #[test]
    fn validate_sigma_positive() {
        let err = parse("[transform]\nblur_sigma = 0.0").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(msg) if msg.contains("blur_sigma")));
    }

    #[test]
    fn validate_timeouts_and_limits() {
        assert!(parse("[annotation]\ntimeout_secs = 0").is_err());
        assert!(parse("[storage]\nmax_upload_bytes = 0").is_err());
        assert!(parse("[annotation]\napi_key_env = \"\"").is_err());
    }

    // =========================================================================
    // merge_toml
    // =========================================================================

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str("a = 1\nb = 2").unwrap();
        let overlay: toml::Value = toml::from_str("b = 3").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["a"].as_integer(), Some(1));
        assert_eq!(merged["b"].as_integer(), Some(3));
    }

    #[test]
    fn merge_toml_nested_tables() {
        let base: toml::Value = toml::from_str("[t]\nx = 1\ny = 2").unwrap();
        let overlay: toml::Value = toml::from_str("[t]\ny = 5\nz = 6").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["t"]["x"].as_integer(), Some(1));
        assert_eq!(merged["t"]["y"].as_integer(), Some(5));
        assert_eq!(merged["t"]["z"].as_integer(), Some(6));
    }

    #[test]
    fn merge_toml_arrays_replace() {
        let base: toml::Value = toml::from_str("s = [1, 2]").unwrap();
        let overlay: toml::Value = toml::from_str("s = [3]").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["s"].as_array().map(|a| a.len()), Some(1));
    }

    // =========================================================================
    // Stock config
    // =========================================================================

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let value: toml::Value = toml::from_str(stock_config_toml()).unwrap();
        let config: ServiceConfig = value.try_into().unwrap();
        assert_eq!(config, ServiceConfig::default());
    }

    #[test]
    fn stock_defaults_value_has_all_sections() {
        let value = stock_defaults_value().unwrap();
        for section in ["storage", "annotation", "transform", "publish", "processing"] {
            assert!(value.get(section).is_some(), "missing [{section}]");
        }
    }

    // =========================================================================
    // effective_threads
    // =========================================================================

    #[test]
    fn effective_threads_auto_uses_cores() {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&ProcessingConfig::default()), cores);
    }

    #[test]
    fn effective_threads_user_constrains_down() {
        let config = ProcessingConfig {
            max_processes: Some(1),
        };
        assert_eq!(effective_threads(&config), 1);
    }

    #[test]
    fn effective_threads_clamped_to_cores() {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let config = ProcessingConfig {
            max_processes: Some(cores + 100),
        };
        assert_eq!(effective_threads(&config), cores);
    }
}
