//! Engine configuration.

use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Risk sizing knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizerConfig {
    /// Damping factor applied when pyramiding onto an existing
    /// same-direction position. Default: 0.5.
    #[serde(default = "default_damping")]
    pub damping: Decimal,
    /// Safety floor for degenerate (non-positive) computed sizes, in
    /// underlying units. Default: 0.001.
    #[serde(default = "default_min_quantity_floor")]
    pub min_quantity_floor: Decimal,
}

fn default_damping() -> Decimal {
    Decimal::new(5, 1) // 0.5
}

fn default_min_quantity_floor() -> Decimal {
    Decimal::new(1, 3) // 0.001
}

impl Default for SizerConfig {
    fn default() -> Self {
        Self {
            damping: default_damping(),
            min_quantity_floor: default_min_quantity_floor(),
        }
    }
}

/// Flip reconciliation knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlipConfig {
    /// Maximum reduce-only close iterations. Default: 5.
    #[serde(default = "default_max_close_iterations")]
    pub max_close_iterations: u32,
    /// Wait between close iterations (ms). Default: 1,500.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Wait for a conditional fallback order to trigger (ms).
    /// Default: 3,000.
    #[serde(default = "default_trigger_wait_ms")]
    pub trigger_wait_ms: u64,
}

fn default_max_close_iterations() -> u32 {
    5
}

fn default_poll_interval_ms() -> u64 {
    1_500
}

fn default_trigger_wait_ms() -> u64 {
    3_000
}

impl Default for FlipConfig {
    fn default() -> Self {
        Self {
            max_close_iterations: default_max_close_iterations(),
            poll_interval_ms: default_poll_interval_ms(),
            trigger_wait_ms: default_trigger_wait_ms(),
        }
    }
}

/// Order placement retry knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum scale-up retries for insufficient-notional opens.
    /// Default: 2.
    #[serde(default = "default_max_scale_ups")]
    pub max_scale_ups: u32,
    /// Quantity multiplier per scale-up retry. Default: 1.1.
    #[serde(default = "default_scale_factor")]
    pub scale_factor: Decimal,
}

fn default_max_scale_ups() -> u32 {
    2
}

fn default_scale_factor() -> Decimal {
    Decimal::new(11, 1) // 1.1
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_scale_ups: default_max_scale_ups(),
            scale_factor: default_scale_factor(),
        }
    }
}

/// Lease-based external lock knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaseConfig {
    /// Lease TTL (ms). Default: 30,000.
    #[serde(default = "default_ttl_ms")]
    pub ttl_ms: u64,
    /// Acquire attempts before giving up. Default: 5.
    #[serde(default = "default_acquire_attempts")]
    pub acquire_attempts: u32,
    /// Wait between acquire attempts (ms). Default: 200.
    #[serde(default = "default_acquire_interval_ms")]
    pub acquire_interval_ms: u64,
}

fn default_ttl_ms() -> u64 {
    30_000
}

fn default_acquire_attempts() -> u32 {
    5
}

fn default_acquire_interval_ms() -> u64 {
    200
}

impl Default for LeaseConfig {
    fn default() -> Self {
        Self {
            ttl_ms: default_ttl_ms(),
            acquire_attempts: default_acquire_attempts(),
            acquire_interval_ms: default_acquire_interval_ms(),
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Bounded fan-out width. Default: 8.
    #[serde(default = "default_worker_limit")]
    pub worker_limit: usize,
    /// Idempotency bucket length in seconds. Default: 5.
    #[serde(default = "default_dedupe_window_secs")]
    pub dedupe_window_secs: u64,
    /// Maximum age of a cached account snapshot before sizing falls
    /// back to a live balance query (seconds). Default: 30.
    #[serde(default = "default_snapshot_max_age_secs")]
    pub snapshot_max_age_secs: i64,
    #[serde(default)]
    pub sizer: SizerConfig,
    #[serde(default)]
    pub flip: FlipConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub lease: LeaseConfig,
}

fn default_worker_limit() -> usize {
    8
}

fn default_dedupe_window_secs() -> u64 {
    5
}

fn default_snapshot_max_age_secs() -> i64 {
    30
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_limit: default_worker_limit(),
            dedupe_window_secs: default_dedupe_window_secs(),
            snapshot_max_age_secs: default_snapshot_max_age_secs(),
            sizer: SizerConfig::default(),
            flip: FlipConfig::default(),
            retry: RetryConfig::default(),
            lease: LeaseConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from the file named by `RELAY_CONFIG`, or
    /// defaults when no file exists at that path.
    pub fn load() -> EngineResult<Self> {
        let path =
            std::env::var("RELAY_CONFIG").unwrap_or_else(|_| "config/default.toml".to_string());

        if Path::new(&path).exists() {
            Self::from_file(&path)
        } else {
            tracing::warn!(%path, "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load from a specific TOML file.
    pub fn from_file(path: &str) -> EngineResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("failed to read {path}: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| EngineError::Config(format!("failed to parse {path}: {e}")))
    }
}
