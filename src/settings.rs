use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::metrics::{
    StatsWindows, DEFAULT_HISTORY_CAPACITY, DEFAULT_RECENT_WINDOW, DEFAULT_STATS_WINDOW,
    MAX_THRESHOLD, MIN_THRESHOLD,
};

pub const CONFIG_PATH_ENV: &str = "MINDWAVE_CONFIG";
pub const SEED_ENV: &str = "MINDWAVE_SEED";
pub const DEBUG_ENV: &str = "MINDWAVE_DEBUG";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum AlertPolicy {
    /// Alert on every stats recomputation while the condition holds.
    #[default]
    EveryRecompute,
    /// Alert once, then stay quiet until the condition clears.
    OncePerEpisode,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct TelemetryConfig {
    pub tick_interval_ms: u64,
    pub connect_latency_ms: u64,
    pub history_capacity: usize,
    pub stats_window: usize,
    pub recent_window: usize,
    pub alert_min_readings: usize,
    pub default_threshold: f64,
    pub alert_policy: AlertPolicy,
    /// Fixed RNG seed for reproducible sessions; entropy when unset.
    pub seed: Option<u64>,
    /// Log every tick instead of only state changes.
    pub debug: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1_000,
            connect_latency_ms: 1_500,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            stats_window: DEFAULT_STATS_WINDOW,
            recent_window: DEFAULT_RECENT_WINDOW,
            alert_min_readings: 3,
            default_threshold: 70.0,
            alert_policy: AlertPolicy::EveryRecompute,
            seed: None,
            debug: false,
        }
    }
}

impl TelemetryConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn connect_latency(&self) -> Duration {
        Duration::from_millis(self.connect_latency_ms)
    }

    pub fn windows(&self) -> StatsWindows {
        StatsWindows {
            averages: self.stats_window,
            recent: self.recent_window,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.tick_interval_ms == 0 {
            bail!("tickIntervalMs must be greater than zero");
        }
        if self.history_capacity == 0 {
            bail!("historyCapacity must be greater than zero");
        }
        if self.stats_window == 0 || self.stats_window > self.history_capacity {
            bail!(
                "statsWindow must be between 1 and historyCapacity ({}), got {}",
                self.history_capacity,
                self.stats_window
            );
        }
        if self.recent_window == 0 || self.recent_window > self.history_capacity {
            bail!(
                "recentWindow must be between 1 and historyCapacity ({}), got {}",
                self.history_capacity,
                self.recent_window
            );
        }
        if !(MIN_THRESHOLD..=MAX_THRESHOLD).contains(&self.default_threshold) {
            bail!(
                "defaultThreshold must be between {MIN_THRESHOLD} and {MAX_THRESHOLD}, got {}",
                self.default_threshold
            );
        }
        Ok(())
    }

    /// Apply `MINDWAVE_SEED` / `MINDWAVE_DEBUG` on top of file values.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(raw) = std::env::var(SEED_ENV) {
            let seed = raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("{SEED_ENV} must be an unsigned integer, got {raw:?}"))?;
            self.seed = Some(seed);
        }
        if let Ok(value) = std::env::var(DEBUG_ENV) {
            self.debug = value == "1" || value.eq_ignore_ascii_case("true");
        }
        Ok(())
    }
}

pub struct SettingsStore {
    path: PathBuf,
    config: TelemetryConfig,
}

impl SettingsStore {
    /// Read the config at `path`. A missing file yields defaults; an
    /// unreadable or malformed one is an error.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let config = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse settings in {}", path.display()))?
        } else {
            TelemetryConfig::default()
        };

        config
            .validate()
            .with_context(|| format!("Invalid settings in {}", path.display()))?;

        Ok(Self { path, config })
    }

    /// Resolve the config path from `MINDWAVE_CONFIG`, falling back to
    /// `mindwave.json` in the working directory, then apply env overrides.
    pub fn from_env() -> Result<Self> {
        let path = std::env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("mindwave.json"));
        let mut store = Self::load(path)?;
        store.config.apply_env_overrides()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }

    pub fn into_config(self) -> TelemetryConfig {
        self.config
    }
}
