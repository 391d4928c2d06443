use crate::thresholds::Thresholds;
use crate::trigger::TriggerSettings;
use anyhow::{Context, Result};
use serde::Deserialize;

/// Complete Firewatch configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FirewatchConfig {
    /// Bearer token required by PUT /api/admin/thresholds. None = unrestricted.
    #[serde(default)]
    pub admin_token: Option<String>,
    #[serde(default)]
    pub server: ServerConfig,
    /// Initial thresholds; adjustable at runtime through the admin API
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub trigger: TriggerSettings,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

fn default_bind_address() -> String {
    "0.0.0.0:5000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}

/// Record-keeping limits
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Readings kept by the in-memory store
    #[serde(default = "default_max_stored_readings")]
    pub max_stored_readings: usize,
    /// Camera captures kept by the in-memory image store
    #[serde(default = "default_max_stored_images")]
    pub max_stored_images: usize,
    /// Trigger events kept in the audit log
    #[serde(default = "default_trigger_log_capacity")]
    pub trigger_log_capacity: usize,
}

fn default_max_stored_readings() -> usize {
    100_000
}

fn default_max_stored_images() -> usize {
    500
}

fn default_trigger_log_capacity() -> usize {
    1000
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            max_stored_readings: default_max_stored_readings(),
            max_stored_images: default_max_stored_images(),
            trigger_log_capacity: default_trigger_log_capacity(),
        }
    }
}

impl FirewatchConfig {
    /// Load from an optional TOML file, then apply `FIREWATCH_*` overrides.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut config = match path {
            Some(path) => load_config(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Override fields from environment-style lookups. Unparseable values are
    /// ignored and the existing value kept.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("FIREWATCH_BIND_ADDRESS") {
            self.server.bind_address = v;
        }
        if let Some(v) = lookup("FIREWATCH_ADMIN_TOKEN") {
            self.admin_token = Some(v).filter(|t| !t.is_empty());
        }
        if let Some(n) = lookup("FIREWATCH_ABS_THRESHOLD").and_then(|v| v.parse::<f64>().ok()) {
            self.thresholds.abs_threshold = n;
        }
        if let Some(n) = lookup("FIREWATCH_RISE_THRESHOLD").and_then(|v| v.parse::<f64>().ok()) {
            self.thresholds.rise_threshold = n;
        }
        if let Some(d) = lookup("FIREWATCH_WINDOW_SECS")
            .and_then(|v| v.parse::<f64>().ok())
            .and_then(|secs| std::time::Duration::try_from_secs_f64(secs).ok())
        {
            self.thresholds.window_duration = d;
        }
        if let Some(v) = lookup("FIREWATCH_RELAY_URL") {
            self.trigger.relay_url = Some(v).filter(|u| !u.is_empty());
        }
        if let Some(v) = lookup("FIREWATCH_DEFAULT_CAMERA") {
            self.trigger.default_camera_id = Some(v).filter(|c| !c.is_empty());
        }
        if let Some(n) = lookup("FIREWATCH_CALL_TIMEOUT_SECS").and_then(|v| v.parse::<u64>().ok()) {
            self.trigger.call_timeout_secs = n;
        }
        if let Some(n) = lookup("FIREWATCH_COOLDOWN_SECS").and_then(|v| v.parse::<u64>().ok()) {
            self.trigger.cooldown_secs = n;
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.thresholds
            .validate()
            .context("Invalid [thresholds] configuration")?;
        if self.trigger.call_timeout_secs == 0 {
            anyhow::bail!("trigger.call_timeout_secs must be at least 1");
        }
        Ok(())
    }
}

/// Load configuration from TOML file
pub fn load_config(path: &str) -> Result<FirewatchConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path))?;
    let config: FirewatchConfig =
        toml::from_str(&contents).with_context(|| format!("Failed to parse config file {}", path))?;
    Ok(config)
}
