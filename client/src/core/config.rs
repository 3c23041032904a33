use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use super::cli::{CliConfig, Commands};
use super::constants::{
    APP_DOT_FOLDER, CONFIG_FILE_NAME, DEFAULT_CHANNEL_CAPACITY, DEFAULT_CLOUD_TIMEOUT_SECS,
    DEFAULT_MAX_IN_FLIGHT, DEFAULT_READ_BURST, DEFAULT_READS_PER_SECOND, DEFAULT_WRITE_BURST,
    DEFAULT_WRITES_PER_SECOND, MIN_RATE_PER_SECOND, SYSTEM_CONFIG_DIR,
};
use crate::domain::{SiteSettings, StorageSettings};
use crate::pipeline::WindowSelector;
use crate::utils::time::{parse_datetime, parse_period};

// =============================================================================
// File Config Structures (for JSON parsing)
// =============================================================================

/// Root config file structure
#[derive(Debug, Default, Clone, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub identifier: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub debug: Option<bool>,
    #[serde(default)]
    pub log: Option<LogFileConfig>,
    #[serde(default)]
    pub records: Option<RecordsFileConfig>,
    #[serde(default)]
    pub cloud: Option<CloudFileConfig>,
    #[serde(default)]
    pub rate_limit: Option<RateLimitFileConfig>,
    #[serde(default)]
    pub pipeline: Option<PipelineFileConfig>,
    #[serde(default)]
    pub vm: Option<SiteFileConfig>,
    #[serde(default)]
    pub network: Option<SiteFileConfig>,
    #[serde(default)]
    pub storage: Option<StorageFileConfig>,
    /// Capture unknown fields for warning
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct LogFileConfig {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct RecordsFileConfig {
    pub from: Option<String>,
    pub to: Option<String>,
    pub period: Option<String>,
}

#[derive(Default, Clone, Deserialize)]
pub struct CloudFileConfig {
    pub endpoint: Option<String>,
    pub secret: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl std::fmt::Debug for CloudFileConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudFileConfig")
            .field("endpoint", &self.endpoint)
            .field("secret", &self.secret.as_ref().map(|_| "***"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct RateLimitFileConfig {
    pub reads_per_second: Option<f64>,
    pub read_burst: Option<u32>,
    pub writes_per_second: Option<f64>,
    pub write_burst: Option<u32>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct PipelineFileConfig {
    pub max_in_flight: Option<usize>,
    pub channel_capacity: Option<usize>,
}

/// Site attributes of the compute and network kinds
#[derive(Debug, Default, Clone, Deserialize)]
pub struct SiteFileConfig {
    pub site_name: Option<String>,
    pub cloud_type: Option<String>,
    pub cloud_compute_service: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct StorageFileConfig {
    pub site_name: Option<String>,
}

impl FileConfig {
    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Loading config file");
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        tracing::trace!(config = ?config, "Parsed config file");
        Ok(config)
    }

    /// Warn about unknown fields in the config
    fn warn_unknown_fields(&self) {
        if let serde_json::Value::Object(map) = &self.extra
            && !map.is_empty()
        {
            let keys_str: String = map
                .keys()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            tracing::warn!(
                fields = %keys_str,
                "Unknown fields in config file (possible typos)"
            );
        }
    }

    /// Merge another FileConfig into this one (other takes precedence)
    fn merge(&mut self, other: FileConfig) {
        if other.identifier.is_some() {
            tracing::trace!(identifier = ?other.identifier, "Merging identifier");
            self.identifier = other.identifier;
        }
        if other.endpoint.is_some() {
            tracing::trace!(endpoint = ?other.endpoint, "Merging endpoint");
            self.endpoint = other.endpoint;
        }
        if other.debug.is_some() {
            tracing::trace!(debug = ?other.debug, "Merging debug");
            self.debug = other.debug;
        }

        // Log
        if let Some(log) = other.log {
            let current = self.log.get_or_insert_with(LogFileConfig::default);
            if log.path.is_some() {
                tracing::trace!(path = ?log.path, "Merging log.path");
                current.path = log.path;
            }
        }

        // Records window
        if let Some(records) = other.records {
            let current = self.records.get_or_insert_with(RecordsFileConfig::default);
            if records.from.is_some() {
                tracing::trace!(from = ?records.from, "Merging records.from");
                current.from = records.from;
            }
            if records.to.is_some() {
                tracing::trace!(to = ?records.to, "Merging records.to");
                current.to = records.to;
            }
            if records.period.is_some() {
                tracing::trace!(period = ?records.period, "Merging records.period");
                current.period = records.period;
            }
        }

        // Cloud API
        if let Some(cloud) = other.cloud {
            let current = self.cloud.get_or_insert_with(CloudFileConfig::default);
            if cloud.endpoint.is_some() {
                tracing::trace!(endpoint = ?cloud.endpoint, "Merging cloud.endpoint");
                current.endpoint = cloud.endpoint;
            }
            if cloud.secret.is_some() {
                tracing::trace!(secret = "***", "Merging cloud.secret");
                current.secret = cloud.secret;
            }
            if cloud.timeout_secs.is_some() {
                tracing::trace!(timeout_secs = ?cloud.timeout_secs, "Merging cloud.timeout_secs");
                current.timeout_secs = cloud.timeout_secs;
            }
        }

        // Rate limits
        if let Some(rate_limit) = other.rate_limit {
            let current = self
                .rate_limit
                .get_or_insert_with(RateLimitFileConfig::default);
            if rate_limit.reads_per_second.is_some() {
                tracing::trace!(reads_per_second = ?rate_limit.reads_per_second, "Merging rate_limit.reads_per_second");
                current.reads_per_second = rate_limit.reads_per_second;
            }
            if rate_limit.read_burst.is_some() {
                tracing::trace!(read_burst = ?rate_limit.read_burst, "Merging rate_limit.read_burst");
                current.read_burst = rate_limit.read_burst;
            }
            if rate_limit.writes_per_second.is_some() {
                tracing::trace!(writes_per_second = ?rate_limit.writes_per_second, "Merging rate_limit.writes_per_second");
                current.writes_per_second = rate_limit.writes_per_second;
            }
            if rate_limit.write_burst.is_some() {
                tracing::trace!(write_burst = ?rate_limit.write_burst, "Merging rate_limit.write_burst");
                current.write_burst = rate_limit.write_burst;
            }
        }

        // Pipeline
        if let Some(pipeline) = other.pipeline {
            let current = self.pipeline.get_or_insert_with(PipelineFileConfig::default);
            if pipeline.max_in_flight.is_some() {
                tracing::trace!(max_in_flight = ?pipeline.max_in_flight, "Merging pipeline.max_in_flight");
                current.max_in_flight = pipeline.max_in_flight;
            }
            if pipeline.channel_capacity.is_some() {
                tracing::trace!(channel_capacity = ?pipeline.channel_capacity, "Merging pipeline.channel_capacity");
                current.channel_capacity = pipeline.channel_capacity;
            }
        }

        // Resource kinds
        if let Some(vm) = other.vm {
            merge_site(self.vm.get_or_insert_with(SiteFileConfig::default), vm, "vm");
        }
        if let Some(network) = other.network {
            merge_site(
                self.network.get_or_insert_with(SiteFileConfig::default),
                network,
                "network",
            );
        }
        if let Some(storage) = other.storage {
            let current = self.storage.get_or_insert_with(StorageFileConfig::default);
            if storage.site_name.is_some() {
                tracing::trace!(site_name = ?storage.site_name, "Merging storage.site_name");
                current.site_name = storage.site_name;
            }
        }
    }
}

fn merge_site(current: &mut SiteFileConfig, other: SiteFileConfig, section: &'static str) {
    if other.site_name.is_some() {
        tracing::trace!(section, site_name = ?other.site_name, "Merging site_name");
        current.site_name = other.site_name;
    }
    if other.cloud_type.is_some() {
        tracing::trace!(section, cloud_type = ?other.cloud_type, "Merging cloud_type");
        current.cloud_type = other.cloud_type;
    }
    if other.cloud_compute_service.is_some() {
        tracing::trace!(
            section,
            cloud_compute_service = ?other.cloud_compute_service,
            "Merging cloud_compute_service"
        );
        current.cloud_compute_service = other.cloud_compute_service;
    }
}

// =============================================================================
// Runtime Config Structures
// =============================================================================

/// Cloud API access
#[derive(Clone)]
pub struct CloudConfig {
    pub endpoint: String,
    pub secret: String,
    pub timeout_secs: u64,
}

impl std::fmt::Debug for CloudConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudConfig")
            .field("endpoint", &self.endpoint)
            .field("secret", &"***")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Independent token buckets for cloud reads and collector writes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimitConfig {
    pub reads_per_second: f64,
    pub read_burst: u32,
    pub writes_per_second: f64,
    pub write_burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            reads_per_second: DEFAULT_READS_PER_SECOND,
            read_burst: DEFAULT_READ_BURST,
            writes_per_second: DEFAULT_WRITES_PER_SECOND,
            write_burst: DEFAULT_WRITE_BURST,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    pub max_in_flight: usize,
    pub channel_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Raw time-window inputs, parsed when the window is resolved
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordsConfig {
    pub from: Option<String>,
    pub to: Option<String>,
    pub period: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteConfig {
    pub site_name: Option<String>,
    pub cloud_type: Option<String>,
    pub cloud_compute_service: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub identifier: String,
    pub endpoint: String,
    pub debug: bool,
    pub log_path: Option<PathBuf>,
    pub records: RecordsConfig,
    pub cloud: CloudConfig,
    pub rate_limit: RateLimitConfig,
    pub pipeline: PipelineConfig,
    pub vm: SiteConfig,
    pub network: SiteConfig,
    pub storage_site_name: Option<String>,
    /// Config files that were merged, in load order
    pub sources: Vec<String>,
}

impl AppConfig {
    /// Load configuration with priority: CLI/env > config file > profile/system config > defaults
    pub fn load(cli: &CliConfig) -> Result<Self> {
        tracing::debug!("Loading application configuration");
        tracing::trace!(debug = cli.debug, config = ?cli.config, "CLI config");

        let mut file_config = FileConfig::default();
        let mut found_configs: Vec<String> = Vec::new();

        // 1. Profile (~/.cloudtally/cloudtally.json) and system-wide config - skip if not exists
        let base_paths = [
            get_profile_config_path(),
            Some(PathBuf::from(SYSTEM_CONFIG_DIR).join(CONFIG_FILE_NAME)),
        ];
        for path in base_paths.into_iter().flatten() {
            if path.exists() {
                let base_config = FileConfig::load_from_file(&path)?;
                base_config.warn_unknown_fields();
                file_config.merge(base_config);
                found_configs.push(path.display().to_string());
            }
        }

        // 2. Load from CLI-specified path OR local directory
        let overlay_path = if let Some(ref path) = cli.config {
            let expanded = expand_path(&path.to_string_lossy());
            if !expanded.exists() {
                anyhow::bail!("Config file not found: {}", expanded.display());
            }
            Some(expanded)
        } else {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() { Some(local) } else { None }
        };

        if let Some(path) = overlay_path {
            let overlay_config = FileConfig::load_from_file(&path)?;
            overlay_config.warn_unknown_fields();
            file_config.merge(overlay_config);
            found_configs.push(path.display().to_string());
        }

        tracing::debug!(configs = ?found_configs, "Config files loaded");

        Ok(Self::layer(cli, file_config, found_configs))
    }

    /// Layer configs: defaults -> file config -> CLI/env overrides
    fn layer(cli: &CliConfig, file_config: FileConfig, sources: Vec<String>) -> Self {
        let file_log = file_config.log.unwrap_or_default();
        let file_records = file_config.records.unwrap_or_default();
        let file_cloud = file_config.cloud.unwrap_or_default();
        let file_rate_limit = file_config.rate_limit.unwrap_or_default();
        let file_pipeline = file_config.pipeline.unwrap_or_default();
        let file_vm = file_config.vm.unwrap_or_default();
        let file_network = file_config.network.unwrap_or_default();
        let file_storage = file_config.storage.unwrap_or_default();

        let records = RecordsConfig {
            from: cli.records_from.clone().or(file_records.from),
            to: cli.records_to.clone().or(file_records.to),
            period: cli.records_for_period.clone().or(file_records.period),
        };

        let cloud = CloudConfig {
            endpoint: cli
                .cloud_endpoint
                .clone()
                .or(file_cloud.endpoint)
                .unwrap_or_default(),
            secret: cli
                .cloud_secret
                .clone()
                .or(file_cloud.secret)
                .unwrap_or_default(),
            timeout_secs: cli
                .cloud_timeout
                .or(file_cloud.timeout_secs)
                .unwrap_or(DEFAULT_CLOUD_TIMEOUT_SECS),
        };

        let defaults = RateLimitConfig::default();
        let rate_limit = RateLimitConfig {
            reads_per_second: file_rate_limit
                .reads_per_second
                .unwrap_or(defaults.reads_per_second),
            read_burst: file_rate_limit.read_burst.unwrap_or(defaults.read_burst),
            writes_per_second: file_rate_limit
                .writes_per_second
                .unwrap_or(defaults.writes_per_second),
            write_burst: file_rate_limit.write_burst.unwrap_or(defaults.write_burst),
        };

        let pipeline = PipelineConfig {
            max_in_flight: file_pipeline
                .max_in_flight
                .unwrap_or(DEFAULT_MAX_IN_FLIGHT),
            channel_capacity: file_pipeline
                .channel_capacity
                .unwrap_or(DEFAULT_CHANNEL_CAPACITY),
        };

        let vm = SiteConfig {
            site_name: cli.vm_site_name.clone().or(file_vm.site_name),
            cloud_type: cli.vm_cloud_type.clone().or(file_vm.cloud_type),
            cloud_compute_service: cli
                .vm_cloud_compute_service
                .clone()
                .or(file_vm.cloud_compute_service),
        };

        let network = SiteConfig {
            site_name: cli.network_site_name.clone().or(file_network.site_name),
            cloud_type: cli.network_cloud_type.clone().or(file_network.cloud_type),
            cloud_compute_service: cli
                .network_cloud_compute_service
                .clone()
                .or(file_network.cloud_compute_service),
        };

        Self {
            identifier: cli
                .identifier
                .clone()
                .or(file_config.identifier)
                .unwrap_or_default(),
            endpoint: cli
                .endpoint
                .clone()
                .or(file_config.endpoint)
                .unwrap_or_default(),
            debug: cli.debug || file_config.debug.unwrap_or(false),
            log_path: cli.log_path.clone().or(file_log.path),
            records,
            cloud,
            rate_limit,
            pipeline,
            vm,
            network,
            storage_site_name: cli.storage_site_name.clone().or(file_storage.site_name),
            sources,
        }
    }

    /// Check the values the given command depends on
    pub fn validate(&self, command: Commands) -> Result<()> {
        if self.identifier.trim().is_empty() {
            anyhow::bail!("Configuration error: identifier is required");
        }
        if self.endpoint.trim().is_empty() {
            anyhow::bail!("Configuration error: endpoint (collector) is required");
        }
        if self.cloud.endpoint.trim().is_empty() {
            anyhow::bail!("Configuration error: cloud.endpoint is required");
        }
        if self.cloud.secret.is_empty() {
            anyhow::bail!("Configuration error: cloud.secret is required");
        }
        if self.cloud.timeout_secs == 0 {
            anyhow::bail!("Configuration error: cloud.timeout_secs must be greater than 0");
        }

        let rates = &self.rate_limit;
        let usable = |rate: f64| rate.is_finite() && rate >= MIN_RATE_PER_SECOND;
        if !usable(rates.reads_per_second) || !usable(rates.writes_per_second) {
            anyhow::bail!(
                "Configuration error: rate_limit.reads_per_second and rate_limit.writes_per_second must be at least {}",
                MIN_RATE_PER_SECOND
            );
        }
        if rates.read_burst == 0 || rates.write_burst == 0 {
            anyhow::bail!(
                "Configuration error: rate_limit.read_burst and rate_limit.write_burst must be greater than 0"
            );
        }
        if self.pipeline.max_in_flight == 0 {
            anyhow::bail!("Configuration error: pipeline.max_in_flight must be greater than 0");
        }

        match command {
            Commands::Vm => {
                self.vm_settings()?;
            }
            Commands::Network => {
                self.network_settings()?;
            }
            Commands::Storage => {}
            Commands::All => {
                self.vm_settings()?;
                self.network_settings()?;
            }
        }

        Ok(())
    }

    pub fn vm_settings(&self) -> Result<SiteSettings> {
        site_settings(&self.vm, "vm")
    }

    pub fn network_settings(&self) -> Result<SiteSettings> {
        site_settings(&self.network, "network")
    }

    pub fn storage_settings(&self) -> StorageSettings {
        StorageSettings {
            site: self.storage_site_name.clone(),
            storage_system: self.cloud.endpoint.clone(),
        }
    }

    /// Parse the time-window inputs
    pub fn window_selector(&self) -> Result<WindowSelector> {
        let from = self
            .records
            .from
            .as_deref()
            .map(parse_datetime)
            .transpose()
            .context("Configuration error: records.from")?;
        let to = self
            .records
            .to
            .as_deref()
            .map(parse_datetime)
            .transpose()
            .context("Configuration error: records.to")?;
        let period = self
            .records
            .period
            .as_deref()
            .map(parse_period)
            .transpose()
            .context("Configuration error: records.period")?;

        Ok(WindowSelector { from, to, period })
    }
}

fn site_settings(site: &SiteConfig, section: &str) -> Result<SiteSettings> {
    let required = |value: &Option<String>, field: &str| -> Result<String> {
        match value.as_deref().map(str::trim) {
            Some(v) if !v.is_empty() => Ok(v.to_string()),
            _ => anyhow::bail!("Configuration error: {section}.{field} is required"),
        }
    };

    Ok(SiteSettings {
        site_name: required(&site.site_name, "site_name")?,
        cloud_type: required(&site.cloud_type, "cloud_type")?,
        cloud_compute_service: site
            .cloud_compute_service
            .clone()
            .filter(|s| !s.trim().is_empty()),
    })
}

/// Get profile config path (~/.cloudtally/cloudtally.json)
fn get_profile_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(APP_DOT_FOLDER).join(CONFIG_FILE_NAME))
}

/// Expand a leading `~` to the home directory
fn expand_path(path: &str) -> PathBuf {
    let path = path.trim();
    if path == "~" {
        return dirs::home_dir().unwrap_or_else(|| PathBuf::from(path));
    }
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(path)
}
