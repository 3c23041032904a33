use clap::{Parser, Subcommand};

use std::path::PathBuf;

use super::constants::{
    ENV_CLOUD_ENDPOINT, ENV_CLOUD_SECRET, ENV_CLOUD_TIMEOUT, ENV_CONFIG, ENV_DEBUG, ENV_ENDPOINT,
    ENV_IDENTIFIER, ENV_LOG_PATH, ENV_NETWORK_CLOUD_COMPUTE_SERVICE, ENV_NETWORK_CLOUD_TYPE,
    ENV_NETWORK_SITE_NAME, ENV_RECORDS_FOR_PERIOD, ENV_RECORDS_FROM, ENV_RECORDS_TO,
    ENV_STORAGE_SITE_NAME, ENV_VM_CLOUD_COMPUTE_SERVICE, ENV_VM_CLOUD_TYPE, ENV_VM_SITE_NAME,
};

#[derive(Parser)]
#[command(name = "cloudtally")]
#[command(
    version,
    about = "Extracts compute, network and storage usage from a cloud and sends it to an accounting collector",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Identifier of this client instance, announced to the collector
    #[arg(long, short = 'i', global = true, env = ENV_IDENTIFIER)]
    pub identifier: Option<String>,

    /// Account records from this time (RFC 3339, "YYYY-MM-DD HH:MM:SS" or "YYYY-MM-DD")
    #[arg(long, short = 'f', global = true, env = ENV_RECORDS_FROM)]
    pub records_from: Option<String>,

    /// Account records up to this time
    #[arg(long, short = 't', global = true, env = ENV_RECORDS_TO)]
    pub records_to: Option<String>,

    /// Account records for a period ending now (e.g. 1y, 2w3d, 36h)
    #[arg(long, short = 'p', global = true, env = ENV_RECORDS_FOR_PERIOD)]
    pub records_for_period: Option<String>,

    /// Accounting collector endpoint (e.g. http://collector:9623)
    #[arg(long, short = 'e', global = true, env = ENV_ENDPOINT)]
    pub endpoint: Option<String>,

    /// Cloud API endpoint
    #[arg(long, short = 'o', global = true, env = ENV_CLOUD_ENDPOINT)]
    pub cloud_endpoint: Option<String>,

    /// Cloud API secret (user:password)
    #[arg(long, short = 's', global = true, env = ENV_CLOUD_SECRET, hide_env_values = true)]
    pub cloud_secret: Option<String>,

    /// Timeout for a single cloud API call in seconds
    #[arg(long, global = true, env = ENV_CLOUD_TIMEOUT)]
    pub cloud_timeout: Option<u64>,

    /// Enable debug logging
    #[arg(long, short = 'd', global = true, env = ENV_DEBUG)]
    pub debug: bool,

    /// Path to config file
    #[arg(long, short = 'c', global = true, env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    /// Append logs to this file instead of stdout
    #[arg(long, global = true, env = ENV_LOG_PATH)]
    pub log_path: Option<PathBuf>,

    // Compute instance options
    /// Site name for compute records
    #[arg(long, global = true, env = ENV_VM_SITE_NAME)]
    pub vm_site_name: Option<String>,

    /// Cloud type for compute records
    #[arg(long, global = true, env = ENV_VM_CLOUD_TYPE)]
    pub vm_cloud_type: Option<String>,

    /// Cloud compute service for compute records
    #[arg(long, global = true, env = ENV_VM_CLOUD_COMPUTE_SERVICE)]
    pub vm_cloud_compute_service: Option<String>,

    // Network options
    /// Site name for network records
    #[arg(long, global = true, env = ENV_NETWORK_SITE_NAME)]
    pub network_site_name: Option<String>,

    /// Cloud type for network records
    #[arg(long, global = true, env = ENV_NETWORK_CLOUD_TYPE)]
    pub network_cloud_type: Option<String>,

    /// Cloud compute service for network records
    #[arg(long, global = true, env = ENV_NETWORK_CLOUD_COMPUTE_SERVICE)]
    pub network_cloud_compute_service: Option<String>,

    // Storage options
    /// Site name for storage records
    #[arg(long, global = true, env = ENV_STORAGE_SITE_NAME)]
    pub storage_site_name: Option<String>,
}

#[derive(Subcommand, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Extract compute instance records
    Vm,
    /// Extract public IP records per user
    Network,
    /// Extract storage (image) records
    Storage,
    /// Extract compute, network and storage records in sequence
    All,
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub identifier: Option<String>,
    pub records_from: Option<String>,
    pub records_to: Option<String>,
    pub records_for_period: Option<String>,
    pub endpoint: Option<String>,
    pub cloud_endpoint: Option<String>,
    pub cloud_secret: Option<String>,
    pub cloud_timeout: Option<u64>,
    pub debug: bool,
    pub config: Option<PathBuf>,
    pub log_path: Option<PathBuf>,
    pub vm_site_name: Option<String>,
    pub vm_cloud_type: Option<String>,
    pub vm_cloud_compute_service: Option<String>,
    pub network_site_name: Option<String>,
    pub network_cloud_type: Option<String>,
    pub network_cloud_compute_service: Option<String>,
    pub storage_site_name: Option<String>,
}

impl From<Cli> for CliConfig {
    fn from(cli: Cli) -> Self {
        Self {
            identifier: cli.identifier,
            records_from: cli.records_from,
            records_to: cli.records_to,
            records_for_period: cli.records_for_period,
            endpoint: cli.endpoint,
            cloud_endpoint: cli.cloud_endpoint,
            cloud_secret: cli.cloud_secret,
            cloud_timeout: cli.cloud_timeout,
            debug: cli.debug,
            config: cli.config,
            log_path: cli.log_path,
            vm_site_name: cli.vm_site_name,
            vm_cloud_type: cli.vm_cloud_type,
            vm_cloud_compute_service: cli.vm_cloud_compute_service,
            network_site_name: cli.network_site_name,
            network_cloud_type: cli.network_cloud_type,
            network_cloud_compute_service: cli.network_cloud_compute_service,
            storage_site_name: cli.storage_site_name,
        }
    }
}

/// Parse CLI arguments and return config with command
pub fn parse() -> (CliConfig, Commands) {
    let cli = Cli::parse();
    let command = cli.command;
    (CliConfig::from(cli), command)
}
