//! Core application

use std::fs::OpenOptions;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::cloud::OpenNebulaClient;
use crate::core::cli::{self, Commands};
use crate::core::config::AppConfig;
use crate::core::constants::{APP_NAME_LOWER, ENV_LOG};
use crate::domain::compute::{VmFilter, VmPreparer, VmProcessor};
use crate::domain::network::{IpPreparer, NetworkProcessor};
use crate::domain::storage::{StoragePreparer, StorageProcessor};
use crate::gateway::{RateLimitedGateway, RateLimiter};
use crate::pipeline::{self, PassThroughFilter, RunOptions, RunSummary};
use crate::reader::ResourceReader;
use crate::resource::{Image, NetUser};
use crate::writer::{AccountingStream, GrpcWriter, IpStream, RecordSink, StorageStream, VmStream};

pub struct CoreApp {
    pub config: AppConfig,
    reader: ResourceReader,
    write_gateway: RateLimitedGateway,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();

        let (cli_config, command) = cli::parse();
        let config = AppConfig::load(&cli_config)?;
        Self::init_logging(&config)?;

        tracing::debug!(
            version = env!("CARGO_PKG_VERSION"),
            command = ?command,
            config = ?config,
            "Application starting"
        );

        config.validate(command)?;

        let cancel = CancellationToken::new();
        Self::install_signal_handler(cancel.clone());

        let app = Self::init(config, cancel)?;
        let summary = match command {
            Commands::Vm => app.run_vm().await?,
            Commands::Network => app.run_network().await?,
            Commands::Storage => app.run_storage().await?,
            Commands::All => {
                let mut total = app.run_vm().await?;
                total.merge(&app.run_network().await?);
                total.merge(&app.run_storage().await?);
                total
            }
        };
        tracing::debug!(?summary, "All runs finished");

        Ok(())
    }

    fn init(config: AppConfig, cancel: CancellationToken) -> Result<Self> {
        let timeout = Duration::from_secs(config.cloud.timeout_secs);
        let client = OpenNebulaClient::new(&config.cloud.endpoint, &config.cloud.secret, timeout)
            .context("Failed to create cloud client")?;
        tracing::debug!(endpoint = client.endpoint(), "Cloud client ready");

        let rates = config.rate_limit;
        let read_limiter = Arc::new(RateLimiter::new(
            "cloud",
            rates.reads_per_second,
            rates.read_burst,
        ));
        let write_limiter = Arc::new(RateLimiter::new(
            "collector",
            rates.writes_per_second,
            rates.write_burst,
        ));

        let read_gateway = RateLimitedGateway::new(read_limiter, cancel.clone(), timeout);
        let write_gateway = RateLimitedGateway::new(write_limiter, cancel, timeout);
        let reader = ResourceReader::new(Arc::new(client), read_gateway);

        Ok(Self {
            config,
            reader,
            write_gateway,
        })
    }

    async fn run_vm(&self) -> Result<RunSummary> {
        let settings = self.config.vm_settings()?;
        let selector = self.config.window_selector()?;
        let filter = VmFilter::new(&selector, Utc::now())
            .context("Configuration error: invalid records window")?;
        tracing::info!(
            from = %filter.window().from(),
            to = %filter.window().to(),
            "Extracting compute instance records"
        );

        let sink = self.connect::<VmStream>().await?;
        let summary = pipeline::run(
            Arc::new(VmProcessor::new(self.reader.clone())),
            Arc::new(filter),
            Arc::new(VmPreparer::new(self.reader.clone(), settings, sink)),
            self.run_options(VmStream::KIND),
        )
        .await?;
        Ok(summary)
    }

    async fn run_network(&self) -> Result<RunSummary> {
        let settings = self.config.network_settings()?;
        tracing::info!("Extracting public IP records");

        let sink = self.connect::<IpStream>().await?;
        let summary = pipeline::run(
            Arc::new(NetworkProcessor::new(self.reader.clone())),
            Arc::new(PassThroughFilter::<NetUser>::default()),
            Arc::new(IpPreparer::new(settings, sink)),
            self.run_options(IpStream::KIND),
        )
        .await?;
        Ok(summary)
    }

    async fn run_storage(&self) -> Result<RunSummary> {
        let settings = self.config.storage_settings();
        tracing::info!("Extracting storage records");

        let sink = self.connect::<StorageStream>().await?;
        let summary = pipeline::run(
            Arc::new(StorageProcessor::new(self.reader.clone())),
            Arc::new(PassThroughFilter::<Image>::default()),
            Arc::new(StoragePreparer::new(self.reader.clone(), settings, sink)),
            self.run_options(StorageStream::KIND),
        )
        .await?;
        Ok(summary)
    }

    /// Open a collector session for one resource kind
    async fn connect<S: AccountingStream>(&self) -> Result<Arc<dyn RecordSink<S::Record>>> {
        let writer = GrpcWriter::<S>::connect(
            &self.config.endpoint,
            self.config.identifier.clone(),
            self.write_gateway.clone(),
        )
        .await
        .context("Failed to open collector session")?;
        Ok(Arc::new(writer))
    }

    fn run_options(&self, kind: &'static str) -> RunOptions {
        RunOptions {
            kind,
            max_in_flight: self.config.pipeline.max_in_flight,
            channel_capacity: self.config.pipeline.channel_capacity,
        }
    }

    /// Cancel the process token on Ctrl-C
    fn install_signal_handler(cancel: CancellationToken) {
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::warn!("Interrupt received, cancelling run");
                    cancel.cancel();
                }
                Err(e) => tracing::error!(error = %e, "Failed to listen for interrupt signal"),
            }
        });
    }

    fn init_logging(config: &AppConfig) -> Result<()> {
        let default_level = if config.debug { "debug" } else { "info" };
        let default_filter = format!("{default_level},{APP_NAME_LOWER}={default_level}");

        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(default_filter);

        let builder = tracing_subscriber::fmt()
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .compact()
            .with_env_filter(filter);

        match &config.log_path {
            Some(path) => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .with_context(|| format!("Failed to open log file: {}", path.display()))?;
                builder
                    .with_ansi(false)
                    .with_writer(std::sync::Mutex::new(file))
                    .init();
            }
            None => builder.with_ansi(true).init(),
        }

        Ok(())
    }
}
