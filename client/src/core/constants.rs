// =============================================================================
// Application Identity
// =============================================================================

/// Application name in lowercase (for paths and identifiers)
pub const APP_NAME_LOWER: &str = "cloudtally";

/// Unix-style dotfile folder name
pub const APP_DOT_FOLDER: &str = ".cloudtally";

/// System-wide configuration folder
pub const SYSTEM_CONFIG_DIR: &str = "/etc/cloudtally";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name
pub const CONFIG_FILE_NAME: &str = "cloudtally.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "CLOUDTALLY_CONFIG";

// =============================================================================
// Environment Variables - General
// =============================================================================

/// Environment variable for debug mode
pub const ENV_DEBUG: &str = "CLOUDTALLY_DEBUG";

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "CLOUDTALLY_LOG";

/// Environment variable for the log file path
pub const ENV_LOG_PATH: &str = "CLOUDTALLY_LOG_PATH";

/// Environment variable for the client instance identifier
pub const ENV_IDENTIFIER: &str = "CLOUDTALLY_IDENTIFIER";

/// Environment variable for the accounting collector endpoint
pub const ENV_ENDPOINT: &str = "CLOUDTALLY_ENDPOINT";

// =============================================================================
// Environment Variables - Time Window
// =============================================================================

/// Environment variable for the window start
pub const ENV_RECORDS_FROM: &str = "CLOUDTALLY_RECORDS_FROM";

/// Environment variable for the window end
pub const ENV_RECORDS_TO: &str = "CLOUDTALLY_RECORDS_TO";

/// Environment variable for a window relative to now
pub const ENV_RECORDS_FOR_PERIOD: &str = "CLOUDTALLY_RECORDS_FOR_PERIOD";

// =============================================================================
// Environment Variables - Cloud API
// =============================================================================

/// Environment variable for the cloud API endpoint
pub const ENV_CLOUD_ENDPOINT: &str = "CLOUDTALLY_CLOUD_ENDPOINT";

/// Environment variable for the cloud API secret (`user:password`)
pub const ENV_CLOUD_SECRET: &str = "CLOUDTALLY_CLOUD_SECRET";

/// Environment variable for the per-call cloud API timeout in seconds
pub const ENV_CLOUD_TIMEOUT: &str = "CLOUDTALLY_CLOUD_TIMEOUT";

// =============================================================================
// Environment Variables - Resource Kinds
// =============================================================================

pub const ENV_VM_SITE_NAME: &str = "CLOUDTALLY_VM_SITE_NAME";
pub const ENV_VM_CLOUD_TYPE: &str = "CLOUDTALLY_VM_CLOUD_TYPE";
pub const ENV_VM_CLOUD_COMPUTE_SERVICE: &str = "CLOUDTALLY_VM_CLOUD_COMPUTE_SERVICE";
pub const ENV_NETWORK_SITE_NAME: &str = "CLOUDTALLY_NETWORK_SITE_NAME";
pub const ENV_NETWORK_CLOUD_TYPE: &str = "CLOUDTALLY_NETWORK_CLOUD_TYPE";
pub const ENV_NETWORK_CLOUD_COMPUTE_SERVICE: &str = "CLOUDTALLY_NETWORK_CLOUD_COMPUTE_SERVICE";
pub const ENV_STORAGE_SITE_NAME: &str = "CLOUDTALLY_STORAGE_SITE_NAME";

// =============================================================================
// Cloud API Defaults
// =============================================================================

/// Default per-call timeout for cloud API requests (seconds)
pub const DEFAULT_CLOUD_TIMEOUT_SECS: u64 = 60;

/// Number of resources requested per page
pub const PAGE_SIZE: u32 = 100;

/// Maximum concurrent page fetches while paginating
pub const PAGE_WORKERS: usize = 10;

// =============================================================================
// Rate Limiting & Retry
// =============================================================================

/// Default sustained rate of cloud API calls (per second)
pub const DEFAULT_READS_PER_SECOND: f64 = 30.0;

/// Default burst of cloud API calls
pub const DEFAULT_READ_BURST: u32 = 30;

/// Default sustained rate of collector writes (per second)
pub const DEFAULT_WRITES_PER_SECOND: f64 = 100.0;

/// Default burst of collector writes
pub const DEFAULT_WRITE_BURST: u32 = 100;

/// Smallest accepted rate for either limiter (per second)
pub const MIN_RATE_PER_SECOND: f64 = 0.001;

/// Attempts per remote call before the last error is surfaced
pub const RETRY_ATTEMPTS: u32 = 3;

/// Fixed delay between attempts (milliseconds)
pub const RETRY_DELAY_MS: u64 = 1000;

// =============================================================================
// Pipeline
// =============================================================================

/// Default cap on concurrently running per-item tasks in each stage
pub const DEFAULT_MAX_IN_FLIGHT: usize = 256;

/// Default capacity of the channels between stages
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1;

// =============================================================================
// Collector
// =============================================================================

/// Timeout for connecting to the collector and awaiting its acknowledgment (seconds)
pub const COLLECTOR_TIMEOUT_SECS: u64 = 60;

/// Messages buffered between record writers and the outgoing gRPC stream
pub const COLLECTOR_STREAM_BUFFER: usize = 64;

// =============================================================================
// Resource Attributes
// =============================================================================

/// User attribute holding the global identity
pub const TEMPLATE_IDENTITY: &str = "TEMPLATE/IDENTITY";

/// Image attribute holding the appliance marketplace reference
pub const TEMPLATE_APPLIANCE_MPURI: &str = "TEMPLATE/CLOUDKEEPER_APPLIANCE_MPURI";

/// Host/cluster attribute holding the benchmark type
pub const TEMPLATE_BENCHMARK_TYPE: &str = "TEMPLATE/BENCHMARK_TYPE";

/// Host/cluster attribute holding the benchmark value
pub const TEMPLATE_BENCHMARK_VALUE: &str = "TEMPLATE/BENCHMARK_VALUE";
