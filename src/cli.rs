//! Command Line Interface (CLI) arguments.

use clap::Parser;

/// X-Ray server command line interface
#[derive(Clone, Debug, Parser)]
pub struct CommandLineArgs {
    /// The IP address on which the server should listen
    #[arg(long, default_value = "0.0.0.0", env = "XRAY_HOST")]
    pub host: String,
    /// The port to which the server should bind
    #[arg(long, default_value_t = 8080, env = "XRAY_PORT")]
    pub port: u16,
    /// Flag indicating whether HTTPS should be used
    #[arg(long, default_value_t = false, env = "XRAY_HTTPS")]
    pub https: bool,
    /// Path to the certificate file to be used for HTTPS encryption
    #[arg(
        long,
        default_value = "~/.config/xray/certs/cert.pem",
        env = "XRAY_CERT_FILE"
    )]
    pub cert_file: String,
    /// Path to the key file to be used for HTTPS encryption
    #[arg(
        long,
        default_value = "~/.config/xray/certs/key.pem",
        env = "XRAY_KEY_FILE"
    )]
    pub key_file: String,
    /// Maximum time in seconds to wait for requests to complete upon receiving `ctrl+c` signal.
    #[arg(long, default_value_t = 60, env = "XRAY_SHUTDOWN_TIMEOUT")]
    pub graceful_shutdown_timeout: u64,
    /// Whether to enable sending traces to Jaeger.
    #[arg(long, default_value_t = false, env = "XRAY_ENABLE_JAEGER")]
    pub enable_jaeger: bool,
    /// Whether to use Rayon for computing filtering statistics.
    #[arg(long, default_value_t = false, env = "XRAY_USE_RAYON")]
    pub use_rayon: bool,
    /// Maximum number of threads in the Rayon thread pool. Defaults to the number of CPUs.
    #[arg(long, env = "XRAY_THREAD_LIMIT")]
    pub thread_limit: Option<usize>,
    /// Directory of the record store
    #[arg(long, default_value = "~/.local/share/xray/db", env = "XRAY_DATA_PATH")]
    pub data_path: String,
    /// Whether to keep records in a temporary store that is deleted on shutdown
    #[arg(long, default_value_t = false, env = "XRAY_TEMPORARY_STORAGE")]
    pub temporary_storage: bool,
}

/// Returns parsed command line arguments.
pub fn parse() -> CommandLineArgs {
    CommandLineArgs::parse()
}
