use clap::builder::TypedValueParser as _;
use clap::Parser;
use dotenvy::dotenv;
use log::LevelFilter;
use std::path::PathBuf;
use std::time::Duration;

/// Address the relay fetches dashboard data from when none is configured.
pub const DEFAULT_UPSTREAM_BASE_URL: &str = "http://localhost:3000";

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// A list of full CORS origin URLs that allowed to receive server responses.
    #[arg(
        long,
        env,
        value_delimiter = ',',
        use_value_delimiter = true,
        default_value = "http://localhost:3000,https://localhost:3000"
    )]
    pub allowed_origins: Vec<String>,

    /// Base URL of the backend whose stats endpoints are fetched on every round.
    #[arg(short, long, env, default_value = DEFAULT_UPSTREAM_BASE_URL)]
    upstream_base_url: String,

    /// Deadline in milliseconds for a single upstream fetch. 0 disables it.
    #[arg(long, env, default_value_t = 10_000)]
    pub fetch_timeout_ms: u64,

    /// Deadline in milliseconds for all fetches of one round together. 0 disables it.
    #[arg(long, env, default_value_t = 30_000)]
    pub round_timeout_ms: u64,

    /// Collapse notifications that arrive while a round for the same event is
    /// running into one follow-up round.
    #[arg(long, env, default_value_t = false)]
    pub coalesce_rounds: bool,

    /// Number of frames queued per WebSocket subscriber before it counts as lagging.
    #[arg(long, env, default_value_t = 64)]
    pub subscriber_buffer: usize,

    /// Optional JSON file replacing the built-in event routing table.
    #[arg(long, env)]
    routes_file: Option<PathBuf>,

    /// The host interface to listen for incoming connections
    #[arg(short, long, env, default_value = "127.0.0.1")]
    pub interface: Option<String>,

    /// The host TCP port to listen for incoming connections
    #[arg(short, long, env, default_value_t = 8081)]
    pub port: u16,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap_or(LevelFilter::Info)),
        )]
    pub log_level_filter: LevelFilter,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    pub fn upstream_base_url(&self) -> &str {
        &self.upstream_base_url
    }

    pub fn routes_file(&self) -> Option<&PathBuf> {
        self.routes_file.as_ref()
    }

    pub fn interface(&self) -> &str {
        self.interface.as_deref().unwrap_or("127.0.0.1")
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        millis_or_disabled(self.fetch_timeout_ms)
    }

    pub fn round_timeout(&self) -> Option<Duration> {
        millis_or_disabled(self.round_timeout_ms)
    }
}

fn millis_or_disabled(millis: u64) -> Option<Duration> {
    (millis > 0).then(|| Duration::from_millis(millis))
}
