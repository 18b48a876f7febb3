use crate::config::Config;
use log::{LevelFilter, SetLoggerError};
use simplelog::{self, ConfigBuilder};

/// Dependency log targets hidden below Trace. Matched as target prefixes.
const FILTERED_MODULES: &[&str] = &[
    "hyper",
    "tower",
    "axum",
    "reqwest",
    "tungstenite",
    "tracing",
];

pub struct Logger {}

impl Logger {
    /// Installs the global terminal logger at the configured level.
    ///
    /// Trace shows everything, dependencies included; every other level hides
    /// the targets in `FILTERED_MODULES`. Fails if a global logger is already set.
    pub fn init_logger(config: &Config) -> Result<(), SetLoggerError> {
        simplelog::TermLogger::init(
            config.log_level_filter,
            Self::build_log_config(config.log_level_filter),
            simplelog::TerminalMode::Mixed,
            simplelog::ColorChoice::Auto,
        )
    }

    fn build_log_config(level: LevelFilter) -> simplelog::Config {
        let mut builder = ConfigBuilder::new();
        builder.set_time_format_rfc3339();

        if level != LevelFilter::Trace {
            for module in FILTERED_MODULES {
                builder.add_filter_ignore_str(module);
            }
        }

        builder.build()
    }
}
