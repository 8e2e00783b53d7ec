use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_appender::non_blocking::WorkerGuard;
use anyhow::Result;
use crate::config::LoggingSettings;

/// Builds the filter directive from the configured level, keeping the HTTP client quiet
fn default_directive(level: &str) -> String {
    format!("{},reqwest=warn,hyper=warn", level)
}

/// Initializes the logging system for the application
///
/// This function sets up the logging subscriber and layers based on the provided configuration
/// It supports logging to both the console and a log file (if a directory is configured)
/// The log file is named `tracker_{current_date}.log` and is located in the configured directory
/// The logging level is taken from the environment variable `RUST_LOG`, falling back to `logging.level`
///
/// # Arguments
///
/// * `settings`: The `logging` section of the application settings
///
/// # Returns
///
/// * `Ok(Some(WorkerGuard))`: If logging is initialized with a file appender; keep the guard alive until exit
/// * `Ok(None)`: If logging is initialized without a file appender (console only)
/// * `Err(anyhow::Error)`: If there's an error initializing the logging system
pub fn init_logger(settings: &LoggingSettings) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive(&settings.level)))?;

    let format = fmt::format()
        .with_timer(fmt::time::LocalTime::rfc_3339())
        .compact()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    // command output goes to stdout, so log lines go to stderr
    let console_layer = fmt::Layer::default()
        .event_format(format.clone().with_ansi(true))
        .with_writer(std::io::stderr);

    let subscriber = tracing_subscriber::registry().with(env_filter).with(console_layer);

    match &settings.path {
        Some(path) => {
            std::fs::create_dir_all(path)?;
            let file_name = format!("tracker_{}.log", chrono::Local::now().format("%Y-%m-%d"));
            let file_appender = RollingFileAppender::new(Rotation::NEVER, path, file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            let file_layer = fmt::Layer::default()
                .event_format(format)
                .with_writer(non_blocking);

            tracing::subscriber::set_global_default(subscriber.with(file_layer))?;
            tracing::debug!("Logging initialized, writing to {}", path.display());
            Ok(Some(guard))
        }
        None => {
            tracing::subscriber::set_global_default(subscriber)?;
            tracing::debug!("Logging initialized (console only)");
            Ok(None)
        }
    }
}
