use std::sync::Arc;
use anyhow::{Context, Result};
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use crate::config::{SheetBackend, Settings};
use crate::controllers::ShipmentController;
use crate::services::{Clock, GoogleSheetsClient, MemorySheets, SheetClient, SiteClock};
use crate::utils::logging;

/// Everything a command needs, built once per process
pub struct AppContext {
    pub settings: Arc<Settings>,
    pub controller: ShipmentController,
    /// Flushes the log file on drop; `None` when logging to the console only
    pub log_guard: Option<WorkerGuard>,
}

/// Builds the sheet client selected by `sheets.backend`
///
/// The memory backend keeps nothing past the current command, so choosing it is logged as a warning.
pub fn build_client(settings: &Settings) -> Result<Arc<dyn SheetClient>> {
    let client: Arc<dyn SheetClient> = match settings.sheets.backend {
        SheetBackend::Google => Arc::new(
            GoogleSheetsClient::new(&settings.sheets).context("Failed to create Google Sheets client")?
        ),
        SheetBackend::Memory => {
            warn!("Using the in-memory sheet backend: changes made by this command will not be saved");
            Arc::new(MemorySheets::new())
        }
    };
    Ok(client)
}

/// Loads settings, starts logging and wires the controller to the configured backend
///
/// The main sheet and its header are created if missing.
pub async fn initialize() -> Result<AppContext> {
    let settings = Arc::new(Settings::new()?);
    let log_guard = logging::init_logger(&settings.logging)?;
    debug!("Run mode: {}", settings.run_mode);
    info!("Using {}", settings.sheets);

    let client = build_client(&settings)?;
    let clock: Arc<dyn Clock> = Arc::new(SiteClock::new(settings.timezone_offset_hours)?);
    let controller = ShipmentController::new(Arc::clone(&settings), client, clock);
    controller.ensure_ready().await.context("Failed to prepare the main sheet")?;

    Ok(AppContext { settings, controller, log_guard })
}
