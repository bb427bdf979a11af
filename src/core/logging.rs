use std::{
    fs::OpenOptions,
    path::{
        Path,
        PathBuf,
    },
    sync::Mutex,
};

use tracing_subscriber::{
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use super::AnkimorphError;
use crate::persistence::get_app_data_dir;

pub const LOG_FILE: &str = "ankimorph.log";
const DEFAULT_FILTER: &str = "ankimorph=info";

pub fn log_path() -> PathBuf {
    get_app_data_dir().join(LOG_FILE)
}

/// Routes `tracing` output to a log file; the terminal belongs to the UI.
pub fn init(path: &Path) -> Result<(), AnkimorphError> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()))
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        .try_init()
        .map_err(|e| AnkimorphError::Custom(format!("Failed to initialise logging: {}", e)))
}
