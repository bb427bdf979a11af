use std::sync::Arc;

use ankimorph::{
    anki::{
        wait_awake,
        AnkiApi,
        AnkiConnect,
    },
    config::Settings,
    core::{
        logging,
        AnkimorphError,
        AppContext,
    },
    playback::{
        DeviceBackend,
        PlaybackArbiter,
    },
    tui,
};
use tracing::{
    error,
    info,
    warn,
};

const WAKE_RETRY_SECS: u64 = 2;
const WAKE_ATTEMPTS: u32 = 5;

fn main() -> Result<(), AnkimorphError> {
    run().inspect_err(|e| error!("{}", e))
}

fn run() -> Result<(), AnkimorphError> {
    if let Err(e) = logging::init(&logging::log_path()) {
        eprintln!("{}", e);
    }
    info!("Starting ankimorph {}", env!("CARGO_PKG_VERSION"));

    let settings = Settings::load()?;
    let anki = AnkiConnect::new(settings.anki_url.clone())?;

    // Kept alive for the session: pooled connections of the AnkiConnect
    // client are driven by this runtime.
    let runtime = tokio::runtime::Runtime::new()?;
    let media_dir = runtime.block_on(async {
        info!("Connecting to AnkiConnect at {}", anki.url());
        wait_awake(&anki, WAKE_RETRY_SECS, WAKE_ATTEMPTS).await?;
        anki.media_dir_path().await
    })?;
    info!("Anki media folder: {:?}", media_dir);

    let arbiter = match DeviceBackend::new() {
        Ok(backend) => Some(Arc::new(PlaybackArbiter::new(Box::new(backend), media_dir.clone()))),
        Err(e) => {
            warn!("Audio output unavailable, continuing without playback: {}", e);
            None
        }
    };

    let api: Arc<dyn AnkiApi> = Arc::new(anki);
    let context = AppContext::new(settings, api, media_dir)?;
    let res = tui::run(context, arbiter);
    runtime.shutdown_background();
    res
}
