//! At most one audio clip plays at any time.
//!
//! [`PlaybackArbiter`] owns the single live session. Starting a clip first
//! mutes and releases the previous session, then opens the new source
//! without holding the session lock. Only the newest request gets to start
//! its clip on the device.

use std::{
    path::PathBuf,
    sync::{
        Mutex,
        MutexGuard,
        PoisonError,
    },
    time::Duration,
};

use tracing::{
    debug,
    info,
};

use crate::{
    core::AnkimorphError,
    notes::{
        FieldNameConfig,
        MediaReference,
        Note,
    },
};

pub mod device;

pub use device::DeviceBackend;

/// Silence played before every clip so the first syllable is not clipped.
pub const LEAD_IN: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioSource {
    File(PathBuf),
    Remote(String),
}

impl AudioSource {
    /// `None` when the reference is empty.
    pub fn from_reference(reference: MediaReference, media_dir: &std::path::Path) -> Option<Self> {
        match reference {
            MediaReference::Empty => None,
            MediaReference::Local(name) => Some(AudioSource::File(media_dir.join(name))),
            MediaReference::Remote(url) => Some(AudioSource::Remote(url)),
        }
    }
}

/// Opens clips for an output device.
pub trait AudioBackend: Send + Sync {
    /// Reads the clip and detects its format. May download it.
    fn open(&self, source: AudioSource) -> Result<Box<dyn OpenedClip>, AnkimorphError>;
}

/// A decodable clip that holds no device yet. Dropping it releases its
/// file or body.
pub trait OpenedClip: Send {
    fn start(self: Box<Self>, lead_in: Duration) -> Result<Box<dyn ActivePlayback>, AnkimorphError>;
}

/// A clip that holds the output device and its backing resource.
pub trait ActivePlayback: Send {
    /// Silences output without touching the decoder.
    fn mute(&mut self);

    /// Stops the device stream, then drops the decoder and its file or body.
    fn release(self: Box<Self>);

    fn is_finished(&self) -> bool;
}

#[derive(Default)]
struct Session {
    /// Bumped by every `play` and `stop`; a clip opened under an older
    /// generation is dropped instead of started.
    generation: u64,
    active: Option<Box<dyn ActivePlayback>>,
}

pub struct PlaybackArbiter {
    backend: Box<dyn AudioBackend>,
    media_dir: PathBuf,
    session: Mutex<Session>,
}

impl PlaybackArbiter {
    pub fn new(backend: Box<dyn AudioBackend>, media_dir: PathBuf) -> Self {
        Self { backend, media_dir, session: Mutex::new(Session::default()) }
    }

    /// Plays the audio of `note`, replacing whatever is playing.
    ///
    /// Returns `Ok(false)` without touching the current session when the
    /// note has no audio.
    pub fn play(&self, note: &Note, names: &FieldNameConfig) -> Result<bool, AnkimorphError> {
        let Some(source) = AudioSource::from_reference(note.audio_ref(names), &self.media_dir)
        else {
            debug!("Note {} has no audio", note.id);
            return Ok(false);
        };

        let generation = self.supersede();

        info!("Playing {:?}", source);
        let clip = self.backend.open(source)?;

        let mut session = self.lock();
        if session.generation != generation {
            debug!("Note {} was superseded before its audio opened", note.id);
            return Ok(true);
        }
        if let Some(previous) = session.active.take() {
            stop_session(previous);
        }
        session.active = Some(clip.start(LEAD_IN)?);
        Ok(true)
    }

    /// Stops the current clip and cancels clips still opening.
    pub fn stop(&self) {
        self.supersede();
    }

    fn supersede(&self) -> u64 {
        let mut session = self.lock();
        session.generation += 1;
        if let Some(previous) = session.active.take() {
            stop_session(previous);
        }
        session.generation
    }

    /// Whether a clip is still playing. Finished sessions are released here.
    pub fn is_playing(&self) -> bool {
        let mut session = self.lock();
        match session.active.as_ref() {
            Some(active) if active.is_finished() => {
                if let Some(done) = session.active.take() {
                    done.release();
                }
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for PlaybackArbiter {
    fn drop(&mut self) {
        self.stop();
    }
}

fn stop_session(mut session: Box<dyn ActivePlayback>) {
    session.mute();
    session.release();
}
