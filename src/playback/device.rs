//! Output device backend: symphonia decodes, cpal plays.
//!
//! cpal streams are not `Send`, so every session owns a thread that builds
//! the stream and keeps it alive until the session is released or the clip
//! runs out.

use std::{
    fs::File,
    io::Cursor,
    path::Path,
    sync::{
        atomic::{
            AtomicBool,
            Ordering,
        },
        mpsc,
        Arc,
        Mutex,
        PoisonError,
    },
    thread::{
        self,
        JoinHandle,
    },
    time::Duration,
};

use cpal::{
    traits::{
        DeviceTrait,
        HostTrait,
        StreamTrait,
    },
    FromSample,
    SampleFormat,
    SizedSample,
    Stream,
    StreamConfig,
};
use symphonia::core::{
    audio::SampleBuffer,
    codecs::{
        Decoder,
        DecoderOptions,
        CODEC_TYPE_NULL,
    },
    formats::{
        FormatOptions,
        FormatReader,
    },
    io::{
        MediaSource,
        MediaSourceStream,
    },
    meta::MetadataOptions,
    probe::Hint,
};
use tracing::{
    debug,
    error,
    warn,
};

use super::{
    ActivePlayback,
    AudioBackend,
    AudioSource,
    OpenedClip,
};
use crate::core::{
    http,
    AnkimorphError,
};

pub struct DeviceBackend {
    client: reqwest::blocking::Client,
}

impl DeviceBackend {
    pub fn new() -> Result<Self, AnkimorphError> {
        Ok(Self { client: http::blocking_client()? })
    }
}

impl AudioBackend for DeviceBackend {
    fn open(&self, source: AudioSource) -> Result<Box<dyn OpenedClip>, AnkimorphError> {
        let clip = match source {
            AudioSource::File(path) => {
                let file = File::open(&path).map_err(|e| {
                    AnkimorphError::MediaDecode(format!("Cannot open {}: {}", path.display(), e))
                })?;
                ClipDecoder::open(Box::new(file), extension_hint(&path))?
            }
            AudioSource::Remote(url) => {
                let body = http::get_bytes(&self.client, &url)?;
                ClipDecoder::open(Box::new(Cursor::new(body)), extension_hint(Path::new(&url)))?
            }
        };

        Ok(Box::new(clip))
    }
}

impl OpenedClip for ClipDecoder {
    fn start(self: Box<Self>, lead_in: Duration) -> Result<Box<dyn ActivePlayback>, AnkimorphError> {
        Ok(Box::new(DevicePlayback::spawn(*self, lead_in)?))
    }
}

fn extension_hint(path: &Path) -> Option<String> {
    path.extension().and_then(|ext| ext.to_str()).map(|ext| ext.to_ascii_lowercase())
}

/// Lazily decodes one clip into interleaved stereo frames.
pub struct ClipDecoder {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    sample_rate: u32,
    channels: usize,
    pending: Vec<f32>,
    position: usize,
}

impl ClipDecoder {
    pub fn open(source: Box<dyn MediaSource>, extension: Option<String>) -> Result<Self, AnkimorphError> {
        let stream = MediaSourceStream::new(source, Default::default());

        let mut hint = Hint::new();
        if let Some(extension) = extension.as_deref() {
            hint.with_extension(extension);
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, stream, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| AnkimorphError::MediaDecode(format!("Failed to probe audio: {}", e)))?;
        let format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| AnkimorphError::MediaDecode("No audio track found".to_string()))?;

        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| AnkimorphError::MediaDecode("Sample rate not found".to_string()))?;
        let channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(1).max(1);
        let track_id = track.id;

        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| AnkimorphError::MediaDecode(format!("Failed to create decoder: {}", e)))?;

        debug!("Audio clip: sample_rate={}, channels={}", sample_rate, channels);
        Ok(Self { format, decoder, track_id, sample_rate, channels, pending: Vec::new(), position: 0 })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Next stereo frame, `None` at the end of the clip.
    pub fn next_frame(&mut self) -> Option<(f32, f32)> {
        while self.position + self.channels > self.pending.len() {
            if !self.decode_packet() {
                return None;
            }
        }

        let frame = &self.pending[self.position..self.position + self.channels];
        let left = frame[0];
        let right = if self.channels > 1 { frame[1] } else { left };
        self.position += self.channels;
        Some((left, right))
    }

    fn decode_packet(&mut self) -> bool {
        loop {
            let packet = match self.format.next_packet() {
                Ok(packet) => packet,
                Err(symphonia::core::errors::Error::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    return false;
                }
                Err(e) => {
                    warn!("Error reading packet: {}", e);
                    return false;
                }
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            match self.decoder.decode(&packet) {
                Ok(decoded) => {
                    let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, *decoded.spec());
                    buffer.copy_interleaved_ref(decoded);
                    self.pending.clear();
                    self.pending.extend_from_slice(buffer.samples());
                    self.position = 0;
                    return true;
                }
                Err(e) => {
                    warn!("Decode error: {}", e);
                    continue;
                }
            }
        }
    }
}

/// Lead-in silence, rate conversion and the clip itself, one device frame
/// at a time.
pub struct FramePump {
    clip: Option<ClipDecoder>,
    silence: usize,
    step: f64,
    phase: f64,
    current: (f32, f32),
}

impl FramePump {
    pub fn new(clip: ClipDecoder, device_rate: u32, lead_in: Duration) -> Self {
        let device_rate = device_rate.max(1);
        let step = clip.sample_rate() as f64 / device_rate as f64;
        let silence = (lead_in.as_secs_f64() * device_rate as f64).round() as usize;
        Self { clip: Some(clip), silence, step, phase: 1.0, current: (0.0, 0.0) }
    }

    pub fn next_frame(&mut self) -> Option<(f32, f32)> {
        if self.silence > 0 {
            self.silence -= 1;
            return Some((0.0, 0.0));
        }

        let clip = self.clip.as_mut()?;
        while self.phase >= 1.0 {
            match clip.next_frame() {
                Some(frame) => self.current = frame,
                None => {
                    self.release();
                    return None;
                }
            }
            self.phase -= 1.0;
        }
        self.phase += self.step;
        Some(self.current)
    }

    /// Drops the decoder and whatever it reads from.
    pub fn release(&mut self) {
        self.clip = None;
    }

    pub fn is_released(&self) -> bool {
        self.clip.is_none()
    }
}

struct Shared {
    muted: AtomicBool,
    finished: AtomicBool,
    pump: Mutex<FramePump>,
}

pub struct DevicePlayback {
    shared: Arc<Shared>,
    stop: mpsc::Sender<()>,
    thread: Option<JoinHandle<()>>,
}

impl DevicePlayback {
    fn spawn(clip: ClipDecoder, lead_in: Duration) -> Result<Self, AnkimorphError> {
        let (ready_tx, ready_rx) = mpsc::channel::<Result<u32, AnkimorphError>>();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let (pump_tx, pump_rx) = mpsc::channel::<Arc<Shared>>();

        let thread = thread::Builder::new()
            .name("ankimorph-audio".to_string())
            .spawn(move || {
                let device = match open_device() {
                    Ok(device) => device,
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };
                let (device, config, format) = device;
                let _ = ready_tx.send(Ok(config.sample_rate.0));

                let Ok(shared) = pump_rx.recv() else {
                    return;
                };
                let stream = match build_stream(&device, &config, format, shared.clone()) {
                    Ok(stream) => stream,
                    Err(err) => {
                        error!("{}", err);
                        shared.finished.store(true, Ordering::SeqCst);
                        return;
                    }
                };
                if let Err(e) = stream.play() {
                    error!("Failed to start audio stream: {}", e);
                    shared.finished.store(true, Ordering::SeqCst);
                    return;
                }

                loop {
                    match stop_rx.recv_timeout(Duration::from_millis(50)) {
                        Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
                        Err(mpsc::RecvTimeoutError::Timeout) => {
                            if shared.finished.load(Ordering::SeqCst) {
                                break;
                            }
                        }
                    }
                }
                drop(stream);
            })
            .map_err(|e| AnkimorphError::Playback(format!("Failed to spawn audio thread: {}", e)))?;

        let device_rate = ready_rx
            .recv()
            .map_err(|_| AnkimorphError::Playback("Audio thread exited".to_string()))??;

        let shared = Arc::new(Shared {
            muted: AtomicBool::new(false),
            finished: AtomicBool::new(false),
            pump: Mutex::new(FramePump::new(clip, device_rate, lead_in)),
        });
        pump_tx
            .send(shared.clone())
            .map_err(|_| AnkimorphError::Playback("Audio thread exited".to_string()))?;

        Ok(Self { shared, stop: stop_tx, thread: Some(thread) })
    }
}

impl ActivePlayback for DevicePlayback {
    fn mute(&mut self) {
        self.shared.muted.store(true, Ordering::SeqCst);
    }

    fn release(mut self: Box<Self>) {
        let _ = self.stop.send(());
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Audio thread panicked");
            }
        }
        self.shared.pump.lock().unwrap_or_else(PoisonError::into_inner).release();
    }

    fn is_finished(&self) -> bool {
        self.shared.finished.load(Ordering::SeqCst)
    }
}

fn open_device() -> Result<(cpal::Device, StreamConfig, SampleFormat), AnkimorphError> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| AnkimorphError::Playback("No default output device found".to_string()))?;
    let supported = device
        .default_output_config()
        .map_err(|e| AnkimorphError::Playback(format!("Failed to get default config: {}", e)))?;
    Ok((device, supported.config(), supported.sample_format()))
}

fn build_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    format: SampleFormat,
    shared: Arc<Shared>,
) -> Result<Stream, AnkimorphError> {
    match format {
        SampleFormat::F32 => build_typed::<f32>(device, config, shared),
        SampleFormat::I16 => build_typed::<i16>(device, config, shared),
        SampleFormat::U16 => build_typed::<u16>(device, config, shared),
        other => Err(AnkimorphError::Playback(format!("Unsupported sample format: {:?}", other))),
    }
}

fn build_typed<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    shared: Arc<Shared>,
) -> Result<Stream, AnkimorphError>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = config.channels as usize;
    let error_flag = shared.clone();

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                let mut pump = shared.pump.lock().unwrap_or_else(PoisonError::into_inner);
                let muted = shared.muted.load(Ordering::SeqCst);

                for frame in data.chunks_mut(channels) {
                    let (left, right) = if muted {
                        (0.0, 0.0)
                    } else {
                        match pump.next_frame() {
                            Some(frame) => frame,
                            None => {
                                shared.finished.store(true, Ordering::SeqCst);
                                (0.0, 0.0)
                            }
                        }
                    };
                    frame[0] = T::from_sample(left.clamp(-1.0, 1.0));
                    if channels > 1 {
                        frame[1] = T::from_sample(right.clamp(-1.0, 1.0));
                    }
                    for extra in frame.iter_mut().skip(2) {
                        *extra = T::from_sample(0.0f32);
                    }
                }
            },
            move |err| {
                error!("Audio stream error: {}", err);
                error_flag.finished.store(true, Ordering::SeqCst);
            },
            None,
        )
        .map_err(|e| AnkimorphError::Playback(format!("Failed to build stream: {}", e)))
}
