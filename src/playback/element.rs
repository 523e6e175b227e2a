use reqwest::blocking::Client;
use reqwest::Url;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::audio::decode::{self, AudioData};
use crate::audio::spectrum::SignalHandle;
use crate::error::VisualizerError;

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("no source assigned")]
    NoSource,
    #[error("failed to fetch preview: {0}")]
    Fetch(String),
    #[error("failed to decode preview: {0}")]
    Decode(String),
}

impl From<PlaybackError> for VisualizerError {
    fn from(err: PlaybackError) -> Self {
        VisualizerError::PlaybackUnavailable(err.to_string())
    }
}

/// The subset of a media element the playback controller drives.
pub trait AudioElement {
    fn set_src(&mut self, url: &str);
    fn clear_src(&mut self);
    fn src(&self) -> Option<&str>;
    fn play(&mut self) -> Result<(), PlaybackError>;
    fn pause(&mut self);
    fn is_paused(&self) -> bool;
    /// Move the playhead forward by wall-clock time.
    fn advance(&mut self, seconds: f32);
    fn ended(&self) -> bool;
}

/// Turns a source URL into decoded audio.
pub trait ClipLoader {
    fn load(&self, src: &str) -> Result<AudioData, PlaybackError>;
}

/// Loads previews over HTTP(S), or from disk for `file://` URLs and bare paths.
pub struct HttpClipLoader {
    client: Client,
}

impl HttpClipLoader {
    pub fn new() -> Result<Self, PlaybackError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| PlaybackError::Fetch(e.to_string()))?;
        Ok(Self { client })
    }
}

impl ClipLoader for HttpClipLoader {
    fn load(&self, src: &str) -> Result<AudioData, PlaybackError> {
        let url = match Url::parse(src) {
            Ok(url) => url,
            Err(_) => {
                return decode::decode_file(Path::new(src)).map_err(|e| PlaybackError::Decode(format!("{:#}", e)));
            }
        };

        if url.scheme() == "file" {
            let path = url
                .to_file_path()
                .map_err(|_| PlaybackError::Fetch(format!("bad file url: {}", src)))?;
            return decode::decode_file(&path).map_err(|e| PlaybackError::Decode(format!("{:#}", e)));
        }

        log::info!("Fetching preview {}", url);
        let response = self
            .client
            .get(url.clone())
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| PlaybackError::Fetch(e.to_string()))?;
        let bytes = response.bytes().map_err(|e| PlaybackError::Fetch(e.to_string()))?;

        let extension = Path::new(url.path())
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_string());
        decode::decode_bytes(bytes.to_vec(), extension.as_deref())
            .map_err(|e| PlaybackError::Decode(format!("{:#}", e)))
    }
}

/// Headless audio element: holds one decoded clip and a playhead.
pub struct PreviewElement<L> {
    loader: L,
    src: Option<String>,
    audio: Option<AudioData>,
    element_id: u64,
    playhead: usize,
    playing: bool,
}

impl<L: ClipLoader> PreviewElement<L> {
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            src: None,
            audio: None,
            element_id: 0,
            playhead: 0,
            playing: false,
        }
    }

    /// Seconds of audio played so far.
    pub fn current_time(&self) -> f32 {
        match &self.audio {
            Some(audio) if audio.sample_rate > 0 => self.playhead as f32 / audio.sample_rate as f32,
            _ => 0.0,
        }
    }

    pub fn duration(&self) -> Option<f32> {
        self.audio.as_ref().map(|a| a.duration())
    }

    fn reset(&mut self) {
        self.audio = None;
        self.playhead = 0;
        self.playing = false;
        self.element_id += 1;
    }
}

impl<L: ClipLoader> AudioElement for PreviewElement<L> {
    fn set_src(&mut self, url: &str) {
        self.reset();
        self.src = Some(url.to_string());
    }

    fn clear_src(&mut self) {
        self.reset();
        self.src = None;
    }

    fn src(&self) -> Option<&str> {
        self.src.as_deref()
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        let src = self.src.as_deref().ok_or(PlaybackError::NoSource)?;
        if self.audio.is_none() {
            self.audio = Some(self.loader.load(src)?);
        }
        if self.ended() {
            self.playhead = 0;
        }
        self.playing = true;
        Ok(())
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn is_paused(&self) -> bool {
        !self.playing
    }

    fn advance(&mut self, seconds: f32) {
        if !self.playing {
            return;
        }
        let Some(audio) = &self.audio else { return };
        let step = (seconds.max(0.0) * audio.sample_rate as f32).round() as usize;
        self.playhead = (self.playhead + step).min(audio.samples.len());
        if self.playhead >= audio.samples.len() {
            self.playing = false;
        }
    }

    fn ended(&self) -> bool {
        self.audio
            .as_ref()
            .is_some_and(|a| self.playhead >= a.samples.len())
    }
}

impl<L: ClipLoader> SignalHandle for PreviewElement<L> {
    fn element_id(&self) -> u64 {
        self.element_id
    }

    fn is_decoding(&self) -> bool {
        self.playing && self.audio.is_some() && !self.ended()
    }

    fn time_domain(&self, out: &mut [f32]) {
        out.fill(0.0);
        let Some(audio) = &self.audio else { return };
        let end = self.playhead.min(audio.samples.len());
        let start = end.saturating_sub(out.len());
        let window = &audio.samples[start..end];
        let offset = out.len() - window.len();
        out[offset..].copy_from_slice(window);
    }
}
