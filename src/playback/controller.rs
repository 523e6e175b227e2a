use serde::Serialize;

use super::element::{AudioElement, PlaybackError};
use crate::catalog::model::Track;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    pub current_track: Option<Track>,
    pub is_playing: bool,
    pub has_preview: bool,
    /// Spectrum source should synthesize instead of analysing audio.
    pub demo_mode: bool,
}

/// Turns track selection into element commands. `is_playing` is only ever
/// set after the element accepted `play`, so it implies `has_preview`.
pub struct PlaybackController<A> {
    element: A,
    state: PlaybackState,
}

impl<A: AudioElement> PlaybackController<A> {
    pub fn new(element: A) -> Self {
        Self {
            element,
            state: PlaybackState::default(),
        }
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn element(&self) -> &A {
        &self.element
    }

    /// Make `track` current and start its preview if it has one. A failed
    /// start leaves the track selected but not playing and is returned for
    /// the caller to report.
    pub fn select_track(&mut self, track: Track) -> Result<(), PlaybackError> {
        let preview = track.preview_url.clone().filter(|u| !u.is_empty());
        self.state.current_track = Some(track);

        let Some(url) = preview else {
            self.element.pause();
            self.element.clear_src();
            self.state.is_playing = false;
            self.state.has_preview = false;
            self.state.demo_mode = true;
            log::info!("No preview available, switching to demo mode");
            return Ok(());
        };

        self.state.has_preview = true;
        self.element.set_src(&url);
        self.start()
    }

    /// Flip between playing and paused. Without a preview there is nothing
    /// to play and the call does nothing.
    pub fn toggle_play_pause(&mut self) -> Result<(), PlaybackError> {
        if !self.state.has_preview {
            log::debug!("Play/pause ignored, current track has no preview");
            return Ok(());
        }
        if self.state.is_playing {
            self.element.pause();
            self.state.is_playing = false;
            Ok(())
        } else {
            self.start()
        }
    }

    /// Drop the current track and silence the element.
    pub fn stop(&mut self) {
        self.element.pause();
        self.element.clear_src();
        self.state = PlaybackState::default();
    }

    /// Advance the element's playhead and pick up a natural end of playback.
    pub fn tick(&mut self, seconds: f32) {
        self.element.advance(seconds);
        if self.state.is_playing && self.element.is_paused() {
            log::info!("Preview finished");
            self.state.is_playing = false;
        }
    }

    fn start(&mut self) -> Result<(), PlaybackError> {
        match self.element.play() {
            Ok(()) => {
                self.state.is_playing = true;
                self.state.demo_mode = false;
                Ok(())
            }
            Err(err) => {
                log::warn!("Playback failed to start: {}", err);
                self.state.is_playing = false;
                self.state.demo_mode = true;
                Err(err)
            }
        }
    }
}
