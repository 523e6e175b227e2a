//! Application state and the actions that change it.
//!
//! Network calls happen outside; their outcomes come back as actions tagged
//! with the generation they were started under. An outcome for anything but
//! the newest generation is stale and gets dropped.

use crate::catalog::model::{SearchResults, Track};
use crate::error::VisualizerError;
use crate::playback::controller::{PlaybackController, PlaybackState};
use crate::playback::element::AudioElement;

#[derive(Debug)]
pub enum Action {
    SearchResolved {
        generation: u64,
        outcome: Result<SearchResults, VisualizerError>,
    },
    PlaylistLoaded {
        generation: u64,
        outcome: Result<Vec<Track>, VisualizerError>,
    },
    SelectTrack(Track),
    TogglePlayPause,
    SignOut,
}

/// What became of a dispatched action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Done,
    Stale,
    Failed,
    SignedOut,
}

pub struct AppState<A> {
    query: String,
    search_generation: u64,
    results: SearchResults,
    playlist_id: Option<String>,
    playlist_generation: u64,
    playlist_tracks: Vec<Track>,
    playback: PlaybackController<A>,
    last_error: Option<String>,
    signed_out: bool,
}

impl<A: AudioElement> AppState<A> {
    pub fn new(element: A) -> Self {
        Self {
            query: String::new(),
            search_generation: 0,
            results: SearchResults::default(),
            playlist_id: None,
            playlist_generation: 0,
            playlist_tracks: Vec::new(),
            playback: PlaybackController::new(element),
            last_error: None,
            signed_out: false,
        }
    }

    /// Start a search; the returned generation tags its outcome.
    pub fn begin_search(&mut self, query: &str) -> u64 {
        self.search_generation += 1;
        self.query = query.to_string();
        self.search_generation
    }

    pub fn open_playlist(&mut self, playlist_id: &str) -> u64 {
        self.playlist_generation += 1;
        self.playlist_id = Some(playlist_id.to_string());
        self.playlist_tracks.clear();
        self.playlist_generation
    }

    pub fn dispatch(&mut self, action: Action) -> Applied {
        match action {
            Action::SearchResolved { generation, outcome } => {
                if generation != self.search_generation {
                    log::debug!("Dropping stale search result {} (current {})", generation, self.search_generation);
                    return Applied::Stale;
                }
                match outcome {
                    Ok(results) => {
                        self.results = results;
                        self.last_error = None;
                        Applied::Done
                    }
                    Err(err) => self.fail(err),
                }
            }
            Action::PlaylistLoaded { generation, outcome } => {
                if generation != self.playlist_generation {
                    log::debug!("Dropping stale playlist result {}", generation);
                    return Applied::Stale;
                }
                match outcome {
                    Ok(tracks) => {
                        self.playlist_tracks = tracks;
                        self.last_error = None;
                        Applied::Done
                    }
                    Err(err) => self.fail(err),
                }
            }
            Action::SelectTrack(track) => match self.playback.select_track(track) {
                Ok(()) => Applied::Done,
                Err(err) => self.fail(err.into()),
            },
            Action::TogglePlayPause => match self.playback.toggle_play_pause() {
                Ok(()) => Applied::Done,
                Err(err) => self.fail(err.into()),
            },
            Action::SignOut => {
                self.sign_out();
                Applied::SignedOut
            }
        }
    }

    fn fail(&mut self, err: VisualizerError) -> Applied {
        if !err.is_recoverable() {
            log::warn!("{}; signing out", err);
            self.sign_out();
            return Applied::SignedOut;
        }
        log::warn!("{}", err);
        self.last_error = Some(err.to_string());
        Applied::Failed
    }

    fn sign_out(&mut self) {
        self.signed_out = true;
        self.results = SearchResults::default();
        self.playlist_id = None;
        self.playlist_tracks.clear();
        self.playback.stop();
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn results(&self) -> &SearchResults {
        &self.results
    }

    pub fn playlist_id(&self) -> Option<&str> {
        self.playlist_id.as_deref()
    }

    pub fn playlist_tracks(&self) -> &[Track] {
        &self.playlist_tracks
    }

    pub fn playback(&self) -> &PlaybackState {
        self.playback.state()
    }

    pub fn into_controller(self) -> PlaybackController<A> {
        self.playback
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn signed_out(&self) -> bool {
        self.signed_out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::element::PlaybackError;

    #[derive(Default)]
    struct Silent {
        src: Option<String>,
        playing: bool,
    }

    impl AudioElement for Silent {
        fn set_src(&mut self, url: &str) {
            self.src = Some(url.into());
        }
        fn clear_src(&mut self) {
            self.src = None;
        }
        fn src(&self) -> Option<&str> {
            self.src.as_deref()
        }
        fn play(&mut self) -> Result<(), PlaybackError> {
            match &self.src {
                Some(s) if s.contains("broken") => Err(PlaybackError::Decode("bad".into())),
                Some(_) => {
                    self.playing = true;
                    Ok(())
                }
                None => Err(PlaybackError::NoSource),
            }
        }
        fn pause(&mut self) {
            self.playing = false;
        }
        fn is_paused(&self) -> bool {
            !self.playing
        }
        fn advance(&mut self, _seconds: f32) {}
        fn ended(&self) -> bool {
            false
        }
    }

    fn track(id: &str, preview: Option<&str>) -> Track {
        Track {
            id: id.into(),
            name: id.into(),
            artists: Vec::new(),
            album: None,
            preview_url: preview.map(str::to_string),
            duration_ms: 0,
        }
    }

    fn results_with(id: &str) -> SearchResults {
        SearchResults {
            tracks: vec![track(id, None)],
            playlists: Vec::new(),
        }
    }

    #[test]
    fn older_search_resolving_late_is_discarded() {
        let mut state = AppState::new(Silent::default());
        let first = state.begin_search("dau");
        let second = state.begin_search("daft punk");

        let applied = state.dispatch(Action::SearchResolved {
            generation: second,
            outcome: Ok(results_with("new")),
        });
        assert_eq!(applied, Applied::Done);

        let applied = state.dispatch(Action::SearchResolved {
            generation: first,
            outcome: Ok(results_with("old")),
        });
        assert_eq!(applied, Applied::Stale);
        assert_eq!(state.results().tracks[0].id, "new");
        assert_eq!(state.query(), "daft punk");
    }

    #[test]
    fn recoverable_failure_keeps_session() {
        let mut state = AppState::new(Silent::default());
        let generation = state.begin_search("x");
        let applied = state.dispatch(Action::SearchResolved {
            generation,
            outcome: Err(VisualizerError::NetworkFailure("timeout".into())),
        });
        assert_eq!(applied, Applied::Failed);
        assert!(!state.signed_out());
        assert!(state.last_error().is_some_and(|e| e.contains("timeout")));
    }

    #[test]
    fn expired_auth_signs_out_and_stops_playback() {
        let mut state = AppState::new(Silent::default());
        state.dispatch(Action::SelectTrack(track("a", Some("https://x/a.mp3"))));
        assert!(state.playback().is_playing);

        let generation = state.open_playlist("p1");
        let applied = state.dispatch(Action::PlaylistLoaded {
            generation,
            outcome: Err(VisualizerError::AuthExpired),
        });
        assert_eq!(applied, Applied::SignedOut);
        assert!(state.signed_out());
        assert!(!state.playback().is_playing);
        assert!(state.playlist_id().is_none());
    }

    #[test]
    fn stale_playlist_is_discarded() {
        let mut state = AppState::new(Silent::default());
        let first = state.open_playlist("p1");
        let second = state.open_playlist("p2");
        assert_eq!(
            state.dispatch(Action::PlaylistLoaded { generation: first, outcome: Ok(vec![track("old", None)]) }),
            Applied::Stale
        );
        assert_eq!(
            state.dispatch(Action::PlaylistLoaded { generation: second, outcome: Ok(vec![track("new", None)]) }),
            Applied::Done
        );
        assert_eq!(state.playlist_tracks()[0].id, "new");
        assert_eq!(state.playlist_id(), Some("p2"));
    }

    #[test]
    fn playback_failure_is_recorded_not_fatal() {
        let mut state = AppState::new(Silent::default());
        let applied = state.dispatch(Action::SelectTrack(track("a", Some("https://x/broken.mp3"))));
        assert_eq!(applied, Applied::Failed);
        assert!(!state.signed_out());
        assert!(!state.playback().is_playing);
        assert_eq!(state.playback().current_track.as_ref().map(|t| t.id.as_str()), Some("a"));
    }

    #[test]
    fn toggle_and_sign_out_actions() {
        let mut state = AppState::new(Silent::default());
        state.dispatch(Action::SelectTrack(track("a", Some("https://x/a.mp3"))));
        state.dispatch(Action::TogglePlayPause);
        assert!(!state.playback().is_playing);
        assert_eq!(state.dispatch(Action::SignOut), Applied::SignedOut);
        assert!(state.playback().current_track.is_none());
    }
}
