use thiserror::Error;

/// Failure classes surfaced by the visualizer.
///
/// NetworkFailure, PlaybackUnavailable and AudioGraphSetupFailure are recovered
/// locally. AuthExpired and RefreshFailed end the session.
#[derive(Debug, Error)]
pub enum VisualizerError {
    #[error("network request failed: {0}")]
    NetworkFailure(String),
    #[error("catalog rejected the access token")]
    AuthExpired,
    #[error("RefreshAccessTokenError: {0}")]
    RefreshFailed(String),
    #[error("playback unavailable: {0}")]
    PlaybackUnavailable(String),
    #[error("audio analysis could not bind to the element: {0}")]
    AudioGraphSetupFailure(String),
}

impl VisualizerError {
    pub fn forces_sign_out(&self) -> bool {
        matches!(self, Self::AuthExpired | Self::RefreshFailed(_))
    }

    pub fn is_recoverable(&self) -> bool {
        !self.forces_sign_out()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_failures_force_sign_out() {
        assert!(VisualizerError::AuthExpired.forces_sign_out());
        assert!(VisualizerError::RefreshFailed("400".into()).forces_sign_out());
        assert!(!VisualizerError::AuthExpired.is_recoverable());
    }

    #[test]
    fn local_failures_are_recoverable() {
        assert!(VisualizerError::NetworkFailure("timeout".into()).is_recoverable());
        assert!(VisualizerError::PlaybackUnavailable("no preview".into()).is_recoverable());
        assert!(VisualizerError::AudioGraphSetupFailure("busy".into()).is_recoverable());
    }
}
