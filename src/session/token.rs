use serde::{Deserialize, Serialize};

/// Lifetime assumed when the provider omits `expires_in`.
pub const DEFAULT_EXPIRES_IN_SECS: u64 = 3600;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionError {
    RefreshAccessTokenError,
}

/// Token endpoint response body.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// The opaque session object: access/refresh pair plus expiry.
///
/// Once `error` is set the state stays failed until a new sign-in replaces it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token_expires_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<SessionError>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionStatus {
    NoSession,
    Valid,
    Expired,
    Refreshing,
    Failed,
}

/// What the rendering layer gets to see of a session.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<SessionError>,
}

impl SessionView {
    pub fn requires_sign_in(&self) -> bool {
        self.error.is_some() || self.access_token.is_none()
    }
}

impl TokenState {
    pub fn from_sign_in(response: TokenResponse, now_millis: i64) -> Self {
        Self {
            access_token_expires_at: Some(expiry_from(response.expires_in, now_millis)),
            access_token: Some(response.access_token),
            refresh_token: response.refresh_token,
            error: None,
        }
    }

    pub fn status(&self, now_millis: i64) -> SessionStatus {
        if self.error.is_some() {
            return SessionStatus::Failed;
        }
        match (&self.access_token, self.access_token_expires_at) {
            (None, _) => SessionStatus::NoSession,
            (Some(_), Some(expires_at)) if now_millis < expires_at => SessionStatus::Valid,
            (Some(_), _) => SessionStatus::Expired,
        }
    }

    /// Install a refreshed access token. The refresh token is replaced only
    /// when the provider rotated it.
    pub fn apply_refresh(&mut self, response: TokenResponse, now_millis: i64) {
        self.access_token_expires_at = Some(expiry_from(response.expires_in, now_millis));
        self.access_token = Some(response.access_token);
        if let Some(refresh_token) = response.refresh_token {
            self.refresh_token = Some(refresh_token);
        }
        self.error = None;
    }

    pub fn mark_failed(&mut self) {
        self.error = Some(SessionError::RefreshAccessTokenError);
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            access_token: if self.error.is_some() { None } else { self.access_token.clone() },
            error: self.error,
        }
    }
}

fn expiry_from(expires_in: Option<u64>, now_millis: i64) -> i64 {
    let secs = expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);
    now_millis.saturating_add((secs as i64).saturating_mul(1000))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(expires_in: Option<u64>, refresh: Option<&str>) -> TokenResponse {
        TokenResponse {
            access_token: "access".into(),
            expires_in,
            refresh_token: refresh.map(String::from),
        }
    }

    #[test]
    fn sign_in_records_absolute_expiry() {
        let state = TokenState::from_sign_in(response(Some(60), Some("r")), 1_000);
        assert_eq!(state.access_token_expires_at, Some(61_000));
        assert_eq!(state.refresh_token.as_deref(), Some("r"));
        assert_eq!(state.status(60_999), SessionStatus::Valid);
        assert_eq!(state.status(61_000), SessionStatus::Expired);
    }

    #[test]
    fn missing_expires_in_defaults_to_an_hour() {
        let state = TokenState::from_sign_in(response(None, None), 0);
        assert_eq!(state.access_token_expires_at, Some(3_600_000));
    }

    #[test]
    fn refresh_keeps_old_refresh_token_unless_rotated() {
        let mut state = TokenState::from_sign_in(response(Some(1), Some("old")), 0);
        state.apply_refresh(response(Some(10), None), 5_000);
        assert_eq!(state.refresh_token.as_deref(), Some("old"));
        assert_eq!(state.access_token_expires_at, Some(15_000));

        state.apply_refresh(response(Some(10), Some("new")), 6_000);
        assert_eq!(state.refresh_token.as_deref(), Some("new"));
    }

    #[test]
    fn failed_state_hides_the_token() {
        let mut state = TokenState::from_sign_in(response(Some(60), Some("r")), 0);
        state.mark_failed();
        assert_eq!(state.status(0), SessionStatus::Failed);
        let view = state.view();
        assert!(view.access_token.is_none());
        assert!(view.requires_sign_in());
        assert_eq!(
            serde_json::to_value(&view).unwrap(),
            serde_json::json!({ "error": "RefreshAccessTokenError" })
        );
    }

    #[test]
    fn serde_round_trip_preserves_tokens() {
        let state = TokenState {
            access_token: Some("BQD-access".into()),
            access_token_expires_at: Some(1_712_345_678_901),
            refresh_token: Some("AQB-refresh".into()),
            error: None,
        };
        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("accessTokenExpiresAt"));
        let back: TokenState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn empty_state_is_no_session() {
        assert_eq!(TokenState::default().status(0), SessionStatus::NoSession);
    }
}
