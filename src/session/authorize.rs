use rand::distr::Alphanumeric;
use rand::Rng;
use reqwest::Url;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tiny_http::{Header, Response, Server};

use super::endpoint::AuthError;
use crate::config::ProviderConfig;

const CALLBACK_PAGE: &str = "<html><body><h3>waveglow is signed in.</h3>\
<p>You can close this window.</p></body></html>";

#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

pub fn random_state() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect()
}

pub fn authorize_url(provider: &ProviderConfig, state: &str) -> Result<String, AuthError> {
    let scope = provider.scopes.join(" ");
    let url = Url::parse_with_params(
        &provider.authorize_url,
        &[
            ("response_type", "code"),
            ("client_id", provider.client_id.as_str()),
            ("scope", scope.as_str()),
            ("redirect_uri", provider.redirect_uri.as_str()),
            ("state", state),
        ],
    )
    .map_err(|e| AuthError::Callback(format!("invalid authorize url: {}", e)))?;
    Ok(url.into())
}

/// Pull the authorization code out of a redirect URL (or just its query).
pub fn parse_callback(redirected: &str, expected_state: &str) -> Result<String, AuthError> {
    let query = redirected
        .trim()
        .split_once('?')
        .map_or(redirected.trim(), |(_, q)| q);
    let params: CallbackParams = serde_urlencoded::from_str(query)
        .map_err(|e| AuthError::Callback(e.to_string()))?;

    if let Some(error) = params.error {
        return Err(AuthError::Denied(error));
    }
    if params.state.as_deref() != Some(expected_state) {
        return Err(AuthError::StateMismatch);
    }
    params.code.ok_or(AuthError::MissingCode)
}

/// Listen on the redirect URI's host and port for the provider's redirect.
/// Returns the request path with its query.
pub fn wait_for_callback(redirect_uri: &str, timeout: Duration) -> Result<String, AuthError> {
    let url = Url::parse(redirect_uri).map_err(|e| AuthError::Callback(e.to_string()))?;
    let host = url.host_str().unwrap_or("127.0.0.1");
    let port = url.port_or_known_default().unwrap_or(8888);
    let expected_path = url.path().to_string();

    let server = Server::http(format!("{}:{}", host, port))
        .map_err(|e| AuthError::Callback(e.to_string()))?;
    log::info!("Waiting for authorization callback on {}", redirect_uri);

    let deadline = Instant::now() + timeout;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(AuthError::Callback("timed out waiting for redirect".into()));
        }
        let request = match server.recv_timeout(remaining) {
            Ok(Some(request)) => request,
            Ok(None) => continue,
            Err(e) => return Err(AuthError::Callback(e.to_string())),
        };

        let target = request.url().to_string();
        let path = target.split('?').next().unwrap_or("/");
        if path != expected_path {
            let _ = request.respond(Response::from_string("Not found").with_status_code(404));
            continue;
        }

        let response = Response::from_string(CALLBACK_PAGE).with_header(
            Header::from_bytes(&b"Content-Type"[..], &b"text/html"[..])
                .map_err(|_| AuthError::Callback("bad header".into()))?,
        );
        if let Err(e) = request.respond(response) {
            log::warn!("Failed to answer callback request: {}", e);
        }
        return Ok(target);
    }
}
