//! Same-origin proxy for playlist tracks.
//!
//! `GET /api/playlist-tracks?playlistId=<id>` forwards upstream with the
//! session's bearer token and returns the upstream JSON untouched. Failures
//! come back as `{"error": ...}`: 401 when there is no usable session or the
//! catalog rejects the token, 500 for anything else upstream.

use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tiny_http::{Header, Method, Request, Response, Server};

use super::client::{CatalogClient, CatalogError};
use crate::session::endpoint::TokenEndpoint;
use crate::session::lifecycle::{Clock, Session};
use crate::session::store::SessionStore;

#[derive(Debug, PartialEq)]
pub struct ProxyReply {
    pub status: u16,
    pub body: String,
}

impl ProxyReply {
    fn json(status: u16, body: String) -> Self {
        Self { status, body }
    }

    fn error(status: u16, message: &str) -> Self {
        Self {
            status,
            body: json!({ "error": message }).to_string(),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistTracksParams {
    playlist_id: Option<String>,
}

pub struct Proxy<E, C> {
    session: Arc<Session<E, C>>,
    catalog: CatalogClient,
    store: Option<SessionStore>,
}

impl<E: TokenEndpoint, C: Clock> Proxy<E, C> {
    pub fn new(session: Arc<Session<E, C>>, catalog: CatalogClient, store: Option<SessionStore>) -> Self {
        Self { session, catalog, store }
    }

    pub fn route(&self, method: &Method, url: &str) -> ProxyReply {
        let (path, query) = url.split_once('?').unwrap_or((url, ""));
        match (method, path) {
            (&Method::Get, "/api/playlist-tracks") => {
                let params: PlaylistTracksParams = match serde_urlencoded::from_str(query) {
                    Ok(params) => params,
                    Err(_) => return ProxyReply::error(400, "Malformed query"),
                };
                match params.playlist_id.filter(|id| !id.is_empty()) {
                    Some(id) => self.playlist_tracks(&id),
                    None => ProxyReply::error(400, "Missing playlistId"),
                }
            }
            _ => ProxyReply::error(404, "Not found"),
        }
    }

    pub fn playlist_tracks(&self, playlist_id: &str) -> ProxyReply {
        let before = self.session.tokens();
        let view = self.session.check();
        self.persist_if_changed(&before);

        if let Some(error) = view.error {
            return ProxyReply::error(401, &format!("{:?}", error));
        }
        let Some(token) = view.access_token else {
            return ProxyReply::error(401, "Not signed in");
        };

        match self.catalog.playlist_tracks_raw(&token, playlist_id) {
            Ok(body) => ProxyReply::json(200, body),
            Err(CatalogError::Unauthorized) => {
                log::warn!("Catalog rejected the session token");
                ProxyReply::error(401, "Unauthorized")
            }
            Err(err) => {
                log::warn!("Playlist {} fetch failed: {}", playlist_id, err);
                ProxyReply::error(500, "Failed to fetch playlist tracks")
            }
        }
    }

    fn persist_if_changed(&self, before: &crate::session::token::TokenState) {
        let Some(store) = &self.store else { return };
        let after = self.session.tokens();
        if &after == before {
            return;
        }
        let result = if after.error.is_some() { store.clear() } else { store.save(&after) };
        if let Err(err) = result {
            log::warn!("Failed to update session file: {:#}", err);
        }
    }

    /// Serve until the process is stopped.
    pub fn serve(&self, port: u16) -> std::io::Result<()> {
        let addr = format!("127.0.0.1:{}", port);
        let server = Server::http(&addr)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
        log::info!("Proxy listening on http://{}", addr);

        for request in server.incoming_requests() {
            if let Err(e) = self.handle(request) {
                log::warn!("Proxy response failed: {}", e);
            }
        }
        Ok(())
    }

    fn handle(&self, request: Request) -> std::io::Result<()> {
        let reply = self.route(request.method(), request.url());
        log::info!("{} {} -> {}", request.method(), request.url(), reply.status);
        let mut response = Response::from_string(reply.body).with_status_code(reply.status);
        if let Ok(header) = Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]) {
            response = response.with_header(header);
        }
        request.respond(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::token::TokenState;
    use crate::testutil::{one_shot, FixedClock, RejectingEndpoint};

    const NOW: i64 = 1_000_000;

    fn proxy(tokens: TokenState, base: &str) -> Proxy<RejectingEndpoint, FixedClock> {
        let session = Arc::new(Session::restore(tokens, RejectingEndpoint, FixedClock(NOW)));
        Proxy::new(session, CatalogClient::new(base).unwrap(), None)
    }

    fn signed_in() -> TokenState {
        TokenState {
            access_token: Some("tok".into()),
            access_token_expires_at: Some(NOW + 60_000),
            refresh_token: Some("r".into()),
            error: None,
        }
    }

    #[test]
    fn forwards_upstream_json_unchanged() {
        let upstream = r#"{"items":[{"track":{"id":"a","name":"A"}}],"total":1}"#;
        let (base, rx) = one_shot(200, upstream);
        let reply = proxy(signed_in(), &base).route(&Method::Get, "/api/playlist-tracks?playlistId=p1");
        assert_eq!(reply, ProxyReply { status: 200, body: upstream.into() });
        let sent = rx.recv().unwrap();
        assert_eq!(sent.authorization, "Bearer tok");
        assert_eq!(sent.url, "/playlists/p1/tracks?limit=50");
    }

    #[test]
    fn no_session_is_401() {
        let reply = proxy(TokenState::default(), "http://127.0.0.1:1")
            .route(&Method::Get, "/api/playlist-tracks?playlistId=p1");
        assert_eq!(reply.status, 401);
        let body: serde_json::Value = serde_json::from_str(&reply.body).unwrap();
        assert!(body["error"].is_string());
    }

    #[test]
    fn failed_refresh_is_401() {
        let mut tokens = signed_in();
        tokens.access_token_expires_at = Some(NOW - 1);
        let reply = proxy(tokens, "http://127.0.0.1:1").playlist_tracks("p1");
        assert_eq!(reply.status, 401);
        assert!(reply.body.contains("RefreshAccessTokenError"));
    }

    #[test]
    fn upstream_failure_is_500() {
        let (base, _rx) = one_shot(502, "bad gateway");
        let reply = proxy(signed_in(), &base).playlist_tracks("p1");
        assert_eq!(reply.status, 500);
        assert!(reply.body.contains("error"));
    }

    #[test]
    fn upstream_401_is_passed_on() {
        let (base, _rx) = one_shot(401, "{}");
        let reply = proxy(signed_in(), &base).playlist_tracks("p1");
        assert_eq!(reply.status, 401);
    }

    #[test]
    fn bad_requests() {
        let p = proxy(signed_in(), "http://127.0.0.1:1");
        assert_eq!(p.route(&Method::Get, "/api/playlist-tracks").status, 400);
        assert_eq!(p.route(&Method::Get, "/api/playlist-tracks?playlistId=").status, 400);
        assert_eq!(p.route(&Method::Post, "/api/playlist-tracks?playlistId=p1").status, 404);
        assert_eq!(p.route(&Method::Get, "/elsewhere").status, 404);
    }
}
