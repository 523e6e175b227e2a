//! In-process HTTP doubles for the token endpoint and catalog API.

use std::io::Read;
use std::sync::mpsc;
use std::thread;
use tiny_http::{Header, Response, Server};

use crate::session::endpoint::{AuthError, TokenEndpoint};
use crate::session::lifecycle::Clock;
use crate::session::token::TokenResponse;

#[derive(Debug)]
pub struct Captured {
    pub url: String,
    pub authorization: String,
    pub body: String,
}

/// Answer a single request with `status` and a JSON `body`. Returns the
/// server's base URL and a receiver for what the client sent.
pub fn one_shot(status: u16, body: &'static str) -> (String, mpsc::Receiver<Captured>) {
    let server = Server::http("127.0.0.1:0").unwrap();
    let port = server.server_addr().to_ip().unwrap().port();
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        if let Ok(mut request) = server.recv() {
            let authorization = request
                .headers()
                .iter()
                .find(|h| h.field.equiv("Authorization"))
                .map(|h| h.value.to_string())
                .unwrap_or_default();
            let mut body_in = String::new();
            let _ = request.as_reader().read_to_string(&mut body_in);
            let _ = tx.send(Captured {
                url: request.url().to_string(),
                authorization,
                body: body_in,
            });
            let response = Response::from_string(body)
                .with_status_code(status)
                .with_header(Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]).unwrap());
            let _ = request.respond(response);
        }
    });
    (format!("http://127.0.0.1:{}", port), rx)
}

pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.0
    }
}

/// Token endpoint that refuses everything.
pub struct RejectingEndpoint;

impl TokenEndpoint for RejectingEndpoint {
    fn exchange_code(&self, _code: &str, _redirect_uri: &str) -> Result<TokenResponse, AuthError> {
        Err(AuthError::Rejected { status: 400, body: String::new() })
    }

    fn refresh(&self, _refresh_token: &str) -> Result<TokenResponse, AuthError> {
        Err(AuthError::Rejected { status: 400, body: String::new() })
    }
}
