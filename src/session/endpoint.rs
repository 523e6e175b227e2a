use reqwest::blocking::Client;
use std::time::Duration;
use thiserror::Error;

use super::token::TokenResponse;
use crate::config::ProviderConfig;
use crate::error::VisualizerError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token endpoint unreachable: {0}")]
    Http(#[from] reqwest::Error),
    #[error("token endpoint returned {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("authorization callback carried no code")]
    MissingCode,
    #[error("authorization was denied: {0}")]
    Denied(String),
    #[error("authorization state did not match")]
    StateMismatch,
    #[error("authorization callback failed: {0}")]
    Callback(String),
}

impl From<AuthError> for VisualizerError {
    fn from(err: AuthError) -> Self {
        VisualizerError::RefreshFailed(err.to_string())
    }
}

/// The provider's token endpoint.
pub trait TokenEndpoint {
    fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<TokenResponse, AuthError>;

    fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, AuthError>;
}

impl<T: TokenEndpoint + ?Sized> TokenEndpoint for std::sync::Arc<T> {
    fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<TokenResponse, AuthError> {
        (**self).exchange_code(code, redirect_uri)
    }

    fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, AuthError> {
        (**self).refresh(refresh_token)
    }
}

/// Token endpoint over HTTP with Basic client-credential auth.
pub struct HttpTokenEndpoint {
    client: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
}

impl HttpTokenEndpoint {
    pub fn new(provider: &ProviderConfig) -> Result<Self, AuthError> {
        let client = Client::builder().timeout(Duration::from_secs(15)).build()?;
        Ok(Self {
            client,
            token_url: provider.token_url.clone(),
            client_id: provider.client_id.clone(),
            client_secret: provider.client_secret.clone(),
        })
    }

    fn post(&self, form: &[(&str, &str)]) -> Result<TokenResponse, AuthError> {
        let response = self
            .client
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(form)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<TokenResponse>()?)
    }
}

impl TokenEndpoint for HttpTokenEndpoint {
    fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<TokenResponse, AuthError> {
        self.post(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
        ])
    }

    fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, AuthError> {
        self.post(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
    }
}
