use reqwest::blocking::{Client, Response};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

use super::model::{PlaylistTracksResponse, SearchResponse, SearchResults, Track};
use crate::error::VisualizerError;

pub const SEARCH_LIMIT: u32 = 20;
pub const PLAYLIST_TRACKS_LIMIT: u32 = 50;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("catalog rejected the access token")]
    Unauthorized,
    #[error("catalog returned {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("invalid catalog url: {0}")]
    InvalidUrl(String),
}

impl From<CatalogError> for VisualizerError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Unauthorized => VisualizerError::AuthExpired,
            other => VisualizerError::NetworkFailure(other.to_string()),
        }
    }
}

/// Bearer-authenticated reads against the music catalog.
pub struct CatalogClient {
    client: Client,
    base_url: String,
}

impl CatalogClient {
    pub fn new(base_url: &str) -> Result<Self, CatalogError> {
        let client = Client::builder().timeout(Duration::from_secs(15)).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, segments: &[&str], query: &[(&str, String)]) -> Result<Url, CatalogError> {
        let mut url = Url::parse(&self.base_url).map_err(|e| CatalogError::InvalidUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| CatalogError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }

    fn get(&self, token: &str, url: Url) -> Result<Response, CatalogError> {
        log::debug!("GET {}", url.path());
        let response = self.client.get(url).bearer_auth(token).send()?;
        match response.status() {
            StatusCode::UNAUTHORIZED => Err(CatalogError::Unauthorized),
            status if !status.is_success() => Err(CatalogError::Upstream {
                status: status.as_u16(),
                body: response.text().unwrap_or_default(),
            }),
            _ => Ok(response),
        }
    }

    fn get_json<T: DeserializeOwned>(&self, token: &str, url: Url) -> Result<T, CatalogError> {
        Ok(self.get(token, url)?.json::<T>()?)
    }

    pub fn search(&self, token: &str, query: &str) -> Result<SearchResults, CatalogError> {
        let url = self.url(
            &["search"],
            &[
                ("q", query.to_string()),
                ("type", "track,playlist".to_string()),
                ("limit", SEARCH_LIMIT.to_string()),
            ],
        )?;
        let response: SearchResponse = self.get_json(token, url)?;
        Ok(response.into())
    }

    pub fn playlist_tracks(&self, token: &str, playlist_id: &str) -> Result<Vec<Track>, CatalogError> {
        let url = self.playlist_tracks_url(playlist_id)?;
        let response: PlaylistTracksResponse = self.get_json(token, url)?;
        Ok(response.into_tracks())
    }

    /// Playlist tracks as the upstream JSON text, untouched.
    pub fn playlist_tracks_raw(&self, token: &str, playlist_id: &str) -> Result<String, CatalogError> {
        let url = self.playlist_tracks_url(playlist_id)?;
        Ok(self.get(token, url)?.text()?)
    }

    pub fn track(&self, token: &str, track_id: &str) -> Result<Track, CatalogError> {
        let url = self.url(&["tracks", track_id], &[])?;
        self.get_json(token, url)
    }

    fn playlist_tracks_url(&self, playlist_id: &str) -> Result<Url, CatalogError> {
        self.url(
            &["playlists", playlist_id, "tracks"],
            &[("limit", PLAYLIST_TRACKS_LIMIT.to_string())],
        )
    }
}
