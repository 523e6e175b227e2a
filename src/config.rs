use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub visual: VisualConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default = "default_authorize_url")]
    pub authorize_url: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenderConfig {
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default = "default_duration")]
    pub duration_secs: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    #[serde(default = "default_fft_size")]
    pub fft_size: usize,
    #[serde(default = "default_smoothing")]
    pub smoothing: f32,
    #[serde(default = "default_min_decibels")]
    pub min_decibels: f32,
    #[serde(default = "default_max_decibels")]
    pub max_decibels: f32,
}

/// Bin indices and bar count used by the mapping engine.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VisualConfig {
    #[serde(default = "default_bar_count")]
    pub bar_count: usize,
    #[serde(default = "default_sphere_bin")]
    pub sphere_bin: usize,
    #[serde(default = "default_ring_bin")]
    pub ring_bin: usize,
    #[serde(default = "default_light_bins")]
    pub light_bins: [usize; 2],
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProxyConfig {
    #[serde(default = "default_proxy_port")]
    pub port: u16,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            authorize_url: default_authorize_url(),
            token_url: default_token_url(),
            api_base_url: default_api_base_url(),
            redirect_uri: default_redirect_uri(),
            scopes: default_scopes(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            duration_secs: default_duration(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            fft_size: default_fft_size(),
            smoothing: default_smoothing(),
            min_decibels: default_min_decibels(),
            max_decibels: default_max_decibels(),
        }
    }
}

impl Default for VisualConfig {
    fn default() -> Self {
        Self {
            bar_count: default_bar_count(),
            sphere_bin: default_sphere_bin(),
            ring_bin: default_ring_bin(),
            light_bins: default_light_bins(),
        }
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self { port: default_proxy_port() }
    }
}

impl ProviderConfig {
    /// Environment credentials win over the file so secrets can stay out of it.
    pub fn apply_env(&mut self) {
        if let Ok(id) = std::env::var("WAVEGLOW_CLIENT_ID") {
            self.client_id = id;
        }
        if let Ok(secret) = std::env::var("WAVEGLOW_CLIENT_SECRET") {
            self.client_secret = secret;
        }
    }

    pub fn has_credentials(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }
}

fn default_authorize_url() -> String { "https://accounts.spotify.com/authorize".into() }
fn default_token_url() -> String { "https://accounts.spotify.com/api/token".into() }
fn default_api_base_url() -> String { "https://api.spotify.com/v1".into() }
fn default_redirect_uri() -> String { "http://127.0.0.1:8888/callback".into() }
fn default_scopes() -> Vec<String> {
    [
        "user-read-email",
        "user-read-private",
        "user-read-playback-state",
        "user-modify-playback-state",
        "streaming",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
fn default_fps() -> u32 { 60 }
fn default_duration() -> f32 { 30.0 }
fn default_fft_size() -> usize { 256 }
fn default_smoothing() -> f32 { 0.8 }
fn default_min_decibels() -> f32 { -100.0 }
fn default_max_decibels() -> f32 { -30.0 }
fn default_bar_count() -> usize { 32 }
fn default_sphere_bin() -> usize { 2 }
fn default_ring_bin() -> usize { 15 }
fn default_light_bins() -> [usize; 2] { [10, 20] }
fn default_proxy_port() -> u16 { 8787 }

pub fn load_config(path: &Path) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(cfg) => Some(cfg),
        Err(err) => {
            log::warn!("Invalid config {}: {}", path.display(), err);
            None
        }
    }
}
