mod audio;
mod catalog;
mod cli;
mod config;
mod error;
mod playback;
mod render;
mod session;
mod state;
#[cfg(test)]
mod testutil;

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use audio::spectrum::{SpectrumSource, SyntheticGenerator};
use catalog::client::CatalogClient;
use catalog::model::Track;
use catalog::proxy::Proxy;
use cli::{Cli, Command, VisualizeArgs};
use config::Config;
use error::VisualizerError;
use playback::element::{HttpClipLoader, PreviewElement};
use render::frame_loop::{progress_bar, FrameLoop, LoopSettings};
use render::scene::Scene;
use render::snapshot::SnapshotWriter;
use session::endpoint::HttpTokenEndpoint;
use session::lifecycle::{Session, SystemClock};
use session::store::SessionStore;
use session::{authorize, ProviderSession};
use state::{Action, AppState, Applied};

const CALLBACK_TIMEOUT: Duration = Duration::from_secs(180);

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    // Load config: explicit --config path, or auto-detect waveglow.toml / global config
    let config_path = cli.config.clone().or_else(|| {
        let local = PathBuf::from("waveglow.toml");
        if local.exists() {
            return Some(local);
        }
        if let Some(home) = dirs::home_dir() {
            let xdg = home.join(".config").join("waveglow").join("config.toml");
            if xdg.exists() {
                return Some(xdg);
            }
        }
        if let Some(config_dir) = dirs::config_dir() {
            let platform = config_dir.join("waveglow").join("config.toml");
            if platform.exists() {
                return Some(platform);
            }
        }
        None
    });
    let mut config = match config_path {
        Some(ref path) => match config::load_config(path) {
            Some(cfg) => {
                log::info!("Loaded config from {}", path.display());
                cfg
            }
            None => {
                log::warn!("Failed to load config from {}", path.display());
                Config::default()
            }
        },
        None => Config::default(),
    };
    config.provider.apply_env();

    match cli.command {
        Command::Login { no_browser } => login(&config, no_browser),
        Command::Logout => logout(),
        Command::Status => status(&config),
        Command::Search { query } => search(&config, &query),
        Command::Tracks { playlist_id } => tracks(&config, &playlist_id),
        Command::Proxy { port } => {
            // Merge: config value applies only when the flag is at its default
            let port = if port == 8787 { config.proxy.port } else { port };
            proxy(&config, port)
        }
        Command::Visualize(args) => visualize(&config, args),
    }
}

fn open_session(config: &Config) -> Result<(Arc<ProviderSession>, SessionStore)> {
    let store = SessionStore::default_location()?;
    let tokens = match store.load() {
        Ok(tokens) => tokens.unwrap_or_default(),
        Err(e) => {
            log::warn!("{:#}; starting without a session", e);
            Default::default()
        }
    };
    let endpoint = HttpTokenEndpoint::new(&config.provider).context("Failed to build token client")?;
    let session = Session::restore(tokens, endpoint, SystemClock);
    Ok((Arc::new(session), store))
}

/// Run the validity gate and keep the session file in step with it.
fn access_token(session: &ProviderSession, store: &SessionStore) -> Result<String> {
    let before = session.tokens();
    let view = session.check();
    let after = session.tokens();

    if view.requires_sign_in() {
        if view.error.is_some() {
            store.clear()?;
            let err = VisualizerError::RefreshFailed("access token could not be renewed".into());
            log::error!("{}", err);
            bail!("{}; run `waveglow login`", err);
        }
        bail!("Not signed in; run `waveglow login`");
    }
    if after != before {
        store.save(&after)?;
    }
    view.access_token.context("Session holds no access token")
}

fn signed_out(store: &SessionStore) -> Result<()> {
    store.clear()?;
    bail!("{}; run `waveglow login`", VisualizerError::AuthExpired)
}

fn login(config: &Config, no_browser: bool) -> Result<()> {
    let provider = &config.provider;
    if !provider.has_credentials() {
        bail!("Client credentials missing: set [provider] client_id/client_secret or WAVEGLOW_CLIENT_ID/WAVEGLOW_CLIENT_SECRET");
    }

    let state = authorize::random_state();
    let url = authorize::authorize_url(provider, &state)?;
    if no_browser || open::that(&url).is_err() {
        println!("Open this URL to sign in:\n\n  {}\n", url);
    } else {
        log::info!("Opened browser for sign-in");
    }

    let redirected = match authorize::wait_for_callback(&provider.redirect_uri, CALLBACK_TIMEOUT) {
        Ok(target) => target,
        Err(e) => {
            log::warn!("{}", e);
            println!("Paste the URL you were redirected to:");
            let mut line = String::new();
            std::io::stdin()
                .lock()
                .read_line(&mut line)
                .context("Failed to read redirect URL")?;
            line
        }
    };
    let code = authorize::parse_callback(&redirected, &state)?;

    let endpoint = HttpTokenEndpoint::new(provider)?;
    let session = Session::new(endpoint, SystemClock);
    session
        .sign_in_with_code(&code, &provider.redirect_uri)
        .context("Code exchange failed")?;

    let store = SessionStore::default_location()?;
    store.save(&session.tokens())?;
    println!("Signed in.");
    Ok(())
}

fn logout() -> Result<()> {
    let store = SessionStore::default_location()?;
    store.clear()?;
    println!("Signed out ({} removed).", store.path().display());
    Ok(())
}

fn status(config: &Config) -> Result<()> {
    let (session, store) = open_session(config)?;
    log::info!("Session before check: {:?}", session.status());
    match access_token(&session, &store) {
        Ok(_) => {
            let expires_at = session.tokens().access_token_expires_at.unwrap_or_default();
            println!("Signed in; access token valid until {} (unix ms)", expires_at);
            Ok(())
        }
        Err(e) => {
            println!("{:#}", e);
            Ok(())
        }
    }
}

fn search(config: &Config, query: &str) -> Result<()> {
    let (session, store) = open_session(config)?;
    let token = access_token(&session, &store)?;
    let catalog = CatalogClient::new(&config.provider.api_base_url)?;

    let mut app = AppState::new(PreviewElement::new(HttpClipLoader::new()?));
    let generation = app.begin_search(query);
    let outcome = catalog.search(&token, query).map_err(VisualizerError::from);
    match app.dispatch(Action::SearchResolved { generation, outcome }) {
        Applied::SignedOut => return signed_out(&store),
        Applied::Failed => println!("Search failed: {}", app.last_error().unwrap_or("unknown error")),
        Applied::Done | Applied::Stale => {}
    }

    let results = app.results();
    println!("Tracks for \"{}\":", app.query());
    for track in &results.tracks {
        print_track(track);
    }
    println!("Playlists:");
    for playlist in &results.playlists {
        let count = playlist.tracks.as_ref().map_or(0, |t| t.total);
        println!("  {:<24} {} ({} tracks)", playlist.id, playlist.name, count);
    }
    Ok(())
}

fn tracks(config: &Config, playlist_id: &str) -> Result<()> {
    let (session, store) = open_session(config)?;
    let token = access_token(&session, &store)?;
    let catalog = CatalogClient::new(&config.provider.api_base_url)?;

    let mut app = AppState::new(PreviewElement::new(HttpClipLoader::new()?));
    let generation = app.open_playlist(playlist_id);
    let outcome = catalog
        .playlist_tracks(&token, playlist_id)
        .map_err(VisualizerError::from);
    if app.dispatch(Action::PlaylistLoaded { generation, outcome }) == Applied::Failed {
        println!("Playlist fetch failed: {}", app.last_error().unwrap_or("unknown error"));
    }
    if app.signed_out() {
        return signed_out(&store);
    }

    println!("Tracks in playlist {}:", app.playlist_id().unwrap_or(playlist_id));
    for track in app.playlist_tracks() {
        print_track(track);
    }
    Ok(())
}

fn print_track(track: &Track) {
    let marker = if track.has_preview() { "▶" } else { " " };
    println!("  {} {:<24} {} - {}", marker, track.id, track.name, track.artist_names());
}

fn proxy(config: &Config, port: u16) -> Result<()> {
    let (session, store) = open_session(config)?;
    let catalog = CatalogClient::new(&config.provider.api_base_url)?;
    let proxy = Proxy::new(session, catalog, Some(store));
    proxy
        .serve(port)
        .with_context(|| format!("Proxy failed on port {}", port))
}

fn demo_track() -> Track {
    Track {
        id: "demo".into(),
        name: "Demo".into(),
        artists: Vec::new(),
        album: None,
        preview_url: None,
        duration_ms: 0,
    }
}

fn visualize(config: &Config, mut args: VisualizeArgs) -> Result<()> {
    // Merge: config values apply only when CLI is at its default
    if args.fps == 60 { args.fps = config.render.fps; }
    if args.duration == 30.0 { args.duration = config.render.duration_secs; }
    if args.smoothing == 0.8 { args.smoothing = config.audio.smoothing; }

    let mut app = AppState::new(PreviewElement::new(HttpClipLoader::new()?));

    let track = if let Some(ref id) = args.track {
        let (session, store) = open_session(config)?;
        let token = access_token(&session, &store)?;
        let catalog = CatalogClient::new(&config.provider.api_base_url)?;
        match catalog.track(&token, id).map_err(VisualizerError::from) {
            Ok(track) => track,
            Err(e) if e.forces_sign_out() => return signed_out(&store),
            Err(e) => {
                log::warn!("{}; continuing in demo mode", e);
                demo_track()
            }
        }
    } else if let Some(ref url) = args.preview {
        Track {
            id: "preview".into(),
            name: url.clone(),
            preview_url: Some(url.clone()),
            ..demo_track()
        }
    } else {
        demo_track()
    };

    log::info!("Selected \"{}\"{}", track.name, if track.has_preview() { "" } else { " (no preview)" });
    if app.dispatch(Action::SelectTrack(track)) == Applied::Failed {
        log::warn!("Falling back to synthetic spectrum");
    }
    let demo = app.playback().demo_mode;
    let mut controller = app.into_controller();
    if let Some(duration) = controller.element().duration() {
        log::info!("Preview length {:.2}s", duration);
    }

    let audio = config::AudioConfig {
        smoothing: args.smoothing,
        ..config.audio.clone()
    };
    let generator = match args.seed {
        Some(seed) => SyntheticGenerator::seeded(seed),
        None => SyntheticGenerator::new(),
    };
    let mut source = SpectrumSource::with_generator(audio, generator);
    let mut scene = Scene::new(config.visual.bar_count);
    let settings = LoopSettings {
        fps: args.fps,
        duration_secs: args.duration,
        pause_at: args.pause_at,
    };

    log::info!(
        "Rendering {} frames at {}fps ({})",
        settings.total_frames(),
        settings.fps,
        if demo { "demo" } else { "live" }
    );
    let mut writer = SnapshotWriter::create(&args.output)?;
    let pb = progress_bar(settings.total_frames());
    let summary = FrameLoop {
        source: &mut source,
        scene: &mut scene,
        visual: &config.visual,
        settings: &settings,
    }
    .run(&mut controller, &mut writer, &pb)?;
    log::debug!("Flushing {} snapshot lines", writer.frames_written());
    writer.finish()?;

    log::info!(
        "Wrote {} frames ({} live, {} synthetic), preview position {:.2}s",
        summary.frames,
        summary.live_frames,
        summary.synthetic_frames,
        controller.element().current_time()
    );
    log::info!("Done! Output: {}", args.output.display());
    Ok(())
}
