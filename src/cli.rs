use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "waveglow", about = "Audio-reactive visualizer for music-catalog track previews")]
pub struct Cli {
    /// Config file (default: ./waveglow.toml or ~/.config/waveglow/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sign in with the provider in the browser
    Login {
        /// Print the authorize URL instead of opening a browser
        #[arg(long)]
        no_browser: bool,
    },

    /// Forget the stored session
    Logout,

    /// Check the stored session, refreshing it if expired
    Status,

    /// Search tracks and playlists
    Search {
        query: String,
    },

    /// List the tracks of a playlist
    Tracks {
        playlist_id: String,
    },

    /// Serve the playlist-tracks proxy on localhost
    Proxy {
        #[arg(long, default_value_t = 8787)]
        port: u16,
    },

    /// Run the visualizer and write per-frame scene snapshots
    Visualize(VisualizeArgs),
}

#[derive(Args, Debug)]
pub struct VisualizeArgs {
    /// Catalog track id to play
    #[arg(long, conflicts_with_all = ["preview", "demo"])]
    pub track: Option<String>,

    /// Preview URL or local audio file to play directly
    #[arg(long, conflicts_with = "demo")]
    pub preview: Option<String>,

    /// No audio, synthetic spectrum only
    #[arg(long)]
    pub demo: bool,

    /// Output JSON-lines snapshot file
    #[arg(short, long, default_value = "frames.jsonl")]
    pub output: PathBuf,

    /// Frames per second
    #[arg(long, default_value_t = 60)]
    pub fps: u32,

    /// Seconds to render
    #[arg(long, default_value_t = 30.0)]
    pub duration: f32,

    /// Pause playback after this many seconds
    #[arg(long)]
    pub pause_at: Option<f32>,

    /// Smoothing time constant for the analyser (0.0-1.0)
    #[arg(long, default_value_t = 0.8)]
    pub smoothing: f32,

    /// Seed for the synthetic spectrum generator
    #[arg(long)]
    pub seed: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visualize_defaults() {
        let cli = Cli::parse_from(["waveglow", "visualize", "--demo"]);
        let Command::Visualize(args) = cli.command else { panic!("expected visualize") };
        assert!(args.demo);
        assert_eq!(args.fps, 60);
        assert_eq!(args.duration, 30.0);
        assert_eq!(args.output, PathBuf::from("frames.jsonl"));
    }

    #[test]
    fn global_config_after_subcommand() {
        let cli = Cli::parse_from(["waveglow", "search", "daft punk", "--config", "x.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
        assert!(matches!(cli.command, Command::Search { ref query } if query == "daft punk"));
    }

    #[test]
    fn track_and_demo_conflict() {
        assert!(Cli::try_parse_from(["waveglow", "visualize", "--track", "a", "--demo"]).is_err());
    }
}
