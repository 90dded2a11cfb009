//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Park lighting demo command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug)]
#[command(name = "parklight", about = "Volumetric park lighting demo")]
pub struct CliArgs {
    /// Map width in tiles.
    #[arg(long)]
    pub tiles_x: Option<u32>,

    /// Map depth in tiles.
    #[arg(long)]
    pub tiles_y: Option<u32>,

    /// Number of frames to simulate.
    #[arg(long)]
    pub frames: Option<u32>,

    /// Per-frame cap on chunks handed to the renderer.
    #[arg(long)]
    pub max_chunk_updates: Option<usize>,

    /// Run skylight propagation inline instead of on a worker thread.
    #[arg(long)]
    pub no_worker: bool,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(x) = args.tiles_x {
            self.map.tiles_x = x;
        }
        if let Some(y) = args.tiles_y {
            self.map.tiles_y = y;
        }
        if let Some(frames) = args.frames {
            self.demo.frames = frames;
        }
        if let Some(cap) = args.max_chunk_updates {
            self.lighting.max_chunk_updates_per_frame = cap;
        }
        if args.no_worker {
            self.lighting.skylight_worker = false;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_args() -> CliArgs {
        CliArgs {
            tiles_x: None,
            tiles_y: None,
            frames: None,
            max_chunk_updates: None,
            no_worker: false,
            log_level: None,
            config: None,
        }
    }

    #[test]
    fn test_cli_override() {
        let mut config = Config::default();
        let args = CliArgs {
            tiles_x: Some(32),
            frames: Some(10),
            no_worker: true,
            ..empty_args()
        };
        config.apply_cli_overrides(&args);
        assert_eq!(config.map.tiles_x, 32);
        assert_eq!(config.demo.frames, 10);
        assert!(!config.lighting.skylight_worker);
        // Non-overridden fields retain defaults
        assert_eq!(config.map.tiles_y, 64);
        assert_eq!(config.lighting.max_chunk_updates_per_frame, 64);
    }

    #[test]
    fn test_cli_no_override() {
        let original = Config::default();
        let mut config = Config::default();
        config.apply_cli_overrides(&empty_args());
        assert_eq!(config, original);
    }

    #[test]
    fn test_cli_parses_flags() {
        let args = CliArgs::parse_from([
            "parklight",
            "--tiles-x",
            "16",
            "--no-worker",
            "--log-level",
            "debug",
        ]);
        assert_eq!(args.tiles_x, Some(16));
        assert!(args.no_worker);
        assert_eq!(args.log_level.as_deref(), Some("debug"));
    }
}
