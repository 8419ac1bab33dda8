use std::path::PathBuf;

use clap::Parser;

/// Multi-file media viewer with lockstep playback
#[derive(Parser, Debug)]
#[command(name = "gridplay")]
#[command(about = "Play several media files side by side in lockstep", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Media files, image files or image directories to play
    #[arg(value_name = "FILES")]
    pub files: Vec<String>,

    /// Frame number to start from (1-based)
    #[arg(
        short = 's',
        long = "start_frame",
        default_value_t = 1,
        allow_negative_numbers = true
    )]
    pub start_frame: i64,

    /// Playback rate cap in frames per second (0 = as fast as possible)
    #[arg(short, long, default_value_t = 0, allow_negative_numbers = true)]
    pub fps: i64,

    /// Start paused on the first frame
    #[arg(short, long)]
    pub pause: bool,

    /// Compose all streams into a single window
    #[arg(short = 't', long)]
    pub stitch: bool,

    /// Display backend (headless, wayland); overrides the config file
    #[arg(short, long)]
    pub backend: Option<String>,

    /// Path to the configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}
