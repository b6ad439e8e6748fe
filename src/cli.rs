use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "mixcheck", about = "Objective mixing feedback for multitrack sessions")]
pub struct Cli {
    /// Audio files to analyze, one track per file (WAV, FLAC, MP3, OGG)
    pub files: Vec<PathBuf>,

    /// Session manifest (TOML) listing tracks and their audio items
    #[arg(short, long)]
    pub session: Option<PathBuf>,

    /// Only analyze tracks whose name contains this text (case-insensitive)
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Threshold config file (defaults to ./mixcheck.toml or the user config dir)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Write the JSON report here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Single-line JSON output
    #[arg(long)]
    pub compact: bool,

    /// Hide the progress bar
    #[arg(short, long)]
    pub quiet: bool,
}
