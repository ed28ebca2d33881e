use clap::Parser;
use std::path::PathBuf;

use ytcap::metadata::Strategy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(
    name = "ytcap",
    about = "YouTube caption transcript extractor",
    version = env!("GIT_DESCRIBE"),
)]
pub struct Cli {
    /// YouTube video URL or video ID (reads from stdin if omitted)
    pub url: Option<String>,

    /// Output format: text (default), json
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Preferred caption language, matched against track labels (e.g. "English")
    #[arg(short, long)]
    pub lang: Option<String>,

    /// How to resolve caption tracks
    #[arg(short, long, value_enum)]
    pub strategy: Option<Strategy>,

    /// List available caption languages instead of fetching a transcript
    #[arg(long, conflicts_with = "track_url")]
    pub list_languages: bool,

    /// Fetch the transcript at this caption track URL directly
    #[arg(long, conflicts_with = "url")]
    pub track_url: Option<String>,

    /// Write output to file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Show video title and selected strategy
    #[arg(short, long)]
    pub verbose: bool,
}
