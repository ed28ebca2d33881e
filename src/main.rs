use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::Arc;

use eyre::{Result, bail, eyre};
use log::{debug, info, warn};

mod cli;

use cli::{Cli, OutputFormat};
use ytcap::TranscriptSession;
use ytcap::config::Config;
use ytcap::http::ReqwestClient;
use ytcap::output::render_json;

fn setup_logging() -> Result<()> {
    let log_dir = log_dir();
    std::fs::create_dir_all(&log_dir)?;
    let log_file = log_dir.join("ytcap.log");

    let target = Box::new(std::fs::OpenOptions::new().create(true).append(true).open(&log_file)?);

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized: {}", log_file.display());
    Ok(())
}

fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ytcap")
        .join("logs")
}

fn build_after_help() -> String {
    format!(
        "\nConfig is read from: {}\nLogs are written to: {}",
        ytcap::config::config_path().display(),
        log_dir().join("ytcap.log").display()
    )
}

fn emit(rendered: &str, cli: &Cli) -> Result<()> {
    if let Some(ref path) = cli.output {
        std::fs::write(path, rendered)?;
        if cli.verbose {
            eprintln!("Output written to: {}", path.display());
        }
    } else {
        println!("{rendered}");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging()?;

    let after_help = build_after_help();
    let cmd = <Cli as clap::CommandFactory>::command().after_help(after_help);
    let matches = cmd.get_matches();
    let cli = <Cli as clap::FromArgMatches>::from_arg_matches(&matches)?;

    // Config problems are not fatal (CLI flags take priority anyway)
    let config = Config::load().unwrap_or_else(|e| {
        warn!("Ignoring invalid config file: {e}");
        Config::default()
    });

    let lang = cli
        .lang
        .clone()
        .or_else(|| config.default_lang.clone())
        .unwrap_or_else(|| ytcap::DEFAULT_LANGUAGE.to_string());
    let strategy = cli.strategy.or(config.strategy).unwrap_or_default();
    let format = cli.format.unwrap_or_else(|| {
        config
            .default_format
            .as_deref()
            .and_then(|f| <OutputFormat as clap::ValueEnum>::from_str(f, true).ok())
            .unwrap_or(OutputFormat::Text)
    });
    debug!("Language: {lang}, strategy: {strategy:?}, format: {format:?}");

    let http = Arc::new(ReqwestClient::new(config.user_agent.as_deref()));
    let session = TranscriptSession::new(http, strategy.into_source(config.base_url()), &lang);

    if let Some(ref track_url) = cli.track_url {
        let transcript = session
            .fetch_for_language(track_url)
            .await
            .ok_or_else(|| eyre!("could not fetch transcript from {track_url}"))?;
        let rendered = match format {
            OutputFormat::Text => transcript,
            OutputFormat::Json => render_json(&serde_json::json!({ "transcript": transcript }))?,
        };
        return emit(&rendered, &cli);
    }

    // Collect URLs: from arg or stdin
    let urls = if let Some(ref url) = cli.url {
        vec![url.clone()]
    } else {
        let stdin = io::stdin();
        stdin.lock().lines().collect::<Result<Vec<_>, _>>()?
    };

    if urls.iter().all(|u| u.trim().is_empty()) {
        bail!("no URL or video ID provided\n\nUsage: ytcap <URL>\n       echo <URL> | ytcap");
    }

    for url_input in &urls {
        let url_input = url_input.trim();
        if url_input.is_empty() {
            continue;
        }

        let video_id = ytcap::extract_video_id(url_input)
            .ok_or_else(|| eyre!("could not extract video ID from: {url_input}\n\nSupported formats:\n  https://www.youtube.com/watch?v=ID\n  https://youtu.be/ID\n  https://www.youtube.com/embed/ID\n  https://www.youtube.com/shorts/ID\n  <11-character video ID>"))?;

        if cli.list_languages {
            let available = session
                .list_available_languages(&video_id)
                .await
                .ok_or_else(|| eyre!("could not list caption languages for {video_id}"))?;
            if cli.verbose {
                eprintln!("Video: {} ({video_id})", available.title);
            }
            let rendered = match format {
                OutputFormat::Text => available
                    .languages
                    .iter()
                    .map(|l| format!("{}\t{}", l.language, l.base_url))
                    .collect::<Vec<_>>()
                    .join("\n"),
                OutputFormat::Json => render_json(&available)?,
            };
            emit(&rendered, &cli)?;
            continue;
        }

        let acquired = session
            .acquire(&video_id)
            .await
            .ok_or_else(|| eyre!("no transcript available for {video_id} (see log for details)"))?;

        if cli.verbose {
            eprintln!(
                "Video: {} ({video_id})\nStrategy: {strategy:?}\nLanguage: {}",
                acquired.title,
                session.current_language().unwrap_or_default(),
            );
        }

        let rendered = match format {
            OutputFormat::Text => acquired.transcript.clone(),
            OutputFormat::Json => render_json(&acquired)?,
        };
        emit(&rendered, &cli)?;
    }

    Ok(())
}
