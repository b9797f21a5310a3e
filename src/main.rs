use anyhow::{anyhow, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

use media_recap::config::Config;
use media_recap::llm::create_llm;
use media_recap::media::FfmpegTool;
use media_recap::pipeline::{self, Pipeline, SummarizeRequest};
use media_recap::summarize::SummaryStrategy;
use media_recap::transcription::OpenAiTranscriber;

fn cli() -> Command {
    Command::new("media-recap")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Turns long recordings into structured, navigable summaries")
        .subcommand_required(true)
        .subcommand(
            Command::new("summarize")
                .about("Summarize a video or audio file")
                .arg(
                    Arg::new("file")
                        .value_name("FILE")
                        .help("Media file to summarize")
                        .required(true),
                )
                .arg(
                    Arg::new("transcript")
                        .short('t')
                        .long("transcript")
                        .value_name("FILE")
                        .help("Use a supplied transcript instead of transcribing"),
                )
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .value_name("DIR")
                        .help("Where to drop the output files"),
                )
                .arg(
                    Arg::new("force")
                        .short('f')
                        .long("force")
                        .help("Overwrite any existing files")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("quiet")
                        .short('q')
                        .long("quiet")
                        .help("Suppress printing activities")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("snapshot-min-secs")
                        .long("snapshot-min-secs")
                        .value_name("SECS")
                        .help("Minimum interval between video snapshots in seconds")
                        .default_value("10"),
                )
                .arg(
                    Arg::new("summary-min-mins")
                        .long("summary-min-mins")
                        .value_name("MINS")
                        .help("Minimum number of minutes in each summary")
                        .default_value("2"),
                )
                .arg(
                    Arg::new("strategy")
                        .short('s')
                        .long("strategy")
                        .value_name("NAME")
                        .help("Summarization strategy: article, topic-clustered or time-windowed"),
                )
                .arg(
                    Arg::new("workers")
                        .short('w')
                        .long("workers")
                        .value_name("NUM")
                        .help("Maximum concurrent model requests"),
                )
                .arg(
                    Arg::new("level")
                        .short('l')
                        .long("level")
                        .value_name("LEVEL")
                        .help("Log level filter (e.g. debug, info, warn)")
                        .default_value("warn"),
                ),
        )
        .subcommand(
            Command::new("update-index")
                .about("Regenerate the report pages for an existing working directory")
                .arg(
                    Arg::new("dir")
                        .value_name("DIR")
                        .help("Working directory a summarize run produced")
                        .required(true),
                )
                .arg(
                    Arg::new("quiet")
                        .short('q')
                        .long("quiet")
                        .help("Suppress printing activities")
                        .action(ArgAction::SetTrue),
                ),
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();

    match matches.subcommand() {
        Some(("summarize", sub)) => summarize(sub).await,
        Some(("update-index", sub)) => update_index(sub).await,
        _ => Err(anyhow!("unknown subcommand")),
    }
}

fn init_logging(level: &str) {
    tracing_subscriber::fmt().with_env_filter(level).init();
}

fn load_config() -> Config {
    Config::load().unwrap_or_else(|e| {
        warn!("Failed to load config, using defaults: {}", e);
        Config::default()
    })
}

fn build_pipeline(config: Config) -> Result<Pipeline> {
    let llm = Arc::from(create_llm(&config.llm)?);
    let media = Arc::new(FfmpegTool::from_config(&config.media));
    let transcriber = Arc::new(OpenAiTranscriber::new(config.transcription.clone()));
    Ok(Pipeline::new(config, llm, media, transcriber))
}

async fn summarize(matches: &ArgMatches) -> Result<()> {
    init_logging(matches.get_one::<String>("level").unwrap());

    let mut config = load_config();

    if let Some(output) = matches.get_one::<String>("output") {
        config.output.base_dir = PathBuf::from(output);
    }
    config.snapshots.min_interval_secs = matches
        .get_one::<String>("snapshot-min-secs")
        .unwrap()
        .parse()
        .map_err(|_| anyhow!("--snapshot-min-secs must be a number"))?;
    config.summary.minimum_summary_minutes = matches
        .get_one::<String>("summary-min-mins")
        .unwrap()
        .parse()
        .map_err(|_| anyhow!("--summary-min-mins must be a whole number"))?;
    if let Some(strategy) = matches.get_one::<String>("strategy") {
        config.summary.strategy = SummaryStrategy::from_str(strategy)?;
    }
    if let Some(workers) = matches.get_one::<String>("workers") {
        config.performance.max_concurrent_requests = workers
            .parse()
            .map_err(|_| anyhow!("--workers must be a whole number"))?;
    }
    config.validate()?;

    info!("🚀 media-recap starting...");
    info!("{}", config.overview());

    let request = SummarizeRequest {
        media_path: PathBuf::from(matches.get_one::<String>("file").unwrap()),
        transcript: matches.get_one::<String>("transcript").map(PathBuf::from),
        force: matches.get_flag("force"),
        quiet: matches.get_flag("quiet"),
    };

    let pipeline = build_pipeline(config)?;
    let report = pipeline.run(&request).await?;

    if !request.quiet {
        println!(
            "{}: {} chapters, {} snapshots -> {}",
            report.title,
            report.chapter_count,
            report.snapshot_count,
            report.work_dir.join("index.html").display()
        );
    }
    Ok(())
}

async fn update_index(matches: &ArgMatches) -> Result<()> {
    init_logging("warn");

    let dir = PathBuf::from(matches.get_one::<String>("dir").unwrap());
    pipeline::update_index(&dir, matches.get_flag("quiet")).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_summarize_flags() {
        let matches = cli()
            .try_get_matches_from([
                "media-recap",
                "summarize",
                "talk.mp4",
                "--force",
                "--snapshot-min-secs",
                "30",
                "-s",
                "article",
            ])
            .unwrap();

        let (name, sub) = matches.subcommand().unwrap();
        assert_eq!(name, "summarize");
        assert_eq!(sub.get_one::<String>("file").unwrap(), "talk.mp4");
        assert!(sub.get_flag("force"));
        assert_eq!(sub.get_one::<String>("snapshot-min-secs").unwrap(), "30");
        assert_eq!(sub.get_one::<String>("strategy").unwrap(), "article");
    }

    #[test]
    fn test_cli_requires_a_subcommand() {
        assert!(cli().try_get_matches_from(["media-recap"]).is_err());
    }
}
