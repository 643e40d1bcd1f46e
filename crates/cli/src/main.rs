use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use futures::StreamExt;
use owo_colors::OwoColorize;
use readcast_core::{
    ArticleRepository, CatalogRepository, DownloadConfig, DownloadCoordinator, DownloadState, FetchConfig,
    HtmlMediaScanner, MediaCandidate, Page, ReadcastConfig, ReadcastConfigBuilder, SummaryBackend, SummaryEngine,
    default_download_dir, fetch_file, fetch_stdin, fetch_url, file_name_for,
};

mod echo;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid format: {}. Valid options: text, json", s)),
        }
    }
}

/// Summarize news articles and find the podcast audio attached to them
#[derive(Parser, Debug)]
#[command(name = "readcast")]
#[command(version)]
#[command(about = "Summarize articles and find their podcast audio", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Summarize an article page or plain text
    Summarize(SummarizeArgs),
    /// List media URLs found in an article page
    Media(MediaArgs),
    /// Browse an article catalog
    Articles(ArticlesArgs),
    /// Download an article's audio for offline listening
    Download(DownloadArgs),
}

#[derive(Args, Debug)]
struct InputArgs {
    /// URL to fetch, local file, or "-" for stdin
    #[arg(value_name = "INPUT")]
    input: String,

    /// HTTP timeout in seconds
    #[arg(long, default_value = "30", value_name = "SECS")]
    timeout: u64,

    /// Custom User-Agent for HTTP requests
    #[arg(long, value_name = "UA")]
    user_agent: Option<String>,
}

#[derive(Args, Debug)]
struct SummarizeArgs {
    #[command(flatten)]
    source: InputArgs,

    /// Treat the input as plain text even if it looks like HTML
    #[arg(long)]
    plain: bool,

    /// Number of sentences in extractive summaries
    #[arg(short = 'n', long, default_value = "5", value_name = "NUM")]
    sentences: usize,

    /// Use English importance markers instead of Vietnamese ones
    #[arg(long)]
    english_markers: bool,

    /// Gemini API key; without one the summary is computed locally
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true, value_name = "KEY")]
    api_key: Option<String>,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text", value_name = "FORMAT")]
    format: OutputFormat,

    /// Output file (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct MediaArgs {
    #[command(flatten)]
    source: InputArgs,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text", value_name = "FORMAT")]
    format: OutputFormat,
}

#[derive(Args, Debug)]
struct ArticlesArgs {
    /// JSON catalog file (default: built-in sample catalog)
    #[arg(long, value_name = "FILE")]
    catalog: Option<PathBuf>,

    /// Show a single article with its full content
    #[arg(long, value_name = "ID")]
    id: Option<String>,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text", value_name = "FORMAT")]
    format: OutputFormat,
}

#[derive(Args, Debug)]
struct DownloadArgs {
    /// Audio URL
    #[arg(value_name = "URL")]
    url: String,

    /// Article id the audio belongs to
    #[arg(long, value_name = "ID")]
    id: String,

    /// Download directory
    #[arg(long, env = "READCAST_DOWNLOAD_DIR", value_name = "DIR")]
    dir: Option<PathBuf>,
}

fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    let level = if verbose { "readcast=debug,readcast_core=debug" } else { "readcast=info,readcast_core=info" };
    let filter = tracing_subscriber::EnvFilter::try_from_env("READCAST_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))
}

impl InputArgs {
    /// Config builder carrying the fetch options
    fn config_builder(&self) -> ReadcastConfigBuilder {
        let builder = ReadcastConfig::builder().fetch_timeout(self.timeout);
        match &self.user_agent {
            Some(user_agent) => builder.user_agent(user_agent.as_str()),
            None => builder,
        }
    }
}

/// Read the raw input from stdin, a URL, or a file
async fn read_input(args: &InputArgs, fetch: &FetchConfig, verbose: bool) -> anyhow::Result<String> {
    let content = if args.input == "-" {
        if verbose {
            echo::print_step(1, 3, "Reading from stdin");
        }
        fetch_stdin().context("Failed to read from stdin")?
    } else if args.input.starts_with("http://") || args.input.starts_with("https://") {
        if verbose {
            echo::print_step(1, 3, &format!("Fetching from {}", args.input.bright_white().underline()));
        }
        tracing::debug!(url = %args.input, timeout = fetch.timeout, "fetching input");
        fetch_url(&args.input, fetch).await.context("Failed to fetch URL")?
    } else {
        if verbose {
            echo::print_step(1, 3, &format!("Reading from file {}", args.input.bright_white()));
        }
        fetch_file(&args.input).with_context(|| format!("Failed to read file: {}", args.input))?
    };

    if verbose {
        echo::print_detail("Size", &echo::format_size(content.len()));
    }
    Ok(content)
}

/// Sniff the first bytes of the input for markup
fn looks_like_html(content: &str) -> bool {
    let head: String = content.trim_start().chars().take(512).collect::<String>().to_lowercase();
    ["<!doctype", "<html", "<body", "<article", "<div", "<p>"].iter().any(|tag| head.contains(tag))
}

async fn summarize(args: SummarizeArgs, verbose: bool) -> anyhow::Result<()> {
    let mut builder = args.source.config_builder().summary_length(args.sentences).api_key(args.api_key);
    if args.english_markers {
        builder = builder.english_markers();
    }
    let config = builder.build();

    let raw = read_input(&args.source, &config.fetch, verbose).await?;

    let (title, text) = if !args.plain && looks_like_html(&raw) {
        if verbose {
            echo::print_step(2, 3, "Extracting article text");
        }
        let page = Page::parse(&raw);
        let text = page.extract_article_text().context("No article text found in page")?;
        (page.title(), text)
    } else {
        (None, raw)
    };

    let engine = SummaryEngine::from_config(&config.summary, config.scorer.clone())?;

    let backend = match engine.backend() {
        SummaryBackend::Remote(remote) => remote.name(),
        SummaryBackend::Local => "local",
        SummaryBackend::Simulated { .. } => "simulated",
    };
    if verbose {
        echo::print_step(3, 3, "Summarizing");
        echo::print_detail("Backend", backend);
        if let Some(title) = &title {
            echo::print_detail("Title", title);
        }
    }

    let summary = engine.summarize(&text).await.context("Failed to summarize")?;
    tracing::info!(backend, characters = text.chars().count(), "summary ready");

    let output = match args.format {
        OutputFormat::Text => format!("{}\n", summary),
        OutputFormat::Json => {
            let value = serde_json::json!({
                "title": title,
                "backend": backend,
                "characters": text.chars().count(),
                "summary": summary,
            });
            format!("{}\n", serde_json::to_string_pretty(&value)?)
        }
    };

    match args.output {
        Some(path) => {
            fs::write(&path, output).with_context(|| format!("Failed to write to file: {}", path.display()))?;
            echo::print_success(&format!("Summary written to {}", path.display().bright_white()));
        }
        None => print!("{}", output),
    }
    Ok(())
}

async fn media(args: MediaArgs, verbose: bool) -> anyhow::Result<()> {
    let config = args.source.config_builder().build();
    let html = read_input(&args.source, &config.fetch, verbose).await?;

    if verbose {
        echo::print_step(2, 3, "Scanning for media");
    }
    let candidates: Vec<MediaCandidate> =
        HtmlMediaScanner::new(html).scan().into_iter().map(MediaCandidate::new).collect();
    if candidates.is_empty() {
        bail!("No media found in {}", args.source.input);
    }
    tracing::info!(count = candidates.len(), "media scan complete");

    if verbose {
        echo::print_step(3, 3, &format!("Found {} candidate(s)", candidates.len()));
    }
    match args.format {
        OutputFormat::Text => {
            for candidate in &candidates {
                println!("{}\t{}", candidate.kind(), candidate.url);
            }
        }
        OutputFormat::Json => {
            let values: Vec<_> = candidates
                .iter()
                .map(|c| serde_json::json!({ "url": c.url, "kind": c.kind() }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&values)?);
        }
    }
    Ok(())
}

async fn articles(args: ArticlesArgs, verbose: bool) -> anyhow::Result<()> {
    let repository = match &args.catalog {
        Some(path) => {
            if verbose {
                echo::print_info(&format!("Using catalog {}", path.display()));
            }
            CatalogRepository::from_file(path.clone())
        }
        None => CatalogRepository::sample(),
    };

    if let Some(id) = &args.id {
        let article = repository.get_article(id).await?;
        match args.format {
            OutputFormat::Text => {
                echo::print_article(&article);
                println!("\n{}\n\n{}", article.full_content, article.source_url.dimmed());
            }
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&article)?),
        }
        return Ok(());
    }

    let articles = repository.list_articles().await?;
    match args.format {
        OutputFormat::Text => {
            if articles.is_empty() {
                echo::print_warning("Catalog is empty");
            }
            for article in &articles {
                echo::print_article(article);
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&articles)?),
    }
    Ok(())
}

async fn download(args: DownloadArgs, verbose: bool) -> anyhow::Result<()> {
    let directory = args.dir.unwrap_or_else(default_download_dir);
    if verbose {
        echo::print_detail("Directory", &directory.display().to_string());
    }

    let coordinator = DownloadCoordinator::http(DownloadConfig { directory, ..DownloadConfig::default() })
        .context("Failed to set up downloads")?;
    let file_name = file_name_for(&args.id);

    tracing::info!(url = %args.url, file_name, "starting download");
    let mut states = Box::pin(coordinator.download(&args.url, &file_name));
    let mut last = DownloadState::Idle;
    while let Some(state) = states.next().await {
        echo::print_download_progress(&state);
        last = state;
    }
    eprintln!();

    match last {
        DownloadState::Completed { path } => {
            echo::print_success("Download complete");
            println!("{}", path.display());
            Ok(())
        }
        DownloadState::Failed { reason } => bail!("Download failed: {}", reason),
        other => bail!("Download ended in unexpected state: {:?}", other),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    if cli.verbose {
        echo::print_banner();
        echo::print_info("Debug logging enabled");
        eprintln!();
    }

    tracing::debug!(version = VERSION, "starting");
    let result = match cli.command {
        Command::Summarize(args) => summarize(args, cli.verbose).await,
        Command::Media(args) => media(args, cli.verbose).await,
        Command::Articles(args) => articles(args, cli.verbose).await,
        Command::Download(args) => download(args, cli.verbose).await,
    };
    if let Err(error) = &result {
        tracing::debug!(error = %error, "command failed");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert_eq!("txt".parse::<OutputFormat>(), Ok(OutputFormat::Text));
        assert!("markdown".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_looks_like_html() {
        assert!(looks_like_html("  <!DOCTYPE html><html></html>"));
        assert!(looks_like_html("<article><p>Tin</p></article>"));
        assert!(!looks_like_html("Chính phủ vừa công bố kế hoạch."));
    }

    #[test]
    fn test_input_args_feed_fetch_config() {
        let args = InputArgs { input: "-".to_string(), timeout: 7, user_agent: Some("TestAgent/1.0".to_string()) };
        let config = args.config_builder().build();
        assert_eq!(config.fetch.timeout, 7);
        assert_eq!(config.fetch.user_agent, "TestAgent/1.0");

        let args = InputArgs { input: "-".to_string(), timeout: 30, user_agent: None };
        assert_eq!(args.config_builder().build().fetch.user_agent, FetchConfig::default().user_agent);
    }

    #[test]
    fn test_completions_match_cli_flags() {
        use clap::CommandFactory;
        let bash = fs::read_to_string(concat!(env!("OUT_DIR"), "/completions/readcast.bash")).unwrap();

        let cli = Cli::command();
        for subcommand in cli.get_subcommands() {
            for arg in subcommand.get_arguments() {
                if let Some(long) = arg.get_long() {
                    assert!(bash.contains(&format!("--{long}")), "completions miss --{long}");
                }
            }
        }
        assert!(!bash.contains("--english_markers"));
        assert!(!bash.contains("--api_key"));
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
