//! CLI parsing and orchestration. Parses args, acquires chapters, then writes EPUB, JSON, HTML,
//! Markdown or text. Maps errors to exit codes.

use crate::config::{self, Config};
use crate::epub::{write_epub, EpubError};
use crate::formats::{write_html, write_json, write_markdown, write_text, FormatError, OutputFormat};
use crate::model::{AcquisitionResult, BookMeta, NovelInfo, ProgressEvent, DEFAULT_AUTHOR};
use crate::scraper::{
    fetch_novel_info, resolve, Acquirer, HttpTransport, NovelSource, RetryPolicy, ScraperError,
    SiteAdapter, ThreadSleeper, Transport, EXHAUSTED_CONTENT,
};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const MIN_CHAPTERS: usize = 1;
pub const MAX_CHAPTERS: usize = 200;
pub const DEFAULT_CHAPTERS: usize = 50;
const MAX_FILE_STEM_CHARS: usize = 100;

/// CLI error carrying exit code and message.
#[derive(Debug, Error)]
pub enum CliRunError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{}", describe_scrape_error(.0))]
    Scraper(#[from] ScraperError),

    #[error("{0}")]
    Epub(#[from] EpubError),

    #[error("{0}")]
    Format(#[from] FormatError),
}

impl CliRunError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliRunError::InvalidInput(_) => 1,
            CliRunError::Scraper(_) => 2,
            CliRunError::Epub(_) | CliRunError::Format(_) => 3,
        }
    }
}

/// User-facing explanation; timeouts and empty listings get distinct advice.
fn describe_scrape_error(e: &ScraperError) -> String {
    match e {
        ScraperError::Transport(_) if e.is_timeout() => {
            "The site took too long to respond. It may be slow or blocking automated requests; try again later.".to_string()
        }
        ScraperError::NoChaptersFound { site, url } => format!(
            "No chapters found on {} ({}). Check that the URL is the novel's main page; the site's layout may have changed.",
            site, url
        ),
        other => other.to_string(),
    }
}

#[derive(Parser, Debug)]
#[command(name = "novelscrape")]
#[command(about = "Download a web novel's chapters and package them as EPUB or another format")]
#[command(
    after_help = "Config file keys (output_dir, user_agent, timeout_secs, chapter_limit, author, toc_page, retry_count) are read from ./novelscrape.toml or the user config dir. CLI flags override config. RUST_LOG overrides log filtering."
)]
pub struct Args {
    /// Novel URL (landing or chapter-list page).
    pub url: String,

    /// Number of chapters to fetch, from the first (1-200; default from config or 50).
    #[arg(short = 'n', long, value_parser = parse_chapter_count)]
    pub chapters: Option<usize>,

    /// Output path. Default: {output_dir}/{sanitized-title}.{ext}.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format: epub, json, html, markdown, or text.
    #[arg(long, default_value = "epub", value_parser = parse_format)]
    pub format: OutputFormat,

    /// Author recorded in the output (default from config or "Web Novel").
    #[arg(long)]
    pub author: Option<String>,

    /// Leave out the visible table-of-contents page in EPUB output.
    #[arg(long)]
    pub no_toc_page: bool,

    /// HTTP User-Agent (overrides config).
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Request timeout in seconds (overrides config; default 15).
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Attempts per chapter before a placeholder is used (overrides config; default 3).
    #[arg(long)]
    pub retries: Option<u32>,

    /// Show the novel preview and chapter count without downloading chapters.
    #[arg(long)]
    pub dry_run: bool,

    /// Suppress progress output (errors only).
    #[arg(short, long)]
    pub quiet: bool,

    /// Debug logging and full error chains.
    #[arg(short, long)]
    pub verbose: bool,
}

fn parse_chapter_count(s: &str) -> Result<usize, String> {
    let n: usize = s
        .trim()
        .parse()
        .map_err(|_| format!("Invalid --chapters: '{}' is not a number", s))?;
    check_chapter_count(n)
}

fn check_chapter_count(n: usize) -> Result<usize, String> {
    if (MIN_CHAPTERS..=MAX_CHAPTERS).contains(&n) {
        Ok(n)
    } else {
        Err(format!(
            "Chapter count must be between {} and {}, got {}",
            MIN_CHAPTERS, MAX_CHAPTERS, n
        ))
    }
}

fn parse_format(s: &str) -> Result<OutputFormat, String> {
    s.parse()
}

/// Install the stderr log subscriber. `RUST_LOG` wins over `--verbose`.
pub fn init_tracing(args: &Args) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if args.verbose {
        "warn,novelscrape=debug"
    } else {
        "warn"
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Turn a novel title into a file stem: lowercase ASCII words joined by `-`, at most 100
/// characters, `novel` when nothing is left.
pub fn sanitize_title(title: &str) -> String {
    let mut stem = String::new();
    for word in title
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        if !stem.is_empty() {
            stem.push('-');
        }
        stem.push_str(&word.to_ascii_lowercase());
    }
    if stem.len() > MAX_FILE_STEM_CHARS {
        stem.truncate(MAX_FILE_STEM_CHARS);
        stem = stem.trim_end_matches('-').to_string();
    }
    if stem.is_empty() {
        "novel".to_string()
    } else {
        stem
    }
}

fn default_output_path(dir: &Path, title: &str, format: OutputFormat) -> PathBuf {
    dir.join(format!("{}.{}", sanitize_title(title), format.extension()))
}

/// Ensure output path parent exists.
fn validate_output_path(path: &Path) -> Result<(), CliRunError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            return Err(CliRunError::InvalidInput(format!(
                "Cannot write output: {}: parent directory does not exist.",
                path.display()
            )));
        }
    }
    Ok(())
}

/// Settings after merging flags, config file and defaults.
#[derive(Debug)]
struct Settings {
    chapters: usize,
    output_dir: PathBuf,
    user_agent: Option<String>,
    timeout_secs: Option<u64>,
    retry: RetryPolicy,
    author: String,
    toc_page: bool,
}

impl Settings {
    fn merge(args: &Args, config: &Config) -> Result<Self, CliRunError> {
        let chapters = match args.chapters {
            Some(n) => n,
            None => check_chapter_count(config.chapter_limit.unwrap_or(DEFAULT_CHAPTERS))
                .map_err(|e| CliRunError::InvalidInput(format!("Invalid config chapter_limit: {}", e)))?,
        };
        let mut retry = RetryPolicy::default();
        if let Some(attempts) = args.retries.or(config.retry_count) {
            retry = retry.with_attempts(attempts);
        }
        Ok(Self {
            chapters,
            output_dir: config
                .output_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from(".")),
            user_agent: args.user_agent.clone().or_else(|| config.user_agent.clone()),
            timeout_secs: args.timeout.or(config.timeout_secs),
            retry,
            author: args
                .author
                .clone()
                .or_else(|| config.author.clone())
                .filter(|a| !a.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_AUTHOR.to_string()),
            toc_page: !args.no_toc_page && config.toc_page.unwrap_or(true),
        })
    }

    fn transport(&self) -> Result<HttpTransport, CliRunError> {
        let mut builder = HttpTransport::builder();
        if let Some(ua) = &self.user_agent {
            builder = builder.user_agent(ua.clone());
        }
        if let Some(secs) = self.timeout_secs {
            builder = builder.timeout_secs(secs);
        }
        builder
            .build()
            .map_err(|e| CliRunError::InvalidInput(format!("Failed to create HTTP client: {}", e)))
    }
}

/// Progress bar on stderr, hidden with --quiet.
fn progress_bar(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner} {msg} [{bar:40}] {pos}/{len} ({elapsed})")
    {
        bar.set_style(
            style
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
                .progress_chars("█▉▊▋▌▍▎▏ "),
        );
    }
    bar.set_message("Finding chapters");
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

/// Best-effort preview. Failures only cost the description in the output.
fn novel_info(transport: &dyn Transport, source: &NovelSource) -> Option<NovelInfo> {
    match fetch_novel_info(transport, source) {
        Ok(info) => Some(info),
        Err(e) => {
            tracing::warn!(error = %e, "novel preview unavailable");
            None
        }
    }
}

/// Entry point for the CLI. Returns Ok(()) on success; Err with exit code and message on failure.
pub fn run(args: &Args) -> Result<(), CliRunError> {
    let source = resolve(&args.url).map_err(|e| match e {
        ScraperError::InvalidUrl { input, reason } => CliRunError::InvalidInput(format!(
            "Expected a novel URL such as https://freewebnovel.com/novel/shadow-slave. Invalid: {}: {}",
            input, reason
        )),
        other => CliRunError::Scraper(other),
    })?;
    let config = config::load_config()
        .map_err(CliRunError::InvalidInput)?
        .unwrap_or_default();
    let settings = Settings::merge(args, &config)?;
    let transport = settings.transport()?;
    let adapter = source.adapter();
    tracing::info!(site = source.site.name(), url = %source.url, "starting");

    if args.dry_run {
        return dry_run(args, &settings, &transport, &adapter, &source);
    }

    let bar = progress_bar(args.quiet);
    let sink = |event: ProgressEvent| {
        bar.set_length(event.total as u64);
        bar.set_position(event.current as u64);
        bar.set_message(format!("Fetching chapter {}/{}", event.current, event.total));
    };
    let sleeper = ThreadSleeper;
    let acquired = Acquirer::new(&transport, &sleeper)
        .retry(settings.retry)
        .acquire_with(&adapter, &source, settings.chapters, &sink);
    bar.finish_and_clear();
    let result = acquired?;

    let info = match args.format {
        OutputFormat::Json => None,
        _ => novel_info(&transport, &source),
    };
    let meta = BookMeta {
        author: settings.author.clone(),
        description: info.and_then(|i| i.description),
        source_url: Some(source.url.to_string()),
    };
    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&settings.output_dir, &result.novel_title, args.format));
    validate_output_path(&output_path)?;
    write_output(&result, &meta, args.format, &output_path, settings.toc_page)?;

    if !args.quiet {
        let unavailable = result
            .chapters
            .iter()
            .filter(|c| c.content == EXHAUSTED_CONTENT)
            .count();
        eprintln!(
            "Wrote {} ({} chapters{})",
            output_path.display(),
            result.chapters.len(),
            if unavailable > 0 {
                format!(", {} unavailable", unavailable)
            } else {
                String::new()
            }
        );
    }
    Ok(())
}

fn write_output(
    result: &AcquisitionResult,
    meta: &BookMeta,
    format: OutputFormat,
    path: &Path,
    toc_page: bool,
) -> Result<(), CliRunError> {
    match format {
        OutputFormat::Epub => write_epub(result, meta, path, toc_page)?,
        OutputFormat::Json => write_json(result, path)?,
        OutputFormat::Html => write_html(result, meta, path)?,
        OutputFormat::Markdown => write_markdown(result, meta, path)?,
        OutputFormat::Text => write_text(result, meta, path)?,
    }
    Ok(())
}

fn dry_run(
    args: &Args,
    settings: &Settings,
    transport: &dyn Transport,
    adapter: &dyn SiteAdapter,
    source: &NovelSource,
) -> Result<(), CliRunError> {
    let discovery = adapter.discover_chapters(transport, source)?;
    let info = novel_info(transport, source).unwrap_or_default();
    let will_fetch = discovery.links.len().min(settings.chapters);
    let output_path = args.output.clone().unwrap_or_else(|| {
        default_output_path(&settings.output_dir, &discovery.novel_title, args.format)
    });
    eprintln!("Site: {}", source.site.name());
    eprintln!("Title: {}", discovery.novel_title);
    if let Some(d) = &info.description {
        eprintln!("Description: {}", d);
    }
    if let Some(c) = &info.cover_url {
        eprintln!("Cover: {}", c);
    }
    eprintln!(
        "Chapters: {} found, {} would be fetched",
        discovery.links.len(),
        will_fetch
    );
    eprintln!("Output: {}", output_path.display());
    Ok(())
}
