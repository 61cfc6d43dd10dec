use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use bookmeta::config::{find_config_file, get_config, load_config, Config};
use bookmeta::models::{BatchEntry, BatchSummary, DetailMeta, SearchRecord};
use bookmeta::sources::{CatalogueSource, Source};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// bookmeta - Look up book metadata in a web catalogue
#[derive(Parser, Debug)]
#[command(name = "bookmeta")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Look up book metadata (author, category, word count, synopsis) in a web catalogue", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (-v for debug, -vv for trace)
    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short)]
    quiet: bool,

    /// Output format
    #[arg(long, short, value_enum, global = true, default_value_t = OutputFormat::Auto)]
    output: OutputFormat,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Show supported environment variables
    #[arg(long, global = true)]
    env: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Output format for results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Automatic based on terminal (table if TTY, JSON otherwise)
    Auto,
    /// Table format (human-readable)
    Table,
    /// JSON format (machine-readable)
    Json,
}

impl OutputFormat {
    fn resolve(self) -> Self {
        match self {
            OutputFormat::Auto if std::io::stdout().is_terminal() => OutputFormat::Table,
            OutputFormat::Auto => OutputFormat::Json,
            other => other,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search the catalogue by title or author
    #[command(alias = "s")]
    Search {
        /// Search keyword
        keyword: String,
    },

    /// Fetch category, platform and synopsis from a detail page
    #[command(alias = "d")]
    Detail {
        /// Detail page URL (absolute, or a path on the catalogue)
        url: String,
    },

    /// Search several keywords one after another
    #[command(alias = "b")]
    Batch {
        /// File with one keyword per line
        #[arg(long, short)]
        file: Option<PathBuf>,

        /// Keywords to search
        keywords: Vec<String>,
    },

    /// Print the effective configuration as TOML
    Config,
}

/// Print all supported environment variables
fn print_env_vars() {
    println!("bookmeta - Environment Variables");
    println!();
    println!("Catalogue:");
    println!("  BOOKMETA_SOURCE__BASE_URL                   Catalogue origin (default: https://www.yousuu.com)");
    println!("  BOOKMETA_SOURCE__SEARCH_PATH                Search path, keyword appended URL-encoded");
    println!("  BOOKMETA_SOURCE__USER_AGENT                 User agent sent with every request");
    println!("  BOOKMETA_SOURCE__IMAGE_PROXY                Image proxy for cover URLs (default: https://images.weserv.nl/)");
    println!();
    println!("Transport:");
    println!("  BOOKMETA_TRANSPORT__TIMEOUT_LADDER_SECS     Per-attempt timeouts, comma-separated (default: 10,15,20)");
    println!("  BOOKMETA_TRANSPORT__BACKOFF_BASE_MS         Backoff unit between attempts (default: 1000)");
    println!("  BOOKMETA_TRANSPORT__MAX_REDIRECTS           Maximum redirect hops (default: 5)");
    println!("  BOOKMETA_TRANSPORT__DEFAULT_CHARSET         Charset when a page declares none (default: gbk)");
    println!();
    println!("Extraction:");
    println!("  BOOKMETA_EXTRACTION__MAX_RESULTS            Records taken from one listing (default: 20)");
    println!("  BOOKMETA_EXTRACTION__ALLOW_KEYWORD_TRUNCATION  Retry empty searches with a shortened keyword (default: false)");
    println!();
    println!("Global Proxy Settings:");
    println!("  HTTP_PROXY                  HTTP proxy URL (e.g., http://proxy:8080)");
    println!("  HTTPS_PROXY                 HTTPS proxy URL (e.g., https://proxy:8080)");
    println!("  NO_PROXY                    Comma-separated list of hosts to bypass proxy");
    println!();
    println!("Other Settings:");
    println!("  RUST_LOG                    Rust logging level (e.g., debug, info, warn, error)");
    std::process::exit(0);
}

fn init_tracing(cli: &Cli, config: &Config) {
    let log_level = match cli.verbose {
        0 => config.logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    let env_filter = if cli.quiet { "error" } else { log_level };

    let json = config.logging.format.as_deref() == Some("json");
    let json_layer = json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
    });
    let pretty_layer = (!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("bookmeta={}", env_filter)),
        ))
        .with(json_layer)
        .with(pretty_layer)
        .init();
}

fn resolve_config(cli: &Cli) -> Result<(Config, Option<PathBuf>)> {
    let path = cli.config.clone().or_else(find_config_file);
    match path {
        Some(path) => {
            let config = load_config(&path)
                .with_context(|| format!("Failed to load config file {}", path.display()))?;
            Ok((config, Some(path)))
        }
        None => Ok((get_config(), None)),
    }
}

fn read_keywords(file: Option<&Path>, mut keywords: Vec<String>) -> Result<Vec<String>> {
    if let Some(file) = file {
        let content = std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read keyword file {}", file.display()))?;
        keywords.extend(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string),
        );
    }
    Ok(keywords)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.env {
        print_env_vars();
    }

    let (config, config_path) = resolve_config(&cli)?;
    init_tracing(&cli, &config);
    if let Some(path) = &config_path {
        tracing::info!("Using config file: {}", path.display());
    }

    let format = cli.output.resolve();

    match cli.command {
        Some(Commands::Search { keyword }) => {
            let source = CatalogueSource::from_config(&config)?;
            let records = source.search(&keyword).await?;
            output_records(&records, format)?;
        }
        Some(Commands::Detail { url }) => {
            let source = CatalogueSource::from_config(&config)?;
            let meta = source.fetch_detail(&url).await?;
            output_detail(&meta, format)?;
        }
        Some(Commands::Batch { file, keywords }) => {
            let keywords = read_keywords(file.as_deref(), keywords)?;
            if keywords.is_empty() {
                anyhow::bail!("No keywords given; pass keywords or --file");
            }

            let source = CatalogueSource::from_config(&config)?;
            let entries = source.search_batch(&keywords).await;
            output_batch(&entries, format)?;

            let summary = BatchSummary::from_entries(&entries);
            if !cli.quiet {
                eprintln!(
                    "{} keyword(s): {} matched, {} empty, {} failed",
                    summary.keywords, summary.matched, summary.empty, summary.failed
                );
            }
        }
        Some(Commands::Config) => {
            print!("{}", config.to_toml()?);
        }
        None => {
            eprintln!("No command given. Run with --help for usage.");
        }
    }

    Ok(())
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let head: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

fn format_word_count(word_count: u64) -> String {
    match word_count {
        0 => "-".to_string(),
        n if n >= 10_000 => format!("{:.1}万", n as f64 / 10_000.0),
        n => n.to_string(),
    }
}

fn records_table(records: &[SearchRecord], keyword_column: Option<&str>) -> comfy_table::Table {
    use comfy_table::{Attribute, Cell, Table};

    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);

    let mut header = vec!["Title", "Author", "Category", "Platform", "Words", "URL"];
    if keyword_column.is_some() {
        header.insert(0, "Keyword");
    }
    table.set_header(header);

    for record in records {
        let mut row = vec![
            Cell::new(truncate(record.title(), 30)).add_attribute(Attribute::Bold),
            Cell::new(truncate(record.author(), 16)),
            Cell::new(record.category()),
            Cell::new(record.platform().unwrap_or("-")),
            Cell::new(format_word_count(record.word_count())),
            Cell::new(record.source_url()),
        ];
        if let Some(keyword) = keyword_column {
            row.insert(0, Cell::new(keyword));
        }
        table.add_row(row);
    }
    table
}

fn output_records(records: &[SearchRecord], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(records)?),
        _ if records.is_empty() => println!("No results."),
        _ => println!("{}", records_table(records, None)),
    }
    Ok(())
}

fn output_detail(meta: &DetailMeta, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(meta)?),
        _ => {
            println!("Category:  {}", meta.category.as_deref().unwrap_or("-"));
            println!("Platform:  {}", meta.platform.as_deref().unwrap_or("-"));
            println!("Synopsis:  {}", meta.description.as_deref().unwrap_or("-"));
        }
    }
    Ok(())
}

fn output_batch(entries: &[BatchEntry], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let items: Vec<serde_json::Value> = entries
                .iter()
                .map(|entry| match &entry.outcome {
                    Ok(records) => serde_json::json!({
                        "keyword": entry.keyword,
                        "records": records,
                    }),
                    Err(e) => serde_json::json!({
                        "keyword": entry.keyword,
                        "error": e.to_string(),
                    }),
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&items)?);
        }
        _ => {
            for entry in entries {
                match &entry.outcome {
                    Ok(records) if records.is_empty() => {
                        println!("{}: no results", entry.keyword);
                    }
                    Ok(records) => println!("{}", records_table(records, Some(entry.keyword.as_str()))),
                    Err(e) => println!("{}: error: {}", entry.keyword, e),
                }
            }
        }
    }
    Ok(())
}
