use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

mod config;
mod crawler;
mod dedup;
mod downloader;
mod error;
mod extractor;
mod models;
mod pool;
mod storage;
mod traits;
mod utils;

#[cfg(test)]
mod test_support;

use crate::config::Config;
use crate::crawler::Crawler;
use crate::utils::HttpClient;

#[derive(Parser)]
#[command(name = "imgcrawl")]
#[command(about = "Crawl image search results for a keyword and download unique images")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "imgcrawl.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Search for a keyword and download images
    Crawl(CrawlArgs),
    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Debug)]
struct CrawlArgs {
    /// Search keyword
    keyword: String,

    /// Number of unique images to download
    #[arg(value_parser = clap::value_parser!(u64).range(1..))]
    amount: u64,

    /// Search URL template with keyword, offset and count placeholders
    #[arg(short, long)]
    template: Option<String>,

    /// Destination directory
    #[arg(short, long)]
    output: Option<String>,

    /// Images requested per results page
    #[arg(long)]
    per_page: Option<usize>,

    /// Concurrent page fetches
    #[arg(long)]
    page_workers: Option<usize>,

    /// Concurrent image downloads
    #[arg(long)]
    download_workers: Option<usize>,

    /// Append the content hash to file names
    #[arg(long)]
    unique_names: bool,

    /// Disable the progress bar
    #[arg(long)]
    no_progress: bool,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose)?;

    match cli.command {
        Commands::Crawl(args) => {
            let mut config = Config::load(&cli.config)?;
            apply_overrides(&mut config, &args);
            config.validate()?;
            run_crawl(&config, &args).await?;
        }
        Commands::Init { force } => {
            init_config(&cli.config, force)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(format!("imgcrawl={}", level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .init();

    Ok(())
}

fn apply_overrides(config: &mut Config, args: &CrawlArgs) {
    if let Some(template) = &args.template {
        config.crawler.url_template = template.clone();
    }
    if let Some(output) = &args.output {
        config.crawler.output_dir = output.clone();
    }
    if let Some(per_page) = args.per_page {
        config.crawler.per_page = per_page;
    }
    if let Some(workers) = args.page_workers {
        config.crawler.page_workers = workers;
    }
    if let Some(workers) = args.download_workers {
        config.crawler.download_workers = workers;
    }
    if args.unique_names {
        config.crawler.disambiguate_filenames = true;
    }
    if args.no_progress || args.json {
        config.crawler.progress_bar = false;
    }
}

async fn run_crawl(config: &Config, args: &CrawlArgs) -> Result<()> {
    let client = HttpClient::new(&config.http)?;
    let crawler = Crawler::new(config, Arc::new(client))?;

    info!("🚀 Crawling '{}' for {} images", args.keyword, args.amount);
    let summary = crawler.run(&args.keyword, usize::try_from(args.amount)?).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", summary);
    }

    Ok(())
}

fn init_config(path: &str, force: bool) -> Result<()> {
    if Path::new(path).exists() && !force {
        anyhow::bail!("{} already exists, pass --force to overwrite", path);
    }

    Config::default().save(path)?;
    info!("📝 Wrote default configuration to {}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn crawl_args(argv: &[&str]) -> CrawlArgs {
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Crawl(args) => args,
            Commands::Init { .. } => panic!("expected crawl"),
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn amount_must_be_positive() {
        assert!(Cli::try_parse_from(["imgcrawl", "crawl", "ipad", "0"]).is_err());
        assert!(Cli::try_parse_from(["imgcrawl", "crawl", "ipad", "-3"]).is_err());
        assert_eq!(crawl_args(&["imgcrawl", "crawl", "ipad", "20"]).amount, 20);
    }

    #[test]
    fn flags_override_config() {
        let args = crawl_args(&[
            "imgcrawl",
            "crawl",
            "ipad",
            "20",
            "--output",
            "/tmp/ipad",
            "--per-page",
            "35",
            "--download-workers",
            "4",
            "--unique-names",
            "--json",
        ]);

        let mut config = Config::default();
        apply_overrides(&mut config, &args);

        assert_eq!(config.crawler.output_dir, "/tmp/ipad");
        assert_eq!(config.crawler.per_page, 35);
        assert_eq!(config.crawler.download_workers, 4);
        assert_eq!(config.crawler.page_workers, 8);
        assert!(config.crawler.disambiguate_filenames);
        assert!(!config.crawler.progress_bar);
    }

    #[test]
    fn init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("imgcrawl.toml");
        let path = path.to_str().unwrap();

        init_config(path, false).unwrap();
        assert!(init_config(path, false).is_err());
        init_config(path, true).unwrap();

        let loaded = Config::load(path).unwrap();
        assert_eq!(loaded.crawler.per_page, 30);
    }
}
