use anyhow::Context;
use apod_api::ApodClient;
use apod_cache::CacheManager;
use apod_core::{
    config::ApiFlavor, dates, most_recent_first, ApiProvider, ApodEntry, ApodService, Config,
    FavoritesStore, FileStore,
};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "apod")]
#[command(version, about = "Browse NASA's Astronomy Picture of the Day and keep your favorites", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// NASA API key
    #[arg(long, global = true, env = "NASA_API_KEY")]
    api_key: Option<String>,

    /// Talk to an explorer proxy at this URL instead of NASA
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Skip the local response cache
    #[arg(long, global = true)]
    no_cache: bool,

    /// Print entries as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Show today's picture
    Today,
    /// Show the picture for one day
    Date {
        /// Day to show (YYYY-MM-DD)
        date: String,
    },
    /// Show every picture between two days, newest first
    Range {
        /// First day (YYYY-MM-DD)
        start: String,
        /// Last day (YYYY-MM-DD)
        end: String,
    },
    /// Show the last few days, newest first
    Gallery {
        /// How many days back to go
        #[arg(short, long)]
        days: Option<u32>,
    },
    /// Manage saved favorites
    Favorites {
        #[command(subcommand)]
        action: FavoritesAction,
    },
    /// Manage the response cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// Manage the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand)]
enum FavoritesAction {
    /// List saved favorites in the order they were added
    List,
    /// Add the picture for a day, or remove it if already saved
    Toggle {
        /// Day to toggle (YYYY-MM-DD)
        date: String,
    },
    /// Tell whether a day is saved
    Check {
        /// Day to check (YYYY-MM-DD)
        date: String,
    },
}

#[derive(clap::Subcommand)]
enum CacheAction {
    /// Drop every cached response
    Clear,
    /// Show what the cache holds
    Stats,
}

#[derive(clap::Subcommand)]
enum ConfigAction {
    /// Write a config file with every default filled in
    Init,
    /// Print where the config file lives
    Path,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging. The TUI owns the terminal, so it stays quiet unless RUST_LOG asks.
    let default_filter = match (&cli.command, cli.verbose) {
        (_, true) => "apod=debug,apod_core=debug,apod_api=debug,apod_cache=debug,apod_tui=debug",
        (None, false) => "off",
        (Some(_), false) => "apod=info,apod_core=warn,apod_api=warn,apod_cache=warn",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = load_config(&cli)?;

    match cli.command {
        Some(Commands::Today) => {
            let service = build_service(&config, cli.no_cache)?;
            let entry = service.today().await?;
            print_entry(&entry, cli.json)?;
        }
        Some(Commands::Date { ref date }) => {
            let service = build_service(&config, cli.no_cache)?;
            let entry = service.by_date_str(date).await?;
            print_entry(&entry, cli.json)?;
        }
        Some(Commands::Range { ref start, ref end }) => {
            let service = build_service(&config, cli.no_cache)?;
            let entries = most_recent_first(service.range_str(start, end).await?);
            print_entries(&entries, cli.json)?;
        }
        Some(Commands::Gallery { days }) => {
            let service = build_service(&config, cli.no_cache)?;
            let days = days.unwrap_or(config.ui.gallery_days);
            let entries = most_recent_first(service.gallery(days).await?);
            print_entries(&entries, cli.json)?;
        }
        Some(Commands::Favorites { ref action }) => {
            let mut favorites = open_favorites(&config)?;
            match action {
                FavoritesAction::List => {
                    print_entries(&favorites.list(), cli.json)?;
                }
                FavoritesAction::Toggle { date } => {
                    let service = build_service(&config, cli.no_cache)?;
                    let day = service.requested_day(date)?;

                    // Favorites are snapshots, so fetch the entry being saved
                    let entry = match favorites.get(&dates::format_date(day)) {
                        Some(saved) => saved.clone(),
                        None => service.by_date(day).await?,
                    };
                    let date = entry.date.clone();
                    favorites.toggle(entry);

                    if favorites.is_favorite(&date) {
                        println!("Added {} to favorites", date);
                    } else {
                        println!("Removed {} from favorites", date);
                    }
                }
                FavoritesAction::Check { date } => {
                    let day = build_service(&config, cli.no_cache)?.requested_day(date)?;
                    let date = dates::format_date(day);
                    let favorite = favorites.is_favorite(&date);
                    if cli.json {
                        println!("{}", serde_json::json!({ "date": date, "favorite": favorite }));
                    } else if favorite {
                        println!("{} is a favorite", date);
                    } else {
                        println!("{} is not a favorite", date);
                    }
                }
            }
            if let Some(warning) = favorites.persistence_warning() {
                eprintln!("Warning: {}", warning);
            }
        }
        Some(Commands::Cache { ref action }) => {
            let path = config.cache_path()?;
            let cache = CacheManager::new(&path)
                .with_context(|| format!("Failed to open cache at {}", path.display()))?;
            match action {
                CacheAction::Clear => {
                    let removed = cache.clear()?;
                    println!("Removed {} cached responses", removed);
                }
                CacheAction::Stats => {
                    let stats = cache.stats()?;
                    println!("Cache file:  {}", path.display());
                    println!("Entries:     {}", stats.entries);
                    if let Some(oldest) = stats
                        .oldest_cached_at
                        .and_then(|ts| chrono::DateTime::from_timestamp(ts, 0))
                    {
                        println!("Oldest:      {}", oldest.format("%Y-%m-%d %H:%M UTC"));
                    }
                }
            }
        }
        Some(Commands::Config { ref action }) => {
            let path = match &cli.config {
                Some(path) => path.clone(),
                None => Config::config_path()?,
            };
            match action {
                ConfigAction::Path => println!("{}", path.display()),
                ConfigAction::Init if path.exists() => {
                    println!("Config already exists at {}", path.display());
                }
                ConfigAction::Init => {
                    let defaults = Config::default();
                    match &cli.config {
                        Some(path) => defaults.save_to(path)?,
                        None => defaults.save()?,
                    }
                    println!("Wrote default config to {}", path.display());
                }
            }
        }
        None => {
            let service = build_service(&config, cli.no_cache)?;
            let favorites = open_favorites(&config)?;
            let app = apod_tui::App::new(favorites, config.ui.gallery_days);
            apod_tui::run_tui(app, Arc::new(service)).await?;
        }
    }

    Ok(())
}

/// Config file plus command-line overrides
fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    if let Some(key) = &cli.api_key {
        config.api.api_key = Some(key.clone());
    }
    if let Some(url) = &cli.base_url {
        config.api.flavor = ApiFlavor::Proxy;
        config.api.base_url = Some(url.clone());
    }
    if cli.no_cache {
        config.cache.enabled = false;
    }

    tracing::debug!("Using upstream {:?}", config.api.upstream());
    Ok(config)
}

fn build_service(config: &Config, no_cache: bool) -> anyhow::Result<ApodService> {
    let client = ApodClient::with_timeout(config.api.upstream(), config.api.timeout())
        .with_retry_config(config.api.retry_config());
    let service = ApodService::new(Box::new(ApiProvider::new(client)));

    if no_cache || !config.cache.enabled {
        return Ok(service);
    }

    let path = config.cache_path()?;
    match CacheManager::new(&path) {
        Ok(cache) => Ok(service.with_cache(Arc::new(cache), config.cache.today_ttl())),
        Err(e) => {
            // A broken cache only costs extra requests
            tracing::warn!("Cache unavailable at {}: {}", path.display(), e);
            Ok(service)
        }
    }
}

fn open_favorites(config: &Config) -> anyhow::Result<FavoritesStore> {
    let dir = config.data_dir()?;
    tracing::debug!("Favorites stored in {}", dir.display());
    Ok(FavoritesStore::initialize(Box::new(FileStore::new(dir))))
}

fn print_entry(entry: &ApodEntry, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(entry)?);
        return Ok(());
    }

    println!("{}  {}", entry.date, entry.title);
    println!("{}", "-".repeat(entry.date.len() + entry.title.chars().count() + 2));
    println!("Media:  {}", entry.media_type);
    if let Some(copyright) = &entry.copyright {
        println!("Credit: {}", copyright);
    }
    println!("URL:    {}", entry.url);
    if let Some(hd) = &entry.hd_url {
        println!("HD:     {}", hd);
    }
    println!();
    println!("{}", entry.explanation);
    Ok(())
}

fn print_entries(entries: &[ApodEntry], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("Nothing to show");
        return Ok(());
    }

    for entry in entries {
        let media = if entry.is_image() { "" } else { "  [video]" };
        println!("{}  {}{}", entry.date, entry.title, media);
    }
    Ok(())
}
