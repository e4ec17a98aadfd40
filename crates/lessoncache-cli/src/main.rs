//! lessoncache - inspect and exercise the storefront data cache from a shell.
//!
//! Every command builds the same `DataCache` the storefront uses, so the warm
//! snapshot under the user cache directory is read and written as usual.

use std::io;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::time::Instant;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use lessoncache_core::models::UploadQueueItem;
use lessoncache_core::{ApiClient, Config, DataCache, DataKind, DataPayload};

/// Overrides `api_base_url` from the config file
const API_URL_ENV: &str = "LESSONCACHE_API_URL";

const USAGE: &str = "\
Usage: lessoncache <command>

Commands:
  get <kind> [--force]     Print the data for a kind
  preload                  Load the hot kinds (modules, settings)
  stats                    Load the hot kinds and print cache statistics
  watch <kind> <seconds>   Print every update to a kind for a while
  uploads                  List the upload queue
  uploads add <id> <file>  Queue an upload
  uploads rm <id>          Remove an upload
  clear                    Delete the warm snapshot

Kinds: modules, users, purchases, settings, uploadQueue, all";

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // RUST_LOG controls the level, e.g. RUST_LOG=lessoncache_core=debug
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn load_config() -> Result<Config> {
    let mut config = Config::load()?;
    if let Ok(url) = std::env::var(API_URL_ENV) {
        config.api_base_url = Some(url);
    }
    Ok(config)
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    if matches!(args.first(), None | Some(&"help") | Some(&"--help") | Some(&"-h")) {
        println!("{}", USAGE);
        return Ok(());
    }

    let config = load_config()?;
    info!(app_key = %config.app_key, "lessoncache starting");

    match args.as_slice() {
        ["get", kind] => get(&config, kind, false).await,
        ["get", kind, "--force"] => get(&config, kind, true).await,
        ["preload"] => preload(&config).await,
        ["stats"] => stats(&config).await,
        ["watch", kind, seconds] => watch(&config, kind, seconds).await,
        ["uploads"] => get(&config, "uploadQueue", true).await,
        ["uploads", "add", id, file] => add_upload(&config, id, file).await,
        ["uploads", "rm", id] => remove_upload(&config, id).await,
        ["clear"] => clear(&config),
        _ => bail!("Unknown command: {}\n\n{}", args.join(" "), USAGE),
    }
}

fn open_cache(config: &Config) -> Result<DataCache> {
    config.build_cache(config.cache_dir()?)
}

fn parse_kind(kind: &str) -> Result<DataKind> {
    kind.parse()
        .map_err(|_| anyhow::anyhow!("Unknown kind '{}'", kind))
}

async fn get(config: &Config, kind: &str, force: bool) -> Result<()> {
    let kind = parse_kind(kind)?;
    let cache = open_cache(config)?;
    let data = cache.get_data(kind, force).await?;
    print_json(&*data)
}

async fn preload(config: &Config) -> Result<()> {
    let cache = open_cache(config)?;
    for (kind, result) in cache.preload_data().await {
        match result {
            Ok(data) => println!("{:<12} {} item(s)", kind.as_str(), data.len()),
            Err(e) => println!("{:<12} failed: {}", kind.as_str(), e),
        }
    }
    Ok(())
}

async fn stats(config: &Config) -> Result<()> {
    let cache = open_cache(config)?;
    let _ = cache.preload_data().await;
    print_json(&cache.get_cache_stats())
}

async fn watch(config: &Config, kind: &str, seconds: &str) -> Result<()> {
    let kind = parse_kind(kind)?;
    let seconds: u64 = seconds
        .parse()
        .with_context(|| format!("Invalid duration '{}'", seconds))?;
    let cache = open_cache(config)?;

    let id = cache.subscribe(kind, move |data: &DataPayload| {
        println!("{} updated: {} item(s)", kind, data.len());
    });

    // Re-read on a short period so stale entries get refreshed in the background
    let poll = cache.policy().cache_duration.min(Duration::from_secs(seconds.max(1)));
    let deadline = Instant::now() + Duration::from_secs(seconds);
    while Instant::now() < deadline {
        cache.get_data(kind, false).await?;
        tokio::time::sleep_until((Instant::now() + poll).min(deadline)).await;
    }

    cache.unsubscribe(kind, id);
    print_json(&cache.get_cache_stats())
}

fn api_client(config: &Config) -> Result<ApiClient> {
    let base_url = config
        .api_base_url
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("No API base URL configured (set {})", API_URL_ENV))?;
    Ok(ApiClient::new(base_url)?)
}

async fn add_upload(config: &Config, id: &str, file: &str) -> Result<()> {
    let client = api_client(config)?;
    let created = client.add_upload(&UploadQueueItem::new(id, file)).await?;
    print_json(&created)
}

async fn remove_upload(config: &Config, id: &str) -> Result<()> {
    let client = api_client(config)?;
    if !client.delete_upload(id).await? {
        bail!("Upload '{}' was not removed", id);
    }
    println!("Removed upload {}", id);
    Ok(())
}

fn clear(config: &Config) -> Result<()> {
    let dir = config.cache_dir()?;
    if dir.exists() {
        std::fs::remove_dir_all(&dir)
            .with_context(|| format!("Failed to remove {}", dir.display()))?;
        println!("Removed {}", dir.display());
    } else {
        println!("Nothing cached for {}", config.app_key);
    }
    Ok(())
}
