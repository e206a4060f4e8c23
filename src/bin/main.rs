//! iterdns binary entry point: a DNS client built on the resolver.

use clap::Parser;
use iterdns::{telemetry, Config, RecordCache, ResolveError, Resolver};
use std::path::PathBuf;
use tracing::{error, info};

/// Resolve a hostname by walking the delegation chain from the root.
#[derive(Parser, Debug)]
#[command(name = "iterdns")]
#[command(version, about, long_about = None)]
struct Args {
    /// Hostname to resolve.
    hostname: String,

    /// Resolver receive timeout in seconds.
    #[arg(long)]
    timeout: Option<u64>,

    /// Enable the record cache (loaded before and saved after resolving).
    #[arg(short = 'c', long)]
    caching: bool,

    /// Fallback TTL in seconds for cached entries whose own TTL is zero.
    #[arg(short = 't', long)]
    ttl: Option<u64>,

    /// Path to configuration file (TOML).
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load configuration: optional file, then environment, then CLI flags.
    let mut builder = config::Config::builder();
    if let Some(path) = &args.config {
        builder = builder.add_source(config::File::from(path.clone()));
    }
    let mut config: Config = builder
        .add_source(
            config::Environment::with_prefix("ITERDNS")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()?;

    if let Some(timeout) = args.timeout {
        config.resolver.timeout_secs = timeout;
    }
    if let Some(ttl) = args.ttl {
        config.resolver.cache_ttl = ttl;
    }
    if args.caching {
        config.resolver.caching = true;
    }

    // Initialize telemetry
    telemetry::init(&config.telemetry).map_err(|e| e as Box<dyn std::error::Error>)?;

    info!(
        hostname = %args.hostname,
        timeout_secs = config.resolver.timeout_secs,
        caching = config.resolver.caching,
        root_server = %config.resolver.root_server,
        "Starting iterdns"
    );

    let cache = if config.resolver.caching {
        let cache = RecordCache::with_path(config.resolver.cache_ttl, &config.resolver.cache_path);
        cache.load();
        Some(cache)
    } else {
        None
    };

    let resolver = Resolver::new(&config.resolver, cache.clone());
    let result = resolver.resolve_host(&args.hostname).await;

    // Persist whatever the walk learned, even alongside a failure report.
    if let Some(cache) = &cache {
        cache.save();
    }

    match result {
        Ok(lookup) => {
            println!("{}", lookup.hostname);
            for alias in &lookup.aliases {
                println!("alias: {}", alias);
            }
            for address in &lookup.addresses {
                println!("address: {}", address);
            }
            Ok(())
        }
        Err(e @ ResolveError::Timeout { .. }) => {
            error!("resolution timed out: {}", e);
            Err(e.into())
        }
        Err(e) => {
            error!("resolution failed: {}", e);
            Err(e.into())
        }
    }
}
