//! userhub CLI
//!
//! Command-line interface for the cached, rate-limited user lookup service.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use userhub_api::{ApiConfig, ApiServer, AppState};
use userhub_core::types::CacheKey;
use userhub_service::{ServiceConfig, UserService};
use userhub_store::{demo_users, MemoryStore, StoreConfig};

/// userhub - cached user lookups with single-flight and rate limiting
#[derive(Parser)]
#[command(name = "userhub")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the API server
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "USERHUB_PORT", default_value = "3001")]
        port: u16,
        /// Bind address
        #[arg(short, long, default_value = "0.0.0.0")]
        bind: String,
        /// JSON file of users to serve (demo users when omitted)
        #[arg(short, long, env = "USERHUB_DATA_FILE")]
        data: Option<PathBuf>,
    },

    /// Look one key up, e.g. `user:1` or `user:email:bob@example.com`
    Lookup {
        /// Cache key
        key: String,
        /// How many times to look it up
        #[arg(short, long, default_value = "2")]
        repeat: usize,
        /// JSON file of users (demo users when omitted)
        #[arg(short, long, env = "USERHUB_DATA_FILE")]
        data: Option<PathBuf>,
    },

    /// Fire concurrent lookups and compare store calls to lookups
    Bench {
        /// Number of concurrent callers
        #[arg(short, long, default_value = "100")]
        clients: usize,
        /// Number of distinct user ids the callers spread over
        #[arg(short, long, default_value = "5")]
        keys: u64,
        /// Simulated store latency in milliseconds
        #[arg(short, long, default_value = "100")]
        latency_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "userhub=debug,info"
    } else {
        "userhub=info,warn"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Serve { port, bind, data } => cmd_serve(port, &bind, data).await,
        Commands::Lookup { key, repeat, data } => cmd_lookup(&key, repeat, data).await,
        Commands::Bench {
            clients,
            keys,
            latency_ms,
        } => cmd_bench(clients, keys, latency_ms).await,
    }
}

/// Run API server
async fn cmd_serve(port: u16, bind: &str, data: Option<PathBuf>) -> Result<()> {
    println!("{}", "Starting userhub API server...".cyan().bold());

    let mut config = ApiConfig::from_env();
    if data.is_some() {
        config.data_file = data;
    }

    let addr: SocketAddr = format!("{}:{}", bind, port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", bind, port))?;

    let server = ApiServer::from_config(config)
        .await
        .context("Failed to open user store")?;

    println!("   {} http://{}", "Listening on:".green(), addr);
    println!("   {} http://{}/health", "Health check:".dimmed(), addr);
    println!("   {} http://{}/api/v1/users/1", "Try:".dimmed(), addr);
    println!("\n   Press Ctrl+C to stop.\n");

    server.run(addr).await?;
    Ok(())
}

/// Look a key up against a seeded store
async fn cmd_lookup(raw: &str, repeat: usize, data: Option<PathBuf>) -> Result<()> {
    let mut config = ApiConfig::from_env();
    config.data_file = data.or(config.data_file);
    let state = AppState::from_config(config)
        .await
        .context("Failed to open user store")?;

    println!("{} {}", "Looking up:".cyan().bold(), raw);

    for attempt in 1..=repeat.max(1) {
        let start = Instant::now();
        let lookup = state.service.lookup_str(raw).await.context("Lookup failed")?;
        let elapsed = start.elapsed();

        let source = if lookup.from_cache {
            "cache".green()
        } else {
            "store".yellow()
        };
        println!("   #{} from {} in {:?}", attempt, source, elapsed);

        match lookup.user {
            Some(user) if attempt == 1 => {
                println!("{}", serde_json::to_string_pretty(user.as_ref())?);
            }
            Some(_) => {}
            None => {
                println!("\n{}", "No such user.".yellow());
                return Ok(());
            }
        }
    }

    let stats = state.service.stats();
    println!(
        "\n   {} {} hits, {} misses",
        "Cache:".dimmed(),
        stats.hits,
        stats.misses
    );
    Ok(())
}

/// Run concurrent lookups to show single-flight collapse
async fn cmd_bench(clients: usize, keys: u64, latency_ms: u64) -> Result<()> {
    let keys = keys.max(1);
    println!(
        "{} {} callers over {} keys, store latency {}ms",
        "Benchmarking".cyan().bold(),
        clients,
        keys,
        latency_ms
    );

    let store = Arc::new(MemoryStore::with_users(StoreConfig { latency_ms }, demo_users())?);
    let service = Arc::new(UserService::new(store.clone(), ServiceConfig::default())?);

    let pb = ProgressBar::new(clients as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("   [{bar:40.cyan/blue}] {pos}/{len}")?
            .progress_chars("#>-"),
    );

    let start = Instant::now();
    let tasks = (0..clients).map(|i| {
        let service = service.clone();
        let pb = pb.clone();
        let key = CacheKey::user(i as u64 % keys + 1);
        tokio::spawn(async move {
            let outcome = service.lookup(&key).await;
            pb.inc(1);
            outcome
        })
    });

    let mut found = 0;
    let mut failed = 0;
    for outcome in join_all(tasks).await {
        match outcome? {
            Ok(lookup) if lookup.user.is_some() => found += 1,
            Ok(_) => {}
            Err(e) => {
                failed += 1;
                tracing::warn!(error = %e, "lookup failed");
            }
        }
    }
    pb.finish();
    let elapsed = start.elapsed();

    let stats = service.stats();
    println!("\n{}", "Results:".green().bold());
    println!("   Lookups:      {}", clients);
    println!("   Found:        {}", found);
    println!("   Store calls:  {}", store.calls().to_string().bold());
    println!("   Cache hits:   {}", stats.hits);
    println!("   Elapsed:      {:?}", elapsed);

    if failed > 0 {
        println!("   {} {} lookups failed", "✗".red(), failed);
    } else if store.calls() <= keys {
        println!("   {} At most one store call per key", "✓".green());
    } else {
        println!(
            "   {} Expected at most {} store calls",
            "✗".red(),
            keys
        );
    }

    Ok(())
}
