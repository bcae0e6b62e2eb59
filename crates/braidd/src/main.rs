//! `braidd` — the Braid daemon.
//!
//! Binary entrypoint that ties all Braid components together into a
//! running node with the HTTP file API.
//!
//! # Usage
//!
//! ```text
//! braidd start                       # start the daemon
//! braidd start -c braid.toml        # start with a config file
//! braidd start --memory              # fully in-memory (no persistence)
//! braidd token --owner 1             # mint a bearer token for user 1
//! braidd status                      # show stored-shard stats
//! braidd benchmark -n 200 -s 65536   # write/read benchmark
//! ```

mod config;
mod telemetry;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use braid_engine::{BraidNode, BraidNodeConfig};
use braid_http::{HttpServer, HttpServerConfig, JwtResolver};
use braid_meta::MetaStore;
use braid_store::{BlobStore, FileStore, MemoryStore};
use braid_types::OwnerId;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use config::CliConfig;

// -----------------------------------------------------------------------
// CLI definition
// -----------------------------------------------------------------------

#[derive(Parser)]
#[command(
    name = "braidd",
    version,
    about = "Braid redundant sharded file storage daemon"
)]
struct Cli {
    /// Path to TOML config file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the Braid daemon.
    Start {
        /// Override data directory.
        #[arg(short, long)]
        data_dir: Option<PathBuf>,

        /// Override HTTP listen address (e.g. "127.0.0.1:8471").
        #[arg(short = 'l', long)]
        listen_addr: Option<String>,

        /// JWT signing secret for bearer tokens.
        ///
        /// Can also be set via BRAID_JWT_SECRET or `[auth] jwt_secret` in
        /// the config file. If none is provided, a random secret is
        /// generated and displayed.
        #[arg(long, env = "BRAID_JWT_SECRET")]
        secret: Option<String>,

        /// Run fully in-memory (no disk persistence).
        #[arg(short, long)]
        memory: bool,
    },

    /// Mint a bearer token for a user id.
    Token {
        /// The numeric user id the token is issued for.
        #[arg(long)]
        owner: u64,

        /// Token lifetime in hours.
        #[arg(long, default_value = "24")]
        ttl_hours: u64,
    },

    /// Show stored-shard statistics from the local metadata store.
    Status,

    /// Run a quick write/read benchmark (in-memory).
    Benchmark {
        /// Number of files to write and read.
        #[arg(short = 'n', long, default_value = "100")]
        count: usize,

        /// Size of each file in bytes.
        #[arg(short, long, default_value = "10240")]
        size: usize,
    },
}

// -----------------------------------------------------------------------
// Entrypoint
// -----------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = CliConfig::load(cli.config.as_deref()).context("failed to load config")?;

    telemetry::init(&config.log.level);

    match cli.command {
        Commands::Start {
            data_dir,
            listen_addr,
            secret,
            memory,
        } => {
            // CLI args override config file values.
            if let Some(dir) = data_dir {
                config.node.data_dir = dir;
            }
            if let Some(addr) = listen_addr {
                config.node.listen_addr = addr;
            }
            if let Some(s) = secret {
                config.auth.jwt_secret = s;
            }
            if memory {
                config.storage.backend = "memory".to_string();
            }
            cmd_start(config).await
        }
        Commands::Token { owner, ttl_hours } => cmd_token(&config, owner, ttl_hours),
        Commands::Status => cmd_status(&config),
        Commands::Benchmark { count, size } => cmd_benchmark(&config, count, size).await,
    }
}

// -----------------------------------------------------------------------
// braidd start
// -----------------------------------------------------------------------

async fn cmd_start(mut config: CliConfig) -> Result<()> {
    info!("starting braidd");
    let params = config.erasure_params();
    info!(
        data_dir = %config.node.data_dir.display(),
        listen_addr = %config.node.listen_addr,
        backend = %config.storage.backend,
        data_shards = params.data_shards,
        parity_shards = params.parity_shards,
        "node configuration"
    );

    let memory_mode = config.storage.backend == "memory";

    if !memory_mode {
        std::fs::create_dir_all(&config.node.data_dir)
            .context("failed to create data directory")?;
    }

    // --- JWT secret ---
    // If no secret was provided (CLI flag, env var, or config file),
    // generate a random one and display it so the user can mint tokens.
    let secret = match config.jwt_secret() {
        Some(s) => s,
        None => {
            use rand::RngCore;
            let mut bytes = [0u8; 16];
            rand::rng().fill_bytes(&mut bytes);
            let generated: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
            info!("JWT secret (generated): {generated}");
            info!("to mint a token: braidd token --owner <id>  (with BRAID_JWT_SECRET set)");
            config.auth.jwt_secret = generated.clone();
            generated
        }
    };

    // --- Metadata store ---
    let meta = if memory_mode {
        info!("using in-memory metadata store");
        Arc::new(MetaStore::in_memory())
    } else {
        let meta_path = config.node.data_dir.join("meta");
        Arc::new(MetaStore::open(&meta_path).context("failed to open metadata store")?)
    };

    // --- Backend adapters, one per shard index ---
    let backends: Vec<Arc<dyn BlobStore>> = if memory_mode {
        info!(count = params.total(), "using in-memory blob stores");
        (0..params.total())
            .map(|_| Arc::new(MemoryStore::new()) as Arc<dyn BlobStore>)
            .collect()
    } else {
        let locations = config.backend_locations()?;
        let mut stores = Vec::with_capacity(locations.len());
        for (index, location) in locations.iter().enumerate() {
            info!(index, path = %location.display(), "blob store location");
            let store =
                FileStore::new(location).context("failed to initialize blob store")?;
            stores.push(Arc::new(store) as Arc<dyn BlobStore>);
        }
        stores
    };

    // --- Engine ---
    let node = BraidNode::new(
        BraidNodeConfig {
            erasure: params,
            per_call_timeout: config.per_call_timeout(),
        },
        backends,
        meta,
    )
    .map_err(|e| anyhow::anyhow!("failed to build engine: {e}"))?;

    // --- HTTP API ---
    let server = HttpServer::new(HttpServerConfig {
        engine: Arc::new(node),
        resolver: Arc::new(JwtResolver::new(&secret)),
    });

    info!(addr = %config.node.listen_addr, "file API ready");
    server
        .serve_with_shutdown(&config.node.listen_addr, shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("shutdown complete");
    Ok(())
}

// -----------------------------------------------------------------------
// Signal handling
// -----------------------------------------------------------------------

/// Wait for a SIGTERM or SIGINT (Ctrl-C) signal.
///
/// On the first signal, the returned future resolves and initiates
/// graceful shutdown (the server stops accepting, in-flight requests
/// drain). If a second signal arrives while shutdown is in progress, the
/// process exits immediately.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received SIGINT (Ctrl-C), initiating graceful shutdown"),
        () = terminate => info!("received SIGTERM, initiating graceful shutdown"),
    }

    // If a second signal arrives during shutdown, exit immediately.
    tokio::spawn(async {
        let second = async {
            let ctrl_c = tokio::signal::ctrl_c();
            #[cfg(unix)]
            {
                let mut term =
                    tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                        .expect("failed to install second SIGTERM handler");
                tokio::select! {
                    _ = ctrl_c => {},
                    _ = term.recv() => {},
                }
            }
            #[cfg(not(unix))]
            {
                ctrl_c.await.ok();
            }
        };
        second.await;
        warn!("received second signal during shutdown — forcing exit");
        std::process::exit(1);
    });
}

// -----------------------------------------------------------------------
// braidd token
// -----------------------------------------------------------------------

fn cmd_token(config: &CliConfig, owner: u64, ttl_hours: u64) -> Result<()> {
    let secret = config
        .jwt_secret()
        .context("no JWT secret configured; set BRAID_JWT_SECRET or [auth] jwt_secret")?;
    let token = braid_http::issue_token(
        &secret,
        OwnerId::new(owner),
        Duration::from_secs(ttl_hours * 3600),
    )
    .map_err(|e| anyhow::anyhow!("failed to issue token: {e}"))?;
    println!("{token}");
    Ok(())
}

// -----------------------------------------------------------------------
// braidd status
// -----------------------------------------------------------------------

fn cmd_status(config: &CliConfig) -> Result<()> {
    let meta_path = config.node.data_dir.join("meta");

    let meta = MetaStore::open(&meta_path).map_err(|e| {
        anyhow::anyhow!(
            "cannot open metadata at {}. Has the node ever started? ({e})",
            meta_path.display(),
        )
    })?;

    let rows = meta.count_shard_rows()?;
    let total = config.erasure_params().total();
    println!("Shard rows stored: {rows}");
    println!("Files (rows / {total}): {}", rows / total);

    Ok(())
}

// -----------------------------------------------------------------------
// braidd benchmark
// -----------------------------------------------------------------------

async fn cmd_benchmark(config: &CliConfig, count: usize, size: usize) -> Result<()> {
    let params = config.erasure_params();

    println!("Braid Benchmark");
    println!("  files:   {count}");
    println!("  size:    {size} bytes each");
    println!(
        "  erasure: k={}, m={}",
        params.data_shards, params.parity_shards
    );
    println!();

    // In-memory setup — measures pure engine throughput.
    let backends: Vec<Arc<dyn BlobStore>> = (0..params.total())
        .map(|_| Arc::new(MemoryStore::new()) as Arc<dyn BlobStore>)
        .collect();
    let node = BraidNode::new(
        BraidNodeConfig {
            erasure: params,
            per_call_timeout: config.per_call_timeout(),
        },
        backends,
        Arc::new(MetaStore::in_memory()),
    )
    .map_err(|e| anyhow::anyhow!("failed to build engine: {e}"))?;

    let owner = OwnerId::new(1);
    let data = bytes::Bytes::from(generate_bench_data(size));
    let total_bytes = count as u64 * size as u64;

    // --- Write ---
    print!("Writing {count} files... ");
    let start = Instant::now();
    for i in 0..count {
        node.upload_file(owner, &format!("bench-{i}"), data.clone())
            .await
            .map_err(|e| anyhow::anyhow!("write failed: {e}"))?;
    }
    let write_dur = start.elapsed();
    let write_mbs = total_bytes as f64 / write_dur.as_secs_f64() / 1_048_576.0;
    println!("{:.2}s ({write_mbs:.1} MB/s)", write_dur.as_secs_f64());

    // --- Read ---
    print!("Reading {count} files... ");
    let start = Instant::now();
    for i in 0..count {
        let _ = node
            .retrieve_file(owner, &format!("bench-{i}"))
            .await
            .map_err(|e| anyhow::anyhow!("read failed: {e}"))?;
    }
    let read_dur = start.elapsed();
    let read_mbs = total_bytes as f64 / read_dur.as_secs_f64() / 1_048_576.0;
    println!("{:.2}s ({read_mbs:.1} MB/s)", read_dur.as_secs_f64());

    println!();
    println!("Summary:");
    println!("  Write throughput: {write_mbs:.1} MB/s");
    println!("  Read throughput:  {read_mbs:.1} MB/s");
    println!(
        "  Total data:       {:.1} MB",
        total_bytes as f64 / 1_048_576.0
    );

    Ok(())
}

/// Generate deterministic test data for benchmarking.
fn generate_bench_data(size: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(size);
    let mut state: u32 = 0xDEAD_BEEF;
    for _ in 0..size {
        state = state.wrapping_mul(1103515245).wrapping_add(12345);
        data.push((state >> 16) as u8);
    }
    data
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_secret_flag_captured() {
        let cli = Cli::try_parse_from(["braidd", "start", "--secret", "my-secret"])
            .expect("CLI should parse with --secret flag");
        match cli.command {
            Commands::Start { secret, .. } => {
                assert_eq!(secret.as_deref(), Some("my-secret"));
            }
            _ => panic!("expected Start command"),
        }
    }

    #[test]
    fn test_cli_memory_flag() {
        let cli = Cli::try_parse_from(["braidd", "start", "--memory"]).unwrap();
        match cli.command {
            Commands::Start { memory, .. } => assert!(memory),
            _ => panic!("expected Start command"),
        }
    }

    #[test]
    fn test_cli_token_subcommand() {
        let cli = Cli::try_parse_from(["braidd", "token", "--owner", "7"]).unwrap();
        match cli.command {
            Commands::Token { owner, ttl_hours } => {
                assert_eq!(owner, 7);
                assert_eq!(ttl_hours, 24);
            }
            _ => panic!("expected Token command"),
        }
    }

    #[test]
    fn test_cli_benchmark_defaults() {
        let cli = Cli::try_parse_from(["braidd", "benchmark"]).unwrap();
        match cli.command {
            Commands::Benchmark { count, size } => {
                assert_eq!(count, 100);
                assert_eq!(size, 10240);
            }
            _ => panic!("expected Benchmark command"),
        }
    }

    #[test]
    fn test_token_requires_secret() {
        let config = CliConfig::default();
        // No secret in config; only fails if the env var is unset too.
        if std::env::var("BRAID_JWT_SECRET").is_err() {
            assert!(cmd_token(&config, 1, 1).is_err());
        }
    }

    #[tokio::test]
    async fn test_benchmark_smoke() {
        let config = CliConfig::default();
        cmd_benchmark(&config, 3, 1024).await.unwrap();
    }

    #[test]
    fn test_bench_data_deterministic() {
        assert_eq!(generate_bench_data(64), generate_bench_data(64));
    }
}
