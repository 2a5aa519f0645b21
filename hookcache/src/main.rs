use std::path::PathBuf;
use clap::{Parser, Subcommand};
use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hookcache::{load_batch, Settings};
use hookcache_core::{CommandCategory, CommandManager, CommandSpec, ManagerConfig, ResultEnvelope};

#[derive(Parser)]
#[command(name = "hookcache")]
#[command(about = "Caching, rate-limited front for command-line tools", long_about = None)]
struct Cli {
    /// Working directory commands run in
    #[arg(short, long)]
    workdir: Option<PathBuf>,

    /// Program every command is passed to (default: git)
    #[arg(short, long)]
    program: Option<String>,

    /// Maximum number of processes running at once
    #[arg(short = 'j', long)]
    concurrency: Option<usize>,

    /// Settings file (default: <config dir>/hookcache/config.yaml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one command, optionally several times to show caching
    Run {
        /// Command category (status, diff, log, branch, remote, show, config, other)
        category: CommandCategory,

        /// Cache TTL in seconds (0 disables caching)
        #[arg(long)]
        ttl: Option<u64>,

        /// Retries after a failed attempt
        #[arg(long)]
        retries: Option<u32>,

        /// Per-attempt timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Number of times to execute
        #[arg(long, default_value = "1")]
        repeat: u32,

        /// Arguments passed to the program
        #[arg(last = true, required = true)]
        args: Vec<String>,
    },

    /// Run every command in a YAML batch file concurrently
    Batch {
        /// Batch file path
        file: PathBuf,

        /// Print statistics after the batch
        #[arg(long)]
        stats: bool,
    },

    /// List command categories and their default TTLs
    Categories,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging; stdout is reserved for results
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "hookcache=info,hookcache_core=info".into())
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    if let Commands::Categories = cli.command {
        println!("{:<10} {:>8}", "CATEGORY", "TTL");
        for category in CommandCategory::ALL {
            println!("{:<10} {:>7}s", category, category.default_ttl_seconds());
        }
        return Ok(());
    }

    let manager = CommandManager::new(build_config(&cli)?)?;
    let outcome = dispatch(&manager, cli.command).await;
    manager.shutdown().await;

    if !outcome? {
        std::process::exit(1);
    }
    Ok(())
}

/// Environment, then settings file, then command-line flags
fn build_config(cli: &Cli) -> Result<ManagerConfig> {
    let base = ManagerConfig::from_env()?;
    let settings = Settings::load(cli.config.as_deref())?;
    let mut config = settings.apply(base);

    if let Some(dir) = &cli.workdir {
        config.context.working_dir = Some(dir.clone());
    }
    if let Some(program) = &cli.program {
        config.program = program.clone();
    }
    if let Some(n) = cli.concurrency {
        config.max_concurrency = n;
    }

    tracing::debug!("Using configuration: {:?}", config);
    Ok(config)
}

/// Returns whether every executed command succeeded
async fn dispatch(manager: &CommandManager, command: Commands) -> Result<bool> {
    match command {
        Commands::Run { category, ttl, retries, timeout, repeat, args } => {
            let mut spec = CommandSpec::new(category, args);
            if let Some(ttl) = ttl {
                spec = spec.with_ttl(ttl);
            }
            if let Some(retries) = retries {
                spec = spec.with_retries(retries);
            }
            if let Some(timeout) = timeout {
                spec = spec.with_timeout(timeout);
            }

            let mut all_ok = true;
            for _ in 0..repeat.max(1) {
                let result = manager.execute(spec.clone()).await;
                all_ok &= result.success;
                print_result(&result)?;
            }
            Ok(all_ok)
        }

        Commands::Batch { file, stats } => {
            let specs = load_batch(&file)?;
            tracing::info!("Running {} commands from {:?}", specs.len(), file);

            let results = manager.execute_parallel(specs).await;
            let all_ok = results.iter().all(|r| r.success);
            println!(
                "{}",
                serde_json::to_string_pretty(&results).context("Failed to serialize results")?
            );

            if stats {
                eprintln!("{}", manager.statistics().await);
            }
            Ok(all_ok)
        }

        Commands::Categories => Ok(true),
    }
}

fn print_result(result: &ResultEnvelope) -> Result<()> {
    let json = serde_json::to_string_pretty(result).context("Failed to serialize result")?;
    println!("{}", json);
    Ok(())
}
