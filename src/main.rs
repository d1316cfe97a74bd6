use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use untis_watcher::config::{Config, ConfigOverrides};
use untis_watcher::output::{render_changes_table, render_json, render_snapshot_table};
use untis_watcher::source::build_source;
use untis_watcher::timetable::{diff, Snapshot, SnapshotStore};
use untis_watcher::watch::{fetch_snapshot, run_watch_loop};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "untis-watcher", about = "Timetable change watcher and notifier")]
struct Cli {
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(long)]
    server: Option<String>,
    #[arg(long)]
    school: Option<String>,
    #[arg(long)]
    variant: Option<String>,
    #[arg(long = "days-ahead")]
    days_ahead: Option<u32>,
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch the current timetable window and print it.
    Fetch,
    /// Fetch the current timetable and show what changed against the
    /// persisted snapshot (or a given baseline file).
    Diff {
        #[arg(long)]
        baseline: Option<PathBuf>,
    },
    /// Poll the schedule provider and notify on every detected change.
    Watch {
        #[arg(long)]
        interval_secs: Option<u64>,
        /// Number of polling cycles; 0 runs until interrupted.
        #[arg(long, default_value_t = 0)]
        iterations: u32,
    },
    Config {
        #[arg(long)]
        init: bool,
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load(Some(&config_path))?;
    config.apply_overrides(ConfigOverrides {
        server: cli.server.clone(),
        school: cli.school.clone(),
        variant: cli.variant.clone(),
        days_ahead: cli.days_ahead,
    });

    if let Commands::Config { init, show } = &cli.command {
        if *init {
            Config::write_template(&config_path)?;
            println!("Wrote config template to {}", config_path.display());
        }
        if *show || !*init {
            println!("{}", render_json(&config)?);
        }
        return Ok(());
    }

    let source = build_source(&config.source)?;
    let store = SnapshotStore::new(config.resolved_snapshot_path());

    match &cli.command {
        Commands::Fetch => {
            let snapshot = fetch_snapshot(source.as_ref(), &config).await?;
            print_snapshot(&snapshot, cli.output)?;
        }
        Commands::Diff { baseline } => {
            let previous = match baseline {
                Some(path) => SnapshotStore::new(path.clone())
                    .load()?
                    .with_context(|| format!("no baseline snapshot at {}", path.display()))?,
                None => store.load()?.unwrap_or_default(),
            };
            let current = fetch_snapshot(source.as_ref(), &config).await?;
            let changes = diff(&previous, &current);
            match cli.output {
                OutputFormat::Table => println!("{}", render_changes_table(&changes)),
                OutputFormat::Json => println!("{}", render_json(&changes)?),
            }
        }
        Commands::Watch {
            interval_secs,
            iterations,
        } => {
            run_watch_loop(source, &store, &config, *interval_secs, *iterations).await?;
        }
        Commands::Config { .. } => unreachable!("config command handled before dispatch"),
    }

    Ok(())
}

fn print_snapshot(snapshot: &Snapshot, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", render_snapshot_table(snapshot)),
        OutputFormat::Json => println!("{}", render_json(snapshot)?),
    }
    Ok(())
}
