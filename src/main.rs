use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use docsync::client::ChannelClientNotifier;
use docsync::config::ConfigError;
use docsync::{ClientCapabilities, FileChangeDetector, IdentityProcessor, Settings, SyncHost};

#[derive(Parser)]
#[command(name = "docsync")]
#[command(about = "Keep editor project state and generated documents in sync")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration file
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Show current configuration
    Config,

    /// List the project info files and documents found under a directory
    Scan {
        /// Directory to scan (defaults to the current directory)
        root: Option<PathBuf>,
    },

    /// Watch a directory and print outbound notifications as JSON lines
    Watch {
        /// Directory to watch (defaults to the current directory)
        root: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load().unwrap_or_else(|e| {
        eprintln!("Configuration error: {e}");
        eprintln!("Using default configuration for now.");
        Settings::default()
    });
    docsync::logging::init_with_config(&settings.logging);

    match cli.command {
        Commands::Init { force } => init(force),
        Commands::Config => {
            println!("Current Configuration:");
            println!("{}", "=".repeat(50));
            let toml_str =
                toml::to_string_pretty(&settings).context("failed to display configuration")?;
            println!("{toml_str}");
            Ok(())
        }
        Commands::Scan { root } => scan(&settings, resolve_root(root)?).await,
        Commands::Watch { root } => watch(&settings, resolve_root(root)?).await,
    }
}

fn resolve_root(root: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    match root {
        Some(root) => Ok(root),
        None => std::env::current_dir().context("cannot determine current directory"),
    }
}

fn init(force: bool) -> anyhow::Result<()> {
    let root = std::env::current_dir().context("cannot determine current directory")?;
    match Settings::init_config_file(&root, force) {
        Ok(path) => {
            println!("Created configuration file at: {}", path.display());
            println!("Edit this file to customize your settings.");
            Ok(())
        }
        Err(ConfigError::AlreadyExists { path }) => {
            eprintln!("Configuration file already exists at: {}", path.display());
            eprintln!("Use --force to overwrite");
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}

async fn scan(settings: &Settings, root: PathBuf) -> anyhow::Result<()> {
    let detector = FileChangeDetector::builder(&root)
        .config(&settings.watcher)
        .build()?;
    let files = detector
        .scan()
        .await
        .with_context(|| format!("failed to scan {}", root.display()))?;

    for file in &files {
        println!("{}", file.display());
    }
    eprintln!("{} files", files.len());
    Ok(())
}

async fn watch(settings: &Settings, root: PathBuf) -> anyhow::Result<()> {
    let (notifier, mut notifications) = ChannelClientNotifier::new();
    let mut host = SyncHost::new(
        settings,
        Arc::new(notifier),
        Arc::new(ClientCapabilities::all()),
        Arc::new(IdentityProcessor),
    );

    let found = host
        .watch(&root, &settings.watcher)
        .await
        .with_context(|| format!("failed to watch {}", root.display()))?;
    eprintln!("Watching {} ({found} files). Press Ctrl-C to stop.", root.display());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                eprintln!("Shutting down...");
                break;
            }
            Some(notification) = notifications.recv() => {
                println!("{}", serde_json::to_string(&notification)?);
            }
        }
    }

    host.shutdown();
    Ok(())
}
