use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use depscan::{Config, DependencyScanner, Ecosystem, ScanSession};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod exit_codes {
    pub const SUCCESS: u8 = 0;
    pub const ERROR: u8 = 1;
}

#[derive(Parser)]
#[command(name = "depscan")]
#[command(
    author,
    version,
    about = "List the dependencies declared by npm and PyPI manifests and lockfiles"
)]
struct Cli {
    /// Increase log verbosity (-v: info, -vv: debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a manifest file or a directory tree
    Scan {
        /// File or directory to scan
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Plain)]
        format: Format,

        /// Do not expand requirements.txt entries through the registry
        #[arg(long)]
        no_transitive: bool,

        /// Milliseconds to wait between registry lookups
        #[arg(long)]
        delay_ms: Option<u64>,
    },

    /// Show or create config file
    Config {
        /// Generate default config file
        #[arg(long)]
        init: bool,

        /// Show config file path
        #[arg(long)]
        path: bool,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Plain,
    Json,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_codes::ERROR)
        }
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("depscan={}", default_level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<u8> {
    match cli.command {
        Commands::Scan {
            path,
            format,
            no_transitive,
            delay_ms,
        } => {
            let mut config = Config::load()?;
            if no_transitive {
                config.expand_transitive = false;
            }
            if let Some(ms) = delay_ms {
                config.lookup_delay_ms = ms;
            }

            let session = run_scan(&path, &config, format == Format::Plain).await?;
            print_session(&session, format)?;
            Ok(exit_codes::SUCCESS)
        }
        Commands::Config { init, path } => {
            handle_config(init, path)?;
            Ok(exit_codes::SUCCESS)
        }
    }
}

async fn run_scan(path: &Path, config: &Config, is_interactive: bool) -> Result<ScanSession> {
    let registry = Arc::new(config.registry()?);
    let scanner = DependencyScanner::new(config, registry);

    let progress = if is_interactive {
        let pb = ProgressBar::new_spinner();
        pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message(format!("Scanning {}...", path.display()));
        Some(pb)
    } else {
        None
    };

    let result = scanner.scan(path).await;

    if let Some(pb) = progress {
        match &result {
            Ok(session) => pb.finish_with_message(format!(
                "Found {} dependencies ({} npm, {} PyPI) in {} files",
                session.len(),
                session.by_ecosystem(Ecosystem::Npm).count(),
                session.by_ecosystem(Ecosystem::PyPI).count(),
                session.files.len()
            )),
            Err(_) => pb.finish_and_clear(),
        }
    }

    Ok(result?)
}

fn print_session(session: &ScanSession, format: Format) -> Result<()> {
    match format {
        Format::Json => {
            println!("{}", serde_json::to_string_pretty(session)?);
        }
        Format::Plain => {
            if session.is_empty() {
                eprintln!("No dependencies found in {}", session.root.display());
            }
            for dep in &session.dependencies {
                println!("{}@{} ({})", dep.name, dep.version, dep.ecosystem);
            }
            for skipped in &session.skipped {
                eprintln!("skipped {}: {}", skipped.path.display(), skipped.reason);
            }
        }
    }
    Ok(())
}

fn handle_config(init: bool, show_path: bool) -> Result<()> {
    let config_path = Config::config_path();

    if show_path {
        println!("{}", config_path.display());
        return Ok(());
    }

    if init {
        if config_path.exists() {
            println!("Config file already exists at: {}", config_path.display());
            return Ok(());
        }

        Config::default().save()?;
        println!("Created config file at: {}", config_path.display());
        println!();
        println!("{}", Config::generate_default_config());
        return Ok(());
    }

    if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)?;
        println!("Config file: {}", config_path.display());
        println!();
        println!("{}", content);
    } else {
        println!("No config file found.");
        println!("Run 'depscan config --init' to create one.");
        println!();
        println!("Default configuration:");
        println!("{}", Config::generate_default_config());
    }

    Ok(())
}
