//! Strata certificate tool.
//!
//! Checks a node's certificate directory before the node is started:
//! - Build the server and client TLS configurations from `--certs-dir`
//! - Inspect the certificates in a PEM file
//! - Show the effective TLS settings

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use strata_security::TlsSettings;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod output;

use output::OutputFormatter;

/// Strata certificate tool
#[derive(Parser)]
#[command(name = "strata-certs")]
#[command(author, version, about = "Validate Strata node TLS material", long_about = None)]
struct Cli {
    /// TLS settings file (TOML); STRATA_TLS_* variables override it
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Certificate directory (overrides certs_dir from settings)
    #[arg(long, global = true, value_name = "DIR")]
    certs_dir: Option<PathBuf>,

    /// Enable JSON output
    #[arg(long, global = true)]
    json: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build TLS configurations from the certificate directory
    Check {
        /// Only build the server configuration
        #[arg(long, conflicts_with = "client_only")]
        server_only: bool,

        /// Only build the client configuration
        #[arg(long)]
        client_only: bool,
    },

    /// Describe every certificate in a PEM file
    Inspect {
        /// PEM file holding one or more certificates
        file: PathBuf,
    },

    /// Show the effective TLS settings
    Settings,
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    let formatter = OutputFormatter::new(!cli.no_color, cli.json);

    let mut settings = match TlsSettings::load(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            formatter.error(&format!("Error: {}", e));
            std::process::exit(2);
        }
    };

    if let Some(dir) = cli.certs_dir {
        settings.certs_dir = Some(dir);
    }
    debug!("Effective TLS settings: {:?}", settings);

    let result = match cli.command {
        Commands::Check {
            server_only,
            client_only,
        } => commands::check::run(&settings, &formatter, !client_only, !server_only),
        Commands::Inspect { file } => commands::inspect::run(&file, &formatter),
        Commands::Settings => commands::settings::show(&settings, &formatter),
    };

    if let Err(e) = result {
        formatter.error(&format!("Error: {:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
