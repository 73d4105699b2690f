use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use dtw_cli::cli::{commands, init_logging, print_json, CliConfig};

#[derive(Parser)]
#[command(name = "dtw-cli")]
#[command(about = "Inspect and exercise the dtw feed core")]
struct Cli {
    /// Pretty-print JSON output
    #[arg(long, short)]
    pretty: bool,

    /// Path to JSON config file (dataDir, cacheSlot, moderation)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Directory holding the tweet cache, overrides the config file
    #[arg(long, short = 'd')]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pack a username, categories and email into a profile handle
    EncodeHandle {
        username: String,
        /// Category key (can be specified multiple times)
        #[arg(long, short = 'k')]
        category: Vec<String>,
        #[arg(long, short = 'e', default_value = "")]
        email: String,
    },

    /// Split a stored profile handle into its parts
    DecodeHandle { raw: String },

    /// List the known categories
    Categories,

    /// Show the cached feed
    Cache {
        /// Only authors in any of these categories (can be specified multiple times)
        #[arg(long, short = 'k')]
        category: Vec<String>,
    },

    /// Check an account creation form
    ValidateProfile {
        #[arg(long)]
        display_name: String,
        #[arg(long)]
        username: String,
        #[arg(long, short = 'k')]
        category: Vec<String>,
        #[arg(long, short = 'e')]
        email: String,
    },

    /// Ask the configured moderation service about a message
    Moderate { text: String },

    /// Run a full session against an in-memory ledger
    Demo {
        #[arg(long, short = 'm', default_value = "Wired up a new circuit board today")]
        message: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging() {
        eprintln!("Warning: {}", e);
    }

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let file_config = match cli.config {
        Some(ref path) => CliConfig::load(path)?,
        None => CliConfig::default(),
    };
    let config = file_config.into_core(cli.data_dir)?;

    let output = match cli.command {
        Commands::EncodeHandle {
            username,
            category,
            email,
        } => commands::encode_handle(&username, &category, &email),
        Commands::DecodeHandle { raw } => commands::decode_handle(&raw)?,
        Commands::Categories => commands::list_categories(),
        Commands::Cache { category } => commands::show_cache(&config, &category)?,
        Commands::ValidateProfile {
            display_name,
            username,
            category,
            email,
        } => commands::validate_profile(&display_name, &username, &category, &email),
        Commands::Moderate { text } => commands::moderate(&config, &text).await?,
        Commands::Demo { message } => commands::demo(&config, &message).await?,
    };

    print_json(&output, cli.pretty)
}
