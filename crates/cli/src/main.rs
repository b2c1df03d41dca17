//! learnflow CLI: the main entry point.
//!
//! Commands:
//! - `serve`    Dispatch JSON triggers read from stdin
//! - `trigger`  Run one session start and print the list
//! - `query`    Print the graph query of a stage
//! - `config`   Show, validate or generate configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

use commands::query::QueryStage;

#[derive(Parser)]
#[command(
    name = "learnflow",
    about = "learnflow: learning-content recommendations for work sessions",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (default: ~/.learnflow/config.toml)
    #[arg(short, long, global = true, env = "LEARNFLOW_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Dispatch triggers read from stdin, one JSON object per line
    Serve {
        /// Log lists instead of sending them to the presentation service
        #[arg(long)]
        log_only: bool,
    },

    /// Start a session and print the recommendation list
    Trigger {
        /// Session identifier
        #[arg(short, long)]
        session: String,

        /// Session token (default: actions.default_token)
        #[arg(short, long)]
        token: Option<String>,

        /// Run the secondary-activity branch
        #[arg(long)]
        side: bool,

        /// Log lists instead of sending them to the presentation service
        #[arg(long)]
        log_only: bool,
    },

    /// Print the graph query a stage would send
    Query {
        #[arg(value_enum)]
        stage: QueryStage,

        /// Input identifiers
        ids: Vec<String>,

        /// Role for audience filtering
        #[arg(short, long)]
        role: Option<String>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the loaded configuration
    Show,
    /// Load and validate the configuration
    Validate,
    /// Print a default configuration file
    Default,
    /// Print the default configuration path
    Path,
}

fn init_tracing(verbose: bool, json: bool) {
    let filter = if verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Commands that need no configuration
    if let Commands::Config { action } = &cli.command {
        match action {
            ConfigAction::Default => return commands::config_cmd::default().await,
            ConfigAction::Path => return commands::config_cmd::path().await,
            _ => {}
        }
    }

    let config_path = commands::config_path(cli.config.as_deref());
    let config = commands::load_config(Some(&config_path))?;
    init_tracing(cli.verbose, config.log_format == "json");
    commands::log_config_source(&config_path);

    match cli.command {
        Commands::Serve { log_only } => commands::serve::run(config, log_only).await?,
        Commands::Trigger {
            session,
            token,
            side,
            log_only,
        } => commands::trigger::run(config, session, token, side, log_only).await?,
        Commands::Query { stage, ids, role } => {
            commands::query::run(config, stage, ids, role).await?
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show(&config).await?,
            ConfigAction::Validate => commands::config_cmd::validate(&config).await?,
            ConfigAction::Default | ConfigAction::Path => {}
        },
    }

    Ok(())
}
