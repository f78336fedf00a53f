use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use tasas::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for tasas::AppCommand {
    fn from(cmd: Commands) -> tasas::AppCommand {
        match cmd {
            Commands::Serve => tasas::AppCommand::Serve,
            Commands::Update { debug } => tasas::AppCommand::Update { debug },
            Commands::List => tasas::AppCommand::List,
            Commands::Show { id } => tasas::AppCommand::Show { id },
            Commands::Status { probe } => tasas::AppCommand::Status { probe },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Serve the wallet rates HTTP API
    Serve,
    /// Fetch, reconcile and store the rate of every wallet
    Update {
        /// Print every source attempt
        #[arg(long)]
        debug: bool,
    },
    /// List stored wallet rates
    List,
    /// Show one stored wallet rate
    Show { id: String },
    /// Describe the configured sources
    Status {
        /// Run a full update instead of listing sources
        #[arg(long)]
        probe: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => match cli.config_path.as_deref() {
            Some(path) => tasas::cli::setup::setup_at_path(path),
            None => tasas::cli::setup::setup(),
        },
        Some(cmd) => tasas::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
