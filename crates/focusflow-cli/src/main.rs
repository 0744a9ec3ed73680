use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "focusflow-cli", version, about = "FocusFlow CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Daily step log
    Steps {
        #[command(subcommand)]
        action: commands::steps::StepsAction,
    },
    /// Activity bonus and unlock sessions
    Bonus {
        #[command(subcommand)]
        action: commands::bonus::BonusAction,
    },
    /// Screen-time allowance earned from steps
    Reward {
        /// Step count to evaluate (defaults to today's logged steps)
        #[arg(long)]
        steps: Option<u64>,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Steps { action } => commands::steps::run(action),
        Commands::Bonus { action } => commands::bonus::run(action).await,
        Commands::Reward { steps } => commands::reward::run(steps),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
