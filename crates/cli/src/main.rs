//! Luna Botanicals CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! luna-cli migrate
//!
//! # Create or promote an operator account
//! luna-cli operator create -e fulfillment@lunabotanicals.co.ke -n "Grace" -r fulfillment
//!
//! # Seed sample promo codes
//! luna-cli seed
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "luna-cli")]
#[command(author, version, about = "Luna Botanicals CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage operator accounts
    Operator {
        #[command(subcommand)]
        action: OperatorAction,
    },
    /// Seed sample promo codes
    Seed,
}

#[derive(Subcommand)]
enum OperatorAction {
    /// Create a user with a back-office role, or promote an existing one
    Create {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Role (`admin`, `sales`, `fulfillment`, `digital_marketer`, `influencer`)
        #[arg(short, long, default_value = "admin")]
        role: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Operator { action } => match action {
            OperatorAction::Create { email, name, role } => {
                commands::operator::create(&email, &name, &role).await?;
            }
        },
        Commands::Seed => commands::seed::run().await?,
    }
    Ok(())
}
