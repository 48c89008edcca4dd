//! certpath CLI: drive a learner's training pathway from the terminal.

use std::path::PathBuf;
use std::process;

use clap::{ArgGroup, Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "certpath", version, about = "Training pathway progression and XP ledger")]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Learner id (defaults to `default_user` from the config)
    #[arg(long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create starter config and example catalog
    Init,

    /// Validate a pathway catalog
    Validate {
        /// Catalog TOML file (defaults to the configured catalog)
        #[arg(long)]
        catalog: Option<PathBuf>,
    },

    /// Show modules, balance and tier
    Status {
        /// Number of recent transactions to list
        #[arg(long, default_value = "10")]
        history: usize,

        /// Print the stored snapshot as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check whether a module can be opened
    Interact {
        #[arg(long)]
        module: String,
    },

    /// Complete a trophy or generic module
    Claim {
        #[arg(long)]
        module: String,
    },

    /// Take a quiz with the given answers
    Quiz {
        #[arg(long)]
        module: String,

        /// Zero-based option per question (e.g. "0,2,1")
        #[arg(long)]
        answers: String,
    },

    /// Watch a video module until it completes
    Watch {
        #[arg(long)]
        module: String,
    },

    /// Post earned XP
    Earn {
        #[arg(long)]
        amount: u64,

        #[arg(long, default_value = "Bonus")]
        category: String,

        #[arg(long, default_value = "")]
        description: String,

        /// Hold the amount for verification instead of crediting it
        #[arg(long)]
        pending: bool,
    },

    /// Spend XP from the balance
    Spend {
        #[arg(long)]
        amount: u64,

        #[arg(long, default_value = "Reward")]
        category: String,

        #[arg(long, default_value = "")]
        description: String,
    },

    /// Approve or reject a pending transaction
    #[command(group(ArgGroup::new("decision").required(true).args(["approve", "reject"])))]
    Resolve {
        /// Transaction id
        #[arg(long)]
        id: String,

        #[arg(long)]
        approve: bool,

        #[arg(long)]
        reject: bool,
    },

    /// Toggle the administrative override
    #[command(group(ArgGroup::new("state").required(true).args(["on", "off"])))]
    Override {
        #[arg(long)]
        on: bool,

        #[arg(long)]
        off: bool,
    },

    /// Manage learner feedback
    Feedback {
        #[command(subcommand)]
        action: FeedbackAction,
    },
}

#[derive(Subcommand)]
enum FeedbackAction {
    /// Submit feedback
    Add {
        #[arg(long, default_value = "General")]
        category: String,

        #[arg(long)]
        message: String,
    },

    /// List feedback
    List {
        /// open, reviewed or resolved
        #[arg(long)]
        status: Option<String>,

        #[arg(long)]
        category: Option<String>,

        /// Only flagged records
        #[arg(long)]
        flagged: bool,
    },

    /// Change a record's moderation status
    SetStatus {
        #[arg(long)]
        id: String,

        /// open, reviewed or resolved
        #[arg(long)]
        status: String,
    },

    /// Flag a record for attention
    Flag {
        #[arg(long)]
        id: String,

        /// Remove the flag instead
        #[arg(long)]
        clear: bool,
    },

    /// Delete a record
    Remove {
        #[arg(long)]
        id: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("certpath=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let ctx = commands::Context {
        config_path: cli.config,
        user: cli.user,
    };

    let result = match cli.command {
        Commands::Init => commands::init::execute(),
        Commands::Validate { catalog } => commands::validate::execute(&ctx, catalog),
        Commands::Status { history, json } => {
            commands::status::execute(&ctx, history, json).await
        }
        Commands::Interact { module } => commands::progress::interact(&ctx, &module).await,
        Commands::Claim { module } => commands::progress::claim(&ctx, &module).await,
        Commands::Quiz { module, answers } => {
            commands::quiz::execute(&ctx, &module, &answers).await
        }
        Commands::Watch { module } => commands::watch::execute(&ctx, &module).await,
        Commands::Earn {
            amount,
            category,
            description,
            pending,
        } => commands::ledger::earn(&ctx, amount, &category, &description, pending).await,
        Commands::Spend {
            amount,
            category,
            description,
        } => commands::ledger::spend(&ctx, amount, &category, &description).await,
        Commands::Resolve { id, approve, .. } => {
            commands::ledger::resolve(&ctx, &id, approve).await
        }
        Commands::Override { on, .. } => commands::progress::set_override(&ctx, on).await,
        Commands::Feedback { action } => match action {
            FeedbackAction::Add { category, message } => {
                commands::feedback::add(&ctx, &category, &message).await
            }
            FeedbackAction::List {
                status,
                category,
                flagged,
            } => commands::feedback::list(&ctx, status, category, flagged).await,
            FeedbackAction::SetStatus { id, status } => {
                commands::feedback::set_status(&ctx, &id, &status).await
            }
            FeedbackAction::Flag { id, clear } => {
                commands::feedback::flag(&ctx, &id, !clear).await
            }
            FeedbackAction::Remove { id } => commands::feedback::remove(&ctx, &id).await,
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
