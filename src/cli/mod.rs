pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::AccessLevel;

#[derive(Parser)]
#[command(name = "gtree")]
#[command(about = "gtree - operator tooling for the genealogy tree store")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Apply pending database migrations")]
    Migrate,

    #[command(about = "Check database connectivity")]
    Health,

    #[command(about = "Set a user's access level on a tree")]
    Grant {
        #[arg(help = "Tree ID")]
        tree: Uuid,
        #[arg(help = "User ID")]
        user: Uuid,
        #[arg(help = "Access level (nothing, viewer, editor, owner)")]
        level: AccessLevel,
    },

    #[command(about = "Check whether a user holds at least a level on a tree")]
    Check {
        #[arg(help = "Tree ID")]
        tree: Uuid,
        #[arg(help = "User ID")]
        user: Uuid,
        #[arg(help = "Minimum access level")]
        level: AccessLevel,
    },

    #[command(about = "List trees a user can access")]
    Trees {
        #[arg(help = "User ID")]
        user: Uuid,
        #[arg(long, default_value = "viewer", help = "Minimum access level")]
        min_level: AccessLevel,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Migrate => commands::database::migrate(output_format).await,
        Commands::Health => commands::database::health(output_format).await,
        Commands::Grant { tree, user, level } => commands::access::grant(tree, user, level, output_format).await,
        Commands::Check { tree, user, level } => commands::access::check(tree, user, level, output_format).await,
        Commands::Trees { user, min_level } => commands::access::trees(user, min_level, output_format).await,
    }
}
