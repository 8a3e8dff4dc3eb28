use crate::sync::EntityType;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "football-sync")]
#[command(about = "Football reference data sync tool for a paginated sports API")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(
        short,
        long,
        help = "Path to configuration file (defaults to user config dir)"
    )]
    pub config: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize configuration file
    Init {
        #[arg(
            short,
            long,
            help = "Output path for config file (defaults to user config dir)"
        )]
        output: Option<String>,

        #[arg(short, long, help = "Force overwrite existing config")]
        force: bool,
    },

    /// Run sync operation
    Sync {
        #[arg(short, long, help = "Keep running and refresh on the weekly/semi-annual triggers")]
        watch: bool,

        #[arg(short, long, help = "Ignore last-synced timestamps and refresh everything selected")]
        force: bool,

        #[arg(
            long,
            value_enum,
            num_args = 1..,
            help = "Only sync these entity types (dependency order is still enforced)"
        )]
        only: Vec<EntityType>,
    },

    /// Show per-entity sync status and collection sizes
    Status,

    /// List synchronized players in the local database
    Players {
        #[arg(long, help = "Only show players currently at this club id")]
        club: Option<i64>,

        #[arg(short, long, default_value_t = 50, help = "Maximum number of players to show")]
        limit: usize,

        #[arg(short, long, help = "Show detailed information for each player")]
        verbose: bool,
    },

    /// Clear an entity type's last-synced timestamp so the next run refreshes it
    Reset {
        #[arg(value_enum)]
        entity: EntityType,
    },
}
