use clap::Parser;
use football_sync::cli::commands::{Cli, Commands};
use football_sync::config::{AppConfig, ConfigLoader};
use football_sync::db::Database;
use football_sync::sync::{EntityType, SyncOrchestrator, SyncOutcome, SyncState};
use football_sync::{Error, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose when set
    let default_filter = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| Error::Other(format!("Failed to set tracing subscriber: {}", e)))?;

    info!("Starting football-sync");

    match cli.command {
        Commands::Init { output, force } => {
            handle_init(output.as_deref(), force)?;
        }
        Commands::Sync { watch, force, only } => {
            handle_sync(cli.config.as_deref(), watch, force, &only).await?;
        }
        Commands::Status => {
            handle_status(cli.config.as_deref())?;
        }
        Commands::Players {
            club,
            limit,
            verbose,
        } => {
            handle_players(cli.config.as_deref(), club, limit, verbose)?;
        }
        Commands::Reset { entity } => {
            handle_reset(cli.config.as_deref(), entity)?;
        }
    }

    Ok(())
}

fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let config_path = ConfigLoader::resolve_path(config_path)?;
    ConfigLoader::load_from_file(&config_path)
}

fn open_database(config: &AppConfig) -> Result<Database> {
    let path = config.database_path()?;
    Database::open(&path).map_err(|e| {
        Error::Other(format!(
            "Failed to open database at {}: {}",
            path.display(),
            e
        ))
    })
}

fn handle_init(output: Option<&str>, force: bool) -> Result<()> {
    let output_path = match output {
        Some(path) => std::path::PathBuf::from(path),
        None => {
            ConfigLoader::ensure_config_dir()?;
            ConfigLoader::get_default_config_path()?
        }
    };

    ConfigLoader::write_template(&output_path, force)?;

    println!(
        "✅ Configuration template created at {}",
        output_path.display()
    );
    println!("📝 Please edit the file to add your API token.");

    Ok(())
}

async fn handle_sync(
    config_path: Option<&str>,
    watch: bool,
    force: bool,
    only: &[EntityType],
) -> Result<()> {
    let config = load_config(config_path)?;
    let orchestrator = SyncOrchestrator::new(&config)?;

    println!("💾 Database: {}", config.database_path()?.display());

    if watch {
        println!("🚀 Watch mode: weekly and semi-annual refreshes until Ctrl-C");
        return orchestrator.watch(force).await;
    }

    let selection: Vec<EntityType> = if only.is_empty() {
        EntityType::SYNC_ORDER.to_vec()
    } else {
        only.to_vec()
    };

    println!("🔄 Running one-time sync...");
    let summary = orchestrator.run_entities(&selection, force).await?;

    for (entity, outcome) in &summary.outcomes {
        match outcome {
            SyncOutcome::Synced(report) => println!("  ✅ {}: {}", entity, report),
            SyncOutcome::SkippedFresh => println!("  ⏭️  {}: up to date", entity),
            SyncOutcome::SkippedNoIds => println!("  📭 {}: nothing to fetch", entity),
            SyncOutcome::Failed(message) => println!("  ❌ {}: {}", entity, message),
        }
    }

    let failures: Vec<String> = summary.failures().map(|e| e.to_string()).collect();
    if failures.is_empty() {
        println!("✅ Sync completed successfully!");
        Ok(())
    } else {
        println!("❌ Sync finished with failures");
        Err(Error::Other(format!(
            "Sync failed for: {}",
            failures.join(", ")
        )))
    }
}

fn handle_status(config_path: Option<&str>) -> Result<()> {
    let config = load_config(config_path)?;
    let database = open_database(&config)?;
    let now = chrono::Utc::now();

    println!("📊 Football Sync Status");
    println!("💾 Database: {}", config.database_path()?.display());
    println!();

    for entity in EntityType::SYNC_ORDER {
        let last_synced_at = database
            .status
            .get(entity)?
            .and_then(|record| record.last_synced_at);

        let (icon, state) = match SyncState::evaluate(last_synced_at, now, config.sync.interval()) {
            SyncState::NeverSynced => ("⏳", "never synced".to_string()),
            SyncState::Stale { age } => ("🔄", format!("stale ({} days old)", age.num_days())),
            SyncState::Fresh { age } => ("✅", format!("fresh ({} hours old)", age.num_hours())),
        };

        match last_synced_at {
            Some(at) => println!(
                "  {} {:<10} {} - last synced {}",
                icon,
                entity,
                state,
                at.format("%Y-%m-%d %H:%M:%S UTC")
            ),
            None => println!("  {} {:<10} {}", icon, entity, state),
        }
    }

    println!();
    println!("📦 Collections");
    for (name, count) in database.collection_sizes()? {
        println!("  {:<10} {}", name, count);
    }

    Ok(())
}

fn handle_players(
    config_path: Option<&str>,
    club: Option<i64>,
    limit: usize,
    verbose: bool,
) -> Result<()> {
    let config = load_config(config_path)?;
    let database = open_database(&config)?;

    let mut players = database
        .players
        .find(|player| club.map_or(true, |club| player.club_id == Some(club)))?;
    players.sort_by_key(|player| player.id);

    if players.is_empty() {
        println!("📭 No players found");
        if let Some(club) = club {
            println!("   (filtered by club: {})", club);
        }
        return Ok(());
    }

    println!("⚽ Players ({} total, showing up to {})", players.len(), limit);
    println!();

    for player in players.iter().take(limit) {
        let name = player
            .display_name
            .as_deref()
            .or(player.name.as_deref())
            .or(player.common_name.as_deref())
            .unwrap_or("<unnamed>");

        println!("  👤 {} ({})", name, player.id);
        println!("    Position: {}", player.position_name);
        if let Some(club_id) = player.club_id {
            let club_name = database
                .clubs
                .get(club_id)?
                .map(|stored| stored.name)
                .unwrap_or_else(|| club_id.to_string());
            println!("    Club: {}", club_name);
        }

        if verbose {
            println!("    Detailed Position: {}", player.detailed_position_name);
            if let Some(country) = &player.country_name {
                println!("    Country: {}", country);
            }
            if let Some(stats) = &player.statistics {
                println!(
                    "    Statistics: season {} ({} entries)",
                    stats.season_id,
                    stats.details.len()
                );
                for detail in &stats.details {
                    let label = detail
                        .type_info
                        .as_ref()
                        .map(|info| info.name.as_str())
                        .unwrap_or("Unknown");
                    println!("      {}: {}", label, detail.value);
                }
            }
        }
        println!();
    }

    Ok(())
}

fn handle_reset(config_path: Option<&str>, entity: EntityType) -> Result<()> {
    let config = load_config(config_path)?;
    let database = open_database(&config)?;

    database.status.reset(entity)?;
    database.flush()?;

    println!("🔄 {} will be refreshed on the next sync", entity);
    Ok(())
}
