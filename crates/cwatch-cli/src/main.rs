mod collect;
mod report;

use clap::{Parser, Subcommand};
use cwatch_core::{SignalCategory, SourceKind};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "cwatch-cli")]
#[command(about = "Competitor signal collection and pattern insights")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Load entities from the YAML config into the database
    Seed,
    /// Toggle collection for one entity
    Entity {
        #[command(subcommand)]
        command: EntityCommands,
    },
    /// Run a recorded collection run over active entities
    Collect {
        /// Restrict collection to one entity (by slug)
        #[arg(long)]
        entity: Option<String>,

        /// Source kinds to collect (comma separated); all kinds when omitted
        #[arg(long, value_delimiter = ',')]
        kind: Vec<SourceKind>,

        /// Preview the units without fetching or writing anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Print cross-entity patterns and recommendations
    Insights {
        /// Emit the full insight document as JSON
        #[arg(long)]
        json: bool,
    },
    /// List recent signals for one entity
    Signals {
        /// Entity slug
        #[arg(long)]
        entity: String,

        /// Restrict to one signal category
        #[arg(long)]
        category: Option<SignalCategory>,

        /// Maximum number of signals to show
        #[arg(long, default_value = "20")]
        limit: i64,
    },
    /// Show recent collection runs, or the units of one run
    Runs {
        /// Show unit results for this run id
        #[arg(long)]
        id: Option<i64>,

        /// Maximum number of runs to show
        #[arg(long, default_value = "10")]
        limit: i64,
    },
}

#[derive(Debug, Subcommand)]
enum EntityCommands {
    /// Include the entity in collection runs
    Enable { slug: String },
    /// Exclude the entity from collection runs until the next seed
    Disable { slug: String },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check database connectivity
    Ping,
    /// Apply pending migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("cwatch-cli: run with --help to list commands");
        return Ok(());
    };

    let config = cwatch_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = cwatch_db::PoolConfig::from_app_config(&config);
    let pool = cwatch_db::connect_pool(&config.database_url, pool_config).await?;

    match command {
        Commands::Db {
            command: DbCommands::Ping,
        } => {
            cwatch_db::health_check(&pool).await?;
            println!("database ok");
        }
        Commands::Db {
            command: DbCommands::Migrate,
        } => {
            cwatch_db::run_migrations(&pool).await?;
            println!("migrations applied");
        }
        Commands::Seed => run_seed(&pool, &config).await?,
        Commands::Entity { command } => {
            let (slug, active) = match command {
                EntityCommands::Enable { slug } => (slug, true),
                EntityCommands::Disable { slug } => (slug, false),
            };
            match cwatch_db::set_entity_active(&pool, &slug, active).await {
                Ok(()) => println!("{slug}: active = {active}"),
                Err(cwatch_db::DbError::NotFound) => {
                    anyhow::bail!("entity '{slug}' not found; run `seed` first")
                }
                Err(e) => return Err(e.into()),
            }
        }
        Commands::Collect {
            entity,
            kind,
            dry_run,
        } => {
            collect::run_collect(&pool, &config, entity.as_deref(), &kind, dry_run).await?;
        }
        Commands::Insights { json } => report::run_insights(&pool, &config, json).await?,
        Commands::Signals {
            entity,
            category,
            limit,
        } => report::run_signals(&pool, &entity, category, limit).await?,
        Commands::Runs { id, limit } => report::run_runs(&pool, id, limit).await?,
    }

    Ok(())
}

/// Upsert every entity in the configured YAML file.
async fn run_seed(pool: &sqlx::PgPool, config: &cwatch_core::AppConfig) -> anyhow::Result<()> {
    let file = cwatch_core::load_entities(&config.entities_path)?;
    let count = cwatch_db::seed_entities(pool, &file.entities).await?;
    println!(
        "seeded {count} entities from {}",
        config.entities_path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests;
