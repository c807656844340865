use db::{establish_connection_pool, run_migrations};
use mm_lib::{
    config::Config,
    decoder::Decoder,
    service::{liquidity::LiquidityService, worker_pool::WorkerPool},
    store::{postgres::Repositories, PgStore, Store},
    types::System,
    utils,
};

mod account_cmd;
mod market_cmd;
mod memo_cmd;
mod system_cmd;

use account_cmd::AccountCommands;
use market_cmd::MarketCommands;
use memo_cmd::MemoCommands;
use system_cmd::SystemCommands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "mm-cli")]
#[command(about = "Money market node CLI")]
#[command(version = "1.0.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Inspect markets")]
    Market {
        #[command(subcommand)]
        command: MarketCommands,
    },

    #[command(about = "Inspect account liquidity")]
    Account {
        #[command(subcommand)]
        command: AccountCommands,
    },

    #[command(about = "Encode or decode payment memos")]
    Memo {
        #[command(subcommand)]
        command: MemoCommands,
    },

    #[command(about = "Inspect or adjust node state")]
    System {
        #[command(subcommand)]
        command: SystemCommands,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Arc::new(Config::load_toml()?);

    let log_level = utils::convert_log_level_to_tracing_level(&config.log_level);
    let filter = EnvFilter::from_default_env().add_directive(log_level.into());

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .try_init()?;

    let args = Cli::parse();
    match args.command {
        Commands::Memo { command } => {
            let decoder = Decoder::new(config.system.legacy_version_floor, None);
            memo_cmd::handle(&decoder, command)?;
        }
        Commands::Market { command } => {
            let store = connect_store(&config)?;

            info!("Running market command");
            market_cmd::handle(store, command)?;
        }
        Commands::Account { command } => {
            let store = connect_store(&config)?;
            let system = Arc::new(System::new(&config.system));
            let worker_pool = Arc::new(WorkerPool::new(config.telemetry.worker_count)?);
            let liquidity_service = Arc::new(LiquidityService::new(system, store, worker_pool));

            info!("Running account command");
            account_cmd::handle(liquidity_service, command)?;
        }
        Commands::System { command } => {
            let store = connect_store(&config)?;

            info!("Running system command");
            system_cmd::handle(store, command)?;
        }
    }

    Ok(())
}

fn connect_store(config: &Config) -> Result<Arc<dyn Store>> {
    warn!("Starting mm-cli...");

    let db_conn = establish_connection_pool(
        &config.database.database_url,
        config.database.db_connection_pool_max_size,
        config.database.db_connection_pool_idle_size,
    )?;
    warn!("Connected to database {}", &config.database.database_url);

    run_migrations(&db_conn)?;
    warn!("Database migrations completed");

    let store: Arc<dyn Store> =
        Arc::new(PgStore::new(db_conn.clone(), Repositories::new(&db_conn)));
    Ok(store)
}
