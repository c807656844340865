use mm_lib::{
    config::Config,
    decoder::Decoder,
    handler::Processor,
    oracle::{DisabledOracle, PriceOracle},
    service::{liquidity::LiquidityService, telemetry::Telemetry, worker_pool::WorkerPool},
    store::{postgres::Repositories, PgStore, Store},
    syncer::{EventSource, Syncer},
    types::System,
    utils,
};

use db::{establish_connection_pool, run_migrations};

use anyhow::Result;
use futures::future;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Arc::new(Config::load_toml()?);

    let log_level = utils::convert_log_level_to_tracing_level(&config.log_level);
    let filter = EnvFilter::from_default_env().add_directive(log_level.into());

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .try_init()?;

    warn!("Starting server...");

    // connect database

    let db_conn = establish_connection_pool(
        &config.database.database_url,
        config.database.db_connection_pool_max_size,
        config.database.db_connection_pool_idle_size,
    )?;
    warn!("Connected to database {}", &config.database.database_url);

    // run db migrations
    run_migrations(&db_conn)?;
    warn!("Database migrations completed");

    // store over the db repositories
    let pg_store = Arc::new(PgStore::new(db_conn.clone(), Repositories::new(&db_conn)));
    let store: Arc<dyn Store> = pg_store.clone();
    let source: Arc<dyn EventSource> = pg_store;

    let system = Arc::new(System::new(&config.system));
    warn!(
        "Committee of {} members, threshold {}, protocol version {}",
        system.members.len(),
        system.threshold,
        store.protocol_version()?
    );

    let worker_pool = Arc::new(WorkerPool::new(config.telemetry.worker_count)?);

    // no attestation verifier is configured yet; governance prices still apply
    let oracle: Arc<dyn PriceOracle> = Arc::new(DisabledOracle);

    let processor = Arc::new(
        Processor::new(
            Arc::clone(&system),
            Arc::clone(&store),
            Decoder::new(system.legacy_version_floor, None),
            oracle,
        )
        .with_worker_pool(Arc::clone(&worker_pool)),
    );

    let syncer = Arc::new(Syncer::new(
        config.syncer.clone(),
        source,
        Arc::clone(&store),
        Arc::clone(&processor),
    ));

    // telemetry tasks
    let telemetry_task = if config.telemetry.enabled {
        let liquidity_service = Arc::new(LiquidityService::new(
            Arc::clone(&system),
            Arc::clone(&store),
            Arc::clone(&worker_pool),
        ));

        let telemetry = Arc::new(Telemetry::new(
            config.telemetry.clone(),
            Arc::clone(&store),
            liquidity_service,
            syncer.last_output_id(),
        )?);

        let markets = Arc::clone(&telemetry);
        tokio::spawn(async move {
            tokio::join!(markets.run_markets(), telemetry.run_liquidity());
        })
    } else {
        tokio::spawn(async {
            future::pending::<()>().await;
        })
    };

    let syncer_task = {
        let syncer = Arc::clone(&syncer);
        tokio::spawn(async move {
            syncer.run().await;
        })
    };

    // running all tasks concurrently
    tokio::select! {
        result = syncer_task => {
            if let Err(e) = result {
                error!("Syncer task failed: {:?}", e);
            }
        }

        result = telemetry_task => {
            if let Err(e) = result {
                error!("Telemetry task failed: {:?}", e);
            }
            info!("Telemetry task completed");
        }

        _ = tokio::signal::ctrl_c() => {
            warn!("Received Ctrl+C signal, shutting down...");
        }
    }

    Ok(())
}
