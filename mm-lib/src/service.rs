pub mod liquidity;
pub mod telemetry;
pub mod worker_pool;
