use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use dotenv::dotenv;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use toml;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub database_url: String,
    pub db_connection_pool_max_size: usize,
    pub db_connection_pool_idle_size: usize,
}

/// Committee membership and protocol constants shared by every node.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SystemConfig {
    pub members: Vec<String>,
    pub threshold: usize,
    pub genesis_time: DateTime<Utc>,
    pub legacy_version_floor: i64,
}

impl SystemConfig {
    /// Members sorted with duplicates removed.
    pub fn distinct_members(&self) -> Vec<String> {
        let mut members = self.members.clone();
        members.sort();
        members.dedup();
        members
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SyncerConfig {
    pub batch_size: i64,
    pub poll_interval_ms: u64,
    pub backoff_min_ms: u64,
    pub backoff_max_ms: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TelemetryConfig {
    pub enabled: bool,
    pub market_interval_secs: u64,
    pub liquidity_interval_secs: u64,
    pub worker_count: usize,
    pub metrics_file: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    // global
    pub log_level: String,

    pub database: DatabaseConfig,
    pub system: SystemConfig,
    pub syncer: SyncerConfig,
    pub telemetry: TelemetryConfig,
}

impl Config {
    pub fn load_toml() -> Result<Self> {
        dotenv().ok();

        let config_str = fs::read_to_string("config.toml")?;
        let mut config = Self::from_toml_str(&config_str)?;

        if let Ok(database_url) = env::var("DATABASE_URL") {
            config.database.database_url = database_url;
        }

        Ok(config)
    }

    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(config_str).map_err(|e| anyhow!("Failed to parse config: {}", e))?;

        let member_count = config.system.distinct_members().len();
        if config.system.threshold == 0 || config.system.threshold > member_count {
            return Err(anyhow!(
                "Invalid committee threshold {} for {} distinct members",
                config.system.threshold,
                member_count
            ));
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
log_level = "debug"

[database]
database_url = "postgres://localhost/mm"
db_connection_pool_max_size = 8
db_connection_pool_idle_size = 2

[system]
members = ["m1", "m2", "m3", "m4"]
threshold = 3
genesis_time = "2024-01-01T00:00:00Z"
legacy_version_floor = 2

[syncer]
batch_size = 100
poll_interval_ms = 500
backoff_min_ms = 200
backoff_max_ms = 10000

[telemetry]
enabled = true
market_interval_secs = 30
liquidity_interval_secs = 60
worker_count = 4
"#;

    #[test]
    fn parses_all_sections() {
        let config = Config::from_toml_str(SAMPLE).unwrap();

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.system.members.len(), 4);
        assert_eq!(config.system.threshold, 3);
        assert_eq!(config.system.genesis_time.timestamp(), 1_704_067_200);
        assert_eq!(config.syncer.batch_size, 100);
        assert!(config.telemetry.metrics_file.is_none());
    }

    #[test]
    fn rejects_threshold_above_member_count() {
        let broken = SAMPLE.replace("threshold = 3", "threshold = 5");
        assert!(Config::from_toml_str(&broken).is_err());
    }

    #[test]
    fn repeated_members_count_once() {
        let repeated = SAMPLE.replace(
            r#"members = ["m1", "m2", "m3", "m4"]"#,
            r#"members = ["m1", "m2", "m2", "m1"]"#,
        );
        let err = Config::from_toml_str(&repeated).unwrap_err();
        assert!(err.to_string().contains("2 distinct members"));

        let enough = repeated.replace("threshold = 3", "threshold = 2");
        let config = Config::from_toml_str(&enough).unwrap();
        assert_eq!(config.system.distinct_members(), vec!["m1", "m2"]);
    }
}
