use crate::constant::{ASSET_DECIMALS, STATE_DECIMALS};

use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use std::hash::Hasher;
use std::str::FromStr;
use tracing::Level;
use twox_hash::XxHash64;

pub fn convert_log_level_to_tracing_level(log_level: &str) -> Level {
    match log_level.to_lowercase().as_str() {
        "error" => Level::ERROR,
        "warn" => Level::WARN,
        "info" => Level::INFO,
        "debug" => Level::DEBUG,
        "trace" => Level::TRACE,
        _ => Level::INFO, // Default to INFO if the log level is not recognized
    }
}

pub fn truncate(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::ToZero)
}

pub fn ceil(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::ToPositiveInfinity)
}

/// Truncates to state precision (16 fractional digits).
pub fn trunc16(value: Decimal) -> Decimal {
    truncate(value, STATE_DECIMALS)
}

/// Rounds up to state precision (16 fractional digits).
pub fn ceil16(value: Decimal) -> Decimal {
    ceil(value, STATE_DECIMALS)
}

/// Truncates to asset precision (8 fractional digits).
pub fn trunc8(value: Decimal) -> Decimal {
    truncate(value, ASSET_DECIMALS)
}

pub fn parse_decimal(value: &str) -> Result<Decimal> {
    Decimal::from_str(value).map_err(|e| anyhow!("Failed to parse decimal {}: {}", value, e))
}

/// Canonical textual form used for persistence, without trailing zeros.
pub fn format_decimal(value: Decimal) -> String {
    value.normalize().to_string()
}

pub fn naive_to_utc(naive: NaiveDateTime) -> DateTime<Utc> {
    naive.and_utc()
}

/// Derives a deterministic trace id from a source trace id and a purpose, so
/// every committee member names the same outbound transfer identically.
pub fn derive_trace_id(trace_id: &str, purpose: &str) -> String {
    let high = hash_with_seed(0x6d6d_7472_6163_6531, trace_id, purpose);
    let low = hash_with_seed(0x6d6d_7472_6163_6532, trace_id, purpose);

    let hex = format!("{:016x}{:016x}", high, low);
    format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}

fn hash_with_seed(seed: u64, trace_id: &str, purpose: &str) -> u64 {
    let mut hasher = XxHash64::with_seed(seed);
    hasher.write(trace_id.as_bytes());
    hasher.write(&[0u8]);
    hasher.write(purpose.as_bytes());
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn truncate_and_ceil_follow_sign() {
        assert_eq!(trunc8(dec("1.123456789")), dec("1.12345678"));
        assert_eq!(trunc8(dec("-1.123456789")), dec("-1.12345678"));
        assert_eq!(ceil16(dec("0.00000000000000001")), dec("0.0000000000000001"));
        assert_eq!(ceil16(dec("2.5")), dec("2.5"));
        assert_eq!(trunc16(dec("0.33333333333333333333")), dec("0.3333333333333333"));
    }

    #[test]
    fn format_decimal_drops_trailing_zeros() {
        assert_eq!(format_decimal(dec("1.50000000")), "1.5");
        assert_eq!(format_decimal(dec("0.00000000")), "0");
    }

    #[test]
    fn derived_trace_ids_are_stable_and_purpose_scoped() {
        let trace = "c6d0c728-2624-429b-8e0d-d9d19b6592fa";
        let refund = derive_trace_id(trace, "refund");

        assert_eq!(refund, derive_trace_id(trace, "refund"));
        assert_ne!(refund, derive_trace_id(trace, "return"));
        assert_eq!(refund.len(), 36);
        assert_eq!(refund.matches('-').count(), 4);
    }

    #[test]
    fn unknown_log_level_defaults_to_info() {
        assert_eq!(convert_log_level_to_tracing_level("WARN"), Level::WARN);
        assert_eq!(convert_log_level_to_tracing_level("verbose"), Level::INFO);
    }
}
