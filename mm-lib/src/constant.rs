pub const SECONDS_PER_BLOCK: i64 = 15;
pub const BLOCKS_PER_YEAR: i64 = 2_102_400;

/// Fractional digits kept for rates, indices and internal amounts.
pub const STATE_DECIMALS: u32 = 16;
/// Fractional digits of ledger assets: ctoken quantities and transfer amounts.
pub const ASSET_DECIMALS: u32 = 8;

/// Highest protocol version this build knows how to migrate to.
pub const SUPPORTED_VERSION: i64 = 3;
pub const DEFAULT_VERSION: i64 = 1;

// property keys
pub const PROPERTY_SYSTEM_VERSION: &str = "system.version";
pub const PROPERTY_OUTPUTS_CHECKPOINT: &str = "outputs.checkpoint";

// transfer purposes, mixed into derived trace ids
pub const PURPOSE_REFUND: &str = "refund";
pub const PURPOSE_RETURN: &str = "return";
pub const PURPOSE_CHANGE: &str = "change";
pub const PURPOSE_CTOKEN: &str = "ctoken";
pub const PURPOSE_BORROW: &str = "borrow";
pub const PURPOSE_REDEEM: &str = "redeem";
pub const PURPOSE_UNPLEDGE: &str = "unpledge";
pub const PURPOSE_SEIZE: &str = "seize";
pub const PURPOSE_WITHDRAW: &str = "withdraw";

// wire tags
pub const ENVELOPE_TAG_PLAIN: u8 = 0x02;
pub const ENVELOPE_TAG_SEALED: u8 = 0x03;

pub const MARKET_STATUS_OPEN: i32 = 1;
pub const MARKET_STATUS_CLOSED: i32 = 2;

pub const TRANSACTION_STATUS_SUCCESS: i32 = 1;
pub const TRANSACTION_STATUS_REJECTED: i32 = 2;
