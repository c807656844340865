pub mod allow_list;
pub mod borrow;
pub mod market;
pub mod oracle_signer;
pub mod output;
pub mod property;
pub mod proposal;
pub mod supply;
pub mod transaction;
pub mod transfer;
