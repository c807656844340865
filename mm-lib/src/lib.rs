pub mod config;
pub mod constant;
pub mod decoder;
pub mod engine;
pub mod error;
pub mod handler;
pub mod operation;
pub mod oracle;
pub mod service;
pub mod store;
pub mod syncer;
pub mod types;
pub mod utils;
