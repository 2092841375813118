//! CLI command implementations.

pub mod config;
pub mod export;
pub mod init;
pub mod process;
pub mod search;
pub mod tiles;
