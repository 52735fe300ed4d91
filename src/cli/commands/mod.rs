//! CLI command implementations

pub mod utils;

pub mod alias;
pub mod cache;
pub mod completions;
pub mod config;
pub mod init;
pub mod resolve;
