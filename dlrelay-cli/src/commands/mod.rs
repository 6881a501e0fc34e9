//! CLI subcommands.

pub mod clean;
pub mod config;
pub mod fetch;
pub mod init;
