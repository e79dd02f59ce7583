//! Top-level subcommands.

pub mod extract;
pub mod serve;
