//! CLI command handlers
//!
//! Each subcommand lives in its own module and returns `anyhow::Result`.

pub mod batch;
pub mod classify;
pub mod detect;
pub mod helpers;
pub mod score;
pub mod train;
