//! Command-line interface module.
//!
//! This module provides the CLI structure and command handlers for the tollgate binary.

mod ask;
mod commands;
mod status;

pub use ask::{ask, probe};
pub use commands::{Cli, Commands};
pub use status::{show_status, watch};
