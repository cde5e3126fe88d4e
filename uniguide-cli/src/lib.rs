//! # uniguide-cli
//!
//! The `uniguide` binary: build the index, inspect retrieval, ask one-off
//! questions, or chat interactively.
//!
//! ```text
//! uniguide index --force
//! uniguide search "NUST NET weightage" -k 3
//! uniguide ask "What is the minimum CGPA for PhD at COMSATS?" --show-sources
//! uniguide chat
//! ```

pub mod chat;
pub mod cli;
pub mod commands;
pub mod logging;

pub use cli::{Cli, Command, EmbedderKind, GlobalArgs, LogFormat};
