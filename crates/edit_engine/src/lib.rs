//! Edit Engine - Structural mutations and add commands
//!
//! This crate implements the document mutation engine (replace, add child,
//! delete child) over JSON documents, and the add-command table derived
//! from the type schema registry.

mod add_commands;
mod command;
mod error;
mod executor;

pub use add_commands::*;
pub use command::*;
pub use error::*;
pub use executor::*;
