//! Session - A single editor over one document
//!
//! This crate wires the type registry, tree projection, mutation engine,
//! add-command table, autosave machine, timers, persistence resource and
//! view collaborators into one [`EditorSession`] actor.

mod actor;
mod error;
mod options;
mod session;
mod views;

pub use actor::*;
pub use error::*;
pub use options::*;
pub use session::*;
pub use views::*;
