//! Store - Persistence, autosave, and file I/O
//!
//! This crate handles document serialization, the resources documents are
//! read from and written to, the dirty/autosave state machine, cancellable
//! timers, and editor settings.

pub mod serializer;
mod file_io;
mod autosave;
mod timer;
mod error;
mod settings;

pub use file_io::*;
pub use autosave::*;
pub use timer::*;
pub use error::*;
pub use settings::*;
