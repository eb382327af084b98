//! Document Model - JSON documents projected as typed trees
//!
//! This crate provides the type schema registry describing which child
//! types each node type may contain, the JSON document owned by an editing
//! session, and the lazy projection of document positions onto tree nodes.

mod document;
mod error;
mod node;
mod schema;
mod tree;
pub mod example;
pub mod label;

pub use document::*;
pub use error::*;
pub use node::*;
pub use schema::*;
pub use tree::*;
