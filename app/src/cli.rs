//! Command-line arguments

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "tree-editor",
    about = "Edit typed JSON documents as trees",
    version
)]
pub struct Cli {
    /// Type registry JSON file. Defaults to the built-in Tree/Node/Leaf model.
    #[arg(long, global = true, value_name = "FILE")]
    pub registry: Option<PathBuf>,

    /// Editor settings file.
    #[arg(long, global = true, value_name = "FILE")]
    pub settings: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Write the built-in example document to a new file.
    Init {
        file: PathBuf,
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
    /// Print the document as an indented outline.
    Show {
        file: PathBuf,
    },
    /// List the add commands available for a node.
    Commands {
        file: PathBuf,
        /// Node path such as /children/0.
        #[arg(long, default_value = "/")]
        node: String,
    },
    /// Append a new child and save.
    Add {
        file: PathBuf,
        /// Path of the parent node.
        parent: String,
        /// Collection property of the parent.
        property: String,
        /// Type of the new child.
        child_type: String,
        /// Print the result instead of saving.
        #[arg(long)]
        dry_run: bool,
    },
    /// Delete a node and save.
    Delete {
        file: PathBuf,
        path: String,
        #[arg(long)]
        dry_run: bool,
    },
    /// Replace a node's data as a form edit would, and save.
    Set {
        file: PathBuf,
        path: String,
        /// New node data as JSON.
        data: String,
        #[arg(long)]
        dry_run: bool,
    },
    /// Check a registry file and print its add commands.
    ValidateRegistry,
}
