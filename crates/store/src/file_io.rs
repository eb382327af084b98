//! Resources backing an editor: where document text is read from and
//! written to

use crate::{Result, StoreError};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Persistence collaborator of an editing session.
///
/// Implementations only move raw text; parsing and serialization happen in
/// the session at load and save time.
#[trait_variant::make(Send)]
pub trait Resource: Send + Sync {
    /// Human-readable location of the resource
    fn uri(&self) -> String;

    /// Read the full contents
    async fn read(&self) -> Result<String>;

    /// Replace the full contents
    async fn write(&self, contents: String) -> Result<()>;
}

/// A resource stored in a file on disk
#[derive(Debug, Clone)]
pub struct FileResource {
    path: PathBuf,
}

impl FileResource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Resource for FileResource {
    fn uri(&self) -> String {
        format!("file://{}", self.path.display())
    }

    async fn read(&self) -> Result<String> {
        if !self.path.exists() {
            return Err(StoreError::FileNotFound(self.path.display().to_string()));
        }
        Ok(tokio::fs::read_to_string(&self.path).await?)
    }

    async fn write(&self, contents: String) -> Result<()> {
        tokio::fs::write(&self.path, contents).await?;
        Ok(())
    }
}

/// An in-memory resource, shared between clones
#[derive(Debug, Clone, Default)]
pub struct MemoryResource {
    name: String,
    contents: Arc<Mutex<String>>,
}

impl MemoryResource {
    pub fn new(name: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contents: Arc::new(Mutex::new(contents.into())),
        }
    }

    /// Current contents
    pub fn contents(&self) -> String {
        match self.contents.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Resource for MemoryResource {
    fn uri(&self) -> String {
        format!("memory://{}", self.name)
    }

    async fn read(&self) -> Result<String> {
        Ok(self.contents())
    }

    async fn write(&self, contents: String) -> Result<()> {
        match self.contents.lock() {
            Ok(mut guard) => *guard = contents,
            Err(poisoned) => *poisoned.into_inner() = contents,
        }
        Ok(())
    }
}
