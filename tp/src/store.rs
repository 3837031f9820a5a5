//! Form-state persistence
//!
//! The last submitted trip form is kept so an interrupted session can be
//! picked up again: loaded at start, saved on every submission, cleared once
//! a booking succeeds.

use eyre::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::domain::TripDetails;

/// Key/value port for the trip form
pub trait FormStore: Send {
    /// Last saved form, if any
    fn load(&self) -> Result<Option<TripDetails>>;

    /// Replace the saved form
    fn save(&mut self, details: &TripDetails) -> Result<()>;

    /// Forget the saved form
    fn clear(&mut self) -> Result<()>;
}

/// Form state kept as a JSON file
pub struct FileFormStore {
    path: PathBuf,
}

impl FileFormStore {
    /// Store backed by the file at `path`; the file is created on first save
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        debug!(?path, "FileFormStore::new: called");
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FormStore for FileFormStore {
    fn load(&self) -> Result<Option<TripDetails>> {
        if !self.path.exists() {
            debug!(path = ?self.path, "load: no saved form");
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path).context("Failed to read form state")?;
        let details = serde_json::from_str(&content).context("Failed to parse form state")?;
        Ok(Some(details))
    }

    fn save(&mut self, details: &TripDetails) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).context("Failed to create form state directory")?;
        }
        let content = serde_json::to_string_pretty(details)?;
        fs::write(&self.path, content).context("Failed to write form state")?;
        debug!(path = ?self.path, "save: form state written");
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path).context("Failed to remove form state")?;
            info!(path = ?self.path, "clear: form state removed");
        }
        Ok(())
    }
}

/// In-process form state, for tests and one-shot runs
#[derive(Debug, Default)]
pub struct MemoryFormStore {
    details: Option<TripDetails>,
}

impl MemoryFormStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FormStore for MemoryFormStore {
    fn load(&self) -> Result<Option<TripDetails>> {
        Ok(self.details.clone())
    }

    fn save(&mut self, details: &TripDetails) -> Result<()> {
        self.details = Some(details.clone());
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.details = None;
        Ok(())
    }
}
