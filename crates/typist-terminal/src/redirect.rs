//! Output redirection to a file (`command args > filename`).
//!
//! The sink holds at most one target. Arming, disarming and every write
//! happen under the same lock so redirected writes never interleave and a
//! reader never observes a half-written item.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use typist_types::error::{Result, TypistError};
use typist_types::output::OutputItem;

use crate::parser::is_valid_filename;

/// Printed when a redirection cannot be set up.
pub const REDIRECTION_SETUP_FAILED: &str = "Failed to redirect output";

/// Printed when a redirected write fails and output falls back to the surface.
pub const REDIRECTION_WRITE_FAILED: &str = "Could not redirect output";

/// Result of offering an item to the sink.
#[derive(Debug)]
pub enum Redirected {
    /// No target is armed; the item belongs on the surface.
    Inactive,
    /// The item was appended to the target file.
    Written,
    /// The write failed and the sink disarmed itself.
    Failed(TypistError),
}

/// Append-only file sink for redirected console output.
#[derive(Debug, Default)]
pub struct RedirectionSink {
    target: Mutex<Option<PathBuf>>,
}

impl RedirectionSink {
    /// An unarmed sink.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<PathBuf>> {
        self.target.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Arm redirection to `dir/filename`, truncating any existing file.
    ///
    /// On failure the sink stays disarmed.
    pub fn arm(&self, dir: &Path, filename: &str) -> Result<PathBuf> {
        let mut target = self.lock();
        *target = None;

        let filename = filename.trim();
        if !is_valid_filename(filename) {
            return Err(TypistError::Redirection(format!(
                "invalid filename: {filename}"
            )));
        }

        let path = dir.join(filename);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        if path.exists() {
            fs::remove_file(&path)?;
        }
        fs::File::create(&path)?;

        log::debug!("Redirecting console output to {}", path.display());
        *target = Some(path.clone());
        Ok(path)
    }

    /// Stop diverting output. The file written so far is kept.
    pub fn disarm(&self) {
        *self.lock() = None;
    }

    /// Whether output is currently diverted to a file.
    pub fn is_active(&self) -> bool {
        self.lock().is_some()
    }

    /// The file output is diverted to, if armed.
    pub fn target(&self) -> Option<PathBuf> {
        self.lock().clone()
    }

    /// Append the string form of `item` to the armed target, if any.
    ///
    /// A missing file is recreated. Any failure disarms the sink.
    pub fn offer(&self, item: &OutputItem) -> Redirected {
        let mut target = self.lock();
        let Some(path) = target.as_ref() else {
            return Redirected::Inactive;
        };

        let written = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut file| file.write_all(item.to_string().as_bytes()));

        match written {
            Ok(()) => {
                log::trace!("Console output was redirected to: {}", path.display());
                Redirected::Written
            },
            Err(e) => {
                log::warn!("Redirected write to {} failed: {e}", path.display());
                *target = None;
                Redirected::Failed(e.into())
            },
        }
    }
}
