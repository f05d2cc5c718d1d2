//! Training set hand-off
//!
//! Writes each training set to its own uniquely named file in the storage
//! directory. Encryption of the artifact is handled downstream.

use crate::collector::TrainingSet;
use crate::error::Result;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

/// Write `set` to `<dir>/<uuid>.json`, creating `dir` if needed. Returns the file path.
pub fn write_training_set(dir: &Path, set: &TrainingSet) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;

    let path = dir.join(format!("{}.json", Uuid::new_v4()));
    let mut writer = BufWriter::new(File::create(&path)?);
    serde_json::to_writer(&mut writer, set)?;
    writer.flush()?;

    info!(
        "💾 Wrote {} records for {} to {}",
        set.records.len(),
        set.owner.id,
        path.display()
    );
    Ok(path)
}
