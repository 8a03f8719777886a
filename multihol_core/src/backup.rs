//! Write-once JSON backups of the candidate items
//!
//! The backup is written before any item is touched, so a failed run can be
//! repaired by hand from the original records.

use crate::descriptor::HoldingDescriptor;
use crate::error::{Error, Result};
use crate::model::Item;
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

static NON_ALPHANUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9]+").expect("pattern is valid"));

/// Writes candidate lists into a backup directory without ever overwriting
#[derive(Debug, Clone)]
pub struct BackupWriter {
    directory: PathBuf,
}

impl BackupWriter {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// File stem for a run: `{bib}_{library}_{location}_{prefix}`, sanitized
    pub fn base_name(bib_id: &str, descriptor: &HoldingDescriptor) -> String {
        let raw = format!(
            "{bib_id}_{}_{}_{}",
            descriptor.library, descriptor.location, descriptor.call_number_prefix
        );
        NON_ALPHANUMERIC
            .replace_all(&raw, "_")
            .trim_matches('_')
            .to_string()
    }

    /// Write `items` as a JSON array and return the path written.
    ///
    /// An existing file is never replaced: the name gets `_1`, `_2`, ...
    /// suffixes until an unused one is found. The loop has no upper bound.
    pub async fn write(
        &self,
        bib_id: &str,
        descriptor: &HoldingDescriptor,
        items: &[Item],
    ) -> Result<PathBuf> {
        let data = serde_json::to_vec_pretty(items)?;

        fs::create_dir_all(&self.directory)
            .await
            .map_err(|e| Error::backup(&self.directory, e))?;

        let base = Self::base_name(bib_id, descriptor);
        let mut suffix = 0usize;

        loop {
            let path = self.directory.join(candidate_name(&base, suffix));

            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(mut file) => {
                    let data = &data;
                    fill_or_remove(&path, async move {
                        file.write_all(data).await?;
                        file.sync_all().await
                    })
                    .await?;

                    info!("Backed up {} items to {}", items.len(), path.display());
                    return Ok(path);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!("Backup {} exists, trying next suffix", path.display());
                    suffix += 1;
                }
                Err(e) => return Err(Error::backup(&path, e)),
            }
        }
    }
}

/// Await `fill`; if it fails, remove the partly written file at `path`
async fn fill_or_remove<F>(path: &Path, fill: F) -> Result<()>
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = fill.await {
        if let Err(remove_error) = fs::remove_file(path).await {
            warn!(
                "Could not remove incomplete backup {}: {remove_error}",
                path.display()
            );
        }
        return Err(Error::backup(path, e));
    }
    Ok(())
}

fn candidate_name(base: &str, suffix: usize) -> String {
    if suffix == 0 {
        format!("{base}.json")
    } else {
        format!("{base}_{suffix}.json")
    }
}
