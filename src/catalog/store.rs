//! JSON snapshot persistence for the catalog and raw scrape batches
//!
//! Every write replaces the whole file: the content goes to a sibling
//! temporary file first, which is then renamed over the target.

use super::merge::{merge, MergeSummary};
use super::record::{Catalog, ProductRecord};
use crate::{HarvestError, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Loads the product catalog from `path`
///
/// A missing, unreadable, or corrupt file yields an empty catalog. A corrupt
/// file is copied to `<path>.bak` first so that the following save does not
/// destroy it.
pub fn load_catalog(path: &Path) -> Catalog {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!(
                "No readable catalog at {} ({}), starting a fresh one",
                path.display(),
                e
            );
            return Catalog::new();
        }
    };

    match serde_json::from_str::<Catalog>(&content) {
        Ok(catalog) => {
            tracing::debug!("Loaded {} catalog entries from {}", catalog.len(), path.display());
            catalog
        }
        Err(e) => {
            let backup = sibling(path, "bak");
            tracing::warn!(
                "Catalog {} is corrupt ({}), backing it up to {} and starting a fresh one",
                path.display(),
                e,
                backup.display()
            );
            if let Err(e) = fs::copy(path, &backup) {
                tracing::warn!("Failed to back up corrupt catalog: {}", e);
            }
            Catalog::new()
        }
    }
}

/// Writes the whole catalog to `path`
pub fn save_catalog(path: &Path, catalog: &Catalog) -> Result<()> {
    write_json(path, catalog)?;
    tracing::debug!("Wrote {} catalog entries to {}", catalog.len(), path.display());
    Ok(())
}

/// Writes a run's raw batch of scraped records to `path`
pub fn save_batch(path: &Path, batch: &[ProductRecord]) -> Result<()> {
    write_json(path, batch)
}

/// Reads a raw batch previously written by [`save_batch`]
pub fn load_batch(path: &Path) -> Result<Vec<ProductRecord>> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|source| HarvestError::Json {
        path: path.display().to_string(),
        source,
    })
}

/// Loads the catalog at `path`, merges `batch` into it, and rewrites the file
///
/// The catalog file is rewritten even when nothing changed, so a corrupt or
/// missing catalog is replaced by a well-formed one.
pub fn merge_into_file(path: &Path, batch: &[ProductRecord]) -> Result<MergeSummary> {
    let (catalog, summary) = merge(load_catalog(path), batch);
    save_catalog(path, &catalog)?;
    tracing::info!(
        "Merged into {} - added {} new products, updated {}",
        path.display(),
        summary.added,
        summary.updated
    );
    Ok(summary)
}

/// Serializes `value` as 2-space indented UTF-8 JSON and replaces `path` with it
fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut content = serde_json::to_string_pretty(value).map_err(|source| HarvestError::Json {
        path: path.display().to_string(),
        source,
    })?;
    content.push('\n');

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let tmp = sibling(path, "tmp");
    fs::write(&tmp, content)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// `products.json` -> `products.json.<suffix>`
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}
