//! Field-fill merge of a scraped batch into the catalog
//!
//! Existing non-empty fields are never overwritten: the first value written for
//! a field wins across every later merge.

use super::record::{Catalog, ProductRecord};

/// Counts of what a merge did to the catalog
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    /// Records inserted under a previously unknown id
    pub added: usize,
    /// Existing records that had at least one blank field filled
    pub updated: usize,
    /// Batch records whose id was known and that filled nothing
    pub unchanged: usize,
    /// Batch records without an id
    pub skipped: usize,
}

/// Merges freshly scraped records into a catalog
///
/// # Rules
///
/// - a record without an id is skipped
/// - a record whose id is already catalogued only fills blank fields among
///   `images`, `price`, `description`, `url` and `name`
/// - a record with a new id is appended as-is
///
/// Merging the same batch twice leaves the catalog as merging it once.
///
/// # Example
///
/// ```
/// use catalog_harvester::catalog::{merge, Catalog, ProductRecord};
///
/// let batch = vec![ProductRecord { id: Some(7), name: Some("Widget".into()), ..Default::default() }];
/// let (catalog, summary) = merge(Catalog::new(), &batch);
/// assert_eq!(summary.added, 1);
/// assert!(catalog.contains(7));
/// ```
pub fn merge(mut catalog: Catalog, batch: &[ProductRecord]) -> (Catalog, MergeSummary) {
    let mut summary = MergeSummary::default();

    for record in batch {
        let Some(id) = record.id else {
            summary.skipped += 1;
            continue;
        };

        match catalog.get_mut(id) {
            Some(existing) => {
                let filled = fill_missing(existing, record);
                if filled.is_empty() {
                    summary.unchanged += 1;
                } else {
                    tracing::debug!("Filled {:?} on product {}", filled, id);
                    summary.updated += 1;
                }
            }
            None => {
                catalog.insert(record.clone());
                summary.added += 1;
            }
        }
    }

    (catalog, summary)
}

/// Copies every field that is blank on `existing` and set on `incoming`
///
/// Blank means absent, an empty string, an empty image list, or a zero price.
/// Returns the names of the fields that were filled.
pub fn fill_missing(existing: &mut ProductRecord, incoming: &ProductRecord) -> Vec<&'static str> {
    let mut filled = Vec::new();

    if existing.images.is_empty() && !incoming.images.is_empty() {
        existing.images = incoming.images.clone();
        filled.push("images");
    }

    if !has_price(existing.price) && has_price(incoming.price) {
        existing.price = incoming.price;
        filled.push("price");
    }

    if existing.description.is_empty() && !incoming.description.is_empty() {
        existing.description = incoming.description.clone();
        filled.push("description");
    }

    if existing.url.is_empty() && !incoming.url.is_empty() {
        existing.url = incoming.url.clone();
        filled.push("url");
    }

    if !has_text(&existing.name) && has_text(&incoming.name) {
        existing.name = incoming.name.clone();
        filled.push("name");
    }

    filled
}

fn has_price(price: Option<f64>) -> bool {
    price.is_some_and(|p| p != 0.0)
}

fn has_text(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|s| !s.is_empty())
}
