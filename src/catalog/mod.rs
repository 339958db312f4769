//! Product catalog module
//!
//! This module owns the product data model and the flat JSON files it lives in:
//! - `ProductRecord`: one scraped (or catalogued) product
//! - `Catalog`: the id-keyed product list behind `products.json`
//! - Field-fill merging of a scraped batch into the catalog
//! - Whole-file JSON snapshots of the catalog and of each run's raw batch

mod merge;
mod record;
mod store;

pub use merge::{fill_missing, merge, MergeSummary};
pub use record::{Catalog, ProductRecord};
pub use store::{load_batch, load_catalog, merge_into_file, save_batch, save_catalog};
