// src/catalog/mod.rs

//! The data catalog the datasets are published into.

use anyhow::Result;
use std::collections::BTreeSet;
use tracing::info;

use crate::dataset::{Dataset, ResourceFile, ResourceView, Showcase};

pub mod ckan;
pub mod dry_run;

pub use ckan::CkanCatalog;
pub use dry_run::DryRunCatalog;

/// A dataset as listed by the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub name: String,
    /// ISO3 codes, uppercase, in catalog order.
    pub locations: Vec<String>,
}

/// Operations the pipeline needs from a catalog.
pub trait Catalog {
    /// Create the dataset or update it in place, replacing its resources
    /// with `resources` (uploaded from their local paths).
    fn publish_dataset(
        &mut self,
        dataset: &Dataset,
        resources: &[ResourceFile],
        view: Option<&ResourceView>,
    ) -> Result<()>;

    /// Create or update the showcase and link it to `dataset_name`.
    fn publish_showcase(&mut self, showcase: &Showcase, dataset_name: &str) -> Result<()>;

    fn search_by_organization(&mut self, organization: &str) -> Result<Vec<CatalogEntry>>;

    fn delete_dataset(&mut self, name: &str) -> Result<()>;
}

/// Delete the organisation's datasets named `<prefix>...` whose first
/// location no longer appears in the upstream country list.
pub fn delete_stale<C: Catalog + ?Sized>(
    catalog: &mut C,
    organization: &str,
    prefix: &str,
    shared: &BTreeSet<String>,
) -> Result<Vec<String>> {
    let mut deleted = Vec::new();
    for entry in catalog.search_by_organization(organization)? {
        if !entry.name.starts_with(prefix) {
            continue;
        }
        let stale = match entry.locations.first() {
            Some(iso3) => !shared.contains(iso3),
            None => false,
        };
        if stale {
            info!("Deleting {}!", entry.name);
            catalog.delete_dataset(&entry.name)?;
            deleted.push(entry.name);
        }
    }
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, locations: &[&str]) -> CatalogEntry {
        CatalogEntry {
            name: name.into(),
            locations: locations.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_delete_stale_only_touches_own_prefix() {
        let mut catalog = DryRunCatalog::with_existing(vec![
            entry("wfp-hungermap-data-for-cod", &["COD"]),
            entry("wfp-hungermap-data-for-bdi", &["BDI"]),
            entry("wfp-food-prices-for-bdi", &["BDI"]),
            entry("wfp-hungermap-data-for-nowhere", &[]),
        ]);
        let shared: BTreeSet<String> = ["COD".to_string(), "YEM".to_string()].into();

        let deleted =
            delete_stale(&mut catalog, "wfp", "wfp-hungermap-data-for", &shared).unwrap();
        assert_eq!(deleted, vec!["wfp-hungermap-data-for-bdi"]);
        assert_eq!(catalog.deleted, deleted);
    }
}
