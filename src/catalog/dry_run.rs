// src/catalog/dry_run.rs

use anyhow::Result;
use tracing::info;

use super::{Catalog, CatalogEntry};
use crate::dataset::{Dataset, ResourceFile, ResourceView, Showcase};

/// Catalog that only records what would have been published.
#[derive(Debug, Default)]
pub struct DryRunCatalog {
    pub existing: Vec<CatalogEntry>,
    pub published: Vec<Dataset>,
    pub uploaded: Vec<ResourceFile>,
    pub views: Vec<ResourceView>,
    pub showcases: Vec<(Showcase, String)>,
    pub deleted: Vec<String>,
}

impl DryRunCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `existing` already in the catalog.
    pub fn with_existing(existing: Vec<CatalogEntry>) -> Self {
        Self {
            existing,
            ..Self::default()
        }
    }
}

impl Catalog for DryRunCatalog {
    fn publish_dataset(
        &mut self,
        dataset: &Dataset,
        resources: &[ResourceFile],
        view: Option<&ResourceView>,
    ) -> Result<()> {
        info!(
            dataset = %dataset.name,
            resources = resources.len(),
            quickcharts = view.is_some(),
            "dry run: would publish"
        );
        if !self.existing.iter().any(|e| e.name == dataset.name) {
            self.existing.push(CatalogEntry {
                name: dataset.name.clone(),
                locations: dataset.location_iso3s(),
            });
        }
        self.published.push(dataset.clone());
        self.uploaded.extend(resources.iter().cloned());
        self.views.extend(view.cloned());
        Ok(())
    }

    fn publish_showcase(&mut self, showcase: &Showcase, dataset_name: &str) -> Result<()> {
        info!(showcase = %showcase.name, dataset = dataset_name, "dry run: would publish showcase");
        self.showcases
            .push((showcase.clone(), dataset_name.to_string()));
        Ok(())
    }

    fn search_by_organization(&mut self, _organization: &str) -> Result<Vec<CatalogEntry>> {
        Ok(self.existing.clone())
    }

    fn delete_dataset(&mut self, name: &str) -> Result<()> {
        info!(dataset = name, "dry run: would delete");
        self.existing.retain(|e| e.name != name);
        self.deleted.push(name.to_string());
        Ok(())
    }
}
