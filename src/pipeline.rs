// src/pipeline.rs

//! One scraper run: fetch, filter, build, publish, clean up.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::catalog::{delete_stale, Catalog};
use crate::config::Configuration;
use crate::country::country_name_or;
use crate::dataset::{DatasetAssembler, DatasetBundle};
use crate::fetch::{urls::region_url, Retriever};
use crate::history::Watermarks;
use crate::hungermap::{select_updated, CountryList, CountryRecord, CountrySelection, RegionRecord};
use crate::process::{build_rows, CountryRows, LookbackWindow};

/// What a run did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Countries whose watermark moved.
    pub updated: Vec<String>,
    /// Dataset names published.
    pub published: Vec<String>,
    /// Updated countries with no rows in the lookback window.
    pub skipped: Vec<String>,
    /// Stale dataset names removed from the catalog.
    pub deleted: Vec<String>,
}

pub struct Pipeline<'a> {
    config: &'a Configuration,
    retriever: Retriever,
    assembler: DatasetAssembler<'a>,
    today: NaiveDate,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        config: &'a Configuration,
        retriever: Retriever,
        folder: impl Into<PathBuf>,
        today: NaiveDate,
    ) -> Self {
        Self {
            config,
            retriever,
            assembler: DatasetAssembler::new(config, folder),
            today,
        }
    }

    /// `lookback_months` back from `today`, both ends inclusive.
    pub fn window(&self) -> LookbackWindow {
        LookbackWindow::trailing_months(self.today, self.config.project.lookback_months)
    }

    /// Fetch the global country list and keep the countries with a new
    /// release, advancing their watermarks.
    pub fn get_country_data(&mut self, watermarks: &mut Watermarks) -> Result<CountrySelection> {
        let url = &self.config.project.country_url;
        info!("Fetching country list from {}", url);
        let list: CountryList = self
            .retriever
            .download_json(url)
            .with_context(|| format!("fetching country list from {}", url))?;
        let total = list.countries.len();
        let selection = select_updated(list.countries, watermarks);
        info!(
            total,
            updated = selection.eligible.len(),
            "filtered country list"
        );
        Ok(selection)
    }

    /// Attach the country's regional records (if the API has any) and build
    /// its rows.
    pub fn get_rows(&mut self, iso3: &str, mut record: CountryRecord) -> CountryRows {
        let window = self.window();
        let name = country_name_or(iso3, record.country.name.as_deref());
        let url = region_url(&self.config.project.country_url, iso3, window.start, window.end);
        match self.retriever.download_json::<Vec<RegionRecord>>(&url) {
            Ok(regions) => {
                debug!(iso3, regions = regions.len(), "regional data");
                record.regions = regions;
            }
            Err(err) => {
                debug!(iso3, error = %err, "regional fetch failed");
                info!("No subnational data for {}!", name);
                record.regions.clear();
            }
        }
        build_rows(iso3, &record, &name, window)
    }

    pub fn generate_dataset_and_showcase(
        &self,
        iso3: &str,
        rows: &CountryRows,
    ) -> Result<Option<DatasetBundle>> {
        self.assembler.generate_dataset_and_showcase(iso3, rows)
    }

    /// Publish every updated country, then delete the catalog datasets of
    /// countries the API no longer lists. `watermarks` is advanced in place;
    /// the caller persists it only when this returns `Ok`.
    pub fn run<C: Catalog + ?Sized>(
        &mut self,
        catalog: &mut C,
        watermarks: &mut Watermarks,
    ) -> Result<RunSummary> {
        let selection = self.get_country_data(watermarks)?;
        info!("Number of datasets: {}", selection.eligible.len());

        let mut summary = RunSummary {
            updated: selection.iso3s(),
            ..RunSummary::default()
        };
        let shared = selection.shared;

        for (iso3, record) in selection.eligible {
            let rows = self.get_rows(&iso3, record);
            let Some(bundle) = self.generate_dataset_and_showcase(&iso3, &rows)? else {
                info!(iso3 = %iso3, "no rows in lookback window, nothing to publish");
                summary.skipped.push(iso3);
                continue;
            };
            catalog
                .publish_dataset(&bundle.dataset, &bundle.resources, bundle.view.as_ref())
                .with_context(|| format!("publishing `{}`", bundle.dataset.name))?;
            catalog
                .publish_showcase(&bundle.showcase, &bundle.dataset.name)
                .with_context(|| format!("publishing `{}`", bundle.showcase.name))?;
            summary.published.push(bundle.dataset.name);
        }

        summary.deleted = delete_stale(
            catalog,
            &self.config.project.organization_name,
            &self.assembler.name_prefix(),
            &shared,
        )
        .context("cleaning up stale datasets")?;
        Ok(summary)
    }
}
