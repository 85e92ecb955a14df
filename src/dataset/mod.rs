// src/dataset/mod.rs

//! Catalog-ready descriptors (dataset, resources, showcase) for one country.

use anyhow::Result;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::Configuration;
use crate::process::{to_long, write_csv, CountryRows};

pub mod quickcharts;

pub use quickcharts::{quickchart_view, BitesDisabled, ResourceView, BITE_COUNT};

static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

/// Lowercase, runs of anything but `[a-z0-9]` collapsed to `-`, no leading or
/// trailing `-`.
pub fn slugify(s: &str) -> String {
    let lower = s.to_lowercase();
    NON_ALNUM
        .replace_all(&lower, "-")
        .trim_matches('-')
        .to_string()
}

/// `[2023-07-05T00:00:00 TO 2023-11-20T23:59:59]`
pub fn reference_period_string(start: NaiveDate, end: NaiveDate) -> String {
    format!("[{}T00:00:00 TO {}T23:59:59]", start, end)
}

/* ────────────────────────── structures ───────────────────────── */

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
    pub name: String,
    pub vocabulary_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Group {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    pub name: String,
    pub title: String,
    pub maintainer: String,
    pub owner_org: String,
    pub subnational: String,
    pub groups: Vec<Group>,
    pub tags: Vec<Tag>,
    pub dataset_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_update_frequency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub methodology: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub methodology_other: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caveats: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_creator: Option<String>,
    pub private: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Dataset {
    /// ISO3 codes of the dataset's country groups.
    pub fn location_iso3s(&self) -> Vec<String> {
        self.groups
            .iter()
            .map(|g| g.name.to_ascii_uppercase())
            .collect()
    }
}

/// A CSV file to upload as a dataset resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceFile {
    pub name: String,
    pub description: String,
    pub format: String,
    #[serde(skip)]
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Showcase {
    pub name: String,
    pub title: String,
    pub notes: String,
    pub url: String,
    pub image_url: String,
    pub tags: Vec<Tag>,
}

/// Everything published for one country.
#[derive(Debug, Clone)]
pub struct DatasetBundle {
    pub dataset: Dataset,
    pub resources: Vec<ResourceFile>,
    pub showcase: Showcase,
    pub bites_disabled: BitesDisabled,
    pub view: Option<ResourceView>,
}

/* ────────────────────────── assembly ─────────────────────────── */

/// Turns row tables into descriptors, writing the CSV resources to `folder`.
pub struct DatasetAssembler<'a> {
    config: &'a Configuration,
    folder: PathBuf,
}

impl<'a> DatasetAssembler<'a> {
    pub fn new(config: &'a Configuration, folder: impl Into<PathBuf>) -> Self {
        Self {
            config,
            folder: folder.into(),
        }
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// Slug shared by every dataset this scraper owns.
    pub fn name_prefix(&self) -> String {
        slugify(&self.config.project.dataset_name_prefix)
    }

    pub fn dataset_name(&self, iso3: &str) -> String {
        slugify(&format!(
            "{}{}",
            self.config.project.dataset_name_prefix, iso3
        ))
    }

    fn tags(&self) -> Vec<Tag> {
        self.config
            .project
            .tags
            .iter()
            .map(|t| Tag {
                name: t.clone(),
                vocabulary_id: self.config.project.catalog.tag_vocabulary_id.clone(),
            })
            .collect()
    }

    /// Dataset, resources and showcase for `iso3`, or `None` when the
    /// country has no data rows.
    pub fn generate_dataset_and_showcase(
        &self,
        iso3: &str,
        rows: &CountryRows,
    ) -> Result<Option<DatasetBundle>> {
        let Some((earliest, latest)) = rows.period.bounds() else {
            return Ok(None);
        };
        if rows.is_empty() {
            return Ok(None);
        }
        let project = &self.config.project;
        let statics = &self.config.dataset_static;

        let name = self.dataset_name(iso3);
        let title = format!("{} - HungerMap data", rows.country_name);
        info!("Creating dataset: {}", title);

        let dataset = Dataset {
            name: name.clone(),
            title: title.clone(),
            maintainer: project.maintainer.clone(),
            owner_org: project.organization.clone(),
            subnational: "1".to_string(),
            groups: vec![Group {
                name: iso3.to_ascii_lowercase(),
            }],
            tags: self.tags(),
            dataset_date: reference_period_string(earliest, latest),
            data_update_frequency: statics.data_update_frequency.clone(),
            license_id: statics.license_id.clone(),
            methodology: statics.methodology.clone(),
            methodology_other: statics.methodology_other.clone(),
            caveats: statics.caveats.clone(),
            dataset_source: statics.dataset_source.clone(),
            package_creator: statics.package_creator.clone(),
            private: statics.private,
            // markdown line breaks
            notes: statics
                .notes
                .as_deref()
                .map(|n| n.trim_end().replace('\n', "  \n")),
        };

        let short_name = format!("{}.csv", name);
        let short_path = self.folder.join(&short_name);
        write_csv(&short_path, &rows.rows)?;
        let mut resources = vec![ResourceFile {
            name: short_name,
            description: title.clone(),
            format: "csv".to_string(),
            path: short_path,
        }];

        if rows.has_subnational {
            let long_name = format!("{}-long.csv", name);
            let long_path = self.folder.join(&long_name);
            write_csv(&long_path, &to_long(rows.data_rows()))?;
            resources.push(ResourceFile {
                name: long_name,
                description: format!("{} long format", title),
                format: "csv".to_string(),
                path: long_path,
            });
        }

        let showcase = Showcase {
            name: format!("{}-showcase", name),
            title: format!("{} showcase", title),
            notes: project.showcase.notes.clone(),
            url: project.showcase.url.clone(),
            image_url: project.showcase.image_url.clone(),
            tags: self.tags(),
        };

        let bites_disabled = BitesDisabled::from_rows(rows.data_rows());
        let view = quickchart_view(&self.config.resource_view, bites_disabled);

        Ok(Some(DatasetBundle {
            dataset,
            resources,
            showcase,
            bites_disabled,
            view,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{ReferencePeriod, Row};
    use tempfile::tempdir;

    fn config() -> Configuration {
        Configuration::read(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config")).unwrap()
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn national_only() -> CountryRows {
        let mut period = ReferencePeriod::default();
        period.observe(ymd(2023, 10, 13));
        CountryRows {
            country_name: "Yemen".into(),
            rows: vec![
                Row::hxl_tags(),
                Row {
                    countrycode: "YEM".into(),
                    countryname: "Yemen".into(),
                    adminlevel: "national".into(),
                    date: "2023-10-13".into(),
                    fcs_prevalence: "0.52".into(),
                    rcsi_prevalence: "0.61".into(),
                    ..Row::default()
                },
            ],
            period,
            has_subnational: false,
        }
    }

    #[test]
    fn test_slugify() {
        assert_eq!(
            slugify("wfp hungermap data for COD"),
            "wfp-hungermap-data-for-cod"
        );
        assert_eq!(slugify("  Foo -- Bar!  "), "foo-bar");
        assert_eq!(slugify("wfp hungermap data for "), "wfp-hungermap-data-for");
    }

    #[test]
    fn test_reference_period_string() {
        assert_eq!(
            reference_period_string(ymd(2023, 7, 5), ymd(2023, 11, 20)),
            "[2023-07-05T00:00:00 TO 2023-11-20T23:59:59]"
        );
    }

    #[test]
    fn test_national_only_dataset() {
        let cfg = config();
        let tmp = tempdir().unwrap();
        let assembler = DatasetAssembler::new(&cfg, tmp.path());
        let bundle = assembler
            .generate_dataset_and_showcase("YEM", &national_only())
            .unwrap()
            .unwrap();

        let ds = &bundle.dataset;
        assert_eq!(ds.name, "wfp-hungermap-data-for-yem");
        assert_eq!(ds.title, "Yemen - HungerMap data");
        assert_eq!(ds.maintainer, "196196be-6037-4488-8b71-d786adf4c081");
        assert_eq!(ds.owner_org, "3ecac442-7fed-448d-8f78-b385ef6f84e7");
        assert_eq!(ds.subnational, "1");
        assert_eq!(ds.location_iso3s(), vec!["YEM"]);
        assert_eq!(
            ds.tags.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
            vec!["hxl", "indicators", "food security"]
        );
        assert_eq!(ds.dataset_date, "[2023-10-13T00:00:00 TO 2023-10-13T23:59:59]");
        assert!(ds.notes.as_deref().unwrap().contains("  \n"));

        assert_eq!(bundle.resources.len(), 1);
        assert_eq!(bundle.resources[0].name, "wfp-hungermap-data-for-yem.csv");
        assert!(bundle.resources[0].path.is_file());
        assert_eq!(bundle.bites_disabled, BitesDisabled([false, false, true]));
        assert!(bundle.view.is_some());

        assert_eq!(bundle.showcase.name, "wfp-hungermap-data-for-yem-showcase");
        assert_eq!(bundle.showcase.title, "Yemen - HungerMap data showcase");
        assert_eq!(bundle.showcase.url, "https://hungermap.wfp.org/");
    }

    #[test]
    fn test_no_rows_no_dataset() {
        let cfg = config();
        let tmp = tempdir().unwrap();
        let assembler = DatasetAssembler::new(&cfg, tmp.path());
        let empty = CountryRows {
            country_name: "Yemen".into(),
            rows: vec![Row::hxl_tags()],
            period: ReferencePeriod::default(),
            has_subnational: false,
        };
        assert!(assembler
            .generate_dataset_and_showcase("YEM", &empty)
            .unwrap()
            .is_none());
        // nothing written
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }
}
