// src/config.rs

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{de::DeserializeOwned, Deserialize};
use std::{fs, path::Path, time::Duration};
use url::Url;

pub const PROJECT_CONFIG_FILE: &str = "project_configuration.yaml";
pub const DATASET_STATIC_FILE: &str = "hdx_dataset_static.yaml";
pub const RESOURCE_VIEW_FILE: &str = "hdx_resource_view_static.yaml";

/* ────────────────────────── structures ───────────────────────── */

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectConfig {
    pub country_url: Url,
    pub dataset_name_prefix: String,
    pub maintainer: String,
    pub organization: String,
    pub organization_name: String,
    pub tags: Vec<String>,
    pub lookback_months: u32,
    pub default_watermark: NaiveDate,
    pub rate_limit: RateLimitConfig,
    pub showcase: ShowcaseConfig,
    pub catalog: CatalogConfig,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RateLimitConfig {
    pub calls: u32,
    pub period_ms: u64,
}

impl RateLimitConfig {
    /// Minimum spacing between two requests.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.period_ms) / self.calls.max(1)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShowcaseConfig {
    pub notes: String,
    pub url: String,
    pub image_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    pub site: Url,
    pub user_agent: String,
    pub tag_vocabulary_id: String,
    pub updated_by_script: String,
}

/// Fields merged into every dataset (`hdx_dataset_static.yaml`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatasetStatic {
    pub license_id: Option<String>,
    pub methodology: Option<String>,
    pub methodology_other: Option<String>,
    pub caveats: Option<String>,
    pub dataset_source: Option<String>,
    pub package_creator: Option<String>,
    #[serde(default)]
    pub private: bool,
    pub data_update_frequency: Option<String>,
    pub notes: Option<String>,
}

/// Quick-chart template (`hdx_resource_view_static.yaml`); exactly one bite
/// per chart in [`crate::dataset::BitesDisabled`] order.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceViewTemplate {
    pub title: String,
    pub description: String,
    pub view_type: String,
    pub bites: Vec<serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct Configuration {
    pub project: ProjectConfig,
    pub dataset_static: DatasetStatic,
    pub resource_view: ResourceViewTemplate,
}

/* ─────────────────────────── loading ─────────────────────────── */

fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading `{}`", path.display()))?;
    serde_yaml::from_str(&text).with_context(|| format!("parsing `{}`", path.display()))
}

impl Configuration {
    /// Read the three YAML files from `dir`.
    pub fn read(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let project: ProjectConfig = read_yaml(&dir.join(PROJECT_CONFIG_FILE))?;
        let dataset_static = read_yaml(&dir.join(DATASET_STATIC_FILE))?;
        let resource_view: ResourceViewTemplate = read_yaml(&dir.join(RESOURCE_VIEW_FILE))?;
        anyhow::ensure!(
            resource_view.bites.len() == crate::dataset::BITE_COUNT,
            "`{}` must define {} bites, found {}",
            RESOURCE_VIEW_FILE,
            crate::dataset::BITE_COUNT,
            resource_view.bites.len()
        );
        anyhow::ensure!(
            project.rate_limit.calls > 0,
            "rate_limit.calls must be positive"
        );
        Ok(Self {
            project,
            dataset_static,
            resource_view,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn config_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config")
    }

    #[test]
    fn test_read_shipped_config() {
        let cfg = Configuration::read(config_dir()).unwrap();
        assert_eq!(cfg.project.organization_name, "wfp");
        assert_eq!(cfg.project.tags, vec!["hxl", "indicators", "food security"]);
        assert_eq!(cfg.project.lookback_months, 12);
        assert_eq!(
            cfg.project.default_watermark,
            NaiveDate::from_ymd_opt(2022, 1, 1).unwrap()
        );
        assert_eq!(cfg.dataset_static.data_update_frequency.as_deref(), Some("-2"));
        assert_eq!(cfg.resource_view.bites.len(), 3);
    }

    #[test]
    fn test_rate_limit_interval() {
        let rl = RateLimitConfig {
            calls: 4,
            period_ms: 1000,
        };
        assert_eq!(rl.interval(), Duration::from_millis(250));
    }

    #[test]
    fn test_missing_dir_is_an_error() {
        assert!(Configuration::read("/definitely/not/here").is_err());
    }
}
