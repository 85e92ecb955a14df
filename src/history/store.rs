use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

use super::state::Watermarks;

/// `StateStore` persists the watermark map as a single text file
/// (`DEFAULT=2022-01-01,AGO=2023-10-13,...`) between runs.
///
/// Loading a missing file yields a fresh map seeded with the configured
/// default date; saving goes through a `.tmp` file and a rename so a crash
/// mid-write never leaves a truncated state behind.
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self, default: NaiveDate) -> Result<Watermarks> {
        if !self.path.exists() {
            info!(
                "no state at `{}`, starting from DEFAULT={}",
                self.path.display(),
                default
            );
            return Ok(Watermarks::new(default));
        }
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("reading state file `{}`", self.path.display()))?;
        let watermarks = Watermarks::from_dates_str(&text)
            .with_context(|| format!("parsing state file `{}`", self.path.display()))?;
        debug!(countries = watermarks.len(), "loaded watermarks");
        Ok(watermarks)
    }

    pub fn save(&self, watermarks: &Watermarks) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating state directory `{}`", parent.display()))?;
        }
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, watermarks.to_dates_str())
            .with_context(|| format!("writing `{}`", tmp.display()))?;
        fs::rename(&tmp, &self.path).with_context(|| {
            format!(
                "failed to rename `{}` to `{}`",
                tmp.display(),
                self.path.display()
            )
        })?;
        info!(
            countries = watermarks.len(),
            "saved watermarks to `{}`",
            self.path.display()
        );
        Ok(())
    }
}
