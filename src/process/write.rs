// src/process/write.rs

use anyhow::{Context, Result};
use serde::Serialize;
use std::{fs, path::Path};
use tracing::debug;

/// Write `rows` as CSV: the column names (from the serde field names) on the
/// first line, then one line per row. Goes through a `.tmp` file + rename.
pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating output directory `{}`", parent.display()))?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = Path::new(&tmp);

    let mut wtr = csv::Writer::from_path(tmp)
        .with_context(|| format!("creating `{}`", tmp.display()))?;
    for row in rows {
        wtr.serialize(row)
            .with_context(|| format!("writing row to `{}`", tmp.display()))?;
    }
    wtr.flush()
        .with_context(|| format!("flushing `{}`", tmp.display()))?;
    drop(wtr);

    fs::rename(tmp, path).with_context(|| {
        format!(
            "failed to rename `{}` to `{}`",
            tmp.display(),
            path.display()
        )
    })?;
    debug!(rows = rows.len(), path = %path.display(), "wrote csv");
    Ok(())
}
