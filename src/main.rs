use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use hungermap::{
    catalog::{Catalog, CkanCatalog, DryRunCatalog},
    config::Configuration,
    fetch::{FetchMode, Retriever},
    history::StateStore,
    pipeline::Pipeline,
};
use std::{path::PathBuf, process::ExitCode};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

const LOOKUP: &str = "hdx-scraper-wfp-hungermap";

/// Publish WFP HungerMap food-security indicators to HDX.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Keep a copy of every downloaded body under `--saved-dir`
    #[arg(long)]
    save: bool,

    /// Read bodies from `--saved-dir` instead of the network
    #[arg(long)]
    use_saved: bool,

    /// Directory for saved and replayed API bodies
    #[arg(long, default_value = "saved_data")]
    saved_dir: PathBuf,

    #[arg(long, default_value = "config")]
    config_dir: PathBuf,

    /// Watermark file, rewritten after a successful run
    #[arg(long, default_value = "metric_dates.txt")]
    state_file: PathBuf,

    /// Folder for the CSV resources (temporary if omitted)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Log what would be published instead of calling the catalog
    #[arg(long)]
    dry_run: bool,
}

fn main() -> ExitCode {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    let args = Args::parse();
    info!("##### {} version {} ####", LOOKUP, env!("CARGO_PKG_VERSION"));

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("run failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    // ─── 2) configuration & state ────────────────────────────────────
    let config = Configuration::read(&args.config_dir)
        .with_context(|| format!("loading config from `{}`", args.config_dir.display()))?;
    let store = StateStore::new(&args.state_file);
    let mut watermarks = store.load(config.project.default_watermark)?;
    info!(
        path = %store.path().display(),
        countries = watermarks.len(),
        "loaded watermarks"
    );

    // ─── 3) working folder ───────────────────────────────────────────
    let tmp;
    let folder = match &args.output_dir {
        Some(dir) => dir.clone(),
        None => {
            tmp = tempfile::Builder::new()
                .prefix(LOOKUP)
                .tempdir()
                .context("creating temporary folder")?;
            tmp.path().to_path_buf()
        }
    };
    std::fs::create_dir_all(&folder)
        .with_context(|| format!("creating `{}`", folder.display()))?;

    // ─── 4) retriever & catalog ──────────────────────────────────────
    let retriever = Retriever::new(
        FetchMode::from_flags(args.save, args.use_saved),
        &args.saved_dir,
        &config.project.catalog.user_agent,
        config.project.rate_limit.interval(),
    )
    .context("creating retriever")?;
    let mut catalog: Box<dyn Catalog> = if args.dry_run {
        Box::new(DryRunCatalog::new())
    } else {
        Box::new(CkanCatalog::from_env(&config.project.catalog)?)
    };

    // ─── 5) run ──────────────────────────────────────────────────────
    let today = Utc::now().date_naive();
    let mut pipeline = Pipeline::new(&config, retriever, &folder, today);
    let summary = pipeline.run(catalog.as_mut(), &mut watermarks)?;
    info!(
        updated = summary.updated.len(),
        published = summary.published.len(),
        skipped = summary.skipped.len(),
        deleted = summary.deleted.len(),
        "run complete"
    );

    // ─── 6) persist watermarks ───────────────────────────────────────
    store.save(&watermarks)?;
    info!(path = %store.path().display(), "saved watermarks");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{ffi::OsString, fs};
    use tempfile::tempdir;

    fn manifest() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
    }

    #[test]
    fn test_saved_dir_defaults_to_cwd_saved_data() {
        let args = Args::parse_from(["hungermap", "--use-saved"]);
        assert!(args.use_saved);
        assert_eq!(args.saved_dir, PathBuf::from("saved_data"));
        assert_eq!(args.output_dir, None);

        let args = Args::parse_from(["hungermap", "--save", "--saved-dir", "/tmp/bodies"]);
        assert_eq!(args.saved_dir, PathBuf::from("/tmp/bodies"));
    }

    #[test]
    fn test_replay_without_output_dir() {
        let state = tempdir().unwrap();
        let state_file = state.path().join("metric_dates.txt");
        let argv: Vec<OsString> = vec![
            "hungermap".into(),
            "--use-saved".into(),
            "--dry-run".into(),
            "--config-dir".into(),
            manifest().join("config").into_os_string(),
            "--saved-dir".into(),
            manifest().join("tests/fixtures/input").into_os_string(),
            "--state-file".into(),
            state_file.clone().into_os_string(),
        ];

        // fixtures live outside the (temporary) output folder
        run(Args::parse_from(argv)).unwrap();
        let saved = fs::read_to_string(&state_file).unwrap();
        assert!(saved.starts_with("DEFAULT=2022-01-01,"));
        assert!(saved.contains("COD=2023-11-20"));
    }
}
