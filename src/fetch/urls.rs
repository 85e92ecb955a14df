// src/fetch/urls.rs

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9]+").unwrap());

/// `<country_url>/<ISO3>/region?date_start=<start>&date_end=<end>`
pub fn region_url(country_url: &Url, iso3: &str, start: NaiveDate, end: NaiveDate) -> Url {
    let mut url = country_url.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().push(iso3).push("region");
    }
    url.query_pairs_mut()
        .clear()
        .append_pair("date_start", &start.to_string())
        .append_pair("date_end", &end.to_string());
    url
}

/// File name under which the body of `url` is saved / replayed.
///
/// Path and query with every run of non-alphanumerics collapsed to `_`,
/// e.g. `v1_foodsecurity_country_COD_region_date_start_2023_07_05_...json`.
pub fn saved_filename(url: &Url) -> String {
    let mut raw = url.path().to_string();
    if let Some(q) = url.query() {
        raw.push('_');
        raw.push_str(q);
    }
    let stem = NON_ALNUM.replace_all(&raw, "_");
    let stem = stem.trim_matches('_');
    if stem.is_empty() {
        "index.json".to_string()
    } else {
        format!("{}.json", stem)
    }
}
