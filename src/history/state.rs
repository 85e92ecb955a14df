use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::process::date_parser::parse_date;

/// Key of the sentinel entry used for countries that were never seen.
pub const DEFAULT_KEY: &str = "DEFAULT";

/// Per-country watermark: the date of the last processed HungerMap release.
///
/// Keys are ISO3 codes. Lookups for unknown countries fall back to the
/// `DEFAULT` date. Entries only ever move forward.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Watermarks {
    default: NaiveDate,
    dates: BTreeMap<String, NaiveDate>,
}

impl Watermarks {
    pub fn new(default: NaiveDate) -> Self {
        Self {
            default,
            dates: BTreeMap::new(),
        }
    }

    pub fn default_date(&self) -> NaiveDate {
        self.default
    }

    /// Watermark for `iso3`, or the `DEFAULT` date when it has none.
    pub fn get(&self, iso3: &str) -> NaiveDate {
        self.dates.get(iso3).copied().unwrap_or(self.default)
    }

    /// Stored watermark for `iso3`, without the `DEFAULT` fallback.
    pub fn stored(&self, iso3: &str) -> Option<NaiveDate> {
        self.dates.get(iso3).copied()
    }

    /// Move the watermark of `iso3` to `date` if `date` is strictly newer.
    /// Returns whether the watermark moved.
    pub fn advance(&mut self, iso3: &str, date: NaiveDate) -> bool {
        if date > self.get(iso3) {
            self.dates.insert(iso3.to_string(), date);
            true
        } else {
            false
        }
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, NaiveDate)> {
        self.dates.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Parse `"DEFAULT=2022-01-01,AGO=2023-10-13"`.
    pub fn from_dates_str(s: &str) -> Result<Self> {
        let mut default = None;
        let mut dates = BTreeMap::new();
        for entry in s.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (key, value) = entry
                .split_once('=')
                .ok_or_else(|| anyhow!("malformed watermark entry `{}`", entry))?;
            let key = key.trim();
            let date = parse_date(value)
                .with_context(|| format!("bad date `{}` for watermark `{}`", value, key))?;
            if key == DEFAULT_KEY {
                default = Some(date);
            } else {
                dates.insert(key.to_string(), date);
            }
        }
        let default =
            default.ok_or_else(|| anyhow!("watermark state has no `{}` entry", DEFAULT_KEY))?;
        Ok(Self { default, dates })
    }

    /// Inverse of [`Watermarks::from_dates_str`]; `DEFAULT` first, then keys sorted.
    pub fn to_dates_str(&self) -> String {
        std::iter::once(format!("{}={}", DEFAULT_KEY, self.default))
            .chain(self.dates.iter().map(|(k, v)| format!("{}={}", k, v)))
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_get_falls_back_to_default() {
        let mut w = Watermarks::new(ymd(2022, 1, 1));
        assert_eq!(w.get("COD"), ymd(2022, 1, 1));
        assert_eq!(w.stored("COD"), None);
        assert!(w.advance("COD", ymd(2023, 10, 13)));
        assert_eq!(w.get("COD"), ymd(2023, 10, 13));
    }

    #[test]
    fn test_advance_is_monotonic() {
        let mut w = Watermarks::new(ymd(2022, 1, 1));
        assert!(w.advance("AGO", ymd(2023, 10, 13)));
        assert!(!w.advance("AGO", ymd(2023, 10, 13)));
        assert!(!w.advance("AGO", ymd(2023, 1, 1)));
        assert_eq!(w.get("AGO"), ymd(2023, 10, 13));
        // not newer than DEFAULT → nothing stored
        assert!(!w.advance("BEN", ymd(2021, 6, 1)));
        assert_eq!(w.stored("BEN"), None);
    }

    #[test]
    fn test_dates_str_roundtrip() {
        let text = "DEFAULT=2022-01-01,ZWE=2023-10-13,AGO=2023-09-03";
        let w = Watermarks::from_dates_str(text).unwrap();
        assert_eq!(w.default_date(), ymd(2022, 1, 1));
        assert_eq!(w.len(), 2);
        assert_eq!(
            w.to_dates_str(),
            "DEFAULT=2022-01-01,AGO=2023-09-03,ZWE=2023-10-13"
        );
    }

    #[test]
    fn test_dates_str_requires_default() {
        assert!(Watermarks::from_dates_str("AGO=2023-09-03").is_err());
        assert!(Watermarks::from_dates_str("DEFAULT=2022-01-01,AGO").is_err());
        assert!(Watermarks::from_dates_str("DEFAULT=yesterday").is_err());
    }
}
