// src/hungermap/filter.rs

use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

use super::types::CountryRecord;
use crate::history::Watermarks;
use crate::process::date_parser::parse_date;

/// Outcome of comparing the fetched country list against the watermarks.
#[derive(Debug, Default)]
pub struct CountrySelection {
    /// Countries with a release newer than their watermark, keyed by ISO3.
    pub eligible: BTreeMap<String, CountryRecord>,
    /// Every ISO3 present in the fetched list, eligible or not.
    pub shared: BTreeSet<String>,
}

impl CountrySelection {
    /// Whether any watermark moved.
    pub fn updated(&self) -> bool {
        !self.eligible.is_empty()
    }

    pub fn iso3s(&self) -> Vec<String> {
        self.eligible.keys().cloned().collect()
    }
}

/// Keep the countries whose reported date is strictly newer than
/// `watermarks.get(iso3)` and advance their watermark in place.
pub fn select_updated(
    countries: Vec<CountryRecord>,
    watermarks: &mut Watermarks,
) -> CountrySelection {
    let mut selection = CountrySelection::default();
    for country in countries {
        let iso3 = country.country.iso3.trim().to_ascii_uppercase();
        if iso3.is_empty() {
            warn!("skipping country record without ISO3 code");
            continue;
        }
        selection.shared.insert(iso3.clone());

        let Some(date) = parse_date(&country.date) else {
            warn!(iso3 = %iso3, date = %country.date, "unparseable country date, skipping");
            continue;
        };
        if watermarks.advance(&iso3, date) {
            debug!(iso3 = %iso3, %date, "new release");
            selection.eligible.insert(iso3, country);
        } else {
            debug!(iso3 = %iso3, %date, watermark = %watermarks.get(&iso3), "unchanged");
        }
    }
    selection
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hungermap::types::CountryList;
    use chrono::NaiveDate;
    use serde_json::json;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn list() -> Vec<CountryRecord> {
        let body: CountryList = serde_json::from_value(json!({"countries": [
            {"country": {"iso3": "AGO"}, "date": "2023-10-13", "metrics": {}},
            {"country": {"iso3": "BEN"}, "date": "2022-01-11", "metrics": {}},
            {"country": {"iso3": "COD"}, "date": "2023-10-13T00:00:00Z", "metrics": {}},
            {"country": {"iso3": "ETH"}, "date": "2021-06-12", "metrics": {}},
            {"country": {"iso3": "IRQ"}, "date": "not a date", "metrics": {}}
        ]}))
        .unwrap();
        body.countries
    }

    #[test]
    fn test_strictly_newer_than_watermark() {
        let mut w = Watermarks::new(ymd(2022, 1, 1));
        w.advance("AGO", ymd(2023, 10, 13));
        let sel = select_updated(list(), &mut w);

        assert_eq!(sel.iso3s(), vec!["BEN", "COD"]);
        assert!(sel.updated());
        assert_eq!(w.get("BEN"), ymd(2022, 1, 11));
        assert_eq!(w.get("COD"), ymd(2023, 10, 13));
        // skipped ones keep their watermark
        assert_eq!(w.get("AGO"), ymd(2023, 10, 13));
        assert_eq!(w.stored("ETH"), None);
        assert_eq!(w.stored("IRQ"), None);
        assert_eq!(sel.shared.len(), 5);
    }

    #[test]
    fn test_second_pass_selects_nothing() {
        let mut w = Watermarks::new(ymd(2022, 1, 1));
        let first = select_updated(list(), &mut w);
        assert_eq!(first.eligible.len(), 3);
        let snapshot = w.clone();

        let second = select_updated(list(), &mut w);
        assert!(!second.updated());
        assert_eq!(second.shared, first.shared);
        assert_eq!(w, snapshot);
    }
}
