// src/hungermap/types.rs

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

/// Body of `GET <country_url>`.
#[derive(Debug, Clone, Deserialize)]
pub struct CountryList {
    pub countries: Vec<CountryRecord>,
}

/// Latest national observation of one country.
#[derive(Debug, Clone, Deserialize)]
pub struct CountryRecord {
    pub country: CountryInfo,
    pub date: String,
    #[serde(rename = "dataType", default)]
    pub data_type: Option<String>,
    #[serde(default)]
    pub metrics: Metrics,
    /// Filled from the regional endpoint; the global list never carries it.
    #[serde(default)]
    pub regions: Vec<RegionRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CountryInfo {
    pub iso3: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// One observation for a first-level administrative unit.
#[derive(Debug, Clone, Deserialize)]
pub struct RegionRecord {
    pub region: RegionInfo,
    pub date: String,
    #[serde(rename = "dataType", default)]
    pub data_type: Option<String>,
    #[serde(default)]
    pub metrics: Metrics,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegionInfo {
    pub name: String,
    #[serde(default)]
    pub population: Option<Value>,
}

/// The four indicator groups published per row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MetricKey {
    Fcs,
    Rcsi,
    HealthAccess,
    MarketAccess,
}

impl MetricKey {
    pub const ALL: [MetricKey; 4] = [
        MetricKey::Fcs,
        MetricKey::Rcsi,
        MetricKey::HealthAccess,
        MetricKey::MarketAccess,
    ];

    /// Key in the API's `metrics` object.
    pub fn api_key(&self) -> &'static str {
        match self {
            MetricKey::Fcs => "fcs",
            MetricKey::Rcsi => "rcsi",
            MetricKey::HealthAccess => "healthAccess",
            MetricKey::MarketAccess => "marketAccess",
        }
    }

    /// Column label prefix in the output tables.
    pub fn label(&self) -> &'static str {
        match self {
            MetricKey::Fcs => "fcs",
            MetricKey::Rcsi => "rcsi",
            MetricKey::HealthAccess => "health access",
            MetricKey::MarketAccess => "market access",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Metric {
    #[serde(default)]
    pub people: Option<Value>,
    #[serde(default)]
    pub prevalence: Option<Value>,
}

/// Raw `metrics` object; unknown keys are kept but never read.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct Metrics(pub HashMap<String, Option<Metric>>);

impl Metrics {
    /// Metric for `key`; absent or `null` both yield an empty metric.
    pub fn get(&self, key: MetricKey) -> Metric {
        self.0
            .get(key.api_key())
            .cloned()
            .flatten()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_country_record_from_api_shape() {
        let rec: CountryRecord = serde_json::from_value(json!({
            "country": {"id": 1, "name": "Angola", "iso3": "AGO", "iso2": "AO"},
            "date": "2023-10-13",
            "dataType": "PREDICTION",
            "metrics": {
                "fcs": {"people": 5960234, "prevalence": 0.186},
                "rcsi": null
            }
        }))
        .unwrap();
        assert_eq!(rec.country.iso3, "AGO");
        assert_eq!(rec.data_type.as_deref(), Some("PREDICTION"));
        assert!(rec.regions.is_empty());
        assert_eq!(rec.metrics.get(MetricKey::Fcs).people, Some(json!(5960234)));
        assert!(rec.metrics.get(MetricKey::Rcsi).people.is_none());
        assert!(rec.metrics.get(MetricKey::MarketAccess).prevalence.is_none());
    }

    #[test]
    fn test_region_record() {
        let rec: RegionRecord = serde_json::from_value(json!({
            "region": {"id": 9, "name": "Kinshasa", "population": 17071000},
            "date": "2023-11-20",
            "dataType": "SURVEY",
            "metrics": {"healthAccess": {}}
        }))
        .unwrap();
        assert_eq!(rec.region.name, "Kinshasa");
        assert_eq!(rec.region.population, Some(json!(17071000)));
        let m = rec.metrics.get(MetricKey::HealthAccess);
        assert!(m.people.is_none() && m.prevalence.is_none());
    }
}
