// src/process/long.rs

use serde::Serialize;

use super::rows::{Row, HXL_TAGS};
use crate::hungermap::MetricKey;

/// Column name → HXL tag of the long-format table.
pub const LONG_HXL_TAGS: [(&str, &str); 10] = [
    HXL_TAGS[0],
    HXL_TAGS[1],
    HXL_TAGS[2],
    HXL_TAGS[3],
    HXL_TAGS[4],
    HXL_TAGS[5],
    HXL_TAGS[6],
    ("indicator", "#indicator+name"),
    ("people", "#population+num"),
    ("prevalence", "#indicator+prevalence"),
];

/// One metric of one short-format row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LongRow {
    pub countrycode: String,
    pub countryname: String,
    pub adminone: String,
    pub adminlevel: String,
    pub population: String,
    pub date: String,
    pub datatype: String,
    pub indicator: String,
    pub people: String,
    pub prevalence: String,
}

impl LongRow {
    pub fn hxl_tags() -> Self {
        let tag = |i: usize| LONG_HXL_TAGS[i].1.to_string();
        LongRow {
            countrycode: tag(0),
            countryname: tag(1),
            adminone: tag(2),
            adminlevel: tag(3),
            population: tag(4),
            date: tag(5),
            datatype: tag(6),
            indicator: tag(7),
            people: tag(8),
            prevalence: tag(9),
        }
    }
}

/// Unpivot short-format data rows: one long row per metric that has a
/// people count or a prevalence. The tag row comes first.
pub fn to_long(data_rows: &[Row]) -> Vec<LongRow> {
    let mut out = vec![LongRow::hxl_tags()];
    for row in data_rows {
        for key in MetricKey::ALL {
            let (people, prevalence) = row.metric(key);
            if people.is_empty() && prevalence.is_empty() {
                continue;
            }
            out.push(LongRow {
                countrycode: row.countrycode.clone(),
                countryname: row.countryname.clone(),
                adminone: row.adminone.clone(),
                adminlevel: row.adminlevel.clone(),
                population: row.population.clone(),
                date: row.date.clone(),
                datatype: row.datatype.clone(),
                indicator: key.label().to_string(),
                people: people.to_string(),
                prevalence: prevalence.to_string(),
            });
        }
    }
    out
}
