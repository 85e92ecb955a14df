// src/process/rows.rs

use chrono::{Months, NaiveDate};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::date_parser::parse_date;
use super::utils::cell;
use crate::hungermap::{CountryRecord, MetricKey, Metrics};

/// Column name → HXL tag, in output order.
pub const HXL_TAGS: [(&str, &str); 15] = [
    ("countrycode", "#country+code"),
    ("countryname", "#country+name"),
    ("adminone", "#adm1+name"),
    ("adminlevel", "#meta+adminlevel"),
    ("population", "#population+total"),
    ("date", "#date"),
    ("datatype", "#data+type"),
    ("fcs people", "#population+fcs"),
    ("fcs prevalence", "#indicator+fcs+prevalence"),
    ("rcsi people", "#population+rcsi"),
    ("rcsi prevalence", "#indicator+rcsi+prevalence"),
    ("health access people", "#population+health_access"),
    ("health access prevalence", "#indicator+health_access+prevalence"),
    ("market access people", "#population+market_access"),
    ("market access prevalence", "#indicator+market_access+prevalence"),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdminLevel {
    National,
    Subnational,
}

impl AdminLevel {
    /// National when no admin-one name is given.
    pub fn for_adminone(adminone: &str) -> Self {
        if adminone.is_empty() {
            AdminLevel::National
        } else {
            AdminLevel::Subnational
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AdminLevel::National => "national",
            AdminLevel::Subnational => "subnational",
        }
    }
}

/// One line of the short-format table. Every field is text so the HXL tag
/// row fits the same shape as the data rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Row {
    pub countrycode: String,
    pub countryname: String,
    pub adminone: String,
    pub adminlevel: String,
    pub population: String,
    pub date: String,
    pub datatype: String,
    #[serde(rename = "fcs people")]
    pub fcs_people: String,
    #[serde(rename = "fcs prevalence")]
    pub fcs_prevalence: String,
    #[serde(rename = "rcsi people")]
    pub rcsi_people: String,
    #[serde(rename = "rcsi prevalence")]
    pub rcsi_prevalence: String,
    #[serde(rename = "health access people")]
    pub health_access_people: String,
    #[serde(rename = "health access prevalence")]
    pub health_access_prevalence: String,
    #[serde(rename = "market access people")]
    pub market_access_people: String,
    #[serde(rename = "market access prevalence")]
    pub market_access_prevalence: String,
}

impl Row {
    /// The HXL tag row.
    pub fn hxl_tags() -> Self {
        let [
            countrycode,
            countryname,
            adminone,
            adminlevel,
            population,
            date,
            datatype,
            fcs_people,
            fcs_prevalence,
            rcsi_people,
            rcsi_prevalence,
            health_access_people,
            health_access_prevalence,
            market_access_people,
            market_access_prevalence,
        ] = HXL_TAGS.map(|(_, tag)| tag.to_string());
        Row {
            countrycode,
            countryname,
            adminone,
            adminlevel,
            population,
            date,
            datatype,
            fcs_people,
            fcs_prevalence,
            rcsi_people,
            rcsi_prevalence,
            health_access_people,
            health_access_prevalence,
            market_access_people,
            market_access_prevalence,
        }
    }

    /// Field values in [`HXL_TAGS`] order.
    pub fn values(&self) -> [&str; 15] {
        [
            self.countrycode.as_str(),
            self.countryname.as_str(),
            self.adminone.as_str(),
            self.adminlevel.as_str(),
            self.population.as_str(),
            self.date.as_str(),
            self.datatype.as_str(),
            self.fcs_people.as_str(),
            self.fcs_prevalence.as_str(),
            self.rcsi_people.as_str(),
            self.rcsi_prevalence.as_str(),
            self.health_access_people.as_str(),
            self.health_access_prevalence.as_str(),
            self.market_access_people.as_str(),
            self.market_access_prevalence.as_str(),
        ]
    }

    /// Value of the column called `name` (e.g. `"fcs prevalence"`).
    pub fn column(&self, name: &str) -> Option<&str> {
        HXL_TAGS
            .iter()
            .position(|(col, _)| *col == name)
            .map(|i| self.values()[i])
    }

    /// `(people, prevalence)` of one metric group.
    pub fn metric(&self, key: MetricKey) -> (&str, &str) {
        let (people, prevalence) = match key {
            MetricKey::Fcs => (&self.fcs_people, &self.fcs_prevalence),
            MetricKey::Rcsi => (&self.rcsi_people, &self.rcsi_prevalence),
            MetricKey::HealthAccess => {
                (&self.health_access_people, &self.health_access_prevalence)
            }
            MetricKey::MarketAccess => {
                (&self.market_access_people, &self.market_access_prevalence)
            }
        };
        (people.as_str(), prevalence.as_str())
    }
}

/* ───────────────────── reference period ───────────────────── */

/// Earliest and latest date seen while building rows.
///
/// Starts at (`NaiveDate::MAX`, `NaiveDate::MIN`) and narrows with strict
/// comparisons; until the first observation it is empty.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReferencePeriod {
    pub earliest: NaiveDate,
    pub latest: NaiveDate,
}

impl Default for ReferencePeriod {
    fn default() -> Self {
        Self {
            earliest: NaiveDate::MAX,
            latest: NaiveDate::MIN,
        }
    }
}

impl ReferencePeriod {
    pub fn observe(&mut self, date: NaiveDate) {
        if date < self.earliest {
            self.earliest = date;
        }
        if date > self.latest {
            self.latest = date;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.earliest > self.latest
    }

    /// `(earliest, latest)` once at least one date was observed.
    pub fn bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        (!self.is_empty()).then_some((self.earliest, self.latest))
    }
}

/* ───────────────────── lookback window ───────────────────── */

/// Inclusive date range of observations to publish.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LookbackWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl LookbackWindow {
    /// `[today - months, today]`.
    pub fn trailing_months(today: NaiveDate, months: u32) -> Self {
        let start = today
            .checked_sub_months(Months::new(months))
            .unwrap_or(NaiveDate::MIN);
        Self { start, end: today }
    }

    /// One year ending at `today`.
    pub fn one_year(today: NaiveDate) -> Self {
        Self::trailing_months(today, 12)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/* ─────────────────────── row building ─────────────────────── */

/// Rows of one country: HXL tag row first, then data rows.
#[derive(Debug, Clone)]
pub struct CountryRows {
    pub country_name: String,
    pub rows: Vec<Row>,
    pub period: ReferencePeriod,
    pub has_subnational: bool,
}

impl CountryRows {
    /// Everything after the tag row.
    pub fn data_rows(&self) -> &[Row] {
        self.rows.get(1..).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.data_rows().is_empty()
    }
}

/// Accumulates rows for one country.
pub struct RowBuilder<'a> {
    iso3: &'a str,
    country_name: &'a str,
    window: LookbackWindow,
    out: CountryRows,
}

impl<'a> RowBuilder<'a> {
    pub fn new(iso3: &'a str, country_name: &'a str, window: LookbackWindow) -> Self {
        Self {
            iso3,
            country_name,
            window,
            out: CountryRows {
                country_name: country_name.to_string(),
                rows: vec![Row::hxl_tags()],
                period: ReferencePeriod::default(),
                has_subnational: false,
            },
        }
    }

    /// Add one observation. Returns whether a row was emitted; records with
    /// an unparseable date or a date outside the window are dropped.
    pub fn push(
        &mut self,
        date: &str,
        data_type: Option<&str>,
        metrics: &Metrics,
        adminone: &str,
        population: Option<&Value>,
    ) -> bool {
        let Some(parsed) = parse_date(date) else {
            warn!(iso3 = %self.iso3, adminone, date, "unparseable date, dropping record");
            return false;
        };
        if !self.window.contains(parsed) {
            debug!(iso3 = %self.iso3, adminone, %parsed, "outside lookback window");
            return false;
        }
        self.out.period.observe(parsed);

        let level = AdminLevel::for_adminone(adminone);
        if level == AdminLevel::Subnational {
            self.out.has_subnational = true;
        }
        let fcs = metrics.get(MetricKey::Fcs);
        let rcsi = metrics.get(MetricKey::Rcsi);
        let health = metrics.get(MetricKey::HealthAccess);
        let market = metrics.get(MetricKey::MarketAccess);

        self.out.rows.push(Row {
            countrycode: self.iso3.to_string(),
            countryname: self.country_name.to_string(),
            adminone: adminone.to_string(),
            adminlevel: level.as_str().to_string(),
            population: cell(population),
            date: parsed.format("%Y-%m-%d").to_string(),
            datatype: data_type.unwrap_or_default().to_string(),
            fcs_people: cell(fcs.people.as_ref()),
            fcs_prevalence: cell(fcs.prevalence.as_ref()),
            rcsi_people: cell(rcsi.people.as_ref()),
            rcsi_prevalence: cell(rcsi.prevalence.as_ref()),
            health_access_people: cell(health.people.as_ref()),
            health_access_prevalence: cell(health.prevalence.as_ref()),
            market_access_people: cell(market.people.as_ref()),
            market_access_prevalence: cell(market.prevalence.as_ref()),
        });
        true
    }

    pub fn finish(self) -> CountryRows {
        self.out
    }
}

/// National row from the country's own metrics, then one subnational row per
/// attached region record. Every row is labelled with `iso3`, not the code
/// as the API spelled it.
pub fn build_rows(
    iso3: &str,
    country: &CountryRecord,
    country_name: &str,
    window: LookbackWindow,
) -> CountryRows {
    let mut builder = RowBuilder::new(iso3, country_name, window);
    builder.push(
        &country.date,
        country.data_type.as_deref(),
        &country.metrics,
        "",
        None,
    );
    for region in &country.regions {
        builder.push(
            &region.date,
            region.data_type.as_deref(),
            &region.metrics,
            &region.region.name,
            region.region.population.as_ref(),
        );
    }
    builder.finish()
}
