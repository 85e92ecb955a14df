// src/dataset/quickcharts.rs

use serde::Serialize;
use serde_json::json;

use crate::config::ResourceViewTemplate;
use crate::process::Row;

pub const BITE_COUNT: usize = 3;

/// Columns each quick chart needs, in bite order: national FCS trend,
/// national rCSI trend, FCS people grouped by first-level admin unit.
const BITE_COLUMNS: [&[&str]; BITE_COUNT] = [
    &["fcs prevalence"],
    &["rcsi prevalence"],
    &["adminone", "fcs people"],
];

/// Which quick charts have nothing to show.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BitesDisabled(pub [bool; BITE_COUNT]);

impl BitesDisabled {
    /// A chart is disabled unless some data row has every one of its
    /// columns filled.
    pub fn from_rows(data_rows: &[Row]) -> Self {
        Self(BITE_COLUMNS.map(|cols| {
            !data_rows.iter().any(|row| {
                cols.iter()
                    .all(|col| row.column(col).is_some_and(|v| !v.is_empty()))
            })
        }))
    }

    pub fn all(&self) -> bool {
        self.0.iter().all(|d| *d)
    }
}

/// HXL preview resource view attached to the short-format resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceView {
    pub title: String,
    pub description: String,
    pub view_type: String,
    pub hxl_preview_config: String,
}

/// Quick-chart view with the disabled bites removed; `None` when every bite
/// is disabled.
pub fn quickchart_view(
    template: &ResourceViewTemplate,
    disabled: BitesDisabled,
) -> Option<ResourceView> {
    if disabled.all() {
        return None;
    }
    let bites: Vec<&serde_json::Value> = template
        .bites
        .iter()
        .zip(disabled.0)
        .filter(|(_, off)| !off)
        .map(|(bite, _)| bite)
        .collect();
    let config = json!({
        "configVersion": 5,
        "bites": bites,
        "recipeUrl": "https://raw.githubusercontent.com/mcarans/hxl-recipes/dev/recipes/generic-charts/recipe.json",
    });
    Some(ResourceView {
        title: template.title.clone(),
        description: template.description.clone(),
        view_type: template.view_type.clone(),
        hxl_preview_config: config.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(adminone: &str, fcs: &str, rcsi: &str) -> Row {
        Row {
            adminone: adminone.into(),
            fcs_people: if fcs.is_empty() { "" } else { "1000" }.into(),
            fcs_prevalence: fcs.into(),
            rcsi_prevalence: rcsi.into(),
            ..Row::default()
        }
    }

    fn template() -> ResourceViewTemplate {
        ResourceViewTemplate {
            title: "Quick Charts".into(),
            description: "".into(),
            view_type: "hdx_hxl_preview".into(),
            bites: vec![json!({"n": 0}), json!({"n": 1}), json!({"n": 2})],
        }
    }

    #[test]
    fn test_all_enabled() {
        let rows = vec![row("", "0.2", "0.3"), row("Kinshasa", "0.1", "")];
        assert_eq!(BitesDisabled::from_rows(&rows), BitesDisabled([false; 3]));
    }

    #[test]
    fn test_national_only_disables_subnational_bite() {
        let rows = vec![row("", "0.2", "")];
        let disabled = BitesDisabled::from_rows(&rows);
        assert_eq!(disabled, BitesDisabled([false, true, true]));

        let view = quickchart_view(&template(), disabled).unwrap();
        let cfg: serde_json::Value = serde_json::from_str(&view.hxl_preview_config).unwrap();
        assert_eq!(cfg["bites"], json!([{"n": 0}]));
    }

    #[test]
    fn test_regional_chart_needs_fcs_people() {
        let mut kinshasa = row("Kinshasa", "0.1", "0.2");
        kinshasa.fcs_people.clear();
        let rows = vec![row("", "0.2", "0.3"), kinshasa];
        assert_eq!(
            BitesDisabled::from_rows(&rows),
            BitesDisabled([false, false, true])
        );

        // people without a region name do not count either
        let rows = vec![row("", "0.2", "0.3")];
        assert_eq!(rows[0].fcs_people, "1000");
        assert!(BitesDisabled::from_rows(&rows).0[2]);
    }

    #[test]
    fn test_no_view_when_everything_disabled() {
        let disabled = BitesDisabled::from_rows(&[]);
        assert!(disabled.all());
        assert_eq!(quickchart_view(&template(), disabled), None);
    }
}
