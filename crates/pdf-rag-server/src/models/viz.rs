use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Labels + values chart payload shared by bar, line and pie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_axis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_axis: Option<String>,
}

/// Stacked bar: one value series per named group, all aligned to `labels`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackedBarSpec {
    pub labels: Vec<String>,
    pub groups: BTreeMap<String, Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_axis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_axis: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSpec {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// The one visualization attached to a response. The `chart_type` tag
/// discriminates the payload; downstream code matches on the variant and
/// never re-inspects string tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "chart_type", rename_all = "snake_case")]
pub enum Visualization {
    Bar(ChartSpec),
    Line(ChartSpec),
    Pie(ChartSpec),
    StackedBar(StackedBarSpec),
    Table(TableSpec),
}

impl Visualization {
    pub fn is_table(&self) -> bool {
        matches!(self, Visualization::Table(_))
    }

    /// Build a plain chart variant from its wire tag.
    pub fn chart(chart_type: &str, spec: ChartSpec) -> Option<Self> {
        match chart_type {
            "bar" => Some(Visualization::Bar(spec)),
            "line" => Some(Visualization::Line(spec)),
            "pie" => Some(Visualization::Pie(spec)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chart_type_tag_discriminates() {
        let viz = Visualization::Bar(ChartSpec {
            labels: vec!["Q1".into()],
            values: vec![100.0],
            title: None,
            x_axis: None,
            y_axis: None,
        });
        let json = serde_json::to_value(&viz).unwrap();
        assert_eq!(json["chart_type"], "bar");
        assert_eq!(json["labels"][0], "Q1");
        assert!(json.get("title").is_none());
    }

    #[test]
    fn stacked_bar_uses_snake_case_tag() {
        let viz = Visualization::StackedBar(StackedBarSpec {
            labels: vec!["Cash".into()],
            groups: BTreeMap::from([("Debit".to_string(), vec![10.0])]),
            title: None,
            x_axis: None,
            y_axis: None,
        });
        let json = serde_json::to_value(&viz).unwrap();
        assert_eq!(json["chart_type"], "stacked_bar");
        assert_eq!(json["groups"]["Debit"][0], 10.0);
    }

    #[test]
    fn table_round_trips() {
        let viz = Visualization::Table(TableSpec {
            headers: vec!["Account".into(), "Balance".into()],
            rows: vec![vec!["Cash".into(), "120".into()]],
            title: Some("Balances".into()),
        });
        let json = serde_json::to_string(&viz).unwrap();
        let back: Visualization = serde_json::from_str(&json).unwrap();
        assert_eq!(viz, back);
        assert!(back.is_table());
    }
}
