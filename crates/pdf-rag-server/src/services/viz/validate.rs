use super::financial::StatementKind;
use crate::models::viz::{ChartSpec, StackedBarSpec, TableSpec, Visualization};

/// Schema rules applied to every chart before it may enter a response.
/// Cash-flow charts are exempt from the nonzero rule: zero and negative
/// flows are meaningful there.
pub fn validate_chart(viz: &Visualization, kind: Option<StatementKind>) -> Result<(), String> {
    let allow_all_zero = kind == Some(StatementKind::CashFlow);

    match viz {
        Visualization::Bar(spec) | Visualization::Line(spec) | Visualization::Pie(spec) => {
            validate_series(spec, allow_all_zero)
        }
        Visualization::StackedBar(spec) => validate_stacked(spec, allow_all_zero),
        Visualization::Table(_) => Err("a table is not a chart".to_string()),
    }
}

fn validate_series(spec: &ChartSpec, allow_all_zero: bool) -> Result<(), String> {
    if spec.labels.is_empty() {
        return Err("labels are empty".to_string());
    }
    if spec.values.is_empty() {
        return Err("values are empty".to_string());
    }
    if spec.labels.len() != spec.values.len() {
        return Err(format!(
            "labels/values length mismatch: {} vs {}",
            spec.labels.len(),
            spec.values.len()
        ));
    }
    if spec.values.iter().any(|v| !v.is_finite()) {
        return Err("values contain a non-finite number".to_string());
    }
    if !allow_all_zero && spec.values.iter().all(|v| *v == 0.0) {
        return Err("all values are zero".to_string());
    }
    Ok(())
}

fn validate_stacked(spec: &StackedBarSpec, allow_all_zero: bool) -> Result<(), String> {
    if spec.labels.is_empty() {
        return Err("labels are empty".to_string());
    }
    if spec.groups.is_empty() {
        return Err("groups are empty".to_string());
    }
    for (name, values) in &spec.groups {
        if values.len() != spec.labels.len() {
            return Err(format!(
                "group '{}' length {} does not match {} labels",
                name,
                values.len(),
                spec.labels.len()
            ));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(format!("group '{}' contains a non-finite number", name));
        }
    }
    let all_zero = spec
        .groups
        .values()
        .all(|values| values.iter().all(|v| *v == 0.0));
    if !allow_all_zero && all_zero {
        return Err("all values are zero".to_string());
    }
    Ok(())
}

pub fn validate_table(table: &TableSpec) -> Result<(), String> {
    if table.headers.is_empty() {
        return Err("headers are empty".to_string());
    }
    for (i, row) in table.rows.iter().enumerate() {
        if row.len() != table.headers.len() {
            return Err(format!(
                "row {} has {} cells, expected {}",
                i,
                row.len(),
                table.headers.len()
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn bar(labels: &[&str], values: &[f64]) -> Visualization {
        Visualization::Bar(ChartSpec {
            labels: labels.iter().map(|s| s.to_string()).collect(),
            values: values.to_vec(),
            title: None,
            x_axis: None,
            y_axis: None,
        })
    }

    #[test]
    fn well_formed_bar_passes() {
        assert!(validate_chart(&bar(&["Q1", "Q2"], &[100.0, 115.0]), None).is_ok());
    }

    #[test]
    fn empty_or_mismatched_series_fail() {
        assert!(validate_chart(&bar(&[], &[]), None).is_err());
        assert!(validate_chart(&bar(&["Q1"], &[1.0, 2.0]), None).is_err());
    }

    #[test]
    fn non_finite_values_fail() {
        assert!(validate_chart(&bar(&["Q1"], &[f64::NAN]), None).is_err());
        assert!(validate_chart(&bar(&["Q1"], &[f64::INFINITY]), None).is_err());
    }

    #[test]
    fn all_zero_fails_except_cash_flow() {
        let chart = bar(&["Q1", "Q2"], &[0.0, 0.0]);
        assert!(validate_chart(&chart, None).is_err());
        assert!(validate_chart(&chart, Some(StatementKind::CashFlow)).is_ok());
    }

    #[test]
    fn stacked_groups_must_align_with_labels() {
        let good = Visualization::StackedBar(StackedBarSpec {
            labels: vec!["Cash".into(), "Revenue".into()],
            groups: BTreeMap::from([
                ("Debit".to_string(), vec![100.0, 0.0]),
                ("Credit".to_string(), vec![0.0, 100.0]),
            ]),
            title: None,
            x_axis: None,
            y_axis: None,
        });
        assert!(validate_chart(&good, None).is_ok());

        let bad = Visualization::StackedBar(StackedBarSpec {
            labels: vec!["Cash".into(), "Revenue".into()],
            groups: BTreeMap::from([("Debit".to_string(), vec![100.0])]),
            title: None,
            x_axis: None,
            y_axis: None,
        });
        assert!(validate_chart(&bad, None).is_err());
    }

    #[test]
    fn a_table_is_never_a_valid_chart() {
        let table = Visualization::Table(TableSpec {
            headers: vec!["A".into()],
            rows: vec![vec!["1".into()]],
            title: None,
        });
        assert!(validate_chart(&table, None).is_err());
    }

    #[test]
    fn table_rows_must_match_header_width() {
        let good = TableSpec {
            headers: vec!["Account".into(), "Balance".into()],
            rows: vec![vec!["Cash".into(), "100".into()]],
            title: None,
        };
        assert!(validate_table(&good).is_ok());

        let bad = TableSpec {
            headers: vec!["Account".into(), "Balance".into()],
            rows: vec![vec!["Cash".into()]],
            title: None,
        };
        assert!(validate_table(&bad).is_err());

        let no_headers = TableSpec {
            headers: vec![],
            rows: vec![],
            title: None,
        };
        assert!(validate_table(&no_headers).is_err());
    }
}
