use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::models::viz::{ChartSpec, StackedBarSpec, TableSpec, Visualization};

static NUMERIC_CLEANUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"[$€£,%\s]").expect("static regex"));

/// Parse a table cell as a number, tolerating currency symbols, thousands
/// separators, percent signs and accounting-style parentheses negatives.
pub(super) fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let negative = trimmed.starts_with('(') && trimmed.ends_with(')');
    let inner = trimmed.trim_matches(|c| c == '(' || c == ')');
    let cleaned = NUMERIC_CLEANUP.replace_all(inner, "");
    cleaned
        .parse::<f64>()
        .ok()
        .map(|v| if negative { -v } else { v })
}

pub(super) fn value_to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_number(s),
        _ => None,
    }
}

pub(super) fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Rule-based table → chart coercion for the chart-requested contract.
/// Predicates run in a fixed order; the first that applies wins:
/// Debit/Credit columns → stacked_bar, a single numeric column → bar,
/// Assets/Liabilities/Equity categories → pie.
pub fn table_to_chart(table: &TableSpec) -> Option<Visualization> {
    if table.headers.is_empty() || table.rows.is_empty() {
        return None;
    }

    debit_credit_stacked(table)
        .or_else(|| single_numeric_bar(table))
        .or_else(|| category_pie(table))
}

fn numeric_columns(table: &TableSpec) -> Vec<usize> {
    (0..table.headers.len())
        .filter(|&col| {
            let mut seen = false;
            for row in &table.rows {
                let cell = row.get(col).map(String::as_str).unwrap_or("");
                if cell.trim().is_empty() {
                    continue;
                }
                if parse_number(cell).is_none() {
                    return false;
                }
                seen = true;
            }
            seen
        })
        .collect()
}

fn label_column(table: &TableSpec, numeric: &[usize]) -> Option<usize> {
    (0..table.headers.len()).find(|col| !numeric.contains(col))
}

fn column_values(table: &TableSpec, col: usize) -> Vec<f64> {
    table
        .rows
        .iter()
        .map(|row| {
            row.get(col)
                .and_then(|cell| parse_number(cell))
                .unwrap_or(0.0)
        })
        .collect()
}

fn column_labels(table: &TableSpec, col: Option<usize>) -> Vec<String> {
    match col {
        Some(col) => table
            .rows
            .iter()
            .map(|row| row.get(col).cloned().unwrap_or_default())
            .collect(),
        None => (1..=table.rows.len()).map(|i| i.to_string()).collect(),
    }
}

fn debit_credit_stacked(table: &TableSpec) -> Option<Visualization> {
    let numeric = numeric_columns(table);
    let find = |name: &str| {
        table
            .headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
            .filter(|col| numeric.contains(col))
    };
    let debit_col = find("debit")?;
    let credit_col = find("credit")?;

    let label_col = label_column(table, &numeric);
    let labels = column_labels(table, label_col);

    Some(Visualization::StackedBar(StackedBarSpec {
        labels,
        groups: BTreeMap::from([
            ("Debit".to_string(), column_values(table, debit_col)),
            ("Credit".to_string(), column_values(table, credit_col)),
        ]),
        title: table.title.clone(),
        x_axis: label_col.map(|col| table.headers[col].clone()),
        y_axis: None,
    }))
}

fn single_numeric_bar(table: &TableSpec) -> Option<Visualization> {
    let numeric = numeric_columns(table);
    if numeric.len() != 1 {
        return None;
    }
    let value_col = numeric[0];
    let label_col = label_column(table, &numeric);

    Some(Visualization::Bar(ChartSpec {
        labels: column_labels(table, label_col),
        values: column_values(table, value_col),
        title: table.title.clone(),
        x_axis: label_col.map(|col| table.headers[col].clone()),
        y_axis: Some(table.headers[value_col].clone()),
    }))
}

fn category_pie(table: &TableSpec) -> Option<Visualization> {
    let numeric = numeric_columns(table);
    let value_col = *numeric.first()?;
    let label_col = label_column(table, &numeric)?;

    let categories = ["assets", "liabilities", "equity"];
    let labels = column_labels(table, Some(label_col));
    let all_match = !labels.is_empty()
        && labels
            .iter()
            .all(|label| categories.contains(&label.trim().to_lowercase().as_str()));
    if !all_match {
        return None;
    }

    Some(Visualization::Pie(ChartSpec {
        labels,
        values: column_values(table, value_col),
        title: table.title.clone(),
        x_axis: None,
        y_axis: Some(table.headers[value_col].clone()),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(headers: &[&str], rows: &[&[&str]]) -> TableSpec {
        TableSpec {
            headers: headers.iter().map(|s| s.to_string()).collect(),
            rows: rows
                .iter()
                .map(|row| row.iter().map(|s| s.to_string()).collect())
                .collect(),
            title: None,
        }
    }

    #[test]
    fn parses_formatted_numbers() {
        assert_eq!(parse_number("1,234.50"), Some(1234.5));
        assert_eq!(parse_number("$ 100"), Some(100.0));
        assert_eq!(parse_number("(250)"), Some(-250.0));
        assert_eq!(parse_number("12%"), Some(12.0));
        assert_eq!(parse_number("Cash"), None);
        assert_eq!(parse_number(""), None);
    }

    #[test]
    fn debit_credit_table_becomes_stacked_bar() {
        let t = table(
            &["Account", "Debit", "Credit"],
            &[&["Cash", "100", "0"], &["Revenue", "0", "100"]],
        );
        match table_to_chart(&t) {
            Some(Visualization::StackedBar(spec)) => {
                assert_eq!(spec.labels, vec!["Cash", "Revenue"]);
                assert_eq!(spec.groups["Debit"], vec![100.0, 0.0]);
                assert_eq!(spec.groups["Credit"], vec![0.0, 100.0]);
            }
            other => panic!("expected stacked bar, got {:?}", other),
        }
    }

    #[test]
    fn single_numeric_column_becomes_bar() {
        let t = table(
            &["Quarter", "Revenue"],
            &[&["Q1", "100"], &["Q2", "115"], &["Q3", "132"]],
        );
        match table_to_chart(&t) {
            Some(Visualization::Bar(spec)) => {
                assert_eq!(spec.labels, vec!["Q1", "Q2", "Q3"]);
                assert_eq!(spec.values, vec![100.0, 115.0, 132.0]);
                assert_eq!(spec.y_axis.as_deref(), Some("Revenue"));
            }
            other => panic!("expected bar, got {:?}", other),
        }
    }

    #[test]
    fn balance_sheet_categories_become_pie() {
        let t = table(
            &["Category", "Amount", "Pct"],
            &[
                &["Assets", "500", "50"],
                &["Liabilities", "300", "30"],
                &["Equity", "200", "20"],
            ],
        );
        match table_to_chart(&t) {
            Some(Visualization::Pie(spec)) => {
                assert_eq!(spec.labels, vec!["Assets", "Liabilities", "Equity"]);
                assert_eq!(spec.values, vec![500.0, 300.0, 200.0]);
            }
            other => panic!("expected pie, got {:?}", other),
        }
    }

    #[test]
    fn non_numeric_table_has_no_conversion() {
        let t = table(&["Name", "Notes"], &[&["Alice", "prose"], &["Bob", "words"]]);
        assert!(table_to_chart(&t).is_none());
    }

    #[test]
    fn predicate_order_prefers_debit_credit() {
        // Debit/Credit present AND exactly one numeric column elsewhere
        // would also satisfy bar; the stacked predicate must win.
        let t = table(
            &["Account", "Debit", "Credit"],
            &[&["Cash", "100", "50"]],
        );
        assert!(matches!(
            table_to_chart(&t),
            Some(Visualization::StackedBar(_))
        ));
    }
}
