use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

use super::convert::{value_to_f64, value_to_string};
use super::financial::{preferred_chart, StatementKind};
use super::intent::VizIntent;
use super::validate::{validate_chart, validate_table};
use crate::models::viz::{ChartSpec, StackedBarSpec, TableSpec, Visualization};
use crate::services::chat_service::{ChatProvider, PromptMessage};
use crate::utils::error::ApiError;
use crate::utils::json::extract_first_json_object;

const EXTRACT_MAX_TOKENS: usize = 700;

/// What structured extraction produced: an already-validated chart, or a
/// table form the caller may still coerce.
#[derive(Debug)]
pub enum Extracted {
    Chart(Visualization),
    Table(TableSpec),
}

/// Untrusted LLM output shape; every field is optional and re-validated.
#[derive(Debug, Deserialize)]
struct RawViz {
    chart_type: Option<String>,
    labels: Option<Vec<String>>,
    values: Option<Vec<Value>>,
    groups: Option<BTreeMap<String, Vec<Value>>>,
    title: Option<String>,
    x_axis: Option<String>,
    y_axis: Option<String>,
    headers: Option<Vec<String>>,
    rows: Option<Vec<Vec<Value>>>,
}

/// Temperature-0 structured-data extraction with one stricter retry.
pub struct VizExtractor {
    chat: Arc<dyn ChatProvider>,
}

impl VizExtractor {
    pub fn new(chat: Arc<dyn ChatProvider>) -> Self {
        Self { chat }
    }

    pub async fn extract(
        &self,
        question: &str,
        context: &str,
        intent: VizIntent,
        kind: Option<StatementKind>,
    ) -> Result<Extracted, ApiError> {
        for attempt in 0..2 {
            let messages = build_prompt(question, context, intent, kind, attempt > 0);
            let completion = self.chat.complete(&messages, EXTRACT_MAX_TOKENS).await?;

            match parse_extraction(&completion, kind) {
                Ok(extracted) => return Ok(extracted),
                Err(e) => warn!("Extraction attempt {} rejected: {}", attempt + 1, e),
            }
        }

        Err(ApiError::InternalError(
            "visualization extraction failed after retry".to_string(),
        ))
    }
}

fn build_prompt(
    question: &str,
    context: &str,
    intent: VizIntent,
    kind: Option<StatementKind>,
    strict: bool,
) -> Vec<PromptMessage> {
    let wanted = if intent == VizIntent::Table { "table" } else { "chart" };

    let mut system = format!(
        "Extract the structured data needed for a {} from the context below. \
         Output ONLY a JSON object, no prose and no code fences.\n\
         Chart form: {{\"chart_type\": \"bar\"|\"line\"|\"pie\"|\"stacked_bar\", \
         \"labels\": [..], \"values\": [..], optional \"groups\": {{name: [..]}}, \
         optional \"title\", \"x_axis\", \"y_axis\"}}.\n\
         Table form: {{\"headers\": [..], \"rows\": [[..], ..]}}.\n\
         Every number must appear in the context; never invent data.",
        wanted
    );
    if let Some(kind) = kind {
        system.push_str(&format!(
            "\nThe context is a financial statement; prefer chart_type \"{}\".",
            preferred_chart(kind)
        ));
    }
    if strict {
        system.push_str(
            "\nYour previous output was invalid. Return strictly valid JSON matching \
             one of the forms above, with non-empty labels and values of equal length.",
        );
    }

    vec![
        PromptMessage::system(system),
        PromptMessage::user(format!("Context:\n{}\n\nQuestion: {}", context, question)),
    ]
}

/// Parse + validate one completion. Errors describe what to fix so the
/// stricter retry prompt stays honest.
fn parse_extraction(completion: &str, kind: Option<StatementKind>) -> Result<Extracted, String> {
    let json = extract_first_json_object(completion).ok_or("no JSON object in completion")?;
    let raw: RawViz = serde_json::from_str(json).map_err(|e| format!("malformed JSON: {}", e))?;

    let has_table_shape = raw.headers.is_some() || raw.rows.is_some();
    let has_chart_shape =
        raw.labels.is_some() || raw.values.is_some() || raw.chart_type.is_some();

    if has_table_shape && !has_chart_shape {
        let table = TableSpec {
            headers: raw.headers.unwrap_or_default(),
            rows: raw
                .rows
                .unwrap_or_default()
                .iter()
                .map(|row| row.iter().map(value_to_string).collect())
                .collect(),
            title: raw.title,
        };
        validate_table(&table)?;
        return Ok(Extracted::Table(table));
    }

    if !has_chart_shape {
        return Err("neither chart nor table shape present".to_string());
    }

    let labels = raw.labels.unwrap_or_default();
    let has_groups = raw.groups.as_ref().map(|g| !g.is_empty()).unwrap_or(false);

    // Financial normalization runs before validation; a stacked preference
    // without group data falls back to whatever the model declared.
    let chart_type = match kind.map(preferred_chart) {
        Some("stacked_bar") if has_groups => "stacked_bar".to_string(),
        Some("stacked_bar") | None => raw.chart_type.clone().unwrap_or_default(),
        Some(preferred) => preferred.to_string(),
    };

    let viz = if chart_type == "stacked_bar" {
        let mut groups = BTreeMap::new();
        for (name, values) in raw.groups.unwrap_or_default() {
            let numbers = values
                .iter()
                .map(value_to_f64)
                .collect::<Option<Vec<f64>>>()
                .ok_or_else(|| format!("group '{}' holds a non-numeric value", name))?;
            groups.insert(name, numbers);
        }
        Visualization::StackedBar(StackedBarSpec {
            labels,
            groups,
            title: raw.title,
            x_axis: raw.x_axis,
            y_axis: raw.y_axis,
        })
    } else {
        let values = raw
            .values
            .unwrap_or_default()
            .iter()
            .map(value_to_f64)
            .collect::<Option<Vec<f64>>>()
            .ok_or("values hold a non-numeric entry")?;
        let spec = ChartSpec {
            labels,
            values,
            title: raw.title,
            x_axis: raw.x_axis,
            y_axis: raw.y_axis,
        };
        Visualization::chart(&chart_type, spec)
            .ok_or_else(|| format!("unknown chart_type '{}'", chart_type))?
    };

    validate_chart(&viz, kind)?;
    Ok(Extracted::Chart(viz))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_chart_with_noise_parses() {
        let completion = r#"Sure! {"chart_type":"bar","labels":["Q1","Q2","Q3","Q4"],
            "values":[100,115,132,148],"title":"Quarterly Revenue"}"#;
        match parse_extraction(completion, None).unwrap() {
            Extracted::Chart(Visualization::Bar(spec)) => {
                assert_eq!(spec.labels, vec!["Q1", "Q2", "Q3", "Q4"]);
                assert_eq!(spec.values, vec![100.0, 115.0, 132.0, 148.0]);
            }
            other => panic!("expected bar chart, got {:?}", other),
        }
    }

    #[test]
    fn numeric_strings_are_coerced() {
        let completion = r#"{"chart_type":"bar","labels":["Q1"],"values":["1,200.50"]}"#;
        match parse_extraction(completion, None).unwrap() {
            Extracted::Chart(Visualization::Bar(spec)) => {
                assert_eq!(spec.values, vec![1200.5]);
            }
            other => panic!("expected bar chart, got {:?}", other),
        }
    }

    #[test]
    fn table_form_passes_through() {
        let completion = r#"{"headers":["Account","Debit","Credit"],
            "rows":[["Cash",100,0],["Revenue",0,100]]}"#;
        match parse_extraction(completion, None).unwrap() {
            Extracted::Table(table) => {
                assert_eq!(table.headers.len(), 3);
                assert_eq!(table.rows[0], vec!["Cash", "100", "0"]);
            }
            other => panic!("expected table, got {:?}", other),
        }
    }

    #[test]
    fn stacked_bar_requires_groups() {
        let completion = r#"{"chart_type":"stacked_bar","labels":["Cash"],
            "groups":{"Debit":[100],"Credit":[0]}}"#;
        assert!(matches!(
            parse_extraction(completion, None).unwrap(),
            Extracted::Chart(Visualization::StackedBar(_))
        ));

        let missing = r#"{"chart_type":"stacked_bar","labels":["Cash"]}"#;
        assert!(parse_extraction(missing, None).is_err());
    }

    #[test]
    fn balance_sheet_kind_forces_pie() {
        let completion = r#"{"chart_type":"bar","labels":["Assets","Liabilities","Equity"],
            "values":[500,300,200]}"#;
        match parse_extraction(completion, Some(StatementKind::BalanceSheet)).unwrap() {
            Extracted::Chart(Visualization::Pie(spec)) => {
                assert_eq!(spec.values, vec![500.0, 300.0, 200.0]);
            }
            other => panic!("expected pie, got {:?}", other),
        }
    }

    #[test]
    fn garbage_and_empty_shapes_are_rejected() {
        assert!(parse_extraction("no json at all", None).is_err());
        assert!(parse_extraction(r#"{"chart_type":"bar","labels":[],"values":[]}"#, None).is_err());
        assert!(parse_extraction(r#"{"chart_type":"donut","labels":["a"],"values":[1]}"#, None)
            .is_err());
    }
}
