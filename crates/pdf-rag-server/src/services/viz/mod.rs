pub mod convert;
pub mod extractor;
pub mod financial;
pub mod intent;
pub mod validate;

use std::sync::Arc;
use tracing::{info, warn};

use crate::models::viz::Visualization;
use crate::services::chat_service::ChatProvider;
use extractor::{Extracted, VizExtractor};
use intent::{IntentClassifier, VizIntent};

/// The exact answer text when a requested chart cannot be produced.
pub const NO_CHART_DATA: &str = "No structured financial data available to generate a chart.";

/// Pipeline verdict for one question.
#[derive(Debug)]
pub enum VizOutcome {
    /// No visualization was requested (or a table path recovered by
    /// omitting it).
    None,
    /// A validated chart or table.
    Ready(Visualization),
    /// Chart requested but nothing producible; the response must carry
    /// `NO_CHART_DATA` and a null visualization, never a table.
    ChartUnavailable,
}

/// Intent classification → extraction → normalization → validation, with
/// the chart-requested hard contract enforced at the end.
pub struct VizPipeline {
    classifier: IntentClassifier,
    extractor: VizExtractor,
}

impl VizPipeline {
    pub fn new(chat: Arc<dyn ChatProvider>, llm_intent: bool) -> Self {
        let tier2 = if llm_intent { Some(chat.clone()) } else { None };
        Self {
            classifier: IntentClassifier::new(tier2),
            extractor: VizExtractor::new(chat),
        }
    }

    pub async fn run(&self, question: &str, context: &str) -> VizOutcome {
        let intent = self.classifier.classify(question).await;
        if intent == VizIntent::None {
            return VizOutcome::None;
        }

        if context.trim().is_empty() {
            return match intent {
                VizIntent::Chart => VizOutcome::ChartUnavailable,
                _ => VizOutcome::None,
            };
        }

        let kind = financial::detect(context);
        let extraction = self.extractor.extract(question, context, intent, kind).await;

        match intent {
            VizIntent::Chart => match extraction {
                Ok(Extracted::Chart(viz)) => {
                    info!("Chart extracted and validated");
                    VizOutcome::Ready(viz)
                }
                Ok(Extracted::Table(table)) => match convert::table_to_chart(&table) {
                    Some(viz) if validate::validate_chart(&viz, kind).is_ok() => {
                        info!("Extracted table coerced into a chart");
                        VizOutcome::Ready(viz)
                    }
                    _ => {
                        warn!("Chart requested but extracted table has no chart conversion");
                        VizOutcome::ChartUnavailable
                    }
                },
                Err(e) => {
                    warn!("Chart requested but extraction failed: {}", e);
                    VizOutcome::ChartUnavailable
                }
            },
            VizIntent::Table => match extraction {
                Ok(Extracted::Table(table)) => VizOutcome::Ready(Visualization::Table(table)),
                Ok(Extracted::Chart(_)) => {
                    warn!("Table requested but extraction produced a chart, omitting");
                    VizOutcome::None
                }
                Err(e) => {
                    warn!("Table extraction failed ({}), omitting visualization", e);
                    VizOutcome::None
                }
            },
            VizIntent::None => VizOutcome::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::chat_service::PromptMessage;
    use crate::utils::error::ApiError;
    use mockall::mock;

    mock! {
        Chat {}

        #[async_trait::async_trait]
        impl ChatProvider for Chat {
            async fn complete(
                &self,
                messages: &[PromptMessage],
                max_tokens: usize,
            ) -> Result<String, ApiError>;
            fn model_name(&self) -> &str;
        }
    }

    const CONTEXT: &str = "[page 1] Q1:100 Q2:115 Q3:132 Q4:148";

    #[tokio::test]
    async fn no_intent_means_no_extraction_call() {
        let mut chat = MockChat::new();
        chat.expect_complete().times(0);

        let pipeline = VizPipeline::new(Arc::new(chat), false);
        let outcome = pipeline.run("What was Q1 revenue?", CONTEXT).await;
        assert!(matches!(outcome, VizOutcome::None));
    }

    #[tokio::test]
    async fn valid_chart_extraction_is_ready() {
        let mut chat = MockChat::new();
        chat.expect_complete().times(1).returning(|_, _| {
            Ok(r#"{"chart_type":"bar","labels":["Q1","Q2"],"values":[100,115]}"#.to_string())
        });

        let pipeline = VizPipeline::new(Arc::new(chat), false);
        let outcome = pipeline.run("Show revenue as a bar chart", CONTEXT).await;
        match outcome {
            VizOutcome::Ready(Visualization::Bar(spec)) => {
                assert_eq!(spec.values, vec![100.0, 115.0])
            }
            other => panic!("expected bar chart, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn invalid_extraction_retries_once_then_fails_closed() {
        let mut chat = MockChat::new();
        chat.expect_complete()
            .times(2)
            .returning(|_, _| Ok("there is no numeric data to chart".to_string()));

        let pipeline = VizPipeline::new(Arc::new(chat), false);
        let outcome = pipeline.run("Give me the charts.", CONTEXT).await;
        assert!(matches!(outcome, VizOutcome::ChartUnavailable));
    }

    #[tokio::test]
    async fn chart_request_never_yields_a_table() {
        // Extraction produces a non-convertible table; the contract forbids
        // returning it.
        let mut chat = MockChat::new();
        chat.expect_complete().returning(|_, _| {
            Ok(r#"{"headers":["Name","Notes"],"rows":[["Alice","prose"]]}"#.to_string())
        });

        let pipeline = VizPipeline::new(Arc::new(chat), false);
        let outcome = pipeline.run("Chart the team roster", CONTEXT).await;
        assert!(matches!(outcome, VizOutcome::ChartUnavailable));
    }

    #[tokio::test]
    async fn convertible_table_upgrades_to_chart() {
        let mut chat = MockChat::new();
        chat.expect_complete().returning(|_, _| {
            Ok(r#"{"headers":["Account","Debit","Credit"],
                "rows":[["Cash","100","0"],["Revenue","0","100"]]}"#
                .to_string())
        });

        let pipeline = VizPipeline::new(Arc::new(chat), false);
        let outcome = pipeline.run("Graph the trial balance", CONTEXT).await;
        assert!(matches!(
            outcome,
            VizOutcome::Ready(Visualization::StackedBar(_))
        ));
    }

    #[tokio::test]
    async fn table_request_returns_table() {
        let mut chat = MockChat::new();
        chat.expect_complete().returning(|_, _| {
            Ok(r#"{"headers":["Quarter","Revenue"],"rows":[["Q1","100"]]}"#.to_string())
        });

        let pipeline = VizPipeline::new(Arc::new(chat), false);
        let outcome = pipeline.run("Show revenue in a table", CONTEXT).await;
        match outcome {
            VizOutcome::Ready(viz) => assert!(viz.is_table()),
            other => panic!("expected table, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn table_extraction_failure_is_recovered() {
        let mut chat = MockChat::new();
        chat.expect_complete()
            .returning(|_, _| Err(ApiError::AnswerUnavailable("down".to_string())));

        let pipeline = VizPipeline::new(Arc::new(chat), false);
        let outcome = pipeline.run("Show revenue in a table", CONTEXT).await;
        assert!(matches!(outcome, VizOutcome::None));
    }
}
