use std::sync::Arc;
use tracing::{debug, warn};

use crate::services::chat_service::{ChatProvider, PromptMessage};

/// What kind of visualization, if any, the question asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VizIntent {
    None,
    Chart,
    Table,
}

/// Chart-intent vocabulary. Single words match on word boundaries so that
/// "share" never fires on "shareholder".
const CHART_WORDS: &[&str] = &[
    "chart",
    "charts",
    "graph",
    "graphs",
    "visualize",
    "visualization",
    "plot",
    "trend",
    "breakdown",
    "proportion",
    "share",
];
const CHART_PHRASES: &[&str] = &["compare by"];

const TABLE_WORDS: &[&str] = &["table", "tabular", "list"];
const TABLE_PHRASES: &[&str] = &["in a table"];

const CLASSIFY_MAX_TOKENS: usize = 10;

/// Two-tier intent detector. Tier 1 keyword hits are trusted; tier 2 (an
/// LLM vote) only runs on a tier-1 miss and only when enabled. Chart wins
/// over table when both vocabularies match: once a question reads as
/// chart-requested it must never downgrade.
pub struct IntentClassifier {
    chat: Option<Arc<dyn ChatProvider>>,
}

impl IntentClassifier {
    pub fn new(chat: Option<Arc<dyn ChatProvider>>) -> Self {
        Self { chat }
    }

    pub async fn classify(&self, question: &str) -> VizIntent {
        if let Some(intent) = Self::tier1(question) {
            debug!("Tier-1 intent: {:?}", intent);
            return intent;
        }

        let Some(chat) = &self.chat else {
            return VizIntent::None;
        };

        let messages = [
            PromptMessage::system(
                "Classify whether the user asks for a chart, a table, or neither. \
                 Respond with exactly one word: chart, table, or none.",
            ),
            PromptMessage::user(question),
        ];

        match chat.complete(&messages, CLASSIFY_MAX_TOKENS).await {
            Ok(label) => {
                let label = label.trim().to_lowercase();
                let intent = if label.starts_with("chart") {
                    VizIntent::Chart
                } else if label.starts_with("table") {
                    VizIntent::Table
                } else {
                    VizIntent::None
                };
                debug!("Tier-2 intent: {:?}", intent);
                intent
            }
            Err(e) => {
                warn!("Tier-2 intent classification failed ({}), assuming none", e);
                VizIntent::None
            }
        }
    }

    /// Keyword tier. Returns None when neither vocabulary matches.
    pub fn tier1(question: &str) -> Option<VizIntent> {
        let lowered = question.to_lowercase();
        let words: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();

        let hit = |word_set: &[&str], phrase_set: &[&str]| {
            word_set.iter().any(|k| words.contains(k))
                || phrase_set.iter().any(|p| lowered.contains(p))
        };

        if hit(CHART_WORDS, CHART_PHRASES) {
            return Some(VizIntent::Chart);
        }
        if hit(TABLE_WORDS, TABLE_PHRASES) {
            return Some(VizIntent::Table);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chart_keywords_are_trusted() {
        assert_eq!(
            IntentClassifier::tier1("Show me quarterly revenue as a bar chart."),
            Some(VizIntent::Chart)
        );
        assert_eq!(
            IntentClassifier::tier1("Give me the charts."),
            Some(VizIntent::Chart)
        );
        assert_eq!(
            IntentClassifier::tier1("plot revenue over time"),
            Some(VizIntent::Chart)
        );
        assert_eq!(
            IntentClassifier::tier1("compare by region please"),
            Some(VizIntent::Chart)
        );
    }

    #[test]
    fn table_keywords_are_trusted() {
        assert_eq!(
            IntentClassifier::tier1("Show the results in a table"),
            Some(VizIntent::Table)
        );
        assert_eq!(
            IntentClassifier::tier1("List the expense accounts"),
            Some(VizIntent::Table)
        );
    }

    #[test]
    fn chart_wins_over_table() {
        assert_eq!(
            IntentClassifier::tier1("Chart the figures from that table"),
            Some(VizIntent::Chart)
        );
    }

    #[test]
    fn word_boundaries_prevent_substring_hits() {
        assert_eq!(IntentClassifier::tier1("Who is the largest shareholder?"), None);
        assert_eq!(IntentClassifier::tier1("What was Q1 revenue?"), None);
    }

    #[tokio::test]
    async fn tier2_disabled_means_none_on_miss() {
        let classifier = IntentClassifier::new(None);
        assert_eq!(classifier.classify("What was Q1 revenue?").await, VizIntent::None);
    }
}
