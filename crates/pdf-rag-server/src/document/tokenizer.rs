use anyhow::Result;
use tiktoken_rs::CoreBPE;

/// Text → token count. The chunker and context builder take this as input
/// so tests can substitute the cheap heuristic.
pub trait TokenCounter: Send + Sync {
    fn count(&self, text: &str) -> usize;
}

/// BPE-backed counter matching the OpenAI embedding/chat tokenization.
pub struct TiktokenCounter {
    bpe: CoreBPE,
}

impl TiktokenCounter {
    pub fn cl100k() -> Result<Self> {
        Ok(Self {
            bpe: tiktoken_rs::cl100k_base()?,
        })
    }
}

impl TokenCounter for TiktokenCounter {
    fn count(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }
}

/// Word-based estimate (~1.3 tokens per word for English prose). Used as
/// the fallback when the BPE tables cannot be loaded, and as the test
/// double throughout the suite.
pub struct HeuristicCounter;

impl TokenCounter for HeuristicCounter {
    fn count(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        let words = text.split_whitespace().count();
        (words as f64 * 1.3).ceil() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heuristic_scales_with_words() {
        let counter = HeuristicCounter;
        assert_eq!(counter.count(""), 0);
        assert_eq!(counter.count("one"), 2);

        let ten_words = "alpha beta gamma delta epsilon zeta eta theta iota kappa";
        assert_eq!(counter.count(ten_words), 13);
    }
}
