//! Token-overlap similarity between free-text reports
//!
//! Holistic signals that do not depend on structured fields: Jaccard over
//! token sets, and label recall (how many reference tokens the candidate
//! reproduces).

use std::collections::HashSet;

use crate::config::SimilarityConfig;

/// Tokenizer plus the two set similarities
#[derive(Debug, Clone)]
pub struct SimilarityScorer {
    stop_words: HashSet<String>,
    min_token_chars: usize,
}

impl Default for SimilarityScorer {
    fn default() -> Self {
        Self::new(&SimilarityConfig::default())
    }
}

impl SimilarityScorer {
    pub fn new(config: &SimilarityConfig) -> Self {
        Self {
            stop_words: config.stop_words.iter().map(|w| w.to_lowercase()).collect(),
            min_token_chars: config.min_token_chars,
        }
    }

    /// Lowercase letter/digit runs, without stop words and short tokens
    pub fn tokenize(&self, text: &str) -> HashSet<String> {
        text.split(|c: char| !c.is_alphanumeric())
            .map(str::to_lowercase)
            .filter(|t| t.chars().count() >= self.min_token_chars)
            .filter(|t| !self.stop_words.contains(t))
            .collect()
    }

    /// Jaccard similarity of the token sets of two texts
    pub fn jaccard(&self, a: &str, b: &str) -> f64 {
        jaccard(&self.tokenize(a), &self.tokenize(b))
    }

    /// Share of reference tokens found in the candidate text
    pub fn label_recall(&self, reference: &str, candidate: &str) -> f64 {
        label_recall(&self.tokenize(reference), &self.tokenize(candidate))
    }
}

/// `|A ∩ B| / |A ∪ B|`, 1.0 when both sets are empty
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let shared = a.intersection(b).count();
    let union = a.len() + b.len() - shared;
    shared as f64 / union as f64
}

/// `|A ∩ B| / |A|`; 1.0 when both are empty, 0.0 when only A is empty
pub fn label_recall(reference: &HashSet<String>, candidate: &HashSet<String>) -> f64 {
    if reference.is_empty() {
        return if candidate.is_empty() { 1.0 } else { 0.0 };
    }
    reference.intersection(candidate).count() as f64 / reference.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_tokenize() {
        let scorer = SimilarityScorer::default();
        let tokens = scorer.tokenize("2024.01.15 서울병원 내원, 진단: Acute gastritis 및 a");
        assert_eq!(
            tokens,
            set(&["2024", "01", "15", "서울병원", "내원", "진단", "acute", "gastritis"])
        );
    }

    #[test]
    fn test_jaccard() {
        assert_eq!(jaccard(&set(&[]), &set(&[])), 1.0);
        assert_eq!(jaccard(&set(&["a1"]), &set(&[])), 0.0);
        assert_eq!(jaccard(&set(&["ab", "cd"]), &set(&["cd", "ef"])), 1.0 / 3.0);
    }

    #[test]
    fn test_label_recall() {
        assert_eq!(label_recall(&set(&[]), &set(&[])), 1.0);
        assert_eq!(label_recall(&set(&[]), &set(&["ab"])), 0.0);
        assert_eq!(label_recall(&set(&["ab", "cd"]), &set(&["cd", "ef", "gh"])), 0.5);
    }

    #[test]
    fn test_text_similarity() {
        let scorer = SimilarityScorer::default();
        assert_eq!(scorer.jaccard("", "  "), 1.0);
        assert_eq!(scorer.jaccard("급성 위염 진단", "진단 급성 위염"), 1.0);
        assert!((scorer.label_recall("급성 위염", "위염 의심") - 0.5).abs() < 1e-9);
    }
}
