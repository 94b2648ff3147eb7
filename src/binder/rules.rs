//! Ranked context rules: evaluated in order, first match wins

use std::fmt;

use crate::config::KeywordRule;
use crate::extract::text::scan_raw_hospitals;

/// A rule that may produce a label or value from a context window
pub trait ContextRule<L>: Send + Sync {
    fn evaluate(&self, context: &str) -> Option<L>;
}

/// Ordered rule list
pub struct RankedRules<L> {
    rules: Vec<Box<dyn ContextRule<L>>>,
}

impl<L> Default for RankedRules<L> {
    fn default() -> Self {
        Self { rules: Vec::new() }
    }
}

impl<L> fmt::Debug for RankedRules<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RankedRules")
            .field("rules", &self.rules.len())
            .finish()
    }
}

impl<L> RankedRules<L> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule with the lowest priority so far
    pub fn with(mut self, rule: impl ContextRule<L> + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    /// Insert a rule ahead of all existing ones
    pub fn with_first(mut self, rule: impl ContextRule<L> + 'static) -> Self {
        self.rules.insert(0, Box::new(rule));
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Result of the first rule that matches
    pub fn first_match(&self, context: &str) -> Option<L> {
        self.rules.iter().find_map(|rule| rule.evaluate(context))
    }
}

/// Yields a fixed label when any keyword occurs in the context
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordPredicate<L> {
    pub label: L,
    pub keywords: Vec<String>,
}

impl<L: Clone + Send + Sync> ContextRule<L> for KeywordPredicate<L> {
    fn evaluate(&self, context: &str) -> Option<L> {
        self.keywords
            .iter()
            .any(|k| context.contains(k.as_str()))
            .then(|| self.label.clone())
    }
}

impl<L: Clone + Send + Sync + 'static> RankedRules<L> {
    /// One keyword predicate per table row, in table order
    pub fn from_keyword_table(rows: impl IntoIterator<Item = (L, Vec<String>)>) -> Self {
        rows.into_iter()
            .fold(Self::new(), |rules, (label, keywords)| {
                rules.with(KeywordPredicate { label, keywords })
            })
    }
}

impl RankedRules<crate::models::DateType> {
    pub fn from_date_type_rules(rules: &[KeywordRule]) -> Self {
        Self::from_keyword_table(rules.iter().map(|r| (r.label, r.keywords.clone())))
    }
}

/// Extracts the text following a keyword
///
/// The value starts at the keyword, runs to the next line break or
/// delimiter, and is cut at `max_chars`. A value no longer than the keyword
/// itself carries no content and is skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordValue {
    pub keywords: Vec<String>,
    pub max_chars: usize,
    pub delimiters: String,
}

impl KeywordValue {
    fn value_at(&self, context: &str, start: usize) -> String {
        context[start..]
            .chars()
            .take_while(|c| *c != '\n' && *c != '\r' && !self.delimiters.contains(*c))
            .take(self.max_chars)
            .collect::<String>()
            .trim()
            .to_string()
    }
}

impl ContextRule<String> for KeywordValue {
    fn evaluate(&self, context: &str) -> Option<String> {
        for keyword in &self.keywords {
            let keyword_chars = keyword.chars().count();
            for (start, _) in context.match_indices(keyword.as_str()) {
                let value = self.value_at(context, start);
                if value.chars().count() > keyword_chars {
                    return Some(value);
                }
            }
        }
        None
    }
}

/// First hospital-shaped name in the context
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HospitalName;

impl ContextRule<String> for HospitalName {
    fn evaluate(&self, context: &str) -> Option<String> {
        scan_raw_hospitals(context)
            .first()
            .map(|t| t.text.to_string())
    }
}
