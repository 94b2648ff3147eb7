//! Fluent builders for the binder and matcher sections

use super::{strings, BinderConfig, KeywordRule, MatcherConfig};
use crate::error::Result;
use crate::matcher::DateMatchMode;

/// Builder for BinderConfig with fluent API
#[derive(Debug, Clone, Default)]
pub struct BinderConfigBuilder {
    window: Option<usize>,
    max_value_chars: Option<usize>,
    context_excerpt_chars: Option<usize>,
    diagnosis_keywords: Option<Vec<String>>,
    hospital_keywords: Option<Vec<String>>,
    treatment_keywords: Option<Vec<String>>,
    date_type_rules: Option<Vec<KeywordRule>>,
}

impl BinderConfigBuilder {
    /// Set segments on each side of the date segment
    pub fn window(mut self, window: usize) -> Self {
        self.window = Some(window);
        self
    }

    /// Set maximum characters of a bound attribute
    pub fn max_value_chars(mut self, max: usize) -> Self {
        self.max_value_chars = Some(max);
        self
    }

    /// Set maximum characters of the stored context excerpt
    pub fn context_excerpt_chars(mut self, max: usize) -> Self {
        self.context_excerpt_chars = Some(max);
        self
    }

    pub fn diagnosis_keywords(mut self, keywords: &[&str]) -> Self {
        self.diagnosis_keywords = Some(strings(keywords));
        self
    }

    pub fn hospital_keywords(mut self, keywords: &[&str]) -> Self {
        self.hospital_keywords = Some(strings(keywords));
        self
    }

    pub fn treatment_keywords(mut self, keywords: &[&str]) -> Self {
        self.treatment_keywords = Some(strings(keywords));
        self
    }

    /// Replace the ordered date-type table
    pub fn date_type_rules(mut self, rules: Vec<KeywordRule>) -> Self {
        self.date_type_rules = Some(rules);
        self
    }

    /// Build the config with validation
    pub fn build(self) -> Result<BinderConfig> {
        let config = self.build_unchecked();
        config.validate()?;
        Ok(config)
    }

    /// Build without validation (for testing)
    pub fn build_unchecked(self) -> BinderConfig {
        let defaults = BinderConfig::default();
        BinderConfig {
            window: self.window.unwrap_or(defaults.window),
            max_value_chars: self.max_value_chars.unwrap_or(defaults.max_value_chars),
            context_excerpt_chars: self
                .context_excerpt_chars
                .unwrap_or(defaults.context_excerpt_chars),
            diagnosis_keywords: self.diagnosis_keywords.unwrap_or(defaults.diagnosis_keywords),
            hospital_keywords: self.hospital_keywords.unwrap_or(defaults.hospital_keywords),
            treatment_keywords: self.treatment_keywords.unwrap_or(defaults.treatment_keywords),
            date_type_rules: self.date_type_rules.unwrap_or(defaults.date_type_rules),
            ..defaults
        }
    }
}

/// Builder for MatcherConfig with fluent API
#[derive(Debug, Clone, Default)]
pub struct MatcherConfigBuilder {
    date_mode: Option<DateMatchMode>,
    category_weight: Option<f64>,
}

impl MatcherConfigBuilder {
    /// Match dates by exact equality
    pub fn exact_dates(mut self) -> Self {
        self.date_mode = Some(DateMatchMode::Exact);
        self
    }

    /// Match dates within a day tolerance
    pub fn date_tolerance(mut self, days: u32) -> Self {
        self.date_mode = Some(DateMatchMode::Tolerance { days });
        self
    }

    /// Set the weight of a category-level code match
    pub fn category_weight(mut self, weight: f64) -> Self {
        self.category_weight = Some(weight);
        self
    }

    /// Build the config with validation
    pub fn build(self) -> Result<MatcherConfig> {
        let config = MatcherConfig {
            date_mode: self.date_mode.unwrap_or(DateMatchMode::Exact),
            category_weight: self.category_weight.unwrap_or(0.7),
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DateType;

    #[test]
    fn test_binder_builder() {
        let config = BinderConfig::builder()
            .window(1)
            .max_value_chars(20)
            .diagnosis_keywords(&["Dx"])
            .build()
            .unwrap();
        assert_eq!(config.window, 1);
        assert_eq!(config.max_value_chars, 20);
        assert_eq!(config.diagnosis_keywords, vec!["Dx".to_string()]);
        assert_eq!(config.unidentified, "미확인");
    }

    #[test]
    fn test_binder_builder_validation() {
        assert!(BinderConfig::builder().max_value_chars(0).build().is_err());
        assert!(BinderConfig::builder()
            .date_type_rules(vec![KeywordRule::new(DateType::Visit, &[])])
            .build()
            .is_err());
        assert_eq!(
            BinderConfig::builder().max_value_chars(0).build_unchecked().max_value_chars,
            0
        );
    }

    #[test]
    fn test_matcher_builder() {
        let config = MatcherConfig::builder()
            .date_tolerance(3)
            .category_weight(0.5)
            .build()
            .unwrap();
        assert_eq!(config.date_mode, DateMatchMode::Tolerance { days: 3 });
        assert_eq!(config.category_weight, 0.5);
        assert!(MatcherConfig::builder().category_weight(1.5).build().is_err());
    }
}
