//! Hospital name comparison keys

use crate::config::NormalizerConfig;

/// Builds comparison keys for hospital names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HospitalNormalizer {
    /// Lowercased suffixes, longest first
    suffixes: Vec<String>,
}

impl Default for HospitalNormalizer {
    fn default() -> Self {
        Self::from_config(&NormalizerConfig::default())
    }
}

impl HospitalNormalizer {
    pub fn new(suffixes: &[String]) -> Self {
        let mut suffixes: Vec<String> = suffixes.iter().map(|s| s.to_lowercase()).collect();
        suffixes.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));
        Self { suffixes }
    }

    pub fn from_config(config: &NormalizerConfig) -> Self {
        Self::new(&config.hospital_suffixes)
    }

    /// Strip whitespace and one institution-type suffix, case-insensitively
    ///
    /// A name consisting only of a suffix keeps it, so `"병원"` does not
    /// collapse into the empty key.
    pub fn normalize(&self, name: &str) -> String {
        let key: String = name
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();

        for suffix in &self.suffixes {
            if let Some(stem) = key.strip_suffix(suffix.as_str()) {
                if !stem.is_empty() {
                    return stem.to_string();
                }
            }
        }
        key
    }
}
