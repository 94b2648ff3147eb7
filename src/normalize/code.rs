//! Diagnostic code normalization and the optional disease code index

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use crate::error::Result;

static CODE_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][0-9]{2}(\.[0-9]{1,2})?$").unwrap());

/// Replacement chains longer than this are treated as cycles
const MAX_REPLACEMENT_HOPS: usize = 8;

/// Canonicalize a raw code token (trim, uppercase) if it is code-shaped
pub fn normalize_code(raw: &str) -> Option<String> {
    let code = raw.trim().to_uppercase();
    CODE_SHAPE.is_match(&code).then_some(code)
}

/// Base category of a code: everything before the first `.`
pub fn category_of(code: &str) -> &str {
    code.split('.').next().unwrap_or(code)
}

/// Comparison form of a code
///
/// A bare category (`E11`) stands for its unspecified leaf (`E11.9`). The
/// candidate itself is never rewritten; only the compared key is.
pub fn matching_form(code: &str) -> String {
    if code.contains('.') {
        code.to_string()
    } else {
        format!("{code}.9")
    }
}

/// One entry of a disease code table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeEntry {
    pub code: String,
    #[serde(default)]
    pub kor_name: Option<String>,
    #[serde(default)]
    pub eng_name: Option<String>,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default)]
    pub replaced_by: Option<String>,
}

/// Lookup table of known codes with deprecated-code remapping
#[derive(Debug, Clone, Default)]
pub struct CodeIndex {
    entries: HashMap<String, CodeEntry>,
}

impl CodeIndex {
    pub fn from_entries(entries: impl IntoIterator<Item = CodeEntry>) -> Self {
        let entries = entries
            .into_iter()
            .filter_map(|mut entry| {
                let key = normalize_code(&entry.code)?;
                entry.code = key.clone();
                Some((key, entry))
            })
            .collect();
        Self { entries }
    }

    /// Parse a JSON array of entries
    pub fn from_json(json: &str) -> Result<Self> {
        let entries: Vec<CodeEntry> = serde_json::from_str(json)?;
        Ok(Self::from_entries(entries))
    }

    /// Load a JSON array of entries from disk
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, code: &str) -> Option<&CodeEntry> {
        self.entries.get(code)
    }

    /// Follow `replacedBy` links of deprecated codes to the current code
    pub fn resolve(&self, code: &str) -> String {
        let mut current = code.to_string();
        for _ in 0..MAX_REPLACEMENT_HOPS {
            match self.entries.get(&current) {
                Some(CodeEntry {
                    deprecated: true,
                    replaced_by: Some(next),
                    ..
                }) if next != &current => current = next.clone(),
                _ => break,
            }
        }
        current
    }

    /// Korean name of a code, falling back to its category's name
    pub fn korean_name(&self, code: &str) -> Option<&str> {
        self.entries
            .get(code)
            .or_else(|| self.entries.get(category_of(code)))
            .and_then(|e| e.kor_name.as_deref())
    }
}
