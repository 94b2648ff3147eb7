pub mod batch;
pub mod evaluate;
pub mod flags;
pub mod score;

// Re-export command functions for convenience
pub use batch::batch;
pub use evaluate::evaluate;
pub use flags::flags;
pub use score::score;

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

use vnexsus::config::EngineConfig;
use vnexsus::normalize::CodeIndex;
use vnexsus::{ConformityEngine, ExtractionDocument, ReferenceDocument};

/// Engine over `config`, with the code index when given
pub fn build_engine(config: EngineConfig, code_index: Option<&Path>) -> Result<ConformityEngine> {
    let mut engine = ConformityEngine::new(config).context("Invalid engine configuration")?;
    if let Some(path) = code_index {
        let index = CodeIndex::from_file(path)
            .with_context(|| format!("Failed to load code index: {}", path.display()))?;
        tracing::info!(codes = index.len(), "Code index loaded");
        engine = engine.with_code_index(Arc::new(index));
    }
    Ok(engine)
}

/// JSON extraction document, or any other file as plain text
pub fn load_document(path: &Path) -> Result<ExtractionDocument> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    if path.extension().is_some_and(|ext| ext == "json") {
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid extraction document: {}", path.display()))
    } else {
        Ok(ExtractionDocument::from_text(content))
    }
}

pub fn load_reference(path: &Path) -> Result<ReferenceDocument> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(ReferenceDocument::new(content))
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn parse_date(raw: &str) -> Result<chrono::NaiveDate> {
    chrono::NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .with_context(|| format!("Expected YYYY-MM-DD, got '{raw}'"))
}
