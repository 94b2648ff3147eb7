use anyhow::{anyhow, Result};
use std::path::Path;

use vnexsus::scoring::{filter_by_relevance, Relevance, ScoredEvent};
use vnexsus::ConformityEngine;

use super::{load_document, print_json};

pub fn score(engine: &ConformityEngine, document: &Path, min_relevance: &str) -> Result<()> {
    let min = Relevance::parse(min_relevance)
        .ok_or_else(|| anyhow!("Unknown relevance tier: {min_relevance}"))?;
    let doc = load_document(document)?;

    let events: Vec<ScoredEvent> = engine.bind(&doc).iter().map(ScoredEvent::from).collect();
    let scored = engine.score_events(&events);
    let partition = filter_by_relevance(&scored, min);

    tracing::info!(
        kept = partition.kept.len(),
        filtered = partition.filtered.len(),
        "Events scored"
    );
    print_json(&partition)
}
