use anyhow::Result;
use std::path::Path;

use vnexsus::temporal::{Anchor, TimelineEvent};
use vnexsus::ConformityEngine;

use super::{load_document, parse_date, print_json};

pub fn flags(engine: &ConformityEngine, document: &Path, anchors: &[String]) -> Result<()> {
    let doc = load_document(document)?;
    let anchors = anchors
        .iter()
        .map(|raw| parse_date(raw).map(Anchor::new))
        .collect::<Result<Vec<_>>>()?;

    let events: Vec<TimelineEvent> = engine
        .bind(&doc)
        .iter()
        .map(|record| {
            TimelineEvent::labeled(
                record.candidate.normalized_date,
                record.candidate.date_type.korean_name(),
            )
        })
        .collect();

    print_json(&engine.flag_timeline(&events, &anchors))
}
