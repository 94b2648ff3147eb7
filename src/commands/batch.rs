use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

use vnexsus::batch::{BatchCase, BatchRunner};
use vnexsus::cache::ResultCache;
use vnexsus::config::BatchConfig;
use vnexsus::ConformityEngine;

use super::print_json;

pub async fn batch(
    engine: ConformityEngine,
    config: BatchConfig,
    input: &Path,
    parallel: bool,
    cache: bool,
    output: Option<&Path>,
) -> Result<()> {
    let content = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let cases: Vec<BatchCase> = serde_json::from_str(&content)
        .with_context(|| format!("Invalid cases file: {}", input.display()))?;

    let result_cache = cache.then(|| Arc::new(ResultCache::with_capacity(config.cache_capacity)));
    let mut runner = BatchRunner::new(Arc::new(engine), config);
    if let Some(result_cache) = &result_cache {
        runner = runner.with_cache(Arc::clone(result_cache));
    }

    let report = if parallel {
        runner.run_parallel(cases).await?
    } else {
        runner.run(&cases)
    };

    if let Some(result_cache) = result_cache {
        let stats = result_cache.stats();
        tracing::info!(hits = stats.hits, misses = stats.misses, hit_rate = stats.hit_rate(), "Cache stats");
    }

    match output {
        Some(path) => {
            std::fs::write(path, serde_json::to_string_pretty(&report)?)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Report written to {}", path.display());
        }
        None => print_json(&report)?,
    }
    Ok(())
}
