//! CLI command implementations.
//!
//! Each `run_*` function backs one `sdg` subcommand. Anything that touches
//! the embedding provider runs on tokio's blocking pool, since the
//! providers themselves are synchronous.

use anyhow::{bail, Result};
use std::path::Path;
use std::sync::Arc;

use crate::config::Config;
use crate::embedding::{create_provider, EmbeddingProvider};
use crate::export::{self, ExportFormat};
use crate::flatten::{self, Level};
use crate::matcher::Matcher;

/// Options for `sdg match`. `None` falls back to `[matching]`.
#[derive(Debug, Clone)]
pub struct MatchOptions {
    pub top_n: Option<usize>,
    pub threshold: Option<f32>,
    pub format: ExportFormat,
}

/// Build the index, match `query`, and write the rendered results.
pub async fn run_match(
    config: &Config,
    query: &str,
    opts: &MatchOptions,
    output: Option<&Path>,
) -> Result<()> {
    let top_n = opts.top_n.unwrap_or(config.matching.top_n);
    if top_n == 0 {
        bail!("--top-n must be >= 1");
    }
    let threshold = opts.threshold.unwrap_or(config.matching.threshold);
    if !threshold.is_finite() {
        bail!("--threshold must be a finite number");
    }

    // Reject before paying for the corpus embedding.
    if query.trim().is_empty() {
        return Err(crate::error::MatchError::EmptyQuery.into());
    }

    let config = config.clone();
    let query = query.to_string();
    let results = tokio::task::spawn_blocking(move || -> Result<_> {
        let taxonomy = config.load_taxonomy()?;
        let provider: Arc<dyn EmbeddingProvider> = Arc::from(create_provider(&config.embedding)?);
        let matcher = Matcher::new(&taxonomy, provider)?;
        Ok(matcher.find(&query, top_n, threshold)?)
    })
    .await??;

    let rendered = export::render(&results, opts.format)?;
    export::write_output(&rendered, output)
}

/// Print the flattened corpus. No embedding calls are made.
pub fn run_statements(config: &Config, format: ExportFormat) -> Result<()> {
    let taxonomy = config.load_taxonomy()?;
    let statements = flatten::flatten(&taxonomy);
    let rendered = export::render_statements(&statements, format)?;
    export::write_output(&rendered, None)
}

/// Validate config and taxonomy and print a short summary.
pub fn run_check(config: &Config) -> Result<()> {
    let taxonomy = config.load_taxonomy()?;
    let statements = flatten::flatten(&taxonomy);
    let count = |level: Level| statements.iter().filter(|s| s.level() == level).count();

    let source = match &config.taxonomy.path {
        Some(p) => p.display().to_string(),
        None => "built-in sample".to_string(),
    };

    println!("Taxonomy: {}", source);
    println!("  goals:      {}", count(Level::Goal));
    println!("  targets:    {}", count(Level::SubTarget));
    println!("  indicators: {}", count(Level::SubIndicator));
    println!("  statements: {}", statements.len());
    println!("Embedding provider: {}", config.embedding.provider);
    if let Some(model) = &config.embedding.model {
        println!("  model: {}", model);
    }
    if !config.embedding.is_enabled() {
        println!("  warning: embeddings are disabled; `match` and `serve` will fail");
    }
    println!(
        "Matching: top_n = {}, threshold = {}",
        config.matching.top_n, config.matching.threshold
    );
    println!("OK");
    Ok(())
}
