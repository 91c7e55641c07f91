//! Embedding provider abstraction and implementations.
//!
//! Defines the [`EmbeddingProvider`] trait and concrete implementations:
//! - **[`DisabledProvider`]**: returns errors; used when embeddings are turned off.
//! - **[`HashProvider`]**: deterministic feature-hashing embedder, fully offline.
//! - **[`OpenAIProvider`]**: calls the OpenAI embeddings API with batching, retry, and backoff.
//! - **[`OllamaProvider`]**: calls a local Ollama instance's `/api/embed` endpoint.
//! - **`LocalProvider`**: runs models on-device via fastembed (feature `local-embeddings`).
//!
//! The core never talks to a provider directly. It goes through the adapter
//! functions [`embed_normalized`] and [`embed_query_normalized`], which check
//! the response shape and L2-normalize every vector exactly once, so ranking
//! can use a plain dot product.
//!
//! # Provider Selection
//!
//! ```rust
//! # use sdg_context::config::EmbeddingConfig;
//! # use sdg_context::embedding::create_provider;
//! let config = EmbeddingConfig {
//!     provider: "hash".to_string(),
//!     dims: Some(64),
//!     ..EmbeddingConfig::default()
//! };
//! let provider = create_provider(&config).unwrap();
//! assert_eq!(provider.model_name(), "hash");
//! assert_eq!(provider.dims(), 64);
//! ```
//!
//! # Retry Strategy
//!
//! The OpenAI and Ollama providers use exponential backoff for transient errors:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)
//!
//! Retries live inside the providers. The matching core itself never retries.

mod hash;
#[cfg(feature = "local-embeddings")]
mod local;
mod remote;

use anyhow::{bail, Result};

use crate::config::EmbeddingConfig;
use crate::error::MatchError;

pub use hash::HashProvider;
#[cfg(feature = "local-embeddings")]
pub use local::LocalProvider;
pub use remote::{OllamaProvider, OpenAIProvider};

/// Trait for embedding providers.
///
/// Implementations must be deterministic for a fixed model, return one
/// vector per input text in input order, and return vectors of exactly
/// [`dims`](EmbeddingProvider::dims) components.
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"text-embedding-3-small"`).
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality (e.g. `1536`).
    fn dims(&self) -> usize;
    /// Embed a batch of texts. Blocks until the provider answers.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text.
    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("Empty embedding response"))
    }
}

// ============ Adapter ============

/// Embed `texts` through `provider` and return unit-length vectors.
///
/// Fails with [`MatchError::Provider`] if the provider errors or returns the
/// wrong number of vectors, and with [`MatchError::DimensionMismatch`] if any
/// vector does not have `provider.dims()` components.
pub fn embed_normalized(
    provider: &dyn EmbeddingProvider,
    texts: &[String],
) -> crate::error::Result<Vec<Vec<f32>>> {
    let vectors = provider.embed_batch(texts).map_err(MatchError::Provider)?;
    normalize_batch(vectors, texts.len(), provider.dims())
}

/// Embed a single query text through `provider` and return a unit-length vector.
pub fn embed_query_normalized(
    provider: &dyn EmbeddingProvider,
    text: &str,
) -> crate::error::Result<Vec<f32>> {
    let vector = provider.embed_one(text).map_err(MatchError::Provider)?;
    let mut batch = normalize_batch(vec![vector], 1, provider.dims())?;
    Ok(batch.remove(0))
}

/// Check a provider response and L2-normalize it in place.
pub(crate) fn normalize_batch(
    mut vectors: Vec<Vec<f32>>,
    expected_count: usize,
    dims: usize,
) -> crate::error::Result<Vec<Vec<f32>>> {
    if vectors.len() != expected_count {
        return Err(MatchError::Provider(anyhow::anyhow!(
            "provider returned {} vectors for {} texts",
            vectors.len(),
            expected_count
        )));
    }
    if dims == 0 {
        return Err(MatchError::Provider(anyhow::anyhow!(
            "provider reported zero-dimensional embeddings"
        )));
    }

    for v in vectors.iter_mut() {
        if v.len() != dims {
            return Err(MatchError::DimensionMismatch {
                expected: dims,
                actual: v.len(),
            });
        }
        if v.iter().any(|x| !x.is_finite()) {
            return Err(MatchError::Provider(anyhow::anyhow!(
                "provider returned a non-finite vector component"
            )));
        }
        l2_normalize(v);
    }

    Ok(vectors)
}

/// Euclidean norm of `v`.
pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Scale `v` to unit length. Only an exact zero vector is left untouched.
///
/// Components are first divided by the largest magnitude, so the squared
/// sum can neither overflow for huge inputs nor vanish for tiny ones.
pub fn l2_normalize(v: &mut [f32]) {
    let max = v.iter().fold(0f32, |m, x| m.max(x.abs()));
    if max == 0.0 || !max.is_finite() {
        return;
    }
    for x in v.iter_mut() {
        *x /= max;
    }
    let norm = l2_norm(v);
    for x in v.iter_mut() {
        *x /= norm;
    }
}

// ============ Disabled Provider ============

/// A no-op embedding provider that always returns errors.
///
/// Used when `embedding.provider = "disabled"` in the configuration.
pub struct DisabledProvider;

impl EmbeddingProvider for DisabledProvider {
    fn model_name(&self) -> &str {
        "disabled"
    }
    fn dims(&self) -> usize {
        0
    }
    fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        bail!("Embedding provider is disabled")
    }
}

/// Create the appropriate [`EmbeddingProvider`] based on configuration.
///
/// # Supported Providers
///
/// | Config Value | Provider |
/// |-------------|----------|
/// | `"disabled"` | [`DisabledProvider`] |
/// | `"hash"` | [`HashProvider`] |
/// | `"openai"` | [`OpenAIProvider`] |
/// | `"ollama"` | [`OllamaProvider`] |
/// | `"local"` | `LocalProvider` (requires feature `local-embeddings`) |
///
/// # Errors
///
/// Returns an error for unknown provider names or if the provider
/// cannot be initialized (missing config, API key, or feature flag).
pub fn create_provider(config: &EmbeddingConfig) -> Result<Box<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledProvider)),
        "hash" => Ok(Box::new(HashProvider::new(
            config.dims.unwrap_or(hash::DEFAULT_DIMS),
        )?)),
        "openai" => Ok(Box::new(OpenAIProvider::new(config)?)),
        "ollama" => Ok(Box::new(OllamaProvider::new(config)?)),
        #[cfg(feature = "local-embeddings")]
        "local" => Ok(Box::new(LocalProvider::new(config)?)),
        #[cfg(not(feature = "local-embeddings"))]
        "local" => bail!("Local embedding provider requires --features local-embeddings"),
        other => bail!("Unknown embedding provider: {}", other),
    }
}
