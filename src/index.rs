//! Corpus index: flattened statements paired with their embeddings.
//!
//! Built once per taxonomy snapshot and immutable afterwards, so a single
//! `Arc<CorpusIndex>` can serve any number of concurrent queries without
//! locking. Row `i` of [`CorpusIndex::vectors`] is the embedding of
//! statement `i`.

use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::embedding::{self, EmbeddingProvider};
use crate::error::{MatchError, Result};
use crate::flatten::{self, ReferenceStatement};
use crate::taxonomy::Taxonomy;

#[derive(Debug, Clone)]
pub struct CorpusIndex {
    statements: Vec<ReferenceStatement>,
    vectors: Vec<Vec<f32>>,
    model: String,
    dims: usize,
    fingerprint: String,
}

impl CorpusIndex {
    /// Flatten `taxonomy` and embed every statement with one batched call
    /// to `provider`.
    pub fn build(taxonomy: &Taxonomy, provider: &dyn EmbeddingProvider) -> Result<Self> {
        let dims = provider.dims();
        Self::build_inner(taxonomy, provider.model_name(), Some(dims), |texts| {
            embedding::embed_normalized(provider, texts)
        })
    }

    /// Like [`build`](Self::build), but with a bare batch-embedding function.
    ///
    /// `embed_batch` is called exactly once with every statement text. Its
    /// output is checked for length and a consistent dimension, then
    /// L2-normalized.
    pub fn build_with<F>(taxonomy: &Taxonomy, model: &str, embed_batch: F) -> Result<Self>
    where
        F: FnOnce(&[String]) -> anyhow::Result<Vec<Vec<f32>>>,
    {
        Self::build_inner(taxonomy, model, None, |texts| {
            let vectors = embed_batch(texts).map_err(MatchError::Provider)?;
            // The widest vector sets the dimension, so a short or empty
            // vector anywhere in the batch is a mismatch.
            let dims = vectors.iter().map(Vec::len).max().unwrap_or(0);
            embedding::normalize_batch(vectors, texts.len(), dims)
        })
    }

    fn build_inner<F>(
        taxonomy: &Taxonomy,
        model: &str,
        expected_dims: Option<usize>,
        embed: F,
    ) -> Result<Self>
    where
        F: FnOnce(&[String]) -> Result<Vec<Vec<f32>>>,
    {
        let statements = flatten::flatten(taxonomy);
        let texts = flatten::texts(&statements);
        let fingerprint = fingerprint_texts(&texts);

        debug!(statements = texts.len(), model, "embedding corpus");
        let vectors = embed(&texts)?;

        let dims = vectors.first().map(|v| v.len()).unwrap_or(0);
        if let Some(expected) = expected_dims {
            if dims != expected {
                return Err(MatchError::DimensionMismatch {
                    expected,
                    actual: dims,
                });
            }
        }

        info!(
            statements = statements.len(),
            dims,
            model,
            "corpus index built"
        );

        Ok(Self {
            statements,
            vectors,
            model: model.to_string(),
            dims,
            fingerprint,
        })
    }

    pub fn statements(&self) -> &[ReferenceStatement] {
        &self.statements
    }

    pub fn vectors(&self) -> &[Vec<f32>] {
        &self.vectors
    }

    pub fn get(&self, i: usize) -> Option<(&ReferenceStatement, &[f32])> {
        Some((self.statements.get(i)?, self.vectors.get(i)?.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn model_name(&self) -> &str {
        &self.model
    }

    /// SHA-256 over the flattened statement texts this index was built from.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// True when `taxonomy` flattens to exactly the texts this index holds,
    /// i.e. no rebuild is needed.
    pub fn is_current_for(&self, taxonomy: &Taxonomy) -> bool {
        taxonomy_fingerprint(taxonomy) == self.fingerprint
    }
}

/// Fingerprint of a taxonomy's flattened texts.
pub fn taxonomy_fingerprint(taxonomy: &Taxonomy) -> String {
    fingerprint_texts(&flatten::texts(&flatten::flatten(taxonomy)))
}

fn fingerprint_texts(texts: &[String]) -> String {
    let mut hasher = Sha256::new();
    for t in texts {
        hasher.update(t.as_bytes());
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}
