//! Query orchestration: validate, embed, rank.
//!
//! A [`Matcher`] pairs an embedding provider with the current
//! [`CorpusIndex`]. Queries read an `Arc` snapshot of the index, so a
//! [`refresh`](Matcher::refresh) that swaps in a rebuilt index never
//! disturbs a query already in flight.
//!
//! Calls into the provider are serialized by the matcher itself, so a
//! provider never sees two concurrent requests from the same matcher.
//! Reading the index never takes that lock.

use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{debug, info};

use crate::embedding::{self, EmbeddingProvider};
use crate::error::{MatchError, Result};
use crate::index::CorpusIndex;
use crate::rank::{self, MatchResult};
use crate::taxonomy::Taxonomy;

pub struct Matcher {
    provider: Arc<dyn EmbeddingProvider>,
    index: RwLock<Arc<CorpusIndex>>,
    /// Held for every provider call and for the whole of a refresh.
    embed_lock: Mutex<()>,
}

impl Matcher {
    /// Build the initial index for `taxonomy`.
    pub fn new(taxonomy: &Taxonomy, provider: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        let index = CorpusIndex::build(taxonomy, provider.as_ref())?;
        Ok(Self::with_index(index, provider))
    }

    /// Wrap an index that was built elsewhere.
    pub fn with_index(index: CorpusIndex, provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            provider,
            index: RwLock::new(Arc::new(index)),
            embed_lock: Mutex::new(()),
        }
    }

    /// Snapshot of the current index.
    pub fn index(&self) -> Arc<CorpusIndex> {
        self.index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Rebuild the index if `taxonomy` differs from the one it was built
    /// from. Returns whether a rebuild happened.
    ///
    /// The new index is built before the write lock is taken, so a failed
    /// rebuild leaves the old index in place. Concurrent refreshes with the
    /// same taxonomy embed it once.
    pub fn refresh(&self, taxonomy: &Taxonomy) -> Result<bool> {
        let _guard = self.embed_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if self.index().is_current_for(taxonomy) {
            debug!("taxonomy unchanged, keeping index");
            return Ok(false);
        }

        let rebuilt = Arc::new(CorpusIndex::build(taxonomy, self.provider.as_ref())?);
        info!(statements = rebuilt.len(), "swapping in rebuilt index");
        *self.index.write().unwrap_or_else(PoisonError::into_inner) = rebuilt;
        Ok(true)
    }

    /// Match `query` against the current index.
    ///
    /// Empty or whitespace-only queries fail with
    /// [`MatchError::EmptyQuery`] before the provider is called.
    pub fn find(&self, query: &str, top_n: usize, threshold: f32) -> Result<Vec<MatchResult>> {
        if query.trim().is_empty() {
            return Err(MatchError::EmptyQuery);
        }

        let query_vec = {
            let _guard = self.embed_lock.lock().unwrap_or_else(PoisonError::into_inner);
            embedding::embed_query_normalized(self.provider.as_ref(), query)?
        };
        let index = self.index();
        if query_vec.len() != index.dims() {
            return Err(MatchError::DimensionMismatch {
                expected: index.dims(),
                actual: query_vec.len(),
            });
        }

        let results = rank::rank(&index, &query_vec, top_n, threshold);
        debug!(
            top_n,
            threshold,
            matches = results.len(),
            "query ranked"
        );
        Ok(results)
    }
}
