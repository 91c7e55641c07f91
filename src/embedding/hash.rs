//! Offline feature-hashing embedder.
//!
//! Each lowercased alphanumeric token contributes to one bucket, and each
//! of its padded character trigrams contributes at half weight, so
//! `child` and `children` land close together. The bucket index and sign
//! come from the SHA-256 digest of the feature. Output is deterministic
//! across runs and platforms.
//!
//! This is a lexical embedder, not a semantic one. It exists for tests,
//! demos, and machines without a model.

use anyhow::{bail, Result};
use sha2::{Digest, Sha256};

use super::{l2_normalize, EmbeddingProvider};

pub(crate) const DEFAULT_DIMS: usize = 384;

const TOKEN_WEIGHT: f32 = 1.0;
const TRIGRAM_WEIGHT: f32 = 0.5;

pub struct HashProvider {
    dims: usize,
}

impl HashProvider {
    pub fn new(dims: usize) -> Result<Self> {
        if dims == 0 {
            bail!("hash provider requires dims > 0");
        }
        Ok(Self { dims })
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dims];

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let token = token.to_lowercase();
            self.add_feature(&mut v, &format!("w:{}", token), TOKEN_WEIGHT);

            let padded: Vec<char> = format!("^{}$", token).chars().collect();
            for gram in padded.windows(3) {
                let gram: String = gram.iter().collect();
                self.add_feature(&mut v, &format!("g:{}", gram), TRIGRAM_WEIGHT);
            }
        }

        l2_normalize(&mut v);
        v
    }

    fn add_feature(&self, v: &mut [f32], feature: &str, weight: f32) {
        let digest = Sha256::digest(feature.as_bytes());
        let mut bucket_bytes = [0u8; 8];
        bucket_bytes.copy_from_slice(&digest[..8]);
        let bucket = (u64::from_le_bytes(bucket_bytes) % self.dims as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        v[bucket] += sign * weight;
    }
}

impl EmbeddingProvider for HashProvider {
    fn model_name(&self) -> &str {
        "hash"
    }

    fn dims(&self) -> usize {
        self.dims
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}
