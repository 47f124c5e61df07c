use anyhow::Result;
use std::hash::{Hash, Hasher};
use twox_hash::XxHash64;

use docchat_core::traits::{Embedder, TaskType};

/// Hashing bag-of-words embedder. Deterministic, L2-normalized, offline.
/// Texts sharing words land close together, which is enough for tests.
pub struct FakeEmbedder {
    dim: usize,
}

impl FakeEmbedder {
    pub fn new(dim: usize) -> Self { Self { dim: dim.max(1) } }
}

impl Embedder for FakeEmbedder {
    fn model_id(&self) -> &str { "fake:xxhash" }

    fn dim(&self) -> usize { self.dim }

    fn embed(&self, text: &str, _task: TaskType) -> Result<Vec<f32>> {
        let mut v = vec![0f32; self.dim];
        let tokens = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(|t| t.to_lowercase());
        for (i, token) in tokens.enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += 0.5 + val + (i as f32 % 3.0) * 0.01;
        }
        let norm = (v.iter().map(|x| x * x).sum::<f32>()).sqrt().max(1e-6);
        for x in &mut v { *x /= norm; }
        Ok(v)
    }
}
