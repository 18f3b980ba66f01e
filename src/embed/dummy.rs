//! Lightweight deterministic embedder for tests and tooling.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::Provider;
use crate::error::Result;

/// Hashes the input into a fixed-dimension vector. Deterministic for the same
/// text; no network, no configuration.
pub struct DummyProvider {
   dim:   usize,
   calls: AtomicUsize,
}

impl DummyProvider {
   pub fn new(dim: usize) -> Self {
      Self { dim, calls: AtomicUsize::new(0) }
   }

   /// Number of embed calls served, for reuse assertions in tests.
   pub fn calls(&self) -> usize {
      self.calls.load(Ordering::SeqCst)
   }
}

#[async_trait]
impl Provider for DummyProvider {
   async fn embed(&self, text: &str) -> Result<Vec<f32>> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      let digest = Sha256::digest(text.as_bytes());
      let out = (0..self.dim)
         .map(|i| {
            let byte = digest[i % digest.len()];
            (byte as f32 - 127.5) / 127.5
         })
         .collect();
      Ok(out)
   }

   fn model_id(&self) -> String {
      "dummy:test".to_string()
   }

   fn dim(&self) -> usize {
      self.dim
   }
}
