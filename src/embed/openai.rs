//! OpenAI-compatible embeddings client.
//!
//! Speaks `POST {base_url}/embeddings` with `{"model", "input"}` and a
//! Bearer token, which covers OpenAI itself and the many gateways that
//! imitate its surface.

use std::{
   sync::atomic::{AtomicUsize, Ordering},
   time::Duration,
};

use async_trait::async_trait;
use serde::Deserialize;

use super::{EmbedConfig, Provider};
use crate::error::{Error, Result};

const MAX_ERROR_BODY: usize = 1 << 20;

pub struct OpenAiProvider {
   model:    String,
   api_key:  String,
   base_url: String,
   client:   reqwest::Client,
   dim:      AtomicUsize,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
   data: Vec<EmbeddingRow>,
}

#[derive(Deserialize)]
struct EmbeddingRow {
   embedding: Vec<f32>,
}

impl OpenAiProvider {
   pub fn new(cfg: &EmbedConfig) -> Self {
      Self {
         model:    cfg.model.clone(),
         api_key:  cfg.api_key.clone(),
         base_url: cfg.base_url.trim_end_matches('/').to_string(),
         client:   reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default(),
         dim:      AtomicUsize::new(0),
      }
   }
}

#[async_trait]
impl Provider for OpenAiProvider {
   async fn embed(&self, text: &str) -> Result<Vec<f32>> {
      if self.model.is_empty() {
         return Err(Error::Embeddings(
            "embeddings model is not configured (set AXON_EMBEDDINGS_MODEL)".into(),
         ));
      }
      if self.api_key.is_empty() {
         return Err(Error::Embeddings(
            "embeddings API key is not configured (set AXON_EMBEDDINGS_API_KEY)".into(),
         ));
      }
      if text.trim().is_empty() {
         return Err(Error::Embeddings("cannot embed empty text".into()));
      }

      let response = self
         .client
         .post(format!("{}/embeddings", self.base_url))
         .bearer_auth(&self.api_key)
         .json(&serde_json::json!({ "model": self.model, "input": text }))
         .send()
         .await?;

      let status = response.status();
      let body = response.text().await.unwrap_or_default();
      if !status.is_success() {
         let mut snippet = body.trim().to_string();
         crate::util::clip(&mut snippet, MAX_ERROR_BODY);
         return Err(Error::Http { what: "embeddings request", status: status.as_u16(), body: snippet });
      }

      let parsed: EmbeddingsResponse = serde_json::from_str(&body)
         .map_err(|e| Error::Embeddings(format!("cannot parse embeddings response: {e}")))?;
      let embedding = parsed
         .data
         .into_iter()
         .next()
         .map(|row| row.embedding)
         .filter(|v| !v.is_empty())
         .ok_or_else(|| Error::Embeddings("embeddings response missing embedding".into()))?;

      // The first successful response pins the dimension for this provider.
      let pinned = self.dim.compare_exchange(
         0,
         embedding.len(),
         Ordering::SeqCst,
         Ordering::SeqCst,
      );
      if let Err(existing) = pinned
         && existing != embedding.len()
      {
         return Err(Error::DimChanged { got: embedding.len(), want: existing });
      }

      Ok(embedding)
   }

   fn model_id(&self) -> String {
      format!("openai:{}", self.model)
   }

   fn dim(&self) -> usize {
      self.dim.load(Ordering::SeqCst)
   }
}
