//! Embeddings providers.
//!
//! The provider is the only intended polymorphism boundary in axon: anything
//! that can turn text into a fixed-length float vector and name the model it
//! used can back the semantic index.

pub mod dummy;
pub mod openai;

use async_trait::async_trait;

use crate::{
   config,
   error::{Error, Result},
};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Embeds text into a fixed-length float vector.
///
/// Implementations must be deterministic for the same input text and model.
/// The first successful call pins the dimension; later calls returning a
/// different length are an error.
#[async_trait]
pub trait Provider: Send + Sync {
   async fn embed(&self, text: &str) -> Result<Vec<f32>>;
   /// Canonical provider-qualified model identifier,
   /// e.g. `openai:text-embedding-3-small`.
   fn model_id(&self) -> String;
   /// Discovered vector dimension; 0 before the first successful embed.
   fn dim(&self) -> usize;
}

/// Resolved embeddings configuration.
#[derive(Debug, Clone)]
pub struct EmbedConfig {
   pub provider: String,
   pub model:    String,
   pub api_key:  String,
   pub base_url: String,
}

impl EmbedConfig {
   /// Resolves from environment variables first, then `~/.axon/.env`.
   pub fn load() -> Result<Self> {
      let provider = config::config_value("AXON_EMBEDDINGS_PROVIDER")?;
      let model = config::config_value("AXON_EMBEDDINGS_MODEL")?;
      let api_key = config::config_value("AXON_EMBEDDINGS_API_KEY")?;
      let mut base_url = config::config_value("AXON_EMBEDDINGS_BASE_URL")?;
      if base_url.is_empty() {
         base_url = DEFAULT_BASE_URL.to_string();
      }
      Ok(EmbedConfig { provider, model, api_key, base_url })
   }
}

/// Constructs a provider from resolved configuration.
pub fn provider_from_config(cfg: &EmbedConfig) -> Result<Box<dyn Provider>> {
   match cfg.provider.as_str() {
      "" => Err(Error::Embeddings(
         "embeddings provider is not configured (set AXON_EMBEDDINGS_PROVIDER)".into(),
      )),
      "openai" => Ok(Box::new(openai::OpenAiProvider::new(cfg))),
      other => Err(Error::Embeddings(format!("unsupported embeddings provider: {other}"))),
   }
}
