use crate::error::CoreError;
use providers::{EmbeddingProvider, ProviderRegistry};
use std::sync::Arc;
use tracing::debug;

/// Thin wrapper binding the engines to one resolved embedding provider.
///
/// Resolution happens once at construction; an unknown provider name fails
/// here, before any analysis request is accepted.
#[derive(Clone)]
pub struct Embedder {
    provider: Arc<dyn EmbeddingProvider>,
}

impl Embedder {
    pub fn from_registry(
        registry: &ProviderRegistry,
        name: Option<&str>,
    ) -> Result<Self, CoreError> {
        let provider = registry.embedding(name)?;
        Ok(Self { provider })
    }

    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self { provider }
    }

    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CoreError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!(count = texts.len(), "embedding batch");
        let resp = self.provider.embed(texts).await?;
        if resp.vectors.len() != texts.len() {
            return Err(CoreError::Embedding(providers::ProviderError::CountMismatch {
                sent: texts.len(),
                got: resp.vectors.len(),
            }));
        }
        Ok(resp.vectors)
    }

    pub async fn embed_one(&self, text: &str) -> Result<Vec<f32>, CoreError> {
        Ok(self.provider.embed_one(text).await?)
    }

    pub fn dimension(&self) -> usize {
        self.provider.dimension()
    }
}
