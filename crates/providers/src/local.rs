use crate::{EmbedResponse, EmbeddingProvider, ProviderError};

/// Offline feature-hashing embedder.
///
/// Lowercased alphanumeric tokens are hashed with blake3 into `dimension`
/// buckets and the resulting count vector is L2-normalized. The hash is fixed,
/// so the same text always maps to the same vector across processes, and texts
/// sharing vocabulary land close together under cosine distance. No model
/// download, no network.
#[derive(Debug, Clone)]
pub struct LocalHashProvider {
    dimension: usize,
}

impl LocalHashProvider {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for token in tokenize(text) {
            let digest = blake3::hash(token.as_bytes());
            let bytes = digest.as_bytes();
            let bucket =
                u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize % self.dimension;
            vector[bucket] += 1.0;
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

impl Default for LocalHashProvider {
    fn default() -> Self {
        Self::new(384)
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

#[async_trait::async_trait]
impl EmbeddingProvider for LocalHashProvider {
    async fn embed(&self, texts: &[String]) -> Result<EmbedResponse, ProviderError> {
        Ok(EmbedResponse {
            vectors: texts.iter().map(|t| self.embed_text(t)).collect(),
        })
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn deterministic_and_normalized() {
        let provider = LocalHashProvider::new(64);
        let a = provider.embed_one("access controls are implemented").await.unwrap();
        let b = provider.embed_one("access controls are implemented").await.unwrap();
        assert_eq!(a, b);
        let norm = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn batch_matches_single() {
        let provider = LocalHashProvider::new(64);
        let batch = provider
            .embed(&["one text".to_string(), "another text".to_string()])
            .await
            .unwrap();
        let single = provider.embed_one("another text").await.unwrap();
        assert_eq!(batch.vectors[1], single);
    }

    #[tokio::test]
    async fn shared_vocabulary_is_closer() {
        let provider = LocalHashProvider::new(128);
        let q = provider.embed_one("information security policy").await.unwrap();
        let near = provider
            .embed_one("the information security policy is documented")
            .await
            .unwrap();
        let far = provider.embed_one("quarterly sales projections").await.unwrap();
        let dot = |x: &[f32], y: &[f32]| x.iter().zip(y).map(|(a, b)| a * b).sum::<f32>();
        assert!(dot(&q, &near) > dot(&q, &far));
    }

    #[tokio::test]
    async fn empty_text_is_zero_vector() {
        let provider = LocalHashProvider::new(16);
        let v = provider.embed_one("   ").await.unwrap();
        assert!(v.iter().all(|&x| x == 0.0));
    }
}
