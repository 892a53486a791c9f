use providers::ProviderError;
use thiserror::Error;

/// Boundary and engine errors. Input validation failures are distinct
/// variants so callers can reject bad requests before any scoring runs.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("framework '{0}' is not supported")]
    UnsupportedFramework(String),
    #[error("collection must be 'frameworks' or 'policies', got '{0}'")]
    InvalidCollection(String),
    #[error("at least one risk factor is required")]
    EmptyRiskFactors,
    #[error("risk factor '{name}': {field} value {value} is out of range")]
    FactorOutOfRange {
        name: String,
        field: &'static str,
        value: f64,
    },
    #[error("invalid chunking parameters: chunk_size {chunk_size}, overlap {overlap}")]
    InvalidChunking { chunk_size: usize, overlap: usize },
    #[error("embedding dimension mismatch: index holds {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
    #[error("corrupt index row {collection}/{id}: {source}")]
    CorruptIndexRow {
        collection: String,
        id: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("embedding failed: {0}")]
    Embedding(#[from] ProviderError),
    #[error("vector index storage failed: {0}")]
    Storage(#[from] sqlx::Error),
}
