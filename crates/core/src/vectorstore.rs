use crate::error::CoreError;
use crate::models::Collection;
use sqlx::SqlitePool;
use std::cmp::Ordering;
use std::collections::HashMap;
use storage::models::VectorRow;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// One indexed entry: embedding, source text, and exact-match metadata.
#[derive(Debug, Clone)]
pub struct StoredVector {
    pub id: String,
    pub embedding: Vec<f32>,
    pub document: String,
    pub metadata: HashMap<String, String>,
    seq: i64,
}

/// One ranked query result, ascending by distance.
#[derive(Debug, Clone)]
pub struct QueryHit {
    pub id: String,
    pub document: String,
    pub metadata: HashMap<String, String>,
    pub distance: f32,
}

#[derive(Debug)]
struct IndexState {
    collections: HashMap<Collection, Vec<StoredVector>>,
    next_seq: i64,
    pool: Option<SqlitePool>,
}

/// Per-collection nearest-neighbor store over cosine distance.
///
/// Upserts replace by exact id and are serialized behind the write lock;
/// queries share the read lock and run concurrently. When opened with a pool,
/// every upsert is written through to SQLite so the index survives restarts.
#[derive(Debug)]
pub struct VectorIndex {
    inner: RwLock<IndexState>,
}

impl VectorIndex {
    pub fn in_memory() -> Self {
        Self {
            inner: RwLock::new(IndexState {
                collections: HashMap::new(),
                next_seq: 1,
                pool: None,
            }),
        }
    }

    /// Load both collections from SQLite and write subsequent upserts through.
    pub async fn open(pool: SqlitePool) -> Result<Self, CoreError> {
        let mut collections: HashMap<Collection, Vec<StoredVector>> = HashMap::new();
        for collection in [Collection::Frameworks, Collection::Policies] {
            let rows = storage::load_collection(&pool, collection.as_str()).await?;
            let mut entries = Vec::with_capacity(rows.len());
            for row in rows {
                // A row that no longer decodes is a storage failure, not an
                // empty entry.
                let embedding = serde_json::from_str(&row.embedding).map_err(|e| {
                    CoreError::CorruptIndexRow {
                        collection: row.collection.clone(),
                        id: row.id.clone(),
                        source: e,
                    }
                })?;
                let metadata = serde_json::from_str(&row.metadata_json).map_err(|e| {
                    CoreError::CorruptIndexRow {
                        collection: row.collection.clone(),
                        id: row.id.clone(),
                        source: e,
                    }
                })?;
                entries.push(StoredVector {
                    id: row.id,
                    embedding,
                    document: row.document,
                    metadata,
                    seq: row.seq,
                });
            }
            info!(
                collection = collection.as_str(),
                entries = entries.len(),
                "loaded vector collection"
            );
            collections.insert(collection, entries);
        }
        let next_seq = storage::max_seq(&pool).await? + 1;
        Ok(Self {
            inner: RwLock::new(IndexState {
                collections,
                next_seq,
                pool: Some(pool),
            }),
        })
    }

    /// Insert or replace the entry with `id`. A replace keeps the original
    /// insertion order so tie-breaks stay stable across re-indexing.
    pub async fn upsert(
        &self,
        collection: Collection,
        id: &str,
        embedding: Vec<f32>,
        document: &str,
        metadata: HashMap<String, String>,
    ) -> Result<(), CoreError> {
        let mut state = self.inner.write().await;

        if let Some(existing) = state
            .collections
            .get(&collection)
            .and_then(|entries| entries.iter().find(|e| e.id != id))
        {
            if existing.embedding.len() != embedding.len() {
                return Err(CoreError::DimensionMismatch {
                    expected: existing.embedding.len(),
                    got: embedding.len(),
                });
            }
        }

        let position = state
            .collections
            .get(&collection)
            .and_then(|entries| entries.iter().position(|e| e.id == id));

        let seq = match position {
            Some(i) => {
                let entries = state.collections.entry(collection).or_default();
                let existing = &mut entries[i];
                existing.embedding = embedding.clone();
                existing.document = document.to_string();
                existing.metadata = metadata.clone();
                existing.seq
            }
            None => {
                let seq = state.next_seq;
                state.next_seq += 1;
                state.collections.entry(collection).or_default().push(StoredVector {
                    id: id.to_string(),
                    embedding: embedding.clone(),
                    document: document.to_string(),
                    metadata: metadata.clone(),
                    seq,
                });
                seq
            }
        };

        if let Some(pool) = state.pool.clone() {
            let row = VectorRow {
                collection: collection.as_str().to_string(),
                id: id.to_string(),
                embedding: serde_json::to_string(&embedding).unwrap_or_else(|_| "[]".into()),
                document: document.to_string(),
                metadata_json: serde_json::to_string(&metadata).unwrap_or_else(|_| "{}".into()),
                seq,
            };
            storage::upsert_vector(&pool, &row).await?;
        }

        debug!(collection = collection.as_str(), id, "upserted vector");
        Ok(())
    }

    /// Nearest neighbors by ascending cosine distance, truncated to `top_k`.
    /// `filter` restricts candidates to exact key/value metadata matches.
    pub async fn query(
        &self,
        collection: Collection,
        vector: &[f32],
        top_k: usize,
        filter: Option<&HashMap<String, String>>,
    ) -> Result<Vec<QueryHit>, CoreError> {
        let state = self.inner.read().await;
        let entries = match state.collections.get(&collection) {
            Some(entries) => entries,
            None => return Ok(Vec::new()),
        };

        if let Some(first) = entries.first() {
            if first.embedding.len() != vector.len() {
                return Err(CoreError::DimensionMismatch {
                    expected: first.embedding.len(),
                    got: vector.len(),
                });
            }
        }

        let mut hits: Vec<(&StoredVector, f32)> = entries
            .iter()
            .filter(|e| matches_filter(&e.metadata, filter))
            .map(|e| (e, cosine_distance(&e.embedding, vector)))
            .collect();

        // Stable ordering: distance, then insertion seq, then id.
        hits.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.seq.cmp(&b.0.seq))
                .then_with(|| a.0.id.cmp(&b.0.id))
        });

        Ok(hits
            .into_iter()
            .take(top_k.max(1))
            .map(|(e, distance)| QueryHit {
                id: e.id.clone(),
                document: e.document.clone(),
                metadata: e.metadata.clone(),
                distance,
            })
            .collect())
    }

    /// Remove every entry whose metadata matches the filter exactly.
    /// Returns the number of entries removed.
    pub async fn delete(
        &self,
        collection: Collection,
        filter: &HashMap<String, String>,
    ) -> Result<usize, CoreError> {
        let mut state = self.inner.write().await;
        let removed_ids: Vec<String> = state
            .collections
            .get(&collection)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|e| matches_filter(&e.metadata, Some(filter)))
                    .map(|e| e.id.clone())
                    .collect()
            })
            .unwrap_or_default();
        if removed_ids.is_empty() {
            return Ok(0);
        }

        if let Some(entries) = state.collections.get_mut(&collection) {
            entries.retain(|e| !matches_filter(&e.metadata, Some(filter)));
        }
        if let Some(pool) = state.pool.clone() {
            for id in &removed_ids {
                storage::delete_vector(&pool, collection.as_str(), id).await?;
            }
        }

        debug!(
            collection = collection.as_str(),
            removed = removed_ids.len(),
            "deleted vectors by filter"
        );
        Ok(removed_ids.len())
    }

    /// Number of entries matching the filter; used to observe idempotent
    /// re-indexing.
    pub async fn count(
        &self,
        collection: Collection,
        filter: Option<&HashMap<String, String>>,
    ) -> usize {
        let state = self.inner.read().await;
        state
            .collections
            .get(&collection)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|e| matches_filter(&e.metadata, filter))
                    .count()
            })
            .unwrap_or(0)
    }
}

fn matches_filter(
    metadata: &HashMap<String, String>,
    filter: Option<&HashMap<String, String>>,
) -> bool {
    match filter {
        None => true,
        Some(filter) => filter
            .iter()
            .all(|(k, v)| metadata.get(k).map(|m| m == v).unwrap_or(false)),
    }
}

/// `1 - cos(a, b)`; zero-norm inputs are treated as maximally distant.
fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a * norm_b)
}
