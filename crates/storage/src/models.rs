use serde::{Deserialize, Serialize};

/// One persisted index entry. `embedding` is a JSON-encoded `Vec<f32>` and
/// `metadata_json` a JSON object of string key/value pairs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRow {
    pub collection: String,
    pub id: String,
    pub embedding: String,
    pub document: String,
    pub metadata_json: String,
    pub seq: i64,
}
