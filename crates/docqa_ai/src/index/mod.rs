//! Persistent nearest-neighbour index over chunk embeddings.

use docqa_core::domain::RetrievedChunk;
use docqa_core::error::AppError;
use serde_json::{Map, Value};

pub mod distance;
pub mod sqlite;

pub use sqlite::SqliteIndex;

pub trait VectorIndex {
    /// Insert or overwrite records in `collection`. All slices must have the same length and
    /// `ids` must be unique. Returns the number of records written.
    fn upsert(
        &mut self,
        collection: &str,
        ids: &[String],
        documents: &[String],
        metadatas: &[Map<String, Value>],
        embeddings: &[Vec<f32>],
    ) -> Result<usize, AppError>;

    /// Up to `k` records nearest to `embedding`, closest first.
    fn query(
        &self,
        collection: &str,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<RetrievedChunk>, AppError>;
}
