use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A chunk as handed back by the vector index for one query.
///
/// Every field is optional. Partially filled records, such as JSON saved by other tools,
/// still deserialize, and absent parts contribute nothing downstream.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RetrievedChunk {
    #[serde(default, alias = "doc_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub document: Option<String>,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
    #[serde(default, alias = "relevance_score")]
    pub distance: Option<f32>,
}

impl RetrievedChunk {
    pub fn document_text(&self) -> &str {
        self.document.as_deref().unwrap_or("")
    }

    /// Chunk identifier from metadata: `chunk_id`, falling back to `id`. Empty or non-string
    /// values count as absent.
    pub fn metadata_chunk_id(&self) -> Option<&str> {
        let meta = self.metadata.as_ref()?;
        ["chunk_id", "id"]
            .iter()
            .filter_map(|key| meta.get(*key).and_then(Value::as_str))
            .find(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_chunk_id_with_fallback() {
        let c: RetrievedChunk = serde_json::from_value(serde_json::json!({
            "document": "text",
            "metadata": { "chunk_id": "", "id": "chunk_0007" }
        }))
        .expect("decode");
        assert_eq!(c.metadata_chunk_id(), Some("chunk_0007"));

        let bare = RetrievedChunk::default();
        assert_eq!(bare.metadata_chunk_id(), None);
        assert_eq!(bare.document_text(), "");
    }

    #[test]
    fn accepts_legacy_field_names() {
        let c: RetrievedChunk = serde_json::from_value(serde_json::json!({
            "doc_id": "chunk_0001",
            "document": null,
            "metadata": { "chunk_id": 12 },
            "relevance_score": 0.25
        }))
        .expect("decode");
        assert_eq!(c.id.as_deref(), Some("chunk_0001"));
        assert_eq!(c.distance, Some(0.25));
        assert_eq!(c.metadata_chunk_id(), None);
    }
}
