use std::fs;
use std::path::{Path, PathBuf};

use docqa_core::error::AppError;
use docqa_core::metrics::now_rfc3339_utc;
use docqa_core::text::{build_chunks, segment, Chunk};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::embeddings::Embedder;
use crate::index::VectorIndex;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexBuildInput {
    pub input_path: PathBuf,
    pub persist_dir: PathBuf,
    pub collection_name: String,
    pub model: String,
    pub approx_chars: usize,
    pub overlap_chars: usize,
    pub batch_size: usize,
    /// Advisory only: fewer chunks than this logs a warning.
    pub min_chunks: usize,
}

/// Written next to the index as `<collection>_manifest.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexManifest {
    pub input_path: String,
    pub collection_name: String,
    pub persist_dir: String,
    pub n_chunks: usize,
    pub model: String,
    pub approx_chars: usize,
    pub overlap_chars: usize,
    pub created_at: String,
}

pub fn manifest_path(persist_dir: &Path, collection: &str) -> PathBuf {
    persist_dir.join(format!("{collection}_manifest.json"))
}

/// Canonical form of `path` for the manifest; the path as given if it cannot be resolved.
fn absolute_display(path: &Path) -> String {
    fs::canonicalize(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}

fn sha256_hex(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

fn chunk_metadata(chunk: &Chunk, source: &str) -> Map<String, Value> {
    let mut m = Map::new();
    m.insert("chunk_id".to_string(), Value::from(chunk.chunk_id.clone()));
    m.insert("source".to_string(), Value::from(source));
    m.insert("chunk_index".to_string(), Value::from(chunk.index));
    m.insert("text_sha256".to_string(), Value::from(sha256_hex(&chunk.text)));
    m
}

fn write_manifest(path: &Path, manifest: &IndexManifest) -> Result<(), AppError> {
    let tmp = path.with_extension("tmp");
    let json = serde_json::to_string_pretty(manifest).map_err(|e| {
        AppError::new("INDEX_BUILD_FAILED", "Failed to encode index manifest")
            .with_details(e.to_string())
    })?;
    fs::write(&tmp, json.as_bytes()).map_err(|e| {
        AppError::at_path("INDEX_BUILD_FAILED", "Failed to write index manifest", &tmp, e)
    })?;
    fs::rename(&tmp, path).map_err(|e| {
        AppError::new("INDEX_BUILD_FAILED", "Failed to finalize index manifest write")
            .with_details(format!("tmp={}; dest={}; err={}", tmp.display(), path.display(), e))
    })
}

/// Chunk `input.input_path`, embed every chunk and upsert it into `index`, then write the
/// manifest under `input.persist_dir`.
pub fn build_index(
    index: &mut dyn VectorIndex,
    embedder: &dyn Embedder,
    input: IndexBuildInput,
) -> Result<IndexManifest, AppError> {
    let path = &input.input_path;
    if !path.is_file() {
        return Err(AppError::at_path(
            "INPUT_NOT_FOUND",
            "Input document not found",
            path,
            "not a file",
        ));
    }
    if input.approx_chars == 0 || input.batch_size == 0 {
        return Err(AppError::new(
            "INDEX_BUILD_INVALID",
            "approx_chars and batch_size must be positive",
        )
        .with_details(format!(
            "approx_chars={}; batch_size={}",
            input.approx_chars, input.batch_size
        )));
    }
    let text = fs::read_to_string(path)
        .map_err(|e| AppError::at_path("INPUT_READ_FAILED", "Failed to read input document", path, e))?;

    let sentences = segment(&text);
    tracing::info!(sentences = sentences.len(), path = %path.display(), "segmented input");
    let chunks = build_chunks(&sentences, input.approx_chars, input.overlap_chars);
    tracing::info!(chunks = chunks.len(), "built chunks");
    if chunks.is_empty() {
        return Err(AppError::at_path(
            "INDEX_BUILD_EMPTY",
            "Input document produced no chunks",
            path,
            "empty after segmentation",
        ));
    }
    if chunks.len() < input.min_chunks {
        tracing::warn!(
            chunks = chunks.len(),
            min_chunks = input.min_chunks,
            "few chunks; consider a smaller approx_chars"
        );
    }

    let source = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut written = 0usize;
    for (batch_no, batch) in chunks.chunks(input.batch_size).enumerate() {
        let ids: Vec<String> = batch.iter().map(|c| c.chunk_id.clone()).collect();
        let documents: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let metadatas: Vec<Map<String, Value>> =
            batch.iter().map(|c| chunk_metadata(c, &source)).collect();
        let embeddings = embedder.embed_batch(&input.model, &documents)?;
        if embeddings.len() != documents.len() {
            return Err(AppError::new(
                "EMBEDDINGS_FAILED",
                "Embedder returned the wrong number of vectors",
            )
            .with_details(format!("expected={}; got={}", documents.len(), embeddings.len())));
        }
        written += index.upsert(
            &input.collection_name,
            &ids,
            &documents,
            &metadatas,
            &embeddings,
        )?;
        tracing::debug!(batch = batch_no, size = batch.len(), "upserted batch");
    }
    tracing::info!(
        upserted = written,
        collection = %input.collection_name,
        "index updated"
    );

    fs::create_dir_all(&input.persist_dir).map_err(|e| {
        AppError::at_path(
            "INDEX_BUILD_FAILED",
            "Failed to create persist directory",
            &input.persist_dir,
            e,
        )
    })?;
    let manifest = IndexManifest {
        input_path: absolute_display(path),
        collection_name: input.collection_name.clone(),
        persist_dir: absolute_display(&input.persist_dir),
        n_chunks: chunks.len(),
        model: input.model.clone(),
        approx_chars: input.approx_chars,
        overlap_chars: input.overlap_chars,
        created_at: now_rfc3339_utc()?,
    };
    write_manifest(
        &manifest_path(&input.persist_dir, &input.collection_name),
        &manifest,
    )?;
    Ok(manifest)
}
