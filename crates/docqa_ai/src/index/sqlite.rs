use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use docqa_core::db;
use docqa_core::domain::RetrievedChunk;
use docqa_core::error::AppError;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{Map, Value};

use super::distance::{decode_vector, encode_vector, squared_l2};
use super::VectorIndex;

pub const INDEX_FILE_NAME: &str = "index.sqlite";

/// SQLite-backed [`VectorIndex`]. Queries are exact: every vector in the collection is scored.
pub struct SqliteIndex {
    conn: Connection,
    path: Option<PathBuf>,
}

fn sql_err(code: &'static str, message: &'static str) -> impl Fn(rusqlite::Error) -> AppError {
    move |e| AppError::new(code, message).with_details(e.to_string())
}

impl SqliteIndex {
    /// Open (creating if needed) the index stored under `persist_dir`.
    pub fn open(persist_dir: &Path) -> Result<Self, AppError> {
        fs::create_dir_all(persist_dir).map_err(|e| {
            AppError::at_path(
                "INDEX_OPEN_FAILED",
                "Failed to create index directory",
                persist_dir,
                e,
            )
        })?;
        let path = persist_dir.join(INDEX_FILE_NAME);
        let mut conn = db::open(&path)?;
        db::migrate(&mut conn)?;
        tracing::debug!(path = %path.display(), "opened vector index");
        Ok(Self {
            conn,
            path: Some(path),
        })
    }

    /// Like [`SqliteIndex::open`], but the directory must already exist.
    pub fn open_existing(persist_dir: &Path) -> Result<Self, AppError> {
        if !persist_dir.is_dir() {
            return Err(AppError::at_path(
                "INDEX_NOT_FOUND",
                "Persist directory not found; build the index first",
                persist_dir,
                "not a directory",
            ));
        }
        Self::open(persist_dir)
    }

    pub fn open_in_memory() -> Result<Self, AppError> {
        let mut conn = db::open_in_memory()?;
        db::migrate(&mut conn)?;
        Ok(Self { conn, path: None })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Vector dimension fixed for `collection`, or `None` if it has never been written.
    pub fn collection_dims(&self, collection: &str) -> Result<Option<usize>, AppError> {
        let dims: Option<i64> = self
            .conn
            .query_row(
                "SELECT dims FROM collections WHERE name = ?1",
                [collection],
                |row| row.get(0),
            )
            .optional()
            .map_err(sql_err("INDEX_QUERY_FAILED", "Failed to read collection"))?;
        Ok(dims.map(|d| d as usize))
    }

    pub fn count(&self, collection: &str) -> Result<usize, AppError> {
        let n: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM embeddings WHERE collection = ?1",
                [collection],
                |row| row.get(0),
            )
            .map_err(sql_err("INDEX_QUERY_FAILED", "Failed to count records"))?;
        Ok(n as usize)
    }
}

fn validate_upsert(
    collection: &str,
    ids: &[String],
    documents: &[String],
    metadatas: &[Map<String, Value>],
    embeddings: &[Vec<f32>],
) -> Result<Option<usize>, AppError> {
    let invalid = |msg: &str, details: String| {
        AppError::new("INDEX_UPSERT_INVALID", msg).with_details(details)
    };
    if collection.trim().is_empty() {
        return Err(invalid("Collection name must not be empty", String::new()));
    }
    let n = ids.len();
    if documents.len() != n || metadatas.len() != n || embeddings.len() != n {
        return Err(invalid(
            "Upsert inputs must have equal lengths",
            format!(
                "ids={n}; documents={}; metadatas={}; embeddings={}",
                documents.len(),
                metadatas.len(),
                embeddings.len()
            ),
        ));
    }
    let mut seen = HashSet::with_capacity(n);
    for id in ids {
        if !seen.insert(id.as_str()) {
            return Err(invalid("Duplicate id in upsert", format!("id={id}")));
        }
    }

    let Some(first) = embeddings.first() else {
        return Ok(None);
    };
    let dims = first.len();
    if dims == 0 {
        return Err(invalid("Embeddings must not be empty", format!("id={}", ids[0])));
    }
    for (id, v) in ids.iter().zip(embeddings) {
        if v.len() != dims {
            return Err(AppError::new(
                "INDEX_DIMS_MISMATCH",
                "Embeddings in one upsert must share a dimension",
            )
            .with_details(format!("id={id}; expected={dims}; got={}", v.len())));
        }
    }
    Ok(Some(dims))
}

impl VectorIndex for SqliteIndex {
    fn upsert(
        &mut self,
        collection: &str,
        ids: &[String],
        documents: &[String],
        metadatas: &[Map<String, Value>],
        embeddings: &[Vec<f32>],
    ) -> Result<usize, AppError> {
        let Some(dims) = validate_upsert(collection, ids, documents, metadatas, embeddings)? else {
            return Ok(0);
        };

        let tx = self
            .conn
            .transaction()
            .map_err(sql_err("INDEX_UPSERT_FAILED", "Failed to start upsert transaction"))?;

        let existing: Option<i64> = tx
            .query_row(
                "SELECT dims FROM collections WHERE name = ?1",
                [collection],
                |row| row.get(0),
            )
            .optional()
            .map_err(sql_err("INDEX_UPSERT_FAILED", "Failed to read collection"))?;
        match existing {
            Some(d) if d as usize != dims => {
                return Err(AppError::new(
                    "INDEX_DIMS_MISMATCH",
                    "Embedding dimension differs from the collection's",
                )
                .with_details(format!("collection={collection}; expected={d}; got={dims}")));
            }
            Some(_) => {}
            None => {
                tx.execute(
                    "INSERT INTO collections(name, dims, created_at) VALUES (?1, ?2, strftime('%Y-%m-%dT%H:%M:%fZ','now'))",
                    params![collection, dims as i64],
                )
                .map_err(sql_err("INDEX_UPSERT_FAILED", "Failed to create collection"))?;
                tracing::debug!(collection, dims, "created collection");
            }
        }

        {
            let mut stmt = tx
                .prepare(
                    r#"
                    INSERT INTO embeddings(collection, id, document, metadata_json, vector)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    ON CONFLICT(collection, id) DO UPDATE SET
                      document = excluded.document,
                      metadata_json = excluded.metadata_json,
                      vector = excluded.vector
                    "#,
                )
                .map_err(sql_err("INDEX_UPSERT_FAILED", "Failed to prepare upsert"))?;
            for i in 0..ids.len() {
                let metadata_json = serde_json::to_string(&metadatas[i]).map_err(|e| {
                    AppError::new("INDEX_UPSERT_FAILED", "Failed to encode metadata")
                        .with_details(format!("id={}; err={e}", ids[i]))
                })?;
                stmt.execute(params![
                    collection,
                    ids[i],
                    documents[i],
                    metadata_json,
                    encode_vector(&embeddings[i]),
                ])
                .map_err(sql_err("INDEX_UPSERT_FAILED", "Failed to write record"))?;
            }
        }

        tx.commit()
            .map_err(sql_err("INDEX_UPSERT_FAILED", "Failed to commit upsert"))?;
        Ok(ids.len())
    }

    fn query(
        &self,
        collection: &str,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<RetrievedChunk>, AppError> {
        let dims = self.collection_dims(collection)?.ok_or_else(|| {
            AppError::new("INDEX_COLLECTION_NOT_FOUND", "Collection does not exist")
                .with_details(format!("collection={collection}"))
        })?;
        if k == 0 {
            return Ok(Vec::new());
        }
        if embedding.len() != dims {
            return Err(AppError::new(
                "INDEX_DIMS_MISMATCH",
                "Query embedding dimension differs from the collection's",
            )
            .with_details(format!("collection={collection}; expected={dims}; got={}", embedding.len())));
        }

        let read_err = sql_err("INDEX_QUERY_FAILED", "Failed to read records");
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, document, metadata_json, vector FROM embeddings WHERE collection = ?1",
            )
            .map_err(&read_err)?;
        let rows = stmt
            .query_map([collection], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Vec<u8>>(3)?,
                ))
            })
            .map_err(&read_err)?;

        let mut scored: Vec<(f32, String, String, String)> = Vec::new();
        for row in rows {
            let (id, document, metadata_json, blob) = row.map_err(&read_err)?;
            let v = decode_vector(&blob)
                .filter(|v| v.len() == dims)
                .ok_or_else(|| {
                    AppError::new("INDEX_CORRUPT", "Stored vector has the wrong size")
                        .with_details(format!("collection={collection}; id={id}; bytes={}", blob.len()))
                })?;
            scored.push((squared_l2(embedding, &v), id, document, metadata_json));
        }

        scored.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
        scored.truncate(k);

        scored
            .into_iter()
            .map(|(distance, id, document, metadata_json)| {
                let metadata: Map<String, Value> =
                    serde_json::from_str(&metadata_json).map_err(|e| {
                        AppError::new("INDEX_CORRUPT", "Stored metadata is not a JSON object")
                            .with_details(format!("id={id}; err={e}"))
                    })?;
                Ok(RetrievedChunk {
                    id: Some(id),
                    document: Some(document),
                    metadata: Some(metadata),
                    distance: Some(distance),
                })
            })
            .collect()
    }
}
