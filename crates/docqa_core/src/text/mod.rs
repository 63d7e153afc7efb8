pub mod chunk;
pub mod segment;

pub use chunk::{build_chunks, char_len, chunk_id_for, chunk_text, Chunk};
pub use segment::{normalize_line_endings, segment};
