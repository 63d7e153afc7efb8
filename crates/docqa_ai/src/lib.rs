pub mod embeddings;
mod http;
pub mod index;
pub mod llm;
pub mod ollama;
pub mod pipeline;
