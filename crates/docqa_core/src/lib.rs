pub mod config;
pub mod db;
pub mod demo;
pub mod domain;
pub mod error;
pub mod eval;
pub mod lexical;
pub mod metrics;
pub mod text;
