//! Core library: chunking, embeddings, vector indexing, gap analysis, risk scoring.

pub mod analyzer;
pub mod chunker;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod models;
pub mod risk;
pub mod vectorstore;

pub use error::CoreError;
