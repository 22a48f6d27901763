//! RAG (Retrieval-Augmented Generation) answering for the legal assistant.
//!
//! Retrieval failures degrade to an answer without context; generation
//! failures degrade to a fixed notice. Callers always get text back.

pub mod ask;
pub mod types;

pub use ask::RagOrchestrator;
pub use types::{RagResponse, DEGRADED_NOTICE};
