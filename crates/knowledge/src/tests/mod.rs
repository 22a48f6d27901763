//! Cross-module tests for the knowledge pipeline.

mod pipeline;
