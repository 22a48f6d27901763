//! Prompt system for Lexcase.
//!
//! This crate provides structured prompt management with:
//! - Built-in prompts for the legal chat assistant and case analysis
//! - YAML overrides under `.lexcase/prompts/`
//! - Handlebars template rendering
//! - Retrieved legal context injection

pub mod builder;
pub mod builtin;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::{build_case_analysis_prompt, build_rag_prompt, render_template};
pub use builtin::{builtin_prompt, CASE_ANALYSIS_PROMPT_ID, LEGAL_CHAT_PROMPT_ID};
pub use loader::{list_prompts, load_prompt, resolve_prompt};
pub use types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition, PromptOutputSpec};
