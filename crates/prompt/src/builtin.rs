//! Prompts shipped with the binary.
//!
//! A workspace may replace either one with a YAML file of the same ID (see
//! [`crate::loader::resolve_prompt`]).

use crate::types::{PromptDefinition, PromptOutputSpec};

pub const LEGAL_CHAT_PROMPT_ID: &str = "legal.chat.rag";
pub const CASE_ANALYSIS_PROMPT_ID: &str = "legal.case.analysis";

const LEGAL_ADVISOR_SYSTEM: &str = "You are an expert Indian Legal Advisor backed by the BNS 2023 code. \
Use the provided context to answer if relevant. \
If no context is provided, rely on your general knowledge but mention it.";

// Block tags share a line with other content so Handlebars does not strip
// the surrounding newlines.
const LEGAL_CHAT_TEMPLATE: &str = "{{system}}{{#if context}}\n\nRelevant Legal Context:\n{{context}}{{/if}}\n\nUser Query: {{message}}";

const CASE_ANALYSIS_TEMPLATE: &str = r#"You are an AI Legal Assistant for the Indian Police Force.
Analyze the following case description/FIR text:

"{{text}}"

Return a strictly valid JSON object with the following fields:
1. "summary": A professional executive summary (max 3 sentences).
2. "chronological_facts": A list of strings, each representing a key event in order.
3. "potential_bns_sections": A list of strings (e.g. "BNS 303: Theft").
4. "metadata": {
    "incident_date": "YYYY-MM-DD or Unknown",
    "incident_time": "HH:MM or Unknown",
    "location": "extracted location",
    "complainant": "extracted name or Unknown",
    "accused": "extracted names or Unknown"
}

Ensure the response is pure JSON without markdown formatting."#;

/// Look up a built-in prompt by ID.
pub fn builtin_prompt(id: &str) -> Option<PromptDefinition> {
    match id {
        LEGAL_CHAT_PROMPT_ID => Some(PromptDefinition {
            id: LEGAL_CHAT_PROMPT_ID.to_string(),
            title: "Legal advisor chat with retrieved context".to_string(),
            api_version: "1.0".to_string(),
            created_by: "lexcase".to_string(),
            system: Some(LEGAL_ADVISOR_SYSTEM.to_string()),
            template: LEGAL_CHAT_TEMPLATE.to_string(),
            output: PromptOutputSpec::default(),
        }),
        CASE_ANALYSIS_PROMPT_ID => Some(PromptDefinition {
            id: CASE_ANALYSIS_PROMPT_ID.to_string(),
            title: "Structured case analysis".to_string(),
            api_version: "1.0".to_string(),
            created_by: "lexcase".to_string(),
            system: None,
            template: CASE_ANALYSIS_TEMPLATE.to_string(),
            output: PromptOutputSpec {
                format: "json".to_string(),
            },
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_exist() {
        assert!(builtin_prompt(LEGAL_CHAT_PROMPT_ID).is_some());
        assert_eq!(
            builtin_prompt(CASE_ANALYSIS_PROMPT_ID).unwrap().output.format,
            "json"
        );
        assert!(builtin_prompt("nope").is_none());
    }
}
