//! Structured case analysis of FIR and complaint text.
//!
//! The provider is asked for a JSON object; anything that cannot be turned
//! into a [`CaseAnalysis`] yields [`CaseAnalysis::unavailable`].

use lexcase_core::{AppError, AppResult};
use lexcase_llm::retry::timeout_error;
use lexcase_llm::{LlmClient, LlmRequest};
use lexcase_prompt::{build_case_analysis_prompt, PromptDefinition};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

pub const ANALYSIS_FAILED_SUMMARY: &str = "Analysis failed. Please try again.";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaseAnalysis {
    #[serde(default, deserialize_with = "lenient_text")]
    pub summary: String,

    #[serde(default, deserialize_with = "lenient_list")]
    pub chronological_facts: Vec<String>,

    #[serde(
        rename = "potential_bns_sections",
        default,
        deserialize_with = "lenient_list"
    )]
    pub statutory_sections: Vec<String>,

    #[serde(default, deserialize_with = "lenient_metadata")]
    pub metadata: CaseMetadata,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaseMetadata {
    #[serde(default, deserialize_with = "lenient_text")]
    pub incident_date: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub incident_time: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub location: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub complainant: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub accused: String,
}

impl CaseAnalysis {
    /// The fixed structure returned when analysis cannot be produced.
    pub fn unavailable() -> Self {
        Self {
            summary: ANALYSIS_FAILED_SUMMARY.to_string(),
            ..Self::default()
        }
    }

    pub fn is_unavailable(&self) -> bool {
        *self == Self::unavailable()
    }
}

fn value_to_text(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        Value::Array(items) => items
            .into_iter()
            .map(value_to_text)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

// Providers sometimes send a list where a string is expected, or null.
fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(value_to_text(Value::deserialize(deserializer)?))
}

fn lenient_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => Vec::new(),
        Value::Array(items) => items
            .into_iter()
            .map(value_to_text)
            .filter(|s| !s.is_empty())
            .collect(),
        other => vec![value_to_text(other)],
    })
}

// Anything other than an object (null, "Unknown", a list) means no metadata.
fn lenient_metadata<'de, D: Deserializer<'de>>(deserializer: D) -> Result<CaseMetadata, D::Error> {
    match Value::deserialize(deserializer)? {
        value @ Value::Object(_) => serde_json::from_value(value).map_err(serde::de::Error::custom),
        _ => Ok(CaseMetadata::default()),
    }
}

/// Strip markdown code fences around a JSON reply.
pub fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        // Drop the info string (e.g. "json") up to the end of the fence line
        text = match rest.find('\n') {
            Some(idx) => &rest[idx + 1..],
            None => rest.trim_start_matches("json"),
        };
    }
    if let Some(rest) = text.trim_end().strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

/// Parse a provider reply into a [`CaseAnalysis`].
pub fn parse_analysis(raw: &str) -> AppResult<CaseAnalysis> {
    let cleaned = strip_code_fences(raw);
    match serde_json::from_str::<CaseAnalysis>(cleaned) {
        Ok(analysis) => Ok(analysis),
        Err(first_err) => {
            // Tolerate prose around the object
            let start = cleaned.find('{');
            let end = cleaned.rfind('}');
            match (start, end) {
                (Some(start), Some(end)) if start < end => {
                    serde_json::from_str(&cleaned[start..=end])
                        .map_err(|e| AppError::Parse(format!("Invalid analysis JSON: {}", e)))
                }
                _ => Err(AppError::Parse(format!("Invalid analysis JSON: {}", first_err))),
            }
        }
    }
}

/// Extracts a structured summary, timeline, statutory sections and incident
/// metadata from case text.
pub struct CaseAnalyzer {
    llm: Arc<dyn LlmClient>,
    model: String,
    prompt: PromptDefinition,
    timeout: Duration,
}

impl CaseAnalyzer {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        model: impl Into<String>,
        prompt: PromptDefinition,
        timeout: Duration,
    ) -> Self {
        Self {
            llm,
            model: model.into(),
            prompt,
            timeout,
        }
    }

    /// Never fails; see [`CaseAnalysis::unavailable`].
    pub async fn analyze(&self, text: &str) -> CaseAnalysis {
        match self.try_analyze(text).await {
            Ok(analysis) => analysis,
            Err(err) => {
                tracing::error!("Case analysis failed: {}", err);
                CaseAnalysis::unavailable()
            }
        }
    }

    async fn try_analyze(&self, text: &str) -> AppResult<CaseAnalysis> {
        let built = build_case_analysis_prompt(&self.prompt, text)?;
        let request = LlmRequest::new(built.user, &self.model);

        let response = tokio::time::timeout(self.timeout, self.llm.complete(&request))
            .await
            .map_err(|_| timeout_error("case analysis", self.timeout))??;

        tracing::debug!("Analysis reply: {} chars", response.content.len());
        parse_analysis(&response.content)
    }
}
