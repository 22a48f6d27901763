//! RAG response types.

use serde::{Deserialize, Serialize};

/// Prefix of every answer produced when generation is unavailable.
pub const DEGRADED_NOTICE: &str = "System Notice: Remote Intelligence Offline.";

/// Response from a RAG chat request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagResponse {
    /// Generated answer, or the degraded notice
    pub answer: String,

    /// Passages injected into the prompt
    pub context: Vec<String>,

    /// True when `answer` is the degraded notice
    pub degraded: bool,
}

impl RagResponse {
    pub fn answered(answer: String, context: Vec<String>) -> Self {
        Self {
            answer,
            context,
            degraded: false,
        }
    }

    /// Build the degraded notice. Error detail is included only on request.
    pub fn degraded(context: Vec<String>, detail: Option<&str>) -> Self {
        let answer = match detail {
            Some(detail) => format!("{} (Error: {})", DEGRADED_NOTICE, detail),
            None => format!("{} Please try again later.", DEGRADED_NOTICE),
        };
        Self {
            answer,
            context,
            degraded: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degraded_hides_detail_by_default() {
        let response = RagResponse::degraded(Vec::new(), None);
        assert!(response.answer.starts_with(DEGRADED_NOTICE));
        assert!(!response.answer.contains("Error"));
        assert!(response.degraded);
    }

    #[test]
    fn test_degraded_with_detail() {
        let response = RagResponse::degraded(Vec::new(), Some("503 from upstream"));
        assert_eq!(
            response.answer,
            "System Notice: Remote Intelligence Offline. (Error: 503 from upstream)"
        );
    }
}
