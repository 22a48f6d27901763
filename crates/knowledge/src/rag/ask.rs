//! RAG answering orchestration.
//!
//! Retrieves relevant passages, composes the legal-advisor prompt and
//! generates an answer, falling back to the degraded notice on any failure.

use crate::rag::types::RagResponse;
use crate::retriever::Retriever;
use lexcase_core::{AppError, AppResult};
use lexcase_llm::retry::timeout_error;
use lexcase_llm::{ChatTurn, LlmClient, LlmRequest};
use lexcase_prompt::{build_rag_prompt, PromptDefinition};
use std::sync::Arc;
use std::time::Duration;

/// Stateless per-request pipeline: retrieve, compose, generate, respond.
pub struct RagOrchestrator {
    retriever: Retriever,
    llm: Arc<dyn LlmClient>,
    model: String,
    prompt: PromptDefinition,
    generation_timeout: Duration,
    debug_errors: bool,
}

impl RagOrchestrator {
    pub fn new(
        retriever: Retriever,
        llm: Arc<dyn LlmClient>,
        model: impl Into<String>,
        prompt: PromptDefinition,
        generation_timeout: Duration,
        debug_errors: bool,
    ) -> Self {
        Self {
            retriever,
            llm,
            model: model.into(),
            prompt,
            generation_timeout,
            debug_errors,
        }
    }

    /// Answer `message` given prior `history`. Always returns non-empty text.
    pub async fn generate(&self, message: &str, history: &[ChatTurn]) -> String {
        self.answer(message, history).await.answer
    }

    /// Like [`generate`](Self::generate) but also reports the injected
    /// context and whether the answer is degraded.
    pub async fn answer(&self, message: &str, history: &[ChatTurn]) -> RagResponse {
        tracing::info!(
            "Chat request ({} chars, {} history turns)",
            message.chars().count(),
            history.len()
        );

        let context = self.retriever.retrieve(message).await;

        match self.complete(message, history, &context).await {
            Ok(answer) => RagResponse::answered(answer, context),
            Err(err) => {
                tracing::error!("Generation failed, returning degraded notice: {}", err);
                let detail = err.to_string();
                RagResponse::degraded(context, self.debug_errors.then_some(detail.as_str()))
            }
        }
    }

    async fn complete(
        &self,
        message: &str,
        history: &[ChatTurn],
        context: &[String],
    ) -> AppResult<String> {
        let built = build_rag_prompt(&self.prompt, message, context)?;
        tracing::debug!(
            "Prompt {} built with {} passages ({} chars)",
            built.metadata.source_prompt_id,
            built.metadata.context_passages,
            built.user.len()
        );

        let request = LlmRequest::new(built.user, &self.model).with_history(history.to_vec());

        let response = tokio::time::timeout(self.generation_timeout, self.llm.complete(&request))
            .await
            .map_err(|_| timeout_error("generation", self.generation_timeout))??;

        if response.content.trim().is_empty() {
            return Err(AppError::Llm("Provider returned an empty answer".to_string()));
        }
        Ok(response.content)
    }
}
