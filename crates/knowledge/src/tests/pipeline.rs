//! End-to-end scenarios: indexing, retrieval, chat and case analysis.

use super::fakes::{FakeEmbedder, ScriptedLlm};
use crate::analysis::CaseAnalyzer;
use crate::context::AppContext;
use crate::embeddings::MockProvider;
use crate::indexer::{DocumentIndexer, NOT_INITIALIZED};
use crate::rag::{RagOrchestrator, DEGRADED_NOTICE};
use crate::retriever::Retriever;
use crate::store::VectorStore;
use crate::types::IndexStatus;
use lexcase_core::AppConfig;
use lexcase_llm::{ChatTurn, LlmClient};
use lexcase_prompt::{builtin_prompt, CASE_ANALYSIS_PROMPT_ID, LEGAL_CHAT_PROMPT_ID};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const THEFT_PASSAGE: &str = "Section 303 covers theft offenses.";

async fn open_store(dir: &TempDir, embedder: Arc<dyn crate::EmbeddingProvider>) -> Arc<VectorStore> {
    Arc::new(
        VectorStore::load_or_init(dir.path().join("legal_index.json"), embedder)
            .await
            .unwrap(),
    )
}

fn retriever(store: Option<Arc<VectorStore>>, top_k: usize) -> Retriever {
    Retriever::new(store, top_k, Duration::from_secs(5))
}

fn orchestrator(retriever: Retriever, llm: Arc<dyn LlmClient>, debug_errors: bool) -> RagOrchestrator {
    RagOrchestrator::new(
        retriever,
        llm,
        "test-model",
        builtin_prompt(LEGAL_CHAT_PROMPT_ID).unwrap(),
        Duration::from_secs(5),
        debug_errors,
    )
}

fn sentences_1200() -> String {
    "The accused entered the premises at night. "
        .repeat(30)
        .chars()
        .take(1200)
        .collect()
}

#[tokio::test]
async fn test_empty_corpus_still_answers() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir, Arc::new(FakeEmbedder::new())).await;
    let llm = Arc::new(ScriptedLlm::replying("General guidance on theft."));
    let rag = orchestrator(retriever(Some(store.clone()), 2), llm.clone(), false);

    assert!(retriever(Some(store), 2).retrieve("theft").await.is_empty());

    let response = rag.answer("What is theft?", &[]).await;
    assert_eq!(response.answer, "General guidance on theft.");
    assert!(response.context.is_empty());
    assert!(!response.degraded);

    let prompt = &llm.requests()[0].prompt;
    assert!(!prompt.contains("Relevant Legal Context"));
    assert!(prompt.ends_with("User Query: What is theft?"));
}

#[tokio::test]
async fn test_indexed_passage_is_retrieved_verbatim() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir, Arc::new(MockProvider::new(256))).await;
    let indexer = DocumentIndexer::new(Some(store.clone()), 500, 50);

    assert_eq!(
        indexer.index_document(THEFT_PASSAGE, "bns-303").await,
        IndexStatus::Indexed { chunks: 1 }
    );
    indexer
        .index_document("Section 101 defines murder and its punishment.", "bns-101")
        .await;

    let passages = retriever(Some(store), 2)
        .retrieve_k("Which section covers theft?", 1)
        .await;

    assert_eq!(passages, vec![THEFT_PASSAGE.to_string()]);
}

#[tokio::test]
async fn test_long_document_yields_three_chunks() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir, Arc::new(FakeEmbedder::new())).await;
    let indexer = DocumentIndexer::new(Some(store.clone()), 500, 50);

    let status = indexer.index_document(&sentences_1200(), "fir-17").await;

    assert_eq!(status, IndexStatus::Indexed { chunks: 3 });
    assert_eq!(store.real_len(), 3);
    assert_eq!(store.stats().documents, 1);
}

#[tokio::test]
async fn test_whitespace_document_is_empty() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir, Arc::new(FakeEmbedder::new())).await;
    let indexer = DocumentIndexer::new(Some(store.clone()), 500, 50);

    assert_eq!(indexer.index_document(" \n\t ", "blank").await, IndexStatus::Empty);
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_malformed_analysis_reply_is_unavailable() {
    let llm = Arc::new(ScriptedLlm::replying("I cannot produce JSON today."));
    let analyzer = CaseAnalyzer::new(
        llm,
        "test-model",
        builtin_prompt(CASE_ANALYSIS_PROMPT_ID).unwrap(),
        Duration::from_secs(5),
    );

    let analysis = analyzer.analyze("Complainant reports a stolen phone.").await;

    assert!(analysis.is_unavailable());
}

#[tokio::test]
async fn test_analysis_reply_is_parsed() {
    let reply = r#"```json
{"summary": "Phone theft.", "chronological_facts": ["Phone taken"], "potential_bns_sections": ["BNS 303"], "metadata": {"location": "Pune"}}
```"#;
    let llm = Arc::new(ScriptedLlm::replying(reply));
    let analyzer = CaseAnalyzer::new(
        llm.clone(),
        "test-model",
        builtin_prompt(CASE_ANALYSIS_PROMPT_ID).unwrap(),
        Duration::from_secs(5),
    );

    let analysis = analyzer.analyze("A phone was stolen in Pune.").await;

    assert_eq!(analysis.summary, "Phone theft.");
    assert_eq!(analysis.statutory_sections, vec!["BNS 303".to_string()]);
    assert_eq!(analysis.metadata.location, "Pune");
    assert!(llm.requests()[0].prompt.contains("A phone was stolen in Pune."));
}

#[tokio::test]
async fn test_analysis_provider_error_is_unavailable() {
    let llm = Arc::new(ScriptedLlm::scripted(vec![Err("quota exceeded")]));
    let analyzer = CaseAnalyzer::new(
        llm,
        "test-model",
        builtin_prompt(CASE_ANALYSIS_PROMPT_ID).unwrap(),
        Duration::from_secs(5),
    );

    assert!(analyzer.analyze("text").await.is_unavailable());
}

#[tokio::test]
async fn test_embedding_failure_fails_open() {
    let dir = TempDir::new().unwrap();
    let embedder = Arc::new(FakeEmbedder::new());
    let store = open_store(&dir, embedder.clone()).await;
    DocumentIndexer::new(Some(store.clone()), 500, 50)
        .index_document("Theft is punishable.", "bns")
        .await;

    embedder.set_failing(true);
    let llm = Arc::new(ScriptedLlm::replying("Answer without context."));
    let response = orchestrator(retriever(Some(store), 2), llm, false)
        .answer("theft?", &[])
        .await;

    assert!(response.context.is_empty());
    assert_eq!(response.answer, "Answer without context.");
    assert!(!response.degraded);
}

#[tokio::test]
async fn test_missing_store_fails_open() {
    assert!(retriever(None, 2).retrieve("theft").await.is_empty());

    let llm = Arc::new(ScriptedLlm::replying("Still here."));
    let response = orchestrator(retriever(None, 2), llm, false).answer("theft?", &[]).await;
    assert_eq!(response.answer, "Still here.");
}

#[tokio::test]
async fn test_slow_retrieval_times_out_to_empty() {
    let dir = TempDir::new().unwrap();
    let embedder = Arc::new(FakeEmbedder::new());
    let store = open_store(&dir, embedder.clone()).await;
    embedder.set_delay(Duration::from_millis(500));

    let passages = Retriever::new(Some(store), 2, Duration::from_millis(20))
        .retrieve("theft")
        .await;

    assert!(passages.is_empty());
}

#[tokio::test]
async fn test_generation_error_returns_notice_without_detail() {
    let llm = Arc::new(ScriptedLlm::scripted(vec![Err("quota exceeded")]));
    let response = orchestrator(retriever(None, 2), llm, false).answer("theft?", &[]).await;

    assert!(response.degraded);
    assert!(response.answer.starts_with(DEGRADED_NOTICE));
    assert!(!response.answer.contains("quota"));
}

#[tokio::test]
async fn test_generation_error_detail_when_debugging() {
    let llm = Arc::new(ScriptedLlm::scripted(vec![Err("quota exceeded")]));
    let answer = orchestrator(retriever(None, 2), llm, true).generate("theft?", &[]).await;

    assert!(answer.starts_with(DEGRADED_NOTICE));
    assert!(answer.contains("quota exceeded"));
}

#[tokio::test]
async fn test_generation_timeout_is_degraded() {
    let llm = Arc::new(ScriptedLlm::replying("late").with_delay(Duration::from_millis(500)));
    let rag = RagOrchestrator::new(
        retriever(None, 2),
        llm,
        "test-model",
        builtin_prompt(LEGAL_CHAT_PROMPT_ID).unwrap(),
        Duration::from_millis(20),
        true,
    );

    let response = rag.answer("theft?", &[]).await;

    assert!(response.degraded);
    assert!(response.answer.contains("Timed out"));
}

#[tokio::test]
async fn test_blank_reply_is_degraded() {
    let llm = Arc::new(ScriptedLlm::scripted(vec![Ok("   ")]));
    let response = orchestrator(retriever(None, 2), llm, false).answer("theft?", &[]).await;

    assert!(response.degraded);
    assert!(!response.answer.trim().is_empty());
}

#[tokio::test]
async fn test_history_and_context_reach_provider() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir, Arc::new(FakeEmbedder::new())).await;
    DocumentIndexer::new(Some(store.clone()), 500, 50)
        .index_document("Theft of property is punishable under Section 303.", "bns")
        .await;

    let llm = Arc::new(ScriptedLlm::replying("Section 303 applies."));
    let history = vec![
        ChatTurn::user("My bicycle was taken."),
        ChatTurn::assistant("When did this happen?"),
    ];
    let response = orchestrator(retriever(Some(store), 2), llm.clone(), false)
        .answer("Is this theft?", &history)
        .await;

    assert_eq!(response.context.len(), 1);
    let request = &llm.requests()[0];
    assert_eq!(request.history, history);
    assert_eq!(request.model, "test-model");
    assert!(request.prompt.contains("Relevant Legal Context:\nTheft of property"));
    assert!(request.prompt.ends_with("User Query: Is this theft?"));
}

#[tokio::test]
async fn test_index_paths_filters_and_skips_unchanged() {
    let docs = TempDir::new().unwrap();
    std::fs::write(docs.path().join("bns_303.txt"), "Theft is punishable.").unwrap();
    std::fs::create_dir(docs.path().join("notes")).unwrap();
    std::fs::write(docs.path().join("notes").join("bail.md"), "# Bail\nBail is a right.").unwrap();
    std::fs::write(docs.path().join("scan.pdf"), "%PDF-1.4").unwrap();
    std::fs::write(docs.path().join("blank.txt"), "").unwrap();

    let dir = TempDir::new().unwrap();
    let store = open_store(&dir, Arc::new(FakeEmbedder::new())).await;
    let indexer = DocumentIndexer::new(Some(store.clone()), 500, 50);
    let roots = vec![docs.path().to_path_buf(), PathBuf::from("/nonexistent/lexcase")];

    let report = indexer.index_paths(&roots, &[]).await;
    assert_eq!(report.documents_indexed, 2);
    assert_eq!(report.chunks_added, 2);
    assert_eq!(report.empty, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(store.real_len(), 2);

    let again = indexer.index_paths(&roots[..1], &[]).await;
    assert_eq!(again.documents_indexed, 0);
    assert_eq!(again.unchanged, 2);
    assert_eq!(store.real_len(), 2);

    let pdf_only = indexer.index_paths(&roots[..1], &[".PDF".to_string()]).await;
    assert_eq!(pdf_only.documents_indexed, 1);
}

#[tokio::test]
async fn test_context_opens_index_in_workspace() {
    let workspace = TempDir::new().unwrap();
    let config = AppConfig {
        workspace: workspace.path().to_path_buf(),
        ..AppConfig::default()
    };
    let index_file = config.resolved_index_path();

    let ctx = AppContext::with_providers(
        config,
        Arc::new(FakeEmbedder::new()),
        Arc::new(ScriptedLlm::replying("ok")),
    )
    .await;

    assert!(ctx.store().is_some());
    assert!(index_file.starts_with(workspace.path()));
    assert!(index_file.exists());

    let status = ctx.indexer().index_document(THEFT_PASSAGE, "bns-303").await;
    assert_eq!(status, IndexStatus::Indexed { chunks: 1 });
    assert_eq!(ctx.orchestrator().unwrap().generate("theft?", &[]).await, "ok");
}

#[tokio::test]
async fn test_context_without_index_stays_usable() {
    let workspace = TempDir::new().unwrap();
    let config = AppConfig {
        workspace: workspace.path().to_path_buf(),
        ..AppConfig::default()
    };
    let embedder = FakeEmbedder::new();
    embedder.set_failing(true);

    let ctx = AppContext::with_providers(
        config,
        Arc::new(embedder),
        Arc::new(ScriptedLlm::replying("No context needed.")),
    )
    .await;

    assert!(ctx.store().is_none());
    assert_eq!(
        ctx.indexer().index_document(THEFT_PASSAGE, "bns-303").await,
        IndexStatus::Failed {
            reason: NOT_INITIALIZED.to_string()
        }
    );

    let response = ctx.orchestrator().unwrap().answer("theft?", &[]).await;
    assert_eq!(response.answer, "No context needed.");
    assert!(response.context.is_empty());
}
