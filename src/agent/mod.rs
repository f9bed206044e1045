//! Conversation agent: the per-turn state machine
//!
//! Decide → {Search, DirectAnswer}; Search → Answer → Judge →
//! {Rewrite → Search, Terminate}; DirectAnswer → Terminate. The
//! search↔rewrite cycle is an explicit bounded loop so the termination
//! guarantee is visible in the control flow, not implied by graph wiring.
//! The rewrite loop is a quality mechanism only: a failed capability call
//! aborts the whole turn and commits nothing to history.

mod classify;
mod prompts;

use std::sync::Arc;

use crate::config::RagConfig;
use crate::error::Result;
use crate::history::{ChatHistoryStore, MessageRole};
use crate::providers::LlmProvider;
use crate::retrieval::RetrievalGateway;
use crate::types::{ConversationState, TurnRequest, TurnResult};

pub use classify::{parse_retrieval_decision, parse_verdict, RetrievalDecision, Verdict};
pub use prompts::PromptBuilder;

/// Runs user turns against the retrieval gateway and the generation
/// capability
pub struct ConversationAgent {
    llm: Arc<dyn LlmProvider>,
    retrieval: RetrievalGateway,
    history: Arc<dyn ChatHistoryStore>,
    max_rewrites: u32,
    window_size: usize,
    sufficient_markers: Vec<String>,
    temperature: f32,
    history_load_limit: usize,
}

impl ConversationAgent {
    /// Create a new agent
    pub fn new(
        config: &RagConfig,
        llm: Arc<dyn LlmProvider>,
        retrieval: RetrievalGateway,
        history: Arc<dyn ChatHistoryStore>,
    ) -> Self {
        Self {
            llm,
            retrieval,
            history,
            max_rewrites: config.agent.max_rewrites,
            window_size: config.agent.window_size,
            sufficient_markers: config.agent.sufficient_markers.clone(),
            temperature: config.llm.temperature,
            history_load_limit: config.history.load_limit,
        }
    }

    /// Run one user turn to completion and persist it.
    ///
    /// History is appended only after the turn succeeds; a turn that fails
    /// or is cancelled mid-flight contributes nothing to the session.
    pub async fn run_turn(&self, request: &TurnRequest) -> Result<TurnResult> {
        let loaded = self
            .history
            .load_recent(&request.session_id, self.history_load_limit)?;
        let base_len = loaded.len();
        let mut state = ConversationState::new_turn(&request.session_id, &request.question, loaded);

        let decide_output = self
            .llm
            .complete(&PromptBuilder::decide(&state.question), self.temperature)
            .await?;
        let decision = parse_retrieval_decision(&decide_output);
        tracing::info!(?decision, "retrieval decision");

        match decision {
            RetrievalDecision::SkipRag => {
                let prompt =
                    PromptBuilder::direct_answer(state.history_window(self.window_size), &state.question);
                let answer = self.llm.complete(&prompt, self.temperature).await?;
                state = state.with_answer(answer, base_len);
            }
            RetrievalDecision::UseRag => {
                state = self.answer_with_retrieval(state, request.department_id, base_len).await?;
            }
        }

        self.history
            .append(&request.session_id, MessageRole::User, &request.question)?;
        self.history
            .append(&request.session_id, MessageRole::Bot, &state.answer)?;

        Ok(TurnResult {
            answer: state.answer,
            used_retrieval: !state.contexts.is_empty(),
            contexts: state.contexts,
            rewrite_count: state.rewrite_count,
            rewritten_question: state.rewritten_question,
            chat_history: state.chat_history,
        })
    }

    /// The bounded search → answer → judge → rewrite loop. Runs at most
    /// `max_rewrites + 1` cycles; reaching the cap is a normal termination
    /// path and the last answer stands.
    async fn answer_with_retrieval(
        &self,
        mut state: ConversationState,
        department_id: Option<i64>,
        base_len: usize,
    ) -> Result<ConversationState> {
        loop {
            // Search: always fresh retrieval, never stale contexts.
            let contexts = self
                .retrieval
                .retrieve(state.effective_question(), department_id)
                .await?;
            state = state.with_contexts(contexts);

            // Answer
            let prompt = PromptBuilder::answer(
                state.history_window(self.window_size),
                &state.contexts,
                state.effective_question(),
            );
            let answer = self.llm.complete(&prompt, self.temperature).await?;
            state = state.with_answer(answer, base_len);

            // Judge
            let prompt =
                PromptBuilder::judge(state.effective_question(), &state.contexts, &state.answer);
            let reflection = self.llm.complete(&prompt, self.temperature).await?;
            state = state.with_reflection(reflection);

            // The cap is checked before the verdict: once exhausted, the
            // loop terminates no matter what the reflection says.
            if state.rewrite_count >= self.max_rewrites {
                tracing::info!(rewrites = state.rewrite_count, "rewrite budget exhausted");
                return Ok(state);
            }
            if parse_verdict(&state.reflection, &self.sufficient_markers) == Verdict::Sufficient {
                tracing::info!(rewrites = state.rewrite_count, "answer judged sufficient");
                return Ok(state);
            }

            // Rewrite, then back to Search.
            let prompt = PromptBuilder::rewrite(
                state.effective_question(),
                &state.answer,
                &state.contexts,
            );
            let rewritten = self
                .llm
                .complete(&prompt, self.temperature)
                .await?
                .trim()
                .to_string();
            tracing::info!(rewritten = %rewritten, "question reformulated");
            state = state.with_rewrite(rewritten);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::history::MemoryHistoryStore;
    use crate::providers::{
        EmbeddingProvider, MemoryVectorStore, PointPayload, VectorPoint, VectorStoreProvider,
    };
    use crate::types::ChunkMetadata;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    /// LLM double fed a fixed script of responses; records every prompt.
    struct ScriptedLlm {
        responses: Mutex<VecDeque<String>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedLlm {
        fn new(responses: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.iter().map(|s| s.to_string()).collect()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn remaining(&self) -> usize {
            self.responses.lock().len()
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().clone()
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedLlm {
        async fn complete(&self, prompt: &str, _temperature: f32) -> Result<String> {
            self.prompts.lock().push(prompt.to_string());
            self.responses
                .lock()
                .pop_front()
                .ok_or_else(|| Error::Generation("script exhausted".to_string()))
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            "scripted"
        }
    }

    /// LLM double that fails every call.
    struct FailingLlm;

    #[async_trait]
    impl LlmProvider for FailingLlm {
        async fn complete(&self, _prompt: &str, _temperature: f32) -> Result<String> {
            Err(Error::Generation("connection reset".to_string()))
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(false)
        }

        fn name(&self) -> &str {
            "failing"
        }

        fn model(&self) -> &str {
            "failing"
        }
    }

    struct AxisEmbedder;

    #[async_trait]
    impl EmbeddingProvider for AxisEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0, 0.0])
        }

        fn dimensions(&self) -> usize {
            2
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "axis"
        }
    }

    /// Embedder that must never be reached: proves the direct-answer path
    /// skips retrieval entirely.
    struct UnreachableEmbedder;

    #[async_trait]
    impl EmbeddingProvider for UnreachableEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            panic!("retrieval must not run for a direct answer");
        }

        fn dimensions(&self) -> usize {
            2
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "unreachable"
        }
    }

    fn chunk_point(id: &str, title: &str) -> VectorPoint {
        VectorPoint {
            id: id.to_string(),
            vector: vec![1.0, 0.0],
            payload: PointPayload {
                text: format!("[{title}]\n{id} 조항 본문"),
                metadata: ChunkMetadata {
                    source_path: format!("/data/{id}.txt"),
                    chunk_index: 0,
                    title: title.to_string(),
                    department_id: None,
                    common_doc: true,
                    file_name: format!("{id}.txt"),
                },
            },
        }
    }

    async fn populated_store() -> Arc<MemoryVectorStore> {
        let store = Arc::new(MemoryVectorStore::new());
        store
            .upsert(vec![
                chunk_point("a", "제1조 목적"),
                chunk_point("b", "제2조 적용범위"),
                chunk_point("c", "제3조 지각"),
            ])
            .await
            .unwrap();
        store
    }

    fn agent_with(
        llm: Arc<dyn LlmProvider>,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<MemoryVectorStore>,
        history: Arc<MemoryHistoryStore>,
    ) -> ConversationAgent {
        let config = RagConfig::default();
        let retrieval = RetrievalGateway::new(embedder, store, config.retrieval.clone());
        ConversationAgent::new(&config, llm, retrieval, history)
    }

    fn request(session_id: &str, question: &str) -> TurnRequest {
        TurnRequest {
            session_id: session_id.to_string(),
            question: question.to_string(),
            department_id: None,
        }
    }

    #[tokio::test]
    async fn test_direct_answer_skips_retrieval() {
        let llm = ScriptedLlm::new(&["skip_rag", "좋은 하루 보내세요!"]);
        let history = Arc::new(MemoryHistoryStore::new());
        let session = history.create_session("u1").unwrap();
        let agent = agent_with(
            llm.clone(),
            Arc::new(UnreachableEmbedder),
            Arc::new(MemoryVectorStore::new()),
            Arc::clone(&history),
        );

        let result = agent.run_turn(&request(&session, "오늘 날씨 어때?")).await.unwrap();

        assert_eq!(result.answer, "좋은 하루 보내세요!");
        assert!(result.contexts.is_empty());
        assert!(!result.used_retrieval);
        assert_eq!(result.rewrite_count, 0);
        assert_eq!(llm.remaining(), 0);
        // Both messages persisted.
        assert_eq!(history.load_recent(&session, 10).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_one_cycle_when_judged_sufficient() {
        let llm = ScriptedLlm::new(&[
            "use_rag",
            "제3조 지각 에 따르면 지각 3회는 결근 1회로 간주됩니다.",
            "- 평가: 충분\n- 이유: 조항을 정확히 인용함",
        ]);
        let history = Arc::new(MemoryHistoryStore::new());
        let session = history.create_session("u1").unwrap();
        let agent = agent_with(
            llm.clone(),
            Arc::new(AxisEmbedder),
            populated_store().await,
            Arc::clone(&history),
        );

        let result = agent
            .run_turn(&request(&session, "지각이 누적되면 어떻게 되나요?"))
            .await
            .unwrap();

        assert_eq!(result.contexts.len(), 3);
        assert!(result.used_retrieval);
        assert_eq!(result.rewrite_count, 0);
        assert!(result.rewritten_question.is_none());
        assert_eq!(llm.remaining(), 0);
    }

    #[tokio::test]
    async fn test_one_rewrite_then_sufficient() {
        let llm = ScriptedLlm::new(&[
            "use_rag",
            "잘 모르겠습니다.",
            "- 평가: 부족\n- 이유: 근거 조항이 없음",
            "지각 3회 누적 시 근태관리 규정상 불이익은 무엇인가요?",
            "제3조 지각 에 따르면 지각 3회는 결근 1회로 간주됩니다.",
            "- 평가: 충분\n- 이유: 조항을 인용함",
        ]);
        let history = Arc::new(MemoryHistoryStore::new());
        let session = history.create_session("u1").unwrap();
        let agent = agent_with(
            llm.clone(),
            Arc::new(AxisEmbedder),
            populated_store().await,
            Arc::clone(&history),
        );

        let result = agent
            .run_turn(&request(&session, "지각하면 어떻게 되나요?"))
            .await
            .unwrap();

        assert_eq!(result.rewrite_count, 1);
        let rewritten = result.rewritten_question.unwrap();
        assert!(!rewritten.is_empty());
        assert_ne!(rewritten, "지각하면 어떻게 되나요?");
        assert!(result.answer.contains("제3조"));
        assert_eq!(llm.remaining(), 0);

        // The second answer prompt must carry the rewritten question.
        let prompts = llm.prompts();
        assert!(prompts[4].contains("지각 3회 누적 시"));
    }

    #[tokio::test]
    async fn test_loop_exhaustion_terminates_after_max_rewrites() {
        // Judge never says sufficient: exactly max_rewrites + 1 = 3
        // search/answer/judge cycles, then the last answer stands.
        let llm = ScriptedLlm::new(&[
            "use_rag",
            "답변 1",
            "- 평가: 부족",
            "재질문 1",
            "답변 2",
            "- 평가: 부족",
            "재질문 2",
            "답변 3",
            "- 평가: 부족",
        ]);
        let history = Arc::new(MemoryHistoryStore::new());
        let session = history.create_session("u1").unwrap();
        let agent = agent_with(
            llm.clone(),
            Arc::new(AxisEmbedder),
            populated_store().await,
            Arc::clone(&history),
        );

        let result = agent.run_turn(&request(&session, "규정 질문")).await.unwrap();

        assert_eq!(result.answer, "답변 3");
        assert_eq!(result.rewrite_count, 2);
        // The script is exactly consumed: no fourth cycle ever started.
        assert_eq!(llm.remaining(), 0);
    }

    #[tokio::test]
    async fn test_history_grows_by_one_entry_per_turn() {
        let history = Arc::new(MemoryHistoryStore::new());
        let session = history.create_session("u1").unwrap();

        for i in 0..4 {
            let llm = ScriptedLlm::new(&["skip_rag", "답변"]);
            let agent = agent_with(
                llm,
                Arc::new(UnreachableEmbedder),
                Arc::new(MemoryVectorStore::new()),
                Arc::clone(&history),
            );
            let result = agent
                .run_turn(&request(&session, &format!("질문 {i}")))
                .await
                .unwrap();
            assert_eq!(result.chat_history.len(), i + 1);
        }
    }

    #[tokio::test]
    async fn test_prompt_sees_only_the_history_window() {
        let history = Arc::new(MemoryHistoryStore::new());
        let session = history.create_session("u1").unwrap();
        for i in 0..5 {
            history
                .append(&session, MessageRole::User, &format!("질문{i}"))
                .unwrap();
            history
                .append(&session, MessageRole::Bot, &format!("답변{i}"))
                .unwrap();
        }

        let llm = ScriptedLlm::new(&["skip_rag", "답변"]);
        let agent = agent_with(
            llm.clone(),
            Arc::new(UnreachableEmbedder),
            Arc::new(MemoryVectorStore::new()),
            Arc::clone(&history),
        );
        agent.run_turn(&request(&session, "새 질문")).await.unwrap();

        // window_size = 3: turns 2..4 are visible, 0 and 1 are not.
        let prompts = llm.prompts();
        let answer_prompt = &prompts[1];
        assert!(answer_prompt.contains("질문4"));
        assert!(answer_prompt.contains("질문2"));
        assert!(!answer_prompt.contains("질문1"));
        assert!(!answer_prompt.contains("질문0"));
    }

    #[tokio::test]
    async fn test_failed_turn_commits_nothing() {
        let history = Arc::new(MemoryHistoryStore::new());
        let session = history.create_session("u1").unwrap();
        let agent = agent_with(
            Arc::new(FailingLlm),
            Arc::new(AxisEmbedder),
            populated_store().await,
            Arc::clone(&history),
        );

        let err = agent.run_turn(&request(&session, "질문")).await.unwrap_err();
        assert!(err.is_capability());
        assert!(history.load_recent(&session, 10).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_index_still_answers() {
        // use_rag with nothing ingested: contexts stay empty, the answer
        // is produced anyway, and the turn reports retrieval unused.
        let llm = ScriptedLlm::new(&[
            "use_rag",
            "관련 문서를 찾지 못했지만 일반적으로는 다음과 같습니다.",
            "- 평가: 충분",
        ]);
        let history = Arc::new(MemoryHistoryStore::new());
        let session = history.create_session("u1").unwrap();
        let agent = agent_with(
            llm,
            Arc::new(AxisEmbedder),
            Arc::new(MemoryVectorStore::new()),
            Arc::clone(&history),
        );

        let result = agent.run_turn(&request(&session, "규정 질문")).await.unwrap();
        assert!(result.contexts.is_empty());
        assert!(!result.used_retrieval);
    }
}
