//! Conversation state threaded through the agent's state machine

/// One user turn's worth of agent state. Each transition produces an updated
/// copy through the `with_*` constructors rather than mutating in place, so
/// a failed turn never leaves half-written state behind.
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    /// The user-supplied question for this turn
    pub question: String,
    /// Sharper restatement of the question; overrides `question` for
    /// retrieval and generation once set
    pub rewritten_question: Option<String>,
    /// Formatted retrieved passages, most relevant first
    pub contexts: Vec<String>,
    /// The current draft answer
    pub answer: String,
    /// Self-critique text from the judge transition
    pub reflection: String,
    /// Rendered "Q/A" turns, oldest first; consumed as a trailing window
    pub chat_history: Vec<String>,
    /// How many times the question has been reformulated this turn
    pub rewrite_count: u32,
    /// Ties the turn to the persisted session
    pub session_id: String,
}

impl ConversationState {
    /// Start a fresh turn on top of previously loaded history
    pub fn new_turn(session_id: &str, question: &str, chat_history: Vec<String>) -> Self {
        Self {
            question: question.to_string(),
            chat_history,
            session_id: session_id.to_string(),
            ..Self::default()
        }
    }

    /// The question retrieval and generation should use right now
    pub fn effective_question(&self) -> &str {
        self.rewritten_question.as_deref().unwrap_or(&self.question)
    }

    /// Replace the retrieved contexts
    pub fn with_contexts(mut self, contexts: Vec<String>) -> Self {
        self.contexts = contexts;
        self
    }

    /// Install the answer together with this turn's single history entry.
    /// `base_len` is the history length at turn start; a rewrite cycle's
    /// answer replaces the provisional entry instead of stacking another,
    /// so each turn contributes exactly one entry.
    pub fn with_answer(mut self, answer: String, base_len: usize) -> Self {
        let entry = format!("Q: {}\nA: {}", self.effective_question(), answer);
        self.chat_history.truncate(base_len);
        self.chat_history.push(entry);
        self.answer = answer;
        self
    }

    /// Record the judge's critique
    pub fn with_reflection(mut self, reflection: String) -> Self {
        self.reflection = reflection;
        self
    }

    /// Record a reformulated question and count the rewrite
    pub fn with_rewrite(mut self, rewritten: String) -> Self {
        self.rewritten_question = Some(rewritten);
        self.rewrite_count += 1;
        self
    }

    /// The last `window` history entries, for prompt rendering
    pub fn history_window(&self, window: usize) -> &[String] {
        let start = self.chat_history.len().saturating_sub(window);
        &self.chat_history[start..]
    }
}

/// Input to a single conversation turn
#[derive(Debug, Clone)]
pub struct TurnRequest {
    /// Session the turn belongs to
    pub session_id: String,
    /// The user's question
    pub question: String,
    /// Department scope for retrieval; `None` restricts search to common docs
    pub department_id: Option<i64>,
}

/// Result of a completed turn
#[derive(Debug, Clone)]
pub struct TurnResult {
    /// The final answer
    pub answer: String,
    /// Contexts behind the answer; empty when the agent answered directly
    pub contexts: Vec<String>,
    /// How many rewrite cycles ran
    pub rewrite_count: u32,
    /// The final reformulated question, when any rewrite happened
    pub rewritten_question: Option<String>,
    /// Whether retrieval was used at all
    pub used_retrieval: bool,
    /// Updated chat history including this turn's entry
    pub chat_history: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_question_prefers_rewrite() {
        let state = ConversationState::new_turn("1", "원래 질문", vec![]);
        assert_eq!(state.effective_question(), "원래 질문");

        let state = state.with_rewrite("더 구체적인 질문".to_string());
        assert_eq!(state.effective_question(), "더 구체적인 질문");
        assert_eq!(state.rewrite_count, 1);
    }

    #[test]
    fn test_answer_replaces_provisional_entry() {
        let history = vec!["Q: 이전 질문\nA: 이전 답변".to_string()];
        let base_len = history.len();
        let state = ConversationState::new_turn("1", "질문", history);

        let state = state.with_answer("첫 답변".to_string(), base_len);
        assert_eq!(state.chat_history.len(), 2);

        // A rewrite cycle answers again; history must not grow further.
        let state = state
            .with_rewrite("보강 질문".to_string())
            .with_answer("두번째 답변".to_string(), base_len);
        assert_eq!(state.chat_history.len(), 2);
        assert!(state.chat_history[1].contains("두번째 답변"));
        assert!(state.chat_history[1].contains("보강 질문"));
    }

    #[test]
    fn test_history_window_takes_trailing_entries() {
        let history: Vec<String> = (0..5).map(|i| format!("Q: q{i}\nA: a{i}")).collect();
        let state = ConversationState::new_turn("1", "질문", history);
        let window = state.history_window(3);
        assert_eq!(window.len(), 3);
        assert!(window[0].contains("q2"));
        assert!(window[2].contains("q4"));
    }
}
