//! Prompt templates for the conversation agent
//!
//! One template per state-machine transition. The few-shot examples pin the
//! citation format the assistant is expected to answer in.

/// Prompt builder for agent transitions
pub struct PromptBuilder;

impl PromptBuilder {
    /// Classification prompt: does this question need internal reference
    /// documents? The model is told to emit exactly one of two tokens.
    pub fn decide(question: &str) -> String {
        format!(
            r#"다음 질문을 읽고, 사내 문서나 규정과 같은 참고 문서가 필요한 질문인지 판단하세요.

질문: "{question}"

문서가 필요하면 "use_rag", 아니면 "skip_rag"만 출력하세요."#
        )
    }

    /// Grounded answer prompt over retrieved contexts
    pub fn answer(history: &[String], contexts: &[String], question: &str) -> String {
        let history_text = history.join("\n");
        let context = contexts.join("\n---\n");
        let ref_titles = Self::reference_titles(contexts);
        let fewshot = r#"예시 :
Q: 지각이 3회 누적되면 어떻게 되나요?
A: [제12조 근태관리 규정]에 따르면 지각 3회는 결근 1회로 간주됩니다.

"#;

        format!(
            r#"{fewshot}
지금까지의 대화 기록:
{history_text}

아래 질문에 대해 context에 충실하게 자세히 답변하세요.

**반드시 다음 형식을 따르세요**
→ "제X조 조항명 에 따르면 ..."

참고 조항: {ref_titles}

Context:
{context}
Question: {question}
Answer:"#
        )
    }

    /// Direct answer prompt, no contexts
    pub fn direct_answer(history: &[String], question: &str) -> String {
        let history_text = history.join("\n");
        let fewshot = r#"예시 :
Q: 연차 신청은 언제까지 해야 하나요?
A: [근태규정]에 따르면 연차는 최소 3일 전까지 신청해야 합니다.

"#;

        format!(
            r#"{fewshot}
지금까지의 대화 내용:
{history_text}

Question: {question}
Answer:"#
        )
    }

    /// Self-critique prompt; the verdict vocabulary it requests is what the
    /// reflection parser looks for.
    pub fn judge(question: &str, contexts: &[String], answer: &str) -> String {
        let context = contexts.join("\n---\n");
        format!(
            r#"다음은 질문과 답변, 그리고 참고 context입니다.

Question: {question}
Context: {context}
Answer: {answer}

답변이 충분한가요? 다음 형식으로 평가하세요:

- 평가: [충분|부족]
- 이유: ..."#
        )
    }

    /// Question reformulation prompt after an insufficient answer
    pub fn rewrite(question: &str, answer: &str, contexts: &[String]) -> String {
        let context = contexts.join("\n---\n");
        format!(
            r#"답변이 부족하다면, 질문을 좀 더 명확하고 구체적으로 바꿔 주세요.

기존 질문: {question}
답변: {answer}
Context: {context}

보강 질문:"#
        )
    }

    /// Section titles cited in the answer prompt, pulled from the
    /// "[title]" first line of each formatted passage
    fn reference_titles(contexts: &[String]) -> String {
        contexts
            .iter()
            .filter_map(|c| c.lines().next())
            .filter(|line| line.starts_with('['))
            .map(|line| line.trim_matches(|c| c == '[' || c == ']').to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_prompt_cites_section_titles() {
        let contexts = vec![
            "[제1조 목적]\n본문 하나".to_string(),
            "[제3조 지각]\n본문 둘".to_string(),
        ];
        let prompt = PromptBuilder::answer(&[], &contexts, "지각 기준이 뭔가요?");

        assert!(prompt.contains("참고 조항: 제1조 목적, 제3조 지각"));
        assert!(prompt.contains("본문 하나\n---\n"));
        assert!(prompt.contains("Question: 지각 기준이 뭔가요?"));
    }

    #[test]
    fn test_history_window_is_rendered_verbatim() {
        let history = vec!["Q: 첫 질문\nA: 첫 답변".to_string()];
        let prompt = PromptBuilder::direct_answer(&history, "다음 질문");
        assert!(prompt.contains("Q: 첫 질문\nA: 첫 답변"));
    }

    #[test]
    fn test_decide_prompt_names_both_tokens() {
        let prompt = PromptBuilder::decide("오늘 날씨 어때?");
        assert!(prompt.contains("use_rag"));
        assert!(prompt.contains("skip_rag"));
    }
}
