use serde::Deserialize;
use tera::Context;

use crate::context::EvalContext;
use crate::error::EvaluationError;
use crate::prompts::EVALUATE;
use crate::verdict::normalize_verdict;

/// Passes or fails a response by asking the judge a yes/no `assertion` about it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LlmAssistedEvaluation {
    name: String,
    description: String,
    assertion: String,
}

impl LlmAssistedEvaluation {
    pub fn new(name: impl Into<String>, description: impl Into<String>, assertion: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            assertion: assertion.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn assertion(&self) -> &str {
        &self.assertion
    }

    /// The judge only sees the response and the assertion; `_prompt` is not sent.
    pub async fn evaluate(&self, ctx: &EvalContext, _prompt: &str, response: &str) -> Result<bool, EvaluationError> {
        let judge = ctx.judge()?;

        let mut vars = Context::new();
        vars.insert("response", response);
        vars.insert("criteria", &self.assertion);
        let messages = ctx.prompts().conversation(EVALUATE, &vars)?;

        let raw = judge.invoke(&messages).await?;
        match normalize_verdict(&raw) {
            Some(verdict) => Ok(verdict),
            None => {
                tracing::warn!(evaluation = %self.name, raw = %raw, "judge answer matched no verdict alias");
                Err(EvaluationError::AmbiguousVerdict { raw })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::judge::{judge_fn, JudgeError};
    use crate::prompts::PromptLibrary;
    use evalgen_types::{Message, Role};
    use std::sync::{Arc, Mutex};

    fn ctx_answering(answer: &'static str) -> EvalContext {
        EvalContext::builder()
            .judge(judge_fn(move |_| async move { Ok(answer.to_string()) }))
            .build()
            .unwrap()
    }

    fn tone() -> LlmAssistedEvaluation {
        LlmAssistedEvaluation::new("tone", "tone check", "Is the response polite?")
    }

    #[tokio::test]
    async fn test_tone_scenario() {
        let passed = tone()
            .evaluate(&ctx_answering("Correct"), "", "Thank you for your patience.")
            .await
            .unwrap();
        assert!(passed);
    }

    #[tokio::test]
    async fn test_alias_answers() {
        let cases = [
            (" Yes \n", true),
            ("TRUE", true),
            ("y", true),
            ("1", true),
            ("0", false),
            ("No", false),
            ("  incorrect", false),
            ("n\n", false),
        ];
        for (answer, expected) in cases {
            let got = tone().evaluate(&ctx_answering(answer), "", "whatever").await.unwrap();
            assert_eq!(got, expected, "{answer:?}");
        }
    }

    #[tokio::test]
    async fn test_ambiguous_answer_keeps_raw_text() {
        let err = tone().evaluate(&ctx_answering("maybe"), "", "hi").await.unwrap_err();
        assert!(matches!(err, EvaluationError::AmbiguousVerdict { raw } if raw == "maybe"));

        let err = tone().evaluate(&ctx_answering(" Yes, it is. "), "", "hi").await.unwrap_err();
        assert!(matches!(err, EvaluationError::AmbiguousVerdict { raw } if raw == " Yes, it is. "));
    }

    #[tokio::test]
    async fn test_judge_sees_response_and_assertion_but_not_prompt() {
        let seen: Arc<Mutex<Vec<Message>>> = Arc::default();
        let sink = seen.clone();
        let ctx = EvalContext::builder()
            .judge(judge_fn(move |messages| {
                *sink.lock().unwrap() = messages;
                async { Ok("yes".to_string()) }
            }))
            .build()
            .unwrap();

        tone().evaluate(&ctx, "SECRET PROMPT", "Thank you for your patience.").await.unwrap();

        let messages = seen.lock().unwrap().clone();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].role, Role::User);
        assert!(messages[1].content.contains("Thank you for your patience."));
        assert!(messages[1].content.contains("Is the response polite?"));
        assert!(messages.iter().all(|m| !m.content.contains("SECRET PROMPT")));
    }

    #[tokio::test]
    async fn test_custom_evaluate_prompt() {
        let seen: Arc<Mutex<Vec<Message>>> = Arc::default();
        let sink = seen.clone();
        let mut prompts = PromptLibrary::empty();
        prompts.add(EVALUATE, "Grade.\nEND SYSTEM PROMPT\n[{{ criteria }}] {{ response }}").unwrap();
        let ctx = EvalContext::builder()
            .prompts(prompts)
            .judge(judge_fn(move |messages| {
                *sink.lock().unwrap() = messages;
                async { Ok("no".to_string()) }
            }))
            .build()
            .unwrap();

        assert!(!tone().evaluate(&ctx, "", "hey").await.unwrap());
        assert_eq!(
            *seen.lock().unwrap(),
            vec![Message::system("Grade."), Message::user("[Is the response polite?] hey")]
        );
    }

    #[tokio::test]
    async fn test_judge_error_is_not_a_verdict() {
        let ctx = EvalContext::builder()
            .judge(judge_fn(|_| async { Err(anyhow::anyhow!("network unreachable")) }))
            .build()
            .unwrap();
        let err = tone().evaluate(&ctx, "", "hi").await.unwrap_err();
        assert!(matches!(err, EvaluationError::Judge(JudgeError::Other(_))));
    }

    #[tokio::test]
    async fn test_without_judge() {
        let ctx = EvalContext::builder().build().unwrap();
        let err = tone().evaluate(&ctx, "", "hi").await.unwrap_err();
        assert!(matches!(err, EvaluationError::Unconfigured("judge")));
    }
}
