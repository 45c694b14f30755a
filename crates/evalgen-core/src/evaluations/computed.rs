use serde::Deserialize;

use crate::context::EvalContext;
use crate::error::EvaluationError;
use crate::snippet::{ResultBinding, SnippetError};

/// Passes or fails a response by running a snippet of code.
///
/// The snippet sees exactly two variables, `prompt` and `response`, and must
/// leave a boolean in `result`. It runs with the privileges of this process
/// (see [`crate::snippet`]), so only load snippets from trusted authors.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ComputedEvaluation {
    name: String,
    description: String,
    code: String,
}

impl ComputedEvaluation {
    pub fn new(name: impl Into<String>, description: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            code: code.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub async fn evaluate(&self, ctx: &EvalContext, prompt: &str, response: &str) -> Result<bool, EvaluationError> {
        let runtime = ctx.runtime()?.clone();
        let runtime_name = runtime.name();
        let code = self.code.clone();
        let prompt = prompt.to_string();
        let response = response.to_string();

        let binding = tokio::task::spawn_blocking(move || runtime.execute(&code, &prompt, &response))
            .await
            .map_err(|e| SnippetError::with_source(runtime_name, "snippet task did not complete", e))??;

        match binding {
            ResultBinding::Bool(passed) => Ok(passed),
            ResultBinding::Missing => {
                tracing::warn!(evaluation = %self.name, "snippet did not bind `result`");
                Err(EvaluationError::InvalidResult("snippet did not bind `result`".to_string()))
            }
            ResultBinding::Other { type_name } => {
                tracing::warn!(evaluation = %self.name, %type_name, "snippet bound a non-boolean `result`");
                Err(EvaluationError::InvalidResult(format!(
                    "`result` must be a boolean, got {type_name}"
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snippet::SnippetRuntime;
    use std::sync::{Arc, Mutex};

    /// Records what it was asked to run and answers with a fixed binding.
    struct RecordingRuntime {
        binding: Result<ResultBinding, String>,
        seen: Mutex<Vec<(String, String, String)>>,
    }

    impl RecordingRuntime {
        fn new(binding: Result<ResultBinding, String>) -> Arc<Self> {
            Arc::new(Self { binding, seen: Mutex::new(Vec::new()) })
        }
    }

    impl SnippetRuntime for RecordingRuntime {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn execute(&self, code: &str, prompt: &str, response: &str) -> Result<ResultBinding, SnippetError> {
            self.seen
                .lock()
                .unwrap()
                .push((code.to_string(), prompt.to_string(), response.to_string()));
            self.binding.clone().map_err(|msg| SnippetError::new("recording", msg))
        }
    }

    fn ctx(runtime: Arc<RecordingRuntime>) -> EvalContext {
        EvalContext::builder().runtime(runtime).build().unwrap()
    }

    #[tokio::test]
    async fn test_passes_code_and_inputs_to_runtime() {
        let rt = RecordingRuntime::new(Ok(ResultBinding::Bool(false)));
        let eval = ComputedEvaluation::new("length", "len>0", "result = len(response) > 0");

        let passed = eval.evaluate(&ctx(rt.clone()), "the prompt", "the response").await.unwrap();

        assert!(!passed);
        let seen = rt.seen.lock().unwrap();
        assert_eq!(
            seen[0],
            (
                "result = len(response) > 0".to_string(),
                "the prompt".to_string(),
                "the response".to_string()
            )
        );
    }

    #[tokio::test]
    async fn test_missing_result_is_invalid() {
        let rt = RecordingRuntime::new(Ok(ResultBinding::Missing));
        let err = ComputedEvaluation::new("n", "d", "x = 1").evaluate(&ctx(rt), "", "").await.unwrap_err();
        assert!(matches!(err, EvaluationError::InvalidResult(_)));
    }

    #[tokio::test]
    async fn test_non_bool_result_is_invalid() {
        let rt = RecordingRuntime::new(Ok(ResultBinding::Other { type_name: "str".to_string() }));
        let err = ComputedEvaluation::new("n", "d", "result = 'yes'").evaluate(&ctx(rt), "", "").await.unwrap_err();
        match err {
            EvaluationError::InvalidResult(msg) => assert!(msg.contains("str")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_snippet_error_propagates() {
        let rt = RecordingRuntime::new(Err("NameError: name 'foo' is not defined".to_string()));
        let err = ComputedEvaluation::new("n", "d", "result = foo").evaluate(&ctx(rt), "", "").await.unwrap_err();
        match err {
            EvaluationError::Snippet(e) => assert!(e.message.contains("NameError")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(feature = "python")]
    mod python {
        use super::super::*;
        use crate::context::EvalContext;
        use crate::error::EvaluationError;

        fn ctx() -> EvalContext {
            EvalContext::builder().build().unwrap()
        }

        #[tokio::test]
        async fn test_length_scenario() {
            let eval = ComputedEvaluation::new("length", "len>0", "result = len(response) > 0");
            assert!(!eval.evaluate(&ctx(), "", "").await.unwrap());
            assert!(eval.evaluate(&ctx(), "", "hi").await.unwrap());
        }

        #[tokio::test]
        async fn test_literal_results() {
            let yes = ComputedEvaluation::new("t", "", "result = True");
            let no = ComputedEvaluation::new("f", "", "result = False");
            assert!(yes.evaluate(&ctx(), "p", "r").await.unwrap());
            assert!(!no.evaluate(&ctx(), "p", "r").await.unwrap());
        }

        #[tokio::test]
        async fn test_omitted_or_non_bool_result() {
            for code in ["x = True", "result = 1", "result = 'True'", "result = None"] {
                let err = ComputedEvaluation::new("n", "", code).evaluate(&ctx(), "", "r").await.unwrap_err();
                assert!(matches!(err, EvaluationError::InvalidResult(_)), "{code}: {err}");
            }
        }

        #[tokio::test]
        async fn test_raised_exception() {
            let eval = ComputedEvaluation::new("n", "", "raise RuntimeError('bad snippet')");
            let err = eval.evaluate(&ctx(), "", "").await.unwrap_err();
            assert!(matches!(err, EvaluationError::Snippet(_)));
            assert!(err.to_string().contains("bad snippet"));
        }

        #[tokio::test]
        async fn test_snippets_are_full_python() {
            let io = ComputedEvaluation::new("io", "", "import os\nresult = os.path.exists('/')");
            assert!(io.evaluate(&ctx(), "", "").await.unwrap());

            let defs = ComputedEvaluation::new("def", "", "def f():\n    return True\nresult = f()");
            assert!(defs.evaluate(&ctx(), "", "").await.unwrap());
        }

        #[tokio::test]
        async fn test_evaluation_fields_are_not_visible() {
            let eval = ComputedEvaluation::new("n", "", "result = 'code' not in dir() and 'name' not in dir()");
            assert!(eval.evaluate(&ctx(), "", "").await.unwrap());
        }
    }
}
