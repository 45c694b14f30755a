//! evalgen-core: pass/fail evaluations for model responses.
//! An evaluation is either computed (a trusted snippet binds a boolean `result`)
//! or LLM-assisted (a judge model answers a yes/no assertion about the response).
//! See `examples/simple.rs` for a quickstart.

pub mod config;
pub mod context;
pub mod datasource;
pub mod error;
pub mod evaluation;
pub mod format;
pub mod generate;
pub mod judge;
pub mod prompts;
pub mod runner;
pub mod snippet;
pub mod testing;
pub mod trace;
pub mod types;
pub mod verdict;

pub mod evaluations {
    pub mod computed;
    pub mod llm_assisted;
}

pub use config::{DataConfig, JudgeConfig, SuiteConfig};
pub use context::{EvalContext, EvalContextBuilder};
pub use datasource::{load_evaluations, load_evaluations_as, DataSource, JsonlDataSource, VecDataSource};
pub use error::EvaluationError;
pub use evaluation::{EvalKind, Evaluation};
pub use evaluations::{computed::ComputedEvaluation, llm_assisted::LlmAssistedEvaluation};
pub use format::Format;
pub use generate::{assertions_to_evaluations, generate_assertions, generate_criteria};
pub use judge::{judge_fn, Judge, JudgeError, OpenAiJudge};
pub use prompts::{PromptError, PromptLibrary, PromptPart};
pub use runner::{Suite, SuiteBuilder};
#[cfg(feature = "python")]
pub use snippet::PythonRuntime;
pub use snippet::{ResultBinding, SnippetError, SnippetRuntime};
pub use types::{CaseResult, CaseStatus, Message, Role, SuiteResult, SuiteSummary, TestCase, Verdict};
pub use verdict::normalize_verdict;
