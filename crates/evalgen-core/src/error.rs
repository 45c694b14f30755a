use thiserror::Error;

use crate::judge::JudgeError;
use crate::prompts::PromptError;
use crate::snippet::SnippetError;

/// Every way an evaluation can fail to produce a verdict.
///
/// None of these are recovered inside the engine: an ambiguous judge answer or
/// a snippet that did not bind a boolean is reported, never turned into a
/// default pass or fail.
#[derive(Debug, Error)]
pub enum EvaluationError {
    /// Definition had no `type` tag, or one that names no known evaluation kind.
    #[error("unknown evaluation type: {}", tag.as_deref().unwrap_or("<missing>"))]
    UnknownVariant { tag: Option<String> },

    /// Definition was recognized but a required field is missing or ill-typed,
    /// or the text was not valid JSON/YAML.
    #[error("malformed evaluation definition: {0}")]
    Malformed(String),

    /// Computed snippet finished without binding a boolean `result`.
    #[error("invalid snippet result: {0}")]
    InvalidResult(String),

    #[error(transparent)]
    Snippet(#[from] SnippetError),

    /// Judge answered with text that is not in the verdict alias table.
    #[error("ambiguous judge verdict: {raw:?}")]
    AmbiguousVerdict { raw: String },

    #[error(transparent)]
    Judge(#[from] JudgeError),

    #[error(transparent)]
    Prompt(#[from] PromptError),

    /// The context lacks a resource the evaluation kind needs.
    #[error("no {0} configured for this evaluation context")]
    Unconfigured(&'static str),
}
