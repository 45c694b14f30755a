//! The evaluation entity and its serialized form.
//!
//! The structured form is a map with a `type` tag plus the variant's fields:
//!
//! ```text
//! { "type": "computed",     "name": ..., "description": ..., "code": ... }
//! { "type": "llm_assisted", "name": ..., "description": ..., "assertion": ... }
//! ```
//!
//! [`Evaluation::from_value`] is the only place that looks at the tag. Every
//! other reader (JSON, YAML, serde-embedded definitions in suite files) goes
//! through it, so adding a kind means adding a variant here and nowhere else.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Value};

use crate::context::EvalContext;
use crate::error::EvaluationError;
use crate::evaluations::computed::ComputedEvaluation;
use crate::evaluations::llm_assisted::LlmAssistedEvaluation;
use crate::format::Format;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalKind {
    Computed,
    LlmAssisted,
}

impl EvalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvalKind::Computed => "computed",
            EvalKind::LlmAssisted => "llm_assisted",
        }
    }
}

impl FromStr for EvalKind {
    type Err = EvaluationError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "computed" => Ok(EvalKind::Computed),
            "llm_assisted" => Ok(EvalKind::LlmAssisted),
            _ => Err(EvaluationError::UnknownVariant { tag: Some(tag.to_string()) }),
        }
    }
}

impl fmt::Display for EvalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named pass/fail check on a model response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluation {
    Computed(ComputedEvaluation),
    LlmAssisted(LlmAssistedEvaluation),
}

impl Evaluation {
    pub fn computed(
        name: impl Into<String>,
        description: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        Evaluation::Computed(ComputedEvaluation::new(name, description, code))
    }

    pub fn llm_assisted(
        name: impl Into<String>,
        description: impl Into<String>,
        assertion: impl Into<String>,
    ) -> Self {
        Evaluation::LlmAssisted(LlmAssistedEvaluation::new(name, description, assertion))
    }

    pub fn kind(&self) -> EvalKind {
        match self {
            Evaluation::Computed(_) => EvalKind::Computed,
            Evaluation::LlmAssisted(_) => EvalKind::LlmAssisted,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Evaluation::Computed(e) => e.name(),
            Evaluation::LlmAssisted(e) => e.name(),
        }
    }

    pub fn description(&self) -> &str {
        match self {
            Evaluation::Computed(e) => e.description(),
            Evaluation::LlmAssisted(e) => e.description(),
        }
    }

    /// Decides whether `response` (to `prompt`) passes this check.
    pub async fn evaluate(
        &self,
        ctx: &EvalContext,
        prompt: &str,
        response: &str,
    ) -> Result<bool, EvaluationError> {
        tracing::debug!(evaluation = self.name(), kind = %self.kind(), "evaluating response");
        match self {
            Evaluation::Computed(e) => e.evaluate(ctx, prompt, response).await,
            Evaluation::LlmAssisted(e) => e.evaluate(ctx, prompt, response).await,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Evaluation::Computed(e) => json!({
                "type": EvalKind::Computed.as_str(),
                "name": e.name(),
                "description": e.description(),
                "code": e.code(),
            }),
            Evaluation::LlmAssisted(e) => json!({
                "type": EvalKind::LlmAssisted.as_str(),
                "name": e.name(),
                "description": e.description(),
                "assertion": e.assertion(),
            }),
        }
    }

    /// Rebuilds an evaluation from its structured form. Unknown extra fields
    /// are ignored; a missing required field fails here rather than later.
    /// Anything that is not a map carries no `type` tag and is reported as
    /// [`EvaluationError::UnknownVariant`].
    pub fn from_value(value: Value) -> Result<Self, EvaluationError> {
        let kind: EvalKind = match value.get("type") {
            None => return Err(EvaluationError::UnknownVariant { tag: None }),
            Some(Value::String(tag)) => tag.parse()?,
            Some(other) => return Err(EvaluationError::UnknownVariant { tag: Some(other.to_string()) }),
        };

        let malformed = |e: serde_json::Error| EvaluationError::Malformed(format!("{kind} evaluation: {e}"));
        match kind {
            EvalKind::Computed => serde_json::from_value(value)
                .map(Evaluation::Computed)
                .map_err(malformed),
            EvalKind::LlmAssisted => serde_json::from_value(value)
                .map(Evaluation::LlmAssisted)
                .map_err(malformed),
        }
    }

    pub fn to_text(&self, format: Format) -> Result<String, EvaluationError> {
        let value = self.to_value();
        match format {
            Format::Json => serde_json::to_string(&value).map_err(|e| EvaluationError::Malformed(e.to_string())),
            Format::Yaml => serde_yaml::to_string(&value).map_err(|e| EvaluationError::Malformed(e.to_string())),
        }
    }

    pub fn from_text(text: &str, format: Format) -> Result<Self, EvaluationError> {
        let value: Value = match format {
            Format::Json => serde_json::from_str(text).map_err(|e| EvaluationError::Malformed(format!("invalid JSON: {e}")))?,
            Format::Yaml => serde_yaml::from_str(text).map_err(|e| EvaluationError::Malformed(format!("invalid YAML: {e}")))?,
        };
        Self::from_value(value)
    }
}

impl From<ComputedEvaluation> for Evaluation {
    fn from(e: ComputedEvaluation) -> Self {
        Evaluation::Computed(e)
    }
}

impl From<LlmAssistedEvaluation> for Evaluation {
    fn from(e: LlmAssistedEvaluation) -> Self {
        Evaluation::LlmAssisted(e)
    }
}

impl Serialize for Evaluation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Evaluation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Evaluation::from_value(value).map_err(serde::de::Error::custom)
    }
}
