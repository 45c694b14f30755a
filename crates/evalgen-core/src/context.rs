use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use crate::config::JudgeConfig;
use crate::error::EvaluationError;
use crate::judge::{Judge, OpenAiJudge};
use crate::prompts::PromptLibrary;
use crate::snippet::SnippetRuntime;

/// Resources evaluations run against: the judge, the snippet runtime and the prompts.
///
/// Build one per process (or per configuration) and clone it freely; clones
/// share the same judge client. Evaluations never hold on to a context.
#[derive(Clone)]
pub struct EvalContext {
	judge: Option<Arc<dyn Judge>>,
	runtime: Option<Arc<dyn SnippetRuntime>>,
	prompts: Arc<PromptLibrary>,
}

impl EvalContext {
	pub fn builder() -> EvalContextBuilder {
		EvalContextBuilder::new()
	}

	/// OpenAI-compatible judge from `config`, prompts from `prompts_dir` when given.
	pub fn from_config(config: &JudgeConfig, prompts_dir: Option<&Path>) -> Result<Self> {
		let judge = OpenAiJudge::from_config(config)?;
		let prompts = match prompts_dir {
			Some(dir) => PromptLibrary::from_dir(dir)?,
			None => PromptLibrary::builtin()?,
		};
		Self::builder().judge(Arc::new(judge)).prompts(prompts).build()
	}

	pub fn judge(&self) -> Result<&Arc<dyn Judge>, EvaluationError> {
		self.judge.as_ref().ok_or(EvaluationError::Unconfigured("judge"))
	}

	pub fn runtime(&self) -> Result<&Arc<dyn SnippetRuntime>, EvaluationError> {
		self.runtime.as_ref().ok_or(EvaluationError::Unconfigured("snippet runtime"))
	}

	pub fn prompts(&self) -> &PromptLibrary {
		&self.prompts
	}
}

pub struct EvalContextBuilder {
	judge: Option<Arc<dyn Judge>>,
	runtime: Option<Arc<dyn SnippetRuntime>>,
	prompts: Option<PromptLibrary>,
}

impl EvalContextBuilder {
	pub fn new() -> Self {
		Self {
			judge: None,
			runtime: default_runtime(),
			prompts: None,
		}
	}

	pub fn judge(mut self, judge: Arc<dyn Judge>) -> Self {
		self.judge = Some(judge);
		self
	}

	pub fn runtime(mut self, runtime: Arc<dyn SnippetRuntime>) -> Self {
		self.runtime = Some(runtime);
		self
	}

	pub fn prompts(mut self, prompts: PromptLibrary) -> Self {
		self.prompts = Some(prompts);
		self
	}

	pub fn build(self) -> Result<EvalContext> {
		let prompts = match self.prompts {
			Some(p) => p,
			None => PromptLibrary::builtin()?,
		};
		Ok(EvalContext {
			judge: self.judge,
			runtime: self.runtime,
			prompts: Arc::new(prompts),
		})
	}
}

impl Default for EvalContextBuilder {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(feature = "python")]
fn default_runtime() -> Option<Arc<dyn SnippetRuntime>> {
	Some(Arc::new(crate::snippet::PythonRuntime))
}

#[cfg(not(feature = "python"))]
fn default_runtime() -> Option<Arc<dyn SnippetRuntime>> {
	None
}
