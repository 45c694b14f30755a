use std::sync::Arc;

use anyhow::Result;
use futures::stream::{self, StreamExt};

use crate::context::EvalContext;
use crate::datasource::DataSource;
use crate::evaluation::Evaluation;
use crate::trace::scope_traces;
use crate::types::{CaseResult, SuiteResult, TestCase, Verdict};

pub struct SuiteBuilder {
	context: Option<EvalContext>,
	data_source: Option<Arc<dyn DataSource>>,
	evaluations: Vec<Evaluation>,
	concurrency: usize,
}

impl SuiteBuilder {
	pub fn new() -> Self {
		Self {
			context: None,
			data_source: None,
			evaluations: Vec::new(),
			concurrency: 8,
		}
	}

	pub fn context(mut self, context: EvalContext) -> Self {
		self.context = Some(context);
		self
	}

	pub fn data_source(mut self, data_source: Arc<dyn DataSource>) -> Self {
		self.data_source = Some(data_source);
		self
	}

	pub fn evaluations<I>(mut self, evaluations: I) -> Self
	where
		I: IntoIterator<Item = Evaluation>,
	{
		self.evaluations = evaluations.into_iter().collect();
		self
	}

	pub fn add_evaluation(mut self, evaluation: Evaluation) -> Self {
		self.evaluations.push(evaluation);
		self
	}

	pub fn concurrency(mut self, n: usize) -> Self {
		self.concurrency = n.max(1);
		self
	}

	pub fn build(self) -> Result<Suite> {
		Ok(Suite {
			context: self.context.ok_or_else(|| anyhow::anyhow!("context must be set"))?,
			data_source: self.data_source.ok_or_else(|| anyhow::anyhow!("data_source must be set"))?,
			evaluations: Arc::new(self.evaluations),
			concurrency: self.concurrency,
		})
	}
}

impl Default for SuiteBuilder {
	fn default() -> Self {
		Self::new()
	}
}

/// Runs every evaluation against every case of a data source.
pub struct Suite {
	context: EvalContext,
	data_source: Arc<dyn DataSource>,
	evaluations: Arc<Vec<Evaluation>>,
	concurrency: usize,
}

impl Suite {
	pub fn builder() -> SuiteBuilder {
		SuiteBuilder::new()
	}

	pub async fn run(&self) -> Result<SuiteResult> {
		let cases = self.data_source.load().await?;
		tracing::info!(cases = cases.len(), evaluations = self.evaluations.len(), "running suite");
		let results = self.run_cases(cases).await;
		let summary = SuiteResult::summarize(&results);
		Ok(SuiteResult { cases: results, summary })
	}

	/// Applies every evaluation to one case. A failing evaluation is recorded
	/// as an errored verdict and the remaining ones still run.
	pub async fn run_case(&self, case: TestCase) -> CaseResult {
		evaluate_case(&self.context, &self.evaluations, case).await
	}

	async fn run_cases(&self, cases: Vec<TestCase>) -> Vec<CaseResult> {
		let stream = stream::iter(cases.into_iter()).map(|case| {
			let context = self.context.clone();
			let evaluations = self.evaluations.clone();
			async move { evaluate_case(&context, &evaluations, case).await }
		});

		stream
			.buffer_unordered(self.concurrency)
			.collect()
			.await
	}
}

async fn evaluate_case(context: &EvalContext, evaluations: &[Evaluation], case: TestCase) -> CaseResult {
	let (verdicts, traces) = scope_traces(async {
		let mut verdicts = Vec::with_capacity(evaluations.len());
		for evaluation in evaluations {
			let verdict = match evaluation.evaluate(context, &case.prompt, &case.response).await {
				Ok(passed) => Verdict::decided(evaluation.name(), passed),
				Err(err) => {
					tracing::warn!(evaluation = evaluation.name(), case = ?case.id, error = %err, "evaluation failed");
					Verdict::errored(evaluation.name(), err.to_string())
				}
			};
			verdicts.push(verdict);
		}
		verdicts
	})
	.await;

	CaseResult { case, verdicts, traces }
}
