use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use tabled::Tabled;

/// Speaker of a judge conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// One `{role, content}` pair sent to a judge model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }
}

/// Record of a single judge call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trace {
    /// When the call started
    pub start: SystemTime,

    /// When the call ended
    pub end: SystemTime,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,

    /// Judge model name (e.g., "gpt-4o")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Conversation sent to the judge
    pub messages: Vec<Message>,

    /// Raw completion text, before verdict normalization
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,

    /// Error if the call failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
}

impl Trace {
    pub fn start_now() -> TraceBuilder {
        TraceBuilder {
            start: SystemTime::now(),
            model: None,
        }
    }
}

/// Builder for creating traces
pub struct TraceBuilder {
    start: SystemTime,
    model: Option<String>,
}

impl TraceBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn finish(self, messages: Vec<Message>, output: String, usage: Option<TokenUsage>) -> Trace {
        self.close(messages, Some(output), usage, None)
    }

    pub fn finish_with_error(self, messages: Vec<Message>, error: String) -> Trace {
        self.close(messages, None, None, Some(error))
    }

    fn close(
        self,
        messages: Vec<Message>,
        output: Option<String>,
        usage: Option<TokenUsage>,
        error: Option<String>,
    ) -> Trace {
        let end = SystemTime::now();
        let duration_ms = end
            .duration_since(self.start)
            .ok()
            .map(|d| d.as_millis() as u64);

        Trace {
            start: self.start,
            end,
            duration_ms,
            model: self.model,
            messages,
            output,
            usage,
            error,
        }
    }
}

/// A `(prompt, response)` pair to run evaluations against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id: Option<String>,
	#[serde(default)]
	pub prompt: String,
	pub response: String,
}

impl TestCase {
	pub fn new(prompt: impl Into<String>, response: impl Into<String>) -> Self {
		Self { id: None, prompt: prompt.into(), response: response.into() }
	}

	pub fn with_id(id: impl Into<String>, prompt: impl Into<String>, response: impl Into<String>) -> Self {
		Self { id: Some(id.into()), prompt: prompt.into(), response: response.into() }
	}
}

/// Outcome of one evaluation on one case. Exactly one of `passed` and `error` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
	pub evaluation: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub passed: Option<bool>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

impl Verdict {
	pub fn decided(evaluation: impl Into<String>, passed: bool) -> Self {
		Self { evaluation: evaluation.into(), passed: Some(passed), error: None }
	}

	pub fn errored(evaluation: impl Into<String>, error: impl Into<String>) -> Self {
		Self { evaluation: evaluation.into(), passed: None, error: Some(error.into()) }
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseStatus {
	Passed,
	Failed,
	Errored,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseResult {
	pub case: TestCase,
	pub verdicts: Vec<Verdict>,
	#[serde(skip_serializing_if = "Vec::is_empty", default)]
	pub traces: Vec<Trace>,
}

impl CaseResult {
	/// Any errored verdict makes the case errored; otherwise it passes only if
	/// it has verdicts and all of them passed.
	pub fn status(&self) -> CaseStatus {
		if self.verdicts.iter().any(|v| v.error.is_some()) {
			CaseStatus::Errored
		} else if !self.verdicts.is_empty() && self.verdicts.iter().all(|v| v.passed == Some(true)) {
			CaseStatus::Passed
		} else {
			CaseStatus::Failed
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteSummary {
	pub total: usize,
	pub passed: usize,
	pub failed: usize,
	pub errored: usize,
	pub pass_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
	pub cases: Vec<CaseResult>,
	pub summary: SuiteSummary,
}

#[derive(Debug, Clone, Tabled)]
struct SummaryRow {
	id: String,
	status: String,
	verdicts: String,
	prompt: String,
	response: String,
}

impl SuiteResult {
	pub fn summarize(cases: &[CaseResult]) -> SuiteSummary {
		let total = cases.len();
		let (mut passed, mut failed, mut errored) = (0usize, 0usize, 0usize);

		for cr in cases {
			match cr.status() {
				CaseStatus::Passed => passed += 1,
				CaseStatus::Failed => failed += 1,
				CaseStatus::Errored => errored += 1,
			}
		}

		let pass_rate = if total == 0 { 0.0 } else { passed as f64 / total as f64 };

		SuiteSummary { total, passed, failed, errored, pass_rate }
	}

	pub fn summary_table(&self) -> String {
		use tabled::Table;
		let rows: Vec<SummaryRow> = self.cases.iter().map(|cr| {
			let status = match cr.status() {
				CaseStatus::Passed => "✓",
				CaseStatus::Failed => "✗",
				CaseStatus::Errored => "!",
			};
			let verdicts = cr
				.verdicts
				.iter()
				.map(|v| {
					let mark = match v.passed {
						Some(true) => "pass",
						Some(false) => "fail",
						None => "error",
					};
					format!("{}={}", v.evaluation, mark)
				})
				.collect::<Vec<_>>()
				.join(", ");

			SummaryRow {
				id: cr.case.id.clone().unwrap_or_else(|| "-".to_string()),
				status: status.to_string(),
				verdicts: truncate(verdicts, 64),
				prompt: truncate(cr.case.prompt.clone(), 48),
				response: truncate(cr.case.response.clone(), 48),
			}
		}).collect();

		let table_str = Table::new(rows).to_string();

		let summary_text = format!(
			"Total: {}  Passed: {}  Failed: {}  Errored: {}  Pass rate: {:.1}%",
			self.summary.total,
			self.summary.passed,
			self.summary.failed,
			self.summary.errored,
			self.summary.pass_rate * 100.0,
		);

		format!("{}\n\n{}\n", table_str, summary_text)
	}
}

fn truncate(s: String, max_len: usize) -> String {
	if s.chars().count() <= max_len {
		return s;
	}
	let mut truncated = s.chars().take(max_len.saturating_sub(1)).collect::<String>();
	truncated.push('…');
	truncated
}
