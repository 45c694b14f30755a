use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use evalgen_types::{Message, TokenUsage, Trace};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::config::JudgeConfig;
use crate::trace::report_trace;

/// Sends a conversation to a model and returns its text completion.
#[async_trait]
pub trait Judge: Send + Sync {
	fn model(&self) -> &str;
	async fn invoke(&self, messages: &[Message]) -> Result<String, JudgeError>;
}

/// Failures of the judge boundary. Propagated to callers as-is; nothing here is retried.
#[derive(Debug, Error)]
pub enum JudgeError {
	#[error("judge request failed: {0}")]
	Http(#[from] reqwest::Error),

	#[error("judge returned HTTP {status}: {body}")]
	Status { status: u16, body: String },

	#[error("malformed judge response: {0}")]
	MalformedResponse(String),

	#[error("environment variable {0} is not set")]
	MissingApiKey(String),

	#[error(transparent)]
	Other(#[from] anyhow::Error),
}

/// Wrap an async closure as a `Judge`.
pub fn judge_fn<F, Fut>(f: F) -> Arc<dyn Judge>
where
	F: Send + Sync + 'static + Fn(Vec<Message>) -> Fut,
	Fut: Future<Output = anyhow::Result<String>> + Send + 'static,
{
	struct ClosureJudge<F> {
		f: F,
	}

	#[async_trait]
	impl<F, Fut> Judge for ClosureJudge<F>
	where
		F: Send + Sync + 'static + Fn(Vec<Message>) -> Fut,
		Fut: Future<Output = anyhow::Result<String>> + Send + 'static,
	{
		fn model(&self) -> &str {
			"custom"
		}

		async fn invoke(&self, messages: &[Message]) -> Result<String, JudgeError> {
			Ok((self.f)(messages.to_vec()).await?)
		}
	}

	Arc::new(ClosureJudge { f })
}

/// Judge backed by an OpenAI-compatible `/chat/completions` endpoint.
///
/// The HTTP client is built once here and reused by every call, so share one
/// `OpenAiJudge` (behind an `Arc`) rather than creating one per evaluation.
pub struct OpenAiJudge {
	client: reqwest::Client,
	endpoint: String,
	api_key: Option<String>,
	model: String,
	temperature: Option<f32>,
}

impl OpenAiJudge {
	/// Reads the API key from the environment variable named in the config.
	pub fn from_config(config: &JudgeConfig) -> Result<Self, JudgeError> {
		let api_key = std::env::var(&config.api_key_env)
			.map_err(|_| JudgeError::MissingApiKey(config.api_key_env.clone()))?;
		Ok(Self::with_api_key(config, Some(api_key)))
	}

	/// Uses the given key; `None` sends no `Authorization` header (local servers).
	pub fn with_api_key(config: &JudgeConfig, api_key: Option<String>) -> Self {
		Self {
			client: reqwest::Client::new(),
			endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
			api_key,
			model: config.model.clone(),
			temperature: config.temperature,
		}
	}

	async fn complete(&self, messages: &[Message]) -> Result<(String, Option<TokenUsage>), JudgeError> {
		let mut body = json!({
			"model": self.model,
			"messages": messages,
		});
		if let Some(t) = self.temperature {
			body["temperature"] = json!(t);
		}

		let mut request = self.client.post(&self.endpoint).json(&body);
		if let Some(key) = &self.api_key {
			request = request.bearer_auth(key);
		}

		let resp = request.send().await?;
		let status = resp.status();
		if !status.is_success() {
			let body = resp.text().await.unwrap_or_default();
			return Err(JudgeError::Status { status: status.as_u16(), body });
		}

		let completion: ChatCompletion = resp
			.json()
			.await
			.map_err(|e| JudgeError::MalformedResponse(e.to_string()))?;
		let content = completion
			.choices
			.into_iter()
			.next()
			.and_then(|c| c.message.content)
			.ok_or_else(|| JudgeError::MalformedResponse("no message content in first choice".to_string()))?;
		let usage = completion.usage.map(|u| TokenUsage {
			input_tokens: u.prompt_tokens,
			output_tokens: u.completion_tokens,
			total_tokens: u.total_tokens,
		});
		Ok((content, usage))
	}
}

#[async_trait]
impl Judge for OpenAiJudge {
	fn model(&self) -> &str {
		&self.model
	}

	async fn invoke(&self, messages: &[Message]) -> Result<String, JudgeError> {
		let trace = Trace::start_now().model(&self.model);
		match self.complete(messages).await {
			Ok((content, usage)) => {
				let trace = trace.finish(messages.to_vec(), content.clone(), usage);
				tracing::debug!(model = %self.model, duration_ms = ?trace.duration_ms, "judge call completed");
				report_trace(trace);
				Ok(content)
			}
			Err(err) => {
				tracing::debug!(model = %self.model, error = %err, "judge call failed");
				report_trace(trace.finish_with_error(messages.to_vec(), err.to_string()));
				Err(err)
			}
		}
	}
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
	choices: Vec<Choice>,
	#[serde(default)]
	usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
	message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
	content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
	prompt_tokens: u32,
	completion_tokens: u32,
	total_tokens: u32,
}
