use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use evalgen_core::{
	assertions_to_evaluations, generate_assertions, generate_criteria, load_evaluations,
	load_evaluations_as, EvalContext,
	EvalKind, Evaluation, Format, JsonlDataSource, JudgeConfig, PromptLibrary, Suite,
	SuiteConfig,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "evalgen", about = "Define and run pass/fail evaluations on model responses")]
struct Cli {
	/// Log more (-v: debug, -vv: trace). RUST_LOG overrides this.
	#[arg(short, long, global = true, action = ArgAction::Count)]
	verbose: u8,

	#[command(subcommand)]
	command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
	/// Evaluate one response with the evaluations in a file
	Check(CheckArgs),
	/// Run a suite file against a JSONL file of cases
	Run(RunArgs),
	/// Re-encode an evaluation file as JSON or YAML
	Convert(ConvertArgs),
	/// Ask the judge for evaluation criteria for a prompt
	Criteria(CriteriaArgs),
	/// Ask the judge for yes/no assertions checking a criterion
	Assertions(AssertionsArgs),
}

#[derive(Debug, Clone, Args)]
struct JudgeArgs {
	/// Judge model name
	#[arg(long, default_value = "gpt-4o")]
	model: String,

	/// Base URL of an OpenAI-compatible API
	#[arg(long, default_value = "https://api.openai.com/v1")]
	base_url: String,

	/// Environment variable holding the API key
	#[arg(long, default_value = "OPENAI_API_KEY")]
	api_key_env: String,

	/// Sampling temperature for the judge
	#[arg(long)]
	temperature: Option<f32>,

	/// Directory of *.jinja prompt overrides
	#[arg(long)]
	prompts_dir: Option<PathBuf>,
}

impl JudgeArgs {
	fn config(&self) -> JudgeConfig {
		JudgeConfig {
			model: self.model.clone(),
			base_url: self.base_url.clone(),
			api_key_env: self.api_key_env.clone(),
			temperature: self.temperature,
		}
	}
}

#[derive(Debug, Clone, Args)]
struct CheckArgs {
	/// JSON/YAML file with one evaluation or a list of them
	#[arg(long)]
	eval: PathBuf,

	/// Format of the evaluation file: json or yaml (default: from the extension)
	#[arg(long)]
	format: Option<Format>,

	/// The model response to evaluate
	#[arg(long)]
	response: String,

	/// The prompt that produced the response
	#[arg(long, default_value = "")]
	prompt: String,

	#[command(flatten)]
	judge: JudgeArgs,
}

#[derive(Debug, Clone, Args)]
struct RunArgs {
	/// Suite file (JSON or YAML) with judge settings and evaluations
	#[arg(long)]
	suite: PathBuf,

	/// JSONL file with lines { "id"?: string, "prompt"?: string, "response": string }; overrides the suite's data.path
	#[arg(long)]
	data: Option<PathBuf>,

	/// Cases in flight; overrides the suite's concurrency
	#[arg(long)]
	concurrency: Option<usize>,

	/// Write the full JSON result to a file
	#[arg(long)]
	json_out: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct ConvertArgs {
	#[arg(long)]
	eval: PathBuf,

	/// Output format: json or yaml
	#[arg(long)]
	to: Format,
}

#[derive(Debug, Clone, Args)]
struct CriteriaArgs {
	/// The prompt whose responses should be evaluated
	#[arg(long)]
	prompt: String,

	#[command(flatten)]
	judge: JudgeArgs,
}

#[derive(Debug, Clone, Args)]
struct AssertionsArgs {
	#[arg(long)]
	criterion: String,

	/// Write the resulting LLM-assisted evaluations to this YAML file
	#[arg(long)]
	out: Option<PathBuf>,

	#[command(flatten)]
	judge: JudgeArgs,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
	let cli = Cli::parse();
	init_logging(cli.verbose);

	match cli.command {
		Commands::Check(args) => check(args).await,
		Commands::Run(args) => run(args).await,
		Commands::Convert(args) => convert(args).await.map(|_| ExitCode::SUCCESS),
		Commands::Criteria(args) => criteria(args).await.map(|_| ExitCode::SUCCESS),
		Commands::Assertions(args) => assertions(args).await.map(|_| ExitCode::SUCCESS),
	}
}

fn init_logging(verbose: u8) {
	let default = match verbose {
		0 => "warn",
		1 => "debug",
		_ => "trace",
	};
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.init();
}

/// Builds a context; the judge (and its API key) is only required when an
/// LLM-assisted evaluation is going to run.
fn context_for(
	evaluations: &[Evaluation],
	judge: &JudgeConfig,
	prompts_dir: Option<&Path>,
) -> Result<EvalContext> {
	if evaluations.iter().any(|e| e.kind() == EvalKind::LlmAssisted) {
		return EvalContext::from_config(judge, prompts_dir);
	}
	let prompts = match prompts_dir {
		Some(dir) => PromptLibrary::from_dir(dir)?,
		None => PromptLibrary::builtin()?,
	};
	EvalContext::builder().prompts(prompts).build()
}

fn judge_context(args: &JudgeArgs) -> Result<EvalContext> {
	EvalContext::from_config(&args.config(), args.prompts_dir.as_deref())
}

async fn check(args: CheckArgs) -> Result<ExitCode> {
	let evaluations = match args.format {
		Some(format) => load_evaluations_as(&args.eval, format).await?,
		None => load_evaluations(&args.eval).await?,
	};
	let ctx = context_for(&evaluations, &args.judge.config(), args.judge.prompts_dir.as_deref())?;

	let mut all_passed = true;
	for evaluation in &evaluations {
		match evaluation.evaluate(&ctx, &args.prompt, &args.response).await {
			Ok(true) => println!("{}: pass", evaluation.name()),
			Ok(false) => {
				all_passed = false;
				println!("{}: fail", evaluation.name());
			}
			Err(err) => {
				all_passed = false;
				println!("{}: error: {}", evaluation.name(), err);
			}
		}
	}

	Ok(if all_passed { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

async fn run(args: RunArgs) -> Result<ExitCode> {
	let config = SuiteConfig::load(&args.suite).await?;
	let data_path = args
		.data
		.or_else(|| config.data.as_ref().map(|d| d.path.clone()))
		.context("no cases to run: pass --data or set data.path in the suite")?;

	let ctx = context_for(&config.evaluations, &config.judge, config.prompts_dir.as_deref())?;
	let suite = Suite::builder()
		.context(ctx)
		.data_source(Arc::new(JsonlDataSource::new(data_path)))
		.evaluations(config.evaluations)
		.concurrency(args.concurrency.unwrap_or(config.concurrency))
		.build()?;

	let result = suite.run().await?;
	println!("{}", result.summary_table());

	if let Some(path) = args.json_out {
		let json = serde_json::to_string_pretty(&result)?;
		tokio::fs::write(&path, json)
			.await
			.with_context(|| format!("Failed to write {:?}", path))?;
	}

	let ok = result.summary.passed == result.summary.total;
	Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

async fn convert(args: ConvertArgs) -> Result<()> {
	let evaluations = load_evaluations(&args.eval).await?;
	let text = match (args.to, evaluations.as_slice()) {
		(format, [single]) => single.to_text(format)?,
		(Format::Json, many) => serde_json::to_string_pretty(many)?,
		(Format::Yaml, many) => serde_yaml::to_string(many)?,
	};
	println!("{}", text.trim_end());
	Ok(())
}

async fn criteria(args: CriteriaArgs) -> Result<()> {
	let ctx = judge_context(&args.judge)?;
	for (idx, criterion) in generate_criteria(&ctx, &args.prompt).await?.iter().enumerate() {
		println!("{}. {}", idx + 1, criterion);
	}
	Ok(())
}

async fn assertions(args: AssertionsArgs) -> Result<()> {
	let ctx = judge_context(&args.judge)?;
	let assertions = generate_assertions(&ctx, &args.criterion).await?;
	for (idx, assertion) in assertions.iter().enumerate() {
		println!("{}. {}", idx + 1, assertion);
	}

	if let Some(path) = args.out {
		let evaluations = assertions_to_evaluations(&args.criterion, &assertions);
		let yaml = serde_yaml::to_string(&evaluations)?;
		tokio::fs::write(&path, yaml)
			.await
			.with_context(|| format!("Failed to write {:?}", path))?;
		tracing::info!(count = evaluations.len(), path = %path.display(), "wrote evaluations");
	}
	Ok(())
}
