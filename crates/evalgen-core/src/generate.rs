//! Drafting evaluations with the judge model: criteria for a prompt, then
//! candidate yes/no assertions for each criterion.

use std::sync::OnceLock;

use regex::Regex;
use tera::Context;

use crate::context::EvalContext;
use crate::error::EvaluationError;
use crate::evaluation::Evaluation;
use crate::prompts::{GENERATE_ASSERTIONS, GENERATE_CRITERIA};

/// Asks the judge what a good response to `prompt` must satisfy.
pub async fn generate_criteria(ctx: &EvalContext, prompt: &str) -> Result<Vec<String>, EvaluationError> {
    let mut vars = Context::new();
    vars.insert("prompt", prompt);
    ask_for_list(ctx, GENERATE_CRITERIA, &vars).await
}

/// Asks the judge for yes/no questions that check `criterion`.
pub async fn generate_assertions(ctx: &EvalContext, criterion: &str) -> Result<Vec<String>, EvaluationError> {
    let mut vars = Context::new();
    vars.insert("criterion", criterion);
    ask_for_list(ctx, GENERATE_ASSERTIONS, &vars).await
}

/// One LLM-assisted evaluation per assertion, named and described by the criterion.
pub fn assertions_to_evaluations(criterion: &str, assertions: &[String]) -> Vec<Evaluation> {
    assertions
        .iter()
        .map(|assertion| Evaluation::llm_assisted(criterion, criterion, assertion.as_str()))
        .collect()
}

async fn ask_for_list(ctx: &EvalContext, prompt_name: &str, vars: &Context) -> Result<Vec<String>, EvaluationError> {
    let judge = ctx.judge()?;
    let messages = ctx.prompts().conversation(prompt_name, vars)?;
    let raw = judge.invoke(&messages).await?;
    let items = parse_numbered_list(&raw);
    tracing::debug!(prompt = prompt_name, items = items.len(), "parsed generated list");
    Ok(items)
}

/// Items of a `1. text` / `2) text` list; lines that are not list items are skipped.
pub fn parse_numbered_list(text: &str) -> Vec<String> {
    static ITEM: OnceLock<Regex> = OnceLock::new();
    let item = ITEM.get_or_init(|| Regex::new(r"^\s*\d+[.)]\s+(.+?)\s*$").expect("valid list item regex"));

    text.lines()
        .filter_map(|line| item.captures(line))
        .map(|caps| caps[1].to_string())
        .collect()
}
