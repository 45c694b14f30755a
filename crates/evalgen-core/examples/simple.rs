use std::sync::Arc;

use evalgen_core::{judge_fn, EvalContext, Evaluation, Format, Suite, TestCase, VecDataSource};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A stub judge: answers "yes" whenever the response thanks the user.
    // Swap in `OpenAiJudge::from_config(&JudgeConfig::default())?` to use a real model.
    let judge = judge_fn(|messages| async move {
        let user = messages.last().map(|m| m.content.to_lowercase()).unwrap_or_default();
        let answer = if user.contains("thank") { "Yes" } else { "No" };
        Ok(answer.to_string())
    });
    let ctx = EvalContext::builder().judge(judge).build()?;

    let evaluations = vec![
        Evaluation::computed("non_empty", "response is not empty", "result = len(response) > 0"),
        Evaluation::llm_assisted("tone", "tone check", "Is the response polite?"),
    ];

    // Example 1: one evaluation, one response
    let passed = evaluations[1].evaluate(&ctx, "", "Thank you for your patience.").await?;
    println!("tone: {}", if passed { "pass" } else { "fail" });

    // Example 2: definitions are plain data
    println!("{}", evaluations[0].to_text(Format::Yaml)?);

    // Example 3: a whole suite over several responses
    let cases = vec![
        TestCase::with_id("0", "Say sorry for the delay", "Thank you for your patience."),
        TestCase::with_id("1", "Say sorry for the delay", "Wait."),
        TestCase::with_id("2", "Say sorry for the delay", ""),
    ];
    let suite = Suite::builder()
        .context(ctx)
        .data_source(Arc::new(VecDataSource::new(cases)))
        .evaluations(evaluations)
        .concurrency(4)
        .build()?;

    let result = suite.run().await?;
    println!("{}", result.summary_table());

    Ok(())
}
