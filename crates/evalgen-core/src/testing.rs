use crate::types::SuiteResult;
use anyhow::Result;

/// Helper to assert a suite's pass rate meets a threshold.
///
/// Use this in your `#[tokio::test]` functions.
///
/// # Example
/// ```ignore
/// #[tokio::test]
/// async fn test_my_agent() -> Result<()> {
///     let suite = Suite::builder()
///         .context(ctx)
///         .data_source(data)
///         .evaluations(evaluations)
///         .build()?;
///
///     let result = suite.run().await?;
///
///     // Assert 80% of cases pass every evaluation
///     assert_suite_pass_rate(&result, 0.8)?;
///
///     Ok(())
/// }
/// ```
pub fn assert_suite_pass_rate(result: &SuiteResult, min_pass_rate: f64) -> Result<()> {
    if result.summary.pass_rate < min_pass_rate {
        anyhow::bail!(
            "Suite failed: pass rate {:.1}% is below threshold {:.1}%\n{}",
            result.summary.pass_rate * 100.0,
            min_pass_rate * 100.0,
            result.summary_table()
        );
    }
    Ok(())
}

/// Helper to assert all cases passed.
pub fn assert_suite_all_passed(result: &SuiteResult) -> Result<()> {
    if result.summary.passed != result.summary.total {
        anyhow::bail!(
            "Suite failed: {}/{} cases passed\n{}",
            result.summary.passed,
            result.summary.total,
            result.summary_table()
        );
    }
    Ok(())
}

/// Helper to assert no evaluation errored (ambiguous verdicts, bad snippets, judge failures).
pub fn assert_no_errors(result: &SuiteResult) -> Result<()> {
    if result.summary.errored > 0 {
        let first = result
            .cases
            .iter()
            .flat_map(|c| c.verdicts.iter())
            .find_map(|v| v.error.as_ref().map(|e| format!("{}: {}", v.evaluation, e)))
            .unwrap_or_default();
        anyhow::bail!(
            "Suite had {} errored case(s), first error: {}\n{}",
            result.summary.errored,
            first,
            result.summary_table()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CaseResult, TestCase, Verdict};

    fn result(verdicts: Vec<Vec<Verdict>>) -> SuiteResult {
        let cases: Vec<CaseResult> = verdicts
            .into_iter()
            .map(|v| CaseResult { case: TestCase::new("", "r"), verdicts: v, traces: Vec::new() })
            .collect();
        let summary = SuiteResult::summarize(&cases);
        SuiteResult { cases, summary }
    }

    #[test]
    fn test_pass_rate_threshold() {
        let r = result(vec![vec![Verdict::decided("a", true)], vec![Verdict::decided("a", false)]]);
        assert!(assert_suite_pass_rate(&r, 0.5).is_ok());
        assert!(assert_suite_pass_rate(&r, 0.6).is_err());
        assert!(assert_suite_all_passed(&r).is_err());
    }

    #[test]
    fn test_no_errors_names_first_error() {
        let r = result(vec![vec![Verdict::decided("a", true), Verdict::errored("tone", "ambiguous judge verdict: \"maybe\"")]]);
        let err = assert_no_errors(&r).unwrap_err();
        assert!(err.to_string().contains("tone: ambiguous judge verdict"));
    }
}
