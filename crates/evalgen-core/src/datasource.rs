use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde_json::Value;

use crate::evaluation::Evaluation;
use crate::format::Format;
use crate::types::TestCase;

#[async_trait]
pub trait DataSource: Send + Sync {
    async fn load(&self) -> Result<Vec<TestCase>>;
}

pub struct VecDataSource {
    cases: Vec<TestCase>,
}

impl VecDataSource {
    pub fn new(cases: Vec<TestCase>) -> Self {
        Self { cases }
    }
}

#[async_trait]
impl DataSource for VecDataSource {
    async fn load(&self) -> Result<Vec<TestCase>> {
        Ok(self.cases.clone())
    }
}

/// Read JSONL where each line is either:
/// - {"id": "...", "prompt": "...", "response": "..."}
/// - {"response": "..."} (prompt defaults to "")
pub struct JsonlDataSource {
    path: PathBuf,
}

impl JsonlDataSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DataSource for JsonlDataSource {
    async fn load(&self) -> Result<Vec<TestCase>> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read {:?}", self.path))?;
        let mut cases = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let case: TestCase = serde_json::from_str(line)
                .with_context(|| format!("Line {}: expected {{\"prompt\"?, \"response\"}} object", idx + 1))?;
            cases.push(case);
        }
        Ok(cases)
    }
}

/// Loads evaluation definitions from a JSON or YAML file holding either one
/// definition or a list of them. The format follows the file extension.
pub async fn load_evaluations(path: impl AsRef<Path>) -> Result<Vec<Evaluation>> {
    let path = path.as_ref();
    load_evaluations_as(path, Format::from_path(path)).await
}

/// Like [`load_evaluations`], reading the file as `format` whatever its extension.
pub async fn load_evaluations_as(path: impl AsRef<Path>, format: Format) -> Result<Vec<Evaluation>> {
    let path = path.as_ref();
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {:?}", path))?;
    let value: Value = match format {
        Format::Json => serde_json::from_str(&text)?,
        Format::Yaml => serde_yaml::from_str(&text)?,
    };

    let definitions = match value {
        Value::Array(items) => items,
        single @ Value::Object(_) => vec![single],
        other => return Err(anyhow!("{:?}: expected an evaluation or a list of evaluations, got {}", path, other)),
    };
    definitions
        .into_iter()
        .enumerate()
        .map(|(idx, def)| {
            Evaluation::from_value(def).with_context(|| format!("{:?}: evaluation #{}", path, idx + 1))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EvaluationError;

    #[tokio::test]
    async fn test_jsonl_cases() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cases.jsonl");
        tokio::fs::write(
            &path,
            "{\"id\": \"a\", \"prompt\": \"greet\", \"response\": \"hello\"}\n\n{\"response\": \"\", \"extra\": 1}\n",
        )
        .await
        .unwrap();

        let cases = JsonlDataSource::new(&path).load().await.unwrap();
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].id.as_deref(), Some("a"));
        assert_eq!(cases[0].prompt, "greet");
        assert_eq!(cases[1].prompt, "");
        assert_eq!(cases[1].response, "");
    }

    #[tokio::test]
    async fn test_jsonl_reports_line_number() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cases.jsonl");
        tokio::fs::write(&path, "{\"response\": \"ok\"}\n{\"prompt\": \"no response\"}\n").await.unwrap();

        let err = JsonlDataSource::new(&path).load().await.unwrap_err();
        assert!(err.to_string().starts_with("Line 2"), "{err}");
    }

    #[tokio::test]
    async fn test_load_single_and_list() {
        let dir = tempfile::tempdir().unwrap();
        let single = dir.path().join("tone.yaml");
        tokio::fs::write(&single, "type: llm_assisted\nname: tone\ndescription: tone check\nassertion: Is it polite?\n")
            .await
            .unwrap();
        let list = dir.path().join("all.json");
        tokio::fs::write(
            &list,
            r#"[{"type": "computed", "name": "a", "description": "", "code": "result = True"},
                {"type": "llm_assisted", "name": "b", "description": "", "assertion": "ok?"}]"#,
        )
        .await
        .unwrap();

        assert_eq!(load_evaluations(&single).await.unwrap().len(), 1);
        let all = load_evaluations(&list).await.unwrap();
        assert_eq!(all.iter().map(|e| e.name()).collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_load_with_explicit_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.txt");
        tokio::fs::write(
            &path,
            r#"{"type": "llm_assisted", "name": "tone", "description": "", "assertion": "Is it polite?"}"#,
        )
        .await
        .unwrap();

        let evals = load_evaluations_as(&path, Format::Json).await.unwrap();
        assert_eq!(evals, vec![Evaluation::llm_assisted("tone", "", "Is it polite?")]);
    }

    #[tokio::test]
    async fn test_load_keeps_typed_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        tokio::fs::write(&path, "- type: unsupported\n  name: x\n  description: y\n").await.unwrap();

        let err = load_evaluations(&path).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EvaluationError>(),
            Some(EvaluationError::UnknownVariant { .. })
        ));
    }
}
