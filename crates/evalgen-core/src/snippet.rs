//! Host for computed-evaluation snippets.
//!
//! A snippet is trusted code. It runs with the full privileges of this process
//! and may do anything the host language allows, including file and network
//! I/O. Only the *variables* it sees are constrained: a fresh namespace holding
//! exactly `prompt` and `response`. Never load evaluation definitions from
//! authors you would not let run code on this machine.

use std::error::Error as StdError;

use thiserror::Error;

/// What the snippet left in its `result` variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultBinding {
    Missing,
    Bool(bool),
    Other { type_name: String },
}

/// The snippet itself failed (syntax error, raised exception, ...).
#[derive(Debug, Error)]
#[error("snippet failed in {runtime} runtime: {message}")]
pub struct SnippetError {
    pub runtime: &'static str,
    pub message: String,
    #[source]
    pub source: Option<Box<dyn StdError + Send + Sync>>,
}

impl SnippetError {
    pub fn new(runtime: &'static str, message: impl Into<String>) -> Self {
        Self { runtime, message: message.into(), source: None }
    }

    pub fn with_source(
        runtime: &'static str,
        message: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self { runtime, message: message.into(), source: Some(Box::new(source)) }
    }
}

/// Executes snippet code with `prompt` and `response` bound and reports `result`.
pub trait SnippetRuntime: Send + Sync {
    fn name(&self) -> &'static str;

    fn execute(&self, code: &str, prompt: &str, response: &str) -> Result<ResultBinding, SnippetError>;
}

#[cfg(feature = "python")]
pub use python::PythonRuntime;

#[cfg(feature = "python")]
mod python {
    use std::ffi::CString;

    use pyo3::prelude::*;
    use pyo3::types::{PyBool, PyDict};

    use super::{ResultBinding, SnippetError, SnippetRuntime};

    /// Runs snippets as Python source on an embedded interpreter.
    ///
    /// Each call gets new, empty globals (builtins are still reachable) and a
    /// locals dict seeded with `prompt` and `response`, mirroring
    /// `exec(code, {}, {"prompt": ..., "response": ...})`.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct PythonRuntime;

    impl PythonRuntime {
        const NAME: &'static str = "python";
    }

    impl SnippetRuntime for PythonRuntime {
        fn name(&self) -> &'static str {
            Self::NAME
        }

        fn execute(&self, code: &str, prompt: &str, response: &str) -> Result<ResultBinding, SnippetError> {
            let source = CString::new(code)
                .map_err(|e| SnippetError::with_source(Self::NAME, "snippet contains a NUL byte", e))?;

            Python::with_gil(|py| {
                let raised = |err: PyErr| {
                    let message = err.to_string();
                    SnippetError::with_source(Self::NAME, message, err)
                };

                let globals = PyDict::new(py);
                let locals = PyDict::new(py);
                locals.set_item("prompt", prompt).map_err(raised)?;
                locals.set_item("response", response).map_err(raised)?;

                py.run(&source, Some(&globals), Some(&locals)).map_err(raised)?;

                let Some(value) = locals.get_item("result").map_err(raised)? else {
                    return Ok(ResultBinding::Missing);
                };
                if let Ok(flag) = value.downcast::<PyBool>() {
                    return Ok(ResultBinding::Bool(flag.is_true()));
                }
                let type_name = value
                    .get_type()
                    .name()
                    .map(|n| n.to_string())
                    .unwrap_or_else(|_| "<unknown>".to_string());
                Ok(ResultBinding::Other { type_name })
            })
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_binds_prompt_and_response() {
            let rt = PythonRuntime;
            let binding = rt
                .execute("result = prompt == 'q' and response == 'a'", "q", "a")
                .unwrap();
            assert_eq!(binding, ResultBinding::Bool(true));
        }

        #[test]
        fn test_builtins_are_available() {
            let rt = PythonRuntime;
            let binding = rt.execute("result = len(response) > 3", "", "hello").unwrap();
            assert_eq!(binding, ResultBinding::Bool(true));
        }

        #[test]
        fn test_missing_result() {
            let rt = PythonRuntime;
            let binding = rt.execute("x = 1", "", "").unwrap();
            assert_eq!(binding, ResultBinding::Missing);
        }

        #[test]
        fn test_non_bool_result_reports_type() {
            let rt = PythonRuntime;
            let binding = rt.execute("result = 1", "", "").unwrap();
            assert_eq!(binding, ResultBinding::Other { type_name: "int".to_string() });
        }

        #[test]
        fn test_exception_is_reported() {
            let rt = PythonRuntime;
            let err = rt.execute("raise ValueError('nope')", "", "").unwrap_err();
            assert!(err.message.contains("nope"));
        }

        #[test]
        fn test_namespace_is_fresh_per_call() {
            let rt = PythonRuntime;
            rt.execute("leaked = True\nresult = True", "", "").unwrap();
            let binding = rt.execute("result = 'leaked' in dir()", "", "").unwrap();
            assert_eq!(binding, ResultBinding::Bool(false));
        }
    }
}
