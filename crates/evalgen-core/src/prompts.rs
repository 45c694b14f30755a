use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use evalgen_types::Message;
use tera::{Context, Tera};
use thiserror::Error;

/// Separates the system template from the user template in a prompt source.
pub const SYSTEM_MARKER: &str = "END SYSTEM PROMPT";

pub const EVALUATE: &str = "evaluate";
pub const GENERATE_CRITERIA: &str = "generate_criteria";
pub const GENERATE_ASSERTIONS: &str = "generate_assertions";

const BUILTIN: &[(&str, &str)] = &[
    (EVALUATE, include_str!("../prompts/evaluate.jinja")),
    (GENERATE_CRITERIA, include_str!("../prompts/generate_criteria.jinja")),
    (GENERATE_ASSERTIONS, include_str!("../prompts/generate_assertions.jinja")),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptPart {
    System,
    User,
}

impl fmt::Display for PromptPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromptPart::System => f.write_str("system"),
            PromptPart::User => f.write_str("user"),
        }
    }
}

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("unknown prompt '{0}'")]
    Unknown(String),

    #[error("prompt '{name}' has no {part} template")]
    MissingPart { name: String, part: PromptPart },

    #[error("failed to parse {part} template of prompt '{name}'")]
    Parse {
        name: String,
        part: PromptPart,
        #[source]
        source: tera::Error,
    },

    #[error("failed to render {part} template of prompt '{name}'")]
    Render {
        name: String,
        part: PromptPart,
        #[source]
        source: tera::Error,
    },

    #[error("failed to read prompts from {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Named system/user template pairs rendered with Tera.
///
/// A prompt source is split on [`SYSTEM_MARKER`]: the text before it is the
/// system template and the text after it the user template. Sources without
/// the marker only have a user template.
#[derive(Debug)]
pub struct PromptLibrary {
    tera: Tera,
    // prompt name -> whether it has a system part
    prompts: BTreeMap<String, bool>,
}

impl PromptLibrary {
    /// An empty library with no prompts at all.
    pub fn empty() -> Self {
        Self { tera: Tera::default(), prompts: BTreeMap::new() }
    }

    /// The prompts shipped with evalgen: `evaluate`, `generate_criteria`, `generate_assertions`.
    pub fn builtin() -> Result<Self, PromptError> {
        let mut lib = Self::empty();
        for (name, source) in BUILTIN {
            lib.add(name, source)?;
        }
        Ok(lib)
    }

    /// Built-in prompts overridden/extended by every `*.jinja` file in `dir`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, PromptError> {
        let dir = dir.as_ref();
        let io_err = |source| PromptError::Io { path: dir.to_path_buf(), source };

        let mut lib = Self::builtin()?;
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("jinja") {
                paths.push(path);
            }
        }
        paths.sort();

        for path in paths {
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let source = std::fs::read_to_string(&path)
                .map_err(|source| PromptError::Io { path: path.clone(), source })?;
            lib.add(name, &source)?;
            tracing::debug!(prompt = name, path = %path.display(), "loaded prompt");
        }
        Ok(lib)
    }

    /// Registers (or replaces) a prompt from its source text.
    ///
    /// The judge is always sent a system then a user message for
    /// [`EVALUATE`], so a source for it without a system part is rejected.
    pub fn add(&mut self, name: &str, source: &str) -> Result<(), PromptError> {
        let (system, user) = match source.split_once(SYSTEM_MARKER) {
            Some((system, user)) => (Some(system.trim()).filter(|s| !s.is_empty()), user.trim()),
            None => (None, source.trim()),
        };
        if name == EVALUATE && system.is_none() {
            return Err(PromptError::MissingPart { name: name.to_string(), part: PromptPart::System });
        }

        if let Some(system) = system {
            self.register(name, PromptPart::System, system)?;
        }
        self.register(name, PromptPart::User, user)?;
        self.prompts.insert(name.to_string(), system.is_some());
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.prompts.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.prompts.keys().map(String::as_str)
    }

    pub fn has_system(&self, name: &str) -> bool {
        self.prompts.get(name).copied().unwrap_or(false)
    }

    /// Renders one part of a prompt. Missing variables are an error.
    pub fn render(&self, name: &str, part: PromptPart, vars: &Context) -> Result<String, PromptError> {
        match self.prompts.get(name) {
            None => return Err(PromptError::Unknown(name.to_string())),
            Some(false) if part == PromptPart::System => {
                return Err(PromptError::MissingPart { name: name.to_string(), part });
            }
            Some(_) => {}
        }
        self.tera
            .render(&template_key(name, part), vars)
            .map_err(|source| PromptError::Render { name: name.to_string(), part, source })
    }

    /// `[system, user]` messages for a prompt. The system part is rendered with
    /// no variables and left out when the prompt has none.
    pub fn conversation(&self, name: &str, vars: &Context) -> Result<Vec<Message>, PromptError> {
        let mut messages = Vec::with_capacity(2);
        if self.has_system(name) {
            messages.push(Message::system(self.render(name, PromptPart::System, &Context::new())?));
        }
        messages.push(Message::user(self.render(name, PromptPart::User, vars)?));
        Ok(messages)
    }

    fn register(&mut self, name: &str, part: PromptPart, template: &str) -> Result<(), PromptError> {
        self.tera
            .add_raw_template(&template_key(name, part), template)
            .map_err(|source| PromptError::Parse { name: name.to_string(), part, source })
    }
}

fn template_key(name: &str, part: PromptPart) -> String {
    format!("{name}.{part}")
}
