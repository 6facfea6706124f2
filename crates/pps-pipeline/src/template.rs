//! Prompt template lookup

use crate::error::GenerationError;
use std::io::ErrorKind;
use std::path::PathBuf;

/// Where prompt templates come from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TemplateStore {
    /// Every step gets an empty template (stub generators ignore it)
    #[default]
    Empty,
    /// `<dir>/<prompt_id>.txt`, e.g. `prompts/APP/01_mvp-cutter.txt`
    Directory(PathBuf),
}

impl TemplateStore {
    /// Path a step's template is read from, `None` for [`TemplateStore::Empty`]
    #[must_use]
    pub fn path_for(&self, prompt_id: &str) -> Option<PathBuf> {
        match self {
            Self::Empty => None,
            Self::Directory(dir) => Some(dir.join(format!("{prompt_id}.txt"))),
        }
    }

    /// Load the template for a step
    ///
    /// # Errors
    /// Missing or unreadable template file.
    pub async fn load(&self, prompt_id: &str) -> Result<String, GenerationError> {
        let Some(path) = self.path_for(prompt_id) else {
            return Ok(String::new());
        };
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(GenerationError::TemplateMissing {
                prompt_id: prompt_id.to_string(),
                path,
            }),
            Err(source) => Err(GenerationError::TemplateRead { path, source }),
        }
    }
}
