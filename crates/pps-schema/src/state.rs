//! Accumulated pipeline state

use crate::envelope::SpecState;
use crate::records::AppendixRef;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Arbitrary nested key/value context data
pub type ContextMap = serde_json::Map<String, serde_json::Value>;

/// Context key holding the free-text context summary
pub const CONTEXT_BLOCK_KEY: &str = "context_block";

/// Dedup key: a `(prompt_id, run_id)` pair already folded into state
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AppliedEntry {
    /// Step id
    pub prompt_id: String,
    /// Run id
    pub run_id: String,
}

impl AppliedEntry {
    /// Create entry
    #[inline]
    #[must_use]
    pub fn new(prompt_id: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self {
            prompt_id: prompt_id.into(),
            run_id: run_id.into(),
        }
    }
}

impl fmt::Display for AppliedEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.prompt_id, self.run_id)
    }
}

/// State the merge engine produces and the projector reads
///
/// # Invariants
/// - appendix ids are unique
/// - `applied_index` holds no duplicate pair
/// - the four logs in `state` only grow
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineState {
    /// Nested context map
    pub context: ContextMap,
    /// Ordered appendix index
    pub appendices_index: Vec<AppendixRef>,
    /// Logs and freeze reference
    pub state: SpecState,
    /// Results already folded in
    pub applied_index: Vec<AppliedEntry>,
}

impl PipelineState {
    /// Context summary string, empty when absent or not a string
    #[must_use]
    pub fn context_block(&self) -> &str {
        self.context
            .get(CONTEXT_BLOCK_KEY)
            .and_then(serde_json::Value::as_str)
            .unwrap_or("")
    }

    /// Whether the appendix index holds `id`
    #[must_use]
    pub fn has_appendix(&self, id: &str) -> bool {
        self.appendices_index.iter().any(|a| a.id == id)
    }

    /// Whether `entry` was already folded in
    #[must_use]
    pub fn is_applied(&self, entry: &AppliedEntry) -> bool {
        self.applied_index.contains(entry)
    }
}
