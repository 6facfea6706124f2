//! Generator collaborator
//!
//! The component that turns an envelope plus a prompt template into a
//! result document. Backends (model APIs, humans, fixtures) live behind this
//! trait; the runner never looks past it.

use crate::error::GenerationError;
use pps_schema::{Envelope, PromptResult};

/// Produces a result document for one step
#[async_trait::async_trait]
pub trait Generator: Send + Sync {
    /// Generate a result for `envelope` using the step's prompt `template`
    async fn generate(
        &self,
        envelope: &Envelope,
        template: &str,
    ) -> Result<PromptResult, GenerationError>;
}
