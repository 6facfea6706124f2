//! Sequential pipeline runner
//!
//! Drives the standard steps in order. For each step:
//! 1. project the step envelope from the state so far
//! 2. load the prompt template and ask the generator for a result
//! 3. fold the result in through the merge engine
//!
//! The first failure stops the run; the report keeps the state reached.

use crate::error::PipelineError;
use crate::generator::Generator;
use crate::template::TemplateStore;
use pps_merge::{initial_state, project_envelope, IterationSummary, MergeEngine, MetaOverrides};
use pps_schema::{ContextMap, Envelope, PipelineState, FOCUS_FREEZE_LABEL_KEY, STANDARD_STEP_IDS};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};
use ulid::Ulid;

/// What one completed step left behind
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    /// Step id
    pub prompt_id: String,
    /// Run id the step executed under
    pub run_id: String,
    /// Iteration summary from the merge
    pub summary: Option<IterationSummary>,
    /// Merge warnings, rendered
    pub warnings: Vec<String>,
}

/// Outcome of a pipeline run
#[derive(Debug)]
pub struct PipelineReport {
    /// State after the last successful step
    pub state: PipelineState,
    /// Completed steps in order
    pub steps: Vec<StepReport>,
    /// Why the run stopped early, if it did
    pub failure: Option<PipelineError>,
}

impl PipelineReport {
    /// Every step completed
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

/// Sequential step driver
pub struct Pipeline {
    engine: MergeEngine,
    generator: Arc<dyn Generator>,
    templates: TemplateStore,
    steps: Vec<String>,
}

impl Pipeline {
    /// Pipeline over the eight standard steps with empty templates
    #[must_use]
    pub fn new(engine: MergeEngine, generator: Arc<dyn Generator>) -> Self {
        Self {
            engine,
            generator,
            templates: TemplateStore::Empty,
            steps: STANDARD_STEP_IDS.iter().map(ToString::to_string).collect(),
        }
    }

    /// Read prompt templates from `templates`
    #[inline]
    #[must_use]
    pub fn with_templates(mut self, templates: TemplateStore) -> Self {
        self.templates = templates;
        self
    }

    /// Run `steps` instead of the standard sequence
    #[must_use]
    pub fn with_steps<I, S>(mut self, steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.steps = steps.into_iter().map(Into::into).collect();
        self
    }

    /// Step ids in execution order
    #[must_use]
    pub fn steps(&self) -> &[String] {
        &self.steps
    }

    /// Run every step starting from `base`
    pub async fn run(&self, base: &Envelope) -> PipelineReport {
        let run_prefix = Ulid::new();
        let mut state = initial_state(base);
        let mut steps = Vec::with_capacity(self.steps.len());

        info!(steps = self.steps.len(), run = %run_prefix, "pipeline started");
        for (index, prompt_id) in self.steps.iter().enumerate() {
            let run_id = format!("RUN-{run_prefix}-{:02}", index + 1);
            match self.run_step(base, &state, prompt_id, run_id).await {
                Ok((next, report)) => {
                    info!(
                        step = index + 1,
                        prompt_id = %prompt_id,
                        warnings = report.warnings.len(),
                        "step complete"
                    );
                    if let Some(next) = next {
                        state = next;
                    }
                    steps.push(report);
                }
                Err(failure) => {
                    warn!(step = index + 1, error = %failure, "pipeline stopped");
                    return PipelineReport {
                        state,
                        steps,
                        failure: Some(failure),
                    };
                }
            }
        }

        info!(applied = state.applied_index.len(), "pipeline finished");
        PipelineReport {
            state,
            steps,
            failure: None,
        }
    }

    async fn run_step(
        &self,
        base: &Envelope,
        state: &PipelineState,
        prompt_id: &str,
        run_id: String,
    ) -> Result<(Option<PipelineState>, StepReport), PipelineError> {
        let catalog = &self.engine.config().gates;
        let mut focus = ContextMap::new();
        let frozen = &state.state.contract_freeze_ref.label;
        if catalog.is_pinned(prompt_id) && !frozen.is_empty() {
            focus.insert(FOCUS_FREEZE_LABEL_KEY.to_string(), Value::String(frozen.clone()));
        }

        let overrides = MetaOverrides::new(prompt_id, run_id.clone())
            .with_gate_target(catalog.gate_target_for(prompt_id))
            .with_iteration_id(iteration_id());
        let envelope = project_envelope(base, state, overrides, focus);
        debug!(prompt_id, run_id = %run_id, gate_target = %envelope.meta.gate_target, "envelope built");

        let generation_failed = |error| PipelineError::Generation {
            prompt_id: prompt_id.to_string(),
            error,
        };
        let template = self
            .templates
            .load(prompt_id)
            .await
            .map_err(generation_failed)?;
        let result = self
            .generator
            .generate(&envelope, &template)
            .await
            .map_err(generation_failed)?;
        debug!(prompt_id, "result generated");

        let outcome = self.engine.merge(&envelope, &result, &state.applied_index);
        if !outcome.is_ok() {
            return Err(PipelineError::MergeRejected {
                prompt_id: prompt_id.to_string(),
                errors: outcome.errors,
            });
        }

        let report = StepReport {
            prompt_id: prompt_id.to_string(),
            run_id,
            warnings: outcome.warning_messages(),
            summary: outcome.summary,
        };
        Ok((outcome.state, report))
    }
}

fn iteration_id() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string()
}
