//! Gate catalog
//!
//! Gate identifiers, the step kind owning each gate, the single contract
//! freeze authority and the freeze-pinned (front-end/back-end) step kinds.
//! The catalog is a plain value handed to the validator and merge engine, so
//! tests can swap in alternate catalogs.

use crate::GATE_TARGET_NA;
use serde::{Deserialize, Serialize};

/// The eight standard step kinds, in pipeline order
pub const STANDARD_STEP_IDS: [&str; 8] = [
    "APP/01_mvp-cutter",
    "APP/02_ux-flows",
    "APP/03_architecture",
    "APP/04_data-api-contract",
    "APP/05_frontend-plan",
    "APP/06_backend-plan",
    "APP/07_integrations-async-security",
    "APP/08_release-ops",
];

const STANDARD_GATES: [(&str, &str); 7] = [
    ("GATE_1_MVP_BOUNDED", "APP/01_mvp-cutter"),
    ("GATE_2_TRACEABILITY_FLOW_SCREEN_STATE", "APP/02_ux-flows"),
    ("GATE_3_TRUST_AND_CLASSIFICATION", "APP/03_architecture"),
    ("GATE_4_CONTRACT_FREEZE_V0", "APP/04_data-api-contract"),
    ("GATE_5_CONTRACT_NO_DEVIATIONS", "APP/05_frontend-plan"),
    ("GATE_6_INTEGRATIONS_HARDENED", "APP/07_integrations-async-security"),
    ("GATE_7_STAGING_REHEARSAL_AND_SLO_ALERTS", "APP/08_release-ops"),
];

/// A gate and the step kind responsible for it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GateOwnership {
    /// Gate identifier
    pub gate_id: String,
    /// Owning step kind
    pub owner: String,
}

/// Immutable gate and ownership configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateCatalog {
    /// Recognized gates in order
    pub gates: Vec<GateOwnership>,
    /// Step kind allowed to write the contract freeze reference
    pub freeze_authority: String,
    /// Step kinds that must work against a pinned freeze label
    pub pinned_steps: Vec<String>,
}

impl Default for GateCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl GateCatalog {
    /// The standard seven-gate catalog
    #[must_use]
    pub fn standard() -> Self {
        Self {
            gates: STANDARD_GATES
                .iter()
                .map(|(gate_id, owner)| GateOwnership {
                    gate_id: (*gate_id).to_string(),
                    owner: (*owner).to_string(),
                })
                .collect(),
            freeze_authority: "APP/04_data-api-contract".to_string(),
            pinned_steps: vec![
                "APP/05_frontend-plan".to_string(),
                "APP/06_backend-plan".to_string(),
            ],
        }
    }

    /// Whether `gate_id` is a recognized gate
    #[must_use]
    pub fn contains_gate(&self, gate_id: &str) -> bool {
        self.gates.iter().any(|g| g.gate_id == gate_id)
    }

    /// Step kind owning `gate_id`
    #[must_use]
    pub fn owner_of(&self, gate_id: &str) -> Option<&str> {
        self.gates
            .iter()
            .find(|g| g.gate_id == gate_id)
            .map(|g| g.owner.as_str())
    }

    /// Gate target for a step kind, [`GATE_TARGET_NA`] when it owns none
    #[must_use]
    pub fn gate_target_for(&self, prompt_id: &str) -> &str {
        self.gates
            .iter()
            .find(|g| g.owner == prompt_id)
            .map_or(GATE_TARGET_NA, |g| g.gate_id.as_str())
    }

    /// Whether `prompt_id` may write the contract freeze reference
    #[inline]
    #[must_use]
    pub fn is_freeze_authority(&self, prompt_id: &str) -> bool {
        self.freeze_authority == prompt_id
    }

    /// Whether `prompt_id` is subject to freeze pinning
    #[inline]
    #[must_use]
    pub fn is_pinned(&self, prompt_id: &str) -> bool {
        self.pinned_steps.iter().any(|s| s == prompt_id)
    }

    /// Gate ids in catalog order
    pub fn gate_ids(&self) -> impl Iterator<Item = &str> {
        self.gates.iter().map(|g| g.gate_id.as_str())
    }
}
