//! Shared record shapes
//!
//! Entries of the four append-only logs and the appendix index.

use serde::{Deserialize, Serialize};

/// One recorded decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionLogEntry {
    /// Optional stable identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Date the decision was taken
    #[serde(default)]
    pub date: String,
    /// What was decided
    #[serde(default)]
    pub decision: String,
    /// Why
    #[serde(default)]
    pub rationale: String,
    /// Downstream impact
    #[serde(default)]
    pub impact: String,
    /// Accountable owner
    #[serde(default)]
    pub owner: String,
}

/// A question left open for a later step or a human
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenQuestionEntry {
    /// Question identifier
    #[serde(default)]
    pub id: String,
    /// The question itself
    #[serde(default)]
    pub question: String,
    /// Surrounding context
    #[serde(default)]
    pub context: String,
    /// Candidate answers
    #[serde(default)]
    pub options: Vec<String>,
    /// Recommended option
    #[serde(default)]
    pub recommended: String,
    /// Who must answer
    #[serde(default)]
    pub owner: String,
    /// Answer deadline
    #[serde(default)]
    pub due_by: String,
}

/// Compatibility class of a change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compatibility {
    /// Backwards compatible fix
    #[default]
    Patch,
    /// Backwards compatible addition
    Minor,
    /// Breaking change
    Major,
}

impl Compatibility {
    /// Wire name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Patch => "patch",
            Self::Minor => "minor",
            Self::Major => "major",
        }
    }
}

/// One changelog line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeLogEntry {
    /// Date of the change
    #[serde(default)]
    pub date: String,
    /// Area touched, e.g. `MVP_SCOPE`, `API_CONTRACT`, `ARCH_DECISIONS`, `DATA_MODEL`
    #[serde(default)]
    pub changed_area: String,
    /// What changed
    #[serde(default)]
    pub change: String,
    /// Why it changed
    #[serde(default)]
    pub reason: String,
    /// Compatibility class
    #[serde(default)]
    pub compatibility: Compatibility,
    /// Downstream impact
    #[serde(default)]
    pub impact: String,
}

/// Area a change request targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeRequestArea {
    /// API contract
    ApiContract,
    /// Data model
    DataModel,
    /// User experience
    Ux,
    /// Architecture
    Arch,
    /// Non-functional requirements
    Nfr,
}

/// Lifecycle of a change request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeRequestStatus {
    /// Awaiting a decision
    #[default]
    Open,
    /// Accepted into a future freeze
    Accepted,
    /// Rejected
    Rejected,
}

/// Request to change a frozen artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRequest {
    /// Request identifier
    #[serde(default)]
    pub id: String,
    /// Targeted area
    pub area: ChangeRequestArea,
    /// Requesting step or person
    #[serde(default)]
    pub requested_by: String,
    /// Freeze label the request was written against
    #[serde(default)]
    pub depends_on_freeze_label: String,
    /// Description
    #[serde(default)]
    pub description: String,
    /// Motivation
    #[serde(default)]
    pub reason: String,
    /// Concrete proposal
    #[serde(default)]
    pub proposed_change: String,
    /// Compatibility class
    #[serde(default)]
    pub compatibility: Compatibility,
    /// Current status
    #[serde(default)]
    pub status: ChangeRequestStatus,
}

/// Kind of an indexed appendix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppendixKind {
    /// OpenAPI document
    Openapi,
    /// Database migrations
    Migrations,
    /// UI component catalog
    UiCatalog,
    /// CI pipeline definition
    CiYaml,
    /// Anything else
    #[default]
    Other,
}

/// Reference to a large artifact kept out of the inline context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppendixRef {
    /// Unique id within the appendix index
    pub id: String,
    /// Appendix kind
    #[serde(default)]
    pub kind: AppendixKind,
    /// Short summary kept inline
    #[serde(default)]
    pub summary: String,
    /// Where the full artifact lives
    #[serde(default)]
    pub location: String,
    /// Producing step
    #[serde(default)]
    pub produced_by: String,
    /// Last update timestamp
    #[serde(default)]
    pub updated_on: String,
}

impl AppendixRef {
    /// Create reference with only id and kind set
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>, kind: AppendixKind) -> Self {
        Self {
            id: id.into(),
            kind,
            summary: String::new(),
            location: String::new(),
            produced_by: String::new(),
            updated_on: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appendix_kind_wire_names() {
        let kind: AppendixKind = serde_json::from_str("\"ui_catalog\"").unwrap();
        assert_eq!(kind, AppendixKind::UiCatalog);
        assert_eq!(serde_json::to_string(&AppendixKind::CiYaml).unwrap(), "\"ci_yaml\"");
    }

    #[test]
    fn change_request_area_wire_names() {
        let area: ChangeRequestArea = serde_json::from_str("\"API_CONTRACT\"").unwrap();
        assert_eq!(area, ChangeRequestArea::ApiContract);
    }

    #[test]
    fn decision_entry_tolerates_missing_fields() {
        let entry: DecisionLogEntry =
            serde_json::from_str(r#"{"decision": "use postgres"}"#).unwrap();
        assert_eq!(entry.decision, "use postgres");
        assert!(entry.id.is_none());
        assert!(entry.owner.is_empty());
    }

    #[test]
    fn change_request_status_defaults_open() {
        let cr: ChangeRequest =
            serde_json::from_str(r#"{"id": "CR-1", "area": "UX"}"#).unwrap();
        assert_eq!(cr.status, ChangeRequestStatus::Open);
        assert_eq!(cr.compatibility, Compatibility::Patch);
    }
}
