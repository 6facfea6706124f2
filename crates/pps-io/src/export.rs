//! Human-readable export of accumulated state
//!
//! Writes markdown renditions of the decision log, changelog and open
//! questions next to a full `state.json`.

use crate::documents::state_to_json;
use crate::error::DocumentError;
use pps_schema::{AppendixKind, ChangeLogEntry, DecisionLogEntry, OpenQuestionEntry, PipelineState};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Decision log file name
pub const DECISIONS_FILE: &str = "decisions.md";
/// Changelog file name
pub const CHANGELOG_FILE: &str = "CHANGELOG.md";
/// Open questions file name
pub const OPEN_QUESTIONS_FILE: &str = "open-questions.md";
/// Full state file name
pub const STATE_FILE: &str = "state.json";

/// What an export produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportReport {
    /// Files written, in write order
    pub written: Vec<PathBuf>,
    /// Pointers to artifacts held outside the state (appendix locations)
    pub notes: Vec<String>,
}

/// Export `state` into `dir`, creating it if needed
///
/// Markdown files are only written for non-empty logs; `state.json` is
/// always written.
///
/// # Errors
/// Directory creation, serialization or write failure.
pub fn export_artifacts(
    state: &PipelineState,
    dir: impl AsRef<Path>,
) -> Result<ExportReport, DocumentError> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).map_err(|e| DocumentError::write(dir, e))?;

    let mut report = ExportReport::default();
    for (kind, label) in [
        (AppendixKind::Openapi, "OpenAPI spec"),
        (AppendixKind::Migrations, "Migrations"),
    ] {
        if let Some(appendix) = state.appendices_index.iter().find(|a| a.kind == kind) {
            report
                .notes
                .push(format!("{label} reference: {}", appendix.location));
        }
    }

    let logs = &state.state;
    if !logs.decision_log.is_empty() {
        write_file(dir, DECISIONS_FILE, &format_decisions(&logs.decision_log), &mut report)?;
    }
    if !logs.changelog.is_empty() {
        write_file(dir, CHANGELOG_FILE, &format_changelog(&logs.changelog), &mut report)?;
    }
    if !logs.open_questions.is_empty() {
        write_file(
            dir,
            OPEN_QUESTIONS_FILE,
            &format_open_questions(&logs.open_questions),
            &mut report,
        )?;
    }

    let state_path = dir.join(STATE_FILE);
    let json = state_to_json(state).map_err(|source| DocumentError::Json {
        path: state_path,
        source,
    })?;
    write_file(dir, STATE_FILE, &json, &mut report)?;

    Ok(report)
}

fn write_file(
    dir: &Path,
    name: &str,
    contents: &str,
    report: &mut ExportReport,
) -> Result<(), DocumentError> {
    let path = dir.join(name);
    fs::write(&path, contents).map_err(|e| DocumentError::write(&path, e))?;
    info!(path = %path.display(), "exported");
    report.written.push(path);
    Ok(())
}

/// Render the decision log as markdown
#[must_use]
pub fn format_decisions(decisions: &[DecisionLogEntry]) -> String {
    let mut md = String::from("# Decision Log\n\n");
    md.push_str("Key decisions made while building the spec.\n\n");
    for d in decisions {
        let _ = write!(
            md,
            "## {}: {}\n\n**Rationale:** {}\n\n**Impact:** {}\n\n",
            d.date, d.decision, d.rationale, d.impact
        );
        if !d.owner.is_empty() {
            let _ = write!(md, "**Owner:** {}\n\n", d.owner);
        }
        md.push_str("---\n\n");
    }
    md
}

/// Render the changelog as markdown
#[must_use]
pub fn format_changelog(changelog: &[ChangeLogEntry]) -> String {
    let mut md = String::from("# Changelog\n\n");
    md.push_str("Changes made to the spec during the pipeline run.\n\n");
    for c in changelog {
        let _ = write!(
            md,
            "## {}: {}\n\n**Area:** {}\n\n**Reason:** {}\n\n**Compatibility:** {}\n\n**Impact:** {}\n\n---\n\n",
            c.date,
            c.change,
            c.changed_area,
            c.reason,
            c.compatibility.as_str(),
            c.impact
        );
    }
    md
}

/// Render open questions as markdown
#[must_use]
pub fn format_open_questions(questions: &[OpenQuestionEntry]) -> String {
    let mut md = String::from("# Open Questions\n\n");
    md.push_str("To be resolved before implementation can proceed.\n\n");
    for q in questions {
        let _ = write!(
            md,
            "## {}\n\n**ID:** {}\n\n**Context:** {}\n\n**Options:**\n",
            q.question, q.id, q.context
        );
        for option in &q.options {
            let _ = writeln!(md, "- {option}");
        }
        let _ = write!(
            md,
            "\n**Recommended:** {}\n\n**Owner:** {}\n\n**Due by:** {}\n\n---\n\n",
            q.recommended, q.owner, q.due_by
        );
    }
    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use pps_schema::{Compatibility, OpenQuestionEntry};

    #[test]
    fn changelog_markdown() {
        let md = format_changelog(&[ChangeLogEntry {
            date: "2026-01-28".into(),
            changed_area: "API_CONTRACT".into(),
            change: "Add /tasks".into(),
            reason: "MVP".into(),
            compatibility: Compatibility::Minor,
            impact: "FE".into(),
        }]);
        assert!(md.starts_with("# Changelog\n\n"));
        assert!(md.contains("## 2026-01-28: Add /tasks\n\n"));
        assert!(md.contains("**Compatibility:** minor"));
    }

    #[test]
    fn open_question_lists_options() {
        let md = format_open_questions(&[OpenQuestionEntry {
            id: "Q1".into(),
            question: "Which IdP?".into(),
            context: "Auth".into(),
            options: vec!["Auth0".into(), "Keycloak".into()],
            recommended: "Keycloak".into(),
            owner: "Arch".into(),
            due_by: "2026-02-01".into(),
        }]);
        assert!(md.contains("**Options:**\n- Auth0\n- Keycloak\n\n**Recommended:** Keycloak"));
    }
}
