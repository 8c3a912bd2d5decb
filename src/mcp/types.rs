//! Request and response types for MCP tools.

use rmcp::schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// ============================================================
// Request Types
// ============================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct InitProjectRequest {
    #[schemars(description = "Project name")]
    pub name: String,
    #[schemars(description = "What kind of project this is, e.g. 'CLI tool', 'web service', 'library'")]
    pub project_type: String,
    #[schemars(description = "Current phase, e.g. 'design', 'build', 'hardening'")]
    pub phase: String,
    #[schemars(description = "All planned phases in order, if known")]
    #[serde(default)]
    pub phases: Vec<String>,
    #[schemars(description = "One-paragraph description of the project")]
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ProcessDocumentRequest {
    #[schemars(
        description = "Path to the raw input document. Relative paths resolve against the project root. Must not be inside summaries/ or archive/."
    )]
    pub path: String,
    #[schemars(
        description = "Template mode: 'light' for early or small projects, 'full' for richer summaries with context and cross references"
    )]
    pub mode: String,
}

/// One finished piece of work and the exact files it produced.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct AccomplishmentInput {
    #[schemars(description = "What was done")]
    pub description: String,
    #[schemars(description = "Exact paths of files created or changed")]
    #[serde(default)]
    pub outputs: Vec<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GenerateHandoffRequest {
    #[schemars(description = "Session date as YYYY-MM-DD. Defaults to today.")]
    #[serde(default)]
    pub date: Option<String>,
    #[schemars(description = "Short session topic; becomes part of the file name, e.g. 'auth flow'")]
    pub topic: String,
    #[schemars(description = "What was accomplished, with output files")]
    #[serde(default)]
    pub accomplishments: Vec<AccomplishmentInput>,
    #[schemars(description = "Numbers established during the session, verbatim with units")]
    #[serde(default)]
    pub numeric_facts: Vec<String>,
    #[schemars(description = "Conditional rules established, in 'IF x THEN y' form")]
    #[serde(default)]
    pub conditional_logic: Vec<String>,
    #[schemars(description = "Concrete next steps for the following session")]
    #[serde(default)]
    pub next_steps: Vec<String>,
    #[schemars(description = "Questions still open")]
    #[serde(default)]
    pub open_questions: Vec<String>,
    #[schemars(description = "Free-form notes. Only kept in full mode.")]
    #[serde(default)]
    pub notes: Option<String>,
    #[schemars(description = "Template mode: 'light' or 'full'. If omitted, session_count decides.")]
    #[serde(default)]
    pub mode: Option<String>,
    #[schemars(
        description = "Sessions completed so far. Used to pick a mode when none is given (fewer than 5 = light)."
    )]
    #[serde(default)]
    pub session_count: Option<u32>,
}

// ============================================================
// Response Types
// ============================================================

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct InitProjectResponse {
    /// Path of the project brief, relative to the project root
    pub brief_path: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ProcessDocumentResponse {
    pub summary_path: String,
    /// Where the original document now lives
    pub archived_source: String,
    pub synopsis: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct GenerateHandoffResponse {
    pub record_path: String,
    /// Where the previously active handoff was moved, if there was one
    pub archived_previous: Option<String>,
    pub synopsis: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SessionInfo {
    pub date: String,
    pub topic: String,
    pub path: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct StateReportResponse {
    pub project: String,
    pub project_type: String,
    pub phase: String,
    pub last_session: Option<SessionInfo>,
    pub next_steps: Vec<String>,
    pub open_questions: Vec<String>,
    /// Live records in summaries/
    pub file_count: usize,
    /// True once file_count reaches the soft cap; consolidate before adding more
    pub warning: bool,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct CheckWorkspaceResponse {
    pub ok: bool,
    pub message: String,
}
