//! MCP server exposing the project-memory operations to agents.

mod types;

use std::path::{Path, PathBuf};
use std::str::FromStr;

pub use types::*;

use chrono::NaiveDate;
use rmcp::{
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerInfo},
    tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler, ServiceExt,
};
use serde::Serialize;

use crate::error::WaypointError;
use crate::models::*;
use crate::store::Workspace;

#[derive(Clone)]
pub struct McpServer {
    workspace: Workspace,
    tool_router: ToolRouter<Self>,
}

/// Map a library error onto an MCP error, keeping its kind visible to the agent.
fn to_mcp_error(e: WaypointError) -> McpError {
    let message = format!("{}: {}", e.kind(), e);
    match e {
        WaypointError::PartialWriteDetected(_) | WaypointError::Io { .. } => {
            McpError::internal_error(message, None)
        }
        _ => McpError::invalid_params(message, None),
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(e.to_string(), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

fn parse_mode(s: &str) -> Result<Mode, McpError> {
    Mode::from_str(s).map_err(to_mcp_error)
}

fn parse_date(s: Option<&str>) -> Result<NaiveDate, McpError> {
    match s {
        Some(s) => NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).map_err(|e| {
            McpError::invalid_params(
                format!("SchemaMismatch: invalid date '{}' (expected YYYY-MM-DD): {}", s, e),
                None,
            )
        }),
        None => Ok(chrono::Local::now().date_naive()),
    }
}

impl McpServer {
    pub fn new(workspace: Workspace) -> Self {
        Self {
            workspace,
            tool_router: Self::tool_router(),
        }
    }

    fn rel(&self, path: &Path) -> String {
        self.workspace.relative(path)
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let path = PathBuf::from(path);
        if path.is_relative() {
            self.workspace.root().join(path)
        } else {
            path
        }
    }

    // ============================================================
    // Tool logic, shared by the tools below and the tests
    // ============================================================

    pub fn handle_init_project(
        &self,
        req: InitProjectRequest,
    ) -> Result<InitProjectResponse, McpError> {
        let brief = ProjectBrief {
            name: req.name,
            project_type: req.project_type,
            phase: req.phase,
            phases: req.phases,
            description: req.description,
        };
        let path = self.workspace.init(&brief).map_err(to_mcp_error)?;
        Ok(InitProjectResponse {
            brief_path: self.rel(&path),
        })
    }

    pub fn handle_process_document(
        &self,
        req: ProcessDocumentRequest,
    ) -> Result<ProcessDocumentResponse, McpError> {
        let mode = parse_mode(&req.mode)?;
        let outcome = self
            .workspace
            .process_document(self.resolve(&req.path), mode)
            .map_err(to_mcp_error)?;
        Ok(ProcessDocumentResponse {
            summary_path: self.rel(&outcome.summary_path),
            archived_source: self.rel(&outcome.archived_source),
            synopsis: outcome.synopsis,
        })
    }

    pub fn handle_generate_handoff(
        &self,
        req: GenerateHandoffRequest,
    ) -> Result<GenerateHandoffResponse, McpError> {
        let mode = req.mode.as_deref().map(parse_mode).transpose()?;
        let facts = SessionFacts {
            date: parse_date(req.date.as_deref())?,
            topic: req.topic,
            accomplishments: req
                .accomplishments
                .into_iter()
                .map(|a| Accomplishment {
                    description: a.description,
                    outputs: a.outputs,
                })
                .collect(),
            numeric_facts: req.numeric_facts,
            conditional_logic: req.conditional_logic,
            next_steps: req.next_steps,
            open_questions: req.open_questions,
            notes: req.notes,
            session_count: req.session_count,
        };
        let outcome = self
            .workspace
            .generate_handoff(facts, mode)
            .map_err(to_mcp_error)?;
        Ok(GenerateHandoffResponse {
            record_path: self.rel(&outcome.record_path),
            archived_previous: outcome.archived_previous.as_deref().map(|p| self.rel(p)),
            synopsis: outcome.synopsis,
        })
    }

    pub fn handle_report_state(&self) -> Result<StateReportResponse, McpError> {
        let report = self.workspace.report_state().map_err(to_mcp_error)?;
        Ok(StateReportResponse {
            project: report.project,
            project_type: report.project_type,
            phase: report.phase,
            last_session: report.last_session.map(|s| SessionInfo {
                path: self.rel(&s.path),
                date: s.date,
                topic: s.topic,
            }),
            next_steps: report.next_steps,
            open_questions: report.open_questions,
            file_count: report.file_count,
            warning: report.warning,
        })
    }

    pub fn handle_check_workspace(&self) -> Result<CheckWorkspaceResponse, McpError> {
        self.workspace.check().map_err(to_mcp_error)?;
        Ok(CheckWorkspaceResponse {
            ok: true,
            message: "Workspace is consistent".to_string(),
        })
    }
}

#[tool_router]
impl McpServer {
    #[tool(
        description = "Set up the project memory: creates summaries/, archive/ and archive/handoffs/ and writes the project brief (summaries/00-project-brief.md). Call once per project. Re-running with the same brief is harmless; a different brief is rejected with Conflict."
    )]
    async fn init_project(
        &self,
        params: Parameters<InitProjectRequest>,
    ) -> Result<CallToolResult, McpError> {
        to_json(&self.handle_init_project(params.0)?)
    }

    #[tool(
        description = "Summarize a raw input document into summaries/source-<name>.md and move the original into archive/. Requirements are normalized to IF/THEN/BUT/EXCEPT, numbers are kept verbatim, uncertainties are tagged OPEN/ASSUMED/MISSING. After this call, read the summary instead of the original."
    )]
    async fn process_document(
        &self,
        params: Parameters<ProcessDocumentRequest>,
    ) -> Result<CallToolResult, McpError> {
        to_json(&self.handle_process_document(params.0)?)
    }

    #[tool(
        description = "Record the end of a session. Writes summaries/handoff-<date>-<topic>.md and moves the previous handoff into archive/handoffs/. Call this LAST in every session, with exact output file paths for each accomplishment."
    )]
    async fn generate_handoff(
        &self,
        params: Parameters<GenerateHandoffRequest>,
    ) -> Result<CallToolResult, McpError> {
        to_json(&self.handle_generate_handoff(params.0)?)
    }

    #[tool(
        description = "Get the current project state: brief (name, type, phase), last session, next steps, open questions and the number of live records. Call this FIRST when resuming work. Read-only. warning=true means summaries/ has reached 15 records and should be consolidated."
    )]
    async fn report_state(&self) -> Result<CallToolResult, McpError> {
        to_json(&self.handle_report_state()?)
    }

    #[tool(
        description = "Verify the workspace layout: at most one active handoff, no half-written records, every source summary backed by its archived original. Returns PartialWriteDetected naming each problem."
    )]
    async fn check_workspace(&self) -> Result<CallToolResult, McpError> {
        to_json(&self.handle_check_workspace()?)
    }
}

#[tool_handler]
impl ServerHandler for McpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: rmcp::model::Implementation {
                name: "waypoint".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                title: None,
                icons: None,
                website_url: None,
            },
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
            instructions: Some(INSTRUCTIONS.into()),
            ..Default::default()
        }
    }
}

const INSTRUCTIONS: &str = r#"Waypoint keeps project memory on disk so work can resume across sessions without re-reading everything.

LAYOUT:
  summaries/00-project-brief.md             static project context
  summaries/source-<name>.md                one summary per processed document
  summaries/handoff-<YYYY-MM-DD>-<topic>.md the single active session record
  archive/                                  processed originals
  archive/handoffs/                         superseded session records

SESSION WORKFLOW:
1. Call report_state to see the phase, last session, next steps and open questions
2. Read the active handoff and the source summaries you need (not the archived originals)
3. Call process_document for each new raw document
4. Do the work
5. Call generate_handoff with what you did, the exact files produced, and what comes next

MODES:
- light: fewer than 5 sessions so far; essentials only
- full: 5 or more sessions; adds context, cross references and notes
If unsure, pass session_count to generate_handoff and let it decide.

RULES:
- Numbers are copied verbatim. Never round or restate them.
- Every uncertainty is OPEN, ASSUMED or MISSING.
- Nothing in archive/ is ever deleted or overwritten.
- When report_state returns warning=true, consolidate summaries before adding more."#;

pub async fn run_stdio_server(workspace: Workspace) -> anyhow::Result<()> {
    use tokio::io::{stdin, stdout};

    tracing::info!(
        "Starting MCP server via stdio for {}",
        workspace.root().display()
    );

    let service = McpServer::new(workspace);
    let server = service.serve((stdin(), stdout())).await?;

    let quit_reason = server.waiting().await?;
    tracing::info!("MCP server stopped: {:?}", quit_reason);

    Ok(())
}
