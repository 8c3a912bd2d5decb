use std::fs;

use chrono::NaiveDate;
use speculate2::speculate;
use waypoint::config::Config;
use waypoint::models::*;
use waypoint::report::render_report;
use waypoint::Workspace;

fn brief() -> ProjectBrief {
    ProjectBrief {
        name: "tokenctl".to_string(),
        project_type: "CLI tool".to_string(),
        phase: "design".to_string(),
        phases: vec![],
        description: None,
    }
}

fn auth_flow_session() -> SessionFacts {
    SessionFacts {
        date: NaiveDate::from_ymd_opt(2024, 3, 1).expect("valid date"),
        topic: "auth-flow".to_string(),
        accomplishments: vec![],
        numeric_facts: vec![],
        conditional_logic: vec![],
        next_steps: vec!["implement token refresh".to_string()],
        open_questions: vec![],
        notes: None,
        session_count: None,
    }
}

/// Pad `summaries/` with extra records until it holds `total` files.
fn fill_summaries(ws: &Workspace, total: usize) {
    let existing = ws.summary_files().expect("listable").len();
    for i in existing..total {
        fs::write(ws.summaries_dir().join(format!("note-{:02}.md", i)), "# Note\n").unwrap();
    }
}

speculate! {
    before {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let ws = Workspace::open(Config::new(dir.path()));
    }

    describe "report_state" {
        it "fails with NotFound when there is no brief" {
            let err = ws.report_state().unwrap_err();
            assert_eq!(err.kind(), "NotFound");
        }

        it "reports the brief with empty session fields before any handoff" {
            ws.init(&brief()).unwrap();

            let report = ws.report_state().expect("Failed to report");

            assert_eq!(report.project, "tokenctl");
            assert!(report.last_session.is_none());
            assert!(report.next_steps.is_empty());
            assert_eq!(report.file_count, 1);
        }

        it "returns the brief and active handoff verbatim" {
            ws.init(&brief()).unwrap();
            ws.generate_handoff(auth_flow_session(), Some(Mode::Light)).unwrap();

            let report = ws.report_state().expect("Failed to report");

            assert_eq!(report.project_type, "CLI tool");
            assert_eq!(report.phase, "design");
            let session = report.last_session.expect("Expected last session");
            assert_eq!(session.date, "2024-03-01");
            assert_eq!(session.topic, "auth-flow");
            assert_eq!(report.next_steps, vec!["implement token refresh"]);
            assert_eq!(report.open_questions, Vec::<String>::new());
        }

        it "is idempotent" {
            ws.init(&brief()).unwrap();
            ws.generate_handoff(auth_flow_session(), Some(Mode::Light)).unwrap();

            let first = ws.report_state().unwrap();
            let second = ws.report_state().unwrap();
            assert_eq!(first, second);
        }

        it "does not warn below the soft cap" {
            ws.init(&brief()).unwrap();
            fill_summaries(&ws, 14);

            let report = ws.report_state().unwrap();
            assert_eq!(report.file_count, 14);
            assert!(!report.warning);
        }

        it "warns at the soft cap" {
            ws.init(&brief()).unwrap();
            fill_summaries(&ws, 15);

            let report = ws.report_state().unwrap();
            assert_eq!(report.file_count, 15);
            assert!(report.warning);
        }

        it "warns above the soft cap" {
            ws.init(&brief()).unwrap();
            fill_summaries(&ws, 16);

            let report = ws.report_state().unwrap();
            assert_eq!(report.file_count, 16);
            assert!(report.warning);
        }

        it "ignores hidden and non-markdown files in the census" {
            ws.init(&brief()).unwrap();
            fs::write(ws.summaries_dir().join(".scratch.md"), "x").unwrap();
            fs::write(ws.summaries_dir().join("notes.txt"), "x").unwrap();

            assert_eq!(ws.report_state().unwrap().file_count, 1);
        }

        it "fails with PartialWriteDetected when two handoffs are active" {
            ws.init(&brief()).unwrap();
            ws.generate_handoff(auth_flow_session(), Some(Mode::Light)).unwrap();
            fs::copy(
                ws.summaries_dir().join("handoff-2024-03-01-auth-flow.md"),
                ws.summaries_dir().join("handoff-2024-03-02-auth-flow.md"),
            ).unwrap();

            assert_eq!(ws.report_state().unwrap_err().kind(), "PartialWriteDetected");
        }
    }

    describe "render_report" {
        it "shows the last session and next steps" {
            ws.init(&brief()).unwrap();
            ws.generate_handoff(auth_flow_session(), Some(Mode::Light)).unwrap();

            let text = render_report(&ws.report_state().unwrap());

            assert!(text.starts_with("tokenctl (CLI tool), phase: design\n"));
            assert!(text.contains("Last session: 2024-03-01 auth-flow"));
            assert!(text.contains("implement token refresh"));
        }
    }
}
