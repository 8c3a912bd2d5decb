use std::fs;

use chrono::NaiveDate;
use speculate2::speculate;
use waypoint::config::Config;
use waypoint::models::*;
use waypoint::Workspace;

fn facts(date: &str, topic: &str) -> SessionFacts {
    SessionFacts {
        date: NaiveDate::parse_from_str(date, DATE_FORMAT).expect("valid date"),
        topic: topic.to_string(),
        accomplishments: vec![Accomplishment {
            description: "Mapped the login flow".to_string(),
            outputs: vec!["docs/auth.md".to_string()],
        }],
        numeric_facts: vec!["tokens expire after 15 minutes".to_string()],
        conditional_logic: vec!["IF refresh fails THEN force re-login".to_string()],
        next_steps: vec!["implement token refresh".to_string()],
        open_questions: vec![],
        notes: Some("Refresh rotation still undecided.".to_string()),
        session_count: None,
    }
}

fn handoff_names(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .expect("readable dir")
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| n.starts_with("handoff-"))
        .collect();
    names.sort();
    names
}

speculate! {
    before {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let ws = Workspace::open(Config::new(dir.path()));
        let summaries = dir.path().join("summaries");
        let archived = dir.path().join("archive/handoffs");
    }

    describe "generate_handoff" {
        it "writes the first record as the only active one" {
            let outcome = ws.generate_handoff(facts("2024-03-01", "auth flow"), Some(Mode::Light))
                .expect("Failed to write handoff");

            assert_eq!(outcome.record_path, summaries.join("handoff-2024-03-01-auth-flow.md"));
            assert!(outcome.archived_previous.is_none());
            assert_eq!(handoff_names(&summaries), vec!["handoff-2024-03-01-auth-flow.md"]);
            assert!(handoff_names(&archived).is_empty());
        }

        it "moves the previous record to the archive on the next write" {
            ws.generate_handoff(facts("2024-03-01", "auth flow"), Some(Mode::Light)).unwrap();
            let outcome = ws.generate_handoff(facts("2024-03-02", "token refresh"), Some(Mode::Light))
                .expect("Failed to write handoff");

            assert_eq!(
                outcome.archived_previous,
                Some(archived.join("handoff-2024-03-01-auth-flow.md"))
            );
            assert_eq!(handoff_names(&summaries), vec!["handoff-2024-03-02-token-refresh.md"]);
            assert_eq!(handoff_names(&archived), vec!["handoff-2024-03-01-auth-flow.md"]);
        }

        it "keeps exactly one active record after many writes" {
            for day in 1..=6 {
                let date = format!("2024-03-{:02}", day);
                ws.generate_handoff(facts(&date, "daily"), Some(Mode::Full)).unwrap();
            }

            assert_eq!(handoff_names(&summaries), vec!["handoff-2024-03-06-daily.md"]);
            assert_eq!(handoff_names(&archived).len(), 5);
            ws.check().expect("Workspace should be consistent");
        }

        it "archives records byte for byte" {
            let first = ws.generate_handoff(facts("2024-03-01", "auth"), Some(Mode::Full)).unwrap();
            let original = fs::read_to_string(&first.record_path).unwrap();
            ws.generate_handoff(facts("2024-03-02", "auth"), Some(Mode::Full)).unwrap();

            let archived_copy = fs::read_to_string(archived.join("handoff-2024-03-01-auth.md")).unwrap();
            assert_eq!(archived_copy, original);
        }

        it "derives the mode from the session count" {
            let mut light = facts("2024-03-01", "early");
            light.session_count = Some(1);
            let outcome = ws.generate_handoff(light, None).unwrap();
            let text = fs::read_to_string(&outcome.record_path).unwrap();
            assert!(text.contains("<!-- waypoint:handoff:light -->"));
            assert!(!text.contains("## Notes"));

            let mut full = facts("2024-03-02", "later");
            full.session_count = Some(7);
            let outcome = ws.generate_handoff(full, None).unwrap();
            let text = fs::read_to_string(&outcome.record_path).unwrap();
            assert!(text.contains("<!-- waypoint:handoff:full -->"));
            assert!(text.contains("Refresh rotation still undecided."));
        }

        it "round-trips accomplishments with their outputs" {
            let outcome = ws.generate_handoff(facts("2024-03-01", "auth"), Some(Mode::Light)).unwrap();
            let record = ws.read_handoff(&outcome.record_path).unwrap();

            assert_eq!(record.accomplishments[0].outputs, vec!["docs/auth.md"]);
            assert_eq!(record.next_steps, vec!["implement token refresh"]);
            assert_eq!(record.numeric_facts, vec!["tokens expire after 15 minutes"]);
        }

        it "fails with AmbiguousMode and writes nothing" {
            let err = ws.generate_handoff(facts("2024-03-01", "auth"), None).unwrap_err();

            assert_eq!(err.kind(), "AmbiguousMode");
            assert!(!summaries.exists() || handoff_names(&summaries).is_empty());
        }

        it "rejects a topic with no usable characters" {
            let err = ws.generate_handoff(facts("2024-03-01", "???"), Some(Mode::Light)).unwrap_err();
            assert_eq!(err.kind(), "SchemaMismatch");
            assert!(!summaries.exists());
            assert!(!archived.exists());
        }

        it "refuses to write when two records are already active" {
            ws.generate_handoff(facts("2024-03-01", "auth"), Some(Mode::Light)).unwrap();
            fs::copy(
                summaries.join("handoff-2024-03-01-auth.md"),
                summaries.join("handoff-2024-03-02-auth.md"),
            ).unwrap();

            let err = ws.generate_handoff(facts("2024-03-03", "auth"), Some(Mode::Light)).unwrap_err();

            assert_eq!(err.kind(), "PartialWriteDetected");
            assert!(handoff_names(&archived).is_empty());
        }

        it "does not overwrite a different archived record with the same name" {
            ws.generate_handoff(facts("2024-03-01", "auth"), Some(Mode::Light)).unwrap();
            fs::write(archived.join("handoff-2024-03-01-auth.md"), "older, different content").unwrap();

            let err = ws.generate_handoff(facts("2024-03-02", "auth"), Some(Mode::Light)).unwrap_err();

            assert_eq!(err.kind(), "Conflict");
            assert_eq!(handoff_names(&summaries), vec!["handoff-2024-03-01-auth.md"]);
            assert_eq!(
                fs::read_to_string(archived.join("handoff-2024-03-01-auth.md")).unwrap(),
                "older, different content"
            );
        }
    }

    describe "crash recovery" {
        it "completes a move interrupted after the archive copy" {
            ws.generate_handoff(facts("2024-03-01", "auth"), Some(Mode::Light)).unwrap();
            fs::copy(
                summaries.join("handoff-2024-03-01-auth.md"),
                archived.join("handoff-2024-03-01-auth.md"),
            ).unwrap();

            ws.generate_handoff(facts("2024-03-02", "auth"), Some(Mode::Light))
                .expect("Duplicate copy should be reconciled");

            assert_eq!(handoff_names(&summaries), vec!["handoff-2024-03-02-auth.md"]);
            assert_eq!(handoff_names(&archived), vec!["handoff-2024-03-01-auth.md"]);
        }

        it "keeps the previous record active when a write stops before commit" {
            ws.generate_handoff(facts("2024-03-01", "auth"), Some(Mode::Light)).unwrap();
            let old = summaries.join("handoff-2024-03-01-auth.md");
            fs::copy(&old, archived.join("handoff-2024-03-01-auth.md")).unwrap();
            fs::write(summaries.join(".handoff-2024-03-02-auth.md.interrupted.tmp"), "# Handoff").unwrap();

            assert_eq!(ws.check().unwrap_err().kind(), "PartialWriteDetected");
            assert_eq!(ws.discard_staged().unwrap().len(), 1);

            ws.check().expect("Workspace should be consistent after discarding");
            assert_eq!(ws.active_handoff().unwrap(), Some(old));
        }

        it "treats a record left behind after commit as already rotated" {
            ws.generate_handoff(facts("2024-03-01", "auth"), Some(Mode::Light)).unwrap();
            ws.generate_handoff(facts("2024-03-02", "tokens"), Some(Mode::Light)).unwrap();
            fs::copy(
                archived.join("handoff-2024-03-01-auth.md"),
                summaries.join("handoff-2024-03-01-auth.md"),
            ).unwrap();

            ws.check().expect("A finished rotation is not a partial write");
            assert_eq!(
                ws.active_handoff().unwrap(),
                Some(summaries.join("handoff-2024-03-02-tokens.md"))
            );
            assert_eq!(ws.superseded_handoffs().unwrap(), vec![summaries.join("handoff-2024-03-01-auth.md")]);

            ws.generate_handoff(facts("2024-03-03", "cli"), Some(Mode::Light)).unwrap();
            assert_eq!(handoff_names(&summaries), vec!["handoff-2024-03-03-cli.md"]);
            assert_eq!(
                handoff_names(&archived),
                vec!["handoff-2024-03-01-auth.md", "handoff-2024-03-02-tokens.md"]
            );
        }
    }

    describe "handoffs" {
        it "lists archived records before the active one" {
            ws.generate_handoff(facts("2024-03-01", "auth"), Some(Mode::Light)).unwrap();
            ws.generate_handoff(facts("2024-03-02", "tokens"), Some(Mode::Light)).unwrap();
            ws.generate_handoff(facts("2024-03-03", "cli"), Some(Mode::Light)).unwrap();

            let states: Vec<HandoffState> = ws.handoffs().unwrap().iter().map(|e| e.state).collect();
            assert_eq!(
                states,
                vec![HandoffState::Archived, HandoffState::Archived, HandoffState::Active]
            );
        }
    }
}
