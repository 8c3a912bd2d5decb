use std::fs;
use std::path::Path;

use speculate2::speculate;
use waypoint::config::Config;
use waypoint::extract::{Extraction, Extractor, RawUncertainty, SourceDocument};
use waypoint::models::*;
use waypoint::Workspace;

const SESSION_NOTES: &str = "# Session API
Notes from the kickoff call about the session service.

- If the user is idle for 30 minutes, the session must expire, except during maintenance.
- We chose Redis instead of Memcached because it supports persistence.
- Who owns the signing key?
- Assume all timestamps are UTC.
- The SLA appendix is not attached.
- See [design](design.md) for the data model.
";

/// Extractor returning a fixed result, for exercising validation.
struct Canned(Extraction);

impl Extractor for Canned {
    fn extract(&self, _document: &SourceDocument) -> waypoint::Result<Extraction> {
        Ok(self.0.clone())
    }
}

fn write_doc(root: &Path, name: &str, text: &str) -> std::path::PathBuf {
    let path = root.join(name);
    fs::write(&path, text).unwrap();
    path
}

speculate! {
    before {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let ws = Workspace::open(Config::new(dir.path()));
    }

    describe "process_document" {
        it "keeps numeric literals verbatim" {
            let doc = write_doc(dir.path(), "limits.md", "The rate limit is 1000 requests/minute.\n");

            let outcome = ws.process_document(&doc, Mode::Light).expect("Failed to process");

            let summary = fs::read_to_string(&outcome.summary_path).unwrap();
            assert!(summary.contains("1000 requests/minute"));
            assert!(summary.contains("## Numeric Facts\n- 1000 requests/minute\n"));
        }

        it "writes literals with their original whitespace" {
            let doc = write_doc(
                dir.path(),
                "limits.md",
                "The rate limit is 1000\u{a0}requests/minute.\nThe burst must be 50\trequests.\n",
            );

            let outcome = ws.process_document(&doc, Mode::Light).expect("Failed to process");

            let summary = fs::read_to_string(&outcome.summary_path).unwrap();
            assert!(summary.contains("- 1000\u{a0}requests/minute\n"));
            assert!(summary.contains("- 50\trequests\n"));
            assert!(!summary.contains("1000 requests/minute"));
        }

        it "accepts units written in other scripts" {
            let doc = write_doc(dir.path(), "uploads.md", "Uploads must be under 5кг.\n");

            let outcome = ws.process_document(&doc, Mode::Light).expect("Failed to process");

            let summary = fs::read_to_string(&outcome.summary_path).unwrap();
            assert!(summary.contains("## Numeric Facts\n- 5кг\n"));
        }

        it "lists only real quantities as numeric facts" {
            let doc = write_doc(
                dir.path(),
                "api.md",
                "OAuth2 must be used for login.\nThe API allows 1000 requests per minute.\n",
            );

            let outcome = ws.process_document(&doc, Mode::Light).expect("Failed to process");

            let summary = fs::read_to_string(&outcome.summary_path).unwrap();
            assert!(summary.contains("## Numeric Facts\n- 1000 requests per minute\n\n"));
            assert!(!summary.contains("- 2 must"));
        }

        it "moves the original into the archive and records where" {
            let doc = write_doc(dir.path(), "limits.md", "The rate limit is 1000 requests/minute.\n");

            let outcome = ws.process_document(&doc, Mode::Light).unwrap();

            assert!(!doc.exists());
            assert_eq!(outcome.archived_source, dir.path().join("archive/limits.md"));
            assert_eq!(
                fs::read_to_string(&outcome.archived_source).unwrap(),
                "The rate limit is 1000 requests/minute.\n"
            );
            let summary = fs::read_to_string(&outcome.summary_path).unwrap();
            assert!(summary.contains("## Source\narchive/limits.md\n"));
            ws.check().expect("Workspace should be consistent");
        }

        it "normalizes requirements, decisions and uncertainties" {
            let doc = write_doc(dir.path(), "session-notes.md", SESSION_NOTES);

            let outcome = ws.process_document(&doc, Mode::Light).unwrap();
            let summary = fs::read_to_string(&outcome.summary_path).unwrap();

            assert_eq!(outcome.summary_path, dir.path().join("summaries/source-session-notes.md"));
            assert!(summary.contains(
                "- IF the user is idle for 30 minutes THEN the session must expire EXCEPT during maintenance"
            ));
            assert!(summary.contains(
                "- We chose Redis | WHY: it supports persistence | REJECTED: Memcached"
            ));
            assert!(summary.contains("- [OPEN] Who owns the signing key?"));
            assert!(summary.contains("- [ASSUMED] Assume all timestamps are UTC."));
            assert!(summary.contains("- [MISSING] The SLA appendix is not attached."));
            assert!(!summary.contains("## Context"));
        }

        it "adds context and cross references in full mode" {
            let doc = write_doc(dir.path(), "session-notes.md", SESSION_NOTES);

            let outcome = ws.process_document(&doc, Mode::Full).unwrap();
            let summary = fs::read_to_string(&outcome.summary_path).unwrap();

            assert!(summary.contains("<!-- waypoint:source:full -->"));
            assert!(summary.contains("## Context\nNotes from the kickoff call about the session service.\n"));
            assert!(summary.contains("## Cross References\n- design.md\n"));
        }

        it "fails with NotFound for a missing document" {
            let err = ws.process_document(dir.path().join("nope.md"), Mode::Light).unwrap_err();
            assert_eq!(err.kind(), "NotFound");
        }

        it "refuses to overwrite a different archived document" {
            let doc = write_doc(dir.path(), "limits.md", "The rate limit is 1000 requests/minute.\n");
            fs::create_dir_all(dir.path().join("archive")).unwrap();
            fs::write(dir.path().join("archive/limits.md"), "an older limits file").unwrap();

            let err = ws.process_document(&doc, Mode::Light).unwrap_err();

            assert_eq!(err.kind(), "Conflict");
            assert!(doc.exists());
            assert!(!dir.path().join("summaries/source-limits.md").exists());
            assert_eq!(
                fs::read_to_string(dir.path().join("archive/limits.md")).unwrap(),
                "an older limits file"
            );
        }

        it "refuses to reprocess a managed record" {
            let doc = write_doc(dir.path(), "limits.md", "The rate limit is 1000 requests/minute.\n");
            let outcome = ws.process_document(&doc, Mode::Light).unwrap();

            let err = ws.process_document(&outcome.summary_path, Mode::Light).unwrap_err();
            assert_eq!(err.kind(), "SchemaMismatch");
        }
    }

    describe "extraction validation" {
        it "rejects a rounded number and leaves the source in place" {
            let doc = write_doc(dir.path(), "cache.md", "The cache holds 1,024 entries.\n");
            let extractor = Canned(Extraction {
                title: "Cache".to_string(),
                requirements: vec![Requirement::unconditional("The cache holds 1000 entries")],
                ..Default::default()
            });

            let err = ws.process_document_with(&extractor, &doc, Mode::Light).unwrap_err();

            assert_eq!(err.kind(), "InvalidExtraction");
            assert!(doc.exists());
            assert!(ws.source_summaries().unwrap().is_empty());
            assert!(!dir.path().join("summaries").exists());
            assert!(!dir.path().join("archive").exists());
            ws.check().expect("No staged leftovers");
        }

        it "rejects an unclassified uncertainty instead of defaulting it" {
            let doc = write_doc(dir.path(), "certs.md", "Who renews the certificate?\n");
            let extractor = Canned(Extraction {
                title: "Certs".to_string(),
                uncertainties: vec![RawUncertainty {
                    item: "Who renews the certificate?".to_string(),
                    kind: None,
                }],
                ..Default::default()
            });

            let err = ws.process_document_with(&extractor, &doc, Mode::Light).unwrap_err();

            assert_eq!(err.kind(), "InvalidExtraction");
            assert!(doc.exists());
        }

        it "rejects a requirement without a THEN clause" {
            let doc = write_doc(dir.path(), "auth.md", "If the token expires.\n");
            let extractor = Canned(Extraction {
                title: "Auth".to_string(),
                requirements: vec![Requirement {
                    condition: Some("the token expires".to_string()),
                    outcome: String::new(),
                    caveat: None,
                    exception: None,
                }],
                ..Default::default()
            });

            let err = ws.process_document_with(&extractor, &doc, Mode::Light).unwrap_err();
            assert_eq!(err.kind(), "InvalidExtraction");
        }
    }
}
