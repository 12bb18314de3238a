//! JUnit report rendering and the console summary.
use crate::runner::{Report, TestOutcome, TestResult};
use crate::util::write_atomic;
use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::path::Path;

pub const SUITE_NAME: &str = "Rewrite rules tests";
const FAILURE_MESSAGE: &str = "Redirect test failed";
const ERROR_MESSAGE: &str = "Evaluator invocation failed";

pub fn render_junit(report: &Report) -> String {
    let failures = report
        .results
        .iter()
        .filter(|result| matches!(result.outcome, TestOutcome::Mismatch { .. }))
        .count();
    let errors = report
        .results
        .iter()
        .filter(|result| matches!(result.outcome, TestOutcome::Errored { .. }))
        .count();

    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<testsuites>\n");
    let _ = writeln!(
        xml,
        "\t<testsuite name=\"{}\" tests=\"{}\" failures=\"{}\" errors=\"{}\" skipped=\"0\">",
        escape_xml(SUITE_NAME),
        report.total(),
        failures,
        errors
    );
    for result in &report.results {
        render_test_case(&mut xml, result);
    }
    xml.push_str("\t</testsuite>\n</testsuites>\n");
    xml
}

fn render_test_case(xml: &mut String, result: &TestResult) {
    let open = format!(
        "\t\t<testcase name=\"{}\" classname=\"{}\"",
        escape_xml(&result.name),
        escape_xml(&result.event_url)
    );
    match &result.outcome {
        TestOutcome::Passed => {
            let _ = writeln!(xml, "{open}/>");
        }
        TestOutcome::Mismatch {
            mismatches,
            observed,
        } => {
            let mut detail = String::new();
            for mismatch in mismatches {
                let _ = writeln!(
                    detail,
                    "{} {:?} does not match expected {:?}",
                    mismatch.field, mismatch.observed, mismatch.expected
                );
            }
            let observed = serde_json::to_string(observed).unwrap_or_default();
            let _ = write!(detail, "observed: {observed}");
            let _ = writeln!(xml, "{open}>");
            let _ = writeln!(
                xml,
                "\t\t\t<failure type=\"failure\" message=\"{}\">{}</failure>",
                FAILURE_MESSAGE,
                escape_xml(&detail)
            );
            xml.push_str("\t\t</testcase>\n");
        }
        TestOutcome::Errored { error } => {
            let _ = writeln!(xml, "{open}>");
            let _ = writeln!(
                xml,
                "\t\t\t<error type=\"error\" message=\"{}\">{}</error>",
                ERROR_MESSAGE,
                escape_xml(error)
            );
            xml.push_str("\t\t</testcase>\n");
        }
    }
}

/// Write the report, replacing any earlier one.
pub fn write_junit(path: &Path, report: &Report) -> Result<()> {
    write_atomic(path, render_junit(report).as_bytes())
        .with_context(|| format!("write report {}", path.display()))
}

pub fn summary_lines(report: &Report) -> Vec<String> {
    let mut lines = vec![format!(
        "Tests passed: {}/{} tests",
        report.passed_count(),
        report.total()
    )];
    let failed = report.failed_names();
    if !failed.is_empty() {
        lines.push("The following tests failed:".to_string());
        lines.extend(failed.iter().map(|name| format!("  {name}")));
    }
    lines
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' | '\n' | '\r' => out.push(ch),
            ch if (ch as u32) < 0x20 => {}
            ch => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::ResponseDescriptor;
    use crate::runner::FieldMismatch;

    fn sample_report() -> Report {
        Report {
            results: vec![
                TestResult {
                    name: "a.example^/ok$".to_string(),
                    event_url: "a.example/ok".to_string(),
                    outcome: TestOutcome::Passed,
                },
                TestResult {
                    name: "b.example^/q?a=1&b=<2>$".to_string(),
                    event_url: "b.example/q".to_string(),
                    outcome: TestOutcome::Mismatch {
                        mismatches: vec![FieldMismatch {
                            field: "status",
                            expected: "301".to_string(),
                            observed: "302".to_string(),
                        }],
                        observed: ResponseDescriptor::redirect(302, "/x"),
                    },
                },
                TestResult {
                    name: "c.example^/down$".to_string(),
                    event_url: "c.example/down".to_string(),
                    outcome: TestOutcome::Errored {
                        error: "evaluator timed out after 1s".to_string(),
                    },
                },
            ],
        }
    }

    #[test]
    fn junit_counts_failures_and_errors_separately() {
        let xml = render_junit(&sample_report());
        assert!(xml.contains(
            "<testsuite name=\"Rewrite rules tests\" tests=\"3\" failures=\"1\" errors=\"1\" skipped=\"0\">"
        ));
        assert!(xml.contains("<testcase name=\"a.example^/ok$\" classname=\"a.example/ok\"/>"));
        assert!(xml.contains("message=\"Redirect test failed\""));
        assert!(xml.contains("message=\"Evaluator invocation failed\">evaluator timed out after 1s</error>"));
    }

    #[test]
    fn junit_escapes_names_and_detail() {
        let xml = render_junit(&sample_report());
        assert!(xml.contains("name=\"b.example^/q?a=1&amp;b=&lt;2&gt;$\""));
        assert!(xml.contains("status &quot;302&quot; does not match expected &quot;301&quot;"));
        assert!(!xml.contains("<2>"));
    }

    #[test]
    fn write_junit_replaces_previous_report() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("temp_results").join("tests.xml");
        std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        std::fs::write(&path, "stale").expect("seed");
        write_junit(&path, &Report::default()).expect("write");
        let written = std::fs::read_to_string(&path).expect("read");
        assert!(written.contains("tests=\"0\""));
        assert!(!written.contains("stale"));
    }

    #[test]
    fn summary_lists_failures() {
        let lines = summary_lines(&sample_report());
        assert_eq!(lines[0], "Tests passed: 1/3 tests");
        assert_eq!(lines[1], "The following tests failed:");
        assert_eq!(lines[2], "  b.example^/q?a=1&b=<2>$");
        assert_eq!(lines[3], "  c.example^/down$");
    }
}
