//! Run summaries for the terminal.
//!
//! Text output prints the status line of each check followed by the issues
//! behind it, then the KPIs. JSON output carries the same content for tooling.

use crate::pipeline::RunOutput;
use rustbalance_core::DataIntegrityError;
use rustbalance_validate::CheckReport;
use serde::Serialize;
use std::io::Write;

/// An integrity issue in JSON format.
#[derive(Debug, Serialize)]
pub struct JsonIssue {
    /// Severity: "error" or "warning"
    pub severity: String,
    /// Issue code (e.g., "D1001")
    pub code: String,
    /// Issue message
    pub message: String,
    /// Date of the affected transaction
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Optional context information
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl From<&DataIntegrityError> for JsonIssue {
    fn from(issue: &DataIntegrityError) -> Self {
        Self {
            severity: if issue.code.is_warning() {
                "warning"
            } else {
                "error"
            }
            .to_string(),
            code: issue.code.code().to_string(),
            message: issue.message.clone(),
            date: issue.date.map(|d| d.to_string()),
            context: issue.context.clone(),
        }
    }
}

/// One check in JSON format.
#[derive(Debug, Serialize)]
pub struct JsonCheck {
    /// Position in the report
    pub number: u8,
    /// Status line label
    pub label: String,
    /// Whether the check passed
    pub passed: bool,
    /// Extra detail, such as the equation gap
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Issues behind the result
    pub issues: Vec<JsonIssue>,
}

/// One KPI in JSON format.
#[derive(Debug, Serialize)]
pub struct JsonKpi {
    /// Metric label
    pub metric: String,
    /// Value, as a decimal string; absent when undefined
    pub value: Option<String>,
}

/// JSON output structure for a run.
#[derive(Debug, Serialize)]
pub struct JsonOutput {
    /// Check results, in order
    pub checks: Vec<JsonCheck>,
    /// Headline KPIs
    pub kpis: Vec<JsonKpi>,
    /// Output files written
    pub files: Vec<String>,
    /// Total error count
    pub error_count: usize,
    /// Total warning count
    pub warning_count: usize,
}

impl JsonOutput {
    /// Build the JSON summary of `output`.
    #[must_use]
    pub fn new(output: &RunOutput, files: &[std::path::PathBuf]) -> Self {
        let (errors, warnings) = count_issues(&output.checks);
        Self {
            checks: output
                .checks
                .results
                .iter()
                .map(|result| JsonCheck {
                    number: result.check.number(),
                    label: if result.passed {
                        result.check.pass_label()
                    } else {
                        result.check.fail_label()
                    }
                    .to_string(),
                    passed: result.passed,
                    detail: result.detail.clone(),
                    issues: result.issues.iter().map(JsonIssue::from).collect(),
                })
                .collect(),
            kpis: output
                .kpis
                .metrics()
                .into_iter()
                .map(|kpi| JsonKpi {
                    metric: kpi.metric.to_string(),
                    value: kpi.value.map(|v| v.round_dp(4).to_string()),
                })
                .collect(),
            files: files.iter().map(|p| p.display().to_string()).collect(),
            error_count: errors,
            warning_count: warnings,
        }
    }
}

/// Count (errors, warnings) across every check.
#[must_use]
pub fn count_issues(report: &CheckReport) -> (usize, usize) {
    report.issues().fold((0, 0), |(errors, warnings), issue| {
        if issue.code.is_warning() {
            (errors, warnings + 1)
        } else {
            (errors + 1, warnings)
        }
    })
}

/// Print every check with its issues.
pub fn report_checks<W: Write>(report: &CheckReport, writer: &mut W) -> std::io::Result<()> {
    for result in &report.results {
        writeln!(writer, "{}", result.status_line())?;
        if let Some(detail) = &result.detail {
            writeln!(writer, "    {detail}")?;
        }
        for issue in &result.issues {
            let severity = if issue.code.is_warning() {
                "warning"
            } else {
                "error"
            };
            match issue.date {
                Some(date) => writeln!(
                    writer,
                    "    {severity}[{}]: {} ({date})",
                    issue.code, issue.message
                )?,
                None => writeln!(writer, "    {severity}[{}]: {}", issue.code, issue.message)?,
            }
            if let Some(ctx) = &issue.context {
                writeln!(writer, "      context: {ctx}")?;
            }
        }
    }
    Ok(())
}

/// Print the KPIs, one per line.
pub fn report_kpis<W: Write>(output: &RunOutput, writer: &mut W) -> std::io::Result<()> {
    for kpi in output.kpis.metrics() {
        writeln!(writer, "{kpi}")?;
    }
    Ok(())
}

/// Print a summary of errors and warnings.
pub fn print_summary<W: Write>(
    errors: usize,
    warnings: usize,
    writer: &mut W,
) -> std::io::Result<()> {
    if errors == 0 && warnings == 0 {
        writeln!(writer, "\x1b[32m\u{2713}\x1b[0m No integrity issues found")?;
    } else {
        let error_text = if errors == 1 { "error" } else { "errors" };
        let warning_text = if warnings == 1 { "warning" } else { "warnings" };

        if errors > 0 && warnings > 0 {
            writeln!(
                writer,
                "\x1b[31m\u{2717}\x1b[0m {errors} {error_text}, {warnings} {warning_text}"
            )?;
        } else if errors > 0 {
            writeln!(writer, "\x1b[31m\u{2717}\x1b[0m {errors} {error_text}")?;
        } else {
            writeln!(writer, "\x1b[33m\u{26A0}\x1b[0m {warnings} {warning_text}")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustbalance_core::IntegrityCode;
    use rustbalance_validate::{Check, CheckResult};

    fn report() -> CheckReport {
        CheckReport {
            results: vec![
                CheckResult {
                    check: Check::AccountingEquation,
                    passed: true,
                    issues: Vec::new(),
                    detail: None,
                },
                CheckResult {
                    check: Check::ReferentialIntegrity,
                    passed: false,
                    issues: vec![DataIntegrityError::new(
                        IntegrityCode::UnresolvedAccount,
                        "unknown account Misc",
                    )
                    .with_context("Coffee")],
                    detail: None,
                },
                CheckResult {
                    check: Check::LotIntegrity,
                    passed: true,
                    issues: vec![DataIntegrityError::new(
                        IntegrityCode::AmbiguousValuation,
                        "both overwrite and fallback set",
                    )],
                    detail: None,
                },
            ],
        }
    }

    #[test]
    fn test_count_issues() {
        assert_eq!(count_issues(&report()), (1, 1));
    }

    #[test]
    fn test_report_checks_text() {
        let mut out = Vec::new();
        report_checks(&report(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("(1) \u{2713} Accounting Equation Preserved"));
        assert!(text.contains("(3) \u{2717} Non-standard account names detected"));
        assert!(text.contains("error[D1001]: unknown account Misc"));
        assert!(text.contains("context: Coffee"));
        assert!(text.contains("warning[D4001]"));
    }

    #[test]
    fn test_json_issue_severity() {
        let issue = DataIntegrityError::new(IntegrityCode::AmbiguousValuation, "x");
        let json = serde_json::to_value(JsonIssue::from(&issue)).unwrap();
        assert_eq!(json["severity"], "warning");
        assert_eq!(json["code"], "D4001");
        assert!(json.get("date").is_none());
    }

    #[test]
    fn test_print_summary() {
        let mut out = Vec::new();
        print_summary(0, 0, &mut out).unwrap();
        assert!(String::from_utf8(out).unwrap().contains("No integrity issues found"));

        let mut out = Vec::new();
        print_summary(2, 1, &mut out).unwrap();
        assert!(String::from_utf8(out).unwrap().contains("2 errors, 1 warning"));
    }
}
