//! Consistency checks for a rustbalance run.
//!
//! The checks are advisory: each reports pass or fail with the integrity
//! issues behind a failure, and the run's outputs are produced either way.
//!
//! | # | Check | Fails when |
//! |---|-------|------------|
//! | 1 | Accounting equation | `|A - (L + E)|` reaches the tolerance |
//! | 2 | Chronology | a close date precedes its initiation date |
//! | 3 | Referential integrity | an impact has no account id, or a category tag has no group |
//! | 4 | Lot accounting | a sale, cost basis or depreciation schedule could not be computed |
//!
//! Warnings (such as ambiguous valuations) are listed under their check but
//! never fail it.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use rust_decimal::Decimal;
use rustbalance_core::{DataIntegrityError, IntegrityCode, Transaction};
use rustbalance_report::BalanceSheet;
use std::fmt;

/// The consistency checks, in reporting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Check {
    /// Assets equal liabilities plus equity.
    AccountingEquation,
    /// Close dates never precede initiation dates.
    Chronology,
    /// Every account and category tag resolves.
    ReferentialIntegrity,
    /// Lot accounting and depreciation completed for every row.
    LotIntegrity,
}

impl Check {
    /// Position in the report, starting at 1.
    #[must_use]
    pub const fn number(self) -> u8 {
        match self {
            Self::AccountingEquation => 1,
            Self::Chronology => 2,
            Self::ReferentialIntegrity => 3,
            Self::LotIntegrity => 4,
        }
    }

    /// Status line when the check passes.
    #[must_use]
    pub const fn pass_label(self) -> &'static str {
        match self {
            Self::AccountingEquation => "Accounting Equation Preserved",
            Self::Chronology => "Dates Are Chronological",
            Self::ReferentialIntegrity => "Account names are standardized",
            Self::LotIntegrity => "Lot accounting is complete",
        }
    }

    /// Status line when the check fails.
    #[must_use]
    pub const fn fail_label(self) -> &'static str {
        match self {
            Self::AccountingEquation => "Accounting Equation Violated",
            Self::Chronology => "Non-chronological dates detected",
            Self::ReferentialIntegrity => "Non-standard account names detected",
            Self::LotIntegrity => "Lot accounting issues detected",
        }
    }

    /// Integrity codes reported under this check.
    #[must_use]
    pub const fn owns(self, code: IntegrityCode) -> bool {
        match self {
            Self::AccountingEquation => false,
            Self::Chronology => matches!(code, IntegrityCode::NonChronological),
            Self::ReferentialIntegrity => matches!(
                code,
                IntegrityCode::UnresolvedAccount | IntegrityCode::UnresolvedCategory
            ),
            Self::LotIntegrity => matches!(
                code,
                IntegrityCode::ZeroQuantityBasis
                    | IntegrityCode::MissingQuantity
                    | IntegrityCode::InvalidLifetime
                    | IntegrityCode::AmbiguousValuation
            ),
        }
    }
}

/// Outcome of one check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    /// Which check.
    pub check: Check,
    /// Whether it passed.
    pub passed: bool,
    /// Issues behind a failure, plus any warnings.
    pub issues: Vec<DataIntegrityError>,
    /// Extra detail, such as the equation gap.
    pub detail: Option<String>,
}

impl CheckResult {
    fn from_issues(check: Check, issues: Vec<DataIntegrityError>) -> Self {
        let passed = issues.iter().all(|issue| issue.code.is_warning());
        Self {
            check,
            passed,
            issues,
            detail: None,
        }
    }

    /// Status line, e.g. `(1) ✓ Accounting Equation Preserved`.
    #[must_use]
    pub fn status_line(&self) -> String {
        if self.passed {
            format!("({}) \u{2713} {}", self.check.number(), self.check.pass_label())
        } else {
            format!("({}) \u{2717} {}", self.check.number(), self.check.fail_label())
        }
    }
}

impl fmt::Display for CheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.status_line())
    }
}

/// Results of every check, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckReport {
    /// One result per check.
    pub results: Vec<CheckResult>,
}

impl CheckReport {
    /// Result of `check`.
    #[must_use]
    pub fn get(&self, check: Check) -> Option<&CheckResult> {
        self.results.iter().find(|result| result.check == check)
    }

    /// Whether every check passed.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.results.iter().all(|result| result.passed)
    }

    /// Whether the accounting equation holds.
    #[must_use]
    pub fn equation_holds(&self) -> bool {
        self.get(Check::AccountingEquation)
            .is_some_and(|result| result.passed)
    }

    /// Number of failed checks.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.results.iter().filter(|result| !result.passed).count()
    }

    /// Every issue across all checks.
    pub fn issues(&self) -> impl Iterator<Item = &DataIntegrityError> {
        self.results.iter().flat_map(|result| result.issues.iter())
    }
}

/// What the checks look at.
#[derive(Debug, Clone, Copy)]
pub struct CheckInput<'a> {
    /// The rolled-up balance sheet.
    pub sheet: &'a BalanceSheet,
    /// Normalized transactions.
    pub transactions: &'a [Transaction],
    /// Issues raised by earlier stages.
    pub issues: &'a [DataIntegrityError],
}

/// Run every check.
#[must_use]
pub fn check(input: &CheckInput<'_>, tolerance: Decimal) -> CheckReport {
    let report = CheckReport {
        results: vec![
            check_equation(input.sheet, tolerance),
            check_chronology(input.transactions),
            check_references(input.transactions, input.issues),
            check_lots(input.issues),
        ],
    };

    for result in &report.results {
        if result.passed {
            tracing::debug!("{}", result.status_line());
        } else {
            tracing::warn!("{} ({} issues)", result.status_line(), result.issues.len());
        }
    }
    report
}

/// `|A - (L + E)| < tolerance` at market value.
#[must_use]
pub fn check_equation(sheet: &BalanceSheet, tolerance: Decimal) -> CheckResult {
    let gap = sheet.equation_gap();
    CheckResult {
        check: Check::AccountingEquation,
        passed: gap.abs() < tolerance,
        issues: Vec::new(),
        detail: Some(format!("A - (L + E) = {}", gap.round_dp(2))),
    }
}

/// Every close date is on or after its initiation date.
#[must_use]
pub fn check_chronology(transactions: &[Transaction]) -> CheckResult {
    let issues = transactions
        .iter()
        .filter(|txn| !txn.is_chronological())
        .map(|txn| {
            DataIntegrityError::new(
                IntegrityCode::NonChronological,
                format!(
                    "closed {} before it was initiated on {}",
                    txn.close_date, txn.init_date
                ),
            )
            .with_date(txn.close_date)
            .with_context(txn.description.clone())
        })
        .collect();
    CheckResult::from_issues(Check::Chronology, issues)
}

/// Every impact resolved to an account, and every category tag to a group.
///
/// Unresolved-category issues come from `issues`; unresolved accounts are
/// found by scanning `transactions`.
#[must_use]
pub fn check_references(
    transactions: &[Transaction],
    issues: &[DataIntegrityError],
) -> CheckResult {
    let mut found: Vec<DataIntegrityError> = transactions
        .iter()
        .flat_map(|txn| {
            txn.impacts()
                .into_iter()
                .filter(|impact| impact.account_id.is_none())
                .map(move |impact| {
                    DataIntegrityError::new(
                        IntegrityCode::UnresolvedAccount,
                        format!("account {:?} is not in the chart", impact.account),
                    )
                    .with_date(txn.close_date)
                    .with_context(txn.description.clone())
                })
        })
        .collect();
    found.extend(
        issues
            .iter()
            .filter(|issue| issue.code == IntegrityCode::UnresolvedCategory)
            .cloned(),
    );
    CheckResult::from_issues(Check::ReferentialIntegrity, found)
}

/// Lot accounting, depreciation and valuation issues.
#[must_use]
pub fn check_lots(issues: &[DataIntegrityError]) -> CheckResult {
    let found = issues
        .iter()
        .filter(|issue| Check::LotIntegrity.owns(issue.code))
        .cloned()
        .collect();
    CheckResult::from_issues(Check::LotIntegrity, found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use rustbalance_core::Impact;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn test_status_lines() {
        let pass = CheckResult::from_issues(Check::Chronology, Vec::new());
        assert_eq!(pass.to_string(), "(2) \u{2713} Dates Are Chronological");

        let fail = CheckResult::from_issues(
            Check::LotIntegrity,
            vec![DataIntegrityError::new(IntegrityCode::MissingQuantity, "x")],
        );
        assert!(!fail.passed);
        assert_eq!(fail.to_string(), "(4) \u{2717} Lot accounting issues detected");
    }

    #[test]
    fn test_warnings_do_not_fail() {
        let result = check_lots(&[DataIntegrityError::new(
            IntegrityCode::AmbiguousValuation,
            "both apply",
        )]);
        assert!(result.passed);
        assert_eq!(result.issues.len(), 1);
    }

    #[test]
    fn test_chronology() {
        let txn = Transaction::new(
            date(2024, 1, 1),
            "Backdated",
            Impact::increase("Checking"),
            Impact::increase("Salary"),
            dec!(10),
        )
        .with_init_date(date(2024, 1, 3));

        let result = check_chronology(&[txn]);
        assert!(!result.passed);
        assert_eq!(result.issues[0].code, IntegrityCode::NonChronological);
        assert_eq!(result.issues[0].date, Some(date(2024, 1, 1)));
    }

    #[test]
    fn test_unresolved_accounts() {
        let txn = Transaction::new(
            date(2024, 1, 1),
            "Typo",
            Impact::increase("Chekcing"),
            Impact::increase("Salary"),
            dec!(10),
        );
        let result = check_references(&[txn], &[]);
        assert!(!result.passed);
        assert_eq!(result.issues.len(), 2);
        assert!(result
            .issues
            .iter()
            .all(|i| i.code == IntegrityCode::UnresolvedAccount));
    }

    #[test]
    fn test_references_take_category_issues_only() {
        let issues = [
            DataIntegrityError::new(IntegrityCode::UnresolvedCategory, "group"),
            DataIntegrityError::new(IntegrityCode::InvalidLifetime, "capex"),
        ];
        let result = check_references(&[], &issues);
        assert_eq!(result.issues.len(), 1);
        assert_eq!(check_lots(&issues).issues.len(), 1);
    }
}
