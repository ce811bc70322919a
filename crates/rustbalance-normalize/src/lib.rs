//! Transaction normalization for rustbalance.
//!
//! Turns the raw ledger into the canonical transaction list every later stage
//! reads:
//!
//! 1. Capex purchases expand into monthly depreciation entries.
//! 2. Security sales split into cost basis and a realized gain/loss entry.
//! 3. Transactions after the closing date are dropped; the rest get calendar
//!    fields and resolved account ids.
//! 4. Realized income in the deferred-tax window accrues deferred taxes.
//!
//! Nothing here fails: rows that cannot be processed are kept as-is (or
//! skipped, for synthetic rows) and reported in
//! [`NormalizedLedger::issues`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod deferred_tax;
mod depreciation;
mod gains;

pub use deferred_tax::{deferred_tax_entries, ensure_deferred_tax_accounts};
pub use depreciation::{expand_depreciation, DepreciationResult};
pub use gains::{split_realized, RealizedSplit};

use rustbalance_core::{Chart, DataIntegrityError, NaiveDate, Period, Picklist, RunConfig, Transaction};

/// Output of [`normalize`].
#[derive(Debug, Clone, Default)]
pub struct NormalizedLedger {
    /// Canonical transactions, resolved and windowed.
    pub transactions: Vec<Transaction>,
    /// Problems found while normalizing.
    pub issues: Vec<DataIntegrityError>,
}

/// Normalize `raw` against `chart` and `picklist`.
///
/// `chart` should already carry the deferred-tax accounts (see
/// [`ensure_deferred_tax_accounts`]) so the synthetic accruals resolve.
pub fn normalize(
    raw: &[Transaction],
    chart: &Chart,
    picklist: &Picklist,
    config: &RunConfig,
) -> NormalizedLedger {
    let mut issues = Vec::new();

    let depreciation = expand_depreciation(raw, &config.depreciation);
    tracing::debug!("{} depreciation entries", depreciation.transactions.len());
    issues.extend(depreciation.issues);

    let mut expanded = Vec::with_capacity(raw.len() + depreciation.transactions.len());
    expanded.extend_from_slice(raw);
    expanded.extend(depreciation.transactions);

    let split = split_realized(expanded, chart, config);
    tracing::debug!("split {} security sales", split.split);
    issues.extend(split.issues);

    let mut transactions = window(split.transactions, chart, config.end_date);
    let accruals = deferred_tax_entries(&transactions, picklist, config);
    transactions.extend(window(accruals, chart, config.end_date));

    tracing::info!(
        "normalized {} raw transactions into {} ({} issues)",
        raw.len(),
        transactions.len(),
        issues.len()
    );
    NormalizedLedger {
        transactions,
        issues,
    }
}

/// Drop transactions closing after `end_date`; attach calendar fields and
/// resolve account ids on the rest.
pub fn window(transactions: Vec<Transaction>, chart: &Chart, end_date: NaiveDate) -> Vec<Transaction> {
    transactions
        .into_iter()
        .filter(|t| t.close_date <= end_date)
        .map(|mut t| {
            t.period = Some(Period::of(t.close_date));
            t.resolve(chart)
        })
        .collect()
}
