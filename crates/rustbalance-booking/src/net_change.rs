//! Net-change aggregation.
//!
//! The transactions are viewed once per side: every impact whose account is
//! in the target set becomes an [`ImpactRow`]. A transaction with both sides
//! in the set yields two rows, one per economic impact.

use rust_decimal::Decimal;
use rustbalance_core::{AccountId, Metric, Sign, Transaction};
use std::collections::{BTreeMap, BTreeSet};

/// One side of a transaction, as seen from the impacted account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImpactRow {
    /// Impacted account.
    pub account_id: AccountId,
    /// Direction of the change.
    pub sign: Sign,
    /// Unsigned magnitude.
    pub magnitude: Decimal,
}

impl ImpactRow {
    /// The signed change.
    #[must_use]
    pub fn signed(&self) -> Decimal {
        self.sign.apply(self.magnitude)
    }
}

/// Union of the first-side and second-side views of `transactions`,
/// restricted to impacts on `accounts` (or every resolved impact when
/// `accounts` is `None`).
pub fn impact_rows(
    transactions: &[Transaction],
    accounts: Option<&BTreeSet<AccountId>>,
    metric: Metric,
) -> Vec<ImpactRow> {
    let selected = |id: &AccountId| accounts.map_or(true, |set| set.contains(id));
    let mut rows = Vec::with_capacity(transactions.len() * 2);

    // First-side view, then second-side view
    for second in [false, true] {
        for txn in transactions {
            let impact = if second { &txn.second } else { &txn.first };
            if let Some(account_id) = impact.account_id.filter(|id| selected(id)) {
                rows.push(ImpactRow {
                    account_id,
                    sign: impact.sign,
                    magnitude: txn.magnitude(metric),
                });
            }
        }
    }

    rows
}

/// Net signed change per account in `accounts`.
///
/// Accounts without any impact are absent from the result.
pub fn net_change(
    transactions: &[Transaction],
    accounts: &BTreeSet<AccountId>,
    metric: Metric,
) -> BTreeMap<AccountId, Decimal> {
    sum_rows(impact_rows(transactions, Some(accounts), metric))
}

/// Net signed change of every resolved account.
pub fn net_change_all(transactions: &[Transaction], metric: Metric) -> BTreeMap<AccountId, Decimal> {
    sum_rows(impact_rows(transactions, None, metric))
}

fn sum_rows(rows: Vec<ImpactRow>) -> BTreeMap<AccountId, Decimal> {
    let mut change: BTreeMap<AccountId, Decimal> = BTreeMap::new();
    for row in rows {
        *change.entry(row.account_id).or_default() += row.signed();
    }
    change
}
