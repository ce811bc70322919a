//! Income statement aggregation.
//!
//! Every income or expense tag on a transaction becomes one [`PnlRow`]
//! carrying the picklist's P&L mapping. Rows are then pivoted into a
//! (year, month) table, or summarized into operating trends and a revenue
//! breakdown.

use rust_decimal::Decimal;
use rustbalance_core::{
    Category, CategoryKind, DataIntegrityError, IntegrityCode, NaiveDate, Period, Picklist,
    Transaction,
};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Label used when a tag cannot be mapped.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Side of the income statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Section {
    /// Revenue and gains.
    Revenue,
    /// Expenses and losses.
    Expense,
}

impl Section {
    const fn of(kind: CategoryKind) -> Self {
        match kind {
            CategoryKind::Income => Self::Revenue,
            CategoryKind::Expense => Self::Expense,
        }
    }

    const fn swap(self) -> Self {
        match self {
            Self::Revenue => Self::Expense,
            Self::Expense => Self::Revenue,
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Revenue => write!(f, "Revenue"),
            Self::Expense => write!(f, "Expense"),
        }
    }
}

/// One categorized amount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PnlRow {
    /// Close date of the transaction.
    pub date: NaiveDate,
    /// Calendar fields of the close date.
    pub period: Period,
    /// Side the amount is reported on.
    pub section: Section,
    /// Kind of the tag.
    pub kind: CategoryKind,
    /// Tag as written on the transaction.
    pub category: String,
    /// Category group.
    pub group: String,
    /// Primary P&L category.
    pub primary: String,
    /// Secondary P&L category.
    pub secondary: String,
    /// Category the amount is reported under.
    pub reported_as: String,
    /// Whether the row offsets the other side.
    pub offset: bool,
    /// Whether the row counts toward operating trends.
    pub operational: bool,
    /// `+amount` for income tags, `-amount` for expense tags.
    pub value: Decimal,
}

/// Categorized rows plus the tags that could not be mapped.
#[derive(Debug, Clone, Default)]
pub struct IncomeStatement {
    /// One row per tag.
    pub rows: Vec<PnlRow>,
    /// Unresolved categories.
    pub issues: Vec<DataIntegrityError>,
}

/// Categorize every tagged transaction.
pub fn income_statement(transactions: &[Transaction], picklist: &Picklist) -> IncomeStatement {
    let mut statement = IncomeStatement::default();

    for txn in transactions {
        let tags = [
            (CategoryKind::Income, txn.income_category.as_deref()),
            (CategoryKind::Expense, txn.expense_category.as_deref()),
        ];
        for (kind, tag) in tags {
            let Some(tag) = tag else { continue };
            let category = picklist.get(kind, tag).filter(|c| c.group_id.is_some());
            if category.is_none() {
                statement.issues.push(
                    DataIntegrityError::new(
                        IntegrityCode::UnresolvedCategory,
                        format!("{kind} category {tag:?} has no category group"),
                    )
                    .with_date(txn.close_date)
                    .with_context(txn.description.clone()),
                );
            }
            statement.rows.push(row(txn, kind, tag, category, picklist));
        }
    }

    if !statement.issues.is_empty() {
        tracing::warn!("{} category tags could not be mapped", statement.issues.len());
    }
    statement
}

fn row(
    txn: &Transaction,
    kind: CategoryKind,
    tag: &str,
    category: Option<&Category>,
    picklist: &Picklist,
) -> PnlRow {
    let label = |field: Option<&Option<String>>| {
        field
            .and_then(Option::as_deref)
            .unwrap_or(UNCATEGORIZED)
            .to_string()
    };
    let offset = category.is_some_and(|c| c.offset);
    let section = if offset {
        Section::of(kind).swap()
    } else {
        Section::of(kind)
    };
    let target = category
        .filter(|_| offset)
        .and_then(|c| c.after_offset.as_deref());
    let reported_as = target.unwrap_or(tag).to_string();

    // An offset row nets against the category it offsets.
    let mapping = match target.and_then(|name| picklist.get(kind.flip(), name)) {
        Some(offsets) => Some(offsets),
        None => {
            if let Some(name) = target {
                tracing::debug!("offset target {name:?} of {tag:?} not in picklist");
            }
            category
        }
    };

    PnlRow {
        date: txn.close_date,
        period: txn.period.unwrap_or_else(|| Period::of(txn.close_date)),
        section,
        kind,
        category: tag.to_string(),
        group: label(mapping.map(|c| &c.group)),
        primary: label(mapping.map(|c| &c.primary)),
        secondary: label(mapping.map(|c| &c.secondary)),
        reported_as,
        offset,
        operational: category.is_some_and(|c| c.operational),
        value: kind.vector() * txn.amount,
    }
}

/// How to group the period table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Grouping {
    /// One line per primary category.
    #[default]
    Primary,
    /// One line per (primary, secondary) pair.
    PrimaryAndSecondary,
}

/// A calendar month.
pub type YearMonth = (i32, u32);

/// One line of a [`PnlTable`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PnlLine {
    /// Side of the statement.
    pub section: Section,
    /// Primary P&L category.
    pub primary: String,
    /// Secondary P&L category, for [`Grouping::PrimaryAndSecondary`].
    pub secondary: Option<String>,
    /// Value per month; months without activity are absent.
    pub values: BTreeMap<YearMonth, Decimal>,
}

impl PnlLine {
    /// Value in `month`, zero when absent.
    #[must_use]
    pub fn value(&self, month: YearMonth) -> Decimal {
        self.values.get(&month).copied().unwrap_or_default()
    }

    /// Sum over all months.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.values.values().copied().sum()
    }
}

/// Period-indexed income statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PnlTable {
    /// Every month with activity, ascending.
    pub columns: Vec<YearMonth>,
    /// Lines ordered by section then category.
    pub lines: Vec<PnlLine>,
}

impl PnlTable {
    /// Net income of `month` across all lines.
    #[must_use]
    pub fn net(&self, month: YearMonth) -> Decimal {
        self.lines.iter().map(|line| line.value(month)).sum()
    }
}

/// Pivot `rows` into a (year, month) table.
#[must_use]
pub fn pivot(rows: &[PnlRow], grouping: Grouping) -> PnlTable {
    let mut lines: BTreeMap<(Section, &str, Option<&str>), BTreeMap<YearMonth, Decimal>> =
        BTreeMap::new();
    let mut columns = BTreeSet::new();

    for row in rows {
        let secondary = match grouping {
            Grouping::Primary => None,
            Grouping::PrimaryAndSecondary => Some(row.secondary.as_str()),
        };
        let month = (row.period.year, row.period.month);
        columns.insert(month);
        *lines
            .entry((row.section, row.primary.as_str(), secondary))
            .or_default()
            .entry(month)
            .or_default() += row.value;
    }

    PnlTable {
        columns: columns.into_iter().collect(),
        lines: lines
            .into_iter()
            .map(|((section, primary, secondary), values)| PnlLine {
                section,
                primary: primary.to_string(),
                secondary: secondary.map(str::to_string),
                values,
            })
            .collect(),
    }
}

/// Operating revenue per month.
#[must_use]
pub fn revenue_trend(rows: &[PnlRow]) -> BTreeMap<YearMonth, Decimal> {
    let mut trend = BTreeMap::new();
    for row in operating(rows, CategoryKind::Income) {
        *trend.entry((row.period.year, row.period.month)).or_default() += row.value;
    }
    trend
}

/// Living expenses per (group, category) and month, as positive amounts.
#[must_use]
pub fn expense_trend(rows: &[PnlRow]) -> BTreeMap<(String, String), BTreeMap<YearMonth, Decimal>> {
    let mut trend: BTreeMap<(String, String), BTreeMap<YearMonth, Decimal>> = BTreeMap::new();
    for row in operating(rows, CategoryKind::Expense) {
        *trend
            .entry((row.group.clone(), row.category.clone()))
            .or_default()
            .entry((row.period.year, row.period.month))
            .or_default() -= row.value;
    }
    trend
}

fn operating(rows: &[PnlRow], kind: CategoryKind) -> impl Iterator<Item = &PnlRow> {
    rows.iter().filter(move |row| row.kind == kind && row.operational)
}

/// A category group's share of operating revenue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakdownRow {
    /// Category group.
    pub group: String,
    /// Operating revenue in the group.
    pub amount: Decimal,
    /// `amount` over the total; absent when the total is zero.
    pub share: Option<Decimal>,
}

/// Operating revenue by category group, ordered by group.
#[must_use]
pub fn revenue_breakdown(rows: &[PnlRow]) -> Vec<BreakdownRow> {
    let mut groups: BTreeMap<&str, Decimal> = BTreeMap::new();
    for row in operating(rows, CategoryKind::Income) {
        *groups.entry(row.group.as_str()).or_default() += row.value;
    }
    let total: Decimal = groups.values().copied().sum();

    groups
        .into_iter()
        .map(|(group, amount)| BreakdownRow {
            group: group.to_string(),
            amount,
            share: amount.checked_div(total),
        })
        .collect()
}
