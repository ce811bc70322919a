//! Three-tier balance-sheet rollup.
//!
//! # Account tier
//!
//! Each account's book value is its baseline plus the net change from
//! operations. Its market value comes from the first applicable source:
//!
//! | Account | Market value |
//! |---------|--------------|
//! | Priced security | Units held x price (or per-unit fallback), net of commission |
//! | Other, with an end-value overwrite | The overwrite |
//! | Other, with a market-value fallback | The fallback |
//! | Otherwise | Book value |
//!
//! The market adjustment (market minus book) of every asset and liability is
//! mirrored into the unrealized gain and loss placeholders so equity absorbs
//! it. Deferred taxes on unrealized gains are accrued into the deferred-tax
//! payable and expense pair. Finally the remaining equity rows are folded
//! into one retained-earnings row.
//!
//! # Account-type and classification tiers
//!
//! Account rows are summed per (classification, sign, type). Type rows are
//! multiplied by their sign vector and summed per classification, so the
//! classification tier reads `Asset = Liability + Equity`.

use rust_decimal::Decimal;
use rustbalance_booking::{net_change_all, ValueSource, Valuation};
use rustbalance_core::{
    Account, AccountId, AccountNames, Chart, Classification, DataIntegrityError, IntegrityCode,
    Metric, Sign, Transaction,
};
use std::collections::BTreeMap;
use std::ops::AddAssign;

/// The figures carried by every balance-sheet row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Figures {
    /// Value at the baseline.
    pub baseline_value: Decimal,
    /// Net change from operations.
    pub operations: Decimal,
    /// Baseline plus operations.
    pub book_value: Decimal,
    /// Market value minus book value.
    pub market_adjustment: Decimal,
    /// Value at the closing date.
    pub market_value: Decimal,
    /// Cost basis.
    pub cost_basis: Decimal,
}

impl Figures {
    /// Every figure multiplied by `factor`.
    #[must_use]
    pub fn scaled(self, factor: Decimal) -> Self {
        Self {
            baseline_value: self.baseline_value * factor,
            operations: self.operations * factor,
            book_value: self.book_value * factor,
            market_adjustment: self.market_adjustment * factor,
            market_value: self.market_value * factor,
            cost_basis: self.cost_basis * factor,
        }
    }

    /// Add `amount` to the market adjustment and market value.
    pub fn adjust(&mut self, amount: Decimal) {
        self.market_adjustment += amount;
        self.market_value += amount;
    }
}

impl AddAssign for Figures {
    fn add_assign(&mut self, rhs: Self) {
        self.baseline_value += rhs.baseline_value;
        self.operations += rhs.operations;
        self.book_value += rhs.book_value;
        self.market_adjustment += rhs.market_adjustment;
        self.market_value += rhs.market_value;
        self.cost_basis += rhs.cost_basis;
    }
}

/// Account-tier row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountRow {
    /// Balance-sheet classification.
    pub classification: Classification,
    /// Sign convention.
    pub sign: Sign,
    /// Account type.
    pub account_type: String,
    /// Account id.
    pub id: AccountId,
    /// Account name.
    pub name: String,
    /// Presentation order key.
    pub report_rank: i64,
    /// Values.
    pub figures: Figures,
    /// Where the market value came from.
    pub source: ValueSource,
}

impl AccountRow {
    fn from_account(account: &Account, figures: Figures, source: ValueSource) -> Self {
        Self {
            classification: account.classification,
            sign: account.sign,
            account_type: account.account_type.clone(),
            id: account.id,
            name: account.name.clone(),
            report_rank: account.report_rank,
            figures,
            source,
        }
    }
}

/// Account-type-tier row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRow {
    /// Balance-sheet classification.
    pub classification: Classification,
    /// Sign convention shared by the accounts.
    pub sign: Sign,
    /// Account type.
    pub account_type: String,
    /// Lowest rank of the accounts.
    pub report_rank: i64,
    /// Summed values.
    pub figures: Figures,
}

/// Classification-tier row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationRow {
    /// Asset, liability or equity.
    pub classification: Classification,
    /// Lowest rank of the account types.
    pub report_rank: i64,
    /// Sign-adjusted summed values.
    pub figures: Figures,
}

/// The three balance-sheet tiers of a run.
#[derive(Debug, Clone, Default)]
pub struct BalanceSheet {
    /// Account tier, by rank.
    pub accounts: Vec<AccountRow>,
    /// Account-type tier, by rank.
    pub types: Vec<TypeRow>,
    /// Classification tier, by rank.
    pub classifications: Vec<ClassificationRow>,
    /// Equity rows folded into retained earnings, as they were before.
    pub consolidated: Vec<AccountRow>,
    /// Deferred taxes accrued on unrealized gains.
    pub deferred_tax: Decimal,
    /// Valuation ambiguities found while rolling up.
    pub issues: Vec<DataIntegrityError>,
}

impl BalanceSheet {
    /// Classification-tier row of `classification`.
    #[must_use]
    pub fn classification(&self, classification: Classification) -> Option<&ClassificationRow> {
        self.classifications
            .iter()
            .find(|row| row.classification == classification)
    }

    /// Market value of `classification` at the classification tier.
    #[must_use]
    pub fn total(&self, classification: Classification) -> Decimal {
        self.classification(classification)
            .map_or(Decimal::ZERO, |row| row.figures.market_value)
    }

    /// `Assets - (Liabilities + Equity)` at market value.
    #[must_use]
    pub fn equation_gap(&self) -> Decimal {
        self.total(Classification::Asset)
            - (self.total(Classification::Liability) + self.total(Classification::Equity))
    }

    /// Account-tier row named `name`.
    #[must_use]
    pub fn account(&self, name: &str) -> Option<&AccountRow> {
        self.accounts.iter().find(|row| row.name == name)
    }
}

/// Roll `transactions` and `valuation` up into the three balance-sheet tiers.
pub fn roll_up(
    chart: &Chart,
    transactions: &[Transaction],
    valuation: &Valuation,
    names: &AccountNames,
) -> BalanceSheet {
    let operations = net_change_all(transactions, Metric::Amount);
    let mut sheet = BalanceSheet::default();

    let mut rows: Vec<AccountRow> = chart
        .iter()
        .map(|account| {
            let ops = operations.get(&account.id).copied().unwrap_or_default();
            account_row(account, ops, valuation, &mut sheet.issues)
        })
        .collect();

    mirror_unrealized(&mut rows, names);
    sheet.deferred_tax = accrue_deferred_tax(&mut rows, chart, names);

    rows.retain(|row| !(row.figures.baseline_value.is_zero() && row.figures.market_value.is_zero()));

    let (mut accounts, consolidated) = consolidate_retained_earnings(rows, names);
    accounts.sort_by_key(|row| (row.report_rank, row.id));

    sheet.types = type_tier(&accounts);
    sheet.classifications = classification_tier(&sheet.types);
    sheet.accounts = accounts;
    sheet.consolidated = consolidated;

    tracing::info!(
        "rolled up {} accounts into {} types; equation gap {}",
        sheet.accounts.len(),
        sheet.types.len(),
        sheet.equation_gap()
    );
    sheet
}

fn account_row(
    account: &Account,
    operations: Decimal,
    valuation: &Valuation,
    issues: &mut Vec<DataIntegrityError>,
) -> AccountRow {
    let book_value = account.baseline_value + operations;
    let priced = valuation.get(account.id);

    let (market_value, cost_basis, source) = match priced {
        Some(security) => match security.market_value {
            Some(mv) => (mv, security.cost_basis, security.source),
            None => (book_value, security.cost_basis, ValueSource::BookValue),
        },
        None => {
            if account.end_value_overwrite.is_some() && account.market_value_fallback.is_some() {
                issues.push(
                    DataIntegrityError::new(
                        IntegrityCode::AmbiguousValuation,
                        format!("{} has both an end-value overwrite and a fallback", account.name),
                    )
                    .with_context("overwrite takes precedence"),
                );
            }
            match (account.end_value_overwrite, account.market_value_fallback) {
                (Some(overwrite), _) => (overwrite, book_value, ValueSource::Overwrite),
                (None, Some(fallback)) => (fallback, book_value, ValueSource::Fallback),
                (None, None) => (book_value, book_value, ValueSource::BookValue),
            }
        }
    };

    AccountRow::from_account(
        account,
        Figures {
            baseline_value: account.baseline_value,
            operations,
            book_value,
            market_adjustment: market_value - book_value,
            market_value,
            cost_basis,
        },
        source,
    )
}

/// Mirror asset and liability market adjustments into the unrealized gain
/// and loss placeholders.
///
/// Adjustments are split by their effect on the equation, so a liability
/// revalued downward counts as a gain. Each placeholder keeps its own book
/// value and the split is added on top of it.
fn mirror_unrealized(rows: &mut [AccountRow], names: &AccountNames) {
    let (gains, losses) = rows
        .iter()
        .filter(|row| row.classification != Classification::Equity)
        .map(|row| {
            row.sign.vector() * row.classification.equation_side() * row.figures.market_adjustment
        })
        .fold((Decimal::ZERO, Decimal::ZERO), |(gains, losses), effect| {
            if effect.is_sign_positive() {
                (gains + effect, losses)
            } else {
                (gains, losses + effect)
            }
        });

    let mut placed = (false, false);
    for row in rows.iter_mut() {
        // Equity effect must cancel the mirrored adjustments
        if row.name.contains(&names.unrealized_gain) {
            row.figures.adjust(gains * row.sign.vector());
            placed.0 = true;
        } else if row.name.contains(&names.unrealized_loss) {
            row.figures.adjust(losses * row.sign.vector());
            placed.1 = true;
        }
    }

    if !placed.0 && !gains.is_zero() {
        tracing::warn!("no {:?} account for unrealized gains of {gains}", names.unrealized_gain);
    }
    if !placed.1 && !losses.is_zero() {
        tracing::warn!("no {:?} account for unrealized losses of {}", names.unrealized_loss, -losses);
    }
}

/// Accrue deferred taxes on every taxable account into the payable and
/// expense pair. Returns the total accrued.
fn accrue_deferred_tax(rows: &mut Vec<AccountRow>, chart: &Chart, names: &AccountNames) -> Decimal {
    let total: Decimal = rows
        .iter()
        .filter_map(|row| {
            let account = chart.get(row.id)?;
            let rate = account.deferred_tax_rate?;
            let taxable = if account.pre_tax {
                row.figures.market_value
            } else {
                (row.figures.market_value - row.figures.cost_basis).max(Decimal::ZERO)
            };
            Some(rate * taxable)
        })
        .sum();

    if total.is_zero() {
        return total;
    }

    let mut next_id = chart.max_id().max(rows.iter().map(|r| r.id).max().unwrap_or(0)) + 1;
    let pair = [
        (
            &names.deferred_tax_payable,
            "Deferred Taxes",
            Classification::Liability,
            Sign::Positive,
        ),
        (
            &names.deferred_tax_expense,
            "Expense",
            Classification::Equity,
            Sign::Negative,
        ),
    ];
    for (name, account_type, classification, sign) in pair {
        let index = match rows.iter().position(|row| &row.name == name) {
            Some(index) => index,
            None => {
                tracing::debug!("synthesizing {name:?} row with id {next_id}");
                let account = Account::new(next_id, name.clone(), account_type, classification, sign);
                rows.push(AccountRow::from_account(
                    &account,
                    Figures::default(),
                    ValueSource::BookValue,
                ));
                next_id += 1;
                rows.len() - 1
            }
        };
        let row = &mut rows[index];
        row.figures.adjust(total);
        row.figures.cost_basis = row.figures.book_value;
    }

    tracing::debug!("deferred taxes on unrealized gains: {total}");
    total
}

/// Fold equity rows other than the placeholders into one retained-earnings
/// row. Returns the remaining rows and the folded ones.
fn consolidate_retained_earnings(
    rows: Vec<AccountRow>,
    names: &AccountNames,
) -> (Vec<AccountRow>, Vec<AccountRow>) {
    let (folded, mut kept): (Vec<AccountRow>, Vec<AccountRow>) =
        rows.into_iter().partition(|row| {
            row.classification == Classification::Equity
                && !names.is_unrealized(&row.name)
                && row.name != names.deferred_tax_expense
        });

    if let Some(id) = folded.iter().map(|row| row.id).min() {
        let mut figures = Figures::default();
        for row in &folded {
            figures += row.figures.scaled(row.sign.vector());
        }
        kept.push(AccountRow {
            classification: Classification::Equity,
            sign: Sign::Positive,
            account_type: names.retained_earnings.clone(),
            id,
            name: names.retained_earnings.clone(),
            report_rank: i64::from(id),
            figures,
            source: ValueSource::BookValue,
        });
    }

    (kept, folded)
}

fn type_tier(accounts: &[AccountRow]) -> Vec<TypeRow> {
    let mut groups: BTreeMap<(Classification, Sign, &str), TypeRow> = BTreeMap::new();
    for row in accounts {
        let entry = groups
            .entry((row.classification, row.sign, row.account_type.as_str()))
            .or_insert_with(|| TypeRow {
                classification: row.classification,
                sign: row.sign,
                account_type: row.account_type.clone(),
                report_rank: row.report_rank,
                figures: Figures::default(),
            });
        entry.report_rank = entry.report_rank.min(row.report_rank);
        entry.figures += row.figures;
    }

    let mut types: Vec<TypeRow> = groups.into_values().collect();
    types.sort_by_key(|row| row.report_rank);
    types
}

fn classification_tier(types: &[TypeRow]) -> Vec<ClassificationRow> {
    let mut groups: BTreeMap<Classification, ClassificationRow> = BTreeMap::new();
    for row in types {
        let entry = groups
            .entry(row.classification)
            .or_insert_with(|| ClassificationRow {
                classification: row.classification,
                report_rank: row.report_rank,
                figures: Figures::default(),
            });
        entry.report_rank = entry.report_rank.min(row.report_rank);
        entry.figures += row.figures.scaled(row.sign.vector());
    }

    let mut classifications: Vec<ClassificationRow> = groups.into_values().collect();
    classifications.sort_by_key(|row| row.report_rank);
    classifications
}
