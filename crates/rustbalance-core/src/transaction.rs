//! Double-entry transactions.
//!
//! A [`Transaction`] impacts exactly two accounts. Each [`Impact`] names the
//! account, carries the resolved id (once the chart has been consulted), and
//! the direction of the change. Both impacts share the same magnitude: the
//! `amount` for money, and `quantity` for security trades.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::account::{AccountId, Chart, Sign};
use crate::category::CategoryKind;

/// One side of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Impact {
    /// Impacted account name.
    pub account: String,
    /// Resolved id; `None` until resolved or when the name is unknown.
    pub account_id: Option<AccountId>,
    /// Direction of the change.
    pub sign: Sign,
}

impl Impact {
    /// Create an unresolved impact.
    #[must_use]
    pub fn new(account: impl Into<String>, sign: Sign) -> Self {
        Self {
            account: account.into(),
            account_id: None,
            sign,
        }
    }

    /// An impact increasing `account`.
    #[must_use]
    pub fn increase(account: impl Into<String>) -> Self {
        Self::new(account, Sign::Positive)
    }

    /// An impact decreasing `account`.
    #[must_use]
    pub fn decrease(account: impl Into<String>) -> Self {
        Self::new(account, Sign::Negative)
    }
}

/// Security trade flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SecurityFlag {
    /// Units acquired.
    Purchase,
    /// Units disposed of.
    Sale,
}

impl FromStr for SecurityFlag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "purchase" | "buy" => Ok(Self::Purchase),
            "sale" | "sell" => Ok(Self::Sale),
            _ => Err(format!("unknown security transaction flag: {s}")),
        }
    }
}

/// Where a transaction came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Origin {
    /// Recorded in the input ledger.
    #[default]
    Raw,
    /// Monthly depreciation of a capital expenditure.
    Depreciation,
    /// Realized gain or loss split off a security sale.
    RealizedGainLoss,
    /// Deferred tax on realized income.
    DeferredTax,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw => write!(f, "raw"),
            Self::Depreciation => write!(f, "depreciation"),
            Self::RealizedGainLoss => write!(f, "realized gain/loss"),
            Self::DeferredTax => write!(f, "deferred tax"),
        }
    }
}

/// Which magnitude to aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    /// Money amount.
    Amount,
    /// Security units.
    Quantity,
}

/// Calendar fields attached to a transaction during normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Period {
    /// Calendar year.
    pub year: i32,
    /// Calendar month (1-12).
    pub month: u32,
    /// ISO week number.
    pub week: u32,
}

impl Period {
    /// Derive the period of a date.
    #[must_use]
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
            week: date.iso_week().week(),
        }
    }
}

/// A double-entry ledger line.
///
/// # Examples
///
/// ```
/// use rustbalance_core::{Impact, Metric, SecurityFlag, Transaction};
/// use rust_decimal_macros::dec;
/// use chrono::NaiveDate;
///
/// let buy = Transaction::new(
///     NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
///     "Buy VTI",
///     Impact::decrease("Cash - Brokerage"),
///     Impact::increase("Brokerage - VTI"),
///     dec!(1000),
/// )
/// .with_quantity(dec!(10))
/// .with_security_flag(SecurityFlag::Purchase);
///
/// assert_eq!(buy.magnitude(Metric::Quantity), dec!(10));
/// assert!(buy.is_chronological());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Date the transaction settled.
    pub close_date: NaiveDate,
    /// Date the transaction was initiated.
    pub init_date: NaiveDate,
    /// Free-form description.
    pub description: String,
    /// First impacted account.
    pub first: Impact,
    /// Second impacted account.
    pub second: Impact,
    /// Money magnitude.
    pub amount: Decimal,
    /// Unit magnitude for security trades.
    pub quantity: Option<Decimal>,
    /// Expense category tag.
    pub expense_category: Option<String>,
    /// Income category tag.
    pub income_category: Option<String>,
    /// Security trade flag.
    pub security_flag: Option<SecurityFlag>,
    /// Whether a sale uses the wash-sale lookback.
    pub wash_sale: bool,
    /// Useful life of a capital expenditure, in months.
    pub lifetime_months: Option<Decimal>,
    /// Provenance.
    pub origin: Origin,
    /// Calendar fields, set during normalization.
    pub period: Option<Period>,
}

impl Transaction {
    /// Create a transaction closing and initiated on `close_date`.
    #[must_use]
    pub fn new(
        close_date: NaiveDate,
        description: impl Into<String>,
        first: Impact,
        second: Impact,
        amount: Decimal,
    ) -> Self {
        Self {
            close_date,
            init_date: close_date,
            description: description.into(),
            first,
            second,
            amount,
            quantity: None,
            expense_category: None,
            income_category: None,
            security_flag: None,
            wash_sale: false,
            lifetime_months: None,
            origin: Origin::Raw,
            period: None,
        }
    }

    /// Set the initiation date.
    #[must_use]
    pub const fn with_init_date(mut self, date: NaiveDate) -> Self {
        self.init_date = date;
        self
    }

    /// Set the unit quantity.
    #[must_use]
    pub const fn with_quantity(mut self, quantity: Decimal) -> Self {
        self.quantity = Some(quantity);
        self
    }

    /// Tag with an expense category.
    #[must_use]
    pub fn with_expense_category(mut self, category: impl Into<String>) -> Self {
        self.expense_category = Some(category.into());
        self
    }

    /// Tag with an income category.
    #[must_use]
    pub fn with_income_category(mut self, category: impl Into<String>) -> Self {
        self.income_category = Some(category.into());
        self
    }

    /// Set the security trade flag.
    #[must_use]
    pub const fn with_security_flag(mut self, flag: SecurityFlag) -> Self {
        self.security_flag = Some(flag);
        self
    }

    /// Mark the sale as a wash sale.
    #[must_use]
    pub const fn with_wash_sale(mut self) -> Self {
        self.wash_sale = true;
        self
    }

    /// Set the capital-expenditure lifetime.
    #[must_use]
    pub const fn with_lifetime(mut self, months: Decimal) -> Self {
        self.lifetime_months = Some(months);
        self
    }

    /// Set the provenance.
    #[must_use]
    pub const fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    /// Resolve both impacted account names against the chart.
    ///
    /// Unknown names leave the id as `None`.
    #[must_use]
    pub fn resolve(mut self, chart: &Chart) -> Self {
        self.first.account_id = chart.id_of(&self.first.account);
        self.second.account_id = chart.id_of(&self.second.account);
        self
    }

    /// Both impacts, first then second.
    #[must_use]
    pub const fn impacts(&self) -> [&Impact; 2] {
        [&self.first, &self.second]
    }

    /// Magnitude shared by both sides for the given metric.
    ///
    /// A missing quantity counts as zero.
    #[must_use]
    pub fn magnitude(&self, metric: Metric) -> Decimal {
        match metric {
            Metric::Amount => self.amount,
            Metric::Quantity => self.quantity.unwrap_or(Decimal::ZERO),
        }
    }

    /// Whether either side names `account`.
    #[must_use]
    pub fn touches(&self, account: &str) -> bool {
        self.first.account == account || self.second.account == account
    }

    /// Whether either side names an account containing `pattern`.
    #[must_use]
    pub fn touches_matching(&self, pattern: &str) -> bool {
        self.first.account.contains(pattern) || self.second.account.contains(pattern)
    }

    /// Whether the close date is on or after the initiation date.
    #[must_use]
    pub fn is_chronological(&self) -> bool {
        self.close_date >= self.init_date
    }

    /// Whether both impacts resolved to an account id.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        self.first.account_id.is_some() && self.second.account_id.is_some()
    }

    /// The category tag, income first.
    #[must_use]
    pub fn category(&self) -> Option<(CategoryKind, &str)> {
        self.income_category
            .as_deref()
            .map(|c| (CategoryKind::Income, c))
            .or_else(|| {
                self.expense_category
                    .as_deref()
                    .map(|c| (CategoryKind::Expense, c))
            })
    }

    /// Whether this is a security purchase.
    #[must_use]
    pub fn is_purchase(&self) -> bool {
        self.security_flag == Some(SecurityFlag::Purchase)
    }

    /// Whether this is a security sale.
    #[must_use]
    pub fn is_sale(&self) -> bool {
        self.security_flag == Some(SecurityFlag::Sale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{Account, Classification};
    use rust_decimal_macros::dec;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn test_resolve_fail_soft() {
        let chart = Chart::new(vec![Account::new(
            1,
            "Cash",
            "Cash",
            Classification::Asset,
            Sign::Positive,
        )])
        .unwrap();

        let txn = Transaction::new(
            date(2024, 1, 1),
            "Mystery",
            Impact::decrease("Cash"),
            Impact::increase("Typo Account"),
            dec!(5),
        )
        .resolve(&chart);

        assert_eq!(txn.first.account_id, Some(1));
        assert_eq!(txn.second.account_id, None);
        assert!(!txn.is_resolved());
    }

    #[test]
    fn test_chronology() {
        let txn = Transaction::new(
            date(2024, 1, 1),
            "Backdated",
            Impact::decrease("Cash"),
            Impact::increase("Food"),
            dec!(5),
        )
        .with_init_date(date(2024, 1, 3));
        assert!(!txn.is_chronological());
    }

    #[test]
    fn test_category_prefers_income() {
        let txn = Transaction::new(
            date(2024, 1, 1),
            "Refund",
            Impact::increase("Cash"),
            Impact::increase("Revenue"),
            dec!(5),
        )
        .with_income_category("Insurance Reimbursement");
        assert_eq!(
            txn.category(),
            Some((CategoryKind::Income, "Insurance Reimbursement"))
        );
    }

    #[test]
    fn test_period_iso_week() {
        // 2021-01-01 is in ISO week 53 of 2020, but the calendar year stays 2021.
        let period = Period::of(date(2021, 1, 1));
        assert_eq!(period.year, 2021);
        assert_eq!(period.month, 1);
        assert_eq!(period.week, 53);
    }

    #[test]
    fn test_missing_quantity_is_zero() {
        let txn = Transaction::new(
            date(2024, 1, 1),
            "Cash only",
            Impact::decrease("Cash"),
            Impact::increase("Food"),
            dec!(5),
        );
        assert_eq!(txn.magnitude(Metric::Quantity), Decimal::ZERO);
        assert_eq!(txn.magnitude(Metric::Amount), dec!(5));
    }
}
