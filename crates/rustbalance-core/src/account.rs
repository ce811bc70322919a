//! Accounts and the chart of accounts.
//!
//! An [`Account`] carries everything the run needs to value it: where it sits
//! in the accounting equation ([`Classification`]), which direction increases
//! it ([`Sign`]), its baseline figures, and optional valuation hints for
//! securities and deferred taxes.
//!
//! The [`Chart`] owns all accounts of a run and resolves names to ids.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Stable numeric account identifier.
pub type AccountId = u32;

/// Balance-sheet classification of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Classification {
    /// Left-hand side of the accounting equation.
    Asset,
    /// Obligations.
    Liability,
    /// Owner's equity, including revenue, expense, gain and loss accounts.
    Equity,
}

impl Classification {
    /// Side of the accounting equation: `+1` for assets, `-1` otherwise.
    ///
    /// Multiplying a sign-adjusted value by this yields its contribution to
    /// `Assets - Liabilities - Equity`.
    #[must_use]
    pub const fn equation_side(self) -> Decimal {
        match self {
            Self::Asset => Decimal::ONE,
            Self::Liability | Self::Equity => Decimal::NEGATIVE_ONE,
        }
    }
}

impl FromStr for Classification {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "asset" | "assets" => Ok(Self::Asset),
            "liability" | "liabilities" => Ok(Self::Liability),
            "equity" => Ok(Self::Equity),
            _ => Err(format!("unknown classification: {s}")),
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asset => write!(f, "Asset"),
            Self::Liability => write!(f, "Liability"),
            Self::Equity => write!(f, "Equity"),
        }
    }
}

/// Direction of a change, or an account's sign convention.
///
/// On an account, the sign tells whether increasing the account increases
/// (`+`) or decreases (`-`) its classification total. On a transaction
/// impact, it tells whether the impacted account goes up or down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Sign {
    /// `+`
    #[serde(rename = "+")]
    Positive,
    /// `-`
    #[serde(rename = "-")]
    Negative,
}

impl Sign {
    /// The sign vector: `+1` or `-1`.
    #[must_use]
    pub const fn vector(self) -> Decimal {
        match self {
            Self::Positive => Decimal::ONE,
            Self::Negative => Decimal::NEGATIVE_ONE,
        }
    }

    /// Apply this sign to a magnitude.
    #[must_use]
    pub fn apply(self, magnitude: Decimal) -> Decimal {
        self.vector() * magnitude
    }

    /// The opposite sign.
    #[must_use]
    pub const fn flip(self) -> Self {
        match self {
            Self::Positive => Self::Negative,
            Self::Negative => Self::Positive,
        }
    }
}

impl FromStr for Sign {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "+" | "[+ve]" | "+ve" | "positive" => Ok(Self::Positive),
            "-" | "\u{2212}" | "[-ve]" | "-ve" | "negative" => Ok(Self::Negative),
            _ => Err(format!("unknown sign: {s}")),
        }
    }
}

impl fmt::Display for Sign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Positive => write!(f, "+"),
            Self::Negative => write!(f, "-"),
        }
    }
}

/// An account from the chart of accounts.
///
/// # Examples
///
/// ```
/// use rustbalance_core::{Account, Classification, Sign};
/// use rust_decimal_macros::dec;
///
/// let vti = Account::new(12, "Brokerage - VTI", "Marketable Securities", Classification::Asset, Sign::Positive)
///     .with_baseline(dec!(1000))
///     .with_security("VTI", dec!(100), dec!(1000))
///     .with_deferred_tax(dec!(0.15), false);
///
/// assert!(vti.is_security());
/// assert_eq!(vti.baseline_quantity, dec!(100));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Unique, stable id.
    pub id: AccountId,
    /// Account name as referenced by transactions.
    pub name: String,
    /// Account type (e.g. "Cash", "Marketable Securities", "Revenue").
    pub account_type: String,
    /// Balance-sheet classification.
    pub classification: Classification,
    /// Sign convention.
    pub sign: Sign,
    /// Presentation order key.
    pub report_rank: i64,
    /// Value as of the baseline date.
    pub baseline_value: Decimal,
    /// Units held as of the baseline date (securities).
    pub baseline_quantity: Decimal,
    /// Total cost basis as of the baseline date (securities).
    pub baseline_cost_basis: Decimal,
    /// Externally supplied end value, replacing book value when present.
    pub end_value_overwrite: Option<Decimal>,
    /// Combined tax rate applied to unrealized gains (or the whole value).
    pub deferred_tax_rate: Option<Decimal>,
    /// Whether disbursements are fully taxable (zero cost basis).
    pub pre_tax: bool,
    /// Market ticker for marketable securities.
    pub security_ticker: Option<String>,
    /// Value used when no market price can be obtained.
    pub market_value_fallback: Option<Decimal>,
    /// Fraction of market value lost to commissions on sale.
    pub sale_commission: Decimal,
}

impl Account {
    /// Create an account with zero baselines and no valuation hints.
    ///
    /// The report rank defaults to the id.
    #[must_use]
    pub fn new(
        id: AccountId,
        name: impl Into<String>,
        account_type: impl Into<String>,
        classification: Classification,
        sign: Sign,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            account_type: account_type.into(),
            classification,
            sign,
            report_rank: i64::from(id),
            baseline_value: Decimal::ZERO,
            baseline_quantity: Decimal::ZERO,
            baseline_cost_basis: Decimal::ZERO,
            end_value_overwrite: None,
            deferred_tax_rate: None,
            pre_tax: false,
            security_ticker: None,
            market_value_fallback: None,
            sale_commission: Decimal::ZERO,
        }
    }

    /// Set the report rank.
    #[must_use]
    pub const fn with_rank(mut self, rank: i64) -> Self {
        self.report_rank = rank;
        self
    }

    /// Set the baseline value.
    #[must_use]
    pub const fn with_baseline(mut self, value: Decimal) -> Self {
        self.baseline_value = value;
        self
    }

    /// Mark this account as a marketable security.
    #[must_use]
    pub fn with_security(
        mut self,
        ticker: impl Into<String>,
        quantity: Decimal,
        cost_basis: Decimal,
    ) -> Self {
        self.security_ticker = Some(ticker.into());
        self.baseline_quantity = quantity;
        self.baseline_cost_basis = cost_basis;
        self
    }

    /// Set the market-value fallback.
    #[must_use]
    pub const fn with_fallback(mut self, value: Decimal) -> Self {
        self.market_value_fallback = Some(value);
        self
    }

    /// Set the end-value overwrite.
    #[must_use]
    pub const fn with_overwrite(mut self, value: Decimal) -> Self {
        self.end_value_overwrite = Some(value);
        self
    }

    /// Set the deferred-tax rate and pre-tax flag.
    #[must_use]
    pub const fn with_deferred_tax(mut self, rate: Decimal, pre_tax: bool) -> Self {
        self.deferred_tax_rate = Some(rate);
        self.pre_tax = pre_tax;
        self
    }

    /// Set the sale commission fraction.
    #[must_use]
    pub const fn with_sale_commission(mut self, fraction: Decimal) -> Self {
        self.sale_commission = fraction;
        self
    }

    /// Whether the account holds a priced security.
    #[must_use]
    pub const fn is_security(&self) -> bool {
        self.security_ticker.is_some()
    }

    /// Contribution of a change of `value` in this account to
    /// `Assets - Liabilities - Equity`.
    #[must_use]
    pub fn equation_effect(&self, value: Decimal) -> Decimal {
        self.sign.vector() * self.classification.equation_side() * value
    }
}

/// Error building a chart of accounts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChartError {
    /// Two accounts share an id.
    #[error("duplicate account id {0}")]
    DuplicateId(AccountId),
    /// Two accounts share a name.
    #[error("duplicate account name {0:?}")]
    DuplicateName(String),
}

/// The chart of accounts for a run, ordered by id.
#[derive(Debug, Clone, Default)]
pub struct Chart {
    accounts: Vec<Account>,
    by_id: HashMap<AccountId, usize>,
    by_name: HashMap<String, usize>,
}

impl Chart {
    /// Build a chart, rejecting duplicate ids and names.
    pub fn new(mut accounts: Vec<Account>) -> Result<Self, ChartError> {
        accounts.sort_by_key(|a| a.id);

        let mut by_id = HashMap::with_capacity(accounts.len());
        let mut by_name = HashMap::with_capacity(accounts.len());
        for (index, account) in accounts.iter().enumerate() {
            if by_id.insert(account.id, index).is_some() {
                return Err(ChartError::DuplicateId(account.id));
            }
            if by_name.insert(account.name.clone(), index).is_some() {
                return Err(ChartError::DuplicateName(account.name.clone()));
            }
        }

        Ok(Self {
            accounts,
            by_id,
            by_name,
        })
    }

    /// Add an account, keeping id order.
    pub fn insert(&mut self, account: Account) -> Result<(), ChartError> {
        if self.by_id.contains_key(&account.id) {
            return Err(ChartError::DuplicateId(account.id));
        }
        if self.by_name.contains_key(&account.name) {
            return Err(ChartError::DuplicateName(account.name));
        }
        let mut accounts = std::mem::take(&mut self.accounts);
        accounts.push(account);
        *self = Self::new(accounts)?;
        Ok(())
    }

    /// Look up an account by id.
    #[must_use]
    pub fn get(&self, id: AccountId) -> Option<&Account> {
        self.by_id.get(&id).map(|&i| &self.accounts[i])
    }

    /// Look up an account by name.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&Account> {
        self.by_name.get(name).map(|&i| &self.accounts[i])
    }

    /// Resolve a name to an id.
    #[must_use]
    pub fn id_of(&self, name: &str) -> Option<AccountId> {
        self.by_name(name).map(|a| a.id)
    }

    /// Iterate accounts in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Account> {
        self.accounts.iter()
    }

    /// Iterate security accounts in id order.
    pub fn securities(&self) -> impl Iterator<Item = &Account> {
        self.accounts.iter().filter(|a| a.is_security())
    }

    /// Highest id in the chart, or zero when empty.
    #[must_use]
    pub fn max_id(&self) -> AccountId {
        self.accounts.last().map_or(0, |a| a.id)
    }

    /// Number of accounts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Whether the chart is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}
