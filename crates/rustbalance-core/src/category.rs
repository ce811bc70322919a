//! Income and expense category picklists.
//!
//! Every income or expense tag on a transaction names a [`Category`]. The
//! category maps the tag to its P&L grouping and tells the normalizer whether
//! realized amounts in it accrue deferred taxes.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Whether a category tags income or expenses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CategoryKind {
    /// Revenue, gains.
    Income,
    /// Expenses, losses.
    Expense,
}

impl CategoryKind {
    /// `+1` for income, `-1` for expenses.
    #[must_use]
    pub const fn vector(self) -> Decimal {
        match self {
            Self::Income => Decimal::ONE,
            Self::Expense => Decimal::NEGATIVE_ONE,
        }
    }

    /// The other kind.
    #[must_use]
    pub const fn flip(self) -> Self {
        match self {
            Self::Income => Self::Expense,
            Self::Expense => Self::Income,
        }
    }
}

impl fmt::Display for CategoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Income => write!(f, "Income"),
            Self::Expense => write!(f, "Expense"),
        }
    }
}

/// Component tax rates of a deferred-taxable category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRates {
    /// Federal income tax rate.
    pub federal: Decimal,
    /// State income tax rate.
    pub state: Decimal,
    /// FICA rate.
    pub fica: Decimal,
}

impl TaxRates {
    /// Create a rate set.
    #[must_use]
    pub const fn new(federal: Decimal, state: Decimal, fica: Decimal) -> Self {
        Self {
            federal,
            state,
            fica,
        }
    }

    /// Combined rate.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.federal + self.state + self.fica
    }
}

/// A picklist entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Name as used in transaction tags.
    pub name: String,
    /// Income or expense.
    pub kind: CategoryKind,
    /// Category group id; `None` marks an unresolvable group.
    pub group_id: Option<u32>,
    /// Category group name.
    pub group: Option<String>,
    /// Primary P&L category.
    pub primary: Option<String>,
    /// Secondary P&L category.
    pub secondary: Option<String>,
    /// Category this entry is reported under after offsetting.
    pub after_offset: Option<String>,
    /// Whether the entry offsets the other side of the P&L.
    pub offset: bool,
    /// Tax rates when realized amounts accrue deferred taxes.
    pub deferred_tax: Option<TaxRates>,
    /// Whether deferred-tax amounts net against each other within a year.
    pub tax_offsetting: bool,
    /// Whether the entry counts toward operating revenue or living expenses.
    pub operational: bool,
}

impl Category {
    /// Create a category in `group_id` with no P&L mapping.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: CategoryKind, group_id: u32) -> Self {
        Self {
            name: name.into(),
            kind,
            group_id: Some(group_id),
            group: None,
            primary: None,
            secondary: None,
            after_offset: None,
            offset: false,
            deferred_tax: None,
            tax_offsetting: false,
            operational: true,
        }
    }

    /// Set the group name.
    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Set the primary and secondary P&L categories.
    #[must_use]
    pub fn with_pnl(mut self, primary: impl Into<String>, secondary: impl Into<String>) -> Self {
        self.primary = Some(primary.into());
        self.secondary = Some(secondary.into());
        self
    }

    /// Report this entry as an offset under `category`.
    #[must_use]
    pub fn with_offset(mut self, category: impl Into<String>) -> Self {
        self.after_offset = Some(category.into());
        self.offset = true;
        self
    }

    /// Exclude from the operating revenue and living-expense trends.
    #[must_use]
    pub const fn non_operational(mut self) -> Self {
        self.operational = false;
        self
    }

    /// Mark as deferred-taxable.
    #[must_use]
    pub const fn with_deferred_tax(mut self, rates: TaxRates, offsetting: bool) -> Self {
        self.deferred_tax = Some(rates);
        self.tax_offsetting = offsetting;
        self
    }
}

/// Income and expense categories keyed by kind and name.
#[derive(Debug, Clone, Default)]
pub struct Picklist {
    categories: BTreeMap<(CategoryKind, String), Category>,
}

impl Picklist {
    /// Create an empty picklist.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a category.
    pub fn insert(&mut self, category: Category) {
        self.categories
            .insert((category.kind, category.name.clone()), category);
    }

    /// Look up a category.
    #[must_use]
    pub fn get(&self, kind: CategoryKind, name: &str) -> Option<&Category> {
        self.categories.get(&(kind, name.to_string()))
    }

    /// Iterate all categories, income first, by name.
    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.categories.values()
    }

    /// Iterate deferred-taxable categories.
    pub fn deferred_taxable(&self) -> impl Iterator<Item = &Category> {
        self.iter().filter(|c| c.deferred_tax.is_some())
    }

    /// Number of categories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    /// Whether the picklist is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

impl FromIterator<Category> for Picklist {
    fn from_iter<I: IntoIterator<Item = Category>>(iter: I) -> Self {
        let mut picklist = Self::new();
        for category in iter {
            picklist.insert(category);
        }
        picklist
    }
}
