//! Reports for rustbalance.
//!
//! - [`roll_up`] builds the account, account-type and classification tiers
//!   of the balance sheet from the normalized ledger and the security
//!   valuation.
//! - [`income_statement`] categorizes tagged transactions; [`pivot`] turns
//!   the rows into a (year, month) table.
//! - [`kpis`] derives the headline ratios from a balance sheet.
//!
//! # Example
//!
//! ```
//! use rustbalance_booking::Valuation;
//! use rustbalance_core::{Account, AccountNames, Chart, Classification, Impact, Sign, Transaction};
//! use rustbalance_report::roll_up;
//! use rust_decimal_macros::dec;
//! use chrono::NaiveDate;
//!
//! let chart = Chart::new(vec![
//!     Account::new(1, "Checking", "Cash", Classification::Asset, Sign::Positive),
//!     Account::new(2, "Salary", "Revenue", Classification::Equity, Sign::Positive),
//! ])
//! .unwrap();
//! let paycheck = Transaction::new(
//!     NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
//!     "Paycheck",
//!     Impact::increase("Checking"),
//!     Impact::increase("Salary"),
//!     dec!(500),
//! )
//! .resolve(&chart);
//!
//! let sheet = roll_up(&chart, &[paycheck], &Valuation::default(), &AccountNames::default());
//! assert_eq!(sheet.account("Retained Earnings").unwrap().figures.market_value, dec!(500));
//! assert!(sheet.equation_gap().is_zero());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod income;
mod kpi;
mod rollup;

pub use income::{
    expense_trend, income_statement, pivot, revenue_breakdown, revenue_trend, BreakdownRow,
    Grouping, IncomeStatement, PnlLine, PnlRow, PnlTable, Section, YearMonth, UNCATEGORIZED,
};
pub use kpi::{kpis, KpiValue, Kpis, LIQUID_TYPES};
pub use rollup::{roll_up, AccountRow, BalanceSheet, ClassificationRow, Figures, TypeRow};
