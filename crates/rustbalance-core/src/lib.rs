//! Core types for rustbalance
//!
//! This crate provides the fundamental types shared by every stage of the
//! balance-sheet run:
//!
//! - [`Account`] and [`Chart`] - The chart of accounts with baselines
//! - [`Classification`] and [`Sign`] - Where an account sits in the
//!   accounting equation and which direction increases it
//! - [`Transaction`] and [`Impact`] - A double-entry line impacting two accounts
//! - [`Category`] and [`Picklist`] - Income/expense category metadata
//! - [`DataIntegrityError`] - Integrity problems reported (not raised) by a run
//! - [`RunConfig`] - The parameters of one run
//!
//! # Example
//!
//! ```
//! use rustbalance_core::{Account, Chart, Classification, Impact, Sign, Transaction};
//! use rust_decimal_macros::dec;
//! use chrono::NaiveDate;
//!
//! let chart = Chart::new(vec![
//!     Account::new(1, "Cash - Checking", "Cash", Classification::Asset, Sign::Positive),
//!     Account::new(2, "Revenue - Salary", "Revenue", Classification::Equity, Sign::Positive),
//! ])
//! .unwrap();
//!
//! let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
//! let txn = Transaction::new(
//!     date,
//!     "Paycheck",
//!     Impact::increase("Cash - Checking"),
//!     Impact::increase("Revenue - Salary"),
//!     dec!(2500),
//! )
//! .resolve(&chart);
//!
//! assert_eq!(txn.first.account_id, Some(1));
//! assert_eq!(txn.second.account_id, Some(2));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod account;
pub mod category;
pub mod config;
pub mod issue;
pub mod transaction;

pub use account::{Account, AccountId, Chart, ChartError, Classification, Sign};
pub use category::{Category, CategoryKind, Picklist, TaxRates};
pub use config::{AccountNames, ConfigurationError, DepreciationRule, PriceMetric, RunConfig};
pub use issue::{DataIntegrityError, IntegrityCode};
pub use transaction::{Impact, Metric, Origin, Period, SecurityFlag, Transaction};

// Re-export commonly used external types
pub use chrono::NaiveDate;
pub use rust_decimal::Decimal;
