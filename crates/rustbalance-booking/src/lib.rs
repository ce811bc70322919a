//! Booking engine for rustbalance.
//!
//! This crate provides:
//! - Net-change aggregation over both sides of every double-entry line
//! - Security lot accounting (cost basis roll-forward with wash-sale lookback)
//! - Security valuation as of the closing date
//! - Market price lookup with bounded day-by-day retry
//!
//! # Net change
//!
//! Each transaction impacts two accounts. The net change of an account is the
//! signed sum of every impact on it:
//!
//! ```
//! use rustbalance_booking::net_change_all;
//! use rustbalance_core::{Account, Chart, Classification, Impact, Metric, Sign, Transaction};
//! use rust_decimal_macros::dec;
//! use chrono::NaiveDate;
//!
//! let chart = Chart::new(vec![
//!     Account::new(1, "Cash", "Cash", Classification::Asset, Sign::Positive),
//!     Account::new(2, "Food", "Expense", Classification::Equity, Sign::Negative),
//! ])
//! .unwrap();
//! let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
//! let txns = vec![Transaction::new(
//!     date,
//!     "Groceries",
//!     Impact::decrease("Cash"),
//!     Impact::increase("Food"),
//!     dec!(50),
//! )
//! .resolve(&chart)];
//!
//! let change = net_change_all(&txns, Metric::Amount);
//! assert_eq!(change[&1], dec!(-50));
//! assert_eq!(change[&2], dec!(50));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod lots;
mod net_change;
mod price;

pub use lots::{
    value_securities, LotDelta, LotLedger, SecurityValuation, Valuation, ValuationWindow,
};
pub use net_change::{impact_rows, net_change, net_change_all, ImpactRow};
pub use price::{
    lookup_price, LookupExhausted, PriceResult, PriceSource, PriceTable, Quote, ValueSource,
};
