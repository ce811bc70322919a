//! Personal balance sheet, income statement and KPI batch engine.
//!
//! This crate ties the pipeline together and provides the `rbalance`
//! command-line tool:
//!
//! - [`pipeline`]: chains normalization, valuation, roll-up and checks
//! - [`output`]: writes the output tables as CSV
//! - [`report`]: prints check results and KPIs
//!
//! # Example Usage
//!
//! ```bash
//! rbalance data/ --output out/ --start 2021-06-25 --end 2024-06-30
//! rbalance data/ --format json --strict
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cmd;
pub mod output;
pub mod pipeline;
pub mod report;

pub use pipeline::{run, run_with_prices, LedgerState, RunError, RunOutput};
