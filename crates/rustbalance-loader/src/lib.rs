//! CSV input loading for rustbalance.
//!
//! A run reads five tables from one directory:
//!
//! | File | Contents |
//! |------|----------|
//! | `accounts.csv` | The chart of accounts |
//! | `transactions.csv` | The raw ledger |
//! | `income_categories.csv` | Income picklist |
//! | `expense_categories.csv` | Expense picklist |
//! | `prices.csv` | Daily security quotes (optional) |
//!
//! Columns are matched by header name, so their order does not matter and
//! unknown columns are ignored. Empty cells are absent values.
//!
//! # Example
//!
//! ```ignore
//! use rustbalance_core::PriceMetric;
//! use rustbalance_loader::load_dir;
//! use std::path::Path;
//!
//! let inputs = load_dir(Path::new("data"), PriceMetric::AdjClose)?;
//! println!("{} accounts", inputs.chart.len());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod rows;

use rows::{AccountRow, CategoryRow, PriceRow, TransactionRow};
use rustbalance_booking::PriceTable;
use rustbalance_core::{CategoryKind, Chart, ChartError, Picklist, PriceMetric, Transaction};
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Chart of accounts file name.
pub const ACCOUNTS_FILE: &str = "accounts.csv";
/// Ledger file name.
pub const TRANSACTIONS_FILE: &str = "transactions.csv";
/// Income picklist file name.
pub const INCOME_FILE: &str = "income_categories.csv";
/// Expense picklist file name.
pub const EXPENSE_FILE: &str = "expense_categories.csv";
/// Price table file name.
pub const PRICES_FILE: &str = "prices.csv";

/// Errors that can occur during loading.
#[derive(Debug, Error)]
pub enum LoadError {
    /// IO error opening a file.
    #[error("failed to read file {path}: {source}")]
    Io {
        /// The path that failed to open.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Malformed CSV, or a cell of the wrong type.
    #[error("malformed {file}: {source}")]
    Csv {
        /// The table being read.
        file: String,
        /// The underlying CSV error.
        #[source]
        source: csv::Error,
    },

    /// A cell that parsed as text but is not a valid value.
    #[error("{file} line {line}: {message}")]
    InvalidField {
        /// The table being read.
        file: String,
        /// One-based line number, counting the header.
        line: u64,
        /// What was wrong.
        message: String,
    },

    /// The accounts do not form a valid chart.
    #[error("invalid chart of accounts: {0}")]
    Chart(#[from] ChartError),
}

/// Everything a run reads.
#[derive(Debug, Clone)]
pub struct Inputs {
    /// Chart of accounts.
    pub chart: Chart,
    /// Raw ledger, in file order.
    pub transactions: Vec<Transaction>,
    /// Income and expense categories.
    pub picklist: Picklist,
    /// Security quotes.
    pub prices: PriceTable,
}

/// Load every input table from `dir`.
///
/// A missing price table yields an empty one; every other table is required.
pub fn load_dir(dir: &Path, metric: PriceMetric) -> Result<Inputs, LoadError> {
    let chart = read_accounts(open(&dir.join(ACCOUNTS_FILE))?)?;
    let transactions = read_transactions(open(&dir.join(TRANSACTIONS_FILE))?)?;

    let mut picklist = read_categories(open(&dir.join(INCOME_FILE))?, CategoryKind::Income)?;
    for category in read_categories(open(&dir.join(EXPENSE_FILE))?, CategoryKind::Expense)?.iter() {
        picklist.insert(category.clone());
    }

    let prices_path = dir.join(PRICES_FILE);
    let prices = if prices_path.exists() {
        read_prices(open(&prices_path)?, metric)?
    } else {
        tracing::debug!("no {} in {}; prices unavailable", PRICES_FILE, dir.display());
        PriceTable::new(metric)
    };

    tracing::info!(
        "loaded {} accounts, {} transactions, {} categories, {} quotes",
        chart.len(),
        transactions.len(),
        picklist.len(),
        prices.len()
    );
    Ok(Inputs {
        chart,
        transactions,
        picklist,
        prices,
    })
}

fn open(path: &Path) -> Result<File, LoadError> {
    File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Read a chart of accounts.
pub fn read_accounts<R: Read>(reader: R) -> Result<Chart, LoadError> {
    let accounts = read_rows::<AccountRow, _>(reader, ACCOUNTS_FILE)?
        .into_iter()
        .map(|(line, row)| row.into_account().map_err(|m| invalid(ACCOUNTS_FILE, line, m)))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Chart::new(accounts)?)
}

/// Read a ledger.
pub fn read_transactions<R: Read>(reader: R) -> Result<Vec<Transaction>, LoadError> {
    read_rows::<TransactionRow, _>(reader, TRANSACTIONS_FILE)?
        .into_iter()
        .map(|(line, row)| {
            row.into_transaction()
                .map_err(|m| invalid(TRANSACTIONS_FILE, line, m))
        })
        .collect()
}

/// Read a picklist of `kind` categories.
pub fn read_categories<R: Read>(reader: R, kind: CategoryKind) -> Result<Picklist, LoadError> {
    let file = match kind {
        CategoryKind::Income => INCOME_FILE,
        CategoryKind::Expense => EXPENSE_FILE,
    };
    read_rows::<CategoryRow, _>(reader, file)?
        .into_iter()
        .map(|(line, row)| row.into_category(kind).map_err(|m| invalid(file, line, m)))
        .collect()
}

/// Read a price table answering with `metric`.
pub fn read_prices<R: Read>(reader: R, metric: PriceMetric) -> Result<PriceTable, LoadError> {
    let mut table = PriceTable::new(metric);
    for (line, row) in read_rows::<PriceRow, _>(reader, PRICES_FILE)? {
        let (ticker, date, quote) = row.into_quote().map_err(|m| invalid(PRICES_FILE, line, m))?;
        table.insert(ticker, date, quote);
    }
    Ok(table)
}

/// Deserialize every row, paired with its line number.
fn read_rows<T: DeserializeOwned, R: Read>(reader: R, file: &str) -> Result<Vec<(u64, T)>, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    for (index, result) in reader.deserialize::<T>().enumerate() {
        let row = result.map_err(|source| LoadError::Csv {
            file: file.to_string(),
            source,
        })?;
        rows.push((index as u64 + 2, row));
    }
    Ok(rows)
}

fn invalid(file: &str, line: u64, message: String) -> LoadError {
    LoadError::InvalidField {
        file: file.to_string(),
        line,
        message,
    }
}
