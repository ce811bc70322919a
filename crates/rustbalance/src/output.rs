//! CSV output tables.
//!
//! Every table is written as one flat CSV file. Balance-sheet tables carry
//! the same six figure columns at every tier, and the P&L tables are in long
//! format with one row per line and month.

use crate::pipeline::RunOutput;
use rust_decimal::Decimal;
use rustbalance_report::PnlTable;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Classification-tier balance sheet.
pub const OVERALL_FILE: &str = "overall.csv";
/// Account-type-tier balance sheet.
pub const CLASS_FILE: &str = "class.csv";
/// Account-tier balance sheet.
pub const ACCOUNT_FILE: &str = "account.csv";
/// P&L by primary category.
pub const PNL_OVERALL_FILE: &str = "pnl_overall.csv";
/// P&L by primary and secondary category.
pub const PNL_DEEP_DIVE_FILE: &str = "pnl_deep_dive.csv";
/// Security quantities, prices and cost basis.
pub const SECURITIES_FILE: &str = "security_valuations.csv";
/// Headline ratios.
pub const KPI_FILE: &str = "kpis.csv";
/// Operating revenue by category group.
pub const BREAKDOWN_FILE: &str = "revenue_breakdown.csv";
/// Operating revenue and living expenses per month.
pub const TRENDS_FILE: &str = "trends.csv";

/// Errors that can occur while writing output tables.
#[derive(Debug, Error)]
pub enum OutputError {
    /// The output directory could not be created.
    #[error("failed to create {path}: {source}")]
    Io {
        /// Directory that failed.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A table could not be written.
    #[error("failed to write {path}: {source}")]
    Csv {
        /// File that failed.
        path: PathBuf,
        /// The underlying CSV error.
        #[source]
        source: csv::Error,
    },
}

#[derive(Debug, Serialize)]
struct OverallRecord {
    classification: String,
    report_rank: i64,
    baseline_value: Decimal,
    operations: Decimal,
    book_value: Decimal,
    market_adjustment: Decimal,
    market_value: Decimal,
    cost_basis: Decimal,
}

#[derive(Debug, Serialize)]
struct ClassRecord<'a> {
    classification: String,
    sign: String,
    account_type: &'a str,
    report_rank: i64,
    baseline_value: Decimal,
    operations: Decimal,
    book_value: Decimal,
    market_adjustment: Decimal,
    market_value: Decimal,
    cost_basis: Decimal,
}

#[derive(Debug, Serialize)]
struct AccountRecord<'a> {
    id: u32,
    name: &'a str,
    classification: String,
    sign: String,
    account_type: &'a str,
    report_rank: i64,
    baseline_value: Decimal,
    operations: Decimal,
    book_value: Decimal,
    market_adjustment: Decimal,
    market_value: Decimal,
    cost_basis: Decimal,
    value_source: String,
}

#[derive(Debug, Serialize)]
struct PnlRecord<'a> {
    section: String,
    primary: &'a str,
    secondary: Option<&'a str>,
    year: i32,
    month: u32,
    value: Decimal,
}

#[derive(Debug, Serialize)]
struct SecurityRecord<'a> {
    account_id: u32,
    name: &'a str,
    ticker: &'a str,
    baseline_quantity: Decimal,
    end_quantity: Decimal,
    price: Option<Decimal>,
    price_date: Option<String>,
    market_value: Option<Decimal>,
    cost_basis: Decimal,
    value_source: String,
}

#[derive(Debug, Serialize)]
struct KpiRecord {
    metric: &'static str,
    value: Option<Decimal>,
}

#[derive(Debug, Serialize)]
struct BreakdownRecord<'a> {
    group: &'a str,
    amount: Decimal,
    share: Option<Decimal>,
}

#[derive(Debug, Serialize)]
struct TrendRecord<'a> {
    series: &'static str,
    group: Option<&'a str>,
    category: Option<&'a str>,
    year: i32,
    month: u32,
    value: Decimal,
}

/// Write every output table of `output` into `dir`, creating it if needed.
///
/// Returns the paths written, in a stable order.
pub fn write_outputs(output: &RunOutput, dir: &Path) -> Result<Vec<PathBuf>, OutputError> {
    std::fs::create_dir_all(dir).map_err(|source| OutputError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let sheet = &output.state.sheet;
    let mut written = Vec::new();

    written.push(write_table(
        dir,
        OVERALL_FILE,
        sheet.classifications.iter().map(|row| {
            let f = row.figures;
            OverallRecord {
                classification: row.classification.to_string(),
                report_rank: row.report_rank,
                baseline_value: f.baseline_value,
                operations: f.operations,
                book_value: f.book_value,
                market_adjustment: f.market_adjustment,
                market_value: f.market_value,
                cost_basis: f.cost_basis,
            }
        }),
    )?);

    written.push(write_table(
        dir,
        CLASS_FILE,
        sheet.types.iter().map(|row| {
            let f = row.figures;
            ClassRecord {
                classification: row.classification.to_string(),
                sign: row.sign.to_string(),
                account_type: &row.account_type,
                report_rank: row.report_rank,
                baseline_value: f.baseline_value,
                operations: f.operations,
                book_value: f.book_value,
                market_adjustment: f.market_adjustment,
                market_value: f.market_value,
                cost_basis: f.cost_basis,
            }
        }),
    )?);

    written.push(write_table(
        dir,
        ACCOUNT_FILE,
        sheet.accounts.iter().map(|row| {
            let f = row.figures;
            AccountRecord {
                id: row.id,
                name: &row.name,
                classification: row.classification.to_string(),
                sign: row.sign.to_string(),
                account_type: &row.account_type,
                report_rank: row.report_rank,
                baseline_value: f.baseline_value,
                operations: f.operations,
                book_value: f.book_value,
                market_adjustment: f.market_adjustment,
                market_value: f.market_value,
                cost_basis: f.cost_basis,
                value_source: row.source.to_string(),
            }
        }),
    )?);

    written.push(write_table(dir, PNL_OVERALL_FILE, pnl_records(&output.pnl_overall))?);
    written.push(write_table(dir, PNL_DEEP_DIVE_FILE, pnl_records(&output.pnl_deep_dive))?);

    written.push(write_table(
        dir,
        SECURITIES_FILE,
        output.state.valuation.securities.iter().map(|s| SecurityRecord {
            account_id: s.account_id,
            name: &s.name,
            ticker: &s.ticker,
            baseline_quantity: s.baseline_quantity,
            end_quantity: s.end_quantity,
            price: s.price,
            price_date: s.price_date.map(|d| d.to_string()),
            market_value: s.market_value,
            cost_basis: s.cost_basis,
            value_source: s.source.to_string(),
        }),
    )?);

    written.push(write_table(
        dir,
        KPI_FILE,
        output.kpis.metrics().into_iter().map(|kpi| KpiRecord {
            metric: kpi.metric,
            value: kpi.value.map(|v| v.round_dp(4)),
        }),
    )?);

    written.push(write_table(
        dir,
        BREAKDOWN_FILE,
        output.revenue_breakdown.iter().map(|row| BreakdownRecord {
            group: &row.group,
            amount: row.amount,
            share: row.share.map(|s| s.round_dp(4)),
        }),
    )?);

    let revenue = output
        .revenue_trend
        .iter()
        .map(|(&(year, month), &value)| TrendRecord {
            series: "revenue",
            group: None,
            category: None,
            year,
            month,
            value,
        });
    let expenses = output.expense_trend.iter().flat_map(|((group, category), months)| {
        months.iter().map(move |(&(year, month), &value)| TrendRecord {
            series: "expense",
            group: Some(group.as_str()),
            category: Some(category.as_str()),
            year,
            month,
            value,
        })
    });
    written.push(write_table(dir, TRENDS_FILE, revenue.chain(expenses))?);

    tracing::info!("wrote {} tables to {}", written.len(), dir.display());
    Ok(written)
}

fn pnl_records(table: &PnlTable) -> impl Iterator<Item = PnlRecord<'_>> {
    table.lines.iter().flat_map(|line| {
        line.values.iter().map(move |(&(year, month), &value)| PnlRecord {
            section: line.section.to_string(),
            primary: &line.primary,
            secondary: line.secondary.as_deref(),
            year,
            month,
            value,
        })
    })
}

fn write_table<T: Serialize>(
    dir: &Path,
    file: &str,
    records: impl IntoIterator<Item = T>,
) -> Result<PathBuf, OutputError> {
    let path = dir.join(file);
    let csv_error = |source: csv::Error| OutputError::Csv {
        path: path.clone(),
        source,
    };

    let mut writer = csv::Writer::from_path(&path).map_err(csv_error)?;
    let mut count = 0usize;
    for record in records {
        writer.serialize(record).map_err(csv_error)?;
        count += 1;
    }
    writer
        .flush()
        .map_err(|e| csv_error(csv::Error::from(e)))?;

    tracing::debug!("wrote {count} rows to {}", path.display());
    Ok(path)
}
