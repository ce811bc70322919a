//! The run pipeline.
//!
//! A [`LedgerState`] is threaded through every stage by value; each stage
//! reads what earlier stages produced and fills in its own outputs:
//!
//! 1. normalize: depreciation, realized gains, windowing, deferred taxes
//! 2. value: security quantities, prices and cost basis at the close
//! 3. roll up: the three balance-sheet tiers
//! 4. categorize: the income statement rows
//! 5. check: the consistency report
//!
//! [`run`] chains the stages and derives the remaining tables.

use rustbalance_booking::{value_securities, PriceSource, Valuation, ValuationWindow};
use rustbalance_core::{
    Chart, ChartError, ConfigurationError, DataIntegrityError, Picklist, RunConfig, Transaction,
};
use rustbalance_loader::Inputs;
use rustbalance_normalize::{ensure_deferred_tax_accounts, normalize};
use rustbalance_report::{
    expense_trend, income_statement, kpis, pivot, revenue_breakdown, revenue_trend, roll_up,
    BalanceSheet, BreakdownRow, Grouping, IncomeStatement, Kpis, PnlTable, YearMonth,
};
use rustbalance_validate::{check, CheckInput, CheckReport};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors that stop a run before it starts.
#[derive(Debug, Error)]
pub enum RunError {
    /// The run parameters are invalid.
    #[error(transparent)]
    Config(#[from] ConfigurationError),

    /// The deferred-tax accounts could not be added to the chart.
    #[error("cannot prepare chart: {0}")]
    Chart(#[from] ChartError),
}

/// State threaded through the pipeline stages.
#[derive(Debug, Clone)]
pub struct LedgerState {
    /// Run parameters.
    pub config: RunConfig,
    /// Chart of accounts, including synthesized accounts.
    pub chart: Chart,
    /// Income and expense categories.
    pub picklist: Picklist,
    /// Transactions as loaded.
    pub raw: Vec<Transaction>,
    /// Normalized transactions.
    pub transactions: Vec<Transaction>,
    /// Security valuation at the close.
    pub valuation: Valuation,
    /// The balance sheet.
    pub sheet: BalanceSheet,
    /// Categorized income and expenses.
    pub income: IncomeStatement,
    /// Integrity issues from every stage so far.
    pub issues: Vec<DataIntegrityError>,
}

impl LedgerState {
    /// Validate `config` and prepare the chart for a run.
    pub fn new(
        mut chart: Chart,
        picklist: Picklist,
        raw: Vec<Transaction>,
        config: RunConfig,
    ) -> Result<Self, RunError> {
        config.validate()?;
        let added = ensure_deferred_tax_accounts(&mut chart, &config.names)?;
        if !added.is_empty() {
            tracing::debug!("added deferred-tax accounts {added:?}");
        }

        Ok(Self {
            config,
            chart,
            picklist,
            raw,
            transactions: Vec::new(),
            valuation: Valuation::default(),
            sheet: BalanceSheet::default(),
            income: IncomeStatement::default(),
            issues: Vec::new(),
        })
    }

    /// Build the canonical transaction list.
    #[must_use]
    pub fn normalize(mut self) -> Self {
        let ledger = normalize(&self.raw, &self.chart, &self.picklist, &self.config);
        self.transactions = ledger.transactions;
        self.issues.extend(ledger.issues);
        self
    }

    /// Value every security at the close.
    #[must_use]
    pub fn value(mut self, prices: &dyn PriceSource) -> Self {
        self.valuation = value_securities(
            &self.chart,
            &self.transactions,
            ValuationWindow::from(&self.config),
            prices,
            self.config.wash_sale_days,
        );
        self.issues.extend(self.valuation.issues.iter().cloned());
        self
    }

    /// Roll the ledger up into the balance sheet.
    #[must_use]
    pub fn roll_up(mut self) -> Self {
        self.sheet = roll_up(
            &self.chart,
            &self.transactions,
            &self.valuation,
            &self.config.names,
        );
        self.issues.extend(self.sheet.issues.iter().cloned());
        self
    }

    /// Categorize income and expenses.
    #[must_use]
    pub fn categorize(mut self) -> Self {
        self.income = income_statement(&self.transactions, &self.picklist);
        self.issues.extend(self.income.issues.iter().cloned());
        self
    }

    /// Run the consistency checks.
    #[must_use]
    pub fn check(&self) -> CheckReport {
        check(
            &CheckInput {
                sheet: &self.sheet,
                transactions: &self.transactions,
                issues: &self.issues,
            },
            self.config.tolerance,
        )
    }
}

/// Everything a run produces.
#[derive(Debug, Clone)]
pub struct RunOutput {
    /// Final pipeline state.
    pub state: LedgerState,
    /// P&L by primary category and month.
    pub pnl_overall: PnlTable,
    /// P&L by primary and secondary category and month.
    pub pnl_deep_dive: PnlTable,
    /// Operating revenue per month.
    pub revenue_trend: BTreeMap<YearMonth, rust_decimal::Decimal>,
    /// Living expenses per (group, category) and month.
    pub expense_trend: BTreeMap<(String, String), BTreeMap<YearMonth, rust_decimal::Decimal>>,
    /// Operating revenue by category group.
    pub revenue_breakdown: Vec<BreakdownRow>,
    /// Headline ratios.
    pub kpis: Kpis,
    /// Consistency checks.
    pub checks: CheckReport,
}

/// Run every stage over `inputs`.
pub fn run(inputs: Inputs, config: RunConfig) -> Result<RunOutput, RunError> {
    let Inputs {
        chart,
        transactions,
        picklist,
        prices,
    } = inputs;
    run_with_prices(chart, picklist, transactions, config, &prices)
}

/// Run every stage, pricing securities from `prices`.
pub fn run_with_prices(
    chart: Chart,
    picklist: Picklist,
    raw: Vec<Transaction>,
    config: RunConfig,
    prices: &dyn PriceSource,
) -> Result<RunOutput, RunError> {
    tracing::info!(
        "running {} to {} with {} transactions",
        config.start_date,
        config.end_date,
        raw.len()
    );

    let state = LedgerState::new(chart, picklist, raw, config)?
        .normalize()
        .value(prices)
        .roll_up()
        .categorize();

    let rows = &state.income.rows;
    let output = RunOutput {
        pnl_overall: pivot(rows, Grouping::Primary),
        pnl_deep_dive: pivot(rows, Grouping::PrimaryAndSecondary),
        revenue_trend: revenue_trend(rows),
        expense_trend: expense_trend(rows),
        revenue_breakdown: revenue_breakdown(rows),
        kpis: kpis(&state.sheet),
        checks: state.check(),
        state,
    };

    tracing::info!(
        "run complete: {} of {} checks passed",
        output.checks.results.len() - output.checks.failed(),
        output.checks.results.len()
    );
    Ok(output)
}
