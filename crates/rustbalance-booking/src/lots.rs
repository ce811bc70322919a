//! Security lot accounting.
//!
//! Cost basis is tracked as an average per unit: the baseline lot plus every
//! purchase in a window. A wash sale looks only at the purchases made in the
//! lookback days before the sale, ignoring the baseline.

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use rustbalance_core::{
    Account, AccountId, Chart, DataIntegrityError, IntegrityCode, Metric, RunConfig, Transaction,
};
use std::collections::BTreeSet;

use crate::net_change::net_change;
use crate::price::{lookup_price, PriceResult, PriceSource, ValueSource};

/// Units and cost acquired over a window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LotDelta {
    /// Units purchased.
    pub quantity: Decimal,
    /// Total amount paid.
    pub cost_basis: Decimal,
}

/// Purchase history of every security, read from a transaction list.
#[derive(Debug, Clone, Copy)]
pub struct LotLedger<'a> {
    transactions: &'a [Transaction],
    wash_sale_days: u32,
}

impl<'a> LotLedger<'a> {
    /// Create a ledger over `transactions`.
    #[must_use]
    pub const fn new(transactions: &'a [Transaction], wash_sale_days: u32) -> Self {
        Self {
            transactions,
            wash_sale_days,
        }
    }

    /// Purchases of `security` closing in `[t0, tf)`.
    #[must_use]
    pub fn purchases(&self, security: &str, t0: NaiveDate, tf: NaiveDate) -> LotDelta {
        self.transactions
            .iter()
            .filter(|txn| txn.is_purchase() && txn.touches(security))
            .filter(|txn| txn.close_date >= t0 && txn.close_date < tf)
            .fold(LotDelta::default(), |mut delta, txn| {
                delta.quantity += txn.magnitude(Metric::Quantity);
                delta.cost_basis += txn.amount;
                delta
            })
    }

    /// Per-unit cost basis of `account` over `[t0, tf)`.
    ///
    /// A wash sale averages only the window's purchases; otherwise the
    /// baseline lot is included.
    pub fn cost_basis_at(
        &self,
        account: &Account,
        t0: NaiveDate,
        tf: NaiveDate,
        wash: bool,
    ) -> Result<Decimal, DataIntegrityError> {
        let delta = self.purchases(&account.name, t0, tf);
        let (cost, quantity) = if wash {
            (delta.cost_basis, delta.quantity)
        } else {
            (
                account.baseline_cost_basis + delta.cost_basis,
                account.baseline_quantity + delta.quantity,
            )
        };

        cost.checked_div(quantity).ok_or_else(|| {
            DataIntegrityError::new(
                IntegrityCode::ZeroQuantityBasis,
                format!("cost basis of {} over zero units", account.name),
            )
            .with_date(tf)
            .with_context(format!("window {t0} to {tf}, wash sale: {wash}"))
        })
    }

    /// Start of the cost-basis window of a sale on `sale_date`.
    #[must_use]
    pub fn sale_window_start(&self, sale_date: NaiveDate, wash: bool, run_start: NaiveDate) -> NaiveDate {
        if wash {
            sale_date
                .checked_sub_days(Days::new(u64::from(self.wash_sale_days)))
                .unwrap_or(sale_date)
        } else {
            run_start
        }
    }

    /// Total cost basis of the units disposed of by `sale`.
    pub fn sale_basis(
        &self,
        account: &Account,
        sale: &Transaction,
        run_start: NaiveDate,
    ) -> Result<Decimal, DataIntegrityError> {
        let quantity = sale.quantity.ok_or_else(|| {
            DataIntegrityError::new(
                IntegrityCode::MissingQuantity,
                format!("sale of {} has no quantity", account.name),
            )
            .with_date(sale.close_date)
            .with_context(sale.description.clone())
        })?;

        let t0 = self.sale_window_start(sale.close_date, sale.wash_sale, run_start);
        let per_unit = self
            .cost_basis_at(account, t0, sale.close_date, sale.wash_sale)
            .map_err(|e| e.with_context(sale.description.clone()))?;
        Ok(per_unit * quantity)
    }
}

/// Dates and retry budget of a valuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValuationWindow {
    /// Start of the cost-basis roll-forward.
    pub start: NaiveDate,
    /// Closing date.
    pub end: NaiveDate,
    /// Price lookup retries.
    pub max_retries: u32,
}

impl From<&RunConfig> for ValuationWindow {
    fn from(config: &RunConfig) -> Self {
        Self {
            start: config.start_date,
            end: config.end_date,
            max_retries: config.max_price_retries,
        }
    }
}

/// End-of-period state of one security account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityValuation {
    /// Account id.
    pub account_id: AccountId,
    /// Account name.
    pub name: String,
    /// Market ticker.
    pub ticker: String,
    /// Units held at the baseline.
    pub baseline_quantity: Decimal,
    /// Cost basis at the baseline.
    pub baseline_cost_basis: Decimal,
    /// Units held at the closing date.
    pub end_quantity: Decimal,
    /// Per-unit price used, if any.
    pub price: Option<Decimal>,
    /// Trading day of `price` when it came from the market.
    pub price_date: Option<NaiveDate>,
    /// Market value net of sale commission; `None` values the account at book.
    pub market_value: Option<Decimal>,
    /// Cost basis of the units held.
    pub cost_basis: Decimal,
    /// Where the market value came from.
    pub source: ValueSource,
}

/// Valuation of every security in the chart.
#[derive(Debug, Clone, Default)]
pub struct Valuation {
    /// One entry per security account, in id order.
    pub securities: Vec<SecurityValuation>,
    /// Integrity problems found while valuing.
    pub issues: Vec<DataIntegrityError>,
}

impl Valuation {
    /// Valuation of `account_id`.
    #[must_use]
    pub fn get(&self, account_id: AccountId) -> Option<&SecurityValuation> {
        self.securities.iter().find(|s| s.account_id == account_id)
    }
}

/// Value every security of `chart` at `window.end`.
///
/// `transactions` should be the normalized ledger: quantities come from the
/// net quantity change, cost basis from the purchases since `window.start`.
pub fn value_securities(
    chart: &Chart,
    transactions: &[Transaction],
    window: ValuationWindow,
    prices: &dyn PriceSource,
    wash_sale_days: u32,
) -> Valuation {
    let ids: BTreeSet<AccountId> = chart.securities().map(|a| a.id).collect();
    let quantity_change = net_change(transactions, &ids, Metric::Quantity);
    let ledger = LotLedger::new(transactions, wash_sale_days);
    // Purchases on the closing date are held at the close
    let basis_end = window.end.succ_opt().unwrap_or(window.end);

    let mut valuation = Valuation::default();
    for account in chart.securities() {
        let Some(ticker) = account.security_ticker.as_deref() else {
            continue;
        };

        if account.end_value_overwrite.is_some() {
            valuation.issues.push(
                DataIntegrityError::new(
                    IntegrityCode::AmbiguousValuation,
                    format!("{} has both a ticker and an end-value overwrite", account.name),
                )
                .with_context("market price takes precedence"),
            );
        }

        let end_quantity = account.baseline_quantity
            + quantity_change.get(&account.id).copied().unwrap_or_default();

        let result = lookup_price(
            prices,
            ticker,
            window.end,
            window.max_retries,
            account.market_value_fallback,
        );
        let price_date = match result {
            PriceResult::Found { date, .. } => Some(date),
            _ => None,
        };
        let market_value = result
            .price()
            .map(|price| end_quantity * price * (Decimal::ONE - account.sale_commission));

        let cost_basis = if end_quantity.is_zero() {
            Decimal::ZERO
        } else {
            match ledger.cost_basis_at(account, window.start, basis_end, false) {
                Ok(per_unit) => per_unit * end_quantity,
                Err(issue) => {
                    tracing::warn!("{issue}");
                    valuation.issues.push(issue);
                    Decimal::ZERO
                }
            }
        };

        tracing::debug!(
            "{}: {end_quantity} units, market value {:?} ({}), cost basis {cost_basis}",
            account.name,
            market_value,
            result.source()
        );

        valuation.securities.push(SecurityValuation {
            account_id: account.id,
            name: account.name.clone(),
            ticker: ticker.to_string(),
            baseline_quantity: account.baseline_quantity,
            baseline_cost_basis: account.baseline_cost_basis,
            end_quantity,
            price: result.price(),
            price_date,
            market_value,
            cost_basis,
            source: result.source(),
        });
    }

    valuation
}
