//! Financial KPIs.
//!
//! Balance-sheet figures come from the classification and account-type
//! tiers at market value. Revenue and net income come from the operations
//! of the equity rows folded into retained earnings, since those are the
//! revenue, expense, gain and loss accounts.
//!
//! Ratios with a zero divisor are absent rather than infinite.

use crate::rollup::BalanceSheet;
use rust_decimal::Decimal;
use rustbalance_core::Classification;
use std::fmt;

/// Account types counted as liquid assets.
pub const LIQUID_TYPES: [&str; 2] = ["Cash", "Marketable Securities"];

/// Headline KPIs of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Kpis {
    /// Total assets at market value.
    pub total_assets: Decimal,
    /// Liquid assets at market value.
    pub liquid_assets: Decimal,
    /// Total liabilities at market value.
    pub total_liabilities: Decimal,
    /// Revenue over the window.
    pub revenue: Decimal,
    /// Revenue and gains minus expenses and losses.
    pub net_income: Decimal,
    /// Liquid assets minus liabilities.
    pub liquid_net_assets: Decimal,
    /// Assets over liabilities.
    pub current_ratio: Option<Decimal>,
    /// Liquid assets over liabilities.
    pub cash_ratio: Option<Decimal>,
    /// Revenue over assets.
    pub asset_turnover: Option<Decimal>,
    /// Net income over revenue.
    pub net_profit_margin: Option<Decimal>,
    /// Net income over assets.
    pub return_on_assets: Option<Decimal>,
}

/// A named KPI value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KpiValue {
    /// Metric label.
    pub metric: &'static str,
    /// Value; `None` when undefined.
    pub value: Option<Decimal>,
}

impl fmt::Display for KpiValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            Some(value) => write!(f, "{}: {}", self.metric, value.round_dp(4)),
            None => write!(f, "{}: n/a", self.metric),
        }
    }
}

impl Kpis {
    /// The reported metrics, in presentation order.
    #[must_use]
    pub fn metrics(&self) -> [KpiValue; 6] {
        [
            KpiValue {
                metric: "liquid net assets minus liabilities",
                value: Some(self.liquid_net_assets),
            },
            KpiValue {
                metric: "current ratio",
                value: self.current_ratio,
            },
            KpiValue {
                metric: "cash ratio",
                value: self.cash_ratio,
            },
            KpiValue {
                metric: "asset turnover",
                value: self.asset_turnover,
            },
            KpiValue {
                metric: "net profit margin",
                value: self.net_profit_margin,
            },
            KpiValue {
                metric: "return on assets",
                value: self.return_on_assets,
            },
        ]
    }
}

/// Compute the KPIs of `sheet`.
#[must_use]
pub fn kpis(sheet: &BalanceSheet) -> Kpis {
    let total_assets = sheet.total(Classification::Asset);
    let total_liabilities = sheet.total(Classification::Liability);
    let liquid_assets: Decimal = sheet
        .types
        .iter()
        .filter(|row| {
            row.classification == Classification::Asset
                && LIQUID_TYPES.contains(&row.account_type.as_str())
        })
        .map(|row| row.sign.vector() * row.figures.market_value)
        .sum();

    let operations = |types: &[&str]| -> Decimal {
        sheet
            .consolidated
            .iter()
            .filter(|row| types.contains(&row.account_type.as_str()))
            .map(|row| row.figures.operations)
            .sum()
    };
    let revenue = operations(&["Revenue"]);
    let net_income = operations(&["Revenue", "Gain"]) - operations(&["Expense", "Loss"]);

    Kpis {
        total_assets,
        liquid_assets,
        total_liabilities,
        revenue,
        net_income,
        liquid_net_assets: liquid_assets - total_liabilities,
        current_ratio: total_assets.checked_div(total_liabilities),
        cash_ratio: liquid_assets.checked_div(total_liabilities),
        asset_turnover: revenue.checked_div(total_assets),
        net_profit_margin: net_income.checked_div(revenue),
        return_on_assets: net_income.checked_div(total_assets),
    }
}
