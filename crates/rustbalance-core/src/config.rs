//! Run configuration.
//!
//! A [`RunConfig`] holds every parameter of a single run: the reporting
//! window, price lookup settings, and the naming conventions used to find
//! placeholder accounts and to name synthetic entries.

use chrono::{Local, NaiveDate};
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Invalid run configuration. Fatal before the run starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// Unknown price metric name.
    #[error("invalid price metric {0:?} (expected Open, High, Low, Close or Adj Close)")]
    InvalidPriceMetric(String),

    /// Reporting window ends before it starts.
    #[error("reporting window ends ({end}) before it starts ({start})")]
    InvalidWindow {
        /// Window start.
        start: NaiveDate,
        /// Window end.
        end: NaiveDate,
    },

    /// Deferred-tax window starts after the closing date.
    #[error("deferred-tax window starts ({start}) after the closing date ({end})")]
    InvalidDeferredTaxWindow {
        /// Deferred-tax window start.
        start: NaiveDate,
        /// Closing date.
        end: NaiveDate,
    },

    /// Accounting tolerance must be positive.
    #[error("accounting tolerance must be positive, got {0}")]
    InvalidTolerance(Decimal),

    /// A placeholder account name is empty.
    #[error("account name for {0} must not be empty")]
    EmptyAccountName(&'static str),
}

/// Which daily price to use when valuing securities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PriceMetric {
    /// Opening price.
    Open,
    /// Daily high.
    High,
    /// Daily low.
    Low,
    /// Closing price.
    Close,
    /// Close adjusted for splits and dividends.
    #[default]
    AdjClose,
}

impl FromStr for PriceMetric {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['_', '-'], " ").as_str() {
            "open" => Ok(Self::Open),
            "high" => Ok(Self::High),
            "low" => Ok(Self::Low),
            "close" => Ok(Self::Close),
            "adj close" | "adjclose" | "adjusted close" => Ok(Self::AdjClose),
            _ => Err(ConfigurationError::InvalidPriceMetric(s.to_string())),
        }
    }
}

impl fmt::Display for PriceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "Open"),
            Self::High => write!(f, "High"),
            Self::Low => write!(f, "Low"),
            Self::Close => write!(f, "Close"),
            Self::AdjClose => write!(f, "Adj Close"),
        }
    }
}

/// Names of the accounts and categories the run reads or synthesizes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountNames {
    /// Account credited with realized gains.
    pub realized_gain: String,
    /// Account debited with realized losses.
    pub realized_loss: String,
    /// Income category tagging realized gains.
    pub realized_gain_category: String,
    /// Expense category tagging realized losses.
    pub realized_loss_category: String,
    /// Marker contained in the unrealized-gain placeholder's name.
    pub unrealized_gain: String,
    /// Marker contained in the unrealized-loss placeholder's name.
    pub unrealized_loss: String,
    /// Liability account accruing deferred taxes.
    pub deferred_tax_payable: String,
    /// Equity account expensing deferred taxes.
    pub deferred_tax_expense: String,
    /// Name and type of the consolidated equity row.
    pub retained_earnings: String,
}

impl Default for AccountNames {
    fn default() -> Self {
        Self {
            realized_gain: "Gain - Realized Investment Gain".to_string(),
            realized_loss: "Loss - Realized Investment Loss".to_string(),
            realized_gain_category: "Investment - Realized Gains".to_string(),
            realized_loss_category: "Investment Expense - Realized Loss".to_string(),
            unrealized_gain: "Unrealized Investment Gain".to_string(),
            unrealized_loss: "Unrealized Investment Loss".to_string(),
            deferred_tax_payable: "Deferred Taxes Payable".to_string(),
            deferred_tax_expense: "Expense - Deferred Taxes".to_string(),
            retained_earnings: "Retained Earnings".to_string(),
        }
    }
}

impl AccountNames {
    /// Whether `name` is the unrealized-gain or unrealized-loss placeholder.
    #[must_use]
    pub fn is_unrealized(&self, name: &str) -> bool {
        name.contains(&self.unrealized_gain) || name.contains(&self.unrealized_loss)
    }
}

/// How capital expenditures are depreciated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepreciationRule {
    /// Expense category marking a capital expenditure.
    pub capex_category: String,
    /// Asset account decreased each month.
    pub asset_account: String,
    /// Expense account increased each month.
    pub expense_account: String,
    /// Expense category tagging depreciation entries.
    pub expense_category: String,
}

impl Default for DepreciationRule {
    fn default() -> Self {
        Self {
            capex_category: "Housing Expense - Fixture Investment".to_string(),
            asset_account: "PP&E - Fixtures".to_string(),
            expense_account: "Expense - Housing".to_string(),
            expense_category: "Housing Expense - Depreciation".to_string(),
        }
    }
}

/// Parameters of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Start of the reporting window; the cost-basis lookback starts here.
    pub start_date: NaiveDate,
    /// Start of the deferred-tax window.
    pub deferred_tax_start: NaiveDate,
    /// Closing date.
    pub end_date: NaiveDate,
    /// Retries (one day earlier each) after the first price attempt.
    pub max_price_retries: u32,
    /// Daily price used for valuation.
    pub price_metric: PriceMetric,
    /// Lookback window of a wash sale, in days.
    pub wash_sale_days: u32,
    /// Tolerance of the accounting-equation check.
    pub tolerance: Decimal,
    /// Placeholder and synthetic account names.
    pub names: AccountNames,
    /// Capital-expenditure depreciation rule.
    pub depreciation: DepreciationRule,
    /// Pass-through account name fragments excluded from deferred taxes.
    pub deferred_tax_exclusions: Vec<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            start_date: NaiveDate::from_ymd_opt(2021, 6, 25).unwrap_or_default(),
            deferred_tax_start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
            end_date: Local::now().date_naive(),
            max_price_retries: 5,
            price_metric: PriceMetric::default(),
            wash_sale_days: 7,
            tolerance: Decimal::new(1, 2),
            names: AccountNames::default(),
            depreciation: DepreciationRule::default(),
            deferred_tax_exclusions: vec!["Index Funds".to_string(), "A/R - Others".to_string()],
        }
    }
}

impl RunConfig {
    /// Create a config for the given window with default conventions.
    #[must_use]
    pub fn new(start_date: NaiveDate, deferred_tax_start: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date,
            deferred_tax_start,
            end_date,
            ..Default::default()
        }
    }

    /// Check the configuration before a run.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.end_date < self.start_date {
            return Err(ConfigurationError::InvalidWindow {
                start: self.start_date,
                end: self.end_date,
            });
        }
        if self.deferred_tax_start > self.end_date {
            return Err(ConfigurationError::InvalidDeferredTaxWindow {
                start: self.deferred_tax_start,
                end: self.end_date,
            });
        }
        if self.tolerance <= Decimal::ZERO {
            return Err(ConfigurationError::InvalidTolerance(self.tolerance));
        }
        let required = [
            ("realized gains", &self.names.realized_gain),
            ("realized losses", &self.names.realized_loss),
            ("unrealized gains", &self.names.unrealized_gain),
            ("unrealized losses", &self.names.unrealized_loss),
            ("deferred taxes payable", &self.names.deferred_tax_payable),
            ("deferred tax expense", &self.names.deferred_tax_expense),
            ("retained earnings", &self.names.retained_earnings),
        ];
        for (what, name) in required {
            if name.trim().is_empty() {
                return Err(ConfigurationError::EmptyAccountName(what));
            }
        }
        Ok(())
    }

    /// Whether a transaction touching these accounts is excluded from the
    /// deferred-tax base.
    #[must_use]
    pub fn is_tax_excluded(&self, account: &str) -> bool {
        self.deferred_tax_exclusions
            .iter()
            .any(|fragment| account.contains(fragment.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn test_price_metric_parse() {
        assert_eq!("Adj Close".parse::<PriceMetric>().unwrap(), PriceMetric::AdjClose);
        assert_eq!("adj_close".parse::<PriceMetric>().unwrap(), PriceMetric::AdjClose);
        assert_eq!("close".parse::<PriceMetric>().unwrap(), PriceMetric::Close);
        assert_eq!(
            "Median".parse::<PriceMetric>().unwrap_err(),
            ConfigurationError::InvalidPriceMetric("Median".to_string())
        );
    }

    #[test]
    fn test_validate_window() {
        let config = RunConfig::new(date(2024, 6, 1), date(2024, 1, 1), date(2024, 5, 1));
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidWindow { .. })
        ));

        let config = RunConfig::new(date(2024, 1, 1), date(2025, 1, 1), date(2024, 5, 1));
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidDeferredTaxWindow { .. })
        ));

        let config = RunConfig::new(date(2024, 1, 1), date(2024, 1, 1), date(2024, 5, 1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_tax_exclusion_matches_fragment() {
        let config = RunConfig::default();
        assert!(config.is_tax_excluded("401k - Index Funds"));
        assert!(config.is_tax_excluded("A/R - Others"));
        assert!(!config.is_tax_excluded("Cash - Checking"));
    }
}
