//! Market price lookup.
//!
//! A [`PriceSource`] answers a single `(ticker, date)` attempt. The lookup
//! walks back one day per retry until a price is found or the retry budget is
//! spent, then falls back to the account's configured per-share value.

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use rustbalance_core::PriceMetric;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use thiserror::Error;

/// A source of daily prices.
pub trait PriceSource {
    /// Price of `ticker` on exactly `date`, if the source has one.
    fn attempt(&self, ticker: &str, date: NaiveDate) -> Option<Decimal>;

    /// Name used in logs.
    fn name(&self) -> &str {
        "prices"
    }
}

/// Where a valuation figure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueSource {
    /// Market price on the closing date.
    Exact,
    /// Market price from an earlier trading day.
    PreviousClose,
    /// Configured fallback value.
    Fallback,
    /// Book value (baseline plus operations).
    BookValue,
    /// Externally supplied end value.
    Overwrite,
}

impl fmt::Display for ValueSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact => write!(f, "exact"),
            Self::PreviousClose => write!(f, "previous close"),
            Self::Fallback => write!(f, "fallback"),
            Self::BookValue => write!(f, "book value"),
            Self::Overwrite => write!(f, "overwrite"),
        }
    }
}

/// Outcome of a price lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceResult {
    /// A market price was found.
    Found {
        /// Price per unit.
        price: Decimal,
        /// Trading day the price is from.
        date: NaiveDate,
        /// Whether `date` is the requested date.
        exact: bool,
    },
    /// Retries exhausted; the configured per-unit fallback applies.
    Fallback(Decimal),
    /// Retries exhausted and no fallback is configured.
    Unavailable,
}

impl PriceResult {
    /// Per-unit price, if any.
    #[must_use]
    pub const fn price(&self) -> Option<Decimal> {
        match self {
            Self::Found { price, .. } | Self::Fallback(price) => Some(*price),
            Self::Unavailable => None,
        }
    }

    /// Source tag of this result.
    #[must_use]
    pub const fn source(&self) -> ValueSource {
        match self {
            Self::Found { exact: true, .. } => ValueSource::Exact,
            Self::Found { exact: false, .. } => ValueSource::PreviousClose,
            Self::Fallback(_) => ValueSource::Fallback,
            Self::Unavailable => ValueSource::BookValue,
        }
    }
}

/// Every attempt of a lookup came back empty.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no price for {ticker} in the {attempts} trading days up to {date}")]
pub struct LookupExhausted {
    /// Ticker looked up.
    pub ticker: String,
    /// Requested date.
    pub date: NaiveDate,
    /// Number of attempts made.
    pub attempts: u32,
}

/// Look up `ticker` on `date`, retrying up to `max_retries` times one day
/// earlier each time.
///
/// An exhausted lookup is recovered: `fallback` is used when present,
/// otherwise the result is [`PriceResult::Unavailable`].
pub fn lookup_price(
    source: &dyn PriceSource,
    ticker: &str,
    date: NaiveDate,
    max_retries: u32,
    fallback: Option<Decimal>,
) -> PriceResult {
    let mut attempts = 0;
    for back in 0..=max_retries {
        let Some(day) = date.checked_sub_days(Days::new(u64::from(back))) else {
            break;
        };
        attempts += 1;
        if let Some(price) = source.attempt(ticker, day) {
            if back > 0 {
                tracing::debug!("{ticker}: using {day} price from {}", source.name());
            }
            return PriceResult::Found {
                price,
                date: day,
                exact: back == 0,
            };
        }
    }

    let exhausted = LookupExhausted {
        ticker: ticker.to_string(),
        date,
        attempts,
    };
    match fallback {
        Some(price) => {
            tracing::warn!("{exhausted}; using fallback {price}");
            PriceResult::Fallback(price)
        }
        None => {
            tracing::warn!("{exhausted}; no fallback, valuing at book");
            PriceResult::Unavailable
        }
    }
}

/// One day of prices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Quote {
    /// Opening price.
    pub open: Option<Decimal>,
    /// Daily high.
    pub high: Option<Decimal>,
    /// Daily low.
    pub low: Option<Decimal>,
    /// Closing price.
    pub close: Option<Decimal>,
    /// Adjusted close.
    pub adj_close: Option<Decimal>,
}

impl Quote {
    /// The price for `metric`.
    #[must_use]
    pub const fn get(&self, metric: PriceMetric) -> Option<Decimal> {
        match metric {
            PriceMetric::Open => self.open,
            PriceMetric::High => self.high,
            PriceMetric::Low => self.low,
            PriceMetric::Close => self.close,
            PriceMetric::AdjClose => self.adj_close,
        }
    }
}

/// Offline daily price history.
#[derive(Debug, Clone, Default)]
pub struct PriceTable {
    metric: PriceMetric,
    quotes: HashMap<String, BTreeMap<NaiveDate, Quote>>,
}

impl PriceTable {
    /// Create an empty table answering with `metric`.
    #[must_use]
    pub fn new(metric: PriceMetric) -> Self {
        Self {
            metric,
            quotes: HashMap::new(),
        }
    }

    /// Metric this table answers with.
    #[must_use]
    pub const fn metric(&self) -> PriceMetric {
        self.metric
    }

    /// Add or replace the quote of `ticker` on `date`.
    pub fn insert(&mut self, ticker: impl Into<String>, date: NaiveDate, quote: Quote) {
        self.quotes
            .entry(ticker.into())
            .or_default()
            .insert(date, quote);
    }

    /// The quote of `ticker` on `date`.
    #[must_use]
    pub fn get(&self, ticker: &str, date: NaiveDate) -> Option<&Quote> {
        self.quotes.get(ticker)?.get(&date)
    }

    /// Number of tickers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    /// Whether the table holds no quotes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}

impl PriceSource for PriceTable {
    fn attempt(&self, ticker: &str, date: NaiveDate) -> Option<Decimal> {
        self.get(ticker, date)?.get(self.metric)
    }

    fn name(&self) -> &str {
        "price table"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::cell::Cell;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    struct Empty {
        calls: Cell<u32>,
    }

    impl PriceSource for Empty {
        fn attempt(&self, _ticker: &str, _date: NaiveDate) -> Option<Decimal> {
            self.calls.set(self.calls.get() + 1);
            None
        }
    }

    fn table() -> PriceTable {
        let mut table = PriceTable::new(PriceMetric::AdjClose);
        table.insert(
            "VTI",
            date(2024, 3, 1),
            Quote {
                close: Some(dec!(250)),
                adj_close: Some(dec!(248.5)),
                ..Quote::default()
            },
        );
        table
    }

    #[test]
    fn test_exact_hit() {
        let result = lookup_price(&table(), "VTI", date(2024, 3, 1), 5, None);
        assert_eq!(
            result,
            PriceResult::Found {
                price: dec!(248.5),
                date: date(2024, 3, 1),
                exact: true
            }
        );
        assert_eq!(result.source(), ValueSource::Exact);
    }

    #[test]
    fn test_weekend_walks_back() {
        // 2024-03-03 is a Sunday; Friday's close is used.
        let result = lookup_price(&table(), "VTI", date(2024, 3, 3), 5, None);
        assert_eq!(result.price(), Some(dec!(248.5)));
        assert_eq!(result.source(), ValueSource::PreviousClose);
    }

    #[test]
    fn test_metric_selects_column() {
        let mut prices = table();
        prices.metric = PriceMetric::Close;
        assert_eq!(prices.attempt("VTI", date(2024, 3, 1)), Some(dec!(250)));

        prices.metric = PriceMetric::Open;
        assert_eq!(prices.attempt("VTI", date(2024, 3, 1)), None);
    }

    #[test]
    fn test_exhausted_uses_fallback() {
        let source = Empty {
            calls: Cell::new(0),
        };
        let result = lookup_price(&source, "ABC", date(2024, 3, 1), 5, Some(dec!(12)));

        assert_eq!(source.calls.get(), 6);
        assert_eq!(result, PriceResult::Fallback(dec!(12)));
        assert_eq!(result.source().to_string(), "fallback");
    }

    #[test]
    fn test_exhausted_without_fallback() {
        let source = Empty {
            calls: Cell::new(0),
        };
        let result = lookup_price(&source, "ABC", date(2024, 3, 1), 0, None);

        assert_eq!(source.calls.get(), 1);
        assert_eq!(result, PriceResult::Unavailable);
        assert_eq!(result.price(), None);
        assert_eq!(result.source(), ValueSource::BookValue);
    }

    #[test]
    fn test_retry_window_is_bounded() {
        // Price six days back is out of reach with five retries.
        let result = lookup_price(&table(), "VTI", date(2024, 3, 7), 5, None);
        assert_eq!(result, PriceResult::Unavailable);

        let result = lookup_price(&table(), "VTI", date(2024, 3, 6), 5, None);
        assert_eq!(result.price(), Some(dec!(248.5)));
    }
}
