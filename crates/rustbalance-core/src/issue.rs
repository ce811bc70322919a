//! Data-integrity problems found during a run.
//!
//! These are collected and reported by the consistency checker rather than
//! aborting the run: the affected row is skipped or zeroed, and the run
//! carries on.
//!
//! | Code | Description |
//! |------|-------------|
//! | D1001 | Account name does not resolve to an id |
//! | D1002 | Category does not resolve to a category group |
//! | D2001 | Close date earlier than initiation date |
//! | D3001 | Cost basis over zero net quantity |
//! | D3002 | Security sale without a quantity |
//! | D3003 | Capital expenditure without a usable lifetime |
//! | D4001 | Several valuation fallbacks could apply (warning) |

use chrono::NaiveDate;
use std::fmt;
use thiserror::Error;

/// Integrity problem codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IntegrityCode {
    /// D1001: Account name does not resolve to an id.
    UnresolvedAccount,
    /// D1002: Category does not resolve to a category group.
    UnresolvedCategory,
    /// D2001: Close date earlier than initiation date.
    NonChronological,
    /// D3001: Cost basis requested over zero net quantity.
    ZeroQuantityBasis,
    /// D3002: Security sale without a quantity.
    MissingQuantity,
    /// D3003: Capital expenditure without a usable lifetime.
    InvalidLifetime,
    /// D4001: Several valuation fallbacks could apply.
    AmbiguousValuation,
}

impl IntegrityCode {
    /// Get the code string (e.g., "D1001").
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::UnresolvedAccount => "D1001",
            Self::UnresolvedCategory => "D1002",
            Self::NonChronological => "D2001",
            Self::ZeroQuantityBasis => "D3001",
            Self::MissingQuantity => "D3002",
            Self::InvalidLifetime => "D3003",
            Self::AmbiguousValuation => "D4001",
        }
    }

    /// Check if this is a warning (not an error).
    #[must_use]
    pub const fn is_warning(&self) -> bool {
        matches!(self, Self::AmbiguousValuation)
    }
}

impl fmt::Display for IntegrityCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A data-integrity error, fatal to the affected row only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[{code}] {message}")]
pub struct DataIntegrityError {
    /// Error code.
    pub code: IntegrityCode,
    /// Error message.
    pub message: String,
    /// Date of the affected transaction, if any.
    pub date: Option<NaiveDate>,
    /// Additional context.
    pub context: Option<String>,
}

impl DataIntegrityError {
    /// Create a new integrity error.
    #[must_use]
    pub fn new(code: IntegrityCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            date: None,
            context: None,
        }
    }

    /// Attach the affected date.
    #[must_use]
    pub const fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    /// Add context to this error.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}
