//! Typed CSV rows and their conversion into core types.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rustbalance_booking::Quote;
use rustbalance_core::{
    Account, AccountId, Category, CategoryKind, Classification, Impact, SecurityFlag, Sign,
    TaxRates, Transaction,
};
use serde::Deserialize;

/// Accepted date layouts, tried in order.
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%y", "%m/%d/%Y"];

pub(crate) fn parse_date(field: &str, value: &str) -> Result<NaiveDate, String> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
        .ok_or_else(|| format!("{field}: invalid date {value:?}"))
}

/// `1`/`0`, `true`/`false`, `yes`/`no`; empty is false.
pub(crate) fn parse_flag(field: &str, value: Option<&str>) -> Result<bool, String> {
    match value.map(str::to_lowercase).as_deref() {
        None | Some("" | "0" | "false" | "no" | "n") => Ok(false),
        Some("1" | "true" | "yes" | "y") => Ok(true),
        Some(other) => Err(format!("{field}: invalid flag {other:?}")),
    }
}

fn field<T: std::str::FromStr<Err = String>>(name: &str, value: &str) -> Result<T, String> {
    value.parse().map_err(|e| format!("{name}: {e}"))
}

#[derive(Debug, Deserialize)]
pub(crate) struct AccountRow {
    id: AccountId,
    name: String,
    #[serde(rename = "type")]
    account_type: String,
    classification: String,
    sign: String,
    report_rank: Option<i64>,
    baseline_value: Option<Decimal>,
    baseline_quantity: Option<Decimal>,
    baseline_cost_basis: Option<Decimal>,
    end_value_overwrite: Option<Decimal>,
    deferred_tax_rate: Option<Decimal>,
    pre_tax: Option<String>,
    security_ticker: Option<String>,
    market_value_fallback: Option<Decimal>,
    sale_commission: Option<Decimal>,
}

impl AccountRow {
    pub(crate) fn into_account(self) -> Result<Account, String> {
        let mut account = Account::new(
            self.id,
            self.name,
            self.account_type,
            field::<Classification>("classification", &self.classification)?,
            field::<Sign>("sign", &self.sign)?,
        )
        .with_baseline(self.baseline_value.unwrap_or_default());

        if let Some(rank) = self.report_rank {
            account = account.with_rank(rank);
        }
        if let Some(ticker) = self.security_ticker.filter(|t| !t.is_empty()) {
            account = account.with_security(
                ticker,
                self.baseline_quantity.unwrap_or_default(),
                self.baseline_cost_basis.unwrap_or_default(),
            );
        }
        if let Some(value) = self.end_value_overwrite {
            account = account.with_overwrite(value);
        }
        if let Some(value) = self.market_value_fallback {
            account = account.with_fallback(value);
        }
        if let Some(rate) = self.deferred_tax_rate {
            account = account.with_deferred_tax(rate, parse_flag("pre_tax", self.pre_tax.as_deref())?);
        }
        if let Some(fraction) = self.sale_commission {
            account = account.with_sale_commission(fraction);
        }
        Ok(account)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct TransactionRow {
    close_date: String,
    init_date: Option<String>,
    #[serde(default)]
    description: String,
    first_account: String,
    first_sign: String,
    second_account: String,
    second_sign: String,
    amount: Decimal,
    quantity: Option<Decimal>,
    expense_category: Option<String>,
    income_category: Option<String>,
    security_flag: Option<String>,
    wash_sale: Option<String>,
    lifetime_months: Option<Decimal>,
}

impl TransactionRow {
    pub(crate) fn into_transaction(self) -> Result<Transaction, String> {
        let close_date = parse_date("close_date", &self.close_date)?;
        let mut txn = Transaction::new(
            close_date,
            self.description,
            Impact::new(self.first_account, field::<Sign>("first_sign", &self.first_sign)?),
            Impact::new(self.second_account, field::<Sign>("second_sign", &self.second_sign)?),
            self.amount,
        );

        if let Some(init) = self.init_date.filter(|d| !d.is_empty()) {
            txn = txn.with_init_date(parse_date("init_date", &init)?);
        }
        if let Some(quantity) = self.quantity {
            txn = txn.with_quantity(quantity);
        }
        if let Some(category) = self.expense_category.filter(|c| !c.is_empty()) {
            txn = txn.with_expense_category(category);
        }
        if let Some(category) = self.income_category.filter(|c| !c.is_empty()) {
            txn = txn.with_income_category(category);
        }
        if let Some(flag) = self.security_flag.filter(|f| !f.is_empty()) {
            txn = txn.with_security_flag(field::<SecurityFlag>("security_flag", &flag)?);
        }
        if parse_flag("wash_sale", self.wash_sale.as_deref())? {
            txn = txn.with_wash_sale();
        }
        if let Some(months) = self.lifetime_months {
            txn = txn.with_lifetime(months);
        }
        Ok(txn)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CategoryRow {
    name: String,
    group_id: Option<u32>,
    group: Option<String>,
    primary: Option<String>,
    secondary: Option<String>,
    after_offset: Option<String>,
    offset: Option<String>,
    operational: Option<String>,
    deferred_tax: Option<String>,
    federal_rate: Option<Decimal>,
    state_rate: Option<Decimal>,
    fica_rate: Option<Decimal>,
    tax_offsetting: Option<String>,
}

impl CategoryRow {
    pub(crate) fn into_category(self, kind: CategoryKind) -> Result<Category, String> {
        let mut category = Category::new(self.name, kind, self.group_id.unwrap_or_default());
        category.group_id = self.group_id;
        category.group = self.group.filter(|g| !g.is_empty());
        category.primary = self.primary.filter(|p| !p.is_empty());
        category.secondary = self.secondary.filter(|s| !s.is_empty());

        if parse_flag("offset", self.offset.as_deref())? {
            if let Some(target) = self.after_offset.filter(|t| !t.is_empty()) {
                category = category.with_offset(target);
            } else {
                return Err("offset: an offsetting category needs after_offset".to_string());
            }
        }
        // Operational unless stated otherwise
        if self.operational.as_deref().is_some_and(|v| !v.is_empty())
            && !parse_flag("operational", self.operational.as_deref())?
        {
            category = category.non_operational();
        }
        if parse_flag("deferred_tax", self.deferred_tax.as_deref())? {
            let rates = TaxRates::new(
                self.federal_rate.unwrap_or_default(),
                self.state_rate.unwrap_or_default(),
                self.fica_rate.unwrap_or_default(),
            );
            category = category
                .with_deferred_tax(rates, parse_flag("tax_offsetting", self.tax_offsetting.as_deref())?);
        }
        Ok(category)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct PriceRow {
    ticker: String,
    date: String,
    open: Option<Decimal>,
    high: Option<Decimal>,
    low: Option<Decimal>,
    close: Option<Decimal>,
    adj_close: Option<Decimal>,
}

impl PriceRow {
    pub(crate) fn into_quote(self) -> Result<(String, NaiveDate, Quote), String> {
        let date = parse_date("date", &self.date)?;
        Ok((
            self.ticker,
            date,
            Quote {
                open: self.open,
                high: self.high,
                low: self.low,
                close: self.close,
                adj_close: self.adj_close,
            },
        ))
    }
}
