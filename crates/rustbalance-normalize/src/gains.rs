//! Realized gain and loss splitting.
//!
//! A security sale books its full proceeds against the security account. The
//! split rewrites the sale to move only the cost basis of the units sold, and
//! books the difference as one realized gain (or loss) entry.

use rust_decimal::Decimal;
use rustbalance_booking::LotLedger;
use rustbalance_core::{
    Account, Chart, DataIntegrityError, Impact, IntegrityCode, Origin, RunConfig, Transaction,
};

/// Result of splitting security sales.
#[derive(Debug, Clone, Default)]
pub struct RealizedSplit {
    /// Input transactions with sales rewritten, each followed by its gain or
    /// loss entry.
    pub transactions: Vec<Transaction>,
    /// Sales left unsplit.
    pub issues: Vec<DataIntegrityError>,
    /// Number of sales split.
    pub split: usize,
}

/// Split every sale in `transactions` into cost basis and realized gain/loss.
pub fn split_realized(
    transactions: Vec<Transaction>,
    chart: &Chart,
    config: &RunConfig,
) -> RealizedSplit {
    let ledger = LotLedger::new(&transactions, config.wash_sale_days);
    let outcomes: Vec<_> = transactions
        .iter()
        .map(|t| t.is_sale().then(|| realize(&ledger, t, chart, config)))
        .collect();

    let mut result = RealizedSplit {
        transactions: Vec::with_capacity(transactions.len() + outcomes.len()),
        ..RealizedSplit::default()
    };

    for (mut txn, outcome) in transactions.into_iter().zip(outcomes) {
        match outcome {
            None => result.transactions.push(txn),
            Some(Ok((basis, entry))) => {
                txn.amount = basis;
                result.transactions.push(txn);
                result.transactions.push(entry);
                result.split += 1;
            }
            Some(Err(issue)) => {
                tracing::warn!("leaving sale unsplit: {issue}");
                result.issues.push(issue);
                result.transactions.push(txn);
            }
        }
    }

    result
}

/// Cost basis of a sale and its gain or loss entry.
fn realize(
    ledger: &LotLedger<'_>,
    sale: &Transaction,
    chart: &Chart,
    config: &RunConfig,
) -> Result<(Decimal, Transaction), DataIntegrityError> {
    let (cash, security) = sale_legs(sale, chart).ok_or_else(|| {
        DataIntegrityError::new(
            IntegrityCode::UnresolvedAccount,
            format!(
                "sale between {:?} and {:?} names no known security account",
                sale.first.account, sale.second.account
            ),
        )
        .with_date(sale.close_date)
        .with_context(sale.description.clone())
    })?;

    let basis = ledger.sale_basis(security, sale, config.start_date)?;
    let names = &config.names;

    let entry = if basis <= sale.amount {
        Transaction::new(
            sale.close_date,
            "Realized Investment Gain / Loss",
            Impact::new(cash.account.clone(), cash.sign),
            Impact::increase(&names.realized_gain),
            sale.amount - basis,
        )
        .with_income_category(&names.realized_gain_category)
    } else {
        Transaction::new(
            sale.close_date,
            "Realized Investment Gain / Loss",
            Impact::new(cash.account.clone(), cash.sign.flip()),
            Impact::increase(&names.realized_loss),
            basis - sale.amount,
        )
        .with_expense_category(&names.realized_loss_category)
    };

    Ok((basis, entry.with_origin(Origin::RealizedGainLoss)))
}

/// The cash impact and the security account of a sale.
///
/// The security side is the impact on a priced security; when neither side
/// carries a ticker, the second impact is taken as the security.
fn sale_legs<'t, 'c>(sale: &'t Transaction, chart: &'c Chart) -> Option<(&'t Impact, &'c Account)> {
    let first = chart.by_name(&sale.first.account);
    let second = chart.by_name(&sale.second.account);

    match (first, second) {
        (Some(account), _) if account.is_security() => Some((&sale.second, account)),
        (_, Some(account)) => Some((&sale.first, account)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use rustbalance_core::{Classification, SecurityFlag, Sign};

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn chart() -> Chart {
        Chart::new(vec![
            Account::new(1, "Cash - Brokerage", "Cash", Classification::Asset, Sign::Positive),
            Account::new(
                2,
                "Brokerage - ABC",
                "Marketable Securities",
                Classification::Asset,
                Sign::Positive,
            )
            .with_baseline(dec!(1000))
            .with_security("ABC", dec!(100), dec!(1000)),
        ])
        .unwrap()
    }

    fn sale(amount: Decimal, quantity: Decimal) -> Transaction {
        Transaction::new(
            date(2024, 6, 3),
            "Sell ABC",
            Impact::increase("Cash - Brokerage"),
            Impact::decrease("Brokerage - ABC"),
            amount,
        )
        .with_quantity(quantity)
        .with_security_flag(SecurityFlag::Sale)
    }

    #[test]
    fn test_gain_splits_sale() {
        let config = RunConfig::default();
        let result = split_realized(vec![sale(dec!(1500), dec!(100))], &chart(), &config);

        assert_eq!(result.split, 1);
        assert!(result.issues.is_empty());
        assert_eq!(result.transactions.len(), 2);
        assert_eq!(result.transactions[0].amount, dec!(1000));

        let gain = &result.transactions[1];
        assert_eq!(gain.amount, dec!(500));
        assert_eq!(gain.first.account, "Cash - Brokerage");
        assert_eq!(gain.first.sign, Sign::Positive);
        assert_eq!(gain.second.account, config.names.realized_gain);
        assert_eq!(
            gain.income_category.as_deref(),
            Some(config.names.realized_gain_category.as_str())
        );
        assert_eq!(gain.close_date, gain.init_date);
        assert_eq!(gain.origin, Origin::RealizedGainLoss);
    }

    #[test]
    fn test_loss_flips_cash_side() {
        let config = RunConfig::default();
        let result = split_realized(vec![sale(dec!(400), dec!(50))], &chart(), &config);

        assert_eq!(result.transactions[0].amount, dec!(500));
        let loss = &result.transactions[1];
        assert_eq!(loss.amount, dec!(100));
        assert_eq!(loss.first.sign, Sign::Negative);
        assert_eq!(loss.second.account, config.names.realized_loss);
        assert_eq!(
            loss.expense_category.as_deref(),
            Some(config.names.realized_loss_category.as_str())
        );
    }

    #[test]
    fn test_break_even_is_zero_gain() {
        let config = RunConfig::default();
        let result = split_realized(vec![sale(dec!(1000), dec!(100))], &chart(), &config);
        assert_eq!(result.transactions.len(), 2);
        assert_eq!(result.transactions[1].amount, Decimal::ZERO);
        assert_eq!(result.transactions[1].second.account, config.names.realized_gain);
    }

    #[test]
    fn test_security_on_first_side() {
        let config = RunConfig::default();
        let txn = Transaction::new(
            date(2024, 6, 3),
            "Sell ABC",
            Impact::decrease("Brokerage - ABC"),
            Impact::increase("Cash - Brokerage"),
            dec!(1500),
        )
        .with_quantity(dec!(100))
        .with_security_flag(SecurityFlag::Sale);

        let result = split_realized(vec![txn], &chart(), &config);
        assert_eq!(result.transactions[1].first.account, "Cash - Brokerage");
        assert_eq!(result.transactions[1].amount, dec!(500));
    }

    #[test]
    fn test_wash_sale_without_purchases_left_unsplit() {
        let config = RunConfig::default();
        let result = split_realized(
            vec![sale(dec!(1500), dec!(100)).with_wash_sale()],
            &chart(),
            &config,
        );

        assert_eq!(result.split, 0);
        assert_eq!(result.transactions.len(), 1);
        assert_eq!(result.transactions[0].amount, dec!(1500));
        assert_eq!(result.issues[0].code, IntegrityCode::ZeroQuantityBasis);
    }

    #[test]
    fn test_unknown_accounts_left_unsplit() {
        let config = RunConfig::default();
        let txn = Transaction::new(
            date(2024, 6, 3),
            "Sell XYZ",
            Impact::increase("Cash - Elsewhere"),
            Impact::decrease("Brokerage - XYZ"),
            dec!(10),
        )
        .with_quantity(dec!(1))
        .with_security_flag(SecurityFlag::Sale);

        let result = split_realized(vec![txn], &chart(), &config);
        assert_eq!(result.issues[0].code, IntegrityCode::UnresolvedAccount);
        assert_eq!(result.transactions.len(), 1);
    }
}
