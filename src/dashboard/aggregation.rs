//! Aggregation queries behind the dashboard cards and chart.

use rusqlite::Connection;
use time::Date;

use crate::Error;

/// The overall profit and loss summary shown at the top of the dashboard.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfitLoss {
    /// The sum of all income entries.
    pub total_income: f64,
    /// The sum of all expense entries.
    pub total_expense: f64,
    /// Income minus expenses.
    pub profit: f64,
}

/// Compute the all-time profit and loss summary.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub fn get_profit_loss(connection: &Connection) -> Result<ProfitLoss, Error> {
    let (total_income, total_expense) = connection.query_row(
        "SELECT
            COALESCE(SUM(CASE WHEN transaction_type = 'INCOME' THEN total_price END), 0),
            COALESCE(SUM(CASE WHEN transaction_type = 'EXPENSE' THEN total_price END), 0)
         FROM \"transaction\"",
        [],
        |row| Ok((row.get::<usize, f64>(0)?, row.get::<usize, f64>(1)?)),
    )?;

    Ok(ProfitLoss {
        total_income,
        total_expense,
        profit: total_income - total_expense,
    })
}

/// Income and expense totals for one calendar month.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyTotals {
    /// The month label shown on the chart axis, e.g. "Apr 2025".
    pub label: String,
    /// The income total for the month.
    pub income: f64,
    /// The expense total for the month.
    pub expense: f64,
}

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

fn month_label(year_month: &str) -> String {
    let parts: Vec<&str> = year_month.splitn(2, '-').collect();
    let [year, month] = parts.as_slice() else {
        return year_month.to_owned();
    };

    month
        .parse::<usize>()
        .ok()
        .and_then(|month| MONTH_NAMES.get(month.wrapping_sub(1)))
        .map(|name| format!("{name} {year}"))
        .unwrap_or_else(|| year_month.to_owned())
}

/// Get per-month income and expense totals for the year ending at `today`.
///
/// Months with no transactions are omitted, the chart simply skips them.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub fn get_monthly_totals(
    today: Date,
    connection: &Connection,
) -> Result<Vec<MonthlyTotals>, Error> {
    let cutoff = today - time::Duration::days(365);

    let totals = connection
        .prepare(
            "SELECT
                strftime('%Y-%m', date) AS month,
                COALESCE(SUM(CASE WHEN transaction_type = 'INCOME' THEN total_price END), 0),
                COALESCE(SUM(CASE WHEN transaction_type = 'EXPENSE' THEN total_price END), 0)
             FROM \"transaction\"
             WHERE date >= ?1 AND date <= ?2
             GROUP BY month
             ORDER BY month ASC",
        )?
        .query_map([cutoff, today], |row| {
            let year_month: String = row.get(0)?;

            Ok(MonthlyTotals {
                label: month_label(&year_month),
                income: row.get(1)?,
                expense: row.get(2)?,
            })
        })?
        .map(|totals_result| totals_result.map_err(Error::SqlError))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(totals)
}

#[cfg(test)]
mod aggregation_tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        db::initialize,
        transaction::{TransactionType, create_transaction, sample_record},
    };

    use super::{get_monthly_totals, get_profit_loss, month_label};

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    fn insert_income(conn: &Connection, date: time::Date, amount: f64) {
        let mut record = sample_record(date);
        record.income_amount = amount;
        record.total_price = amount;
        create_transaction(record, conn).unwrap();
    }

    fn insert_expense(conn: &Connection, date: time::Date, amount: f64) {
        let mut record = sample_record(date);
        record.transaction_type = TransactionType::Expense;
        record.income_amount = 0.0;
        record.purchase_amount = amount;
        record.total_price = amount;
        create_transaction(record, conn).unwrap();
    }

    #[test]
    fn profit_loss_is_zero_for_empty_database() {
        let conn = get_test_connection();

        let profit_loss = get_profit_loss(&conn).unwrap();

        assert_eq!(profit_loss.total_income, 0.0);
        assert_eq!(profit_loss.total_expense, 0.0);
        assert_eq!(profit_loss.profit, 0.0);
    }

    #[test]
    fn profit_loss_sums_by_type() {
        let conn = get_test_connection();
        insert_income(&conn, date!(2025 - 04 - 05), 500.0);
        insert_income(&conn, date!(2025 - 04 - 06), 250.0);
        insert_expense(&conn, date!(2025 - 04 - 07), 300.0);

        let profit_loss = get_profit_loss(&conn).unwrap();

        assert_eq!(profit_loss.total_income, 750.0);
        assert_eq!(profit_loss.total_expense, 300.0);
        assert_eq!(profit_loss.profit, 450.0);
    }

    #[test]
    fn monthly_totals_group_by_month() {
        let conn = get_test_connection();
        insert_income(&conn, date!(2025 - 03 - 10), 100.0);
        insert_income(&conn, date!(2025 - 03 - 20), 50.0);
        insert_expense(&conn, date!(2025 - 04 - 01), 75.0);

        let totals = get_monthly_totals(date!(2025 - 04 - 30), &conn).unwrap();

        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0].label, "Mar 2025");
        assert_eq!(totals[0].income, 150.0);
        assert_eq!(totals[0].expense, 0.0);
        assert_eq!(totals[1].label, "Apr 2025");
        assert_eq!(totals[1].expense, 75.0);
    }

    #[test]
    fn monthly_totals_exclude_transactions_older_than_a_year() {
        let conn = get_test_connection();
        insert_income(&conn, date!(2023 - 01 - 01), 100.0);
        insert_income(&conn, date!(2025 - 04 - 01), 50.0);

        let totals = get_monthly_totals(date!(2025 - 04 - 30), &conn).unwrap();

        assert_eq!(totals.len(), 1);
        assert_eq!(totals[0].label, "Apr 2025");
    }

    #[test]
    fn month_label_formats_year_month() {
        assert_eq!(month_label("2025-04"), "Apr 2025");
        assert_eq!(month_label("2024-12"), "Dec 2024");
    }

    #[test]
    fn month_label_passes_through_unparsable_input() {
        assert_eq!(month_label("garbage"), "garbage");
    }
}
