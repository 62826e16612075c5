//! Database query helpers for the reports page.

use rusqlite::{Connection, ToSql};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::Error;

use super::core::{BirdCategory, PaymentMethod, Transaction, TransactionType, map_transaction_row};

/// The column to sort transactions by in a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    /// Sort by transaction date.
    Date,
    /// Sort by income/expense type.
    Type,
    /// Sort by bird category.
    Category,
    /// Sort by the number of birds.
    Quantity,
    /// Sort by payment method.
    PaymentMethod,
    /// Sort by the derived total.
    Price,
}

impl SortField {
    /// The database column backing this sort field.
    fn column(&self) -> &'static str {
        match self {
            SortField::Date => "date",
            SortField::Type => "transaction_type",
            SortField::Category => "category",
            SortField::Quantity => "quantity",
            SortField::PaymentMethod => "payment_method",
            SortField::Price => "total_price",
        }
    }

    /// The value used for this field in query strings.
    pub fn as_query_value(&self) -> &'static str {
        match self {
            SortField::Date => "date",
            SortField::Type => "type",
            SortField::Category => "category",
            SortField::Quantity => "quantity",
            SortField::PaymentMethod => "payment_method",
            SortField::Price => "price",
        }
    }
}

/// The order to sort transactions in a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Sort in order of increasing value.
    #[serde(rename = "asc")]
    Ascending,
    /// Sort in order of decreasing value.
    #[serde(rename = "desc")]
    Descending,
}

impl SortOrder {
    fn direction(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        }
    }

    /// The value used for this order in query strings.
    pub fn as_query_value(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "asc",
            SortOrder::Descending => "desc",
        }
    }

    /// The opposite sort order, used by the column header toggle links.
    pub fn reversed(&self) -> Self {
        match self {
            SortOrder::Ascending => SortOrder::Descending,
            SortOrder::Descending => SortOrder::Ascending,
        }
    }
}

/// The optional filters applied to the reports page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionFilters {
    /// Only include transactions on or after this date.
    pub start_date: Option<Date>,
    /// Only include transactions on or before this date.
    pub end_date: Option<Date>,
    /// Only include transactions of this type.
    pub transaction_type: Option<TransactionType>,
    /// Only include transactions for this kind of bird.
    pub category: Option<BirdCategory>,
    /// Only include transactions paid this way.
    pub payment_method: Option<PaymentMethod>,
}

impl TransactionFilters {
    /// Whether any filter is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Build the WHERE clause and its parameters for these filters.
    ///
    /// Returns an empty clause when no filter is set.
    fn where_clause(&self) -> (String, Vec<Box<dyn ToSql>>) {
        let mut conditions: Vec<&str> = Vec::new();
        let mut params: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(start_date) = self.start_date {
            conditions.push("date >= ?");
            params.push(Box::new(start_date));
        }

        if let Some(end_date) = self.end_date {
            conditions.push("date <= ?");
            params.push(Box::new(end_date));
        }

        if let Some(transaction_type) = self.transaction_type {
            conditions.push("transaction_type = ?");
            params.push(Box::new(transaction_type));
        }

        if let Some(category) = self.category {
            conditions.push("category = ?");
            params.push(Box::new(category));
        }

        if let Some(payment_method) = self.payment_method {
            conditions.push("payment_method = ?");
            params.push(Box::new(payment_method));
        }

        if conditions.is_empty() {
            (String::new(), params)
        } else {
            (format!("WHERE {}", conditions.join(" AND ")), params)
        }
    }
}

/// Count the transactions matching `filters`.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub fn count_matching_transactions(
    filters: &TransactionFilters,
    connection: &Connection,
) -> Result<u64, Error> {
    let (where_clause, params) = filters.where_clause();
    let query = format!("SELECT COUNT(id) FROM \"transaction\" {where_clause}");

    connection
        .prepare(&query)?
        .query_row(rusqlite::params_from_iter(params.iter()), |row| {
            row.get::<_, i64>(0).map(|count| count as u64)
        })
        .map_err(|error| error.into())
}

/// Get one page of transactions matching `filters`.
///
/// Rows are sorted by `sort_field` in `sort_order` and then by ID, to keep
/// the order stable for rows that compare equal.
///
/// # Errors
/// Returns [Error::SqlError] if:
/// - SQL query preparation or execution fails
/// - Transaction row mapping fails
pub fn get_transaction_page(
    filters: &TransactionFilters,
    sort_field: SortField,
    sort_order: SortOrder,
    page_size: u64,
    page: u64,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let (where_clause, params) = filters.where_clause();
    let offset = page.saturating_sub(1) * page_size;

    let query = format!(
        "SELECT id, date, sale_type, transaction_type, category, gender, quantity, \
         payment_method, details, income_amount, purchase_amount, salary_amount, others_amount, \
         total_price, import_id FROM \"transaction\" {where_clause} \
         ORDER BY {} {}, id ASC LIMIT {page_size} OFFSET {offset}",
        sort_field.column(),
        sort_order.direction(),
    );

    connection
        .prepare(&query)?
        .query_map(rusqlite::params_from_iter(params.iter()), map_transaction_row)?
        .map(|transaction_result| transaction_result.map_err(Error::SqlError))
        .collect()
}

/// Get every transaction, newest first. Used by the spreadsheet export.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub fn get_all_transactions(connection: &Connection) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(
            "SELECT id, date, sale_type, transaction_type, category, gender, quantity, \
             payment_method, details, income_amount, purchase_amount, salary_amount, \
             others_amount, total_price, import_id FROM \"transaction\" \
             ORDER BY date DESC, id ASC",
        )?
        .query_map([], map_transaction_row)?
        .map(|transaction_result| transaction_result.map_err(Error::SqlError))
        .collect()
}

/// Get the `limit` most recent transactions, newest first.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub fn get_recent_transactions(
    limit: u64,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    get_transaction_page(
        &TransactionFilters::default(),
        SortField::Date,
        SortOrder::Descending,
        limit,
        1,
        connection,
    )
}
