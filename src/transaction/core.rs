//! Defines the core data models and database queries for transactions.

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    Connection, Row,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{Error, database_id::TransactionId};

/// The error returned when a stored label does not match any enum value.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("\"{value}\" is not a valid {kind}")]
pub struct InvalidLabel {
    kind: &'static str,
    value: String,
}

/// Defines an enum whose values are stored as uppercase labels, both in the
/// database and on the wire, with a human readable label for display.
macro_rules! label_enum {
    (
        $(#[$meta:meta])*
        $name:ident as $kind:literal {
            $($(#[$variant_meta:meta])* $variant:ident => ($label:literal, $display:literal)),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $(
                $(#[$variant_meta])*
                #[serde(rename = $label)]
                $variant,
            )+
        }

        impl $name {
            /// Every value of this enum, in display order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The label stored in the database and used in form values.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }

            /// The human readable name shown in tables and forms.
            pub fn label(&self) -> &'static str {
                match self {
                    $($name::$variant => $display),+
                }
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = InvalidLabel;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($label => Ok($name::$variant),)+
                    _ => Err(InvalidLabel {
                        kind: $kind,
                        value: value.to_owned(),
                    }),
                }
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|error: InvalidLabel| FromSqlError::Other(Box::new(error)))
            }
        }
    };
}

label_enum! {
    /// Whether the birds were sold whole or skinned.
    SaleType as "sale type" {
        Standard => ("STANDARD", "Standard"),
        SkinOut => ("SKIN_OUT", "Skin Out"),
    }
}

label_enum! {
    /// Whether money came into or went out of the business.
    ///
    /// This drives which amount fields are required on the entry form.
    TransactionType as "transaction type" {
        Income => ("INCOME", "Income"),
        Expense => ("EXPENSE", "Expense"),
    }
}

label_enum! {
    /// The kind of bird the transaction concerns.
    BirdCategory as "category" {
        Broiler => ("BROILER", "Broiler"),
        CountryChicken => ("COUNTRY_CHICKEN", "Country Chicken"),
    }
}

label_enum! {
    /// The sex of the birds.
    Gender as "gender" {
        Male => ("MALE", "Male"),
        Female => ("FEMALE", "Female"),
    }
}

label_enum! {
    /// How the money changed hands.
    PaymentMethod as "payment method" {
        Cash => ("CASH", "Cash"),
        Online => ("ONLINE", "Online"),
        Pending => ("PENDING", "Pending"),
    }
}

/// A poultry sale or purchase, i.e. an event where money was either earned or
/// spent.
///
/// To create a new `Transaction`, build a [TransactionRecord] (usually via
/// [crate::transaction::TransactionDraft]) and pass it to
/// [create_transaction].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// When the sale or purchase happened.
    pub date: Date,
    /// Whether the birds were sold whole or skinned.
    pub sale_type: SaleType,
    /// Whether this entry is income or an expense.
    pub transaction_type: TransactionType,
    /// The kind of bird.
    pub category: BirdCategory,
    /// The sex of the birds.
    pub gender: Gender,
    /// How many birds changed hands.
    pub quantity: u32,
    /// How the money changed hands.
    pub payment_method: PaymentMethod,
    /// Free text notes about the entry.
    pub details: String,
    /// Money earned, for income entries.
    pub income_amount: f64,
    /// Money spent buying birds, for expense entries.
    pub purchase_amount: f64,
    /// Money spent on wages, for expense entries.
    pub salary_amount: f64,
    /// Other money spent, for expense entries.
    pub others_amount: f64,
    /// The derived total of the entry. Never edited directly, always
    /// recomputed from the amount fields.
    pub total_price: f64,
    /// Set when the entry came from a spreadsheet import. Used to skip
    /// duplicate rows when the same workbook is uploaded twice.
    pub import_id: Option<i64>,
}

/// A validated, normalized transaction ready to be persisted.
///
/// Produced by [crate::transaction::TransactionDraft::finalize], which
/// guarantees the total matches the amount fields.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    /// When the sale or purchase happened.
    pub date: Date,
    /// Whether the birds were sold whole or skinned.
    pub sale_type: SaleType,
    /// Whether this entry is income or an expense.
    pub transaction_type: TransactionType,
    /// The kind of bird.
    pub category: BirdCategory,
    /// The sex of the birds.
    pub gender: Gender,
    /// How many birds changed hands.
    pub quantity: u32,
    /// How the money changed hands.
    pub payment_method: PaymentMethod,
    /// Free text notes about the entry. Defaults to the empty string.
    pub details: String,
    /// Money earned, for income entries.
    pub income_amount: f64,
    /// Money spent buying birds, for expense entries.
    pub purchase_amount: f64,
    /// Money spent on wages, for expense entries.
    pub salary_amount: f64,
    /// Other money spent, for expense entries.
    pub others_amount: f64,
    /// The derived total of the entry.
    pub total_price: f64,
    /// Set when the entry came from a spreadsheet import.
    pub import_id: Option<i64>,
}

impl TransactionRecord {
    /// Set the import ID for the record.
    pub fn import_id(mut self, import_id: Option<i64>) -> Self {
        self.import_id = import_id;
        self
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

const TRANSACTION_COLUMNS: &str = "id, date, sale_type, transaction_type, category, gender, \
    quantity, payment_method, details, income_amount, purchase_amount, salary_amount, \
    others_amount, total_price, import_id";

/// Create a new transaction in the database from a record.
///
/// # Errors
/// This function will return a:
/// - [Error::DuplicateImportId] if a transaction with the specified import ID already exists,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_transaction(
    record: TransactionRecord,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(&format!(
            "INSERT INTO \"transaction\" (date, sale_type, transaction_type, category, gender, \
             quantity, payment_method, details, income_amount, purchase_amount, salary_amount, \
             others_amount, total_price, import_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
             RETURNING {TRANSACTION_COLUMNS}"
        ))?
        .query_one(
            (
                record.date,
                record.sale_type,
                record.transaction_type,
                record.category,
                record.gender,
                record.quantity,
                record.payment_method,
                &record.details,
                record.income_amount,
                record.purchase_amount,
                record.salary_amount,
                record.others_amount,
                record.total_price,
                record.import_id,
            ),
            map_transaction_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
                },
                _,
            ) => Error::DuplicateImportId,
            error => error.into(),
        })?;

    Ok(transaction)
}

/// Retrieve a transaction from the database by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_transaction(id: TransactionId, connection: &Connection) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" WHERE id = :id"
        ))?
        .query_one(&[(":id", &id)], map_transaction_row)?;

    Ok(transaction)
}

/// Overwrite the transaction `id` with the contents of `record`.
///
/// # Errors
/// This function will return a:
/// - [Error::UpdateMissingTransaction] if `id` does not refer to a valid transaction,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_transaction(
    id: TransactionId,
    record: TransactionRecord,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE \"transaction\" SET date = ?1, sale_type = ?2, transaction_type = ?3, \
         category = ?4, gender = ?5, quantity = ?6, payment_method = ?7, details = ?8, \
         income_amount = ?9, purchase_amount = ?10, salary_amount = ?11, others_amount = ?12, \
         total_price = ?13 WHERE id = ?14",
        (
            record.date,
            record.sale_type,
            record.transaction_type,
            record.category,
            record.gender,
            record.quantity,
            record.payment_method,
            &record.details,
            record.income_amount,
            record.purchase_amount,
            record.salary_amount,
            record.others_amount,
            record.total_price,
            id,
        ),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingTransaction);
    }

    Ok(())
}

/// Delete the transaction `id` from the database.
///
/// Returns the number of rows deleted, which is zero if `id` does not refer
/// to a transaction.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn delete_transaction(id: TransactionId, connection: &Connection) -> Result<usize, Error> {
    connection
        .execute("DELETE FROM \"transaction\" WHERE id = :id", &[(":id", &id)])
        .map_err(|error| error.into())
}

/// Get the total number of transactions in the database.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
pub fn count_transactions(connection: &Connection) -> Result<u32, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM \"transaction\";", [], |row| {
            row.get(0)
        })
        .map_err(|error| error.into())
}

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL,
                sale_type TEXT NOT NULL,
                transaction_type TEXT NOT NULL,
                category TEXT NOT NULL,
                gender TEXT NOT NULL,
                quantity INTEGER NOT NULL,
                payment_method TEXT NOT NULL,
                details TEXT NOT NULL,
                income_amount REAL NOT NULL,
                purchase_amount REAL NOT NULL,
                salary_amount REAL NOT NULL,
                others_amount REAL NOT NULL,
                total_price REAL NOT NULL,
                import_id INTEGER UNIQUE
                )",
        (),
    )?;

    // Ensure the sequence starts at 1
    connection.execute(
        "INSERT OR IGNORE INTO sqlite_sequence (name, seq) VALUES ('transaction', 0)",
        (),
    )?;

    // Composite index used by the reports page and the dashboard.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_date_type ON \"transaction\"(date, transaction_type);",
        (),
    )?;

    Ok(())
}

/// Map a database row to a Transaction.
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    Ok(Transaction {
        id: row.get(0)?,
        date: row.get(1)?,
        sale_type: row.get(2)?,
        transaction_type: row.get(3)?,
        category: row.get(4)?,
        gender: row.get(5)?,
        quantity: row.get(6)?,
        payment_method: row.get(7)?,
        details: row.get(8)?,
        income_amount: row.get(9)?,
        purchase_amount: row.get(10)?,
        salary_amount: row.get(11)?,
        others_amount: row.get(12)?,
        total_price: row.get(13)?,
        import_id: row.get(14)?,
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
pub(crate) fn sample_record(date: Date) -> TransactionRecord {
    TransactionRecord {
        date,
        sale_type: SaleType::Standard,
        transaction_type: TransactionType::Income,
        category: BirdCategory::Broiler,
        gender: Gender::Male,
        quantity: 4,
        payment_method: PaymentMethod::Cash,
        details: String::new(),
        income_amount: 500.0,
        purchase_amount: 0.0,
        salary_amount: 0.0,
        others_amount: 0.0,
        total_price: 500.0,
        import_id: None,
    }
}
