//! Creates the application database tables.

use rusqlite::{Connection, Transaction as SqlTransaction};

use crate::{transaction::create_transaction_table, user::create_user_table};

/// Create the tables for the application's domain models.
///
/// # Errors
/// Returns an error if a table cannot be created or if there is an SQL error.
pub fn initialize(connection: &Connection) -> Result<(), rusqlite::Error> {
    let sql_transaction =
        SqlTransaction::new_unchecked(connection, rusqlite::TransactionBehavior::Exclusive)?;

    create_user_table(&sql_transaction)?;
    create_transaction_table(&sql_transaction)?;

    sql_transaction.commit()?;

    Ok(())
}
