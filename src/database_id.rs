//! Type aliases for integer IDs assigned by the database.

/// A unique ID assigned by the database.
pub type DatabaseId = i64;

/// The ID of a row in the transaction table.
pub type TransactionId = DatabaseId;
