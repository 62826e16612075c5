//! Transaction management for the poultry ledger.
//!
//! This module contains everything related to transactions:
//! - The `Transaction` model and the label enums that describe an entry
//! - The `TransactionDraft` state machine behind the entry form
//! - Database functions for storing, querying, and managing transactions
//! - View handlers for the entry form, the reports page and the detail view

mod core;
mod create_endpoint;
mod create_page;
mod delete_endpoint;
mod details_endpoint;
mod draft;
mod edit_endpoint;
mod edit_page;
mod form;
mod query;
mod reports_page;

pub use core::{
    BirdCategory, Gender, PaymentMethod, SaleType, Transaction, TransactionRecord,
    TransactionType, create_transaction, create_transaction_table, get_transaction,
    map_transaction_row,
};
pub use create_endpoint::create_transaction_endpoint;
pub use create_page::get_new_transaction_page;
pub use delete_endpoint::delete_transaction_endpoint;
pub use details_endpoint::get_transaction_details;
pub use draft::{DraftField, FieldChange, TransactionDraft, ValidationError};
pub use edit_endpoint::update_transaction_endpoint;
pub use edit_page::get_edit_transaction_page;
pub use form::refresh_transaction_form;
pub use query::{
    SortField, SortOrder, TransactionFilters, get_all_transactions, get_recent_transactions,
};
pub use reports_page::get_reports_page;

#[cfg(test)]
pub(crate) use core::{count_transactions, sample_record};
