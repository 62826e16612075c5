//! Defines the endpoint that renders the read-only details of a transaction.
//!
//! The partial is swapped into the `#dialog-container` element by the View
//! button on the reports page, standing in for a modal dialog.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Path, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    alert::Alert,
    database_id::TransactionId,
    html::{BUTTON_SECONDARY_STYLE, format_currency},
    transaction::core::{Transaction, TransactionType, get_transaction},
};

/// The state needed to show the details of a transaction.
#[derive(Debug, Clone)]
pub struct TransactionDetailsState {
    /// The database connection for fetching the transaction.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for TransactionDetailsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render the read-only details of a transaction.
pub async fn get_transaction_details(
    State(state): State<TransactionDetailsState>,
    Path(transaction_id): Path<TransactionId>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match get_transaction(transaction_id, &connection) {
        Ok(transaction) => details_view(&transaction).into_response(),
        Err(Error::NotFound) => (
            axum::http::StatusCode::NOT_FOUND,
            Alert::Error {
                message: "Could not load transaction".to_owned(),
                details: "The transaction could not be found. \
                Try refreshing the page to see if it has been deleted."
                    .to_owned(),
            }
            .into_html(),
        )
            .into_response(),
        Err(error) => {
            tracing::error!("Could not fetch transaction {transaction_id}: {error}");
            error.into_alert_response()
        }
    }
}

fn details_row(label: &str, value: &str) -> Markup {
    html! {
        div class="flex justify-between gap-x-8 py-1 border-b border-gray-100 dark:border-gray-700"
        {
            dt class="text-sm text-gray-500 dark:text-gray-400" { (label) }
            dd class="text-sm font-medium" { (value) }
        }
    }
}

fn details_view(transaction: &Transaction) -> Markup {
    html! {
        div
            class="fixed inset-0 z-40 flex items-center justify-center bg-gray-900/50"
        {
            div class="w-full max-w-md p-6 rounded-lg shadow bg-white dark:bg-gray-800 text-gray-900 dark:text-white"
            {
                h2 class="text-lg font-semibold mb-4" { "Transaction Details" }

                dl
                {
                    (details_row("Date", &transaction.date.to_string()))
                    (details_row("Sale Type", transaction.sale_type.label()))
                    (details_row("Type", transaction.transaction_type.label()))
                    (details_row("Category", transaction.category.label()))
                    (details_row("Gender", transaction.gender.label()))
                    (details_row("Quantity", &transaction.quantity.to_string()))
                    (details_row("Payment Method", transaction.payment_method.label()))

                    @match transaction.transaction_type {
                        TransactionType::Income => {
                            (details_row("Income Amount", &format_currency(transaction.income_amount)))
                        }
                        TransactionType::Expense => {
                            (details_row("Purchase Amount", &format_currency(transaction.purchase_amount)))
                            (details_row("Salary Amount", &format_currency(transaction.salary_amount)))
                            (details_row("Others Amount", &format_currency(transaction.others_amount)))
                        }
                    }

                    (details_row("Total Price", &format_currency(transaction.total_price)))

                    @if !transaction.details.is_empty() {
                        (details_row("Details", &transaction.details))
                    }
                }

                button
                    type="button"
                    class=(BUTTON_SECONDARY_STYLE)
                    onclick="document.getElementById('dialog-container').innerHTML = '';"
                {
                    "Close"
                }
            }
        }
    }
}
