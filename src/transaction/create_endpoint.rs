//! Defines the endpoint for creating a new transaction.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
// Must use axum_extra's Form since that parses an empty string as None instead
// of crashing like axum::Form.
use axum_extra::extract::Form;
use maud::html;
use rusqlite::Connection;
use time::OffsetDateTime;

use crate::{
    AppState, Error,
    alert::Alert,
    timezone::get_local_offset,
    transaction::{
        core::create_transaction,
        draft::TransactionDraft,
        form::{FormAction, TransactionFormData, transaction_form},
    },
};

/// The state needed to create a transaction.
#[derive(Debug, Clone)]
pub struct CreateTransactionState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Asia/Kolkata".
    pub local_timezone: String,
}

impl FromRef<AppState> for CreateTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// A route handler for creating a new transaction.
///
/// On success the form is reset to an empty draft and a confirmation notice
/// is shown. On a validation failure the form is re-rendered with the
/// field errors and the submitted values, so the user can correct and retry.
pub async fn create_transaction_endpoint(
    State(state): State<CreateTransactionState>,
    Form(form_data): Form<TransactionFormData>,
) -> Response {
    let Some(local_offset) = get_local_offset(&state.local_timezone) else {
        return Error::InvalidTimezoneError(state.local_timezone).into_alert_response();
    };
    let max_date = OffsetDateTime::now_utc().to_offset(local_offset).date();

    let draft = form_data.into_draft();

    let record = match draft.finalize() {
        Ok(record) => record,
        Err(errors) => {
            return transaction_form(&draft, &errors, FormAction::Create, max_date)
                .into_response();
        }
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match create_transaction(record, &connection) {
        Ok(transaction) => {
            tracing::debug!("created transaction {}", transaction.id);

            // Create mode resets the form to an empty draft on success.
            let form =
                transaction_form(&TransactionDraft::new(), &[], FormAction::Create, max_date);
            let alert = Alert::Success {
                message: "Transaction added successfully".to_owned(),
                details: String::new(),
            };

            html! {
                (form)
                (alert.into_html())
            }
            .into_response()
        }
        Err(error) => {
            tracing::error!("could not create transaction: {error}");

            // The draft is left unchanged so the user may retry.
            let form = transaction_form(&draft, &[], FormAction::Create, max_date);
            let alert = Alert::Error {
                message: "Failed to add transaction".to_owned(),
                details: "An unexpected error occurred, please try again.".to_owned(),
            };

            html! {
                (form)
                (alert.into_html())
            }
            .into_response()
        }
    }
}
