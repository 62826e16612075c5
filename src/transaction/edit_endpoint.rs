//! Defines the endpoint for updating an existing transaction.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
// Must use axum_extra's Form since that parses an empty string as None instead
// of crashing like axum::Form.
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;
use maud::html;
use rusqlite::Connection;
use time::OffsetDateTime;

use crate::{
    AppState, Error,
    alert::Alert,
    database_id::TransactionId,
    endpoints,
    timezone::get_local_offset,
    transaction::{
        core::update_transaction,
        form::{FormAction, TransactionFormData, transaction_form},
    },
};

/// The state needed to update a transaction.
#[derive(Debug, Clone)]
pub struct UpdateTransactionState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Asia/Kolkata".
    pub local_timezone: String,
}

impl FromRef<AppState> for UpdateTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// A route handler for updating a transaction, redirects to the reports view
/// on success.
///
/// On a validation failure the form is re-rendered with the field errors. On
/// any other failure the submitted values are kept so the user can retry.
pub async fn update_transaction_endpoint(
    Path(transaction_id): Path<TransactionId>,
    State(state): State<UpdateTransactionState>,
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
            return transaction_form(&draft, &errors, FormAction::Edit(transaction_id), max_date)
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

    match update_transaction(transaction_id, record, &connection) {
        Ok(()) => (
            HxRedirect(endpoints::REPORTS_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(Error::UpdateMissingTransaction) => {
            Error::UpdateMissingTransaction.into_alert_response()
        }
        Err(error) => {
            tracing::error!(
                "An unexpected error occurred while updating transaction {transaction_id}: {error}"
            );

            let form = transaction_form(&draft, &[], FormAction::Edit(transaction_id), max_date);
            let alert = Alert::Error {
                message: "Failed to update transaction".to_owned(),
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
