//! The page for editing an existing transaction.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Path, State},
    response::{IntoResponse, Redirect, Response},
};
use maud::html;
use rusqlite::Connection;
use time::OffsetDateTime;

use crate::{
    AppState, Error,
    database_id::TransactionId,
    endpoints,
    html::{FORM_CONTAINER_STYLE, base, rupee_input_styles},
    navigation::NavBar,
    timezone::get_local_offset,
    transaction::{
        core::get_transaction,
        draft::TransactionDraft,
        form::{FormAction, transaction_form},
    },
};

/// The query string appended when an edit page fetch fails, so the reports
/// page can show a notice.
pub(crate) const MISSING_TRANSACTION_NOTICE: &str = "notice=missing";

/// The state needed for the edit transaction page.
#[derive(Debug, Clone)]
pub struct EditTransactionPageState {
    /// The database connection for fetching the transaction.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Asia/Kolkata".
    pub local_timezone: String,
}

impl FromRef<AppState> for EditTransactionPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Render the transaction editing page.
///
/// The draft is populated with a single fetch from the database. If the fetch
/// fails, no partially populated form is shown: the user is sent back to the
/// reports page with an error notice.
pub async fn get_edit_transaction_page(
    Path(transaction_id): Path<TransactionId>,
    State(state): State<EditTransactionPageState>,
) -> Response {
    let local_offset = match get_local_offset(&state.local_timezone) {
        Some(offset) => offset,
        None => return Error::InvalidTimezoneError(state.local_timezone).into_response(),
    };
    let max_date = OffsetDateTime::now_utc().to_offset(local_offset).date();

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    let transaction = match get_transaction(transaction_id, &connection) {
        Ok(transaction) => transaction,
        Err(error) => {
            match error {
                Error::NotFound => {
                    tracing::warn!("transaction {transaction_id} not found for editing")
                }
                error => tracing::error!("failed to fetch transaction {transaction_id}: {error}"),
            }

            return Redirect::to(&format!(
                "{}?{}",
                endpoints::REPORTS_VIEW,
                MISSING_TRANSACTION_NOTICE
            ))
            .into_response();
        }
    };
    drop(connection);

    let draft = TransactionDraft::from_transaction(&transaction);
    let form = transaction_form(&draft, &[], FormAction::Edit(transaction_id), max_date);

    let content = html! {
        (NavBar::new(endpoints::REPORTS_VIEW).into_html())

        div class=(FORM_CONTAINER_STYLE)
        {
            h1 class="text-xl font-bold mb-4" { "Edit Entry" }

            (form)
        }
    };

    base("Edit Entry", &[rupee_input_styles()], &content).into_response()
}
