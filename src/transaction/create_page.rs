//! The page for recording a new transaction.

use axum::{
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use time::OffsetDateTime;

use crate::{
    AppState, Error, endpoints,
    html::{BUTTON_SECONDARY_STYLE, FORM_CONTAINER_STYLE, base, link, rupee_input_styles},
    navigation::NavBar,
    timezone::get_local_offset,
    transaction::{
        draft::TransactionDraft,
        form::{FormAction, transaction_form},
    },
};

/// The state needed for the new transaction page.
#[derive(Debug, Clone)]
pub struct NewTransactionPageState {
    /// The local timezone as a canonical timezone name, e.g. "Asia/Kolkata".
    pub local_timezone: String,
}

impl FromRef<AppState> for NewTransactionPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Renders the page for recording a transaction.
pub async fn get_new_transaction_page(State(state): State<NewTransactionPageState>) -> Response {
    let local_offset = match get_local_offset(&state.local_timezone) {
        Some(offset) => offset,
        None => return Error::InvalidTimezoneError(state.local_timezone).into_response(),
    };

    let max_date = OffsetDateTime::now_utc().to_offset(local_offset).date();
    let draft = TransactionDraft::new();
    let form = transaction_form(&draft, &[], FormAction::Create, max_date);

    let content = html! {
        (NavBar::new(endpoints::NEW_TRANSACTION_VIEW).into_html())

        div class=(FORM_CONTAINER_STYLE)
        {
            h1 class="text-xl font-bold mb-4" { "Add Entry" }

            (form)

            (import_section())
        }
    };

    base("Add Entry", &[rupee_input_styles()], &content).into_response()
}

/// The spreadsheet upload widget shown below the entry form.
fn import_section() -> Markup {
    html! {
        section class="w-full mt-8 pt-6 border-t border-gray-200 dark:border-gray-700"
        {
            h2 class="text-lg font-semibold mb-2" { "Bulk import" }

            p class="text-sm text-gray-600 dark:text-gray-400 mb-4"
            {
                "Upload an Excel workbook to record many entries at once. "
                (link(endpoints::EXPORT_SAMPLE, "Download the sample template"))
                " to see the expected columns."
            }

            form
                hx-post=(endpoints::IMPORT)
                hx-encoding="multipart/form-data"
                hx-target="#import-result"
                hx-target-4xx="#import-result"
                hx-target-5xx="#import-result"
                hx-indicator="#import-indicator"
            {
                input
                    type="file"
                    name="file"
                    accept=".xlsx"
                    required
                    class="block w-full mb-2 text-sm text-gray-900 dark:text-gray-100";

                button type="submit" id="import-indicator" class=(BUTTON_SECONDARY_STYLE)
                {
                    "Upload"
                }
            }

            div id="import-result" {}
        }
    }
}

#[cfg(test)]
mod view_tests {
    use axum::extract::State;

    use crate::{
        endpoints,
        test_utils::{
            assert_content_type, assert_hx_endpoint, assert_status_ok, assert_valid_html,
            must_get_form, parse_html_document,
        },
    };

    use super::{NewTransactionPageState, get_new_transaction_page};

    #[tokio::test]
    async fn new_transaction_page_returns_form() {
        let state = NewTransactionPageState {
            local_timezone: "Etc/UTC".to_owned(),
        };

        let response = get_new_transaction_page(State(state)).await;

        assert_status_ok(&response);
        assert_content_type(&response, "text/html; charset=utf-8");

        let document = parse_html_document(response).await;
        assert_valid_html(&document);

        let form = must_get_form(&document);
        assert_hx_endpoint(&form, endpoints::TRANSACTIONS_API, "hx-post");
    }

    #[tokio::test]
    async fn new_transaction_page_with_bad_timezone_returns_error() {
        let state = NewTransactionPageState {
            local_timezone: "Not/AZone".to_owned(),
        };

        let response = get_new_transaction_page(State(state)).await;

        assert_eq!(
            response.status(),
            axum::http::StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
