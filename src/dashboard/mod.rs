//! The dashboard: profit and loss cards, the monthly chart, and the most
//! recent entries.

mod aggregation;
mod cards;
mod charts;

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use time::OffsetDateTime;

use crate::{
    AppState, Error, endpoints,
    html::{
        HeadElement, LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE,
        TABLE_ROW_STYLE, base, format_currency,
    },
    navigation::NavBar,
    timezone::get_local_offset,
    transaction::{Transaction, get_recent_transactions},
};

use aggregation::{get_monthly_totals, get_profit_loss};
use cards::profit_loss_cards;
use charts::{charts_script, charts_view, income_expense_chart};

/// How many of the latest entries to show below the chart.
const RECENT_TRANSACTION_COUNT: u64 = 5;

/// The state needed for the dashboard page.
#[derive(Debug, Clone)]
pub struct DashboardState {
    /// The database connection for the aggregation queries.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Asia/Kolkata".
    pub local_timezone: String,
}

impl FromRef<AppState> for DashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Render the dashboard page.
pub async fn get_dashboard_page(State(state): State<DashboardState>) -> Result<Response, Error> {
    let local_offset = get_local_offset(&state.local_timezone)
        .ok_or_else(|| Error::InvalidTimezoneError(state.local_timezone.clone()))?;
    let today = OffsetDateTime::now_utc().to_offset(local_offset).date();

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let profit_loss = get_profit_loss(&connection)
        .inspect_err(|error| tracing::error!("could not get profit/loss summary: {error}"))?;
    let monthly_totals = get_monthly_totals(today, &connection)
        .inspect_err(|error| tracing::error!("could not get monthly totals: {error}"))?;
    let recent_transactions = get_recent_transactions(RECENT_TRANSACTION_COUNT, &connection)
        .inspect_err(|error| tracing::error!("could not get recent transactions: {error}"))?;
    drop(connection);

    let chart = income_expense_chart(&monthly_totals)?;
    let charts = [chart];

    let mut head_elements = Vec::new();
    if !monthly_totals.is_empty() {
        head_elements.push(HeadElement::ScriptLink(
            "/static/echarts-5.5.1-min.js".to_owned(),
        ));
        head_elements.push(charts_script(&charts));
    }

    let content = html! {
        (NavBar::new(endpoints::DASHBOARD_VIEW).into_html())

        div class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full max-w-5xl"
            {
                (profit_loss_cards(&profit_loss))

                @if monthly_totals.is_empty() {
                    p class="w-full py-8 text-center text-gray-600 dark:text-gray-400"
                    {
                        "Record some entries to see the monthly chart."
                    }
                } @else {
                    (charts_view(&charts))
                }

                (recent_transactions_view(&recent_transactions))
            }
        }
    };

    Ok(base("Dashboard", &head_elements, &content).into_response())
}

fn recent_transactions_view(transactions: &[Transaction]) -> Markup {
    html! {
        section class="w-full"
        {
            div class="flex justify-between items-baseline mb-2"
            {
                h2 class="text-lg font-semibold" { "Recent entries" }

                a href=(endpoints::REPORTS_VIEW) class=(LINK_STYLE) { "See all" }
            }

            @if transactions.is_empty() {
                p class="text-gray-600 dark:text-gray-400" { "No entries yet." }
            } @else {
                div class="relative overflow-x-auto shadow-md sm:rounded-lg"
                {
                    table class="w-full text-sm text-left text-gray-500 dark:text-gray-400"
                    {
                        thead class=(TABLE_HEADER_STYLE)
                        {
                            tr
                            {
                                th scope="col" class=(TABLE_CELL_STYLE) { "Date" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Type" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Category" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Quantity" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Price" }
                            }
                        }

                        tbody
                        {
                            @for transaction in transactions {
                                tr class=(TABLE_ROW_STYLE)
                                {
                                    td class=(TABLE_CELL_STYLE) { (transaction.date) }
                                    td class=(TABLE_CELL_STYLE) { (transaction.transaction_type.label()) }
                                    td class=(TABLE_CELL_STYLE) { (transaction.category.label()) }
                                    td class=(TABLE_CELL_STYLE) { (transaction.quantity) }
                                    td class=(TABLE_CELL_STYLE) { (format_currency(transaction.total_price)) }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod dashboard_tests {
    use std::sync::{Arc, Mutex};

    use axum::extract::State;
    use rusqlite::Connection;
    use scraper::Selector;
    use time::macros::date;

    use crate::{
        db::initialize,
        test_utils::{assert_status_ok, assert_valid_html, parse_html_document},
        transaction::{TransactionType, create_transaction, sample_record},
    };

    use super::{DashboardState, get_dashboard_page};

    fn get_test_state() -> DashboardState {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        DashboardState {
            db_connection: Arc::new(Mutex::new(conn)),
            local_timezone: "Etc/UTC".to_owned(),
        }
    }

    #[tokio::test]
    async fn dashboard_shows_profit_loss_cards() {
        let state = get_test_state();
        {
            let connection = state.db_connection.lock().unwrap();
            let mut income = sample_record(date!(2025 - 04 - 05));
            income.income_amount = 750.0;
            income.total_price = 750.0;
            create_transaction(income, &connection).unwrap();

            let mut expense = sample_record(date!(2025 - 04 - 06));
            expense.transaction_type = TransactionType::Expense;
            expense.income_amount = 0.0;
            expense.purchase_amount = 300.0;
            expense.total_price = 300.0;
            create_transaction(expense, &connection).unwrap();
        }

        let response = get_dashboard_page(State(state)).await.unwrap();

        assert_status_ok(&response);

        let html = parse_html_document(response).await;
        assert_valid_html(&html);

        let text = html.root_element().text().collect::<String>();
        assert!(text.contains("₹750.00"));
        assert!(text.contains("₹300.00"));
        assert!(text.contains("₹450.00"));
    }

    #[tokio::test]
    async fn empty_dashboard_shows_placeholder() {
        let state = get_test_state();

        let response = get_dashboard_page(State(state)).await.unwrap();

        let html = parse_html_document(response).await;
        let text = html.root_element().text().collect::<String>();
        assert!(text.contains("Record some entries to see the monthly chart."));
        assert!(text.contains("No entries yet."));
    }

    #[tokio::test]
    async fn dashboard_lists_recent_entries() {
        let state = get_test_state();
        {
            let connection = state.db_connection.lock().unwrap();
            for i in 0..7 {
                create_transaction(
                    sample_record(date!(2025 - 01 - 01) + time::Duration::days(i)),
                    &connection,
                )
                .unwrap();
            }
        }

        let response = get_dashboard_page(State(state)).await.unwrap();

        let html = parse_html_document(response).await;
        let rows: Vec<_> = html.select(&Selector::parse("tbody tr").unwrap()).collect();
        assert_eq!(rows.len(), 5, "only the latest five entries are shown");
    }
}
