//! Defines the route handler for the page that displays transactions as a
//! filterable, sortable report.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Query, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;
use time::Date;
use unicode_segmentation::UnicodeSegmentation;

use crate::{
    AppState, Error,
    database_id::TransactionId,
    endpoints,
    html::{
        BUTTON_DELETE_STYLE, CHIP_STYLE, FORM_LABEL_STYLE, FORM_SELECT_STYLE,
        FORM_TEXT_INPUT_STYLE, LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE,
        TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base, format_currency,
    },
    navigation::NavBar,
    pagination::{PaginationConfig, create_pagination_indicators, pagination_nav},
    transaction::{
        core::{BirdCategory, PaymentMethod, Transaction, TransactionType},
        query::{
            SortField, SortOrder, TransactionFilters, count_matching_transactions,
            get_transaction_page,
        },
    },
};

/// The raw query parameters for the reports page.
///
/// Filter values arrive as strings because an empty filter field is submitted
/// as an empty string, which must be treated as "no filter" rather than a
/// parse error.
#[derive(Debug, Default, Deserialize)]
pub struct ReportsQuery {
    /// The page of results to show.
    pub page: Option<u64>,
    /// The column to sort by.
    pub sort_by: Option<String>,
    /// The sort direction.
    pub sort_order: Option<String>,
    /// Only show transactions on or after this date.
    pub start_date: Option<String>,
    /// Only show transactions on or before this date.
    pub end_date: Option<String>,
    /// Only show transactions of this type.
    pub transaction_type: Option<String>,
    /// Only show transactions for this kind of bird.
    pub category: Option<String>,
    /// Only show transactions paid this way.
    pub payment_method: Option<String>,
    /// A one-off notice to display, e.g. after a failed edit fetch.
    pub notice: Option<String>,
}

/// Validated query options with defaults applied.
struct NormalizedQuery {
    page: u64,
    sort_field: SortField,
    sort_order: SortOrder,
    filters: TransactionFilters,
    notice: Option<String>,
}

fn parse_filter<T>(raw: Option<&str>, field: &str) -> Option<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }

    match raw.parse() {
        Ok(value) => Some(value),
        Err(error) => {
            tracing::warn!("ignoring invalid {field} filter {raw:?}: {error}");
            None
        }
    }
}

/// The calendar date format used by date inputs and filter links.
const DATE_FORMAT: &[time::format_description::BorrowedFormatItem] =
    time::macros::format_description!("[year]-[month]-[day]");

fn parse_date_filter(raw: Option<&str>, field: &str) -> Option<Date> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }

    match Date::parse(raw, DATE_FORMAT) {
        Ok(date) => Some(date),
        Err(error) => {
            tracing::warn!("ignoring invalid {field} filter {raw:?}: {error}");
            None
        }
    }
}

fn parse_sort_field(raw: Option<&str>) -> SortField {
    match raw {
        Some("type") => SortField::Type,
        Some("category") => SortField::Category,
        Some("quantity") => SortField::Quantity,
        Some("payment_method") => SortField::PaymentMethod,
        Some("price") => SortField::Price,
        _ => SortField::Date,
    }
}

fn parse_sort_order(raw: Option<&str>) -> SortOrder {
    match raw {
        Some("asc") => SortOrder::Ascending,
        _ => SortOrder::Descending,
    }
}

impl ReportsQuery {
    fn normalize(self) -> NormalizedQuery {
        NormalizedQuery {
            page: self.page.unwrap_or(1).max(1),
            sort_field: parse_sort_field(self.sort_by.as_deref()),
            sort_order: parse_sort_order(self.sort_order.as_deref()),
            filters: TransactionFilters {
                start_date: parse_date_filter(self.start_date.as_deref(), "start date"),
                end_date: parse_date_filter(self.end_date.as_deref(), "end date"),
                transaction_type: parse_filter(self.transaction_type.as_deref(), "type"),
                category: parse_filter(self.category.as_deref(), "category"),
                payment_method: parse_filter(self.payment_method.as_deref(), "payment method"),
            },
            notice: self.notice,
        }
    }
}

/// Build the reports page URL for the given view options.
fn reports_url(
    page: u64,
    sort_field: SortField,
    sort_order: SortOrder,
    filters: &TransactionFilters,
) -> String {
    let mut params: Vec<(&str, String)> = vec![
        ("page", page.to_string()),
        ("sort_by", sort_field.as_query_value().to_owned()),
        ("sort_order", sort_order.as_query_value().to_owned()),
    ];

    if let Some(start_date) = filters.start_date {
        params.push(("start_date", start_date.to_string()));
    }
    if let Some(end_date) = filters.end_date {
        params.push(("end_date", end_date.to_string()));
    }
    if let Some(transaction_type) = filters.transaction_type {
        params.push(("transaction_type", transaction_type.to_string()));
    }
    if let Some(category) = filters.category {
        params.push(("category", category.to_string()));
    }
    if let Some(payment_method) = filters.payment_method {
        params.push(("payment_method", payment_method.to_string()));
    }

    match serde_urlencoded::to_string(&params) {
        Ok(query) => format!("{}?{}", endpoints::REPORTS_VIEW, query),
        Err(error) => {
            tracing::error!("could not encode reports query: {error}");
            endpoints::REPORTS_VIEW.to_owned()
        }
    }
}

/// The state needed for the reports page.
#[derive(Debug, Clone)]
pub struct ReportsPageState {
    /// The database connection for querying transactions.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The config that controls how to display pages of data.
    pub pagination_config: PaginationConfig,
}

impl FromRef<AppState> for ReportsPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            pagination_config: state.pagination_config.clone(),
        }
    }
}

/// Render an overview of the recorded transactions.
pub async fn get_reports_page(
    State(state): State<ReportsPageState>,
    Query(query_params): Query<ReportsQuery>,
) -> Result<Response, Error> {
    let options = query_params.normalize();

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let total_count = count_matching_transactions(&options.filters, &connection)
        .inspect_err(|error| tracing::error!("could not count transactions: {error}"))?;

    let page_size = state.pagination_config.default_page_size;
    let page_count = total_count.div_ceil(page_size).max(1);
    let page = options.page.min(page_count);

    let transactions = get_transaction_page(
        &options.filters,
        options.sort_field,
        options.sort_order,
        page_size,
        page,
        &connection,
    )
    .inspect_err(|error| tracing::error!("could not get transaction page: {error}"))?;
    drop(connection);

    let indicators =
        create_pagination_indicators(page, page_count, state.pagination_config.max_pages);

    let content = html! {
        (NavBar::new(endpoints::REPORTS_VIEW).into_html())

        div class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full max-w-5xl"
            {
                @if options.notice.as_deref() == Some("missing") {
                    (missing_transaction_banner())
                }

                (header_view())
                (filter_form(&options.filters, options.sort_field, options.sort_order))

                @if transactions.is_empty() {
                    (empty_state(&options.filters))
                } @else {
                    (transactions_table(
                        &transactions,
                        options.sort_field,
                        options.sort_order,
                        &options.filters,
                    ))

                    div class="flex items-center justify-between mt-4"
                    {
                        p class="text-sm text-gray-600 dark:text-gray-400"
                        {
                            (total_count) " entries"
                        }

                        (pagination_nav(&indicators, |page| {
                            reports_url(page, options.sort_field, options.sort_order, &options.filters)
                        }))
                    }
                }
            }
        }
    };

    Ok(base("Reports", &[], &content).into_response())
}

fn missing_transaction_banner() -> Markup {
    html! {
        div
            role="alert"
            class="p-4 mb-4 text-sm rounded-lg border text-red-800 bg-red-50 border-red-300
                dark:bg-gray-800 dark:text-red-400 dark:border-red-800"
        {
            "The transaction could not be loaded for editing. It may have been deleted."
        }
    }
}

fn header_view() -> Markup {
    html! {
        div class="flex flex-wrap items-center justify-between gap-2 mb-4"
        {
            h1 class="text-xl font-bold" { "Reports" }

            div class="flex gap-x-4"
            {
                a href=(endpoints::NEW_TRANSACTION_VIEW) class=(LINK_STYLE) { "Add Entry" }
                a href=(endpoints::NEW_TRANSACTION_VIEW) class=(LINK_STYLE) { "Import" }
                a href=(endpoints::EXPORT) class=(LINK_STYLE) { "Export" }
            }
        }
    }
}

fn filter_form(
    filters: &TransactionFilters,
    sort_field: SortField,
    sort_order: SortOrder,
) -> Markup {
    html! {
        form
            method="get"
            action=(endpoints::REPORTS_VIEW)
            class="grid grid-cols-2 md:grid-cols-6 gap-2 items-end w-full mb-4"
        {
            input type="hidden" name="sort_by" value=(sort_field.as_query_value());
            input type="hidden" name="sort_order" value=(sort_order.as_query_value());

            div
            {
                label for="start_date" class=(FORM_LABEL_STYLE) { "From" }
                input
                    type="date"
                    name="start_date"
                    id="start_date"
                    value=[filters.start_date]
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="end_date" class=(FORM_LABEL_STYLE) { "To" }
                input
                    type="date"
                    name="end_date"
                    id="end_date"
                    value=[filters.end_date]
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="transaction_type" class=(FORM_LABEL_STYLE) { "Type" }
                select name="transaction_type" id="transaction_type" class=(FORM_SELECT_STYLE)
                {
                    option value="" selected[filters.transaction_type.is_none()] { "All" }
                    @for transaction_type in TransactionType::ALL {
                        option
                            value=(transaction_type)
                            selected[filters.transaction_type == Some(*transaction_type)]
                        {
                            (transaction_type.label())
                        }
                    }
                }
            }

            div
            {
                label for="category" class=(FORM_LABEL_STYLE) { "Category" }
                select name="category" id="category" class=(FORM_SELECT_STYLE)
                {
                    option value="" selected[filters.category.is_none()] { "All" }
                    @for category in BirdCategory::ALL {
                        option
                            value=(category)
                            selected[filters.category == Some(*category)]
                        {
                            (category.label())
                        }
                    }
                }
            }

            div
            {
                label for="payment_method" class=(FORM_LABEL_STYLE) { "Payment" }
                select name="payment_method" id="payment_method" class=(FORM_SELECT_STYLE)
                {
                    option value="" selected[filters.payment_method.is_none()] { "All" }
                    @for payment_method in PaymentMethod::ALL {
                        option
                            value=(payment_method)
                            selected[filters.payment_method == Some(*payment_method)]
                        {
                            (payment_method.label())
                        }
                    }
                }
            }

            div class="flex gap-x-2"
            {
                button
                    type="submit"
                    class="px-4 py-2 bg-blue-500 dark:bg-blue-600 hover:bg-blue-600
                        hover:dark:bg-blue-700 text-white rounded text-sm"
                {
                    "Apply"
                }

                a href=(endpoints::REPORTS_VIEW) class=(LINK_STYLE) { "Reset" }
            }
        }
    }
}

fn sort_header(
    title: &str,
    field: SortField,
    active_field: SortField,
    active_order: SortOrder,
    filters: &TransactionFilters,
) -> Markup {
    // Clicking the active column reverses the order; clicking another column
    // sorts by it descending first, matching the default view.
    let next_order = if field == active_field {
        active_order.reversed()
    } else {
        SortOrder::Descending
    };
    let url = reports_url(1, field, next_order, filters);

    let marker = if field == active_field {
        match active_order {
            SortOrder::Ascending => " ▲",
            SortOrder::Descending => " ▼",
        }
    } else {
        ""
    };

    html! {
        th scope="col" class=(TABLE_CELL_STYLE)
        {
            a href=(url) { (title) (marker) }
        }
    }
}

/// Truncate the details text so long notes do not blow out the table layout.
fn truncate_details(details: &str) -> String {
    const MAX_GRAPHEMES: usize = 30;

    let graphemes: Vec<&str> = details.graphemes(true).collect();
    if graphemes.len() <= MAX_GRAPHEMES {
        details.to_owned()
    } else {
        format!("{}…", graphemes[..MAX_GRAPHEMES].concat())
    }
}

fn transaction_row(transaction: &Transaction) -> Markup {
    let edit_url =
        endpoints::format_endpoint(endpoints::EDIT_TRANSACTION_VIEW, transaction.id);
    let delete_url = endpoints::format_endpoint(endpoints::TRANSACTION, transaction.id);
    let details_url = details_endpoint_url(transaction.id);

    html! {
        tr class=(TABLE_ROW_STYLE)
        {
            td class=(TABLE_CELL_STYLE) { (transaction.date) }
            td class=(TABLE_CELL_STYLE) { (transaction.transaction_type.label()) }
            td class=(TABLE_CELL_STYLE) { (transaction.category.label()) }
            td class=(TABLE_CELL_STYLE) { (transaction.quantity) }
            td class=(TABLE_CELL_STYLE)
            {
                span class=(CHIP_STYLE) { (transaction.payment_method.label()) }
            }
            td class=(TABLE_CELL_STYLE) { (format_currency(transaction.total_price)) }
            td class=(TABLE_CELL_STYLE) title=(transaction.details)
            {
                (truncate_details(&transaction.details))
            }
            td class=(TABLE_CELL_STYLE)
            {
                div class="flex gap-x-3"
                {
                    button
                        type="button"
                        class=(LINK_STYLE)
                        hx-get=(details_url)
                        hx-target="#dialog-container"
                        hx-target-4xx="#dialog-container"
                        hx-swap="innerHTML"
                    {
                        "View"
                    }

                    a href=(edit_url) class=(LINK_STYLE) { "Edit" }

                    button
                        type="button"
                        class=(BUTTON_DELETE_STYLE)
                        hx-delete=(delete_url)
                        hx-confirm="Are you sure you want to delete this transaction? This action cannot be undone."
                        hx-target="closest tr"
                        hx-target-4xx="#dialog-container"
                        hx-swap="outerHTML"
                    {
                        "Delete"
                    }
                }
            }
        }
    }
}

fn details_endpoint_url(transaction_id: TransactionId) -> String {
    endpoints::format_endpoint(endpoints::TRANSACTION_DETAILS, transaction_id)
}

fn transactions_table(
    transactions: &[Transaction],
    sort_field: SortField,
    sort_order: SortOrder,
    filters: &TransactionFilters,
) -> Markup {
    html! {
        div class="relative overflow-x-auto shadow-md sm:rounded-lg w-full"
        {
            table class="w-full text-sm text-left rtl:text-right text-gray-500 dark:text-gray-400"
            {
                thead class=(TABLE_HEADER_STYLE)
                {
                    tr
                    {
                        (sort_header("Date", SortField::Date, sort_field, sort_order, filters))
                        (sort_header("Type", SortField::Type, sort_field, sort_order, filters))
                        (sort_header("Category", SortField::Category, sort_field, sort_order, filters))
                        (sort_header("Quantity", SortField::Quantity, sort_field, sort_order, filters))
                        (sort_header("Payment", SortField::PaymentMethod, sort_field, sort_order, filters))
                        (sort_header("Price", SortField::Price, sort_field, sort_order, filters))
                        th scope="col" class=(TABLE_CELL_STYLE) { "Details" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                    }
                }

                tbody
                {
                    @for transaction in transactions {
                        (transaction_row(transaction))
                    }
                }
            }
        }
    }
}

fn empty_state(filters: &TransactionFilters) -> Markup {
    html! {
        div class="w-full py-16 text-center text-gray-600 dark:text-gray-400"
        {
            @if filters.is_empty() {
                p { "No transactions recorded yet." }
                p
                {
                    a href=(endpoints::NEW_TRANSACTION_VIEW) class=(LINK_STYLE)
                    {
                        "Add your first entry"
                    }
                }
            } @else {
                p { "No transactions match the current filters." }
            }
        }
    }
}

#[cfg(test)]
mod reports_page_tests {
    use std::sync::{Arc, Mutex};

    use axum::extract::{Query, State};
    use rusqlite::Connection;
    use scraper::Selector;
    use time::macros::date;

    use crate::{
        db::initialize,
        pagination::PaginationConfig,
        test_utils::{assert_status_ok, assert_valid_html, parse_html_document},
        transaction::core::{TransactionType, create_transaction, sample_record},
    };

    use super::{ReportsPageState, ReportsQuery, get_reports_page, truncate_details};

    fn get_test_state() -> ReportsPageState {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        ReportsPageState {
            db_connection: Arc::new(Mutex::new(conn)),
            pagination_config: PaginationConfig::default(),
        }
    }

    fn insert_transactions(state: &ReportsPageState, count: i64) {
        let connection = state.db_connection.lock().unwrap();
        for i in 0..count {
            create_transaction(
                sample_record(date!(2025 - 01 - 01) + time::Duration::days(i)),
                &connection,
            )
            .unwrap();
        }
    }

    #[tokio::test]
    async fn shows_transactions_in_table() {
        let state = get_test_state();
        insert_transactions(&state, 3);

        let response = get_reports_page(State(state), Query(ReportsQuery::default()))
            .await
            .unwrap();

        assert_status_ok(&response);

        let html = parse_html_document(response).await;
        assert_valid_html(&html);

        let rows: Vec<_> = html.select(&Selector::parse("tbody tr").unwrap()).collect();
        assert_eq!(rows.len(), 3);
    }

    #[tokio::test]
    async fn empty_database_shows_empty_state() {
        let state = get_test_state();

        let response = get_reports_page(State(state), Query(ReportsQuery::default()))
            .await
            .unwrap();

        let html = parse_html_document(response).await;
        let text = html.root_element().text().collect::<String>();
        assert!(text.contains("No transactions recorded yet."));
    }

    #[tokio::test]
    async fn filter_excluding_everything_shows_no_match_message() {
        let state = get_test_state();
        insert_transactions(&state, 3);

        let query = ReportsQuery {
            transaction_type: Some(TransactionType::Expense.to_string()),
            ..Default::default()
        };
        let response = get_reports_page(State(state), Query(query)).await.unwrap();

        let html = parse_html_document(response).await;
        let text = html.root_element().text().collect::<String>();
        assert!(text.contains("No transactions match the current filters."));
    }

    #[tokio::test]
    async fn pagination_limits_rows_per_page() {
        let state = get_test_state();
        insert_transactions(&state, 15);

        let response = get_reports_page(State(state), Query(ReportsQuery::default()))
            .await
            .unwrap();

        let html = parse_html_document(response).await;
        let rows: Vec<_> = html.select(&Selector::parse("tbody tr").unwrap()).collect();
        assert_eq!(rows.len(), 10, "only one page of rows should be shown");

        let nav: Vec<_> = html
            .select(&Selector::parse("nav[aria-label=pagination]").unwrap())
            .collect();
        assert_eq!(nav.len(), 1, "pagination nav should be shown");
    }

    #[tokio::test]
    async fn invalid_filter_values_are_ignored() {
        let state = get_test_state();
        insert_transactions(&state, 2);

        let query = ReportsQuery {
            start_date: Some("not-a-date".to_owned()),
            transaction_type: Some("BARTER".to_owned()),
            ..Default::default()
        };
        let response = get_reports_page(State(state), Query(query)).await.unwrap();

        let html = parse_html_document(response).await;
        let rows: Vec<_> = html.select(&Selector::parse("tbody tr").unwrap()).collect();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn missing_notice_shows_banner() {
        let state = get_test_state();

        let query = ReportsQuery {
            notice: Some("missing".to_owned()),
            ..Default::default()
        };
        let response = get_reports_page(State(state), Query(query)).await.unwrap();

        let html = parse_html_document(response).await;
        let text = html.root_element().text().collect::<String>();
        assert!(text.contains("could not be loaded for editing"));
    }

    #[test]
    fn truncate_details_keeps_short_text() {
        assert_eq!(truncate_details("sold at market"), "sold at market");
    }

    #[test]
    fn truncate_details_shortens_long_text() {
        let long_text = "a very long note about the transaction that keeps going";

        let truncated = truncate_details(long_text);

        assert!(truncated.ends_with('…'));
        assert!(truncated.chars().count() <= 31);
    }
}
