//! The 404 not found page.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::html::error_view;

/// Route handler for pages that do not exist.
pub async fn get_404_not_found() -> Response {
    get_404_not_found_response()
}

/// Get a response containing the full 404 page.
pub(crate) fn get_404_not_found_response() -> Response {
    let page = error_view(
        "404 Not Found",
        "404",
        "Page not found",
        "Sorry, we can't find that page. You'll find lots to explore on the home page.",
    );

    (StatusCode::NOT_FOUND, page).into_response()
}

#[cfg(test)]
mod not_found_tests {
    use axum::http::StatusCode;

    use crate::test_utils::parse_html_document;

    use super::get_404_not_found;

    #[tokio::test]
    async fn returns_not_found_page() {
        let response = get_404_not_found().await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let html = parse_html_document(response).await;
        let text = html.root_element().text().collect::<String>();
        assert!(text.contains("Page not found"));
    }
}
