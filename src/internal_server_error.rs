//! The 500 internal server error page.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::html::error_view;

/// The contents of the internal server error page.
pub struct InternalServerErrorPage<'a> {
    /// A short description of what went wrong.
    pub description: &'a str,
    /// What the user can do about it.
    pub fix: &'a str,
}

impl Default for InternalServerErrorPage<'_> {
    fn default() -> Self {
        Self {
            description: "Sorry, something went wrong.",
            fix: "Try again later or check the server logs",
        }
    }
}

/// Route handler for the internal server error page.
pub async fn get_internal_server_error_page() -> Response {
    render_internal_server_error(Default::default())
}

/// Render `page` with a 500 status code.
pub(crate) fn render_internal_server_error(page: InternalServerErrorPage) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        error_view("500 Internal Server Error", "500", page.description, page.fix),
    )
        .into_response()
}

#[cfg(test)]
mod internal_server_error_tests {
    use axum::http::StatusCode;

    use crate::test_utils::parse_html_document;

    use super::get_internal_server_error_page;

    #[tokio::test]
    async fn returns_error_page() {
        let response = get_internal_server_error_page().await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let html = parse_html_document(response).await;
        let text = html.root_element().text().collect::<String>();
        assert!(text.contains("Sorry, something went wrong."));
    }
}
