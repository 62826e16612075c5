//! Alert messages for displaying transient success and error notices.
//!
//! Alerts are rendered as out-of-band swaps that replace the
//! `#alert-container` element, so any htmx response can surface a notice
//! without disturbing the content the request targeted.

use axum::response::{IntoResponse, Response};
use maud::{Markup, html};

/// Positioning for the alert container rendered at the bottom of every page.
pub const ALERT_CONTAINER_POSITION: &str =
    "position: fixed; bottom: 1rem; left: 50%; transform: translateX(-50%); z-index: 9999;";

/// A transient notice shown to the user at the bottom of the page.
#[derive(Debug, Clone, PartialEq)]
pub enum Alert {
    /// The operation succeeded.
    Success {
        message: String,
        details: String,
    },
    /// The operation failed.
    Error {
        message: String,
        details: String,
    },
    /// The operation failed, and there is nothing more to say about it.
    ErrorSimple {
        message: String,
    },
}

const SUCCESS_STYLE: &str = "flex flex-col gap-1 p-4 text-sm rounded-lg border \
    cursor-pointer text-green-800 bg-green-50 border-green-300 dark:bg-gray-800 \
    dark:text-green-400 dark:border-green-800";

const ERROR_STYLE: &str = "flex flex-col gap-1 p-4 text-sm rounded-lg border \
    cursor-pointer text-red-800 bg-red-50 border-red-300 dark:bg-gray-800 \
    dark:text-red-400 dark:border-red-800";

impl Alert {
    /// Render the alert as an out-of-band swap that replaces `#alert-container`.
    pub fn into_html(self) -> Markup {
        let (style, message, details) = match self {
            Alert::Success { message, details } => (SUCCESS_STYLE, message, details),
            Alert::Error { message, details } => (ERROR_STYLE, message, details),
            Alert::ErrorSimple { message } => (ERROR_STYLE, message, String::new()),
        };

        html! {
            div
                id="alert-container"
                hx-swap-oob="true"
                class="w-full max-w-md px-4"
                style=(ALERT_CONTAINER_POSITION)
            {
                div
                    role="alert"
                    class=(style)
                    onclick="this.parentElement.classList.add('hidden'); this.remove();"
                {
                    span class="font-medium whitespace-pre-line" { (message) }

                    @if !details.is_empty() {
                        span class="whitespace-pre-line" { (details) }
                    }

                    span class="text-xs text-gray-500 dark:text-gray-400" { "Click to dismiss" }
                }
            }
        }
    }
}

impl IntoResponse for Alert {
    fn into_response(self) -> Response {
        self.into_html().into_response()
    }
}

#[cfg(test)]
mod alert_tests {
    use super::Alert;

    #[test]
    fn success_alert_includes_message_and_details() {
        let markup = Alert::Success {
            message: "Saved".to_owned(),
            details: "The entry was recorded.".to_owned(),
        }
        .into_html()
        .into_string();

        assert!(markup.contains("Saved"));
        assert!(markup.contains("The entry was recorded."));
        assert!(markup.contains("hx-swap-oob"));
    }

    #[test]
    fn simple_error_alert_omits_details() {
        let markup = Alert::ErrorSimple {
            message: "Upload failed".to_owned(),
        }
        .into_html()
        .into_string();

        assert!(markup.contains("Upload failed"));
        assert_eq!(markup.matches("whitespace-pre-line").count(), 1);
    }
}
