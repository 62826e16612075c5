//! This file defines the routes for displaying the log-in page and handling log-in requests.
//! The auth module handles the lower level authentication and cookie auth logic.

use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;
use time::Duration;

use crate::{
    AppState, Error,
    auth::{normalize_redirect_url, set_auth_cookie},
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, base, loading_spinner,
    },
    user::{User, get_user_by_name},
};

fn log_in_form(username: &str, error_message: Option<&str>, redirect_url: Option<&str>) -> Markup {
    html! {
        form
            hx-post=(endpoints::LOG_IN_API)
            hx-indicator="#indicator"
            hx-disabled-elt="#username, #password, #submit-button"
            class="space-y-4 md:space-y-6"
        {
            @if let Some(redirect_url) = redirect_url {
                input type="hidden" name="redirect_url" value=(redirect_url);
            }

            div
            {
                label for="username" class=(FORM_LABEL_STYLE) { "Username" }

                input
                    type="text"
                    name="username"
                    id="username"
                    placeholder="Username"
                    class=(FORM_TEXT_INPUT_STYLE)
                    required
                    autofocus
                    value=(username);
            }

            div
            {
                label for="password" class=(FORM_LABEL_STYLE) { "Password" }

                input
                    type="password"
                    name="password"
                    id="password"
                    placeholder="••••••••"
                    class=(FORM_TEXT_INPUT_STYLE)
                    required;

                @if let Some(error_message) = error_message
                {
                    p class="text-red-500 text-base" { (error_message) }
                }
            }

            div class="flex items-center gap-x-3"
            {
                input
                    type="checkbox"
                    name="remember_me"
                    id="remember_me"
                    tabindex="0"
                    class="rounded-xs";

                label
                    for="remember_me"
                    class="block text-sm font-medium text-gray-900 dark:text-white"
                {
                    "Keep me logged in for one week"
                }
            }

            button
                type="submit" id="submit-button" tabindex="0"
                class=(BUTTON_PRIMARY_STYLE)
            {
                span class="inline htmx-indicator" id="indicator"
                {
                    (loading_spinner())
                }
                "Log in"
            }
        }
    }
}

fn log_in_view(username: &str, error_message: Option<&str>, redirect_url: Option<&str>) -> Markup {
    let form = log_in_form(username, error_message, redirect_url);

    let content = html! {
        div class="flex flex-col items-center justify-center px-6 py-8 mx-auto"
        {
            a href="#" class="flex items-center mb-6 text-2xl font-semibold text-gray-900 dark:text-white"
            {
                img class="w-8 h-8 mr-2" src="/static/favicon-32x32.png" alt="logo";
                "Poultry Ledger"
            }

            div class="w-full bg-white rounded-lg shadow dark:border md:mt-0 sm:max-w-md xl:p-0 dark:bg-gray-800 dark:border-gray-700"
            {
                div class="p-6 space-y-4 md:space-y-6 sm:p-8"
                {
                    h1 class="text-xl font-bold leading-tight tracking-tight text-gray-900 md:text-2xl dark:text-white"
                    {
                        "Log in to your books"
                    }

                    (form)
                }
            }
        }
    };

    base("Log In", &[], &content)
}

fn parse_redirect_url(raw_url: Option<&str>, source: &str) -> Option<String> {
    match raw_url.and_then(normalize_redirect_url) {
        Some(redirect_url) => Some(redirect_url),
        None => {
            if let Some(redirect_url) = raw_url {
                tracing::warn!("Invalid redirect URL from {source}: {redirect_url}");
            }
            None
        }
    }
}

/// The query parameters accepted by the log-in page.
#[derive(Debug, Deserialize)]
pub struct RedirectQuery {
    /// Where to send the user after a successful log-in.
    pub redirect_url: Option<String>,
}

/// Display the log-in page.
pub async fn get_log_in_page(Query(query): Query<RedirectQuery>) -> Response {
    let redirect_url = parse_redirect_url(query.redirect_url.as_deref(), "log-in query");
    log_in_view("", None, redirect_url.as_deref()).into_response()
}

/// How long the auth cookie should last if the user selects "remember me" at log-in.
const REMEMBER_ME_COOKIE_DURATION: Duration = Duration::days(7);

/// The state needed to perform a login.
#[derive(Debug, Clone)]
pub struct LogInState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    /// The database connection for fetching the user account.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for LogInState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            db_connection: state.db_connection.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<LogInState> for Key {
    fn from_ref(state: &LogInState) -> Self {
        state.cookie_key.clone()
    }
}

/// The data submitted from the log-in form.
#[derive(Debug, Deserialize)]
pub struct LogInData {
    /// The name the user logs in with.
    pub username: String,
    /// The user's raw password.
    pub password: String,
    /// Whether to keep the user logged in for a week.
    #[serde(default)]
    pub remember_me: Option<String>,
    /// Where to send the user after a successful log-in.
    #[serde(default)]
    pub redirect_url: Option<String>,
}

pub const INVALID_CREDENTIALS_ERROR_MSG: &str = "Incorrect username or password.";

/// Handler for log-in requests via the POST method.
///
/// On a successful log-in request, the auth cookie is set and the client is
/// redirected to the page it was originally headed for, or the dashboard.
/// Otherwise, the form is returned with an error message explaining the problem.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn post_log_in(
    State(state): State<LogInState>,
    jar: PrivateCookieJar,
    Form(user_data): Form<LogInData>,
) -> Response {
    let redirect_url = parse_redirect_url(user_data.redirect_url.as_deref(), "log-in form");
    let redirect_url = redirect_url.as_deref();

    let user: User = match get_user_by_name(
        &user_data.username,
        &state
            .db_connection
            .lock()
            .expect("Could not acquire lock to database connection"),
    ) {
        Ok(user) => user,
        Err(Error::NotFound) => {
            return log_in_form(
                &user_data.username,
                Some(INVALID_CREDENTIALS_ERROR_MSG),
                redirect_url,
            )
            .into_response();
        }
        Err(error) => {
            tracing::error!("Unhandled error while verifying credentials: {error}");
            return log_in_form(
                &user_data.username,
                Some("An internal error occurred. Please try again later."),
                redirect_url,
            )
            .into_response();
        }
    };

    let is_password_valid = match user.password_hash.verify(&user_data.password) {
        Ok(is_password_valid) => is_password_valid,
        Err(error) => {
            tracing::error!("Unhandled error while verifying password: {error}");
            return log_in_form(
                &user_data.username,
                Some("An internal error occurred. Please try again later."),
                redirect_url,
            )
            .into_response();
        }
    };

    if !is_password_valid {
        return log_in_form(
            &user_data.username,
            Some(INVALID_CREDENTIALS_ERROR_MSG),
            redirect_url,
        )
        .into_response();
    }

    let cookie_duration = if user_data.remember_me.is_some() {
        REMEMBER_ME_COOKIE_DURATION
    } else {
        state.cookie_duration
    };

    let jar = match set_auth_cookie(jar, user.id, cookie_duration) {
        Ok(jar) => jar,
        Err(error) => {
            tracing::error!("Could not set auth cookie: {error}");
            return log_in_form(
                &user_data.username,
                Some("An internal error occurred. Please try again later."),
                redirect_url,
            )
            .into_response();
        }
    };

    let destination = redirect_url.unwrap_or(endpoints::DASHBOARD_VIEW).to_owned();

    (
        jar,
        HxRedirect(destination),
        StatusCode::SEE_OTHER,
    )
        .into_response()
}

#[cfg(test)]
mod log_in_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Form,
        extract::{Query, State},
        http::StatusCode,
        response::IntoResponse,
    };
    use axum_extra::extract::{PrivateCookieJar, cookie::Key};
    use rusqlite::Connection;
    use sha2::{Digest, Sha512};

    use crate::{
        PasswordHash, ValidatedPassword,
        auth::DEFAULT_COOKIE_DURATION,
        db::initialize,
        endpoints,
        test_utils::{
            assert_form_error_message, assert_hx_redirect, must_get_form, parse_html_document,
            parse_html_fragment,
        },
        user::create_user,
    };

    use super::{LogInData, LogInState, RedirectQuery, get_log_in_page, post_log_in};

    const TEST_USERNAME: &str = "sridhar";
    const TEST_PASSWORD: &str = "okon";

    fn get_test_state() -> LogInState {
        let connection =
            Connection::open_in_memory().expect("Could not open in-memory SQLite database");
        initialize(&connection).expect("Could not initialize database");

        let password_hash =
            PasswordHash::new(ValidatedPassword::new_unchecked(TEST_PASSWORD)).unwrap();
        create_user(TEST_USERNAME, password_hash, &connection).expect("Could not create user");

        LogInState {
            cookie_key: Key::from(&Sha512::digest("a secret")),
            cookie_duration: DEFAULT_COOKIE_DURATION,
            db_connection: Arc::new(Mutex::new(connection)),
        }
    }

    fn get_jar(state: &LogInState) -> PrivateCookieJar {
        PrivateCookieJar::new(state.cookie_key.clone())
    }

    fn log_in_form(username: &str, password: &str) -> LogInData {
        LogInData {
            username: username.to_owned(),
            password: password.to_owned(),
            remember_me: None,
            redirect_url: None,
        }
    }

    #[tokio::test]
    async fn log_in_page_contains_form() {
        let response = get_log_in_page(Query(RedirectQuery { redirect_url: None })).await;

        assert_eq!(response.status(), StatusCode::OK);

        let html = parse_html_document(response).await;
        let form = must_get_form(&html);
        assert_eq!(
            form.value().attr("hx-post"),
            Some(endpoints::LOG_IN_API),
            "log-in form should post to the log-in API"
        );
    }

    #[tokio::test]
    async fn log_in_succeeds_with_valid_credentials() {
        let state = get_test_state();
        let jar = get_jar(&state);

        let response = post_log_in(
            State(state),
            jar,
            Form(log_in_form(TEST_USERNAME, TEST_PASSWORD)),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, endpoints::DASHBOARD_VIEW);
    }

    #[tokio::test]
    async fn log_in_redirects_to_original_destination() {
        let state = get_test_state();
        let jar = get_jar(&state);
        let mut form = log_in_form(TEST_USERNAME, TEST_PASSWORD);
        form.redirect_url = Some("/transactions?page=2".to_owned());

        let response = post_log_in(State(state), jar, Form(form))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, "/transactions?page=2");
    }

    #[tokio::test]
    async fn log_in_fails_with_wrong_password() {
        let state = get_test_state();
        let jar = get_jar(&state);

        let response = post_log_in(
            State(state),
            jar,
            Form(log_in_form(TEST_USERNAME, "wrong password")),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::OK);

        let html = parse_html_fragment(response).await;
        let form = must_get_form(&html);
        assert_form_error_message(&form, super::INVALID_CREDENTIALS_ERROR_MSG);
    }

    #[tokio::test]
    async fn log_in_fails_with_unknown_username() {
        let state = get_test_state();
        let jar = get_jar(&state);

        let response = post_log_in(
            State(state),
            jar,
            Form(log_in_form("nobody", TEST_PASSWORD)),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::OK);

        let html = parse_html_fragment(response).await;
        let form = must_get_form(&html);
        assert_form_error_message(&form, super::INVALID_CREDENTIALS_ERROR_MSG);
    }

    #[tokio::test]
    async fn remember_me_extends_cookie_duration() {
        let state = get_test_state();
        let jar = get_jar(&state);
        let mut form = log_in_form(TEST_USERNAME, TEST_PASSWORD);
        form.remember_me = Some("on".to_owned());

        let response = post_log_in(State(state), jar, Form(form))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let set_cookie = response
            .headers()
            .get("set-cookie")
            .expect("expected a set-cookie header")
            .to_str()
            .unwrap();
        assert!(
            set_cookie.contains("Expires="),
            "expected an expiring cookie, got {set_cookie}"
        );
    }
}
