//! Cookie-based session authentication.
//!
//! A logged-in session is represented by a pair of private (signed and
//! encrypted) cookies holding the user ID and the session expiry. The
//! middleware in this module validates the cookies on every protected route,
//! extends the session on activity, and redirects expired sessions to the
//! log-in page.

mod cookie;
mod middleware;
mod redirect;

pub(crate) use cookie::{
    COOKIE_USER_ID, DEFAULT_COOKIE_DURATION, invalidate_auth_cookie, set_auth_cookie,
};
pub(crate) use middleware::{AuthState, auth_guard, auth_guard_hx};
pub(crate) use redirect::normalize_redirect_url;
