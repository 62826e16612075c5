//! Builds the log-in redirect URLs used when a session is missing or expired.

use axum::extract::Request;

use crate::endpoints;

/// Check that `raw_url` is a local path that is safe to redirect to after
/// log-in.
///
/// Returns `None` for anything that is not a same-site absolute path, such as
/// protocol-relative URLs ("//evil.example") or full URLs.
pub(crate) fn normalize_redirect_url(raw_url: &str) -> Option<String> {
    // HX-Current-URL contains a full URL, so strip the scheme and host first.
    let path = if let Some(scheme_end) = raw_url.find("://") {
        let after_scheme = &raw_url[scheme_end + 3..];
        match after_scheme.find('/') {
            Some(path_start) => &after_scheme[path_start..],
            None => return None,
        }
    } else {
        raw_url
    };

    if path.starts_with('/') && !path.starts_with("//") {
        Some(path.to_owned())
    } else {
        None
    }
}

/// Build the URL of the log-in page with `target` as the `redirect_url`
/// query parameter, so that the user lands back where they were after
/// logging in.
pub(crate) fn build_log_in_redirect_url_from_target(target: &str) -> Option<String> {
    let target = normalize_redirect_url(target)?;

    serde_urlencoded::to_string([("redirect_url", &target)])
        .inspect_err(|error| {
            tracing::error!("Could not encode redirect URL {target}: {error}");
        })
        .ok()
        .map(|query| format!("{}?{}", endpoints::LOG_IN_VIEW, query))
}

/// Build the log-in redirect URL for `request`.
///
/// For htmx requests the current page is taken from the HX-Current-URL
/// header, since the request URI points at an /api route the user should not
/// land on. For regular page loads the request URI itself is used.
pub(crate) fn build_log_in_redirect_url(request: &Request) -> Option<String> {
    let target = if let Some(current_url) = request.headers().get("HX-Current-URL") {
        current_url.to_str().ok()?.to_owned()
    } else {
        let uri = request.uri();
        match uri.query() {
            Some(query) => format!("{}?{}", uri.path(), query),
            None => uri.path().to_owned(),
        }
    };

    build_log_in_redirect_url_from_target(&target)
}

#[cfg(test)]
mod redirect_tests {
    use crate::endpoints;

    use super::{build_log_in_redirect_url_from_target, normalize_redirect_url};

    #[test]
    fn accepts_local_path() {
        assert_eq!(
            normalize_redirect_url("/transactions?page=2"),
            Some("/transactions?page=2".to_owned())
        );
    }

    #[test]
    fn strips_scheme_and_host_from_full_url() {
        assert_eq!(
            normalize_redirect_url("https://ledger.example/transactions"),
            Some("/transactions".to_owned())
        );
    }

    #[test]
    fn rejects_protocol_relative_url() {
        assert_eq!(normalize_redirect_url("//evil.example/steal"), None);
    }

    #[test]
    fn rejects_relative_path() {
        assert_eq!(normalize_redirect_url("transactions"), None);
    }

    #[test]
    fn builds_log_in_url_with_encoded_target() {
        let url = build_log_in_redirect_url_from_target("/transactions?page=2").unwrap();

        let expected_query =
            serde_urlencoded::to_string([("redirect_url", "/transactions?page=2")]).unwrap();
        assert_eq!(url, format!("{}?{}", endpoints::LOG_IN_VIEW, expected_query));
    }
}
