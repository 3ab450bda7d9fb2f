use axum::http::{header::COOKIE, HeaderMap};

/// Look up a cookie value by name across every `Cookie` header.
///
/// Empty values are treated as missing, the same as an absent cookie.
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|header| header.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|pair| {
            let mut parts = pair.trim().splitn(2, '=');
            let key = parts.next()?.trim();
            let val = parts.next()?.trim();
            (key == name && !val.is_empty()).then_some(val)
        })
}

/// Whether the session marker cookie is present.
pub fn has_session_marker(headers: &HeaderMap, name: &str) -> bool {
    cookie_value(headers, name).is_some()
}
