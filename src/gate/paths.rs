//! Path classification for the access gate.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// Paths that always pass, with or without a session (token refresh and logout).
const ALWAYS_ALLOWED: [&str; 3] = ["/refresh", "/logout", "/api/auth/logout"];

/// Path prefixes (after the leading `/`) the gate is never evaluated for.
const EXCLUDED_PREFIXES: [&str; 6] = [
    "api",
    "proxy",
    "_next/static",
    "_next/image",
    "favicon.ico",
    "refresh",
];

/// Pages reachable without a session under the `require-session` policy.
const PUBLIC_PATHS: [&str; 5] = ["/", "/auth", "/auth/error", "/api/oauth", "/favicon.ico"];

const PUBLIC_PREFIXES: [&str; 2] = ["/_next/", "/images/"];

static STATIC_ASSET: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?i)\.(png|jpg|jpeg|gif|webp|svg|ico|css|js|map|txt)$").ok());

/// Base the request path is resolved against; only its path is ever read.
const RESOLVE_BASE: &str = "http://gate.invalid/";

/// Resolve `.` and `..` segments (plain or percent-encoded) and backslashes
/// with the same URL parser the upstream client uses, so the gate classifies
/// the path the origin will actually serve.
#[must_use]
pub fn normalize(path: &str) -> Option<String> {
    let mut url = Url::parse(RESOLVE_BASE).ok()?;
    url.set_path(path);
    Some(url.path().to_string())
}

/// `path` equals `base` or lives below it (`/logout/all` is under `/logout`,
/// `/logouts` is not).
#[must_use]
pub fn is_under(path: &str, base: &str) -> bool {
    path.strip_prefix(base)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

/// Whether the gate runs for this path at all.
#[must_use]
pub fn is_included(path: &str) -> bool {
    let rest = path.strip_prefix('/').unwrap_or(path);
    !EXCLUDED_PREFIXES
        .iter()
        .any(|prefix| rest.starts_with(prefix))
}

#[must_use]
pub fn is_always_allowed(path: &str) -> bool {
    ALWAYS_ALLOWED.iter().any(|base| is_under(path, base))
}

#[must_use]
pub fn is_public(path: &str) -> bool {
    PUBLIC_PATHS.iter().any(|base| is_under(path, base))
        || PUBLIC_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
        || STATIC_ASSET
            .as_ref()
            .is_some_and(|re| re.is_match(path))
}
