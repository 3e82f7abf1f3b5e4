use axum::http::HeaderMap;

/// Key used when a request carries no forwarding information.
pub const ANONYMOUS_CLIENT: &str = "anonymous";

pub const FORWARDED_FOR: &str = "x-forwarded-for";

/// Derive the per-client key the admission gate buckets requests by.
///
/// Takes the left-most address of `X-Forwarded-For`. The header is set by the
/// caller or any proxy in between, so the key is spoofable: it deters abuse and
/// keeps clients fair, it does not authenticate anyone.
pub fn client_key(headers: &HeaderMap) -> String {
    headers
        .get(FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .and_then(|chain| chain.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| ANONYMOUS_CLIENT.to_string())
}
