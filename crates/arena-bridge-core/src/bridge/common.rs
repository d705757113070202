//! Small helpers shared by handlers, mappers and the link layer.

/// First eight characters of a request id, for log prefixes.
pub fn short_id(request_id: &str) -> &str {
    request_id.get(..8).unwrap_or(request_id)
}

/// Last six characters of a session id, for logs that must not leak the full id.
pub fn id_tail(id: &str) -> &str {
    let start = id.len().saturating_sub(6);
    id.get(start..).unwrap_or(id)
}
