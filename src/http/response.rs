//! Responses generated by the proxy itself.
//!
//! # Responsibilities
//! - Build the canned plain-text responses (405, 400, 500, 502, 504)
//! - Read the status code back out of a raw response for logging/metrics
//!
//! # Design Decisions
//! - Every canned response is HTTP/1.0 with Content-Type and Content-Length
//! - Origin responses are never rewritten; they are relayed byte for byte

/// Status code and reason phrase of a proxy-generated response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    pub code: u16,
    pub reason: &'static str,
}

impl Status {
    pub const BAD_REQUEST: Status = Status { code: 400, reason: "Bad Request" };
    pub const METHOD_NOT_ALLOWED: Status = Status { code: 405, reason: "Method Not Allowed" };
    pub const INTERNAL_SERVER_ERROR: Status = Status { code: 500, reason: "Internal Server Error" };
    pub const BAD_GATEWAY: Status = Status { code: 502, reason: "Bad Gateway" };
    pub const GATEWAY_TIMEOUT: Status = Status { code: 504, reason: "Gateway Timeout" };
}

/// Build a complete plain-text response.
pub fn canned(status: Status, body: &str) -> Vec<u8> {
    format!(
        "HTTP/1.0 {} {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\n\r\n{}",
        status.code,
        status.reason,
        body.len(),
        body
    )
    .into_bytes()
}

/// The response sent for any method other than GET and POST.
pub fn method_not_allowed() -> Vec<u8> {
    canned(
        Status::METHOD_NOT_ALLOWED,
        "Method Not Allowed: this proxy only supports GET and POST.\n",
    )
}

/// Status code from the status line of a raw response, if it has one.
pub fn status_code(response: &[u8]) -> Option<u16> {
    let line_end = response
        .iter()
        .position(|&b| b == b'\r' || b == b'\n')
        .unwrap_or(response.len());
    let line = std::str::from_utf8(&response[..line_end]).ok()?;
    let mut parts = line.split_whitespace();
    parts.next().filter(|v| v.starts_with("HTTP/"))?;
    parts.next()?.parse().ok()
}
