//! Browser-like request headers
//!
//! The header set only needs to be plausible, not byte-exact: a randomized
//! User-Agent per session plus the usual fetch metadata a browser would send.

use rand::seq::SliceRandom;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue};

use crate::session::SessionHandle;

/// User agents rotated across sessions
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36 Edg/119.0.0.0",
    "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0",
];

/// Pick a user agent for a freshly minted session
pub fn random_user_agent(rng: &mut impl Rng) -> &'static str {
    USER_AGENTS
        .choose(rng)
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

/// Common browser headers with no session identity attached
///
/// Used for the vocabulary fetch, which happens before any session exists.
pub fn plain_browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("Accept", HeaderValue::from_static("application/json, text/plain, */*"));
    headers.insert("Accept-Language", HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert("Accept-Encoding", HeaderValue::from_static("gzip, deflate, br"));
    headers.insert("Connection", HeaderValue::from_static("keep-alive"));
    headers.insert("Sec-Fetch-Dest", HeaderValue::from_static("empty"));
    headers.insert("Sec-Fetch-Mode", HeaderValue::from_static("cors"));
    headers.insert("Sec-Fetch-Site", HeaderValue::from_static("same-origin"));
    headers.insert("Pragma", HeaderValue::from_static("no-cache"));
    headers.insert("Cache-Control", HeaderValue::from_static("no-cache"));
    headers
}

/// Headers for a submission made through a session
///
/// Adds the session's User-Agent, a session cookie, and Origin/Referer
/// derived from the configured origin so each session looks like a distinct
/// browser tab on the target's page.
pub fn session_headers(session: &SessionHandle, origin: &str) -> HeaderMap {
    let mut headers = plain_browser_headers();

    if let Ok(ua) = HeaderValue::from_str(session.user_agent()) {
        headers.insert("User-Agent", ua);
    }
    if let Ok(cookie) = HeaderValue::from_str(&format!("session={}", session.token())) {
        headers.insert("Cookie", cookie);
    }
    if let Ok(value) = HeaderValue::from_str(origin) {
        headers.insert("Origin", value);
    }
    if let Ok(value) = HeaderValue::from_str(&format!("{}/", origin.trim_end_matches('/'))) {
        headers.insert("Referer", value);
    }

    headers
}
