//! Ready-made request and response filters.

use std::sync::Arc;

use regex::Regex;

use crate::config::{RequestFilter, ResponseFilter};

/// Log every request.
pub fn always() -> RequestFilter {
    Arc::new(|_: &[u8]| true)
}

/// Log no request.
pub fn never() -> RequestFilter {
    Arc::new(|_: &[u8]| false)
}

/// Log requests whose dump (read as lossy UTF-8) matches `pattern`.
pub fn matching(pattern: Regex) -> RequestFilter {
    Arc::new(move |dump: &[u8]| pattern.is_match(&String::from_utf8_lossy(dump)))
}

/// Log responses whose dump matches `pattern`, regardless of the request.
pub fn response_matching(pattern: Regex) -> ResponseFilter {
    Arc::new(move |dump: &[u8], _| pattern.is_match(&String::from_utf8_lossy(dump)))
}

/// Log a response only when its request was not logged.
pub fn unmatched_requests() -> ResponseFilter {
    Arc::new(|_: &[u8], request_matched| !request_matched)
}

/// Log a response only when its request was logged.
pub fn matched_requests() -> ResponseFilter {
    Arc::new(|_: &[u8], request_matched| request_matched)
}
