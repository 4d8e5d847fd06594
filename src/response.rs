//! Rate-limit response surface: the standard headers and the 429 reply.

use crate::gcra::RateLimitDecision;
use axum::http::header::HeaderName;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

pub const LIMIT_HEADER: HeaderName = HeaderName::from_static("x-rate-limit-limit");
pub const REMAINING_HEADER: HeaderName = HeaderName::from_static("x-rate-limit-remaining");
pub const RESET_HEADER: HeaderName = HeaderName::from_static("x-rate-limit-reset");

/// Attach the three `X-Rate-Limit-*` headers, verbatim from the decision.
pub fn apply_rate_limit_headers(response: &mut Response, decision: &RateLimitDecision) {
    let headers = response.headers_mut();
    headers.insert(LIMIT_HEADER, HeaderValue::from(decision.limit));
    headers.insert(REMAINING_HEADER, HeaderValue::from(decision.remaining));
    headers.insert(RESET_HEADER, HeaderValue::from(decision.reset_after));
}

/// The short-circuit reply for a rejected request.
pub fn too_many_requests(decision: &RateLimitDecision) -> Response {
    let mut response = (StatusCode::TOO_MANY_REQUESTS, "Too Many Requests").into_response();
    apply_rate_limit_headers(&mut response, decision);
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decision() -> RateLimitDecision {
        RateLimitDecision {
            allowed: false,
            limit: 2,
            remaining: 0,
            reset_after: 100,
        }
    }

    #[test]
    fn headers_mirror_the_decision() {
        let mut response = ().into_response();
        apply_rate_limit_headers(&mut response, &decision());

        assert_eq!(response.headers()[&LIMIT_HEADER], "2");
        assert_eq!(response.headers()[&REMAINING_HEADER], "0");
        assert_eq!(response.headers()[&RESET_HEADER], "100");
    }

    #[test]
    fn rejection_is_a_plain_text_429() {
        let response = too_many_requests(&decision());
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[&REMAINING_HEADER], "0");
    }
}
