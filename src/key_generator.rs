//! Rate-limit key derivation.

use axum::extract::Request;
use std::fmt;
use std::sync::Arc;

/// How the middleware names the bucket a request counts against.
///
/// Strategies are tried in configuration order: an explicit key beats a
/// callback beats the method+path default.
#[derive(Clone, Default)]
pub enum KeyStrategy {
    /// Every request shares one fixed bucket.
    Static(String),
    /// Caller-supplied function of the request, e.g. an API key header or a
    /// user id stashed in the request extensions.
    Custom(Arc<dyn Fn(&Request) -> String + Send + Sync>),
    /// `"<lowercased method>-<path>"`, one bucket per route.
    #[default]
    MethodPath,
}

impl fmt::Debug for KeyStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(key) => f.debug_tuple("Static").field(key).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
            Self::MethodPath => f.write_str("MethodPath"),
        }
    }
}

impl KeyStrategy {
    /// Derive the sanitized bucket key for `request`.
    pub fn derive(&self, request: &Request) -> String {
        let raw = match self {
            Self::Static(key) => key.clone(),
            Self::Custom(derive) => derive(request),
            Self::MethodPath => format!(
                "{}-{}",
                request.method().as_str().to_lowercase(),
                request.uri().path()
            ),
        };
        sanitize(&raw)
    }
}

/// Restrict a key to characters that are safe in any backing store.
pub fn sanitize(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, ':' | '-' | '_' | '.' | '/') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Method;

    fn request(method: Method, uri: &str) -> Request {
        axum::http::Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn method_path_is_the_default() {
        let strategy = KeyStrategy::default();
        let key = strategy.derive(&request(Method::GET, "/api/users"));
        assert_eq!(key, "get-/api/users");
    }

    #[test]
    fn method_path_ignores_the_query_string() {
        let strategy = KeyStrategy::MethodPath;
        let key = strategy.derive(&request(Method::POST, "/search?q=rust"));
        assert_eq!(key, "post-/search");
    }

    #[test]
    fn static_key_is_shared_by_all_requests() {
        let strategy = KeyStrategy::Static("global".to_string());
        assert_eq!(strategy.derive(&request(Method::GET, "/a")), "global");
        assert_eq!(strategy.derive(&request(Method::PUT, "/b")), "global");
    }

    #[test]
    fn custom_callback_sees_the_request() {
        let strategy = KeyStrategy::Custom(Arc::new(|req: &Request| {
            req.headers()
                .get("x-api-key")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("anonymous")
                .to_string()
        }));

        let mut req = request(Method::GET, "/a");
        req.headers_mut()
            .insert("x-api-key", "abc123".parse().unwrap());
        assert_eq!(strategy.derive(&req), "abc123");
        assert_eq!(strategy.derive(&request(Method::GET, "/a")), "anonymous");
    }

    #[test]
    fn derived_keys_are_sanitized() {
        let strategy = KeyStrategy::Static("user@example.com key".to_string());
        assert_eq!(
            strategy.derive(&request(Method::GET, "/")),
            "user_example.com_key"
        );
        assert_eq!(sanitize("a:b-c_d/e.f"), "a:b-c_d/e.f");
    }
}
