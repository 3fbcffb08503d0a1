//! Security headers middleware.
//!
//! Locked-down defaults; the only third-party origin allowed is the backend,
//! which serves product and category images.

use axum::{
    extract::{Request, State},
    http::{
        HeaderName, HeaderValue,
        header::{
            CONTENT_SECURITY_POLICY, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS,
        },
    },
    middleware::Next,
    response::Response,
};
use url::Url;

use super::CspNonce;

/// Origins the content security policy needs to know about.
#[derive(Debug, Clone)]
pub struct SecurityPolicy {
    /// Origin of the backend file endpoint, e.g. `http://127.0.0.1:8090`.
    image_origin: String,
}

impl SecurityPolicy {
    #[must_use]
    pub fn new(backend_url: &Url) -> Self {
        Self {
            image_origin: backend_url.origin().ascii_serialization(),
        }
    }

    /// Build the `Content-Security-Policy` value.
    #[must_use]
    pub fn content_security_policy(&self, nonce: Option<&CspNonce>) -> String {
        let script_src = nonce.map_or_else(
            || "'self'".to_string(),
            |nonce| format!("'self' 'nonce-{}'", nonce.value()),
        );
        format!(
            "default-src 'none'; \
             script-src {script_src}; \
             style-src 'self'; \
             font-src 'self'; \
             img-src 'self' data: {}; \
             connect-src 'self'; \
             frame-src 'none'; \
             object-src 'none'; \
             base-uri 'self'; \
             form-action 'self'; \
             frame-ancestors 'none'",
            self.image_origin
        )
    }
}

/// Add security headers to every response.
///
/// - `X-Frame-Options: DENY`
/// - `X-Content-Type-Options: nosniff`
/// - `Referrer-Policy: same-origin`
/// - `Content-Security-Policy` with the request's nonce
/// - `Permissions-Policy` denying device features
/// - `Cross-Origin-Opener-Policy: same-origin`
pub async fn security_headers_middleware(
    State(policy): State<SecurityPolicy>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    let csp = policy.content_security_policy(response.extensions().get::<CspNonce>());
    let headers = response.headers_mut();

    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(REFERRER_POLICY, HeaderValue::from_static("same-origin"));

    if let Ok(value) = HeaderValue::from_str(&csp) {
        headers.insert(CONTENT_SECURITY_POLICY, value);
    }

    headers.insert(
        HeaderName::from_static("permissions-policy"),
        HeaderValue::from_static(
            "camera=(), geolocation=(), microphone=(), payment=(), usb=(), interest-cohort=()",
        ),
    );

    headers.insert(
        HeaderName::from_static("cross-origin-opener-policy"),
        HeaderValue::from_static("same-origin"),
    );

    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_allows_backend_images() {
        let policy = SecurityPolicy::new(&Url::parse("http://127.0.0.1:8090/").unwrap());
        let csp = policy.content_security_policy(None);
        assert!(csp.contains("img-src 'self' data: http://127.0.0.1:8090;"));
        assert!(csp.contains("script-src 'self';"));
    }

    #[test]
    fn test_policy_includes_nonce() {
        let policy = SecurityPolicy::new(&Url::parse("https://api.example.com").unwrap());
        let nonce = CspNonce("abc123".to_string());
        let csp = policy.content_security_policy(Some(&nonce));
        assert!(csp.contains("script-src 'self' 'nonce-abc123';"));
        assert!(csp.contains("https://api.example.com"));
    }
}
