//! # Gateway Authentication
//!
//! Optional Bearer key for the HTTP gateway, set through
//! `CUBEBRIDGE_GATEWAY_KEY` or `gateway_key` in the config file. When set,
//! every route except `/health` requires `Authorization: Bearer <key>`.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Key comparison in constant time over the longer of the two lengths.
pub fn key_matches(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();

    let len = provided.len().max(expected.len());
    let mut lhs = vec![0u8; len];
    let mut rhs = vec![0u8; len];
    lhs[..provided.len()].copy_from_slice(provided);
    rhs[..expected.len()].copy_from_slice(expected);

    let same: bool = lhs.ct_eq(&rhs).into();
    same && provided.len() == expected.len()
}

/// Reject requests without the configured key.
pub async fn require_key(
    State(expected): State<Arc<str>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, &'static str)> {
    if request.uri().path() == "/health" {
        return Ok(next.run(request).await);
    }

    let provided = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.strip_prefix("Bearer ").unwrap_or(v));

    match provided {
        Some(key) if key_matches(key, &expected) => Ok(next.run(request).await),
        Some(_) => {
            tracing::warn!(
                event = "auth_failure",
                reason = "invalid_key",
                "Rejected gateway request"
            );
            Err((StatusCode::UNAUTHORIZED, "Unauthorized"))
        }
        None => {
            tracing::warn!(
                event = "auth_failure",
                reason = "missing_authorization_header",
                "Rejected gateway request"
            );
            Err((StatusCode::UNAUTHORIZED, "Unauthorized"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_keys_match() {
        assert!(key_matches("s3cret", "s3cret"));
    }

    #[test]
    fn prefix_and_padding_do_not_match() {
        assert!(!key_matches("s3cre", "s3cret"));
        assert!(!key_matches("s3cret\0", "s3cret"));
        assert!(!key_matches("", "s3cret"));
    }
}
