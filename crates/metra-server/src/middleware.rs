use crate::state::AppState;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use metra_common::sign;

const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Rejects POSTs whose `HashSHA256` header is missing or does not match
/// the body, before any handler or store mutation runs.
///
/// Active only when the server has a signing key configured. Sits inside
/// the decompression layer, so the signature is checked against the same
/// pre-compression bytes the agent signed.
pub async fn verify_signature(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let Some(key) = state.sign_key.clone() else {
        return next.run(req).await;
    };
    if req.method() != Method::POST {
        return next.run(req).await;
    }

    let (parts, body) = req.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(_) => {
            return (StatusCode::BAD_REQUEST, "unreadable request body").into_response();
        }
    };

    let valid = parts
        .headers
        .get(sign::SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|signature| sign::verify(&bytes, key.as_str(), signature))
        .unwrap_or(false);

    if !valid {
        tracing::warn!(path = %parts.uri.path(), "rejected request with missing or invalid signature");
        return (StatusCode::BAD_REQUEST, "invalid signature").into_response();
    }

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}
