// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token auth middleware (§6): every API route requires the 32-hex-character
//! token via header `x-blueprint-token` or query parameter `auth=`.

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::state::AppState;

const TOKEN_HEADER: &str = "x-blueprint-token";

fn token_from_query(query: &str) -> Option<&str> {
    query.split('&').find_map(|pair| pair.strip_prefix("auth=").filter(|v| !v.is_empty()))
}

pub async fn require_token(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let header_token = request.headers().get(TOKEN_HEADER).and_then(|v| v.to_str().ok());
    let query_token = request.uri().query().and_then(token_from_query);

    let supplied = header_token.or(query_token);
    if supplied == Some(state.token.as_ref()) {
        return next.run(request).await;
    }

    (StatusCode::UNAUTHORIZED, Json(json!({ "error": "missing or invalid auth token" }))).into_response()
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
