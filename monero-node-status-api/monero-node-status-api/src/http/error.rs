// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use axum::http::StatusCode;
use axum::Json;
use monero_node_status_client::models::ApiResponse;
use std::fmt::Display;

pub(crate) type HttpResult<T> = Result<T, HttpError>;

/// Success body of every endpoint.
pub(crate) type ApiResult<T> = HttpResult<Json<ApiResponse<T>>>;

#[derive(Debug)]
pub(crate) struct HttpError {
    message: String,
    status: StatusCode,
}

impl HttpError {
    pub(crate) fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status,
        }
    }

    pub(crate) fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub(crate) fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub(crate) fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub(crate) fn internal_with_logging(msg: impl Display) -> Self {
        tracing::error!("{}", msg.to_string());
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }
}

impl axum::response::IntoResponse for HttpError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(ApiResponse::<()>::error(self.message))).into_response()
    }
}
