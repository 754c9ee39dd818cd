// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeStatusClientError {
    #[error("the server rejected the prober API key")]
    Unauthorized,

    #[error("unexpected response status {status}: {message}")]
    UnexpectedStatus { status: StatusCode, message: String },

    #[error("malformed response: {message}")]
    Decode { message: String },

    #[error("request failed: {source}")]
    Request {
        #[from]
        source: reqwest::Error,
    },
}
