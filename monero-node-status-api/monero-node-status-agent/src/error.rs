// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use crate::probe::RpcError;
use monero_node_status_client::NodeStatusClientError;
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum ProberError {
    #[error("invalid prober configuration: {message}")]
    Config { message: String },

    /// The server does not recognise our API key. Retrying won't help.
    #[error("the server rejected the configured API key")]
    Unauthorized,

    #[error("failed to talk to the status server: {source}")]
    Server {
        #[source]
        source: NodeStatusClientError,
    },

    #[error("probing {endpoint} failed: {source}")]
    Probe {
        endpoint: String,
        #[source]
        source: RpcError,
    },
}

impl ProberError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        ProberError::Config {
            message: message.into(),
        }
    }

    /// Whether running the prober again later may succeed.
    pub(crate) fn is_transient(&self) -> bool {
        matches!(self, ProberError::Server { .. } | ProberError::Probe { .. })
    }
}

impl From<NodeStatusClientError> for ProberError {
    fn from(source: NodeStatusClientError) -> Self {
        match source {
            NodeStatusClientError::Unauthorized => ProberError::Unauthorized,
            source => ProberError::Server { source },
        }
    }
}
