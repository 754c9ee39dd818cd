// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use crate::api::ApiPaths;
use crate::models::{ApiResponse, JobCapabilities, Node, ProbeReport};
use reqwest::StatusCode;

mod api;
pub mod error;
pub mod models;

pub use error::NodeStatusClientError;

/// Header carrying the prober credential on every job request.
pub const API_KEY_HEADER: &str = "X-Prober-Api-Key";

const USER_AGENT: &str = concat!("monero-node-status-client/", env!("CARGO_PKG_VERSION"));

pub struct NodeStatusClient {
    client: reqwest::Client,
    api_key: String,
    api: ApiPaths,
}

impl NodeStatusClient {
    pub fn new(
        server_address: impl AsRef<str>,
        api_key: impl Into<String>,
    ) -> Result<Self, NodeStatusClientError> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        let server_address = server_address.as_ref().trim_end_matches('/').to_string();

        Ok(Self {
            client,
            api_key: api_key.into(),
            api: ApiPaths::new(server_address),
        })
    }

    /// Asks the server for the next node to probe.
    ///
    /// `Ok(None)` means the server had nothing eligible for the advertised
    /// capabilities, which is not an error.
    pub async fn request_job(
        &self,
        capabilities: JobCapabilities,
    ) -> Result<Option<Node>, NodeStatusClientError> {
        let target_url = self.api.request_job();
        let response = self
            .client
            .get(&target_url)
            .query(&capabilities.as_query())
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                let body = response.json::<ApiResponse<Node>>().await?;
                body.data
                    .map(Some)
                    .ok_or_else(|| NodeStatusClientError::Decode {
                        message: format!("job response without node: {}", body.message),
                    })
            }
            StatusCode::NOT_FOUND => {
                tracing::debug!("No job available");
                Ok(None)
            }
            StatusCode::UNAUTHORIZED => Err(NodeStatusClientError::Unauthorized),
            status => Err(unexpected_status(status, response).await),
        }
    }

    pub async fn submit_report(&self, report: &ProbeReport) -> Result<(), NodeStatusClientError> {
        let target_url = self.api.submit_report();
        let response = self
            .client
            .post(&target_url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(report)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                tracing::debug!("Report for node {} accepted", report.node.id);
                Ok(())
            }
            StatusCode::UNAUTHORIZED => Err(NodeStatusClientError::Unauthorized),
            status => Err(unexpected_status(status, response).await),
        }
    }
}

async fn unexpected_status(
    status: StatusCode,
    response: reqwest::Response,
) -> NodeStatusClientError {
    // prefer the envelope message, fall back to the raw body
    let raw = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiResponse<serde_json::Value>>(&raw)
        .map(|envelope| envelope.message)
        .unwrap_or(raw);

    NodeStatusClientError::UnexpectedStatus { status, message }
}
