// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use crate::cli::ProberConfig;
use hickory_resolver::{Resolver, TokioResolver};
use monero_node_status_client::models::Node;
use reqwest::header::{ACCESS_CONTROL_ALLOW_ORIGIN, ORIGIN};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::net::IpAddr;
use std::time::Duration;
use thiserror::Error;

const ANONYMITY_NETWORK_TIMEOUT: Duration = Duration::from_secs(60);
const USER_AGENT: &str = concat!("monero-node-status-agent/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub(crate) enum RpcError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("unexpected HTTP status {0}")]
    Status(StatusCode),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("node reported status {0:?}")]
    NodeStatus(String),

    #[error("no {0} SOCKS proxy configured")]
    MissingProxy(&'static str),
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GetInfo {
    #[serde(default)]
    pub(crate) status: String,
    #[serde(default)]
    pub(crate) nettype: String,
    #[serde(default)]
    pub(crate) height: u64,
    #[serde(default)]
    pub(crate) adjusted_time: u64,
    #[serde(default)]
    pub(crate) database_size: u64,
    #[serde(default)]
    pub(crate) difficulty: u64,
    #[serde(default)]
    pub(crate) version: String,
}

#[derive(Debug, Deserialize)]
struct FeeEstimate {
    fee: u64,
}

/// JSON-RPC handle to one monero node, routed over the transport the node needs.
pub(crate) struct MoneroRpc {
    client: reqwest::Client,
    endpoint: String,
    origin: String,
}

impl MoneroRpc {
    pub(crate) fn for_node(node: &Node, config: &ProberConfig) -> Result<Self, RpcError> {
        let proxy = if node.is_tor {
            Some(config.tor_socks.as_deref().ok_or(RpcError::MissingProxy("tor"))?)
        } else if node.is_i2p {
            Some(config.i2p_socks.as_deref().ok_or(RpcError::MissingProxy("i2p"))?)
        } else {
            None
        };

        let builder = reqwest::Client::builder().user_agent(USER_AGENT);
        let client = match proxy {
            Some(socks) => {
                // socks5h so the proxy resolves .onion / .i2p names
                let proxy = reqwest::Proxy::all(format!("socks5h://{socks}"))
                    .map_err(RpcError::Client)?;
                builder
                    .proxy(proxy)
                    .pool_max_idle_per_host(0)
                    .timeout(ANONYMITY_NETWORK_TIMEOUT)
                    .build()
            }
            None => builder.build(),
        }
        .map_err(RpcError::Client)?;

        Ok(MoneroRpc {
            client,
            endpoint: node.rpc_url(),
            origin: config.origin.clone(),
        })
    }

    pub(crate) fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Returns the node info and the `Access-Control-Allow-Origin` header the node answered with.
    pub(crate) async fn get_info(&self) -> Result<(GetInfo, Option<String>), RpcError> {
        let (info, allow_origin) = self.call::<GetInfo>("get_info").await?;
        if info.status != "OK" {
            return Err(RpcError::NodeStatus(info.status));
        }
        Ok((info, allow_origin))
    }

    pub(crate) async fn get_fee_estimate(&self) -> Result<u64, RpcError> {
        let (estimate, _) = self.call::<FeeEstimate>("get_fee_estimate").await?;
        Ok(estimate.fee)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
    ) -> Result<(T, Option<String>), RpcError> {
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": "0",
            "method": method,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .header(ORIGIN, &self.origin)
            .json(&body)
            .send()
            .await
            .map_err(RpcError::Transport)?;

        if response.status() != StatusCode::OK {
            return Err(RpcError::Status(response.status()));
        }

        let allow_origin = response
            .headers()
            .get(ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|value| value.to_str().ok())
            .map(ToString::to_string);

        let bytes = response.bytes().await.map_err(RpcError::Transport)?;
        let decoded: JsonRpcResponse<T> = serde_json::from_slice(&bytes)
            .map_err(|err| RpcError::Malformed(format!("{method}: {err}")))?;

        if let Some(err) = decoded.error {
            return Err(RpcError::Malformed(format!(
                "{method} returned error {}: {}",
                err.code, err.message
            )));
        }
        let result = decoded
            .result
            .ok_or_else(|| RpcError::Malformed(format!("{method}: missing result")))?;

        Ok((result, allow_origin))
    }
}

/// Runs the RPC checks against `node` and returns it filled with what was observed.
pub(crate) async fn probe_node(
    rpc: &MoneroRpc,
    mut node: Node,
    origin: &str,
) -> Result<Node, RpcError> {
    let (info, allow_origin) = rpc.get_info().await?;
    let fee = rpc.get_fee_estimate().await?;

    node.is_available = true;
    node.nettype = info.nettype;
    node.height = info.height;
    node.adjusted_time = info.adjusted_time;
    node.database_size = info.database_size;
    node.difficulty = info.difficulty;
    node.version = info.version;
    node.estimate_fee = fee;
    node.cors_capable = is_cors_capable(allow_origin.as_deref(), origin);

    if !node.is_tor && !node.is_i2p {
        match resolve_ips(&node.hostname).await {
            Ok(ips) => {
                let summary = IpSummary::from_addresses(&ips);
                node.ip = summary.ip;
                node.ip_addresses = summary.ip_addresses;
                node.ipv6_only = summary.ipv6_only;
            }
            Err(err) => tracing::warn!("Could not resolve {}: {err}", node.hostname),
        }
    }

    Ok(node)
}

pub(crate) fn is_cors_capable(allow_origin: Option<&str>, origin: &str) -> bool {
    match allow_origin {
        Some(value) => {
            let value = value.trim();
            value == "*" || value.trim_end_matches('/') == origin.trim_end_matches('/')
        }
        None => false,
    }
}

async fn resolve_ips(hostname: &str) -> anyhow::Result<Vec<IpAddr>> {
    let resolver: TokioResolver = Resolver::builder_tokio()?.build();
    let lookup = resolver.lookup_ip(hostname).await?;
    Ok(lookup.iter().collect())
}

#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct IpSummary {
    pub(crate) ip: String,
    pub(crate) ip_addresses: String,
    pub(crate) ipv6_only: bool,
}

impl IpSummary {
    pub(crate) fn from_addresses(addresses: &[IpAddr]) -> Self {
        let Some(first) = addresses.first() else {
            return IpSummary::default();
        };

        IpSummary {
            ip: first.to_string(),
            ip_addresses: addresses
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(","),
            ipv6_only: addresses.iter().all(IpAddr::is_ipv6),
        }
    }
}
