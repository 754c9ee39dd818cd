// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use crate::cli::ProberConfig;
use crate::error::ProberError;
use crate::probe::{probe_node, MoneroRpc};
use monero_node_status_client::models::ProbeReport;
use monero_node_status_client::NodeStatusClient;
use std::time::Instant;

pub(crate) async fn run_probe(config: &ProberConfig) -> Result<(), ProberError> {
    let client = NodeStatusClient::new(&config.server_endpoint, &config.api_key)?;

    tracing::info!(
        "Requesting job from {} ({:?})",
        config.server_endpoint,
        config.capabilities()
    );
    let Some(node) = client.request_job(config.capabilities()).await? else {
        tracing::info!("No job available");
        return Ok(());
    };

    let rpc = MoneroRpc::for_node(&node, config).map_err(|source| ProberError::Probe {
        endpoint: node.rpc_url(),
        source,
    })?;
    tracing::info!("Probing node {} at {}", node.id, rpc.endpoint());

    let started = Instant::now();
    let outcome = probe_node(&rpc, node.clone(), &config.origin).await;
    let took_time = started.elapsed().as_secs_f64();

    match outcome {
        Ok(probed) => {
            let report = ProbeReport {
                took_time,
                message: String::new(),
                node: probed,
            };
            client.submit_report(&report).await?;
            tracing::info!(
                "✅ Node {} is online at height {} ({:.3}s)",
                report.node.id,
                report.node.height,
                took_time
            );
            Ok(())
        }
        Err(source) => {
            tracing::warn!("❌ Node {} failed: {source}", node.id);

            let mut failed = node;
            failed.is_available = false;
            let report = ProbeReport {
                took_time,
                message: source.to_string(),
                node: failed,
            };
            // the server still needs the data point, but its failure must not hide ours
            if let Err(err) = client.submit_report(&report).await {
                tracing::warn!("Failed to report the failure for node {}: {err}", report.node.id);
            }

            Err(ProberError::Probe {
                endpoint: rpc.endpoint().to_string(),
                source,
            })
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::get;
    use axum::{Json, Router};
    use monero_node_status_client::models::{ApiResponse, Node};
    use monero_node_status_client::API_KEY_HEADER;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct FakeServer {
        target_port: u16,
        reports: Arc<Mutex<Vec<ProbeReport>>>,
    }

    async fn give_job(
        State(state): State<FakeServer>,
        headers: HeaderMap,
    ) -> (StatusCode, Json<ApiResponse<Node>>) {
        if headers.get(API_KEY_HEADER).is_none() {
            return (StatusCode::UNAUTHORIZED, Json(ApiResponse::error("Unauthorized")));
        }
        let node = Node {
            id: 42,
            hostname: "127.0.0.1".to_string(),
            port: state.target_port,
            protocol: "http".to_string(),
            last_check_status: serde_json::json!([2, 2, 2, 2, 2]),
            ..Default::default()
        };
        (StatusCode::OK, Json(ApiResponse::ok("Success", node)))
    }

    async fn take_report(
        State(state): State<FakeServer>,
        Json(report): Json<ProbeReport>,
    ) -> Json<ApiResponse<()>> {
        state.reports.lock().unwrap().push(report);
        Json(ApiResponse::ok("Success", ()))
    }

    #[tokio::test]
    async fn unreachable_node_is_still_reported() {
        // grab a free port and close it so the dial fails
        let closed = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let target_port = closed.local_addr().unwrap().port();
        drop(closed);

        let state = FakeServer {
            target_port,
            ..Default::default()
        };
        let router = Router::new()
            .route("/api/v1/job", get(give_job).post(take_report))
            .with_state(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router).await });

        let config = ProberConfig {
            server_endpoint: format!("http://{address}"),
            api_key: "key".to_string(),
            tor_socks: None,
            i2p_socks: None,
            accept_ipv6: false,
            origin: "http://localhost".to_string(),
        };

        let err = run_probe(&config).await.unwrap_err();
        assert!(matches!(err, ProberError::Probe { .. }));

        let reports = state.reports.lock().unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].node.id, 42);
        assert!(!reports[0].node.is_available);
        assert!(!reports[0].message.is_empty());
        assert_eq!(reports[0].node.last_check_status, serde_json::json!([2, 2, 2, 2, 2]));
    }
}
