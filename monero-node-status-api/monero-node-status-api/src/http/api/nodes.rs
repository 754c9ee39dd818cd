// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use axum::extract::{ConnectInfo, Path, Query, State};
use axum::{Json, Router};
use core::net::SocketAddr;
use monero_node_status_client::models::{ApiResponse, Node};

use crate::db::queries;
use crate::http::error::{ApiResult, HttpError};
use crate::http::models::{
    NodeFilters, NodeIdParam, ProbeLog, ProbeLogFilters, SubmitNodeRequest, SubmitNodeResponse,
};
use crate::http::state::AppState;
use crate::http::{PagedResult, Pagination};
use crate::nodes::{self, NodeSubmission, SubmitOutcome};

pub(crate) fn routes() -> Router<AppState> {
    Router::new()
        .route("/", axum::routing::get(list_nodes).post(submit_node))
        .route("/logs", axum::routing::get(probe_logs))
        .route("/id/:id", axum::routing::get(get_node))
        .route("/:id", axum::routing::get(get_node))
}

#[utoipa::path(
    tag = "Nodes",
    get,
    params(Pagination, NodeFilters),
    path = "/api/v1/nodes",
    responses(
        (status = 200, body = ApiResponse<PagedResult<Node>>)
    )
)]
#[tracing::instrument(level = "debug", skip_all)]
pub(crate) async fn list_nodes(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
    Query(filters): Query<NodeFilters>,
) -> ApiResult<PagedResult<Node>> {
    let (limit, offset) = pagination.limit_offset();
    let (nodes, total) = queries::nodes::list_nodes(state.db_pool(), &filters, limit, offset)
        .await
        .map_err(HttpError::internal_with_logging)?;

    let items = nodes.into_iter().map(Node::from).collect();
    Ok(Json(ApiResponse::ok(
        "Nodes",
        PagedResult::from_page(pagination, total, items),
    )))
}

#[utoipa::path(
    tag = "Nodes",
    get,
    params(NodeIdParam),
    path = "/api/v1/nodes/id/{id}",
    responses(
        (status = 200, body = ApiResponse<Node>),
        (status = 404, description = "unknown node id")
    )
)]
#[tracing::instrument(level = "debug", skip_all)]
pub(crate) async fn get_node(
    Path(NodeIdParam { id }): Path<NodeIdParam>,
    State(state): State<AppState>,
) -> ApiResult<Node> {
    queries::nodes::get_node(state.db_pool(), id)
        .await
        .map_err(HttpError::internal_with_logging)?
        .map(|node| Json(ApiResponse::ok("Node", Node::from(node))))
        .ok_or_else(|| HttpError::not_found("Node not found"))
}

#[utoipa::path(
    tag = "Nodes",
    post,
    request_body = SubmitNodeRequest,
    path = "/api/v1/nodes",
    responses(
        (status = 200, body = ApiResponse<SubmitNodeResponse>),
        (status = 400, description = "submission rejected")
    )
)]
#[tracing::instrument(level = "debug", skip_all)]
pub(crate) async fn submit_node(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    Json(request): Json<SubmitNodeRequest>,
) -> ApiResult<SubmitNodeResponse> {
    let submission = NodeSubmission {
        protocol: request.protocol,
        hostname: request.hostname,
        port: request.port,
    };
    let submitter_ip = connect_info.map(|ConnectInfo(addr)| addr.ip());

    let outcome = nodes::submit_node(
        state.db_pool(),
        state.resolver(),
        submission,
        submitter_ip,
        state.ip_hash_salt(),
    )
    .await
    .map_err(|err| {
        if err.is_rejection() {
            tracing::debug!("Rejected node submission: {err}");
            HttpError::invalid_input(err.to_string())
        } else {
            HttpError::internal_with_logging(err)
        }
    })?;

    let (message, response) = match outcome {
        SubmitOutcome::Added(node_id) => (
            "Node added",
            SubmitNodeResponse {
                node_id,
                restored: false,
            },
        ),
        SubmitOutcome::Restored(node_id) => (
            "Node restored",
            SubmitNodeResponse {
                node_id,
                restored: true,
            },
        ),
    };

    Ok(Json(ApiResponse::ok(message, response)))
}

#[utoipa::path(
    tag = "Nodes",
    get,
    params(Pagination, ProbeLogFilters),
    path = "/api/v1/nodes/logs",
    responses(
        (status = 200, body = ApiResponse<PagedResult<ProbeLog>>)
    )
)]
#[tracing::instrument(level = "debug", skip_all)]
pub(crate) async fn probe_logs(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
    Query(filters): Query<ProbeLogFilters>,
) -> ApiResult<PagedResult<ProbeLog>> {
    let (limit, offset) = pagination.limit_offset();
    let (logs, total) =
        queries::probe_logs::list_probe_logs(state.db_pool(), &filters, limit, offset)
            .await
            .map_err(HttpError::internal_with_logging)?;

    let items = logs.into_iter().map(ProbeLog::from).collect();
    Ok(Json(ApiResponse::ok(
        "Probe logs",
        PagedResult::from_page(pagination, total, items),
    )))
}
