// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Query, State};
use axum::http::HeaderMap;
use axum::{Json, Router};
use monero_node_status_client::models::{ApiResponse, Node, ProbeReport};
use monero_node_status_client::API_KEY_HEADER;

use crate::db::models::ProberDto;
use crate::db::queries;
use crate::http::error::{ApiResult, HttpError, HttpResult};
use crate::http::models::{JobRequestParams, ReportReceipt};
use crate::http::state::AppState;
use crate::jobs::{dispatch, report};

pub(crate) fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/job",
            axum::routing::get(request_job).post(submit_report),
        )
        .layer(DefaultBodyLimit::max(1024 * 1024))
}

async fn authenticate(state: &AppState, headers: &HeaderMap) -> HttpResult<ProberDto> {
    let Some(api_key) = headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
    else {
        return Err(HttpError::unauthorized("Unauthorized"));
    };

    queries::probers::get_prober_by_api_key(state.db_pool(), api_key)
        .await
        .map_err(HttpError::internal_with_logging)?
        .ok_or_else(|| HttpError::unauthorized("No API key match"))
}

#[utoipa::path(
    tag = "Jobs",
    get,
    params(JobRequestParams),
    path = "/api/v1/job",
    responses(
        (status = 200, body = ApiResponse<Node>),
        (status = 401, description = "missing or unknown prober key"),
        (status = 404, description = "no node to probe")
    )
)]
#[tracing::instrument(level = "debug", skip_all)]
pub(crate) async fn request_job(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<JobRequestParams>,
) -> ApiResult<Node> {
    let prober = authenticate(&state, &headers).await?;

    match dispatch::give_job(state.db_pool(), params.into()).await {
        Ok(Some(node)) => {
            tracing::info!(
                "🏃 Assigned node {} ({}) to prober {}",
                node.id,
                node.hostname,
                prober.name
            );
            Ok(Json(ApiResponse::ok("Job assigned", node)))
        }
        Ok(None) => {
            tracing::debug!("No job available for prober {}", prober.name);
            Err(HttpError::not_found("No node available"))
        }
        Err(err) => Err(HttpError::internal_with_logging(err)),
    }
}

#[utoipa::path(
    tag = "Jobs",
    post,
    request_body = ProbeReport,
    path = "/api/v1/job",
    responses(
        (status = 200, body = ApiResponse<ReportReceipt>),
        (status = 400, description = "malformed report"),
        (status = 401, description = "missing or unknown prober key")
    )
)]
#[tracing::instrument(level = "debug", skip_all)]
pub(crate) async fn submit_report(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ProbeReport>, JsonRejection>,
) -> ApiResult<ReportReceipt> {
    let prober = authenticate(&state, &headers).await?;
    let Json(report) = payload.map_err(|rejection| {
        tracing::debug!("Rejected report from {}: {}", prober.name, rejection);
        HttpError::invalid_input(rejection.body_text())
    })?;

    let node_id = report.node.id;
    let outcome = report::process_job(state.db_pool(), state.geo(), report, &prober)
        .await
        .map_err(|err| match err {
            report::ProcessJobError::MissingNodeId => HttpError::invalid_input(err.to_string()),
            other => HttpError::internal_with_logging(other),
        })?;

    tracing::info!(
        "✅ Prober {} submitted node {}: {} ({} non-fatal errors)",
        prober.name,
        node_id,
        outcome.window,
        outcome.non_fatal.len()
    );

    Ok(Json(ApiResponse::ok(
        "Report accepted",
        ReportReceipt {
            node_id,
            uptime: outcome.uptime,
            last_check_status: outcome.window.codes().to_vec(),
            archived: outcome.retired,
        },
    )))
}
