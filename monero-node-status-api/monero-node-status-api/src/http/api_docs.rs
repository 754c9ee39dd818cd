// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use crate::http::api::{jobs, nodes, stats};
use crate::http::models::{
    CountryCount, NetFee, ProbeLog, ReportReceipt, SubmitNodeRequest, SubmitNodeResponse,
};
use monero_node_status_client::models::{Node, ProbeReport, ResponseStatus, TriState};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(title = "Monero Node Status API"),
    tags(
        (name = "Jobs", description = "Probe job dispatch and report ingestion"),
        (name = "Nodes", description = "Monitored nodes and their probe history"),
        (name = "Stats", description = "Network wide aggregates")
    ),
    paths(
        jobs::request_job,
        jobs::submit_report,
        nodes::list_nodes,
        nodes::get_node,
        nodes::submit_node,
        nodes::probe_logs,
        stats::net_fees,
        stats::countries,
    ),
    components(schemas(
        Node,
        ProbeReport,
        ResponseStatus,
        TriState,
        ProbeLog,
        NetFee,
        CountryCount,
        ReportReceipt,
        SubmitNodeRequest,
        SubmitNodeResponse,
    ))
)]
pub(super) struct ApiDoc;
