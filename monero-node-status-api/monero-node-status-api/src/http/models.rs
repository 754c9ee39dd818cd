// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use monero_node_status_client::models::JobCapabilities;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProbeLog {
    pub id: i64,
    pub node_id: i64,
    pub prober_id: i64,
    pub is_available: bool,
    pub height: u64,
    pub adjusted_time: u64,
    pub database_size: u64,
    pub difficulty: u64,
    pub estimate_fee: u64,
    pub date_checked: i64,
    pub failed_reason: String,
    /// Seconds
    pub fetch_runtime: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NetFee {
    pub nettype: String,
    pub estimate_fee: u64,
    pub node_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CountryCount {
    pub country_code: String,
    pub country_name: String,
    pub total_nodes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubmitNodeRequest {
    pub protocol: String,
    pub hostname: String,
    pub port: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub(crate) struct NodeFilters {
    /// `tor`, `i2p`, `http` or `https`
    pub(crate) protocol: Option<String>,
    pub(crate) nettype: Option<String>,
    /// `online` or `offline`
    pub(crate) status: Option<String>,
    pub(crate) cors: Option<bool>,
    /// Substring of the hostname or resolved addresses
    pub(crate) host: Option<String>,
    pub(crate) asn: Option<u32>,
    /// ISO country code
    pub(crate) country: Option<String>,
    /// Archived nodes are hidden unless this is `true`
    pub(crate) archived: Option<bool>,
    /// `0` no, `1` yes, `2` not classified
    pub(crate) spynode: Option<u8>,
    /// `0` no, `1` yes, `2` not classified
    pub(crate) mrlban: Option<u8>,
    /// `0` no, `1` yes, `2` not classified
    pub(crate) dnsban: Option<u8>,
    /// `last_checked` (default) or `uptime`
    pub(crate) sort_by: Option<String>,
    /// `asc` or `desc` (default)
    pub(crate) sort_direction: Option<String>,
}

impl NodeFilters {
    /// `ORDER BY` clause for the requested sort, unknown values fall back to the default.
    pub(crate) fn order_by(&self) -> &'static str {
        let ascending = self.sort_direction.as_deref() == Some("asc");
        match (self.sort_by.as_deref(), ascending) {
            (Some("uptime"), true) => " ORDER BY uptime ASC, id ASC",
            (Some("uptime"), false) => " ORDER BY uptime DESC, id ASC",
            (_, true) => " ORDER BY last_checked ASC, id ASC",
            (_, false) => " ORDER BY last_checked DESC, id ASC",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub(crate) struct ProbeLogFilters {
    pub(crate) node_id: Option<i64>,
    /// `online` or `offline`
    pub(crate) status: Option<String>,
    /// Substring of the recorded failure reason
    pub(crate) failed_reason: Option<String>,
}

impl ProbeLogFilters {
    pub(crate) fn availability(&self) -> Option<bool> {
        match self.status.as_deref() {
            Some("online") => Some(true),
            Some("offline") => Some(false),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub(crate) struct JobRequestParams {
    /// `1` to accept tor nodes
    pub(crate) accept_tor: Option<u8>,
    /// `1` to accept i2p nodes
    pub(crate) accept_i2p: Option<u8>,
    /// `1` to accept IPv6 only nodes
    pub(crate) accept_ipv6: Option<u8>,
}

impl From<JobRequestParams> for JobCapabilities {
    fn from(value: JobRequestParams) -> Self {
        JobCapabilities {
            accept_tor: value.accept_tor == Some(1),
            accept_i2p: value.accept_i2p == Some(1),
            accept_ipv6: value.accept_ipv6 == Some(1),
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Path)]
pub(crate) struct NodeIdParam {
    pub(crate) id: i64,
}

/// What the server recorded for an accepted probe report.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReportReceipt {
    pub node_id: i64,
    pub uptime: Option<f64>,
    pub last_check_status: Vec<u8>,
    pub archived: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubmitNodeResponse {
    pub node_id: i64,
    /// `true` when an archived node was put back into rotation
    pub restored: bool,
}
