// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString, FromRepr};

/// Outcome of a ban/spy classification. `NotApplicable` covers nodes the
/// scan feed cannot speak about (tor, i2p, IPv6 only, never scanned).
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    FromRepr,
)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
#[repr(u8)]
pub enum TriState {
    No = 0,
    Yes = 1,
    #[default]
    NotApplicable = 2,
}

impl From<bool> for TriState {
    fn from(value: bool) -> Self {
        if value {
            TriState::Yes
        } else {
            TriState::No
        }
    }
}

/// Snapshot of a monitored node as exchanged between server and probers.
///
/// Probers receive a partially filled node from the job endpoint, fill in
/// what they observed and send the whole thing back inside a [`ProbeReport`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(default)]
pub struct Node {
    pub id: i64,
    pub hostname: String,
    pub ip: String,
    pub port: u16,
    pub protocol: String,
    pub is_tor: bool,
    pub is_i2p: bool,
    pub is_available: bool,
    pub nettype: String,
    pub height: u64,
    pub adjusted_time: u64,
    pub database_size: u64,
    pub difficulty: u64,
    pub version: String,
    pub uptime: f64,
    pub estimate_fee: u64,
    pub asn: u32,
    pub asn_name: String,
    pub country_code: String,
    pub country_name: String,
    pub city: String,
    pub latitude: f64,
    pub longitude: f64,
    pub date_entered: i64,
    pub last_checked: i64,

    /// Rolling window of the last five outcomes, oldest first.
    /// Kept loosely typed on the wire; the server validates it.
    #[cfg_attr(feature = "openapi", schema(value_type = Vec<u8>))]
    pub last_check_status: serde_json::Value,
    pub cors_capable: bool,
    pub ipv6_only: bool,
    pub ip_addresses: String,
    pub is_archived: bool,
    pub is_spy_node: TriState,
    pub mrl_ban_list_enabled: TriState,
    pub dns_ban_list_enabled: TriState,
}

impl Node {
    pub fn rpc_url(&self) -> String {
        format!("{}://{}:{}/json_rpc", self.protocol, self.hostname, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ProbeReport {
    /// Seconds the probe took.
    pub took_time: f64,
    #[serde(default)]
    pub message: String,
    #[serde(alias = "node_info")]
    pub node: Node,
}

/// Transports a prober is willing to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobCapabilities {
    pub accept_tor: bool,
    pub accept_i2p: bool,
    pub accept_ipv6: bool,
}

impl JobCapabilities {
    pub fn as_query(&self) -> [(&'static str, u8); 3] {
        [
            ("accept_tor", self.accept_tor as u8),
            ("accept_i2p", self.accept_i2p as u8),
            ("accept_ipv6", self.accept_ipv6 as u8),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Ok,
    Error,
}

/// Envelope wrapping every API response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ApiResponse<T> {
    pub status: ResponseStatus,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        ApiResponse {
            status: ResponseStatus::Ok,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ApiResponse {
            status: ResponseStatus::Error,
            message: message.into(),
            data: None,
        }
    }
}
