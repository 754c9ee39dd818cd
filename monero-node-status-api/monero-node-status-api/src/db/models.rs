// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use crate::http;
use crate::jobs::status_window::StatusWindow;
use monero_node_status_client::models::{Node, TriState};
use sqlx::FromRow;
use strum_macros::{Display, EnumString, FromRepr};

pub(crate) fn tri_state_from_db(value: i64) -> TriState {
    u8::try_from(value)
        .ok()
        .and_then(TriState::from_repr)
        .unwrap_or_default()
}

fn unsigned(value: i64) -> u64 {
    u64::try_from(value).unwrap_or_default()
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct NodeDto {
    pub(crate) id: i64,
    pub(crate) protocol: String,
    pub(crate) hostname: String,
    pub(crate) port: i64,
    pub(crate) is_tor: bool,
    pub(crate) is_i2p: bool,
    pub(crate) is_available: bool,
    pub(crate) nettype: String,
    pub(crate) height: i64,
    pub(crate) adjusted_time: i64,
    pub(crate) database_size: i64,
    pub(crate) difficulty: i64,
    pub(crate) version: String,
    pub(crate) uptime: f64,
    pub(crate) estimate_fee: i64,
    pub(crate) ip_addr: String,
    pub(crate) asn: i64,
    pub(crate) asn_name: String,
    pub(crate) country: String,
    pub(crate) country_name: String,
    pub(crate) city: String,
    pub(crate) lat: f64,
    pub(crate) lon: f64,
    pub(crate) date_entered: i64,
    pub(crate) last_checked: i64,
    pub(crate) last_check_status: String,
    pub(crate) cors_capable: bool,
    pub(crate) ipv6_only: bool,
    pub(crate) ip_addresses: String,
    pub(crate) is_archived: bool,
    pub(crate) is_spy_node: i64,
    pub(crate) mrl_ban_list_enabled: i64,
    pub(crate) dns_ban_list_enabled: i64,
}

impl From<NodeDto> for Node {
    fn from(value: NodeDto) -> Self {
        Node {
            id: value.id,
            hostname: value.hostname,
            ip: value.ip_addr,
            port: u16::try_from(value.port).unwrap_or_default(),
            protocol: value.protocol,
            is_tor: value.is_tor,
            is_i2p: value.is_i2p,
            is_available: value.is_available,
            nettype: value.nettype,
            height: unsigned(value.height),
            adjusted_time: unsigned(value.adjusted_time),
            database_size: unsigned(value.database_size),
            difficulty: unsigned(value.difficulty),
            version: value.version,
            uptime: value.uptime,
            estimate_fee: unsigned(value.estimate_fee),
            asn: u32::try_from(value.asn).unwrap_or_default(),
            asn_name: value.asn_name,
            country_code: value.country,
            country_name: value.country_name,
            city: value.city,
            latitude: value.lat,
            longitude: value.lon,
            date_entered: value.date_entered,
            last_checked: value.last_checked,
            last_check_status: StatusWindow::parse_or_reset(&value.last_check_status).to_json(),
            cors_capable: value.cors_capable,
            ipv6_only: value.ipv6_only,
            ip_addresses: value.ip_addresses,
            is_archived: value.is_archived,
            is_spy_node: tri_state_from_db(value.is_spy_node),
            mrl_ban_list_enabled: tri_state_from_db(value.mrl_ban_list_enabled),
            dns_ban_list_enabled: tri_state_from_db(value.dns_ban_list_enabled),
        }
    }
}

/// The fields a prober needs to run a job, as returned by the dispatch claim.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct JobDto {
    pub(crate) id: i64,
    pub(crate) hostname: String,
    pub(crate) port: i64,
    pub(crate) protocol: String,
    pub(crate) is_tor: bool,
    pub(crate) is_i2p: bool,
    pub(crate) ipv6_only: bool,
    pub(crate) last_check_status: String,
}

impl From<JobDto> for Node {
    fn from(value: JobDto) -> Self {
        Node {
            id: value.id,
            hostname: value.hostname,
            port: u16::try_from(value.port).unwrap_or_default(),
            protocol: value.protocol,
            is_tor: value.is_tor,
            is_i2p: value.is_i2p,
            ipv6_only: value.ipv6_only,
            last_check_status: StatusWindow::parse_or_reset(&value.last_check_status).to_json(),
            ..Default::default()
        }
    }
}

pub(crate) struct NewNodeRecord {
    pub(crate) protocol: String,
    pub(crate) hostname: String,
    pub(crate) port: u16,
    pub(crate) is_tor: bool,
    pub(crate) is_i2p: bool,
    pub(crate) ip_addr: String,
    pub(crate) ip_addresses: String,
    pub(crate) ipv6_only: bool,
    pub(crate) submitter_iphash: String,
    pub(crate) date_entered: i64,
}

/// State written back to a node after a probe report.
///
/// An empty `ip_addresses` means the prober did not resolve the node this
/// time, the stored addresses are kept.
#[derive(Debug, Clone)]
pub(crate) struct NodeProbeUpdate {
    pub(crate) id: i64,
    pub(crate) nettype: String,
    pub(crate) height: i64,
    pub(crate) adjusted_time: i64,
    pub(crate) database_size: i64,
    pub(crate) difficulty: i64,
    pub(crate) version: String,
    pub(crate) uptime: Option<f64>,
    pub(crate) estimate_fee: i64,
    pub(crate) ip_addr: String,
    pub(crate) ip_addresses: String,
    pub(crate) ipv6_only: bool,
    pub(crate) cors_capable: bool,
    pub(crate) last_checked: i64,
    pub(crate) last_check_status: String,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct ProberDto {
    pub(crate) id: i64,
    pub(crate) name: String,
    pub(crate) api_key: String,
    pub(crate) last_submit_ts: i64,
}

pub(crate) struct ProbeLogRecord {
    pub(crate) node_id: i64,
    pub(crate) prober_id: i64,
    pub(crate) is_available: bool,
    pub(crate) height: i64,
    pub(crate) adjusted_time: i64,
    pub(crate) database_size: i64,
    pub(crate) difficulty: i64,
    pub(crate) estimate_fee: i64,
    pub(crate) date_checked: i64,
    pub(crate) failed_reason: String,
    pub(crate) fetch_runtime: f64,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct ProbeLogDto {
    pub(crate) id: i64,
    pub(crate) node_id: i64,
    pub(crate) prober_id: i64,
    pub(crate) is_available: bool,
    pub(crate) height: i64,
    pub(crate) adjusted_time: i64,
    pub(crate) database_size: i64,
    pub(crate) difficulty: i64,
    pub(crate) estimate_fee: i64,
    pub(crate) date_checked: i64,
    pub(crate) failed_reason: String,
    pub(crate) fetch_runtime: f64,
}

impl From<ProbeLogDto> for http::models::ProbeLog {
    fn from(value: ProbeLogDto) -> Self {
        http::models::ProbeLog {
            id: value.id,
            node_id: value.node_id,
            prober_id: value.prober_id,
            is_available: value.is_available,
            height: unsigned(value.height),
            adjusted_time: unsigned(value.adjusted_time),
            database_size: unsigned(value.database_size),
            difficulty: unsigned(value.difficulty),
            estimate_fee: unsigned(value.estimate_fee),
            date_checked: value.date_checked,
            failed_reason: value.failed_reason,
            fetch_runtime: value.fetch_runtime,
        }
    }
}

/// Execution flag of a cron task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, FromRepr)]
#[strum(serialize_all = "snake_case")]
#[repr(u8)]
pub(crate) enum CronState {
    Idle = 0,
    Running = 1,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct CronTaskDto {
    pub(crate) id: i64,
    pub(crate) slug: String,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) run_every: i64,
    pub(crate) last_run: i64,
    pub(crate) next_run: i64,
    pub(crate) run_time: f64,
    pub(crate) cron_state: i64,
    pub(crate) is_enabled: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct CronTask {
    pub(crate) id: i64,
    pub(crate) slug: String,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) run_every: i64,
    pub(crate) last_run: i64,
    pub(crate) next_run: i64,
    pub(crate) run_time: f64,
    pub(crate) state: CronState,
    pub(crate) is_enabled: bool,
}

impl TryFrom<CronTaskDto> for CronTask {
    type Error = anyhow::Error;

    fn try_from(value: CronTaskDto) -> Result<Self, Self::Error> {
        let state = u8::try_from(value.cron_state)
            .ok()
            .and_then(CronState::from_repr)
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "cron task {} has invalid state {}",
                    value.slug,
                    value.cron_state
                )
            })?;

        Ok(CronTask {
            id: value.id,
            slug: value.slug,
            title: value.title,
            description: value.description,
            run_every: value.run_every,
            last_run: value.last_run,
            next_run: value.next_run,
            run_time: value.run_time,
            state,
            is_enabled: value.is_enabled,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct NetFeeDto {
    pub(crate) nettype: String,
    pub(crate) estimate_fee: i64,
    pub(crate) node_count: i64,
}

impl From<NetFeeDto> for http::models::NetFee {
    fn from(value: NetFeeDto) -> Self {
        http::models::NetFee {
            nettype: value.nettype,
            estimate_fee: unsigned(value.estimate_fee),
            node_count: unsigned(value.node_count),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct CountryCountDto {
    pub(crate) country: String,
    pub(crate) country_name: String,
    pub(crate) total_nodes: i64,
}

impl From<CountryCountDto> for http::models::CountryCount {
    fn from(value: CountryCountDto) -> Self {
        http::models::CountryCount {
            country_code: value.country,
            country_name: value.country_name,
            total_nodes: unsigned(value.total_nodes),
        }
    }
}

/// One row of the external node scan feed.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub(crate) struct RuckniumScanRecord {
    pub(crate) scan_date: String,
    pub(crate) connected_node_ip: String,
    pub(crate) is_spy_node: bool,
    pub(crate) mrl_ban_list_enabled: bool,
    pub(crate) dns_ban_list_enabled: bool,
}
