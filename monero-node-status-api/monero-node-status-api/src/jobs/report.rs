// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use crate::db::models::{NodeProbeUpdate, ProbeLogRecord, ProberDto};
use crate::db::{queries, DbPool};
use crate::geodata::GeoLookup;
use crate::jobs::status_window::{CheckStatus, StatusWindow};
use crate::utils::unix_timestamp_now;
use monero_node_status_client::models::{Node, ProbeReport};
use std::net::IpAddr;
use time::Duration;

const UPTIME_WINDOW: Duration = Duration::days(30);

/// A node is archived once it has been down for every one of more than
/// this many probes inside the uptime window.
pub(crate) const RETIREMENT_MIN_SAMPLES: i64 = 300;

#[derive(Debug, thiserror::Error)]
pub(crate) enum ProcessJobError {
    #[error("Invalid node")]
    MissingNodeId,
    #[error("Failed to store probe log: {0:#}")]
    LogInsert(anyhow::Error),
    #[error("Failed to update prober submit time: {0:#}")]
    ProberHeartbeat(anyhow::Error),
}

/// Failures that leave the report accepted.
#[derive(Debug, thiserror::Error)]
pub(crate) enum NonFatalError {
    #[error("uptime calculation failed: {0:#}")]
    Uptime(anyhow::Error),
    #[error("geo lookup for {ip} failed: {error:#}")]
    GeoLookup { ip: String, error: anyhow::Error },
    #[error("failed to persist node state: {0:#}")]
    Persist(anyhow::Error),
    #[error("failed to archive node: {0:#}")]
    Retirement(anyhow::Error),
}

#[derive(Debug)]
pub(crate) struct ReportOutcome {
    pub(crate) uptime: Option<f64>,
    pub(crate) window: StatusWindow,
    pub(crate) retired: bool,
    pub(crate) non_fatal: Vec<NonFatalError>,
}

/// Percentage rounded up to two decimals, `None` without samples.
pub(crate) fn uptime_percentage(online: i64, total: i64) -> Option<f64> {
    if total <= 0 {
        return None;
    }
    let ratio = online as f64 / total as f64;
    Some((ratio * 100.0 * 100.0).ceil() / 100.0)
}

fn unsigned_to_db(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn probe_log(report: &ProbeReport, prober_id: i64, now: i64) -> ProbeLogRecord {
    let node = &report.node;
    ProbeLogRecord {
        node_id: node.id,
        prober_id,
        is_available: node.is_available,
        height: unsigned_to_db(node.height),
        adjusted_time: unsigned_to_db(node.adjusted_time),
        database_size: unsigned_to_db(node.database_size),
        difficulty: unsigned_to_db(node.difficulty),
        estimate_fee: unsigned_to_db(node.estimate_fee),
        date_checked: now,
        failed_reason: report.message.clone(),
        fetch_runtime: report.took_time,
    }
}

fn node_update(
    node: &Node,
    uptime: Option<f64>,
    window: StatusWindow,
    now: i64,
) -> NodeProbeUpdate {
    NodeProbeUpdate {
        id: node.id,
        nettype: node.nettype.clone(),
        height: unsigned_to_db(node.height),
        adjusted_time: unsigned_to_db(node.adjusted_time),
        database_size: unsigned_to_db(node.database_size),
        difficulty: unsigned_to_db(node.difficulty),
        version: node.version.clone(),
        uptime,
        estimate_fee: unsigned_to_db(node.estimate_fee),
        ip_addr: node.ip.clone(),
        ip_addresses: node.ip_addresses.clone(),
        ipv6_only: node.ipv6_only,
        cors_capable: node.cors_capable,
        last_checked: now,
        last_check_status: window.to_string(),
    }
}

async fn refresh_geo(
    pool: &DbPool,
    geo: &dyn GeoLookup,
    node: &Node,
) -> Result<(), NonFatalError> {
    let geo_error = |error: anyhow::Error| NonFatalError::GeoLookup {
        ip: node.ip.clone(),
        error,
    };

    let ip: IpAddr = node
        .ip
        .parse()
        .map_err(|err| geo_error(anyhow::anyhow!("invalid address: {err}")))?;
    let data = geo.lookup(ip).map_err(geo_error)?;
    queries::nodes::update_node_geo(pool, node.id, &data)
        .await
        .map_err(NonFatalError::Persist)
}

/// Applies one probe report.
///
/// Only the probe log and the prober heartbeat are mandatory, everything in
/// between is recorded in [`ReportOutcome::non_fatal`] and logged.
pub(crate) async fn process_job(
    pool: &DbPool,
    geo: Option<&dyn GeoLookup>,
    report: ProbeReport,
    prober: &ProberDto,
) -> Result<ReportOutcome, ProcessJobError> {
    let node = &report.node;
    if node.id == 0 {
        return Err(ProcessJobError::MissingNodeId);
    }

    let now = unix_timestamp_now();
    queries::probe_logs::insert_probe_log(pool, &probe_log(&report, prober.id, now))
        .await
        .map_err(ProcessJobError::LogInsert)?;

    let mut non_fatal = Vec::new();

    let since = now - UPTIME_WINDOW.whole_seconds();
    let stats = queries::probe_logs::availability_since(pool, node.id, since).await;
    let (uptime, samples) = match stats {
        Ok(stats) => (uptime_percentage(stats.online, stats.total), stats.total),
        Err(err) => {
            non_fatal.push(NonFatalError::Uptime(err));
            (None, 0)
        }
    };

    let window = StatusWindow::from_value_or_reset(&node.last_check_status)
        .advance(CheckStatus::from(node.is_available));

    if let Some(geo) = geo.filter(|_| !node.ip.is_empty()) {
        if let Err(err) = refresh_geo(pool, geo, node).await {
            non_fatal.push(err);
        }
    }

    let update = node_update(node, uptime, window, now);
    let persisted = if node.is_available {
        queries::nodes::update_available_node(pool, &update).await
    } else {
        queries::nodes::update_unavailable_node(pool, &update).await
    };
    if let Err(err) = persisted {
        non_fatal.push(NonFatalError::Persist(err));
    }

    let mut retired = false;
    if uptime.unwrap_or_default() <= 0.0 && samples > RETIREMENT_MIN_SAMPLES {
        match queries::nodes::set_archived(pool, node.id, true).await {
            Ok(_) => {
                tracing::info!(
                    "Archived node {} ({}) after {samples} failed probes",
                    node.id,
                    node.hostname
                );
                retired = true;
            }
            Err(err) => non_fatal.push(NonFatalError::Retirement(err)),
        }
    }

    queries::probers::touch_last_submit(pool, prober.id, now)
        .await
        .map_err(ProcessJobError::ProberHeartbeat)?;

    for err in &non_fatal {
        tracing::warn!("Report for node {}: {err}", node.id);
    }

    Ok(ReportOutcome {
        uptime,
        window,
        retired,
        non_fatal,
    })
}
