// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use crate::ban_list::{self, spy_scan};
use crate::db::models::NetFeeDto;
use crate::db::queries::{self, fees::FeeVote};
use crate::db::DbPool;
use crate::utils::unix_timestamp_now;
use async_trait::async_trait;
use std::collections::BTreeMap;
use strum_macros::{Display, EnumString};
use time::Duration;

/// Probe logs older than this are pruned.
const PROBE_LOG_RETENTION: Duration = Duration::days(32);

/// Maintenance jobs known to the scheduler, keyed by their `cron_tasks.slug`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub(crate) enum MaintenanceTask {
    DeleteOldProbeLogs,
    CalculateMajorityFee,
    FetchRuckniumNodeData,
    CheckMrlBanList,
    FetchStaticMrlBanList,
}

#[async_trait]
pub(crate) trait TaskRunner: Send + Sync {
    async fn run(&self, task: MaintenanceTask) -> anyhow::Result<()>;
}

pub(crate) struct MaintenanceTasks {
    pool: DbPool,
    http_client: reqwest::Client,
    ban_list_url: String,
    rucknium_feed_url: Option<String>,
}

impl MaintenanceTasks {
    pub(crate) fn new(
        pool: DbPool,
        http_client: reqwest::Client,
        ban_list_url: String,
        rucknium_feed_url: Option<String>,
    ) -> Self {
        MaintenanceTasks {
            pool,
            http_client,
            ban_list_url,
            rucknium_feed_url,
        }
    }

    async fn delete_old_probe_logs(&self) -> anyhow::Result<()> {
        let cutoff = unix_timestamp_now() - PROBE_LOG_RETENTION.whole_seconds();
        let deleted = queries::probe_logs::delete_probe_logs_before(&self.pool, cutoff).await?;
        tracing::info!("Deleted {deleted} probe logs older than {cutoff}");
        Ok(())
    }
}

#[async_trait]
impl TaskRunner for MaintenanceTasks {
    async fn run(&self, task: MaintenanceTask) -> anyhow::Result<()> {
        match task {
            MaintenanceTask::DeleteOldProbeLogs => self.delete_old_probe_logs().await,
            MaintenanceTask::CalculateMajorityFee => calculate_majority_fee(&self.pool).await,
            MaintenanceTask::FetchRuckniumNodeData => {
                let stored = ban_list::refresh_rucknium_scan(
                    &self.pool,
                    &self.http_client,
                    self.rucknium_feed_url.as_deref(),
                )
                .await?;
                tracing::info!("Stored {stored} node scan records");
                Ok(())
            }
            MaintenanceTask::CheckMrlBanList => {
                let updated = spy_scan::rescan_nodes(&self.pool).await?;
                tracing::info!("Updated ban list status of {updated} nodes");
                Ok(())
            }
            MaintenanceTask::FetchStaticMrlBanList => {
                ban_list::refresh_ban_list(&self.pool, &self.http_client, &self.ban_list_url)
                    .await
                    .map(drop)
            }
        }
    }
}

/// Most common fee per nettype. Ties go to the lower fee.
pub(crate) fn majority_fees(votes: &[FeeVote]) -> Vec<NetFeeDto> {
    let mut winners: BTreeMap<&str, &FeeVote> = BTreeMap::new();
    for vote in votes {
        winners
            .entry(vote.nettype.as_str())
            .and_modify(|best| {
                let more_votes = vote.node_count > best.node_count;
                let tie_but_cheaper =
                    vote.node_count == best.node_count && vote.estimate_fee < best.estimate_fee;
                if more_votes || tie_but_cheaper {
                    *best = vote;
                }
            })
            .or_insert(vote);
    }

    winners
        .into_values()
        .map(|vote| NetFeeDto {
            nettype: vote.nettype.clone(),
            estimate_fee: vote.estimate_fee,
            node_count: vote.node_count,
        })
        .collect()
}

pub(crate) async fn calculate_majority_fee(pool: &DbPool) -> anyhow::Result<()> {
    let votes = queries::fees::get_fee_votes(pool).await?;
    for fee in majority_fees(&votes) {
        queries::fees::upsert_net_fee(pool, &fee).await?;
        tracing::debug!(
            "Majority fee for {}: {} ({} nodes)",
            fee.nettype,
            fee.estimate_fee,
            fee.node_count
        );
    }
    Ok(())
}
