// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use crate::db::models::NetFeeDto;
use crate::db::DbPool;

/// How many available nodes of a nettype report a given fee.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub(crate) struct FeeVote {
    pub(crate) nettype: String,
    pub(crate) estimate_fee: i64,
    pub(crate) node_count: i64,
}

pub(crate) async fn get_fee_votes(pool: &DbPool) -> anyhow::Result<Vec<FeeVote>> {
    crate::db::query_as::<FeeVote>(
        r#"SELECT
            nettype,
            estimate_fee,
            COUNT(id) AS node_count
        FROM nodes
        WHERE is_available = 1
        AND is_archived = 0
        AND estimate_fee > 0
        AND nettype != ''
        GROUP BY nettype, estimate_fee"#,
    )
    .fetch_all(pool)
    .await
    .map_err(From::from)
}

pub(crate) async fn upsert_net_fee(pool: &DbPool, fee: &NetFeeDto) -> anyhow::Result<()> {
    crate::db::query(
        r#"INSERT INTO fees (nettype, estimate_fee, node_count)
            VALUES (?, ?, ?)
            ON CONFLICT(nettype) DO UPDATE SET
                estimate_fee = excluded.estimate_fee,
                node_count = excluded.node_count"#,
    )
    .bind(&fee.nettype)
    .bind(fee.estimate_fee)
    .bind(fee.node_count)
    .execute(pool)
    .await
    .map(drop)
    .map_err(From::from)
}

pub(crate) async fn get_net_fees(pool: &DbPool) -> anyhow::Result<Vec<NetFeeDto>> {
    crate::db::query_as::<NetFeeDto>(
        "SELECT nettype, estimate_fee, node_count FROM fees ORDER BY nettype",
    )
    .fetch_all(pool)
    .await
    .map_err(From::from)
}
