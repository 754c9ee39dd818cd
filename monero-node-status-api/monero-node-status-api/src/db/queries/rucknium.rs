// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use crate::db::models::RuckniumScanRecord;
use crate::db::DbPool;

pub(crate) async fn upsert_scan_records(
    pool: &DbPool,
    records: &[RuckniumScanRecord],
) -> anyhow::Result<usize> {
    let mut tx = pool.begin().await?;

    for record in records {
        crate::db::query(
            r#"INSERT INTO rucknium_scans
                (
                    scan_date,
                    connected_node_ip,
                    is_spy_node,
                    mrl_ban_list_enabled,
                    dns_ban_list_enabled
                )
                VALUES (?, ?, ?, ?, ?)
                ON CONFLICT(scan_date, connected_node_ip) DO UPDATE SET
                    is_spy_node = excluded.is_spy_node,
                    mrl_ban_list_enabled = excluded.mrl_ban_list_enabled,
                    dns_ban_list_enabled = excluded.dns_ban_list_enabled"#,
        )
        .bind(&record.scan_date)
        .bind(&record.connected_node_ip)
        .bind(record.is_spy_node)
        .bind(record.mrl_ban_list_enabled)
        .bind(record.dns_ban_list_enabled)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(records.len())
}

/// Records of the most recent scan date only.
pub(crate) async fn latest_scan_records(pool: &DbPool) -> anyhow::Result<Vec<RuckniumScanRecord>> {
    crate::db::query_as::<RuckniumScanRecord>(
        r#"SELECT
            scan_date,
            connected_node_ip,
            is_spy_node,
            mrl_ban_list_enabled,
            dns_ban_list_enabled
        FROM rucknium_scans
        WHERE scan_date = (SELECT MAX(scan_date) FROM rucknium_scans)"#,
    )
    .fetch_all(pool)
    .await
    .map_err(From::from)
}
