// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use crate::db::models::{ProbeLogDto, ProbeLogRecord};
use crate::db::DbPool;
use crate::http::models::ProbeLogFilters;
use sqlx::{QueryBuilder, Sqlite};

pub(crate) async fn insert_probe_log(pool: &DbPool, record: &ProbeLogRecord) -> anyhow::Result<()> {
    crate::db::query(
        r#"INSERT INTO probe_logs
            (node_id, prober_id, is_available, height, adjusted_time, database_size,
             difficulty, estimate_fee, date_checked, failed_reason, fetch_runtime)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(record.node_id)
    .bind(record.prober_id)
    .bind(record.is_available)
    .bind(record.height)
    .bind(record.adjusted_time)
    .bind(record.database_size)
    .bind(record.difficulty)
    .bind(record.estimate_fee)
    .bind(record.date_checked)
    .bind(&record.failed_reason)
    .bind(record.fetch_runtime)
    .execute(pool)
    .await
    .map(drop)
    .map_err(From::from)
}

/// Number of probes and successful probes of a node since `since`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct AvailabilityStats {
    pub(crate) total: i64,
    pub(crate) online: i64,
}

pub(crate) async fn availability_since(
    pool: &DbPool,
    node_id: i64,
    since: i64,
) -> anyhow::Result<AvailabilityStats> {
    let (total, online) = crate::db::query_as::<(i64, i64)>(
        r#"SELECT
            COUNT(id),
            COALESCE(SUM(is_available), 0)
        FROM probe_logs
        WHERE node_id = ? AND date_checked > ?"#,
    )
    .bind(node_id)
    .bind(since)
    .fetch_one(pool)
    .await?;

    Ok(AvailabilityStats { total, online })
}

pub(crate) async fn delete_probe_logs_before(pool: &DbPool, cutoff: i64) -> anyhow::Result<u64> {
    let res = crate::db::query("DELETE FROM probe_logs WHERE date_checked < ?")
        .bind(cutoff)
        .execute(pool)
        .await?;

    Ok(res.rows_affected())
}

fn push_log_filters(builder: &mut QueryBuilder<'_, Sqlite>, filters: &ProbeLogFilters) {
    builder.push(" WHERE 1 = 1");
    if let Some(node_id) = filters.node_id {
        builder.push(" AND node_id = ").push_bind(node_id);
    }
    if let Some(available) = filters.availability() {
        builder.push(" AND is_available = ").push_bind(available);
    }
    if let Some(reason) = filters.failed_reason.as_deref().filter(|r| !r.is_empty()) {
        builder
            .push(" AND failed_reason LIKE ")
            .push_bind(format!("%{reason}%"));
    }
}

pub(crate) async fn list_probe_logs(
    pool: &DbPool,
    filters: &ProbeLogFilters,
    limit: i64,
    offset: i64,
) -> anyhow::Result<(Vec<ProbeLogDto>, i64)> {
    let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(id) FROM probe_logs");
    push_log_filters(&mut count, filters);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let mut select = QueryBuilder::<Sqlite>::new(
        r#"SELECT
            id,
            node_id,
            prober_id,
            is_available,
            height,
            adjusted_time,
            database_size,
            difficulty,
            estimate_fee,
            date_checked,
            failed_reason,
            fetch_runtime
        FROM probe_logs"#,
    );
    push_log_filters(&mut select, filters);
    select
        .push(" ORDER BY date_checked DESC, id DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);
    let logs = select.build_query_as::<ProbeLogDto>().fetch_all(pool).await?;

    Ok((logs, total))
}
