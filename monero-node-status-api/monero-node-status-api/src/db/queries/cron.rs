// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use crate::db::models::{CronState, CronTask, CronTaskDto};
use crate::db::DbPool;

const CRON_COLUMNS: &str = r#"
    id,
    slug,
    title,
    description,
    run_every,
    last_run,
    next_run,
    run_time,
    cron_state,
    is_enabled"#;

/// Enabled tasks whose `next_run` has passed, in the order they fell due.
pub(crate) async fn get_due_tasks(pool: &DbPool, now: i64) -> anyhow::Result<Vec<CronTask>> {
    let sql = format!(
        r#"SELECT {CRON_COLUMNS}
            FROM cron_tasks
            WHERE is_enabled = 1 AND next_run <= ?
            ORDER BY next_run, id"#
    );
    let rows = crate::db::query_as::<CronTaskDto>(&sql)
        .bind(now)
        .fetch_all(pool)
        .await?;
    Ok(valid_tasks(rows))
}

pub(crate) async fn get_all_tasks(pool: &DbPool) -> anyhow::Result<Vec<CronTask>> {
    let sql = format!("SELECT {CRON_COLUMNS} FROM cron_tasks ORDER BY id");
    let rows = crate::db::query_as::<CronTaskDto>(&sql)
        .fetch_all(pool)
        .await?;
    Ok(valid_tasks(rows))
}

// rows that cannot be read are left out so the rest keep running
fn valid_tasks(rows: Vec<CronTaskDto>) -> Vec<CronTask> {
    rows.into_iter()
        .filter_map(|row| {
            CronTask::try_from(row)
                .inspect_err(|err| tracing::warn!("Skipping cron task: {err}"))
                .ok()
        })
        .collect()
}

pub(crate) async fn mark_running(pool: &DbPool, task_id: i64, now: i64) -> anyhow::Result<()> {
    crate::db::query("UPDATE cron_tasks SET cron_state = ?, last_run = ? WHERE id = ?")
        .bind(CronState::Running as i64)
        .bind(now)
        .bind(task_id)
        .execute(pool)
        .await
        .map(drop)
        .map_err(From::from)
}

pub(crate) async fn mark_idle(
    pool: &DbPool,
    task_id: i64,
    next_run: i64,
    run_time: f64,
) -> anyhow::Result<()> {
    crate::db::query(
        r#"UPDATE cron_tasks
            SET
                cron_state = ?,
                next_run = ?,
                run_time = ?
            WHERE id = ?"#,
    )
    .bind(CronState::Idle as i64)
    .bind(next_run)
    .bind(run_time)
    .bind(task_id)
    .execute(pool)
    .await
    .map(drop)
    .map_err(From::from)
}
