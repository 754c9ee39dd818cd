// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use crate::db::models::ProberDto;
use crate::db::DbPool;

pub(crate) async fn get_prober_by_api_key(
    pool: &DbPool,
    api_key: &str,
) -> anyhow::Result<Option<ProberDto>> {
    crate::db::query_as::<ProberDto>(
        r#"SELECT
            id,
            name,
            api_key,
            last_submit_ts
        FROM probers
        WHERE api_key = ?
        LIMIT 1"#,
    )
    .bind(api_key)
    .fetch_optional(pool)
    .await
    .map_err(From::from)
}

pub(crate) async fn insert_prober(pool: &DbPool, name: &str, api_key: &str) -> anyhow::Result<i64> {
    let id: i64 =
        sqlx::query_scalar("INSERT INTO probers (name, api_key) VALUES (?, ?) RETURNING id")
            .bind(name)
            .bind(api_key)
            .fetch_one(pool)
            .await?;

    Ok(id)
}

pub(crate) async fn rename_prober(
    pool: &DbPool,
    prober_id: i64,
    name: &str,
) -> anyhow::Result<bool> {
    let res = crate::db::query("UPDATE probers SET name = ? WHERE id = ?")
        .bind(name)
        .bind(prober_id)
        .execute(pool)
        .await?;

    Ok(res.rows_affected() > 0)
}

pub(crate) async fn delete_prober(pool: &DbPool, prober_id: i64) -> anyhow::Result<bool> {
    let res = crate::db::query("DELETE FROM probers WHERE id = ?")
        .bind(prober_id)
        .execute(pool)
        .await?;

    Ok(res.rows_affected() > 0)
}

pub(crate) async fn list_probers(pool: &DbPool) -> anyhow::Result<Vec<ProberDto>> {
    crate::db::query_as::<ProberDto>(
        r#"SELECT
            id,
            name,
            api_key,
            last_submit_ts
        FROM probers
        ORDER BY id"#,
    )
    .fetch_all(pool)
    .await
    .map_err(From::from)
}

pub(crate) async fn touch_last_submit(
    pool: &DbPool,
    prober_id: i64,
    timestamp: i64,
) -> anyhow::Result<()> {
    crate::db::query("UPDATE probers SET last_submit_ts = ? WHERE id = ?")
        .bind(timestamp)
        .bind(prober_id)
        .execute(pool)
        .await
        .map(drop)
        .map_err(From::from)
}
