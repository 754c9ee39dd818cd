// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use crate::db::DbPool;

/// Swaps the stored ban list for `entries` in one transaction.
///
/// Duplicate entries are stored once and the returned count excludes them.
pub(crate) async fn replace_ban_list(pool: &DbPool, entries: &[String]) -> anyhow::Result<usize> {
    let mut tx = pool.begin().await?;

    crate::db::query("DELETE FROM ban_list")
        .execute(&mut *tx)
        .await?;

    let mut inserted = 0;
    for entry in entries {
        let res = crate::db::query("INSERT OR IGNORE INTO ban_list (ip_addr) VALUES (?)")
            .bind(entry)
            .execute(&mut *tx)
            .await?;
        inserted += res.rows_affected() as usize;
    }

    tx.commit().await?;

    Ok(inserted)
}

pub(crate) async fn get_ban_list(pool: &DbPool) -> anyhow::Result<Vec<String>> {
    sqlx::query_scalar("SELECT ip_addr FROM ban_list")
        .fetch_all(pool)
        .await
        .map_err(From::from)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    #[tokio::test]
    async fn refresh_replaces_previous_entries() {
        let pool = test_pool().await;
        let first = vec!["10.0.0.0/8".to_string(), "192.0.2.1".to_string()];
        assert_eq!(replace_ban_list(&pool, &first).await.unwrap(), 2);

        let second = vec![
            "198.51.100.0/24".to_string(),
            "198.51.100.0/24".to_string(),
        ];
        assert_eq!(replace_ban_list(&pool, &second).await.unwrap(), 1);
        assert_eq!(
            get_ban_list(&pool).await.unwrap(),
            vec!["198.51.100.0/24".to_string()]
        );
    }
}
