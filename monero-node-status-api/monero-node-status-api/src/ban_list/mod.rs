// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use crate::db::{queries, DbPool};

pub(crate) mod feeds;
pub(crate) mod matcher;
pub(crate) mod spy_scan;

pub(crate) use matcher::BanList;

pub(crate) async fn load_ban_list(pool: &DbPool) -> anyhow::Result<BanList> {
    let entries = queries::ban_list::get_ban_list(pool).await?;
    Ok(BanList::from_entries(entries))
}

/// Downloads the flat ban list and replaces the stored copy.
pub(crate) async fn refresh_ban_list(
    pool: &DbPool,
    client: &reqwest::Client,
    url: &str,
) -> anyhow::Result<usize> {
    let entries = feeds::fetch_ban_list(client, url).await?;
    let stored = queries::ban_list::replace_ban_list(pool, &entries).await?;
    let usable = BanList::from_entries(&entries).len();
    tracing::info!("Stored {stored} ban list entries ({usable} usable prefixes)");

    Ok(stored)
}

/// Downloads the node scan feed and upserts it.
pub(crate) async fn refresh_rucknium_scan(
    pool: &DbPool,
    client: &reqwest::Client,
    url: Option<&str>,
) -> anyhow::Result<usize> {
    let Some(url) = url else {
        anyhow::bail!("No node scan feed URL configured");
    };

    let records = feeds::fetch_rucknium_scan(client, url).await?;
    queries::rucknium::upsert_scan_records(pool, &records).await
}
