// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use crate::db::models::RuckniumScanRecord;
use anyhow::{bail, Context};
use reqwest::StatusCode;
use serde::{Deserialize, Deserializer};

pub(crate) const DEFAULT_BAN_LIST_URL: &str =
    "https://raw.githubusercontent.com/Boog900/monero-ban-list/main/ban_list.txt";

/// Downloads the flat ban list, one entry per non-blank line.
pub(crate) async fn fetch_ban_list(
    client: &reqwest::Client,
    url: &str,
) -> anyhow::Result<Vec<String>> {
    let res = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to download ban list from {url}"))?;
    if res.status() != StatusCode::OK {
        bail!("Ban list request returned status code {}", res.status());
    }

    let body = res.text().await?;
    Ok(parse_ban_list_body(&body))
}

fn parse_ban_list_body(body: &str) -> Vec<String> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Flags arrive as `0`/`1` or as booleans depending on the feed version.
fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(value) => value,
        Flag::Int(value) => value == 1,
    })
}

#[derive(Debug, Deserialize)]
struct RuckniumNodeData {
    date: String,
    connected_node_ip: String,
    #[serde(deserialize_with = "flag")]
    is_spy_node: bool,
    #[serde(deserialize_with = "flag")]
    mrl_ban_list_enabled: bool,
    #[serde(deserialize_with = "flag")]
    dns_ban_list_enabled: bool,
}

impl From<RuckniumNodeData> for RuckniumScanRecord {
    fn from(value: RuckniumNodeData) -> Self {
        RuckniumScanRecord {
            scan_date: value.date,
            connected_node_ip: value.connected_node_ip,
            is_spy_node: value.is_spy_node,
            mrl_ban_list_enabled: value.mrl_ban_list_enabled,
            dns_ban_list_enabled: value.dns_ban_list_enabled,
        }
    }
}

pub(crate) async fn fetch_rucknium_scan(
    client: &reqwest::Client,
    url: &str,
) -> anyhow::Result<Vec<RuckniumScanRecord>> {
    let res = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to download node scan data from {url}"))?;
    if res.status() != StatusCode::OK {
        bail!("Node scan request returned status code {}", res.status());
    }

    let body = res.bytes().await?;
    parse_rucknium_body(&body)
}

fn parse_rucknium_body(body: &[u8]) -> anyhow::Result<Vec<RuckniumScanRecord>> {
    let rows: Vec<RuckniumNodeData> =
        serde_json::from_slice(body).context("Malformed node scan data")?;

    Ok(rows.into_iter().map(From::from).collect())
}
