// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use crate::db::models::RuckniumScanRecord;
use crate::db::queries;
use crate::db::DbPool;
use monero_node_status_client::models::TriState;
use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr};

/// IPv4 sets built from a single scan date.
#[derive(Debug, Default)]
pub(crate) struct ScanIndex {
    spy: HashSet<Ipv4Addr>,
    mrl_ban_list: HashSet<Ipv4Addr>,
    dns_ban_list: HashSet<Ipv4Addr>,
}

impl ScanIndex {
    pub(crate) fn from_records(records: &[RuckniumScanRecord]) -> Self {
        let mut index = ScanIndex::default();
        for record in records {
            let Ok(ip) = record.connected_node_ip.trim().parse::<Ipv4Addr>() else {
                continue;
            };
            if record.is_spy_node {
                index.spy.insert(ip);
            }
            if record.mrl_ban_list_enabled {
                index.mrl_ban_list.insert(ip);
            }
            if record.dns_ban_list_enabled {
                index.dns_ban_list.insert(ip);
            }
        }
        index
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct NodeClassification {
    pub(crate) is_spy_node: TriState,
    pub(crate) mrl_ban_list_enabled: TriState,
    pub(crate) dns_ban_list_enabled: TriState,
}

impl NodeClassification {
    pub(crate) fn not_applicable() -> Self {
        NodeClassification {
            is_spy_node: TriState::NotApplicable,
            mrl_ban_list_enabled: TriState::NotApplicable,
            dns_ban_list_enabled: TriState::NotApplicable,
        }
    }
}

/// One spy address marks the whole node as a spy, while a ban list only
/// counts as enabled when every IPv4 address of the node has it.
pub(crate) fn classify(index: &ScanIndex, ip_addresses: &str) -> NodeClassification {
    let ips: Vec<Ipv4Addr> = ip_addresses
        .split(',')
        .filter_map(|ip| ip.trim().parse::<IpAddr>().ok())
        .filter_map(|ip| match ip {
            IpAddr::V4(ip) => Some(ip),
            IpAddr::V6(_) => None,
        })
        .collect();

    if ips.is_empty() {
        return NodeClassification::not_applicable();
    }

    NodeClassification {
        is_spy_node: ips.iter().any(|ip| index.spy.contains(ip)).into(),
        mrl_ban_list_enabled: ips.iter().all(|ip| index.mrl_ban_list.contains(ip)).into(),
        dns_ban_list_enabled: ips.iter().all(|ip| index.dns_ban_list.contains(ip)).into(),
    }
}

/// Re-classifies every scannable node against the latest scan.
/// Returns the number of nodes updated, nodes that fail to update are logged and skipped.
pub(crate) async fn rescan_nodes(pool: &DbPool) -> anyhow::Result<usize> {
    let records = queries::rucknium::latest_scan_records(pool).await?;
    if records.is_empty() {
        tracing::info!("No node scan data stored yet, skipping ban list check");
        return Ok(0);
    }

    let index = ScanIndex::from_records(&records);
    let mut updated = 0;
    for (node_id, ip_addresses) in queries::nodes::scannable_nodes(pool).await? {
        let classification = classify(&index, &ip_addresses);
        match queries::nodes::update_ban_classification(pool, node_id, classification).await {
            Ok(_) => updated += 1,
            Err(err) => tracing::warn!("Could not classify node {node_id}: {err:#}"),
        }
    }

    Ok(updated)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::queries::nodes::{get_node, insert_node, tests::clearnet, tests::onion};
    use crate::db::test_pool;

    fn record(ip: &str, spy: bool, mrl: bool, dns: bool) -> RuckniumScanRecord {
        RuckniumScanRecord {
            scan_date: "2025-01-02".to_string(),
            connected_node_ip: ip.to_string(),
            is_spy_node: spy,
            mrl_ban_list_enabled: mrl,
            dns_ban_list_enabled: dns,
        }
    }

    fn index() -> ScanIndex {
        ScanIndex::from_records(&[
            record("192.0.2.1", true, true, true),
            record("192.0.2.2", false, true, false),
            record("192.0.2.3", false, false, false),
        ])
    }

    #[test]
    fn spy_is_any_ban_lists_are_all() {
        let c = classify(&index(), "192.0.2.1,192.0.2.2");
        assert_eq!(c.is_spy_node, TriState::Yes);
        assert_eq!(c.mrl_ban_list_enabled, TriState::Yes);
        assert_eq!(c.dns_ban_list_enabled, TriState::No);

        let c = classify(&index(), "192.0.2.2,192.0.2.3");
        assert_eq!(c.is_spy_node, TriState::No);
        assert_eq!(c.mrl_ban_list_enabled, TriState::No);
        assert_eq!(c.dns_ban_list_enabled, TriState::No);
    }

    #[test]
    fn ipv6_addresses_are_ignored() {
        let c = classify(&index(), "2001:db8::1, 192.0.2.1");
        assert_eq!(c.is_spy_node, TriState::Yes);
        assert_eq!(c.mrl_ban_list_enabled, TriState::Yes);
        assert_eq!(c.dns_ban_list_enabled, TriState::Yes);

        assert_eq!(
            classify(&index(), "2001:db8::1"),
            NodeClassification::not_applicable()
        );
        assert_eq!(classify(&index(), ""), NodeClassification::not_applicable());
    }

    #[tokio::test]
    async fn rescan_updates_clearnet_nodes_only() {
        let pool = test_pool().await;
        let spy = clearnet("spy.example.com", &["192.0.2.1"]);
        let spy = insert_node(&pool, &spy).await.unwrap();
        let clean = clearnet("clean.example.com", &["198.51.100.1"]);
        let clean = insert_node(&pool, &clean).await.unwrap();
        let tor = insert_node(
            &pool,
            &onion("cakexmrl7bonq7ovjka5kuwuyd3f7qnkz6z6s6dmsy3uckwra7bvggyd.onion"),
        )
        .await
        .unwrap();

        assert_eq!(rescan_nodes(&pool).await.unwrap(), 0);

        let records = [record("192.0.2.1", true, false, true)];
        queries::rucknium::upsert_scan_records(&pool, &records)
            .await
            .unwrap();
        assert_eq!(rescan_nodes(&pool).await.unwrap(), 2);

        let spy = get_node(&pool, spy).await.unwrap().unwrap();
        assert_eq!(spy.is_spy_node, TriState::Yes as i64);
        assert_eq!(spy.mrl_ban_list_enabled, TriState::No as i64);
        assert_eq!(spy.dns_ban_list_enabled, TriState::Yes as i64);

        let clean = get_node(&pool, clean).await.unwrap().unwrap();
        assert_eq!(clean.is_spy_node, TriState::No as i64);

        let tor = get_node(&pool, tor).await.unwrap().unwrap();
        assert_eq!(tor.is_spy_node, TriState::NotApplicable as i64);
    }

    #[tokio::test]
    async fn rescan_continues_past_a_failed_update() {
        let pool = test_pool().await;
        let first = clearnet("first.example.com", &["192.0.2.1"]);
        let first = insert_node(&pool, &first).await.unwrap();
        let second = clearnet("second.example.com", &["192.0.2.2"]);
        let second = insert_node(&pool, &second).await.unwrap();
        crate::db::query(
            r#"CREATE TRIGGER reject_first_node BEFORE UPDATE ON nodes
                WHEN OLD.hostname = 'first.example.com'
                BEGIN SELECT RAISE(ABORT, 'read only'); END"#,
        )
        .execute(&pool)
        .await
        .unwrap();

        let records = [
            record("192.0.2.1", true, true, true),
            record("192.0.2.2", true, false, false),
        ];
        queries::rucknium::upsert_scan_records(&pool, &records)
            .await
            .unwrap();
        assert_eq!(rescan_nodes(&pool).await.unwrap(), 1);

        let first = get_node(&pool, first).await.unwrap().unwrap();
        assert_eq!(first.is_spy_node, TriState::NotApplicable as i64);
        let second = get_node(&pool, second).await.unwrap().unwrap();
        assert_eq!(second.is_spy_node, TriState::Yes as i64);
    }
}
