// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use crate::ban_list::spy_scan::NodeClassification;
use crate::db::models::{CountryCountDto, JobDto, NewNodeRecord, NodeDto, NodeProbeUpdate};
use crate::db::DbPool;
use crate::geodata::GeoData;
use crate::http::models::NodeFilters;
use monero_node_status_client::models::JobCapabilities;
use sqlx::{QueryBuilder, Sqlite};

const NODE_COLUMNS: &str = r#"
    id,
    protocol,
    hostname,
    port,
    is_tor,
    is_i2p,
    is_available,
    nettype,
    height,
    adjusted_time,
    database_size,
    difficulty,
    version,
    uptime,
    estimate_fee,
    ip_addr,
    asn,
    asn_name,
    country,
    country_name,
    city,
    lat,
    lon,
    date_entered,
    last_checked,
    last_check_status,
    cors_capable,
    ipv6_only,
    ip_addresses,
    is_archived,
    is_spy_node,
    mrl_ban_list_enabled,
    dns_ban_list_enabled"#;

/// Picks the least recently checked node the prober can reach and stamps
/// `last_checked` in the same statement, so two concurrent pulls can't
/// receive the same node.
pub(crate) async fn claim_next_job(
    pool: &DbPool,
    capabilities: JobCapabilities,
    now: i64,
) -> anyhow::Result<Option<JobDto>> {
    crate::db::query_as::<JobDto>(
        r#"UPDATE nodes
            SET last_checked = ?
            WHERE id =
        (
            SELECT id
            FROM nodes
            WHERE is_archived = 0
            AND (? OR is_tor = 0)
            AND (? OR is_i2p = 0)
            AND (? OR ipv6_only = 0)
            ORDER BY last_checked ASC, id ASC
            LIMIT 1
        )
        RETURNING
            id,
            hostname,
            port,
            protocol,
            is_tor,
            is_i2p,
            ipv6_only,
            last_check_status
            "#,
    )
    .bind(now)
    .bind(capabilities.accept_tor)
    .bind(capabilities.accept_i2p)
    .bind(capabilities.accept_ipv6)
    .fetch_optional(pool)
    .await
    .map_err(From::from)
}

pub(crate) async fn get_node(pool: &DbPool, node_id: i64) -> anyhow::Result<Option<NodeDto>> {
    let sql = format!("SELECT {NODE_COLUMNS} FROM nodes WHERE id = ?");
    crate::db::query_as::<NodeDto>(&sql)
        .bind(node_id)
        .fetch_optional(pool)
        .await
        .map_err(From::from)
}

/// Returns `(id, is_archived)` of the node with the given identity.
pub(crate) async fn find_node_by_identity(
    pool: &DbPool,
    protocol: &str,
    hostname: &str,
    port: u16,
) -> anyhow::Result<Option<(i64, bool)>> {
    crate::db::query_as::<(i64, bool)>(
        r#"SELECT id, is_archived
            FROM nodes
            WHERE protocol = ? AND hostname = ? AND port = ?
            LIMIT 1"#,
    )
    .bind(protocol)
    .bind(hostname)
    .bind(i64::from(port))
    .fetch_optional(pool)
    .await
    .map_err(From::from)
}

pub(crate) async fn insert_node(pool: &DbPool, record: &NewNodeRecord) -> anyhow::Result<i64> {
    let is_anonymous = record.is_tor || record.is_i2p;
    let (ip_addr, ip_addresses) = if is_anonymous {
        ("", "")
    } else {
        (record.ip_addr.as_str(), record.ip_addresses.as_str())
    };

    let id: i64 = sqlx::query_scalar(
        r#"INSERT INTO nodes
            (protocol, hostname, port, is_tor, is_i2p, ip_addr, ip_addresses, ipv6_only,
             submitter_iphash, date_entered, last_checked, last_check_status)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, '[2,2,2,2,2]')
            RETURNING id"#,
    )
    .bind(&record.protocol)
    .bind(&record.hostname)
    .bind(i64::from(record.port))
    .bind(record.is_tor)
    .bind(record.is_i2p)
    .bind(ip_addr)
    .bind(ip_addresses)
    .bind(record.ipv6_only && !is_anonymous)
    .bind(&record.submitter_iphash)
    .bind(record.date_entered)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

pub(crate) async fn set_archived(
    pool: &DbPool,
    node_id: i64,
    archived: bool,
) -> anyhow::Result<bool> {
    let res = crate::db::query("UPDATE nodes SET is_archived = ? WHERE id = ?")
        .bind(archived)
        .bind(node_id)
        .execute(pool)
        .await?;

    Ok(res.rows_affected() > 0)
}

/// Removes the node for good, its probe logs go with it.
pub(crate) async fn delete_node(pool: &DbPool, node_id: i64) -> anyhow::Result<bool> {
    let res = crate::db::query("DELETE FROM nodes WHERE id = ?")
        .bind(node_id)
        .execute(pool)
        .await?;

    Ok(res.rows_affected() > 0)
}

pub(crate) async fn update_available_node(
    pool: &DbPool,
    update: &NodeProbeUpdate,
) -> anyhow::Result<()> {
    crate::db::query(
        r#"UPDATE nodes
            SET
                is_available = 1,
                nettype = ?,
                height = ?,
                adjusted_time = ?,
                database_size = ?,
                difficulty = ?,
                version = ?,
                uptime = COALESCE(?, uptime),
                estimate_fee = ?,
                ip_addr = CASE
                    WHEN is_tor = 1 OR is_i2p = 1 THEN ''
                    WHEN ? = '' THEN ip_addr
                    ELSE ? END,
                ip_addresses = CASE
                    WHEN is_tor = 1 OR is_i2p = 1 THEN ''
                    WHEN ? = '' THEN ip_addresses
                    ELSE ? END,
                ipv6_only = CASE
                    WHEN is_tor = 1 OR is_i2p = 1 THEN 0
                    WHEN ? = '' THEN ipv6_only
                    ELSE ? END,
                cors_capable = ?,
                last_checked = ?,
                last_check_status = ?
            WHERE id = ?"#,
    )
    .bind(&update.nettype)
    .bind(update.height)
    .bind(update.adjusted_time)
    .bind(update.database_size)
    .bind(update.difficulty)
    .bind(&update.version)
    .bind(update.uptime)
    .bind(update.estimate_fee)
    .bind(&update.ip_addresses)
    .bind(&update.ip_addr)
    .bind(&update.ip_addresses)
    .bind(&update.ip_addresses)
    .bind(&update.ip_addresses)
    .bind(update.ipv6_only)
    .bind(update.cors_capable)
    .bind(update.last_checked)
    .bind(&update.last_check_status)
    .bind(update.id)
    .execute(pool)
    .await
    .map(drop)
    .map_err(From::from)
}

/// Chain metrics are left as they were, a node that is down for a moment
/// keeps its last known state.
pub(crate) async fn update_unavailable_node(
    pool: &DbPool,
    update: &NodeProbeUpdate,
) -> anyhow::Result<()> {
    crate::db::query(
        r#"UPDATE nodes
            SET
                is_available = 0,
                uptime = COALESCE(?, uptime),
                ip_addr = CASE
                    WHEN is_tor = 1 OR is_i2p = 1 THEN ''
                    WHEN ? = '' THEN ip_addr
                    ELSE ? END,
                ip_addresses = CASE
                    WHEN is_tor = 1 OR is_i2p = 1 THEN ''
                    WHEN ? = '' THEN ip_addresses
                    ELSE ? END,
                ipv6_only = CASE
                    WHEN is_tor = 1 OR is_i2p = 1 THEN 0
                    WHEN ? = '' THEN ipv6_only
                    ELSE ? END,
                last_checked = ?,
                last_check_status = ?
            WHERE id = ?"#,
    )
    .bind(update.uptime)
    .bind(&update.ip_addresses)
    .bind(&update.ip_addr)
    .bind(&update.ip_addresses)
    .bind(&update.ip_addresses)
    .bind(&update.ip_addresses)
    .bind(update.ipv6_only)
    .bind(update.last_checked)
    .bind(&update.last_check_status)
    .bind(update.id)
    .execute(pool)
    .await
    .map(drop)
    .map_err(From::from)
}

pub(crate) async fn update_node_geo(
    pool: &DbPool,
    node_id: i64,
    geo: &GeoData,
) -> anyhow::Result<()> {
    crate::db::query(
        r#"UPDATE nodes
            SET
                asn = ?,
                asn_name = ?,
                country = ?,
                country_name = ?,
                city = ?,
                lat = ?,
                lon = ?
            WHERE id = ?"#,
    )
    .bind(i64::from(geo.asn))
    .bind(&geo.asn_name)
    .bind(&geo.country_code)
    .bind(&geo.country_name)
    .bind(&geo.city)
    .bind(geo.latitude)
    .bind(geo.longitude)
    .bind(node_id)
    .execute(pool)
    .await
    .map(drop)
    .map_err(From::from)
}

/// `(id, ip_addresses)` of every node the scan feed can say something about.
pub(crate) async fn scannable_nodes(pool: &DbPool) -> anyhow::Result<Vec<(i64, String)>> {
    crate::db::query_as::<(i64, String)>(
        r#"SELECT id, ip_addresses
            FROM nodes
            WHERE is_archived = 0
            AND is_tor = 0
            AND is_i2p = 0
            AND ipv6_only = 0"#,
    )
    .fetch_all(pool)
    .await
    .map_err(From::from)
}

pub(crate) async fn update_ban_classification(
    pool: &DbPool,
    node_id: i64,
    classification: NodeClassification,
) -> anyhow::Result<()> {
    crate::db::query(
        r#"UPDATE nodes
            SET
                is_spy_node = ?,
                mrl_ban_list_enabled = ?,
                dns_ban_list_enabled = ?
            WHERE id = ?"#,
    )
    .bind(classification.is_spy_node as i64)
    .bind(classification.mrl_ban_list_enabled as i64)
    .bind(classification.dns_ban_list_enabled as i64)
    .bind(node_id)
    .execute(pool)
    .await
    .map(drop)
    .map_err(From::from)
}

fn push_node_filters(builder: &mut QueryBuilder<'_, Sqlite>, filters: &NodeFilters) {
    builder
        .push(" WHERE is_archived = ")
        .push_bind(filters.archived.unwrap_or(false));

    match filters.protocol.as_deref() {
        Some("tor") => {
            builder.push(" AND is_tor = 1");
        }
        Some("i2p") => {
            builder.push(" AND is_i2p = 1");
        }
        Some(protocol @ ("http" | "https")) => {
            builder
                .push(" AND is_tor = 0 AND is_i2p = 0 AND protocol = ")
                .push_bind(protocol.to_string());
        }
        _ => {}
    }
    if let Some(nettype) = &filters.nettype {
        builder.push(" AND nettype = ").push_bind(nettype.clone());
    }
    match filters.status.as_deref() {
        Some("online") => {
            builder.push(" AND is_available = 1");
        }
        Some("offline") => {
            builder.push(" AND is_available = 0");
        }
        _ => {}
    }
    if let Some(cors) = filters.cors {
        builder.push(" AND cors_capable = ").push_bind(cors);
    }
    if let Some(host) = filters.host.as_deref().filter(|h| !h.is_empty()) {
        builder
            .push(" AND (hostname LIKE ")
            .push_bind(format!("%{host}%"))
            .push(" OR ip_addresses LIKE ")
            .push_bind(format!("%{host}%"))
            .push(")");
    }
    if let Some(asn) = filters.asn {
        builder.push(" AND asn = ").push_bind(i64::from(asn));
    }
    if let Some(country) = filters.country.as_deref().filter(|c| !c.is_empty()) {
        builder
            .push(" AND country = ")
            .push_bind(country.to_uppercase());
    }

    let classifications = [
        ("is_spy_node", filters.spynode),
        ("mrl_ban_list_enabled", filters.mrlban),
        ("dns_ban_list_enabled", filters.dnsban),
    ];
    for (column, value) in classifications {
        if let Some(value) = value.filter(|v| *v <= 2) {
            builder
                .push(format!(" AND {column} = "))
                .push_bind(i64::from(value));
        }
    }
}

/// Returns one page of monitored nodes plus the total matching `filters`.
pub(crate) async fn list_nodes(
    pool: &DbPool,
    filters: &NodeFilters,
    limit: i64,
    offset: i64,
) -> anyhow::Result<(Vec<NodeDto>, i64)> {
    let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(id) FROM nodes");
    push_node_filters(&mut count, filters);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let mut select = QueryBuilder::<Sqlite>::new(format!("SELECT {NODE_COLUMNS} FROM nodes"));
    push_node_filters(&mut select, filters);
    select
        .push(filters.order_by())
        .push(" LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);
    let nodes = select.build_query_as::<NodeDto>().fetch_all(pool).await?;

    Ok((nodes, total))
}

pub(crate) async fn count_by_country(pool: &DbPool) -> anyhow::Result<Vec<CountryCountDto>> {
    crate::db::query_as::<CountryCountDto>(
        r#"SELECT
            country,
            MAX(country_name) AS country_name,
            COUNT(id) AS total_nodes
        FROM nodes
        WHERE is_archived = 0
        GROUP BY country
        ORDER BY total_nodes DESC, country ASC"#,
    )
    .fetch_all(pool)
    .await
    .map_err(From::from)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;
    use crate::db::test_pool;

    pub(crate) fn clearnet(hostname: &str, ips: &[&str]) -> NewNodeRecord {
        NewNodeRecord {
            protocol: "https".to_string(),
            hostname: hostname.to_string(),
            port: 18081,
            is_tor: false,
            is_i2p: false,
            ip_addr: ips.first().copied().unwrap_or_default().to_string(),
            ip_addresses: ips.join(","),
            ipv6_only: !ips.is_empty() && ips.iter().all(|ip| ip.contains(':')),
            submitter_iphash: String::new(),
            date_entered: 1_700_000_000,
        }
    }

    pub(crate) fn onion(hostname: &str) -> NewNodeRecord {
        NewNodeRecord {
            protocol: "http".to_string(),
            is_tor: true,
            ..clearnet(hostname, &[])
        }
    }

    pub(crate) fn i2p(hostname: &str) -> NewNodeRecord {
        NewNodeRecord {
            protocol: "http".to_string(),
            is_i2p: true,
            ..clearnet(hostname, &[])
        }
    }

    async fn set_last_checked(pool: &DbPool, node_id: i64, last_checked: i64) {
        crate::db::query("UPDATE nodes SET last_checked = ? WHERE id = ?")
            .bind(last_checked)
            .bind(node_id)
            .execute(pool)
            .await
            .unwrap();
    }

    fn all_transports() -> JobCapabilities {
        JobCapabilities {
            accept_tor: true,
            accept_i2p: true,
            accept_ipv6: true,
        }
    }

    #[tokio::test]
    async fn claim_picks_the_oldest_checked_node_and_stamps_it() {
        let pool = test_pool().await;
        let a = insert_node(&pool, &clearnet("a.example.com", &["192.0.2.1"]))
            .await
            .unwrap();
        let b = insert_node(&pool, &clearnet("b.example.com", &["192.0.2.2"]))
            .await
            .unwrap();
        set_last_checked(&pool, a, 500).await;
        set_last_checked(&pool, b, 100).await;

        let job = claim_next_job(&pool, all_transports(), 1000)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(job.id, b);
        assert_eq!(job.last_check_status, "[2,2,2,2,2]");

        // b is now the most recently claimed one
        let next = claim_next_job(&pool, all_transports(), 1001)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(next.id, a);

        let stored = get_node(&pool, b).await.unwrap().unwrap();
        assert_eq!(stored.last_checked, 1000);
    }

    #[tokio::test]
    async fn claim_respects_capabilities() {
        let pool = test_pool().await;
        let tor = insert_node(
            &pool,
            &onion("cakexmrl7bonq7ovjka5kuwuyd3f7qnkz6z6s6dmsy3uckwra7bvggyd.onion"),
        )
        .await
        .unwrap();
        let i2p = insert_node(&pool, &i2p("node.i2p")).await.unwrap();
        let v6 = insert_node(&pool, &clearnet("v6.example.com", &["2001:db8::1"]))
            .await
            .unwrap();
        let v4 = insert_node(&pool, &clearnet("v4.example.com", &["192.0.2.1"]))
            .await
            .unwrap();
        set_last_checked(&pool, v4, 900).await;

        let clearnet_only = JobCapabilities::default();
        for now in 1000..1005 {
            let job = claim_next_job(&pool, clearnet_only, now)
                .await
                .unwrap()
                .unwrap();
            assert_eq!(job.id, v4);
            assert!(!job.is_tor && !job.is_i2p && !job.ipv6_only);
        }

        let tor_only = JobCapabilities {
            accept_tor: true,
            ..Default::default()
        };
        let job = claim_next_job(&pool, tor_only, 2000)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(job.id, tor);

        let mut seen = vec![];
        for now in 3000..3004 {
            seen.push(
                claim_next_job(&pool, all_transports(), now)
                    .await
                    .unwrap()
                    .unwrap()
                    .id,
            );
        }
        seen.sort();
        let mut expected = vec![tor, i2p, v6, v4];
        expected.sort();
        assert_eq!(seen, expected);
    }

    #[tokio::test]
    async fn claim_skips_archived_nodes_and_reports_empty_queue() {
        let pool = test_pool().await;
        assert!(claim_next_job(&pool, all_transports(), 1)
            .await
            .unwrap()
            .is_none());

        let id = insert_node(&pool, &clearnet("a.example.com", &["192.0.2.1"]))
            .await
            .unwrap();
        assert!(set_archived(&pool, id, true).await.unwrap());
        assert!(claim_next_job(&pool, all_transports(), 2)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn anonymous_nodes_never_store_ip_fields() {
        let pool = test_pool().await;
        let mut record = onion("cakexmrl7bonq7ovjka5kuwuyd3f7qnkz6z6s6dmsy3uckwra7bvggyd.onion");
        record.ip_addr = "192.0.2.1".to_string();
        record.ip_addresses = "192.0.2.1".to_string();
        let id = insert_node(&pool, &record).await.unwrap();

        let update = NodeProbeUpdate {
            id,
            nettype: "mainnet".to_string(),
            height: 10,
            adjusted_time: 10,
            database_size: 10,
            difficulty: 10,
            version: "0.18.3.4".to_string(),
            uptime: Some(100.0),
            estimate_fee: 20000,
            ip_addr: "192.0.2.1".to_string(),
            ip_addresses: "192.0.2.1".to_string(),
            ipv6_only: true,
            cors_capable: false,
            last_checked: 10,
            last_check_status: "[2,2,2,2,1]".to_string(),
        };
        update_available_node(&pool, &update).await.unwrap();

        let stored = get_node(&pool, id).await.unwrap().unwrap();
        assert!(stored.is_tor);
        assert_eq!(stored.ip_addr, "");
        assert_eq!(stored.ip_addresses, "");
        assert!(!stored.ipv6_only);
        assert_eq!(stored.height, 10);
    }

    #[tokio::test]
    async fn unavailable_update_keeps_chain_metrics_and_known_ips() {
        let pool = test_pool().await;
        let id = insert_node(&pool, &clearnet("a.example.com", &["192.0.2.1", "192.0.2.2"]))
            .await
            .unwrap();
        let mut update = NodeProbeUpdate {
            id,
            nettype: "mainnet".to_string(),
            height: 3_000_000,
            adjusted_time: 1,
            database_size: 2,
            difficulty: 3,
            version: "0.18.3.4".to_string(),
            uptime: Some(100.0),
            estimate_fee: 20000,
            ip_addr: String::new(),
            ip_addresses: String::new(),
            ipv6_only: false,
            cors_capable: true,
            last_checked: 5,
            last_check_status: "[2,2,2,2,1]".to_string(),
        };
        update_available_node(&pool, &update).await.unwrap();

        update.height = 0;
        update.uptime = None;
        update.last_check_status = "[2,2,2,1,0]".to_string();
        update_unavailable_node(&pool, &update).await.unwrap();

        let stored = get_node(&pool, id).await.unwrap().unwrap();
        assert!(!stored.is_available);
        assert_eq!(stored.height, 3_000_000);
        assert_eq!(stored.uptime, 100.0);
        assert_eq!(stored.ip_addresses, "192.0.2.1,192.0.2.2");
        assert_eq!(stored.last_check_status, "[2,2,2,1,0]");
    }

    #[tokio::test]
    async fn deleting_a_node_cascades_to_its_logs() {
        let pool = test_pool().await;
        let id = insert_node(&pool, &clearnet("a.example.com", &["192.0.2.1"]))
            .await
            .unwrap();
        crate::db::query(
            r#"INSERT INTO probe_logs (node_id, prober_id, is_available, date_checked)
                VALUES (?, 1, 1, 1)"#,
        )
        .bind(id)
        .execute(&pool)
        .await
        .unwrap();

        assert!(delete_node(&pool, id).await.unwrap());
        let logs: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM probe_logs")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(logs, 0);
        assert!(!delete_node(&pool, id).await.unwrap());
    }

    #[tokio::test]
    async fn list_nodes_filters_and_pages() {
        let pool = test_pool().await;
        for i in 0..5 {
            insert_node(
                &pool,
                &clearnet(&format!("n{i}.example.com"), &["192.0.2.1"]),
            )
            .await
            .unwrap();
        }
        insert_node(
            &pool,
            &onion("cakexmrl7bonq7ovjka5kuwuyd3f7qnkz6z6s6dmsy3uckwra7bvggyd.onion"),
        )
        .await
        .unwrap();

        let (page, total) = list_nodes(&pool, &NodeFilters::default(), 4, 0).await.unwrap();
        assert_eq!(total, 6);
        assert_eq!(page.len(), 4);

        let tor = NodeFilters {
            protocol: Some("tor".to_string()),
            ..Default::default()
        };
        let (page, total) = list_nodes(&pool, &tor, 10, 0).await.unwrap();
        assert_eq!(total, 1);
        assert!(page[0].is_tor);

        let host = NodeFilters {
            host: Some("n3.".to_string()),
            ..Default::default()
        };
        let (page, _) = list_nodes(&pool, &host, 10, 0).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].hostname, "n3.example.com");
    }
}
