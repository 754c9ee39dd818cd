// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use crate::ban_list;
use crate::db::models::NewNodeRecord;
use crate::db::{queries, DbPool};
use crate::utils::unix_timestamp_now;
use async_trait::async_trait;
use hickory_resolver::{Resolver, TokioResolver};
use itertools::Itertools;
use std::net::IpAddr;
use validation::Transport;

pub(crate) mod validation;

#[async_trait]
pub(crate) trait HostResolver: Send + Sync {
    async fn resolve(&self, hostname: &str) -> anyhow::Result<Vec<IpAddr>>;
}

/// Resolves through the system DNS configuration.
pub(crate) struct DnsResolver {
    inner: TokioResolver,
}

impl DnsResolver {
    pub(crate) fn from_system_conf() -> anyhow::Result<Self> {
        Ok(DnsResolver {
            inner: Resolver::builder_tokio()?.build(),
        })
    }
}

#[async_trait]
impl HostResolver for DnsResolver {
    async fn resolve(&self, hostname: &str) -> anyhow::Result<Vec<IpAddr>> {
        let lookup = self.inner.lookup_ip(hostname).await?;
        Ok(lookup.iter().collect())
    }
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum SubmissionError {
    #[error("Invalid protocol, must be one of http or https")]
    InvalidProtocol,
    #[error("Invalid port number")]
    InvalidPort,
    #[error("Invalid TOR v3 .onion hostname")]
    InvalidOnionHostname,
    #[error("Invalid I2P hostname")]
    InvalidI2pHostname,
    #[error("Could not resolve {hostname}")]
    Unresolvable { hostname: String },
    #[error("IP address is private or loopback")]
    NonPublicAddress,
    #[error("Cannot add node: host is in our ban list")]
    Banned,
    #[error("Node already monitored")]
    AlreadyMonitored,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl SubmissionError {
    /// Whether the submitter is at fault, as opposed to the server.
    pub(crate) fn is_rejection(&self) -> bool {
        !matches!(self, SubmissionError::Internal(_))
    }
}

#[derive(Debug, Clone)]
pub(crate) struct NodeSubmission {
    pub(crate) protocol: String,
    pub(crate) hostname: String,
    pub(crate) port: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SubmitOutcome {
    Added(i64),
    /// A previously archived node is monitored again.
    Restored(i64),
}

#[derive(Default)]
struct ResolvedHost {
    ip_addr: String,
    ip_addresses: String,
    ipv6_only: bool,
}

async fn resolve_clearnet_host(
    pool: &DbPool,
    resolver: &dyn HostResolver,
    hostname: &str,
) -> Result<ResolvedHost, SubmissionError> {
    let ips = resolver.resolve(hostname).await.map_err(|err| {
        tracing::debug!("Failed to resolve {hostname}: {err}");
        SubmissionError::Unresolvable {
            hostname: hostname.to_string(),
        }
    })?;
    let Some(first) = ips.first().copied() else {
        return Err(SubmissionError::Unresolvable {
            hostname: hostname.to_string(),
        });
    };

    if validation::is_non_public(first) {
        return Err(SubmissionError::NonPublicAddress);
    }

    let bans = ban_list::load_ban_list(pool).await?;
    if bans.any_banned(&ips) {
        return Err(SubmissionError::Banned);
    }

    Ok(ResolvedHost {
        ip_addr: first.to_string(),
        ip_addresses: ips.iter().join(","),
        ipv6_only: ips.iter().all(IpAddr::is_ipv6),
    })
}

/// Validates a node submission and starts monitoring it.
pub(crate) async fn submit_node(
    pool: &DbPool,
    resolver: &dyn HostResolver,
    submission: NodeSubmission,
    submitter_ip: Option<IpAddr>,
    salt: &str,
) -> Result<SubmitOutcome, SubmissionError> {
    let protocol = submission.protocol.trim().to_lowercase();
    let hostname = submission.hostname.trim().to_lowercase();

    if !validation::is_valid_protocol(&protocol) {
        return Err(SubmissionError::InvalidProtocol);
    }
    if !validation::is_valid_port(submission.port) {
        return Err(SubmissionError::InvalidPort);
    }
    let port = u16::try_from(submission.port).map_err(|_| SubmissionError::InvalidPort)?;

    let transport = Transport::from_hostname(&hostname);
    let resolved = match transport {
        Transport::Tor if !validation::is_valid_onion_hostname(&hostname) => {
            return Err(SubmissionError::InvalidOnionHostname)
        }
        Transport::I2p if !validation::is_valid_i2p_hostname(&hostname) => {
            return Err(SubmissionError::InvalidI2pHostname)
        }
        Transport::Tor | Transport::I2p => ResolvedHost::default(),
        Transport::Clearnet => resolve_clearnet_host(pool, resolver, &hostname).await?,
    };

    if let Some((node_id, is_archived)) =
        queries::nodes::find_node_by_identity(pool, &protocol, &hostname, port).await?
    {
        if !is_archived {
            return Err(SubmissionError::AlreadyMonitored);
        }
        queries::nodes::set_archived(pool, node_id, false).await?;
        tracing::info!("Restored archived node {node_id} ({hostname})");
        return Ok(SubmitOutcome::Restored(node_id));
    }

    let submitter_iphash = submitter_ip
        .map(|ip| validation::hash_ip_with_salt(&ip.to_string(), salt))
        .unwrap_or_default();

    let record = NewNodeRecord {
        protocol,
        hostname,
        port,
        is_tor: transport == Transport::Tor,
        is_i2p: transport == Transport::I2p,
        ip_addr: resolved.ip_addr,
        ip_addresses: resolved.ip_addresses,
        ipv6_only: resolved.ipv6_only,
        submitter_iphash,
        date_entered: unix_timestamp_now(),
    };
    let node_id = queries::nodes::insert_node(pool, &record).await?;
    tracing::info!("Added node {node_id} ({})", record.hostname);

    Ok(SubmitOutcome::Added(node_id))
}
