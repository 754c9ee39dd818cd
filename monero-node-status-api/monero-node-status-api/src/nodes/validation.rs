// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use regex::Regex;
use sha2::{Digest, Sha256};
use std::net::IpAddr;
use std::sync::LazyLock;

static ONION_HOSTNAME: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^([a-z0-9-]+\.)*[a-z2-7]{56}\.onion$"));

static I2P_HOSTNAME: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^([a-z2-7]{52,63}\.b32|[a-z0-9-]{5,63})\.i2p$"));

/// How a node is reached, derived from its hostname.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Transport {
    Clearnet,
    Tor,
    I2p,
}

impl Transport {
    pub(crate) fn from_hostname(hostname: &str) -> Self {
        if hostname.ends_with(".onion") {
            Transport::Tor
        } else if hostname.ends_with(".i2p") {
            Transport::I2p
        } else {
            Transport::Clearnet
        }
    }
}

fn matches(pattern: &LazyLock<Result<Regex, regex::Error>>, hostname: &str) -> bool {
    match &**pattern {
        Ok(regex) => regex.is_match(hostname),
        Err(err) => {
            tracing::error!("Invalid hostname pattern: {err}");
            false
        }
    }
}

pub(crate) fn is_valid_onion_hostname(hostname: &str) -> bool {
    matches(&ONION_HOSTNAME, hostname)
}

pub(crate) fn is_valid_i2p_hostname(hostname: &str) -> bool {
    matches(&I2P_HOSTNAME, hostname)
}

pub(crate) fn is_valid_protocol(protocol: &str) -> bool {
    matches!(protocol, "http" | "https")
}

pub(crate) fn is_valid_port(port: i64) -> bool {
    (1..=65535).contains(&port)
}

/// Loopback, unspecified and private-range addresses can't be monitored
/// from the outside.
pub(crate) fn is_non_public(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(ip) => {
            ip.is_private() || ip.is_loopback() || ip.is_link_local() || ip.is_unspecified()
        }
        IpAddr::V6(ip) => {
            // fc00::/7 unique local
            let unique_local = (ip.segments()[0] & 0xfe00) == 0xfc00;
            ip.is_loopback() || ip.is_unspecified() || unique_local
        }
    }
}

/// Hex encoded SHA-256 of `salt + ip`.
pub(crate) fn hash_ip_with_salt(ip: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(ip.as_bytes());
    hex::encode(hasher.finalize())
}
