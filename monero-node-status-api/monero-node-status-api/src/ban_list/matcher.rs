// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use ipnetwork::IpNetwork;
use std::net::IpAddr;

/// Parses one ban list line as a CIDR prefix or a bare address.
///
/// A bare address becomes a full-length prefix (`/32` or `/128`). Comments,
/// blank lines and anything malformed yield `None`.
pub(crate) fn parse_entry(entry: &str) -> Option<IpNetwork> {
    let entry = entry.trim();
    if entry.is_empty() || entry.starts_with('#') {
        return None;
    }

    match entry.split_once('/') {
        Some((addr, prefix)) => {
            let addr: IpAddr = addr.parse().ok()?;
            let prefix: u8 = prefix.parse().ok()?;
            IpNetwork::new(addr, prefix).ok()
        }
        None => entry.parse::<IpAddr>().ok().map(IpNetwork::from),
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct BanList {
    networks: Vec<IpNetwork>,
}

impl BanList {
    pub(crate) fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        BanList {
            networks: entries
                .into_iter()
                .filter_map(|entry| parse_entry(entry.as_ref()))
                .collect(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.networks.len()
    }

    pub(crate) fn is_banned(&self, ip: IpAddr) -> bool {
        self.networks.iter().any(|network| network.contains(ip))
    }

    pub(crate) fn any_banned<'a>(&self, ips: impl IntoIterator<Item = &'a IpAddr>) -> bool {
        ips.into_iter().any(|ip| self.is_banned(*ip))
    }
}
