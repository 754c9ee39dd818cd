// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use anyhow::Context;
use maxminddb::{geoip2, Reader};
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct GeoData {
    pub(crate) asn: u32,
    pub(crate) asn_name: String,
    pub(crate) country_code: String,
    pub(crate) country_name: String,
    pub(crate) city: String,
    pub(crate) latitude: f64,
    pub(crate) longitude: f64,
}

pub(crate) trait GeoLookup: Send + Sync {
    fn lookup(&self, ip: IpAddr) -> anyhow::Result<GeoData>;
}

/// Geo/ASN lookups backed by local GeoLite2 databases.
pub(crate) struct MaxmindGeoLookup {
    city: Reader<Vec<u8>>,
    asn: Option<Reader<Vec<u8>>>,
}

impl MaxmindGeoLookup {
    pub(crate) fn open(city_db: &Path, asn_db: Option<&Path>) -> anyhow::Result<Self> {
        let city = Reader::open_readfile(city_db)
            .with_context(|| format!("Failed to open {}", city_db.display()))?;
        let asn = asn_db
            .map(|path| {
                Reader::open_readfile(path)
                    .with_context(|| format!("Failed to open {}", path.display()))
            })
            .transpose()?;

        Ok(MaxmindGeoLookup { city, asn })
    }
}

fn english_name(names: Option<&BTreeMap<&str, &str>>) -> String {
    names
        .and_then(|names| names.get("en"))
        .map(ToString::to_string)
        .unwrap_or_default()
}

impl GeoLookup for MaxmindGeoLookup {
    fn lookup(&self, ip: IpAddr) -> anyhow::Result<GeoData> {
        let city: geoip2::City = self
            .city
            .lookup(ip)
            .with_context(|| format!("No city record for {ip}"))?;

        let mut geo = GeoData::default();
        if let Some(country) = city.country {
            geo.country_code = country.iso_code.unwrap_or_default().to_string();
            geo.country_name = english_name(country.names.as_ref());
        }
        if let Some(record) = city.city {
            geo.city = english_name(record.names.as_ref());
        }
        if let Some(location) = city.location {
            geo.latitude = location.latitude.unwrap_or_default();
            geo.longitude = location.longitude.unwrap_or_default();
        }

        if let Some(reader) = &self.asn {
            // a missing ASN record still leaves us with a usable location
            match reader.lookup::<geoip2::Asn>(ip) {
                Ok(asn) => {
                    geo.asn = asn.autonomous_system_number.unwrap_or_default();
                    geo.asn_name = asn
                        .autonomous_system_organization
                        .unwrap_or_default()
                        .to_string();
                }
                Err(err) => tracing::debug!("No ASN record for {ip}: {err}"),
            }
        }

        Ok(geo)
    }
}
