// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use crate::db::DbPool;
use crate::geodata::GeoLookup;
use crate::nodes::HostResolver;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    db_pool: DbPool,
    geo: Option<Arc<dyn GeoLookup>>,
    resolver: Arc<dyn HostResolver>,
    ip_hash_salt: Arc<str>,
}

impl AppState {
    pub(crate) fn new(
        db_pool: DbPool,
        geo: Option<Arc<dyn GeoLookup>>,
        resolver: Arc<dyn HostResolver>,
        ip_hash_salt: &str,
    ) -> Self {
        Self {
            db_pool,
            geo,
            resolver,
            ip_hash_salt: Arc::from(ip_hash_salt),
        }
    }

    pub(crate) fn db_pool(&self) -> &DbPool {
        &self.db_pool
    }

    pub(crate) fn geo(&self) -> Option<&dyn GeoLookup> {
        self.geo.as_deref()
    }

    pub(crate) fn resolver(&self) -> &dyn HostResolver {
        self.resolver.as_ref()
    }

    pub(crate) fn ip_hash_salt(&self) -> &str {
        &self.ip_hash_salt
    }
}
