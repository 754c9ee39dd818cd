// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use crate::cli::ServeArgs;
use crate::cron::{MaintenanceTasks, Scheduler};
use crate::geodata::{GeoLookup, MaxmindGeoLookup};
use crate::http::{server::build_http_api, state::AppState};
use crate::nodes::DnsResolver;
use anyhow::Context;
use core::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const FEED_TIMEOUT: Duration = Duration::from_secs(30);

pub(crate) async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let pool = args.db.connect().await?;

    let geo: Option<Arc<dyn GeoLookup>> = match &args.geoip_city_db {
        Some(city_db) => {
            let lookup = MaxmindGeoLookup::open(city_db, args.geoip_asn_db.as_deref())?;
            tracing::info!("Geo lookups from {}", city_db.display());
            Some(Arc::new(lookup))
        }
        None => {
            tracing::warn!("No GeoIP database configured, node locations won't be tracked");
            None
        }
    };
    let resolver = Arc::new(DnsResolver::from_system_conf()?);

    let http_client = reqwest::Client::builder()
        .user_agent(concat!("monero-node-status-api/", env!("CARGO_PKG_VERSION")))
        .timeout(FEED_TIMEOUT)
        .build()?;
    let tasks = MaintenanceTasks::new(
        pool.clone(),
        http_client,
        args.ban_list_url,
        args.rucknium_feed_url,
    );

    let shutdown = CancellationToken::new();

    let scheduler = Scheduler::new(pool.clone(), tasks);
    let scheduler_handle = tokio::spawn(scheduler.run(shutdown.clone()));
    tracing::info!("Started maintenance scheduler");

    let bind_addr: SocketAddr = format!("{}:{}", args.http_host, args.http_port)
        .parse()
        .context("Invalid HTTP bind address")?;
    let state = AppState::new(pool, geo, resolver, &args.ip_hash_salt);
    let server = build_http_api(state, bind_addr).await?;
    tracing::info!("Started HTTP server on {}", server.local_addr()?);
    let server_handle = tokio::spawn(server.run(shutdown.clone().cancelled_owned()));

    wait_for_signal().await?;
    shutdown.cancel();

    server_handle.await??;
    scheduler_handle.await?;
    tracing::info!("Stopped");

    Ok(())
}

#[cfg(unix)]
async fn wait_for_signal() -> anyhow::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};
    let mut sigterm = signal(SignalKind::terminate())?;

    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            res?;
            tracing::info!("Received SIGINT");
        },
        _ = sigterm.recv() => {
            tracing::info!("Received SIGTERM");
        }
    }

    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_signal() -> anyhow::Result<()> {
    tokio::signal::ctrl_c().await?;
    tracing::info!("Received SIGINT");
    Ok(())
}
