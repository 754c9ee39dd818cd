// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use clap::Parser;

mod ban_list;
mod cli;
mod cron;
mod db;
mod geodata;
mod http;
mod jobs;
mod logging;
mod nodes;
mod utils;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // a missing .env is fine, everything can come from the real environment
    if let Err(err) = dotenvy::dotenv() {
        if !err.not_found() {
            return Err(err.into());
        }
    }

    logging::setup_tracing_logger()?;

    cli::Cli::parse().execute().await
}
