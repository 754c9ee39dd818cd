// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use clap::Parser;

mod cli;
mod error;
mod logging;
mod probe;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // a missing .env is fine, everything can come from the real environment
    if let Err(err) = dotenvy::dotenv() {
        if !err.not_found() {
            return Err(err.into());
        }
    }

    logging::setup_tracing_logger()?;

    let args = cli::Cli::parse();
    tracing::debug!("{:?}", args);

    args.execute().await?;

    Ok(())
}
