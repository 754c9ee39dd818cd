// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use crate::ban_list::feeds::DEFAULT_BAN_LIST_URL;
use crate::db::{DbPool, Storage};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

pub(crate) mod admin;
pub(crate) mod serve;

#[derive(Parser, Debug)]
#[clap(author = "Nymtech", version, about)]
pub(crate) struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

impl Cli {
    pub(crate) async fn execute(self) -> anyhow::Result<()> {
        match self.command {
            Commands::Serve(args) => serve::serve(args).await,
            Commands::Prober { db, command } => admin::prober(&db.connect().await?, command).await,
            Commands::Cron { db, command } => admin::cron(&db.connect().await?, command).await,
            Commands::Node { db, command } => admin::node(&db.connect().await?, command).await,
        }
    }
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Run the HTTP API and the maintenance scheduler
    Serve(ServeArgs),

    /// Manage prober credentials
    Prober {
        #[clap(flatten)]
        db: DatabaseArgs,
        #[clap(subcommand)]
        command: ProberCommand,
    },

    /// Inspect maintenance tasks
    Cron {
        #[clap(flatten)]
        db: DatabaseArgs,
        #[clap(subcommand)]
        command: CronCommand,
    },

    /// Manage monitored nodes
    Node {
        #[clap(flatten)]
        db: DatabaseArgs,
        #[clap(subcommand)]
        command: NodeCommand,
    },
}

#[derive(clap::Args, Debug)]
pub(crate) struct DatabaseArgs {
    /// SQLite connection string
    #[arg(
        long,
        env = "MONERO_NODE_STATUS_API_DATABASE_URL",
        default_value = "sqlite://monero-node-status.sqlite?mode=rwc"
    )]
    pub(crate) database_url: String,

    #[arg(
        long,
        env = "MONERO_NODE_STATUS_API_SQLITE_BUSY_TIMEOUT",
        default_value = "5"
    )]
    pub(crate) sqlite_busy_timeout_s: u64,
}

impl DatabaseArgs {
    pub(crate) async fn connect(self) -> anyhow::Result<DbPool> {
        let storage = Storage::init(
            self.database_url,
            Duration::from_secs(self.sqlite_busy_timeout_s),
        )
        .await?;
        Ok(storage.pool_owned())
    }
}

#[derive(clap::Args, Debug)]
pub(crate) struct ServeArgs {
    #[clap(flatten)]
    pub(crate) db: DatabaseArgs,

    #[arg(long, env = "APP_HOST", default_value = "0.0.0.0")]
    pub(crate) http_host: String,

    #[arg(long, env = "APP_PORT", default_value = "8000")]
    pub(crate) http_port: u16,

    /// Salt for the submitter IP fingerprint
    #[arg(long, env = "MONERO_NODE_STATUS_API_IP_HASH_SALT", hide_env_values = true)]
    pub(crate) ip_hash_salt: String,

    /// GeoLite2 City database; geo lookups are off without it
    #[arg(long, env = "MONERO_NODE_STATUS_API_GEOIP_CITY_DB")]
    pub(crate) geoip_city_db: Option<PathBuf>,

    /// GeoLite2 ASN database
    #[arg(long, env = "MONERO_NODE_STATUS_API_GEOIP_ASN_DB")]
    pub(crate) geoip_asn_db: Option<PathBuf>,

    #[arg(long, env = "MONERO_NODE_STATUS_API_BAN_LIST_URL", default_value = DEFAULT_BAN_LIST_URL)]
    pub(crate) ban_list_url: String,

    /// Rucknium spy-node scan feed
    #[arg(long, env = "RUCKNIUM_FEED_URL")]
    pub(crate) rucknium_feed_url: Option<String>,
}

#[derive(Subcommand, Debug)]
pub(crate) enum ProberCommand {
    /// Register a prober and print its API key
    Add { name: String },
    /// Rename a prober
    Edit { id: i64, name: String },
    Delete { id: i64 },
    List,
}

#[derive(Subcommand, Debug)]
pub(crate) enum CronCommand {
    List,
}

#[derive(Subcommand, Debug)]
pub(crate) enum NodeCommand {
    /// Stop dispatching a node without deleting its history
    Archive { id: i64 },
    Delete { id: i64 },
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn admin_commands_parse() {
        let cli = Cli::try_parse_from([
            "monero-node-status-api",
            "prober",
            "--database-url",
            "sqlite::memory:",
            "edit",
            "3",
            "eu-west",
        ])
        .unwrap();
        match cli.command {
            Commands::Prober {
                db,
                command: ProberCommand::Edit { id, name },
            } => {
                assert_eq!(db.database_url, "sqlite::memory:");
                assert_eq!(id, 3);
                assert_eq!(name, "eu-west");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
