// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use crate::cli::{CronCommand, NodeCommand, ProberCommand};
use crate::db::{queries, DbPool};
use time::OffsetDateTime;

pub(crate) async fn prober(pool: &DbPool, command: ProberCommand) -> anyhow::Result<()> {
    match command {
        ProberCommand::Add { name } => {
            let api_key = uuid::Uuid::new_v4().to_string();
            let id = queries::probers::insert_prober(pool, &name, &api_key).await?;
            tracing::info!("Added prober {id} ({name})");
            println!("id: {id}\nname: {name}\napi key: {api_key}");
        }
        ProberCommand::Edit { id, name } => {
            if !queries::probers::rename_prober(pool, id, &name).await? {
                anyhow::bail!("No prober with id {id}");
            }
            println!("Prober {id} renamed to {name}");
        }
        ProberCommand::Delete { id } => {
            if !queries::probers::delete_prober(pool, id).await? {
                anyhow::bail!("No prober with id {id}");
            }
            println!("Prober {id} deleted");
        }
        ProberCommand::List => {
            let probers = queries::probers::list_probers(pool).await?;
            if probers.is_empty() {
                println!("No probers registered");
            }
            for prober in probers {
                println!(
                    "{:>4}  {:<24}  {}  last submit: {}",
                    prober.id,
                    prober.name,
                    prober.api_key,
                    format_timestamp(prober.last_submit_ts)
                );
            }
        }
    }

    Ok(())
}

pub(crate) async fn cron(pool: &DbPool, command: CronCommand) -> anyhow::Result<()> {
    match command {
        CronCommand::List => {
            for task in queries::cron::get_all_tasks(pool).await? {
                println!(
                    "{:>3}  {:<28}  every {:>6}s  {:<7}  {}  last: {}  next: {}  took: {:.3}s",
                    task.id,
                    task.slug,
                    task.run_every,
                    task.state,
                    if task.is_enabled { "enabled " } else { "disabled" },
                    format_timestamp(task.last_run),
                    format_timestamp(task.next_run),
                    task.run_time
                );
            }
        }
    }

    Ok(())
}

pub(crate) async fn node(pool: &DbPool, command: NodeCommand) -> anyhow::Result<()> {
    match command {
        NodeCommand::Archive { id } => {
            if !queries::nodes::set_archived(pool, id, true).await? {
                anyhow::bail!("No node with id {id}");
            }
            println!("Node {id} archived");
        }
        NodeCommand::Delete { id } => {
            if !queries::nodes::delete_node(pool, id).await? {
                anyhow::bail!("No node with id {id}");
            }
            println!("Node {id} deleted");
        }
    }

    Ok(())
}

fn format_timestamp(ts: i64) -> String {
    if ts <= 0 {
        return "never".to_string();
    }
    OffsetDateTime::from_unix_timestamp(ts)
        .map(|dt| dt.to_string())
        .unwrap_or_else(|_| ts.to_string())
}
