// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use crate::db::{queries, DbPool};
use crate::utils::unix_timestamp_now;
use monero_node_status_client::models::{JobCapabilities, Node};

/// Hands the least recently checked eligible node to a prober.
///
/// `None` means every eligible node is archived or there are none at all.
pub(crate) async fn give_job(
    pool: &DbPool,
    capabilities: JobCapabilities,
) -> anyhow::Result<Option<Node>> {
    let job = queries::nodes::claim_next_job(pool, capabilities, unix_timestamp_now()).await?;
    if let Some(job) = &job {
        tracing::debug!(
            "Assigned node {} ({}:{}) to a prober",
            job.id,
            job.hostname,
            job.port
        );
    }

    Ok(job.map(Node::from))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::queries::nodes::{insert_node, tests::clearnet, tests::i2p, tests::onion};
    use crate::db::test_pool;

    #[tokio::test]
    async fn disallowed_transports_are_never_dispatched() {
        let pool = test_pool().await;
        insert_node(
            &pool,
            &onion("cakexmrl7bonq7ovjka5kuwuyd3f7qnkz6z6s6dmsy3uckwra7bvggyd.onion"),
        )
        .await
        .unwrap();
        insert_node(&pool, &i2p("xmrnode.i2p")).await.unwrap();
        insert_node(&pool, &clearnet("v6.example.com", &["2001:db8::1"]))
            .await
            .unwrap();

        assert!(give_job(&pool, JobCapabilities::default())
            .await
            .unwrap()
            .is_none());

        let i2p_only = JobCapabilities {
            accept_i2p: true,
            ..Default::default()
        };
        for _ in 0..3 {
            let node = give_job(&pool, i2p_only).await.unwrap().unwrap();
            assert!(node.is_i2p);
            assert!(!node.is_tor);
            assert_eq!(node.last_check_status, serde_json::json!([2, 2, 2, 2, 2]));
        }
    }
}
