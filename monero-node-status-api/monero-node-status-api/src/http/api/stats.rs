// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use axum::extract::State;
use axum::{Json, Router};
use monero_node_status_client::models::ApiResponse;

use crate::db::queries;
use crate::http::error::{ApiResult, HttpError};
use crate::http::models::{CountryCount, NetFee};
use crate::http::state::AppState;

pub(crate) fn routes() -> Router<AppState> {
    Router::new()
        .route("/fees", axum::routing::get(net_fees))
        .route("/countries", axum::routing::get(countries))
}

#[utoipa::path(
    tag = "Stats",
    get,
    path = "/api/v1/fees",
    responses(
        (status = 200, body = ApiResponse<Vec<NetFee>>)
    )
)]
#[tracing::instrument(level = "debug", skip_all)]
pub(crate) async fn net_fees(State(state): State<AppState>) -> ApiResult<Vec<NetFee>> {
    let fees = queries::fees::get_net_fees(state.db_pool())
        .await
        .map_err(HttpError::internal_with_logging)?
        .into_iter()
        .map(NetFee::from)
        .collect();

    Ok(Json(ApiResponse::ok("Majority fee per network", fees)))
}

#[utoipa::path(
    tag = "Stats",
    get,
    path = "/api/v1/countries",
    responses(
        (status = 200, body = ApiResponse<Vec<CountryCount>>)
    )
)]
#[tracing::instrument(level = "debug", skip_all)]
pub(crate) async fn countries(State(state): State<AppState>) -> ApiResult<Vec<CountryCount>> {
    let countries = queries::nodes::count_by_country(state.db_pool())
        .await
        .map_err(HttpError::internal_with_logging)?
        .into_iter()
        .map(CountryCount::from)
        .collect();

    Ok(Json(ApiResponse::ok("Nodes per country", countries)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::queries::nodes::tests::clearnet;
    use crate::db::test_pool;
    use crate::geodata::GeoData;
    use crate::http::api::test_support::{test_server, test_state};
    use crate::nodes::tests::StaticResolver;

    #[tokio::test]
    async fn seeded_networks_are_listed() {
        let server = test_server(test_state(test_pool().await, StaticResolver::default()));

        let response = server.get("/api/v1/fees").await;
        response.assert_status_ok();
        let body: ApiResponse<Vec<NetFee>> = response.json();
        let nettypes: Vec<String> = body.data.unwrap().into_iter().map(|f| f.nettype).collect();
        assert_eq!(nettypes, vec!["mainnet", "stagenet", "testnet"]);
    }

    #[tokio::test]
    async fn nodes_are_counted_per_country() {
        let pool = test_pool().await;
        let geo = GeoData {
            country_code: "DE".to_string(),
            country_name: "Germany".to_string(),
            ..Default::default()
        };
        for host in ["a.example.com", "b.example.com"] {
            let id = queries::nodes::insert_node(&pool, &clearnet(host, &["203.0.113.10"]))
                .await
                .unwrap();
            queries::nodes::update_node_geo(&pool, id, &geo).await.unwrap();
        }
        let server = test_server(test_state(pool, StaticResolver::default()));

        let response = server.get("/api/v1/countries").await;
        response.assert_status_ok();
        let body: ApiResponse<Vec<CountryCount>> = response.json();
        let countries = body.data.unwrap();
        assert_eq!(countries.len(), 1);
        assert_eq!(countries[0].country_code, "DE");
        assert_eq!(countries[0].country_name, "Germany");
        assert_eq!(countries[0].total_nodes, 2);
    }
}
