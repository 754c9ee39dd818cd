// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use anyhow::anyhow;
use axum::Router;
use core::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::http::{api_docs, server::HttpServer, state::AppState};

pub(crate) mod jobs;
pub(crate) mod nodes;
pub(crate) mod stats;

pub(crate) struct RouterBuilder {
    unfinished_router: Router<AppState>,
}

impl RouterBuilder {
    pub(crate) fn with_default_routes() -> Self {
        let router = Router::new()
            .merge(
                SwaggerUi::new("/swagger")
                    .url("/api-docs/openapi.json", api_docs::ApiDoc::openapi()),
            )
            .nest(
                "/api/v1",
                Router::new()
                    .merge(jobs::routes())
                    .merge(stats::routes())
                    .nest("/nodes", nodes::routes()),
            );

        Self {
            unfinished_router: router,
        }
    }

    pub(crate) fn with_state(self, state: AppState) -> RouterWithState {
        RouterWithState {
            router: self.finalize_routes().with_state(state),
        }
    }

    fn finalize_routes(self) -> Router<AppState> {
        self.unfinished_router
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().level(Level::DEBUG))
                    .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
            )
            .layer(CorsLayer::permissive())
    }
}

pub(crate) struct RouterWithState {
    pub(crate) router: Router,
}

impl RouterWithState {
    pub(crate) async fn build_server(self, bind_address: SocketAddr) -> anyhow::Result<HttpServer> {
        let listener = TcpListener::bind(bind_address)
            .await
            .map_err(|err| anyhow!("Couldn't bind to address {}: {}", bind_address, err))?;

        Ok(HttpServer::new(self.router, listener))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::db::DbPool;
    use crate::geodata::{tests::StaticGeoLookup, GeoData};
    use crate::http::state::AppState;
    use crate::nodes::tests::StaticResolver;
    use axum_test::TestServer;
    use std::sync::Arc;

    pub(crate) const TEST_SALT: &str = "test-salt";

    pub(crate) fn test_state(pool: DbPool, resolver: StaticResolver) -> AppState {
        let geo = StaticGeoLookup(Some(GeoData {
            asn: 64500,
            asn_name: "Example Networks".to_string(),
            country_code: "DE".to_string(),
            country_name: "Germany".to_string(),
            city: "Berlin".to_string(),
            latitude: 52.52,
            longitude: 13.4,
        }));

        AppState::new(pool, Some(Arc::new(geo)), Arc::new(resolver), TEST_SALT)
    }

    #[allow(clippy::unwrap_used)]
    pub(crate) fn test_server(state: AppState) -> TestServer {
        let router = super::RouterBuilder::with_default_routes()
            .with_state(state)
            .router;

        // no peer address under the mock transport
        TestServer::new(router).unwrap()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::test_support::*;
    use crate::db::test_pool;
    use crate::nodes::tests::StaticResolver;

    #[tokio::test]
    async fn serves_openapi_document() {
        let server = test_server(test_state(test_pool().await, StaticResolver::default()));

        let response = server.get("/api-docs/openapi.json").await;
        response.assert_status_ok();
        let doc: serde_json::Value = response.json();
        assert!(doc["paths"]["/api/v1/job"].is_object());
        assert!(doc["paths"]["/api/v1/nodes/id/{id}"].is_object());
    }
}
