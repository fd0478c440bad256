//! HTTP surface.
//!
//! - `GET  /api/agents?village_id=&city_id=&lat=&lng=` — five nearest agents
//! - `POST /api/calculate` — shipping cost from an agent to a destination
//! - `GET  /api/wilayah?q=&level=` — region search
//! - `GET  /api/rajaongkir/provinces`
//! - `GET  /api/rajaongkir/cities?province=`
//! - `GET  /api/rajaongkir/city-by-name?name=`
//! - `GET  /health`

pub mod handlers;

use crate::adapters::{RajaOngkirClient, SupabaseDirectory};
use crate::config::ServiceConfig;
use crate::core::aggregator::RateAggregator;
use crate::core::calculator::ShippingCalculator;
use crate::core::catalog::RegionCatalog;
use crate::core::locator::AgentLocator;
use crate::domain::ports::{AgentRepository, RateProvider, RegionRepository};
use crate::utils::error::Result;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub use handlers::{ApiError, AppState, ErrorResponse};

impl AppState {
    pub fn new(
        agents: Arc<dyn AgentRepository>,
        regions: Arc<dyn RegionRepository>,
        rates: Arc<dyn RateProvider>,
        config: &ServiceConfig,
    ) -> Self {
        let aggregator = RateAggregator::new(
            rates.clone(),
            config.carrier_api.carriers.clone(),
            config.fallback.clone(),
        );

        Self {
            locator: Arc::new(AgentLocator::new(agents.clone(), regions.clone())),
            calculator: Arc::new(ShippingCalculator::new(agents, regions.clone(), aggregator)),
            catalog: Arc::new(RegionCatalog::new(regions, rates)),
        }
    }

    /// 以設定檔建立 Supabase 與 RajaOngkir 客戶端
    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        let directory = Arc::new(SupabaseDirectory::new(&config.datastore)?);
        let rates = Arc::new(RajaOngkirClient::new(&config.carrier_api)?);
        Ok(Self::new(directory.clone(), directory, rates, config))
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/agents", get(handlers::nearest_agents))
        .route("/api/calculate", post(handlers::calculate))
        .route("/api/wilayah", get(handlers::search_regions))
        .route("/api/rajaongkir/provinces", get(handlers::provinces))
        .route("/api/rajaongkir/cities", get(handlers::cities))
        .route("/api/rajaongkir/city-by-name", get(handlers::city_by_name))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(config: &ServiceConfig, state: AppState) -> Result<()> {
    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!("🚀 Listening on {}", address);

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
