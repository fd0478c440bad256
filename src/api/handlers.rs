use crate::core::calculator::{CalculateRequest, ShippingCalculator};
use crate::core::catalog::RegionCatalog;
use crate::core::locator::{AgentLocator, NearestAgentsQuery};
use crate::domain::model::{AggregationResult, City, CityMatch, Province, RankedAgent, Region};
use crate::utils::error::OngkirError;
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub locator: Arc<AgentLocator>,
    pub calculator: Arc<ShippingCalculator>,
    pub catalog: Arc<RegionCatalog>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// 對外錯誤：400/404 帶原訊息，其餘只回傳通用訊息
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    /// Logs the underlying error and hides it behind `message` unless it is a client error.
    pub fn with_context(message: &str, error: OngkirError) -> Self {
        if error.is_client_error() {
            return Self::from(error);
        }
        tracing::error!("❌ {}: {}", message, error);
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<OngkirError> for ApiError {
    fn from(error: OngkirError) -> Self {
        match &error {
            OngkirError::ValidationError { message } => Self {
                status: StatusCode::BAD_REQUEST,
                message: message.clone(),
            },
            OngkirError::NotFoundError { message } => Self {
                status: StatusCode::NOT_FOUND,
                message: message.clone(),
            },
            _ => {
                tracing::error!(
                    "❌ Request failed: {} (Category: {:?}, Severity: {:?})",
                    error,
                    error.category(),
                    error.severity()
                );
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: error.user_friendly_message(),
                }
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct RegionSearchParams {
    #[serde(default)]
    pub q: String,
    pub level: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CityParams {
    pub province: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CityByNameParams {
    pub name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub checked_at: String,
}

pub async fn nearest_agents(
    State(state): State<AppState>,
    Query(query): Query<NearestAgentsQuery>,
) -> Result<Json<Vec<RankedAgent>>, ApiError> {
    let agents = state
        .locator
        .nearest(&query)
        .await
        .map_err(|e| ApiError::with_context("Failed to find nearest agents", e))?;
    Ok(Json(agents))
}

pub async fn calculate(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CalculateRequest>, JsonRejection>,
) -> Result<Json<AggregationResult>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        ApiError::from(OngkirError::validation(format!(
            "Invalid request body: {}",
            rejection.body_text()
        )))
    })?;

    let result = state
        .calculator
        .calculate(&request)
        .await
        .map_err(|e| ApiError::with_context("Failed to calculate shipping cost", e))?;
    Ok(Json(result))
}

pub async fn search_regions(
    State(state): State<AppState>,
    Query(params): Query<RegionSearchParams>,
) -> Result<Json<Vec<Region>>, ApiError> {
    let regions = state
        .catalog
        .search_regions(&params.q, params.level.as_deref())
        .await
        .map_err(|e| ApiError::with_context("Failed to search regions", e))?;
    Ok(Json(regions))
}

pub async fn provinces(State(state): State<AppState>) -> Result<Json<Vec<Province>>, ApiError> {
    let provinces = state
        .catalog
        .provinces()
        .await
        .map_err(|e| ApiError::with_context("Failed to fetch provinces", e))?;
    Ok(Json(provinces))
}

pub async fn cities(
    State(state): State<AppState>,
    Query(params): Query<CityParams>,
) -> Result<Json<Vec<City>>, ApiError> {
    let cities = state
        .catalog
        .cities(params.province.as_deref())
        .await
        .map_err(|e| ApiError::with_context("Failed to fetch cities", e))?;
    Ok(Json(cities))
}

pub async fn city_by_name(
    State(state): State<AppState>,
    Query(params): Query<CityByNameParams>,
) -> Result<Json<CityMatch>, ApiError> {
    let city = state
        .catalog
        .city_by_name(params.name.as_deref().unwrap_or_default())
        .await
        .map_err(|e| ApiError::with_context("Failed to look up city", e))?;
    Ok(Json(city))
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ready".to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        checked_at: Utc::now().to_rfc3339(),
    })
}
