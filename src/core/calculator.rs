use crate::core::aggregator::{RateAggregator, RateQuery};
use crate::domain::model::{lenient, AggregationResult, GeoPoint, LocationDetails, RegionLevel};
use crate::domain::ports::{AgentRepository, RegionRepository};
use crate::utils::error::{OngkirError, Result};
use crate::utils::validation::{validate_identifier, validate_weight};
use serde::Deserialize;
use std::sync::Arc;

const UNKNOWN_ORIGIN: &str = "Unknown Origin";
const UNKNOWN_DESTINATION: &str = "Unknown Destination";
const UNKNOWN_PROVINCE: &str = "Unknown";

/// 運費計算請求，欄位名稱與前端一致
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculateRequest {
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub agent_kode: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_f64")]
    pub weight: Option<f64>,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub origin_city_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub destination_city_id: Option<String>,
    #[serde(default)]
    pub destination_province: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// 驗證請求、取得代理商資料後交給 [`RateAggregator`] 計算
pub struct ShippingCalculator {
    agents: Arc<dyn AgentRepository>,
    regions: Arc<dyn RegionRepository>,
    aggregator: RateAggregator,
}

impl ShippingCalculator {
    pub fn new(
        agents: Arc<dyn AgentRepository>,
        regions: Arc<dyn RegionRepository>,
        aggregator: RateAggregator,
    ) -> Self {
        Self {
            agents,
            regions,
            aggregator,
        }
    }

    pub async fn calculate(&self, request: &CalculateRequest) -> Result<AggregationResult> {
        // 驗證必須在任何外部呼叫之前完成
        let (agent_kode, weight) = match (present(&request.agent_kode), request.weight) {
            (Some(kode), Some(weight)) if weight != 0.0 => (kode, weight),
            _ => return Err(OngkirError::validation("Weight and agentKode are required")),
        };
        let (origin, destination) = match (
            present(&request.origin_city_id),
            present(&request.destination_city_id),
        ) {
            (Some(origin), Some(destination)) => (origin, destination),
            _ => {
                return Err(OngkirError::validation(
                    "Origin and destination city IDs are required",
                ))
            }
        };
        validate_identifier("agentKode", agent_kode)?;
        validate_identifier("originCityId", origin)?;
        validate_identifier("destinationCityId", destination)?;
        validate_weight(weight)?;

        let agent = self
            .agents
            .find_agent(agent_kode)
            .await?
            .ok_or_else(|| OngkirError::not_found("Agent not found"))?;
        tracing::info!(
            "🚚 Calculating rates from agent {} ({} -> {}, {} kg)",
            agent.code,
            origin,
            destination,
            weight
        );

        let origin_details = LocationDetails {
            city_name: agent
                .city
                .clone()
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_ORIGIN.to_string()),
            province: agent
                .province
                .clone()
                .filter(|p| !p.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_PROVINCE.to_string()),
        };
        let destination_details = LocationDetails {
            city_name: present(&request.destination)
                .unwrap_or(UNKNOWN_DESTINATION)
                .to_string(),
            province: self.destination_province(request, destination).await,
        };

        let query = RateQuery {
            origin: origin.to_string(),
            destination: destination.to_string(),
            weight_kg: weight,
            origin_details,
            destination_details,
            origin_point: agent.location(),
            destination_point: if self.aggregator.uses_geodesic_fallback() {
                self.destination_point(destination).await
            } else {
                GeoPoint::UNKNOWN
            },
        };

        self.aggregator.aggregate(&query).await
    }

    async fn destination_province(&self, request: &CalculateRequest, destination: &str) -> String {
        if let Some(province) = present(&request.destination_province) {
            return province.to_string();
        }

        match self.regions.find_regency_province(destination).await {
            Ok(Some(province)) => province,
            Ok(None) => UNKNOWN_PROVINCE.to_string(),
            Err(e) => {
                tracing::warn!("Error fetching province for city {}: {}", destination, e);
                UNKNOWN_PROVINCE.to_string()
            }
        }
    }

    /// 僅供估價模型使用；查不到時回傳未知座標
    async fn destination_point(&self, destination: &str) -> GeoPoint {
        match self.regions.find_region(RegionLevel::Regencies, destination).await {
            Ok(Some(regency)) => regency.location(),
            Ok(None) => GeoPoint::UNKNOWN,
            Err(e) => {
                tracing::debug!("No coordinates for destination {}: {}", destination, e);
                GeoPoint::UNKNOWN
            }
        }
    }
}
