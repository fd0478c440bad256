use crate::core::ranker::rank_by_distance;
use crate::domain::model::{coerce_f64, GeoPoint, NamedLocation, RankedAgent, RegionLevel};
use crate::domain::ports::{AgentRepository, RegionRepository};
use crate::utils::error::{OngkirError, Result};
use crate::utils::validation::validate_identifier;
use serde::Deserialize;
use std::sync::Arc;

/// Nearest-agent query. Coordinates arrive as raw strings and are coerced leniently.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NearestAgentsQuery {
    pub village_id: Option<String>,
    pub city_id: Option<String>,
    pub lat: Option<String>,
    pub lng: Option<String>,
}

impl NearestAgentsQuery {
    fn non_empty(value: &Option<String>) -> Option<&str> {
        value.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }

    pub fn village_id(&self) -> Option<&str> {
        Self::non_empty(&self.village_id)
    }

    pub fn city_id(&self) -> Option<&str> {
        Self::non_empty(&self.city_id)
    }

    /// 解析失敗的座標視為 0
    pub fn coordinates(&self) -> (f64, f64) {
        let parse = |raw: &Option<String>| raw.as_deref().map(coerce_f64).unwrap_or(0.0);
        (parse(&self.lat), parse(&self.lng))
    }
}

/// 找出離使用者位置最近的代理商
pub struct AgentLocator {
    agents: Arc<dyn AgentRepository>,
    regions: Arc<dyn RegionRepository>,
}

impl AgentLocator {
    pub fn new(agents: Arc<dyn AgentRepository>, regions: Arc<dyn RegionRepository>) -> Self {
        Self { agents, regions }
    }

    pub async fn nearest(&self, query: &NearestAgentsQuery) -> Result<Vec<RankedAgent>> {
        let reference = self.resolve_reference(query).await?;
        tracing::info!(
            "📍 Reference location {} ({}, {})",
            reference.name,
            reference.point.latitude,
            reference.point.longitude
        );

        let agents = self.agents.list_agents().await?;
        tracing::debug!("Found {} agents", agents.len());

        let ranked = rank_by_distance(reference.point, agents);
        for (i, agent) in ranked.iter().enumerate() {
            tracing::debug!(
                "Top {}: {} ({}) - {:.2} km",
                i + 1,
                agent.agent.name.as_deref().unwrap_or(&agent.agent.code),
                agent.agent.city.as_deref().unwrap_or("-"),
                agent.distance
            );
        }

        Ok(ranked)
    }

    /// 座標優先，其次為村代碼，最後是城市代碼
    pub async fn resolve_reference(&self, query: &NearestAgentsQuery) -> Result<NamedLocation> {
        let (lat, lng) = query.coordinates();
        let village_id = query.village_id();
        let city_id = query.city_id();

        if village_id.is_none() && city_id.is_none() && (lat == 0.0 || lng == 0.0) {
            return Err(OngkirError::validation(
                "Valid coordinates or location identifiers are required",
            ));
        }

        if lat != 0.0 && lng != 0.0 {
            return Ok(NamedLocation {
                name: "User selected location".to_string(),
                point: GeoPoint::new(lat, lng),
            });
        }

        if let Some(village_id) = village_id {
            validate_identifier("village_id", village_id)?;
            let village = self
                .regions
                .find_region(RegionLevel::Villages, village_id)
                .await?
                .ok_or_else(|| OngkirError::not_found("Region not found"))?;

            return Ok(NamedLocation {
                point: village.location(),
                name: village.name,
            });
        }

        // 上面已排除兩者皆無的情況
        let city_id = city_id.unwrap_or_default();
        validate_identifier("city_id", city_id)?;
        match self.city_location(city_id).await {
            Some(location) => Ok(location),
            None => {
                tracing::info!("No coordinates found for city {}", city_id);
                Err(OngkirError::validation(
                    "Coordinates for this city are not available",
                ))
            }
        }
    }

    /// Regency coordinates first, then the `city_coordinates` table. Lookup
    /// errors are logged and treated as missing coordinates.
    async fn city_location(&self, city_id: &str) -> Option<NamedLocation> {
        match self.regions.find_region(RegionLevel::Regencies, city_id).await {
            Ok(Some(regency)) if !regency.location().is_unknown() => {
                return Some(NamedLocation {
                    point: regency.location(),
                    name: regency.name,
                });
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("Error fetching city {} from regencies: {}", city_id, e),
        }

        match self.regions.find_city_coordinates(city_id).await {
            Ok(Some(city)) if !city.location().is_unknown() => Some(NamedLocation {
                point: city.location(),
                name: city.name,
            }),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!("Error fetching city {} from city_coordinates: {}", city_id, e);
                None
            }
        }
    }
}
