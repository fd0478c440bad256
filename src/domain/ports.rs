use crate::domain::model::{Agent, CarrierRates, City, CostQuery, Province, Region, RegionLevel};
use crate::utils::error::Result;
use async_trait::async_trait;

/// 代理商資料來源；查無資料回傳 `Ok(None)` 而非錯誤
#[async_trait]
pub trait AgentRepository: Send + Sync {
    async fn list_agents(&self) -> Result<Vec<Agent>>;
    async fn find_agent(&self, code: &str) -> Result<Option<Agent>>;
}

/// Administrative region lookups. Absence of a row is `Ok(None)`.
#[async_trait]
pub trait RegionRepository: Send + Sync {
    async fn find_region(&self, level: RegionLevel, id: &str) -> Result<Option<Region>>;

    /// Coordinates from the auxiliary `city_coordinates` table.
    async fn find_city_coordinates(&self, city_id: &str) -> Result<Option<Region>>;

    /// Province name of a regency.
    async fn find_regency_province(&self, regency_id: &str) -> Result<Option<String>>;

    async fn search_regions(&self, level: RegionLevel, query: &str, limit: usize)
        -> Result<Vec<Region>>;
}

/// 物流運費 API
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Quotes for one courier. Any non-success envelope is an error.
    async fn cost(&self, query: &CostQuery) -> Result<Vec<CarrierRates>>;
    async fn provinces(&self) -> Result<Vec<Province>>;
    async fn cities(&self, province_id: Option<&str>) -> Result<Vec<City>>;
}
