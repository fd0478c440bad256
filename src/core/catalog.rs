use crate::domain::model::{City, CityMatch, Province, Region, RegionLevel};
use crate::domain::ports::{RateProvider, RegionRepository};
use crate::utils::error::{OngkirError, Result};
use crate::utils::validation::validate_identifier;
use std::sync::Arc;

pub const REGION_SEARCH_LIMIT: usize = 10;

/// 行政區搜尋與運費 API 的省份、城市清單
pub struct RegionCatalog {
    regions: Arc<dyn RegionRepository>,
    rates: Arc<dyn RateProvider>,
}

impl RegionCatalog {
    pub fn new(regions: Arc<dyn RegionRepository>, rates: Arc<dyn RateProvider>) -> Self {
        Self { regions, rates }
    }

    pub async fn search_regions(&self, query: &str, level: Option<&str>) -> Result<Vec<Region>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let level = match level.map(str::trim).filter(|l| !l.is_empty()) {
            Some(raw) => raw.parse::<RegionLevel>().map_err(OngkirError::validation)?,
            None => RegionLevel::default(),
        };

        tracing::debug!("Searching {} for '{}'", level.table(), query);
        self.regions
            .search_regions(level, query, REGION_SEARCH_LIMIT)
            .await
    }

    pub async fn provinces(&self) -> Result<Vec<Province>> {
        self.rates.provinces().await
    }

    pub async fn cities(&self, province_id: Option<&str>) -> Result<Vec<City>> {
        let province_id = province_id.map(str::trim).filter(|p| !p.is_empty());
        if let Some(province_id) = province_id {
            validate_identifier("province", province_id)?;
        }
        self.rates.cities(province_id).await
    }

    /// 不分大小寫的部分比對，也接受「Kota Bandung」這類含類型的名稱
    pub async fn city_by_name(&self, name: &str) -> Result<CityMatch> {
        let needle = name.trim().to_lowercase();
        if needle.is_empty() {
            return Err(OngkirError::validation("City name is required"));
        }

        tracing::info!("Looking up city id for: {}", name);
        let cities = self.rates.cities(None).await?;

        cities
            .into_iter()
            .find(|city| {
                let plain = city.city_name.to_lowercase();
                let typed = match &city.city_type {
                    Some(city_type) => format!("{} {}", city_type, city.city_name).to_lowercase(),
                    None => plain.clone(),
                };
                plain.contains(&needle) || typed.contains(&needle)
            })
            .map(|city| CityMatch {
                city_id: city.city_id,
                city_name: city.city_name,
                city_type: city.city_type,
                province: city.province,
            })
            .ok_or_else(|| OngkirError::not_found("City not found in rate API data"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{CarrierRates, CostQuery};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockBackend {
        searches: Mutex<Vec<(RegionLevel, String, usize)>>,
        city_filters: Mutex<Vec<Option<String>>>,
    }

    #[async_trait]
    impl RegionRepository for MockBackend {
        async fn find_region(&self, _level: RegionLevel, _id: &str) -> Result<Option<Region>> {
            Ok(None)
        }

        async fn find_city_coordinates(&self, _city_id: &str) -> Result<Option<Region>> {
            Ok(None)
        }

        async fn find_regency_province(&self, _regency_id: &str) -> Result<Option<String>> {
            Ok(None)
        }

        async fn search_regions(
            &self,
            level: RegionLevel,
            query: &str,
            limit: usize,
        ) -> Result<Vec<Region>> {
            self.searches
                .lock()
                .unwrap()
                .push((level, query.to_string(), limit));
            Ok(vec![Region {
                id: "3273".to_string(),
                name: "Kota Bandung".to_string(),
                latitude: None,
                longitude: None,
            }])
        }
    }

    #[async_trait]
    impl RateProvider for MockBackend {
        async fn cost(&self, _query: &CostQuery) -> Result<Vec<CarrierRates>> {
            Ok(Vec::new())
        }

        async fn provinces(&self) -> Result<Vec<Province>> {
            Err(OngkirError::upstream("HTTP 401"))
        }

        async fn cities(&self, province_id: Option<&str>) -> Result<Vec<City>> {
            self.city_filters
                .lock()
                .unwrap()
                .push(province_id.map(str::to_string));
            Ok(vec![
                city("22", "Bandung", "Kabupaten", "Jawa Barat"),
                city("23", "Bandung", "Kota", "Jawa Barat"),
                city("114", "Denpasar", "Kota", "Bali"),
            ])
        }
    }

    fn city(id: &str, name: &str, city_type: &str, province: &str) -> City {
        City {
            city_id: id.to_string(),
            province_id: None,
            province: Some(province.to_string()),
            city_type: Some(city_type.to_string()),
            city_name: name.to_string(),
            postal_code: None,
        }
    }

    fn catalog() -> (RegionCatalog, Arc<MockBackend>) {
        let backend = Arc::new(MockBackend::default());
        (RegionCatalog::new(backend.clone(), backend.clone()), backend)
    }

    #[tokio::test]
    async fn test_empty_search_skips_datastore() {
        let (catalog, backend) = catalog();

        let regions = catalog.search_regions("   ", Some("regencies")).await.unwrap();

        assert!(regions.is_empty());
        assert!(backend.searches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_defaults_to_villages_with_limit() {
        let (catalog, backend) = catalog();

        catalog.search_regions("sukaluyu", None).await.unwrap();
        catalog.search_regions("bandung", Some("regencies")).await.unwrap();

        let searches = backend.searches.lock().unwrap();
        assert_eq!(searches[0], (RegionLevel::Villages, "sukaluyu".to_string(), 10));
        assert_eq!(searches[1].0, RegionLevel::Regencies);
    }

    #[tokio::test]
    async fn test_search_rejects_unknown_level() {
        let (catalog, _) = catalog();

        let err = catalog.search_regions("bandung", Some("agen")).await.unwrap_err();
        assert!(matches!(err, OngkirError::ValidationError { .. }));
    }

    #[tokio::test]
    async fn test_city_by_name_matches_type_prefixed_names() {
        let (catalog, _) = catalog();

        let found = catalog.city_by_name("Kota Bandung").await.unwrap();
        assert_eq!(found.city_id, "23");

        let found = catalog.city_by_name("denpa").await.unwrap();
        assert_eq!(found.city_id, "114");
        assert_eq!(found.province.as_deref(), Some("Bali"));

        let found = catalog.city_by_name("BANDUNG").await.unwrap();
        assert_eq!(found.city_id, "22");
    }

    #[tokio::test]
    async fn test_city_by_name_errors() {
        let (catalog, _) = catalog();

        assert!(matches!(
            catalog.city_by_name("").await,
            Err(OngkirError::ValidationError { .. })
        ));
        assert!(matches!(
            catalog.city_by_name("Makassar").await,
            Err(OngkirError::NotFoundError { .. })
        ));
    }

    #[tokio::test]
    async fn test_cities_pass_province_filter() {
        let (catalog, backend) = catalog();

        catalog.cities(Some("9")).await.unwrap();
        catalog.cities(Some("")).await.unwrap();

        let filters = backend.city_filters.lock().unwrap();
        assert_eq!(*filters, vec![Some("9".to_string()), None]);
    }

    #[tokio::test]
    async fn test_province_upstream_failure_propagates() {
        let (catalog, _) = catalog();
        assert!(catalog.provinces().await.is_err());
    }
}
