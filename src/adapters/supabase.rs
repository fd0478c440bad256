use crate::config::DatastoreConfig;
use crate::domain::model::{lenient, Agent, Region, RegionLevel};
use crate::domain::ports::{AgentRepository, RegionRepository};
use crate::utils::error::{OngkirError, Result};
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;

const AGENT_TABLE: &str = "agen";
const CITY_COORDINATES_TABLE: &str = "city_coordinates";

#[derive(Debug, Deserialize)]
struct CityCoordinateRow {
    #[serde(deserialize_with = "lenient::string")]
    city_id: String,
    #[serde(default)]
    city_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_f64")]
    latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient::optional_f64")]
    longitude: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RegencyProvinceRow {
    #[serde(default)]
    provinces: Option<ProvinceName>,
}

#[derive(Debug, Deserialize)]
struct ProvinceName {
    name: Option<String>,
}

/// Supabase (PostgREST) 資料存取，只讀
#[derive(Debug, Clone)]
pub struct SupabaseDirectory {
    client: Client,
    rest_url: String,
    api_key: String,
}

impl SupabaseDirectory {
    pub fn new(config: &DatastoreConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            client,
            rest_url: format!("{}/rest/v1", config.url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
        })
    }

    async fn select<T: DeserializeOwned>(&self, table: &str, params: &[(&str, String)]) -> Result<Vec<T>> {
        let url = format!("{}/{}", self.rest_url, table);
        tracing::debug!("🗄️ Querying {} with {:?}", table, params);

        let response = self
            .client
            .get(&url)
            .header("apikey", &self.api_key)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .query(params)
            .send()
            .await
            .map_err(|e| OngkirError::datastore(format!("{} query failed: {}", table, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OngkirError::datastore(format!(
                "{} query failed with HTTP {}: {}",
                table, status, body
            )));
        }

        response
            .json::<Vec<T>>()
            .await
            .map_err(|e| OngkirError::datastore(format!("{} returned unexpected rows: {}", table, e)))
    }

    async fn select_one<T: DeserializeOwned>(&self, table: &str, column: &str, value: &str) -> Result<Option<T>> {
        let rows = self
            .select::<T>(
                table,
                &[
                    ("select", "*".to_string()),
                    (column, format!("eq.{}", value)),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().next())
    }
}

#[async_trait]
impl AgentRepository for SupabaseDirectory {
    async fn list_agents(&self) -> Result<Vec<Agent>> {
        self.select(AGENT_TABLE, &[("select", "*".to_string())]).await
    }

    async fn find_agent(&self, code: &str) -> Result<Option<Agent>> {
        self.select_one(AGENT_TABLE, "kode", code).await
    }
}

#[async_trait]
impl RegionRepository for SupabaseDirectory {
    async fn find_region(&self, level: RegionLevel, id: &str) -> Result<Option<Region>> {
        self.select_one(level.table(), "id", id).await
    }

    async fn find_city_coordinates(&self, city_id: &str) -> Result<Option<Region>> {
        let row: Option<CityCoordinateRow> = self
            .select_one(CITY_COORDINATES_TABLE, "city_id", city_id)
            .await?;

        Ok(row.map(|row| Region {
            name: row.city_name.unwrap_or_else(|| row.city_id.clone()),
            id: row.city_id,
            latitude: row.latitude,
            longitude: row.longitude,
        }))
    }

    async fn find_regency_province(&self, regency_id: &str) -> Result<Option<String>> {
        let rows: Vec<RegencyProvinceRow> = self
            .select(
                RegionLevel::Regencies.table(),
                &[
                    ("select", "name,province_id,provinces(name)".to_string()),
                    ("id", format!("eq.{}", regency_id)),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;

        Ok(rows
            .into_iter()
            .next()
            .and_then(|row| row.provinces)
            .and_then(|province| province.name))
    }

    async fn search_regions(&self, level: RegionLevel, query: &str, limit: usize) -> Result<Vec<Region>> {
        self.select(
            level.table(),
            &[
                ("select", "*".to_string()),
                ("name", format!("ilike.*{}*", query)),
                ("limit", limit.to_string()),
            ],
        )
        .await
    }
}
