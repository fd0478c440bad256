use crate::config::CarrierApiConfig;
use crate::domain::model::{CarrierRates, City, CostQuery, Province};
use crate::domain::ports::RateProvider;
use crate::utils::error::{OngkirError, Result};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// `{"rajaongkir": {"status": {...}, "results": ...}}`
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    rajaongkir: Option<EnvelopeBody<T>>,
}

#[derive(Debug, Deserialize)]
struct EnvelopeBody<T> {
    status: Option<EnvelopeStatus>,
    results: Option<T>,
}

#[derive(Debug, Deserialize)]
struct EnvelopeStatus {
    code: Option<u16>,
    description: Option<String>,
}

/// RajaOngkir (starter) 運費 API 客戶端
#[derive(Debug, Clone)]
pub struct RajaOngkirClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RajaOngkirClient {
    pub fn new(config: &CarrierApiConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// 檢查 HTTP 狀態與信封內的狀態碼，皆為 200 才取出結果
    async fn read_results<T: DeserializeOwned>(&self, response: Response, what: &str) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Rate API error for {}: {} {}", what, status, body);
            return Err(OngkirError::upstream(format!(
                "{} request failed with HTTP {}",
                what, status
            )));
        }

        let envelope: Envelope<T> = response.json().await?;
        let body = envelope.rajaongkir.ok_or_else(|| {
            OngkirError::upstream(format!("Unexpected response format for {}", what))
        })?;

        // 缺少狀態區塊視同失敗
        match &body.status {
            Some(status) if status.code == Some(200) => {}
            Some(status) => {
                return Err(OngkirError::upstream(format!(
                    "{} rejected with status {:?}: {}",
                    what,
                    status.code,
                    status.description.as_deref().unwrap_or("-")
                )));
            }
            None => {
                return Err(OngkirError::upstream(format!(
                    "{} response has no status block",
                    what
                )));
            }
        }

        body.results.ok_or_else(|| {
            OngkirError::upstream(format!("Unexpected response format for {}: no results", what))
        })
    }
}

#[async_trait]
impl RateProvider for RajaOngkirClient {
    async fn cost(&self, query: &CostQuery) -> Result<Vec<CarrierRates>> {
        let weight = query.weight.to_string();
        let form = [
            ("origin", query.origin.as_str()),
            ("destination", query.destination.as_str()),
            ("weight", weight.as_str()),
            ("courier", query.courier.as_str()),
        ];

        let response = self
            .client
            .post(self.endpoint("cost"))
            .header("key", &self.api_key)
            .form(&form)
            .send()
            .await?;

        let what = format!("cost ({})", query.courier);
        let results: Vec<CarrierRates> = self.read_results(response, &what).await?;
        tracing::debug!("Rate API returned {} result(s) for {}", results.len(), query.courier);
        Ok(results)
    }

    async fn provinces(&self) -> Result<Vec<Province>> {
        let response = self
            .client
            .get(self.endpoint("province"))
            .header("key", &self.api_key)
            .send()
            .await?;

        self.read_results(response, "province").await
    }

    async fn cities(&self, province_id: Option<&str>) -> Result<Vec<City>> {
        let mut request = self
            .client
            .get(self.endpoint("city"))
            .header("key", &self.api_key);

        if let Some(province_id) = province_id {
            request = request.query(&[("province", province_id)]);
        }

        let response = request.send().await?;
        self.read_results(response, "city").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn client(server: &MockServer) -> RajaOngkirClient {
        RajaOngkirClient::new(&CarrierApiConfig {
            base_url: server.base_url(),
            api_key: "test-key".to_string(),
            carriers: vec!["jne".to_string()],
            timeout_seconds: 5,
        })
        .unwrap()
    }

    fn cost_query(courier: &str) -> CostQuery {
        CostQuery {
            origin: "501".to_string(),
            destination: "114".to_string(),
            weight: 1700,
            courier: courier.to_string(),
        }
    }

    #[tokio::test]
    async fn test_cost_sends_form_and_parses_results() {
        let server = MockServer::start();
        let cost_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/cost")
                .header("key", "test-key")
                .body_contains("origin=501")
                .body_contains("destination=114")
                .body_contains("weight=1700")
                .body_contains("courier=jne");
            then.status(200).json_body(serde_json::json!({
                "rajaongkir": {
                    "status": { "code": 200, "description": "OK" },
                    "results": [{
                        "code": "jne",
                        "name": "Jalur Nugraha Ekakurir (JNE)",
                        "costs": [{
                            "service": "OKE",
                            "description": "Ongkos Kirim Ekonomis",
                            "cost": [{ "value": 38000, "etd": "4-5", "note": "" }]
                        }]
                    }]
                }
            }));
        });

        let results = client(&server).cost(&cost_query("jne")).await.unwrap();

        cost_mock.assert();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].costs[0].service, "OKE");
        assert_eq!(results[0].costs[0].cost[0].value, Some(38000.0));
    }

    #[tokio::test]
    async fn test_cost_http_error_is_upstream_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/cost");
            then.status(400).json_body(serde_json::json!({
                "rajaongkir": { "status": { "code": 400, "description": "Invalid key" } }
            }));
        });

        let err = client(&server).cost(&cost_query("pos")).await.unwrap_err();
        assert!(matches!(err, OngkirError::UpstreamError { .. }));
    }

    #[tokio::test]
    async fn test_cost_envelope_status_is_checked() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/cost");
            then.status(200).json_body(serde_json::json!({
                "rajaongkir": {
                    "status": { "code": 400, "description": "Weight exceeds limit" },
                    "results": []
                }
            }));
        });

        let err = client(&server).cost(&cost_query("tiki")).await.unwrap_err();
        assert!(matches!(err, OngkirError::UpstreamError { .. }));
    }

    #[tokio::test]
    async fn test_cost_without_status_block_is_rejected() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/cost");
            then.status(200).json_body(serde_json::json!({
                "rajaongkir": {
                    "results": [{
                        "code": "jne",
                        "name": "Jalur Nugraha Ekakurir (JNE)",
                        "costs": [{
                            "service": "REG",
                            "description": "Layanan Reguler",
                            "cost": [{ "value": 12345, "etd": "2-3", "note": "" }]
                        }]
                    }]
                }
            }));
        });

        let err = client(&server).cost(&cost_query("jne")).await.unwrap_err();
        assert!(matches!(err, OngkirError::UpstreamError { .. }));
    }

    #[tokio::test]
    async fn test_malformed_payload_is_an_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/cost");
            then.status(200).body("<html>maintenance</html>");
        });

        assert!(client(&server).cost(&cost_query("jne")).await.is_err());
    }

    #[tokio::test]
    async fn test_cities_with_province_filter() {
        let server = MockServer::start();
        let city_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/city")
                .query_param("province", "1")
                .header("key", "test-key");
            then.status(200).json_body(serde_json::json!({
                "rajaongkir": {
                    "status": { "code": 200, "description": "OK" },
                    "results": [{
                        "city_id": "17",
                        "province_id": "1",
                        "province": "Bali",
                        "type": "Kabupaten",
                        "city_name": "Badung",
                        "postal_code": "80351"
                    }]
                }
            }));
        });

        let cities = client(&server).cities(Some("1")).await.unwrap();

        city_mock.assert();
        assert_eq!(cities.len(), 1);
        assert_eq!(cities[0].city_type.as_deref(), Some("Kabupaten"));
        assert_eq!(cities[0].postal_code.as_deref(), Some("80351"));
    }

    #[tokio::test]
    async fn test_provinces_without_results_is_unexpected_format() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/province");
            then.status(200).json_body(serde_json::json!({ "error": "nope" }));
        });

        let err = client(&server).provinces().await.unwrap_err();
        assert!(matches!(err, OngkirError::UpstreamError { .. }));
    }
}
