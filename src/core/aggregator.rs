use crate::config::FallbackConfig;
use crate::core::ranker::haversine_km;
use crate::domain::model::{
    AggregationResult, CarrierRates, CostQuery, GeoPoint, LocationDetails, RateQuote,
};
use crate::domain::ports::RateProvider;
use crate::utils::error::Result;
use crate::utils::validation::{validate_identifier, validate_weight};
use std::sync::Arc;

/// Input of one aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct RateQuery {
    pub origin: String,
    pub destination: String,
    pub weight_kg: f64,
    pub origin_details: LocationDetails,
    pub destination_details: LocationDetails,
    /// Only consulted by the fallback model when geodesic distance is enabled.
    pub origin_point: GeoPoint,
    pub destination_point: GeoPoint,
}

/// Precision kept before rounding up, in fractional grams (one microgram).
const GRAM_PRECISION: f64 = 1e6;

/// 以公克計重，無條件進位避免低估重量
///
/// The gram value is first rounded to the nearest microgram, which absorbs
/// binary float noise relative to its magnitude (`2.007 * 1000.0` is
/// `2007.0000000000002`, `32774.029 * 1000.0` is `32774029.000000004`).
/// Anything below half a microgram above a whole gram counts as that gram.
pub fn weight_in_grams(weight_kg: f64) -> u64 {
    let grams = (weight_kg * 1000.0 * GRAM_PRECISION).round() / GRAM_PRECISION;
    (grams.ceil() as u64).max(1)
}

/// 逐一向各物流商查詢運費，個別失敗不影響其他物流商，全部失敗時產生估價
pub struct RateAggregator {
    provider: Arc<dyn RateProvider>,
    carriers: Vec<String>,
    fallback: FallbackConfig,
}

impl RateAggregator {
    pub fn new(provider: Arc<dyn RateProvider>, carriers: Vec<String>, fallback: FallbackConfig) -> Self {
        Self {
            provider,
            carriers,
            fallback,
        }
    }

    pub fn carriers(&self) -> &[String] {
        &self.carriers
    }

    pub fn uses_geodesic_fallback(&self) -> bool {
        self.fallback.use_geodesic_distance
    }

    pub async fn aggregate(&self, query: &RateQuery) -> Result<AggregationResult> {
        validate_weight(query.weight_kg)?;
        validate_identifier("origin", &query.origin)?;
        validate_identifier("destination", &query.destination)?;

        let weight_grams = weight_in_grams(query.weight_kg);
        let mut carrier_results: Vec<CarrierRates> = Vec::new();

        for courier in &self.carriers {
            let cost_query = CostQuery {
                origin: query.origin.clone(),
                destination: query.destination.clone(),
                weight: weight_grams,
                courier: courier.clone(),
            };
            tracing::debug!("📡 Requesting rates for {}: {:?}", courier, cost_query);

            match self.provider.cost(&cost_query).await {
                Ok(results) if results.is_empty() => {
                    tracing::info!("Carrier {} returned no results", courier);
                }
                Ok(results) => {
                    tracing::debug!("Carrier {} returned {} result(s)", courier, results.len());
                    carrier_results.extend(results);
                }
                Err(e) => {
                    tracing::warn!("⚠️ Skipping carrier {}: {}", courier, e);
                }
            }
        }

        let quotes = flatten_quotes(carrier_results);

        if quotes.is_empty() {
            tracing::warn!(
                "No valid shipping costs available for {} -> {}, using fallback calculation",
                query.origin,
                query.destination
            );
            return Ok(AggregationResult {
                origin: query.origin.clone(),
                destination: query.destination.clone(),
                weight_grams,
                origin_details: query.origin_details.clone(),
                destination_details: query.destination_details.clone(),
                quotes: vec![self.fallback_quote(query)],
                fallback: true,
            });
        }

        tracing::info!(
            "Collected {} quote(s) for {} -> {} ({} g)",
            quotes.len(),
            query.origin,
            query.destination,
            weight_grams
        );

        Ok(AggregationResult {
            origin: query.origin.clone(),
            destination: query.destination.clone(),
            weight_grams,
            origin_details: query.origin_details.clone(),
            destination_details: query.destination_details.clone(),
            quotes,
            fallback: false,
        })
    }

    fn fallback_distance_km(&self, query: &RateQuery) -> f64 {
        if self.fallback.use_geodesic_distance
            && !query.origin_point.is_unknown()
            && !query.destination_point.is_unknown()
        {
            let distance = haversine_km(query.origin_point, query.destination_point);
            tracing::info!(
                "Fallback uses geodesic distance {:.2} km instead of placeholder {} km",
                distance,
                self.fallback.placeholder_distance_km
            );
            return distance;
        }
        self.fallback.placeholder_distance_km
    }

    /// baseRate + distance·perKmRate + weightKg·perKgRate
    pub fn fallback_cost(&self, distance_km: f64, weight_kg: f64) -> u64 {
        let fallback = &self.fallback;
        let total =
            fallback.base_rate + distance_km * fallback.per_km_rate + weight_kg * fallback.per_kg_rate;
        total.round().max(0.0) as u64
    }

    fn fallback_quote(&self, query: &RateQuery) -> RateQuote {
        let distance_km = self.fallback_distance_km(query);
        RateQuote {
            carrier_code: self.fallback.carrier_code.clone(),
            carrier_name: self.fallback.carrier_name.clone(),
            service: self.fallback.service.clone(),
            description: self.fallback.description.clone(),
            cost: self.fallback_cost(distance_km, query.weight_kg),
            etd: self.fallback.etd.clone(),
            note: String::new(),
        }
    }
}

/// 展開物流商結果，略過沒有任何費用的服務
fn flatten_quotes(results: Vec<CarrierRates>) -> Vec<RateQuote> {
    let mut quotes = Vec::new();

    for carrier in results.into_iter().filter(|r| !r.costs.is_empty()) {
        for service in &carrier.costs {
            for cost in &service.cost {
                let Some(value) = cost.value.filter(|v| *v >= 0.0) else {
                    tracing::debug!(
                        "Dropping {} {} entry without a cost value",
                        carrier.code,
                        service.service
                    );
                    continue;
                };
                quotes.push(RateQuote {
                    carrier_code: carrier.code.clone(),
                    carrier_name: carrier.name.clone(),
                    service: service.service.clone(),
                    description: service.description.clone(),
                    cost: value.round() as u64,
                    etd: cost.etd.clone(),
                    note: cost.note.clone(),
                });
            }
        }
    }

    quotes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{City, CostValue, Province, ServiceCost};
    use crate::utils::error::OngkirError;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Scripted carrier responses keyed by courier code.
    struct MockRateProvider {
        responses: HashMap<String, Result<Vec<CarrierRates>>>,
        calls: Mutex<Vec<CostQuery>>,
    }

    impl MockRateProvider {
        fn new() -> Self {
            Self {
                responses: HashMap::new(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn with(mut self, courier: &str, response: Result<Vec<CarrierRates>>) -> Self {
            self.responses.insert(courier.to_string(), response);
            self
        }

        fn calls(&self) -> Vec<CostQuery> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RateProvider for MockRateProvider {
        async fn cost(&self, query: &CostQuery) -> Result<Vec<CarrierRates>> {
            self.calls.lock().unwrap().push(query.clone());
            match self.responses.get(&query.courier) {
                Some(Ok(results)) => Ok(results.clone()),
                Some(Err(e)) => Err(OngkirError::upstream(e.to_string())),
                None => Err(OngkirError::upstream("connection refused")),
            }
        }

        async fn provinces(&self) -> Result<Vec<Province>> {
            Ok(Vec::new())
        }

        async fn cities(&self, _province_id: Option<&str>) -> Result<Vec<City>> {
            Ok(Vec::new())
        }
    }

    fn carriers() -> Vec<String> {
        vec!["jne".to_string(), "pos".to_string(), "tiki".to_string()]
    }

    fn query(weight_kg: f64) -> RateQuery {
        RateQuery {
            origin: "501".to_string(),
            destination: "114".to_string(),
            weight_kg,
            origin_details: LocationDetails {
                city_name: "Yogyakarta".to_string(),
                province: "DI Yogyakarta".to_string(),
            },
            destination_details: LocationDetails {
                city_name: "Denpasar".to_string(),
                province: "Bali".to_string(),
            },
            origin_point: GeoPoint::UNKNOWN,
            destination_point: GeoPoint::UNKNOWN,
        }
    }

    fn pos_rates() -> CarrierRates {
        CarrierRates {
            code: "pos".to_string(),
            name: "POS Indonesia (POS)".to_string(),
            costs: vec![ServiceCost {
                service: "Paket Kilat Khusus".to_string(),
                description: "Paket Kilat Khusus".to_string(),
                cost: vec![CostValue {
                    value: Some(26000.0),
                    etd: "4 HARI".to_string(),
                    note: String::new(),
                }],
            }],
        }
    }

    #[test]
    fn test_weight_rounds_up_to_whole_grams() {
        assert_eq!(weight_in_grams(0.4), 400);
        assert_eq!(weight_in_grams(0.401), 401);
        assert_eq!(weight_in_grams(1.0), 1000);
        assert_eq!(weight_in_grams(0.0001), 1);
        assert_eq!(weight_in_grams(2.007), 2007);
        assert_eq!(weight_in_grams(2.0001), 2001);
        assert_eq!(weight_in_grams(1.000001), 1001);
    }

    #[test]
    fn test_heavy_weights_ignore_float_noise() {
        assert_eq!(weight_in_grams(32774.029), 32_774_029);
        assert_eq!(weight_in_grams(32774.999), 32_774_999);
        assert_eq!(weight_in_grams(25000.0001), 25_000_001);
        assert_eq!(weight_in_grams(20000.0), 20_000_000);
    }

    #[tokio::test]
    async fn test_all_carriers_failing_yields_single_fallback_quote() {
        let provider = Arc::new(MockRateProvider::new());
        let aggregator = RateAggregator::new(provider.clone(), carriers(), FallbackConfig::default());

        let result = aggregator.aggregate(&query(1.5)).await.unwrap();

        assert_eq!(provider.calls().len(), 3);
        assert!(result.fallback);
        assert_eq!(result.quotes.len(), 1);
        let quote = &result.quotes[0];
        // 10000 + 10·2000 + 1.5·5000
        assert_eq!(quote.cost, 37_500);
        assert_eq!(quote.carrier_code, "jne");
        assert_eq!(quote.service, "REG");
        assert_eq!(quote.etd, "3-5");
        assert_eq!(result.weight_grams, 1500);
        assert_eq!(result.origin_details.city_name, "Yogyakarta");
    }

    #[tokio::test]
    async fn test_empty_results_also_trigger_fallback() {
        let empty_costs = CarrierRates {
            code: "tiki".to_string(),
            name: "Citra Van Titipan Kilat (TIKI)".to_string(),
            costs: Vec::new(),
        };
        let provider = Arc::new(
            MockRateProvider::new()
                .with("jne", Ok(Vec::new()))
                .with("pos", Ok(Vec::new()))
                .with("tiki", Ok(vec![empty_costs])),
        );
        let aggregator = RateAggregator::new(provider, carriers(), FallbackConfig::default());

        let result = aggregator.aggregate(&query(1.0)).await.unwrap();

        assert!(result.fallback);
        assert_eq!(result.quotes.len(), 1);
        assert_eq!(result.quotes[0].cost, 35_000);
    }

    #[tokio::test]
    async fn test_single_carrier_quote_is_returned_without_fallback() {
        let provider = Arc::new(
            MockRateProvider::new()
                .with("jne", Err(OngkirError::upstream("HTTP 500")))
                .with("pos", Ok(vec![pos_rates()]))
                .with("tiki", Ok(Vec::new())),
        );
        let aggregator = RateAggregator::new(provider.clone(), carriers(), FallbackConfig::default());

        let result = aggregator.aggregate(&query(0.401)).await.unwrap();

        assert!(!result.fallback);
        assert_eq!(result.quotes.len(), 1);
        assert_eq!(result.quotes[0].carrier_code, "pos");
        assert_eq!(result.quotes[0].cost, 26_000);
        assert_eq!(result.quotes[0].etd, "4 HARI");

        let calls = provider.calls();
        assert_eq!(calls.len(), 3);
        assert!(calls.iter().all(|c| c.weight == 401));
        let couriers: Vec<&str> = calls.iter().map(|c| c.courier.as_str()).collect();
        assert_eq!(couriers, vec!["jne", "pos", "tiki"]);
    }

    #[tokio::test]
    async fn test_invalid_weight_fails_before_any_call() {
        let provider = Arc::new(MockRateProvider::new());
        let aggregator = RateAggregator::new(provider.clone(), carriers(), FallbackConfig::default());

        for weight in [0.0, -2.0, f64::NAN] {
            let err = aggregator.aggregate(&query(weight)).await.unwrap_err();
            assert!(matches!(err, OngkirError::ValidationError { .. }));
        }

        let mut bad_ids = query(1.0);
        bad_ids.destination = String::new();
        assert!(aggregator.aggregate(&bad_ids).await.is_err());

        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn test_fallback_can_use_geodesic_distance() {
        let fallback = FallbackConfig {
            use_geodesic_distance: true,
            ..FallbackConfig::default()
        };
        let aggregator = RateAggregator::new(Arc::new(MockRateProvider::new()), carriers(), fallback);

        let mut located = query(1.0);
        located.origin_point = GeoPoint::new(-6.2, 106.8);
        located.destination_point = GeoPoint::new(-6.9, 107.6);
        let result = aggregator.aggregate(&located).await.unwrap();

        let expected = aggregator.fallback_cost(
            haversine_km(located.origin_point, located.destination_point),
            1.0,
        );
        assert_eq!(result.quotes[0].cost, expected);
        assert!(result.quotes[0].cost > 35_000);

        // 任一端座標未知時仍使用預設距離
        let result = aggregator.aggregate(&query(1.0)).await.unwrap();
        assert_eq!(result.quotes[0].cost, 35_000);
    }

    #[test]
    fn test_flatten_skips_entries_without_value() {
        let mut rates = pos_rates();
        rates.costs[0].cost.push(CostValue {
            value: None,
            etd: "1-2".to_string(),
            note: String::new(),
        });

        let quotes = flatten_quotes(vec![rates]);
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].carrier_name, "POS Indonesia (POS)");
    }
}
