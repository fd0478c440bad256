use serde::{Deserialize, Deserializer, Serialize};

/// 一個經緯度點；兩個座標皆為 0 代表「未知」，而非赤道與本初子午線交點
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub const UNKNOWN: GeoPoint = GeoPoint {
        latitude: 0.0,
        longitude: 0.0,
    };

    /// Non-finite values coerce to 0.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude: finite_or_zero(latitude),
            longitude: finite_or_zero(longitude),
        }
    }

    /// A point is only known when both coordinates are present.
    pub fn from_optional(latitude: Option<f64>, longitude: Option<f64>) -> Self {
        match (latitude, longitude) {
            (Some(lat), Some(lng)) => Self::new(lat, lng),
            _ => Self::UNKNOWN,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.latitude == 0.0 && self.longitude == 0.0
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Lenient string → number coercion used for query parameters.
pub fn coerce_f64(raw: &str) -> f64 {
    raw.trim().parse::<f64>().map(finite_or_zero).unwrap_or(0.0)
}

/// 代理商資料，欄位名稱沿用資料表 `agen` 的欄位
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    #[serde(rename = "kode", deserialize_with = "lenient::string")]
    pub code: String,
    #[serde(rename = "nama_agen", default)]
    pub name: Option<String>,
    #[serde(rename = "no_hp", default)]
    pub phone: Option<String>,
    #[serde(rename = "alamat_lengkap", default)]
    pub address: Option<String>,
    #[serde(rename = "kelurahan", default)]
    pub village: Option<String>,
    #[serde(rename = "kecamatan", default)]
    pub district: Option<String>,
    #[serde(rename = "kota", default)]
    pub city: Option<String>,
    #[serde(rename = "provinsi", default)]
    pub province: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_f64")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient::optional_f64")]
    pub longitude: Option<f64>,
}

impl Agent {
    pub fn location(&self) -> GeoPoint {
        GeoPoint::from_optional(self.latitude, self.longitude)
    }
}

/// 代理商加上查詢時計算的距離（公里）與實際使用的座標
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedAgent {
    #[serde(flatten)]
    pub agent: Agent,
    pub distance: f64,
    pub coordinate: GeoPoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionLevel {
    #[default]
    Villages,
    Districts,
    Regencies,
    Provinces,
}

impl RegionLevel {
    pub fn table(&self) -> &'static str {
        match self {
            RegionLevel::Villages => "villages",
            RegionLevel::Districts => "districts",
            RegionLevel::Regencies => "regencies",
            RegionLevel::Provinces => "provinces",
        }
    }
}

impl std::str::FromStr for RegionLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "villages" => Ok(RegionLevel::Villages),
            "districts" => Ok(RegionLevel::Districts),
            "regencies" => Ok(RegionLevel::Regencies),
            "provinces" => Ok(RegionLevel::Provinces),
            other => Err(format!(
                "Unknown region level '{}'. Valid levels: villages, districts, regencies, provinces",
                other
            )),
        }
    }
}

/// 行政區（村、區、縣市、省）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    #[serde(deserialize_with = "lenient::string")]
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "lenient::optional_f64")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient::optional_f64")]
    pub longitude: Option<f64>,
}

impl Region {
    pub fn location(&self) -> GeoPoint {
        GeoPoint::from_optional(self.latitude, self.longitude)
    }
}

/// A resolved reference point with its human-readable name.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedLocation {
    pub name: String,
    pub point: GeoPoint,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Province {
    #[serde(deserialize_with = "lenient::string")]
    pub province_id: String,
    pub province: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    #[serde(deserialize_with = "lenient::string")]
    pub city_id: String,
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub province_id: Option<String>,
    #[serde(default)]
    pub province: Option<String>,
    #[serde(rename = "type", default)]
    pub city_type: Option<String>,
    pub city_name: String,
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub postal_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityMatch {
    pub city_id: String,
    pub city_name: String,
    #[serde(rename = "type")]
    pub city_type: Option<String>,
    pub province: Option<String>,
}

/// 運費 API 回傳的單一物流商結果
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CarrierRates {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub costs: Vec<ServiceCost>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ServiceCost {
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub cost: Vec<CostValue>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CostValue {
    #[serde(default, deserialize_with = "lenient::optional_f64")]
    pub value: Option<f64>,
    #[serde(default)]
    pub etd: String,
    #[serde(default)]
    pub note: String,
}

/// One carrier request: origin, destination, weight in grams, courier code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostQuery {
    pub origin: String,
    pub destination: String,
    pub weight: u64,
    pub courier: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateQuote {
    pub carrier_code: String,
    pub carrier_name: String,
    pub service: String,
    pub description: String,
    pub cost: u64,
    pub etd: String,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationDetails {
    pub city_name: String,
    pub province: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationResult {
    pub origin: String,
    pub destination: String,
    pub weight_grams: u64,
    pub origin_details: LocationDetails,
    pub destination_details: LocationDetails,
    pub quotes: Vec<RateQuote>,
    pub fallback: bool,
}

/// 外部資料常有數字以字串表示的情況，在邊界統一寬鬆轉換
pub(crate) mod lenient {
    use super::*;
    use serde_json::Value;

    pub fn optional_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(match value {
            Some(Value::Number(n)) => n.as_f64().filter(|v| v.is_finite()),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            _ => None,
        })
    }

    pub fn string<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(serde::de::Error::custom(format!(
                "expected string or number, got {}",
                other
            ))),
        }
    }

    pub fn optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<Value>::deserialize(deserializer)? {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
    }
}
