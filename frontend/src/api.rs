//! Station API client.
//!
//! Every call is fire-once: no retries, no timeout, no caching. Apart from
//! the viewport query (whose failure the caller has to see) and the key
//! lookup, a failed call logs to the console and yields an empty value.

use gloo_net::http::Request;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::config::KAKAO_KEY_ENDPOINT;
use crate::error::ApiError;
use crate::provider::{Bounds, LatLng};
use crate::station::{Station, parse_coordinate, stations_from_payload};

pub const VEHICLE_CATEGORIES: [&str; 4] = ["정비소", "세차장", "타이어", "카센터"];

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Recommendation {
    #[serde(default)]
    pub recommend1: Option<String>,
    #[serde(default)]
    pub recommend2: Option<String>,
    #[serde(default)]
    pub recommend3: Option<String>,
}

impl Recommendation {
    pub fn items(&self) -> Vec<&str> {
        [&self.recommend1, &self.recommend2, &self.recommend3]
            .into_iter()
            .filter_map(|item| item.as_deref())
            .filter(|item| !item.trim().is_empty())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct StationStats {
    #[serde(default)]
    pub metrics: Map<String, Value>,
    #[serde(default)]
    pub relative: Map<String, Value>,
}

impl StationStats {
    /// Relative metrics that are actually numeric, in payload order.
    pub fn relative_values(&self) -> Vec<(String, f64)> {
        self.relative
            .iter()
            .filter_map(|(key, value)| value.as_f64().map(|number| (key.clone(), number)))
            .collect()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct AdminStats {
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub population: Option<f64>,
    #[serde(default)]
    pub traffic: Option<f64>,
    #[serde(default)]
    pub commercial_density: Option<f64>,
    #[serde(default)]
    pub tourism: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct LandPrice {
    #[serde(default)]
    pub announce_date: Option<String>,
    #[serde(default)]
    pub price_str: Option<String>,
    #[serde(default)]
    pub price: Option<Value>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub region_avg_price: Option<Value>,
    #[serde(default)]
    pub region_avg: Option<Value>,
    #[serde(default)]
    pub avg_price: Option<Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct LandUse {
    #[serde(default)]
    pub summary: Map<String, Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct LandInfo {
    #[serde(default)]
    pub pnu: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub clean_address: Option<String>,
    #[serde(default)]
    pub land_price: Option<LandPrice>,
    #[serde(default)]
    pub land_use: Option<LandUse>,
}

/// Nearby vehicle facilities, grouped by category.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VehicleInfra {
    pub categories: Vec<(String, Vec<LatLng>)>,
    pub total_count: Option<u64>,
}

impl VehicleInfra {
    pub fn from_value(value: &Value) -> Self {
        let categories = VEHICLE_CATEGORIES
            .iter()
            .map(|category| (category.to_string(), points(value.get(*category))))
            .collect();
        Self {
            categories,
            total_count: value.get("total_count").and_then(Value::as_u64),
        }
    }

    pub fn points(&self) -> Vec<LatLng> {
        self.categories
            .iter()
            .flat_map(|(_, points)| points.iter().copied())
            .collect()
    }

    pub fn counts(&self) -> Vec<(String, usize)> {
        self.categories
            .iter()
            .map(|(category, points)| (category.clone(), points.len()))
            .collect()
    }

    pub fn total(&self) -> usize {
        self.categories.iter().map(|(_, points)| points.len()).sum()
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct EvChargers {
    pub items: Vec<LatLng>,
    pub count: Option<u64>,
}

impl EvChargers {
    pub fn from_value(value: &Value) -> Self {
        Self {
            items: points(value.get("items")),
            count: value.get("count").and_then(Value::as_u64),
        }
    }

    pub fn display_count(&self) -> u64 {
        self.count.unwrap_or(self.items.len() as u64)
    }
}

fn points(value: Option<&Value>) -> Vec<LatLng> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let lat = parse_coordinate(item.get("lat")?)?;
                    let lng = parse_coordinate(item.get("lng")?)?;
                    Some(LatLng::new(lat, lng))
                })
                .collect()
        })
        .unwrap_or_default()
}

#[derive(Deserialize)]
struct KeyResponse {
    key: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ApiClient {
    base: String,
}

impl ApiClient {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn stations_in_bounds_url(&self, bounds: Bounds, limit: u32) -> String {
        format!(
            "{}/api/stations/map?lat1={}&lng1={}&lat2={}&lng2={}&limit={}",
            self.base,
            bounds.south_west.lat,
            bounds.south_west.lng,
            bounds.north_east.lat,
            bounds.north_east.lng,
            limit
        )
    }

    pub fn region_url(&self, code: &str, limit: u32) -> String {
        format!(
            "{}/api/stations/region/{}?limit={}",
            self.base,
            urlencoding::encode(code),
            limit
        )
    }

    pub fn search_url(&self, keyword: &str) -> String {
        format!(
            "{}/api/stations/search?query={}",
            self.base,
            urlencoding::encode(keyword)
        )
    }

    pub fn recommend_url(&self, station_id: &str) -> String {
        format!("{}/api/stations/{}/recommend", self.base, station_id)
    }

    pub fn ml_recommend_url(&self, station_id: &str) -> String {
        format!(
            "{}/api/ml-recommend?station_id={}",
            self.base,
            urlencoding::encode(station_id)
        )
    }

    pub fn stats_url(&self, station_id: &str) -> String {
        format!("{}/stations/{}/stats", self.base, station_id)
    }

    pub fn station_resource_url(&self, station_id: &str, resource: &str) -> String {
        format!("{}/api/stations/{}/{}", self.base, station_id, resource)
    }

    pub fn report_url(&self, station_id: &str) -> String {
        self.station_resource_url(station_id, "report")
    }

    /// Stations inside the viewport. Unlike the other calls this one fails
    /// loudly so the caller can skip rendering.
    pub async fn fetch_stations_in_bounds(
        &self,
        bounds: Bounds,
        limit: u32,
    ) -> Result<Vec<Station>, ApiError> {
        let url = self.stations_in_bounds_url(bounds, limit);
        web_sys::console::log_1(&format!("fetching stations: {url}").into());
        let payload = get_json(&url).await?;
        match payload.get("items") {
            Some(Value::Array(_)) => Ok(stations_from_payload(&payload)),
            _ => Err(ApiError::Parse("response has no items".to_string())),
        }
    }

    pub async fn fetch_stations_by_region(&self, code: &str, limit: u32) -> Vec<Station> {
        match get_json(&self.region_url(code, limit)).await {
            Ok(payload) => stations_from_payload(&payload),
            Err(err) => {
                warn(&format!("region query for {code} failed: {err}"));
                Vec::new()
            }
        }
    }

    /// Non-OK status yields no results; transport failures are returned so
    /// the search box can tell the user.
    pub async fn search_stations(&self, keyword: &str) -> Result<Vec<Station>, ApiError> {
        match get_json(&self.search_url(keyword)).await {
            Ok(payload) => Ok(stations_from_payload(&payload)),
            Err(ApiError::Status { status, .. }) => {
                warn(&format!("search failed with status {status}"));
                Ok(Vec::new())
            }
            Err(err) => Err(err),
        }
    }

    pub async fn fetch_recommendation(&self, station_id: &str) -> Recommendation {
        get_or_default(&self.recommend_url(station_id), "recommendation").await
    }

    pub async fn fetch_ml_recommendation(&self, station_id: &str) -> Recommendation {
        get_or_default(&self.ml_recommend_url(station_id), "ml recommendation").await
    }

    pub async fn fetch_stats(&self, station_id: &str) -> StationStats {
        if station_id.is_empty() {
            return StationStats::default();
        }
        get_or_default(&self.stats_url(station_id), "stats").await
    }

    pub async fn fetch_admin_stats(&self, station_id: &str) -> Option<AdminStats> {
        get_optional(&self.station_resource_url(station_id, "admin"), "admin stats").await
    }

    pub async fn fetch_vehicle(&self, station_id: &str) -> Option<VehicleInfra> {
        let url = self.station_resource_url(station_id, "vehicle");
        get_optional::<Value>(&url, "vehicle infrastructure")
            .await
            .map(|value| VehicleInfra::from_value(&value))
    }

    pub async fn fetch_ev(&self, station_id: &str) -> Option<EvChargers> {
        let url = self.station_resource_url(station_id, "ev");
        get_optional::<Value>(&url, "ev chargers")
            .await
            .map(|value| EvChargers::from_value(&value))
    }

    pub async fn fetch_land(&self, station_id: &str) -> Option<LandInfo> {
        get_optional(&self.station_resource_url(station_id, "land"), "land parcel").await
    }
}

/// Asks the hosting server for the map key.
pub async fn fetch_kakao_key() -> Result<String, ApiError> {
    let payload = get_json(KAKAO_KEY_ENDPOINT).await?;
    serde_json::from_value::<KeyResponse>(payload)
        .map(|response| response.key)
        .map_err(|err| ApiError::Parse(err.to_string()))
}

async fn get_json(url: &str) -> Result<Value, ApiError> {
    let response = Request::get(url)
        .send()
        .await
        .map_err(|err| ApiError::Network(err.to_string()))?;

    if !response.ok() {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());
        return Err(ApiError::Status { status, body });
    }

    response
        .json::<Value>()
        .await
        .map_err(|err| ApiError::Parse(err.to_string()))
}

async fn get_optional<T: DeserializeOwned>(url: &str, what: &str) -> Option<T> {
    let payload = match get_json(url).await {
        Ok(payload) => payload,
        Err(err) => {
            warn(&format!("{what} request failed: {err}"));
            return None;
        }
    };
    match serde_json::from_value(payload) {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            warn(&format!("{what} response parse failed: {err}"));
            None
        }
    }
}

async fn get_or_default<T: DeserializeOwned + Default>(url: &str, what: &str) -> T {
    get_optional(url, what).await.unwrap_or_default()
}

fn warn(message: &str) {
    web_sys::console::warn_1(&message.into());
}
