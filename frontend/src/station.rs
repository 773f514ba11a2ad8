//! Station records as delivered by the API.
//!
//! Records come in two shapes: flat objects keyed by the Korean column
//! names of the public registry (`위도`, `경도`, `상호`, ...) and GeoJSON
//! features whose geometry carries `[lng, lat]`. Both normalize into
//! [`Station`]; a record without usable coordinates is dropped.

use serde_json::Value;

use crate::config::STATION_IMAGE_BASE;
use crate::provider::LatLng;

const LAT_KEYS: &[&str] = &["위도", "lat"];
const LNG_KEYS: &[&str] = &["경도", "lng"];
const NAME_KEYS: &[&str] = &["상호", "name"];
const ADDRESS_KEYS: &[&str] = &["정제주소", "주소", "addr", "address"];
const STATUS_KEYS: &[&str] = &["상태", "status"];
const IMAGE_KEYS: &[&str] = &["imgUrl", "img_url", "image_url"];
const YEAR_KEYS: &[&str] = &["year", "연도"];

const UNNAMED: &str = "(이름없음)";
const NO_ADDRESS: &str = "주소정보 없음";
const NO_STATUS: &str = "정보 없음";

#[derive(Clone, Debug, PartialEq)]
pub struct Station {
    pub lat: f64,
    pub lng: f64,
    pub name: String,
    pub address: String,
    pub status: String,
    pub image_url: String,
    pub year: Option<String>,
}

impl Station {
    /// Builds a station from a flat API record.
    pub fn from_record(record: &Value) -> Option<Self> {
        let lat = first_coordinate(record, LAT_KEYS)?;
        let lng = first_coordinate(record, LNG_KEYS)?;
        Some(Self::with_fields(lat, lng, record))
    }

    /// Builds a station from a GeoJSON point feature.
    pub fn from_feature(feature: &Value) -> Option<Self> {
        let coordinates = feature.pointer("/geometry/coordinates")?.as_array()?;
        let lng = parse_coordinate(coordinates.first()?)?;
        let lat = parse_coordinate(coordinates.get(1)?)?;
        let empty = Value::Object(Default::default());
        let properties = feature.get("properties").unwrap_or(&empty);
        Some(Self::with_fields(lat, lng, properties))
    }

    fn with_fields(lat: f64, lng: f64, fields: &Value) -> Self {
        let name = first_text(fields, NAME_KEYS).unwrap_or_else(|| UNNAMED.to_string());
        let address = first_text(fields, ADDRESS_KEYS).unwrap_or_else(|| NO_ADDRESS.to_string());
        let status = first_text(fields, STATUS_KEYS).unwrap_or_else(|| NO_STATUS.to_string());
        let image_url = first_text(fields, IMAGE_KEYS).unwrap_or_else(|| station_image_url(&address));
        let year = first_text(fields, YEAR_KEYS);
        Self {
            lat,
            lng,
            name,
            address,
            status,
            image_url,
            year,
        }
    }

    pub fn id(&self) -> String {
        station_id(self.lat, self.lng)
    }

    pub fn position(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }

    /// Closed or suspended stations get a different badge colour.
    pub fn is_closed(&self) -> bool {
        self.status.contains("폐업") || self.status.contains("휴업")
    }

    pub fn status_line(&self) -> String {
        match &self.year {
            Some(year) => format!("{} ({} ~ )", self.status, year),
            None => self.status.clone(),
        }
    }
}

/// Station identifier shared with the API: coordinates scaled by 1e6 and
/// rounded half-up, joined with an underscore.
pub fn station_id(lat: f64, lng: f64) -> String {
    format!("{}_{}", round_micro(lat), round_micro(lng))
}

fn round_micro(value: f64) -> i64 {
    (value * 1_000_000.0 + 0.5).floor() as i64
}

pub fn station_image_url(address: &str) -> String {
    format!("{}/{}.jpg", STATION_IMAGE_BASE, urlencoding::encode(address))
}

pub fn default_image_url() -> String {
    format!("{}/default.jpg", STATION_IMAGE_BASE)
}

/// Normalizes any station payload the API returns: `{items: [...]}`,
/// `{features: [...]}` or a bare array of either shape.
pub fn stations_from_payload(payload: &Value) -> Vec<Station> {
    let entries: &[Value] = match payload {
        Value::Array(entries) => entries.as_slice(),
        Value::Object(object) => match object.get("items").or_else(|| object.get("features")) {
            Some(Value::Array(entries)) => entries.as_slice(),
            _ => &[],
        },
        _ => &[],
    };
    entries
        .iter()
        .filter_map(|entry| {
            if entry.get("geometry").is_some() {
                Station::from_feature(entry)
            } else {
                Station::from_record(entry)
            }
        })
        .collect()
}

fn first_coordinate(fields: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .filter_map(|key| fields.get(*key))
        .find_map(parse_coordinate)
}

fn first_text(fields: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().filter_map(|key| fields.get(*key)).find_map(|value| match value {
        Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    })
}

/// Accepts numbers and numeric strings; a string may carry trailing
/// garbage after the number, which is ignored.
pub fn parse_coordinate(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => parse_leading_float(text),
        _ => None,
    }?;
    parsed.is_finite().then_some(parsed)
}

fn parse_leading_float(text: &str) -> Option<f64> {
    let trimmed = text.trim_start();
    let candidate_len = trimmed
        .char_indices()
        .take_while(|(_, c)| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
        .map(|(index, c)| index + c.len_utf8())
        .last()?;
    (1..=candidate_len)
        .rev()
        .find_map(|len| trimmed[..len].parse::<f64>().ok())
}
