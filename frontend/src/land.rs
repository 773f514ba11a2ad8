//! Derived values for the parcel panel.

use serde_json::{Map, Value};

use crate::api::{LandPrice, LandUse};

const USAGE_KEYS: &[&str] = &["용도지역", "지역지구", "도시지역"];
const UNNAMED_USE: &str = "기타";

/// Official land price in won per square metre.
pub fn price(land: &LandPrice) -> Option<f64> {
    match &land.price {
        Some(Value::Number(number)) => return number.as_f64(),
        Some(Value::String(text)) => {
            if let Ok(parsed) = text.trim().parse::<f64>() {
                return Some(parsed);
            }
        }
        _ => {}
    }
    land.price_str.as_deref().and_then(digits_only)
}

/// Average price of the surrounding area, from whichever field the API
/// filled in.
pub fn region_average(land: &LandPrice) -> Option<f64> {
    [&land.region_avg_price, &land.region_avg, &land.avg_price]
        .into_iter()
        .flatten()
        .find_map(|value| match value {
            Value::Number(number) => number.as_f64().filter(|n| *n != 0.0),
            Value::String(text) if !text.is_empty() => digits_only(text),
            _ => None,
        })
}

fn digits_only(text: &str) -> Option<f64> {
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        None
    } else {
        digits.parse().ok()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct UseItem {
    pub name: Option<String>,
    pub data_date: Option<String>,
}

fn items(category: &Value) -> Vec<UseItem> {
    category
        .as_array()
        .map(|entries| {
            entries
                .iter()
                .map(|entry| UseItem {
                    name: text_field(entry, "name"),
                    data_date: text_field(entry, "data_date"),
                })
                .collect()
        })
        .unwrap_or_default()
}

fn text_field(entry: &Value, key: &str) -> Option<String> {
    entry
        .get(key)
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

fn all_items(summary: &Map<String, Value>) -> impl Iterator<Item = UseItem> + '_ {
    summary.values().flat_map(items)
}

/// Name of the first use in the first category, or `-`.
pub fn main_use(land_use: &LandUse) -> String {
    land_use
        .summary
        .values()
        .next()
        .and_then(|category| items(category).into_iter().next())
        .and_then(|item| item.name)
        .unwrap_or_else(|| "-".to_string())
}

/// Every use as `name (date)`, in API order.
pub fn use_list(land_use: &LandUse) -> Vec<String> {
    all_items(&land_use.summary)
        .map(|item| {
            let name = item.name.unwrap_or_default();
            match item.data_date {
                Some(date) => format!("{name} ({date})"),
                None => name,
            }
        })
        .collect()
}

/// Counts per zoning name for the usage doughnut. The zoning category is
/// preferred; without one every named use counts.
pub fn usage_counts(land_use: &LandUse) -> Vec<(String, usize)> {
    let preferred = USAGE_KEYS
        .iter()
        .filter_map(|key| land_use.summary.get(*key))
        .find(|category| category.as_array().is_some_and(|entries| !entries.is_empty()));
    let names: Vec<String> = match preferred {
        Some(category) => items(category)
            .into_iter()
            .map(|item| item.name.unwrap_or_else(|| UNNAMED_USE.to_string()))
            .collect(),
        None => all_items(&land_use.summary).filter_map(|item| item.name).collect(),
    };
    count_in_order(names)
}

fn count_in_order(names: impl IntoIterator<Item = String>) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for name in names {
        match counts.iter_mut().find(|(seen, _)| *seen == name) {
            Some((_, count)) => *count += 1,
            None => counts.push((name, 1)),
        }
    }
    counts
}

#[derive(Clone, Debug, PartialEq)]
pub struct CloudWord {
    pub text: String,
    pub font_px: f64,
    pub opacity: f64,
}

/// Tag cloud of land uses, larger and darker the more often a use occurs.
pub fn word_cloud(land_use: &LandUse) -> Vec<CloudWord> {
    let counts = count_in_order(
        all_items(&land_use.summary).map(|item| item.name.unwrap_or_else(|| UNNAMED_USE.to_string())),
    );
    let Some(max) = counts.iter().map(|(_, count)| *count).max() else {
        return Vec::new();
    };
    let min = counts.iter().map(|(_, count)| *count).min().unwrap_or(max);
    counts
        .into_iter()
        .map(|(text, count)| {
            let t = if max == min {
                0.5
            } else {
                (count - min) as f64 / (max - min) as f64
            };
            CloudWord {
                text,
                font_px: 10.0 + t * 18.0,
                opacity: 0.7 + t * 0.3,
            }
        })
        .collect()
}
