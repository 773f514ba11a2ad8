//! Chart.js charts, one live instance per canvas slot.
//!
//! Chart configs are built as JSON and handed to a [`ChartBackend`]. The
//! registry destroys whatever chart occupies a slot before drawing a new
//! one, so canvases never accumulate instances.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::{Value, json};
use wasm_bindgen::prelude::*;

use crate::api::{AdminStats, StationStats, VehicleInfra};
use crate::format::{format_percent, format_won_per_m2, metric_label};
use crate::js;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChartSlot {
    MetricsBar,
    MetricsRadar,
    LandPrice,
    LandCompare,
    LandUsage,
    AdminRadar,
    AdminDoughnut,
    VehicleDoughnut,
}

impl ChartSlot {
    pub fn canvas_id(self) -> &'static str {
        match self {
            ChartSlot::MetricsBar => "metrics-chart",
            ChartSlot::MetricsRadar => "metrics-radar",
            ChartSlot::LandPrice => "land-price-bar",
            ChartSlot::LandCompare => "land-price-compare",
            ChartSlot::LandUsage => "land-usage-donut",
            ChartSlot::AdminRadar => "admin-radar",
            ChartSlot::AdminDoughnut => "admin-donut",
            ChartSlot::VehicleDoughnut => "vehicle-donut",
        }
    }
}

/// Tooltip label formatting that needs a JS callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TooltipFormat {
    Percent,
    WonPerM2,
}

impl TooltipFormat {
    pub fn label(self, raw: f64) -> String {
        match self {
            TooltipFormat::Percent => format_percent(raw),
            TooltipFormat::WonPerM2 => format_won_per_m2(raw),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChartSpec {
    pub config: Value,
    pub tooltip: Option<TooltipFormat>,
}

impl ChartSpec {
    pub fn kind(&self) -> &str {
        self.config["type"].as_str().unwrap_or_default()
    }

    pub fn data(&self) -> Vec<f64> {
        self.config["data"]["datasets"][0]["data"]
            .as_array()
            .map(|values| values.iter().filter_map(Value::as_f64).collect())
            .unwrap_or_default()
    }

    pub fn labels(&self) -> Vec<String> {
        self.config["data"]["labels"]
            .as_array()
            .map(|labels| {
                labels
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

const USAGE_COLORS: [&str; 4] = ["#2563EB", "#10B981", "#6B7280", "#9CA3AF"];
const ADMIN_LABELS: [&str; 4] = ["인구", "교통량", "상권 밀집도", "관광지수"];

fn single_bar(labels: Value, label: &str, data: Value, y_title: Option<&str>, tooltip: TooltipFormat) -> ChartSpec {
    let mut y = json!({ "beginAtZero": true });
    if let Some(title) = y_title {
        y["title"] = json!({ "display": true, "text": title });
    }
    ChartSpec {
        config: json!({
            "type": "bar",
            "data": {
                "labels": labels,
                "datasets": [{ "label": label, "data": data, "borderWidth": 1.5 }]
            },
            "options": {
                "responsive": true,
                "plugins": { "legend": { "display": false }, "tooltip": { "callbacks": {} } },
                "scales": { "y": y }
            }
        }),
        tooltip: Some(tooltip),
    }
}

fn doughnut(labels: Value, data: Value, colors: Option<&[&str]>) -> ChartSpec {
    let mut dataset = json!({ "data": data });
    if let Some(colors) = colors {
        dataset["backgroundColor"] = json!(colors);
    }
    ChartSpec {
        config: json!({
            "type": "doughnut",
            "data": { "labels": labels, "datasets": [dataset] },
            "options": { "responsive": true, "plugins": { "legend": { "position": "bottom" } } }
        }),
        tooltip: None,
    }
}

/// Relative metrics (percent against the regional average) as bars.
pub fn stats_bar(stats: &StationStats) -> Option<ChartSpec> {
    let relative = stats.relative_values();
    if relative.is_empty() {
        return None;
    }
    let labels: Vec<&str> = relative.iter().map(|(key, _)| metric_label(key)).collect();
    let values: Vec<f64> = relative.iter().map(|(_, value)| *value).collect();
    Some(single_bar(
        json!(labels),
        "지역 평균 대비 상대값(%)",
        json!(values),
        Some("% (권역 평균 대비 증감률)"),
        TooltipFormat::Percent,
    ))
}

pub fn stats_radar(stats: &StationStats) -> Option<ChartSpec> {
    let relative = stats.relative_values();
    if relative.is_empty() {
        return None;
    }
    let labels: Vec<&str> = relative.iter().map(|(key, _)| metric_label(key)).collect();
    let values: Vec<f64> = relative.iter().map(|(_, value)| *value).collect();
    let min = values.iter().copied().fold(0.0, f64::min);
    let max = values.iter().copied().fold(0.0, f64::max);
    Some(ChartSpec {
        config: json!({
            "type": "radar",
            "data": {
                "labels": labels,
                "datasets": [{ "label": "지표 프로필", "data": values }]
            },
            "options": {
                "responsive": true,
                "plugins": { "legend": { "display": false } },
                "scales": {
                    "r": {
                        "beginAtZero": true,
                        "angleLines": { "display": true },
                        "suggestedMin": min,
                        "suggestedMax": max
                    }
                }
            }
        }),
        tooltip: None,
    })
}

pub fn land_price_bar(price: f64) -> ChartSpec {
    single_bar(json!(["이 필지"]), "공시지가", json!([price]), None, TooltipFormat::WonPerM2)
}

pub fn land_compare_bar(price: f64, region_average: f64) -> ChartSpec {
    single_bar(
        json!(["이 필지", "행정동 평균"]),
        "공시지가 비교",
        json!([price, region_average]),
        None,
        TooltipFormat::WonPerM2,
    )
}

pub fn land_usage_doughnut(counts: &[(String, usize)]) -> Option<ChartSpec> {
    if counts.is_empty() {
        return None;
    }
    let labels: Vec<&str> = counts.iter().map(|(name, _)| name.as_str()).collect();
    let values: Vec<usize> = counts.iter().map(|(_, count)| *count).collect();
    Some(doughnut(json!(labels), json!(values), Some(&USAGE_COLORS)))
}

fn admin_values(stats: &AdminStats) -> [f64; 4] {
    [stats.population, stats.traffic, stats.commercial_density, stats.tourism]
        .map(|value| value.filter(|v| v.is_finite()).unwrap_or(0.0))
}

/// Admin-area indicators scaled by their maximum so they share one axis.
pub fn admin_radar(stats: &AdminStats, region_label: &str) -> ChartSpec {
    let values = admin_values(stats);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let max = if max > 0.0 { max } else { 1.0 };
    let normalized = values.map(|value| value / max);
    ChartSpec {
        config: json!({
            "type": "radar",
            "data": {
                "labels": ADMIN_LABELS,
                "datasets": [{ "label": region_label, "data": normalized }]
            },
            "options": {
                "scales": { "r": { "beginAtZero": true, "max": 1 } },
                "plugins": { "legend": { "display": false } }
            }
        }),
        tooltip: None,
    }
}

/// Same indicators as a composition; empty slices stay visible as a sliver.
pub fn admin_doughnut(stats: &AdminStats) -> ChartSpec {
    let values = admin_values(stats).map(|value| if value <= 0.0 { 0.1 } else { value });
    doughnut(json!(ADMIN_LABELS), json!(values), None)
}

pub fn vehicle_doughnut(infra: &VehicleInfra) -> ChartSpec {
    let counts = infra.counts();
    let labels: Vec<&str> = counts.iter().map(|(name, _)| name.as_str()).collect();
    let values: Vec<usize> = counts.iter().map(|(_, count)| *count).collect();
    doughnut(json!(labels), json!(values), None)
}

pub trait ChartBackend {
    type Handle;

    /// Draws into the canvas with the given id; `None` if the canvas or the
    /// chart library is missing.
    fn create(&self, canvas_id: &str, spec: &ChartSpec) -> Option<Self::Handle>;
    fn destroy(&self, handle: Self::Handle);
}

pub struct ChartRegistry<B: ChartBackend> {
    backend: B,
    live: HashMap<ChartSlot, B::Handle>,
}

impl<B: ChartBackend> ChartRegistry<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            live: HashMap::new(),
        }
    }

    pub fn draw(&mut self, slot: ChartSlot, spec: &ChartSpec) -> bool {
        self.clear(slot);
        match self.backend.create(slot.canvas_id(), spec) {
            Some(handle) => {
                self.live.insert(slot, handle);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self, slot: ChartSlot) {
        if let Some(handle) = self.live.remove(&slot) {
            self.backend.destroy(handle);
        }
    }

    pub fn clear_all(&mut self) {
        for (_, handle) in self.live.drain() {
            self.backend.destroy(handle);
        }
    }

    pub fn is_live(&self, slot: ChartSlot) -> bool {
        self.live.contains_key(&slot)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

/// The page's global `Chart` constructor.
pub struct ChartJs;

pub struct ChartJsHandle {
    chart: JsValue,
    _tooltip: Option<Closure<dyn Fn(JsValue) -> JsValue>>,
}

impl ChartBackend for ChartJs {
    type Handle = ChartJsHandle;

    fn create(&self, canvas_id: &str, spec: &ChartSpec) -> Option<ChartJsHandle> {
        let document = web_sys::window()?.document()?;
        let canvas = document.get_element_by_id(canvas_id)?;
        let config = spec
            .config
            .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
            .ok()?;

        let tooltip = spec.tooltip.map(|format| {
            Closure::<dyn Fn(JsValue) -> JsValue>::new(move |context: JsValue| {
                let raw = js::number(&context, "raw").unwrap_or(0.0);
                JsValue::from_str(&format.label(raw))
            })
        });
        if let Some(callback) = &tooltip {
            let callbacks = js::get_path(&config, &["options", "plugins", "tooltip", "callbacks"]).ok()?;
            js_sys::Reflect::set(&callbacks, &JsValue::from_str("label"), callback.as_ref()).ok()?;
        }

        let chart = js::construct(&js_sys::global(), "Chart", &[canvas.into(), config]);
        match chart {
            Ok(chart) => Some(ChartJsHandle {
                chart,
                _tooltip: tooltip,
            }),
            Err(err) => {
                web_sys::console::error_2(&format!("chart {canvas_id} failed").into(), &err);
                None
            }
        }
    }

    fn destroy(&self, handle: ChartJsHandle) {
        js::call_method(&handle.chart, "destroy", &[]).ok();
    }
}


#[cfg(test)]
mod tests {
    use super::mock::MockCharts;
    use super::*;

    fn stats() -> StationStats {
        serde_json::from_value(json!({
            "metrics": {"traffic": 15234.0},
            "relative": {"traffic": 12.5, "tourism": -30.0, "note": "n/a"}
        }))
        .unwrap()
    }

    #[test]
    fn redraw_destroys_the_previous_instance() {
        let mut registry = ChartRegistry::new(MockCharts::default());
        let spec = land_price_bar(1_000_000.0);
        assert!(registry.draw(ChartSlot::LandPrice, &spec));
        assert!(registry.draw(ChartSlot::LandPrice, &spec));
        assert_eq!(registry.backend().live.borrow().len(), 1);
        assert_eq!(*registry.backend().destroyed.borrow(), vec![1]);
    }

    #[test]
    fn slots_are_independent_until_cleared() {
        let mut registry = ChartRegistry::new(MockCharts::default());
        registry.draw(ChartSlot::MetricsBar, &stats_bar(&stats()).unwrap());
        registry.draw(ChartSlot::MetricsRadar, &stats_radar(&stats()).unwrap());
        assert_eq!(registry.live_count(), 2);
        registry.clear(ChartSlot::MetricsBar);
        assert!(!registry.is_live(ChartSlot::MetricsBar));
        registry.clear_all();
        assert_eq!(registry.live_count(), 0);
        assert!(registry.backend().live.borrow().is_empty());
    }

    #[test]
    fn stats_charts_use_numeric_relative_values() {
        let bar = stats_bar(&stats()).unwrap();
        assert_eq!(bar.kind(), "bar");
        assert_eq!(bar.labels(), vec!["일교통량(AADT)", "관광지수(행정동)"]);
        assert_eq!(bar.data(), vec![12.5, -30.0]);
        assert_eq!(bar.tooltip, Some(TooltipFormat::Percent));

        let radar = stats_radar(&stats()).unwrap();
        assert_eq!(radar.config["options"]["scales"]["r"]["suggestedMin"], json!(-30.0));
        assert_eq!(radar.config["options"]["scales"]["r"]["suggestedMax"], json!(12.5));

        assert!(stats_bar(&StationStats::default()).is_none());
    }

    #[test]
    fn admin_radar_is_normalized_by_max() {
        let admin = AdminStats {
            population: Some(20_000.0),
            traffic: Some(5_000.0),
            commercial_density: None,
            tourism: Some(0.0),
            ..AdminStats::default()
        };
        assert_eq!(admin_radar(&admin, "행정동").data(), vec![1.0, 0.25, 0.0, 0.0]);
        assert_eq!(admin_doughnut(&admin).data(), vec![20_000.0, 5_000.0, 0.1, 0.1]);
    }

    #[test]
    fn admin_radar_with_no_values_stays_at_zero() {
        let radar = admin_radar(&AdminStats::default(), "행정동");
        assert_eq!(radar.data(), vec![0.0; 4]);
    }

    #[test]
    fn land_charts() {
        let compare = land_compare_bar(1_200_000.0, 900_000.0);
        assert_eq!(compare.labels(), vec!["이 필지", "행정동 평균"]);
        assert_eq!(compare.tooltip.map(|format| format.label(1_200_000.0)), Some("1,200,000 원/㎡".to_string()));

        let usage = land_usage_doughnut(&[("도시지역".to_string(), 2)]).unwrap();
        assert_eq!(usage.kind(), "doughnut");
        assert_eq!(usage.config["data"]["datasets"][0]["backgroundColor"][0], json!("#2563EB"));
        assert!(land_usage_doughnut(&[]).is_none());
    }

    #[test]
    fn vehicle_doughnut_counts_each_category() {
        let infra = VehicleInfra::from_value(&json!({
            "정비소": [{"lat": 36.0, "lng": 127.0}, {"lat": 36.1, "lng": 127.1}],
            "타이어": [{"lat": 36.2, "lng": 127.2}]
        }));
        let chart = vehicle_doughnut(&infra);
        assert_eq!(chart.labels(), vec!["정비소", "세차장", "타이어", "카센터"]);
        assert_eq!(chart.data(), vec![2.0, 0.0, 1.0, 0.0]);
    }
}
