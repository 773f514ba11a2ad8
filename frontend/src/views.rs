//! Panel bodies and search widgets rendered from [`ViewState`].
//!
//! [`ViewState`]: crate::controller::ViewState

use web_sys::HtmlImageElement;
use yew::prelude::*;

use crate::api::{AdminStats, LandInfo};
use crate::charts::ChartSlot;
use crate::controller::{DetailView, FeatureView, ParcelView, RoadviewStatus, StationDetail};
use crate::format::{format_grouped, format_metric_value, metric_label};
use crate::land;
use crate::panels::Panel;
use crate::region::{RegionEntry, RegionLevel};
use crate::station::{Station, default_image_url};

const LAND_NOTICE: &str =
    "※ 본 서비스에서 제공하는 부동산행정자료는 단순 열람조회용이며 법적 효력은 없습니다.";
const NO_AVERAGE: &str = "※ 지역 평균 공시지가 정보가 없어 비교 차트는 단일 값만 표시됩니다.";
const RELATIVE_NOTE: &str =
    "※ 모든 지표는 해당 지점이 속한 권역 평균(17개 시·도)을 기준(0%)으로 한 상대적 증감률(%)입니다.";

fn canvas(slot: ChartSlot) -> Html {
    html! { <canvas id={slot.canvas_id()}></canvas> }
}

fn or_dash(value: Option<&str>) -> String {
    value
        .filter(|text| !text.trim().is_empty())
        .unwrap_or("-")
        .to_string()
}

/// Side panel frame with a title bar and close button.
pub fn panel_shell(panel: Panel, class: &'static str, on_close: Callback<MouseEvent>, body: Html) -> Html {
    html! {
        <aside class={class} id={format!("{}-panel", panel_key(panel))}>
            <header class="side-panel__header">
                <h2>{panel.title()}</h2>
                <button class="side-panel__close" onclick={on_close}>{"✕"}</button>
            </header>
            <div class="side-panel__body">{body}</div>
        </aside>
    }
}

pub fn panel_key(panel: Panel) -> &'static str {
    match panel {
        Panel::List => "list",
        Panel::Feature => "feature",
        Panel::Parcel => "parcel",
        Panel::Guide => "guide",
    }
}

pub fn station_detail(detail: &DetailView) -> Html {
    match detail {
        DetailView::Empty => html! {
            <p class="is-muted">{"지도에서 주유소를 선택하세요."}</p>
        },
        DetailView::Loading(station) => html! {
            <article class="station-detail">
                {station_summary(station)}
                <p class="is-muted">{"지표를 불러오는 중입니다..."}</p>
            </article>
        },
        DetailView::Ready(detail) => ready_detail(detail),
    }
}

fn station_summary(station: &Station) -> Html {
    let fallback = Callback::from(|event: Event| {
        if let Some(image) = event.target_dyn_into::<HtmlImageElement>() {
            let default = default_image_url();
            if image.src() != default {
                image.set_src(&default);
            }
        }
    });
    html! {
        <>
            <div class="station-detail__image">
                <img src={station.image_url.clone()} alt={station.name.clone()} onerror={fallback} />
            </div>
            <p class="station-detail__name">{format!("주유소명 : {}", station.name)}</p>
            <p class="station-detail__addr">{format!("주소 : {}", station.address)}</p>
            <p class="station-detail__status">{format!("상태 : {}", station.status_line())}</p>
        </>
    }
}

fn ready_detail(detail: &StationDetail) -> Html {
    let items = detail.recommendation.items();
    let recommendation = if items.is_empty() {
        html! { <>{"추천 데이터가 없습니다."}</> }
    } else {
        html! {
            for items.iter().zip(["①", "②", "③"]).map(|(item, mark)| html! {
                <span class="recommendation">{format!("{mark} {item}")}<br /></span>
            })
        }
    };

    html! {
        <article class="station-detail">
            {station_summary(&detail.station)}
            <section class="station-detail__section">
                <h3 class="station-detail__section-title">{"지표 요약"}</h3>
                <dl class="metric-rows">
                    { for detail.stats.metrics.iter().map(|(key, value)| html! {
                        <>
                            <dt>{metric_label(key)}</dt>
                            <dd>{format_metric_value(value)}</dd>
                        </>
                    }) }
                </dl>
                <div class="station-detail__metrics">
                    {canvas(ChartSlot::MetricsBar)}
                    <div class="metrics-extra-charts">{canvas(ChartSlot::MetricsRadar)}</div>
                    <p class="metric-description">{RELATIVE_NOTE}</p>
                </div>
            </section>
            <section class="station-detail__section">
                <h3 class="station-detail__section-title">{"추천 활용방안"}</h3>
                <p class="station-detail__section-body">{recommendation}</p>
            </section>
            <div class="report-link">
                <a href={detail.report_url.clone()} target="_blank" rel="noreferrer" class="btn-view-report">
                    {"📄 상세 분석 보고서 보기"}
                </a>
            </div>
        </article>
    }
}

pub fn parcel(view: &ParcelView) -> Html {
    match view {
        ParcelView::Idle => html! {},
        ParcelView::NeedsSelection => html! { <p class="is-muted">{"⚠ 주유소를 먼저 선택하세요."}</p> },
        ParcelView::Loading => html! { <p class="is-muted">{"필지 정보를 불러오는 중입니다..."}</p> },
        ParcelView::Failed => html! { <p class="is-muted">{"⚠ 필지 정보를 불러올 수 없습니다."}</p> },
        ParcelView::Ready(info) => land_info(info),
    }
}

fn land_info(info: &LandInfo) -> Html {
    let price = info.land_price.clone().unwrap_or_default();
    let land_use = info.land_use.clone().unwrap_or_default();
    let main_use = land::main_use(&land_use);
    let uses = land::use_list(&land_use);
    let compare_note = match (land::price(&price), land::region_average(&price)) {
        (Some(_), None) => NO_AVERAGE,
        _ => "",
    };
    let address = info.clean_address.as_deref().or(info.address.as_deref());

    html! {
        <>
            <section class="land-section">
                <h2 class="land-title">{"개별공시지가"}</h2>
                <table class="plain-table-2col">
                    <tr><th>{"공시일자"}</th><th>{"공시가격"}</th></tr>
                    <tr>
                        <td>{or_dash(price.announce_date.as_deref())}</td>
                        <td>{or_dash(price.price_str.as_deref())}</td>
                    </tr>
                </table>
                <div class="land-chart-grid">
                    <div class="land-chart-item">
                        <h3 class="land-chart-subtitle">{"공시지가"}</h3>
                        {canvas(ChartSlot::LandPrice)}
                    </div>
                    <div class="land-chart-item">
                        <h3 class="land-chart-subtitle">{"권역 평균과 비교"}</h3>
                        {canvas(ChartSlot::LandCompare)}
                        <p class="land-chart-msg">{compare_note}</p>
                    </div>
                </div>
            </section>
            <section class="land-section">
                <h2 class="land-title">{"필지 기본 정보"}</h2>
                <table class="plain-table-4col">
                    <tr><th>{"PNU"}</th><th>{"주소"}</th><th>{"대표 용도지역"}</th><th>{"분류"}</th></tr>
                    <tr>
                        <td>{or_dash(info.pnu.as_deref())}</td>
                        <td>{or_dash(address)}</td>
                        <td>{main_use.clone()}</td>
                        <td>{or_dash(price.kind.as_deref())}</td>
                    </tr>
                </table>
                <div class="land-usage-text-card">
                    <p>
                        <strong>{"이 필지는"}</strong>{" "}
                        <span class="land-usage-highlight">{main_use}</span>
                        {"에 속하는 필지입니다."}
                    </p>
                </div>
            </section>
            <section class="land-section">
                <h2 class="land-title">{"토지이용계획"}</h2>
                <div class="plain-box">
                    { if uses.is_empty() { "-".to_string() } else { uses.join(", ") } }
                </div>
                <div class="land-chart-grid">
                    <div class="land-chart-item">
                        <h3 class="land-chart-subtitle">{"용도지역 구성"}</h3>
                        {canvas(ChartSlot::LandUsage)}
                    </div>
                </div>
                <div class="land-wordcloud">
                    { for land::word_cloud(&land_use).into_iter().map(|word| html! {
                        <span
                            class="land-word"
                            style={format!("font-size:{:.1}px;opacity:{:.2}", word.font_px, word.opacity)}
                        >
                            {word.text}
                        </span>
                    }) }
                </div>
            </section>
            <p class="land-notice">{LAND_NOTICE}</p>
        </>
    }
}

fn kpi(label: &str, value: String, sublabel: String) -> Html {
    html! {
        <div class="kpi-card">
            <div class="kpi-label">{label}</div>
            <div class="kpi-value">{value}</div>
            <div class="kpi-sublabel">{sublabel}</div>
        </div>
    }
}

fn grouped(value: Option<f64>) -> String {
    value.map(|value| format_grouped(value, 3)).unwrap_or_else(|| "-".to_string())
}

pub fn feature_dashboard(view: &FeatureView) -> Html {
    match view {
        FeatureView::Empty => html! {},
        FeatureView::Admin(stats) => admin_dashboard(stats),
        FeatureView::Vehicle { total } => html! {
            <>
                <div class="kpi-grid">
                    {kpi("차량 기반시설", total.to_string(), "행정동 중심 반경 500m 내".to_string())}
                </div>
                <div class="admin-chart-grid">
                    <div class="admin-chart-item">
                        <h3 class="admin-chart-title">{"시설 구성 비율"}</h3>
                        {canvas(ChartSlot::VehicleDoughnut)}
                    </div>
                </div>
            </>
        },
        FeatureView::Ev { count } => html! {
            <div class="kpi-grid">
                {kpi("EV 충전소", count.to_string(), "행정동 중심 반경 500m 내".to_string())}
            </div>
        },
    }
}

fn admin_dashboard(stats: &AdminStats) -> Html {
    let region = stats.region.clone().unwrap_or_else(|| "행정동".to_string());
    html! {
        <>
            <div class="kpi-grid">
                {kpi("인구", grouped(stats.population), region)}
                {kpi("교통량", grouped(stats.traffic), "일평균 통행량(AADT)".to_string())}
                {kpi("상권 밀집도", grouped(stats.commercial_density), "상대 지표".to_string())}
                {kpi("관광지수", grouped(stats.tourism), "행정동 단위".to_string())}
            </div>
            <div class="admin-chart-grid">
                <div class="admin-chart-item">
                    <h3 class="admin-chart-title">{"행정동 프로필"}</h3>
                    {canvas(ChartSlot::AdminRadar)}
                </div>
                <div class="admin-chart-item">
                    <h3 class="admin-chart-title">{"지표 비중"}</h3>
                    {canvas(ChartSlot::AdminDoughnut)}
                </div>
            </div>
        </>
    }
}

pub fn suggestions(stations: &[Station], open: bool, on_pick: Callback<usize>) -> Html {
    if !open || stations.is_empty() {
        return html! {};
    }
    html! {
        <ul class="suggestions">
            { for stations.iter().enumerate().map(|(index, station)| {
                let on_pick = on_pick.clone();
                html! {
                    <li onclick={Callback::from(move |_: MouseEvent| on_pick.emit(index))}>
                        <strong>{station.name.clone()}</strong>
                        <span class="suggestion-addr">{station.address.clone()}</span>
                    </li>
                }
            }) }
        </ul>
    }
}

/// One level of the region dropdowns. The placeholder option carries an
/// empty code.
pub fn region_select(
    level: RegionLevel,
    entries: &[RegionEntry],
    selected: Option<&RegionEntry>,
    on_change: Callback<Event>,
) -> Html {
    let selected_code = selected.map(|entry| entry.code.as_str());
    html! {
        <select class="region-select" disabled={entries.is_empty()} onchange={on_change}>
            <option value="" selected={selected_code.is_none()}>{format!("-- {} --", level.placeholder())}</option>
            { for entries.iter().map(|entry| html! {
                <option value={entry.code.clone()} selected={selected_code == Some(entry.code.as_str())}>
                    {entry.name.clone()}
                </option>
            }) }
        </select>
    }
}

pub fn roadview_notice(status: RoadviewStatus) -> Html {
    match status {
        RoadviewStatus::Missing => html! { <p class="roadview-missing">{"로드뷰 없음"}</p> },
        RoadviewStatus::Open | RoadviewStatus::Closed => html! {},
    }
}

pub fn guide() -> Html {
    html! {
        <ol class="guide-steps">
            <li>{"지도에서 주유소 마커에 마우스를 올리면 정보 카드가 열립니다."}</li>
            <li>{"카드를 클릭하면 지표 요약과 추천 활용방안이 목록 패널에 표시됩니다."}</li>
            <li>{"주변 정보 패널에서 행정동 지표, 차량 기반시설, EV 충전소를 확인할 수 있습니다."}</li>
            <li>{"필지 정보 패널에서 공시지가와 토지이용계획을 확인할 수 있습니다."}</li>
            <li>{"ESC 키나 지도 클릭으로 열린 패널을 모두 닫습니다."}</li>
        </ol>
    }
}
