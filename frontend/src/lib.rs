use std::cell::RefCell;
use std::rc::Rc;

use geojson::FeatureCollection;
use gloo_net::http::Request;
use gloo_timers::callback::Timeout;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use yew::prelude::*;

mod api;
mod charts;
mod config;
mod controller;
mod error;
mod events;
mod format;
mod js;
mod kakao;
mod land;
mod markers;
#[cfg(test)]
mod mock;
mod panels;
mod provider;
mod region;
mod station;
mod views;

use api::{ApiClient, fetch_kakao_key};
use charts::ChartJs;
use config::{
    API_BASE, DEFAULT_CENTER, DEFAULT_LEVEL, GEO_EMD_PATH, GEO_SIDO_PATH, GEO_SIGUNGU_PATH, INITIAL_FETCH_LIMIT,
    REGION_FETCH_LIMIT, is_local_host, local_kakao_key,
};
use controller::{Controller, RoadviewCommand, SearchMode, SelectionTicket, ViewState};
use events::{AppEvent, EventBus};
use kakao::{KakaoMap, Roadview};
use markers::{AuxKind, Scheduler};
use panels::Panel;
use provider::{LatLng, MapProvider};
use region::{RegionLevel, parse_collection};

type PageController = Controller<KakaoMap, ChartJs>;
type RuntimeSlot = Rc<RefCell<Option<Runtime>>>;

/// Everything that exists once the map SDK is up. Cloned into every
/// callback and spawned fetch.
#[derive(Clone)]
struct Runtime {
    controller: Rc<RefCell<PageController>>,
    map: Rc<KakaoMap>,
    roadview: Option<Rc<Roadview>>,
    api: Rc<ApiClient>,
    trigger: UseForceUpdateHandle,
}

impl Runtime {
    fn refresh(&self) {
        self.trigger.force_update();
    }

    fn on_event(&self, event: &AppEvent) {
        let ticket = self.controller.borrow_mut().handle_event(event);
        self.refresh();
        if let Some(ticket) = ticket {
            self.load_detail(ticket);
        }
    }

    /// Recommendation first (falling back to the model endpoint), then
    /// statistics, then the panel.
    fn load_detail(&self, ticket: SelectionTicket) {
        let runtime = self.clone();
        wasm_bindgen_futures::spawn_local(async move {
            let id = ticket.station_id.clone();
            let mut recommendation = runtime.api.fetch_recommendation(&id).await;
            if recommendation.is_empty() {
                recommendation = runtime.api.fetch_ml_recommendation(&id).await;
            }
            let stats = runtime.api.fetch_stats(&id).await;
            let report_url = runtime.api.report_url(&id);
            let applied = runtime
                .controller
                .borrow_mut()
                .apply_detail(&ticket, recommendation, stats, report_url);
            if applied {
                runtime.refresh();
            } else {
                log(&format!("dropped detail for {id}: selection changed"));
            }
        });
    }

    fn toggle_panel(&self, panel: Panel) {
        let ticket = self.controller.borrow_mut().toggle_panel(panel);
        self.refresh();
        if let Some(ticket) = ticket {
            self.load_land(ticket);
        }
    }

    fn close_panel(&self, panel: Panel) {
        self.controller.borrow_mut().close_panel(panel);
        self.refresh();
    }

    fn close_all(&self) {
        self.controller.borrow_mut().close_all_panels();
        self.refresh();
    }

    fn load_land(&self, ticket: SelectionTicket) {
        let runtime = self.clone();
        wasm_bindgen_futures::spawn_local(async move {
            let land = runtime.api.fetch_land(&ticket.station_id).await;
            if runtime.controller.borrow_mut().apply_land(&ticket, land) {
                runtime.refresh();
            }
        });
    }

    fn load_admin(&self) {
        let ticket = self.controller.borrow_mut().begin_admin();
        self.refresh();
        let Some(ticket) = ticket else {
            return;
        };
        let runtime = self.clone();
        wasm_bindgen_futures::spawn_local(async move {
            let stats = runtime.api.fetch_admin_stats(&ticket.station_id).await;
            if runtime.controller.borrow_mut().apply_admin(&ticket, stats) {
                runtime.refresh();
            }
        });
    }

    fn toggle_aux(&self, kind: AuxKind) {
        let ticket = self.controller.borrow_mut().toggle_aux(kind);
        self.refresh();
        let Some(ticket) = ticket else {
            return;
        };
        let runtime = self.clone();
        wasm_bindgen_futures::spawn_local(async move {
            let applied = match kind {
                AuxKind::Vehicle => {
                    let infra = runtime.api.fetch_vehicle(&ticket.selection.station_id).await;
                    runtime.controller.borrow_mut().apply_vehicle(&ticket, infra)
                }
                AuxKind::Ev => {
                    let chargers = runtime.api.fetch_ev(&ticket.selection.station_id).await;
                    runtime.controller.borrow_mut().apply_ev(&ticket, chargers)
                }
            };
            if applied {
                runtime.refresh();
            }
        });
    }

    fn search(&self) {
        let keyword = self.controller.borrow_mut().begin_search();
        self.refresh();
        let Some(keyword) = keyword else {
            return;
        };
        let runtime = self.clone();
        wasm_bindgen_futures::spawn_local(async move {
            let result = runtime.api.search_stations(&keyword).await;
            if let Err(err) = &result {
                error(&format!("search for {keyword} failed: {err}"));
            }
            runtime.controller.borrow_mut().apply_search(&keyword, result);
            runtime.refresh();
        });
    }

    fn select_region(&self, level: RegionLevel, code: &str) {
        let name = {
            let mut controller = self.controller.borrow_mut();
            match level {
                RegionLevel::Sido => controller.select_province(code),
                RegionLevel::Sigungu => controller.select_district(code),
                RegionLevel::Emd => controller.select_neighborhood(code),
            }
        };
        self.refresh();
        let Some(name) = name else {
            return;
        };
        let runtime = self.clone();
        wasm_bindgen_futures::spawn_local(async move {
            let stations = runtime
                .api
                .fetch_stations_by_region(&name, REGION_FETCH_LIMIT)
                .await;
            log(&format!("{} stations in {name}", stations.len()));
            if runtime
                .controller
                .borrow_mut()
                .apply_region_stations(&name, stations)
            {
                runtime.refresh();
            }
        });
    }

    /// Work that needs the freshly rendered DOM: chart canvases, alerts
    /// and the roadview.
    fn after_render(&self) {
        let (alerts, roadview) = {
            let mut controller = self.controller.borrow_mut();
            controller.flush_charts();
            (controller.take_alerts(), controller.take_roadview())
        };
        if let Some(window) = web_sys::window() {
            for message in alerts {
                window.alert_with_message(&message).ok();
            }
        }
        let Some(view) = &self.roadview else {
            return;
        };
        match roadview {
            Some(RoadviewCommand::Show(position)) => {
                let runtime = self.clone();
                view.show_at(position, move || {
                    runtime.controller.borrow_mut().roadview_missing();
                    runtime.refresh();
                });
            }
            Some(RoadviewCommand::Close) => view.close(),
            None => {}
        }
    }
}

fn log(message: &str) {
    web_sys::console::log_1(&message.into());
}

fn error(message: &str) {
    web_sys::console::error_1(&message.into());
}

fn timeout_scheduler() -> Scheduler {
    Rc::new(|delay_ms: u32, task: Box<dyn FnOnce()>| {
        Timeout::new(delay_ms, task).forget();
    })
}

/// Local development uses a fixed key; deployments ask the hosting server.
async fn sdk_key() -> Result<String, JsValue> {
    let hostname = web_sys::window()
        .and_then(|window| window.location().hostname().ok())
        .unwrap_or_default();
    if is_local_host(&hostname) {
        return Ok(local_kakao_key().to_string());
    }
    fetch_kakao_key()
        .await
        .map_err(|err| JsValue::from_str(&err.to_string()))
}

async fn fetch_collection(path: &str) -> Result<FeatureCollection, String> {
    let response = Request::get(path).send().await.map_err(|err| err.to_string())?;
    if !response.ok() {
        return Err(format!("status {}", response.status()));
    }
    let text = response.text().await.map_err(|err| err.to_string())?;
    parse_collection(&text)
}

async fn load_boundaries(runtime: &Runtime) {
    let layers = [
        (RegionLevel::Sido, GEO_SIDO_PATH),
        (RegionLevel::Sigungu, GEO_SIGUNGU_PATH),
        (RegionLevel::Emd, GEO_EMD_PATH),
    ];
    for (level, path) in layers {
        match fetch_collection(path).await {
            Ok(collection) => {
                let count = runtime.controller.borrow_mut().load_regions(level, &collection);
                log(&format!("{path}: {count} boundaries"));
            }
            Err(err) => web_sys::console::warn_1(&format!("{path} not loaded: {err}").into()),
        }
    }
}

async fn load_initial_stations(runtime: &Runtime) {
    let Some(bounds) = runtime.map.bounds() else {
        error("map bounds unavailable; skipping initial station fetch");
        return;
    };
    match runtime.api.fetch_stations_in_bounds(bounds, INITIAL_FETCH_LIMIT).await {
        Ok(stations) => {
            let count = runtime.controller.borrow_mut().show_stations(stations);
            log(&format!("{count} stations on the map"));
            runtime.refresh();
        }
        Err(err) => error(&format!("initial station fetch failed: {err}")),
    }
}

async fn bootstrap(
    map_element: web_sys::HtmlElement,
    roadview_element: Option<web_sys::HtmlElement>,
    slot: RuntimeSlot,
    trigger: UseForceUpdateHandle,
) -> Result<(), JsValue> {
    let key = sdk_key().await?;
    kakao::load_sdk(&key).await?;

    let center = LatLng::new(DEFAULT_CENTER.0, DEFAULT_CENTER.1);
    let map = Rc::new(KakaoMap::new(&map_element, center, DEFAULT_LEVEL)?);
    let roadview = roadview_element.and_then(|element| match Roadview::new(element) {
        Ok(roadview) => Some(Rc::new(roadview)),
        Err(err) => {
            web_sys::console::warn_2(&"roadview unavailable".into(), &err);
            None
        }
    });

    let bus = EventBus::new();
    let controller = Controller::new(map.clone(), ChartJs, bus.clone(), timeout_scheduler());
    let runtime = Runtime {
        controller: Rc::new(RefCell::new(controller)),
        map: map.clone(),
        roadview,
        api: Rc::new(ApiClient::new(API_BASE)),
        trigger,
    };

    {
        let runtime = runtime.clone();
        bus.subscribe(move |event| runtime.on_event(event));
    }
    map.on_click(move || bus.emit(AppEvent::MapClicked));
    map.relayout();

    *slot.borrow_mut() = Some(runtime.clone());
    runtime.refresh();

    load_boundaries(&runtime).await;
    load_initial_stations(&runtime).await;
    Ok(())
}

fn runtime_callback<E: 'static>(slot: &RuntimeSlot, action: impl Fn(&Runtime, E) + 'static) -> Callback<E> {
    let slot = slot.clone();
    Callback::from(move |event: E| {
        let runtime = slot.borrow().clone();
        if let Some(runtime) = runtime {
            action(&runtime, event);
        }
    })
}

fn select_value(event: &Event) -> String {
    event
        .target()
        .and_then(|target| target.dyn_into::<web_sys::HtmlSelectElement>().ok())
        .map(|select| select.value())
        .unwrap_or_default()
}

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    yew::Renderer::<App>::new().render();
}

#[function_component(App)]
fn app() -> Html {
    let map_ref = use_node_ref();
    let roadview_ref = use_node_ref();
    let runtime = use_mut_ref(|| None::<Runtime>);
    let trigger = use_force_update();
    let startup_error = use_state(|| None::<String>);

    {
        let runtime = runtime.clone();
        let map_ref = map_ref.clone();
        let roadview_ref = roadview_ref.clone();
        let startup_error = startup_error.clone();
        use_effect_with((), move |_| {
            if let Some(element) = map_ref.cast::<web_sys::HtmlElement>() {
                let roadview_element = roadview_ref.cast::<web_sys::HtmlElement>();
                wasm_bindgen_futures::spawn_local(async move {
                    if let Err(err) = bootstrap(element, roadview_element, runtime, trigger).await {
                        web_sys::console::error_2(&"map startup failed".into(), &err);
                        startup_error.set(Some("지도를 불러오지 못했습니다.".to_string()));
                    }
                });
            }
            || ()
        });
    }

    {
        let runtime = runtime.clone();
        use_effect_with((), move |_| {
            let document = web_sys::window().and_then(|window| window.document());
            let listener = Closure::<dyn Fn(web_sys::KeyboardEvent)>::new(move |event: web_sys::KeyboardEvent| {
                if event.key() == "Escape" {
                    let current = runtime.borrow().clone();
                    if let Some(current) = current {
                        current.close_all();
                    }
                }
            });
            if let Some(document) = &document {
                document
                    .add_event_listener_with_callback("keydown", listener.as_ref().unchecked_ref())
                    .ok();
            }
            move || {
                if let Some(document) = document {
                    document
                        .remove_event_listener_with_callback("keydown", listener.as_ref().unchecked_ref())
                        .ok();
                }
            }
        });
    }

    {
        let runtime = runtime.clone();
        use_effect(move || {
            let current = runtime.borrow().clone();
            if let Some(current) = current {
                current.after_render();
            }
            || ()
        });
    }

    let view: ViewState = runtime
        .borrow()
        .as_ref()
        .map(|current| current.controller.borrow().view.clone())
        .unwrap_or_default();

    let on_search_nav = runtime_callback(&runtime, |runtime, _: MouseEvent| runtime.close_all());
    let on_search_input = runtime_callback(&runtime, |runtime, event: InputEvent| {
        let value = event
            .target()
            .and_then(|target| target.dyn_into::<web_sys::HtmlInputElement>().ok())
            .map(|input| input.value())
            .unwrap_or_default();
        runtime.controller.borrow_mut().set_search_text(value);
        runtime.refresh();
    });
    let on_search_key = runtime_callback(&runtime, |runtime, event: KeyboardEvent| {
        if event.key() == "Enter" {
            runtime.search();
        }
    });
    let on_search_click = runtime_callback(&runtime, |runtime, _: MouseEvent| runtime.search());
    let on_pick = runtime_callback(&runtime, |runtime, index: usize| {
        runtime.controller.borrow_mut().pick_suggestion(index);
        runtime.refresh();
    });
    let mode_tab = |mode: SearchMode| {
        runtime_callback(&runtime, move |runtime, _: MouseEvent| {
            runtime.controller.borrow_mut().set_search_mode(mode);
            runtime.refresh();
        })
    };
    let region_change = |level: RegionLevel| {
        runtime_callback(&runtime, move |runtime, event: Event| {
            runtime.select_region(level, &select_value(&event));
        })
    };
    let on_admin = runtime_callback(&runtime, |runtime, _: MouseEvent| runtime.load_admin());
    let on_vehicle = runtime_callback(&runtime, |runtime, _: MouseEvent| runtime.toggle_aux(AuxKind::Vehicle));
    let on_ev = runtime_callback(&runtime, |runtime, _: MouseEvent| runtime.toggle_aux(AuxKind::Ev));

    let tab_class = |mode: SearchMode| {
        if view.search_mode == mode { "tab active" } else { "tab" }
    };
    let toggle_class = |active: bool| {
        if active { "feature-btn active" } else { "feature-btn" }
    };

    let search_body = match view.search_mode {
        SearchMode::Station => html! {
            <div class="station-search">
                <input
                    type="text"
                    placeholder="주유소명을 입력하세요"
                    value={view.search_text.clone()}
                    oninput={on_search_input}
                    onkeydown={on_search_key}
                />
                <button class="search-btn" onclick={on_search_click}>{"검색"}</button>
                {views::suggestions(&view.suggestions, view.suggestions_open, on_pick)}
            </div>
        },
        SearchMode::Region => {
            let region = &view.region;
            html! {
                <div class="region-search">
                    {views::region_select(RegionLevel::Sido, &region.provinces, region.province.as_ref(), region_change(RegionLevel::Sido))}
                    {views::region_select(RegionLevel::Sigungu, &region.districts, region.district.as_ref(), region_change(RegionLevel::Sigungu))}
                    {views::region_select(RegionLevel::Emd, &region.neighborhoods, region.neighborhood.as_ref(), region_change(RegionLevel::Emd))}
                </div>
            }
        }
    };

    let panel_body = |panel: Panel| match panel {
        Panel::List => views::station_detail(&view.detail),
        Panel::Feature => html! {
            <>
                <div class="feature-buttons">
                    <button class="feature-btn" onclick={on_admin.clone()}>{"행정동 정보"}</button>
                    <button class={toggle_class(view.vehicle_active)} onclick={on_vehicle.clone()}>{"차량 기반시설"}</button>
                    <button class={toggle_class(view.ev_active)} onclick={on_ev.clone()}>{"EV 충전소"}</button>
                </div>
                <div class="dashboard-detail">{views::feature_dashboard(&view.feature)}</div>
            </>
        },
        Panel::Parcel => views::parcel(&view.parcel),
        Panel::Guide => views::guide(),
    };

    html! {
        <div class="app">
            <div id="map" ref={map_ref}></div>
            <nav class="side-nav">
                <button class="nav-btn" onclick={on_search_nav}>{"🔍"}</button>
                { for Panel::ALL.into_iter().map(|panel| {
                    let onclick = runtime_callback(&runtime, move |runtime, _: MouseEvent| runtime.toggle_panel(panel));
                    html! {
                        <button class={view.panels.button_class(panel)} onclick={onclick}>{panel.title()}</button>
                    }
                }) }
            </nav>
            <div class={view.panels.search_box_class()}>
                <div class="search-tabs">
                    <button class={tab_class(SearchMode::Station)} onclick={mode_tab(SearchMode::Station)}>{"주유소 검색"}</button>
                    <button class={tab_class(SearchMode::Region)} onclick={mode_tab(SearchMode::Region)}>{"지역 검색"}</button>
                </div>
                {search_body}
            </div>
            { for Panel::ALL.into_iter().map(|panel| {
                let on_close = runtime_callback(&runtime, move |runtime, _: MouseEvent| runtime.close_panel(panel));
                views::panel_shell(panel, view.panels.panel_class(panel), on_close, panel_body(panel))
            }) }
            <div class="roadview-frame">
                <div id="floating-roadview" class="roadview" ref={roadview_ref}></div>
                {views::roadview_notice(view.roadview)}
            </div>
            <div class="status-bar">
                { match &*startup_error {
                    Some(message) => html! { <span class="warning">{message.clone()}</span> },
                    None => html! { <span>{format!("주유소 {}곳", view.station_count)}</span> },
                } }
            </div>
        </div>
    }
}
