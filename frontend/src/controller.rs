//! Page state and the map layers it drives.
//!
//! The controller never touches the network: the wasm glue issues fetches
//! with the tickets handed out here and feeds the results back in. Each
//! ticket carries the selection token it was issued under, so results for a
//! station the user has already moved away from are dropped.

use std::cell::RefCell;
use std::rc::Rc;

use geojson::FeatureCollection;

use crate::api::{AdminStats, EvChargers, LandInfo, Recommendation, StationStats, VehicleInfra};
use crate::charts::{self, ChartBackend, ChartRegistry, ChartSlot, ChartSpec};
use crate::config::{FEATURE_PAN_OFFSET, FOCUS_LEVEL};
use crate::error::ApiError;
use crate::events::{AppEvent, EventBus};
use crate::land;
use crate::markers::{
    AuxKind, AuxLayers, SELECTION_TOLERANCE, SUGGESTION_TOLERANCE, Scheduler, StationLayer, ToggleStep,
    render_stations,
};
use crate::panels::{Panel, PanelController, PanelEffects};
use crate::provider::{LatLng, MapProvider};
use crate::region::{RegionEntry, RegionIndex, RegionLayer, RegionLevel};
use crate::station::Station;

pub const ALERT_EMPTY_KEYWORD: &str = "검색어를 입력하세요.";
pub const ALERT_NO_RESULTS: &str = "검색 결과가 없습니다.";
pub const ALERT_SEARCH_FAILED: &str = "검색 중 오류가 발생했습니다.";
pub const ALERT_SELECT_FIRST: &str = "주유소를 먼저 선택하세요.";
pub const ALERT_ADMIN_FAILED: &str = "행정동 정보를 불러올 수 없습니다.";

/// Proof that a fetch was issued for the current selection.
#[derive(Clone, Debug, PartialEq)]
pub struct SelectionTicket {
    token: u64,
    pub station_id: String,
    pub position: LatLng,
}

/// Vehicle/EV fetch issued by a toggle. Pressing the toggle again, closing
/// the feature panel or selecting another station cancels it.
#[derive(Clone, Debug, PartialEq)]
pub struct AuxTicket {
    pub selection: SelectionTicket,
    fetch: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StationDetail {
    pub station: Station,
    pub stats: StationStats,
    pub recommendation: Recommendation,
    pub report_url: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum DetailView {
    #[default]
    Empty,
    Loading(Station),
    Ready(Box<StationDetail>),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum FeatureView {
    #[default]
    Empty,
    Admin(AdminStats),
    Vehicle { total: usize },
    Ev { count: u64 },
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum ParcelView {
    #[default]
    Idle,
    NeedsSelection,
    Loading,
    Failed,
    Ready(Box<LandInfo>),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SearchMode {
    #[default]
    Station,
    Region,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RoadviewCommand {
    Show(LatLng),
    Close,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RoadviewStatus {
    #[default]
    Closed,
    Open,
    Missing,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RegionSelection {
    pub provinces: Vec<RegionEntry>,
    pub districts: Vec<RegionEntry>,
    pub neighborhoods: Vec<RegionEntry>,
    pub province: Option<RegionEntry>,
    pub district: Option<RegionEntry>,
    pub neighborhood: Option<RegionEntry>,
}

impl RegionSelection {
    /// Deepest selected region, which scopes the station query.
    pub fn current(&self) -> Option<&RegionEntry> {
        self.neighborhood
            .as_ref()
            .or(self.district.as_ref())
            .or(self.province.as_ref())
    }
}

/// Everything the page renders from.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ViewState {
    pub panels: PanelController,
    pub selected: Option<Station>,
    pub detail: DetailView,
    pub feature: FeatureView,
    pub vehicle_active: bool,
    pub ev_active: bool,
    pub parcel: ParcelView,
    pub search_mode: SearchMode,
    pub search_text: String,
    pub suggestions: Vec<Station>,
    pub suggestions_open: bool,
    pub region: RegionSelection,
    pub roadview: RoadviewStatus,
    pub station_count: usize,
}

pub struct Controller<P: MapProvider + 'static, C: ChartBackend> {
    pub view: ViewState,
    provider: Rc<P>,
    bus: EventBus,
    schedule: Scheduler,
    stations: Rc<RefCell<StationLayer<P>>>,
    aux: AuxLayers<P>,
    regions: RegionIndex,
    region_layer: RegionLayer<P>,
    charts: ChartRegistry<C>,
    token: u64,
    pending_charts: Vec<(ChartSlot, ChartSpec)>,
    pending_alerts: Vec<String>,
    pending_roadview: Option<RoadviewCommand>,
}

impl<P: MapProvider + 'static, C: ChartBackend> Controller<P, C> {
    pub fn new(provider: Rc<P>, charts: C, bus: EventBus, schedule: Scheduler) -> Self {
        Self {
            view: ViewState::default(),
            stations: Rc::new(RefCell::new(StationLayer::new(provider.clone()))),
            aux: AuxLayers::new(provider.clone()),
            region_layer: RegionLayer::new(provider.clone()),
            regions: RegionIndex::new(),
            charts: ChartRegistry::new(charts),
            provider,
            bus,
            schedule,
            token: 0,
            pending_charts: Vec::new(),
            pending_alerts: Vec::new(),
            pending_roadview: None,
        }
    }

    /// Replaces every station marker on the map.
    pub fn show_stations(&mut self, stations: Vec<Station>) -> usize {
        let count = render_stations(&self.stations, stations, &self.bus, &self.schedule);
        self.view.station_count = count;
        count
    }

    /// Reacts to events raised by the marker layer and the map.
    pub fn handle_event(&mut self, event: &AppEvent) -> Option<SelectionTicket> {
        match event {
            AppEvent::StationSelected(station) => Some(self.select_station(station.clone())),
            AppEvent::MapClicked => {
                self.stations.borrow_mut().reset_highlight();
                self.close_all_panels();
                None
            }
        }
    }

    fn ticket(&self) -> Option<SelectionTicket> {
        self.view.selected.as_ref().map(|station| SelectionTicket {
            token: self.token,
            station_id: station.id(),
            position: station.position(),
        })
    }

    fn is_current(&self, ticket: &SelectionTicket) -> bool {
        ticket.token == self.token
    }

    /// Starts a new selection; detail fetches run under the returned ticket.
    pub fn select_station(&mut self, station: Station) -> SelectionTicket {
        self.clear_feature_layers();
        self.token += 1;
        self.stations
            .borrow_mut()
            .highlight_at(station.position(), SELECTION_TOLERANCE);
        let ticket = SelectionTicket {
            token: self.token,
            station_id: station.id(),
            position: station.position(),
        };
        self.view.detail = DetailView::Loading(station.clone());
        self.view.parcel = ParcelView::Idle;
        self.view.selected = Some(station);
        self.charts.clear(ChartSlot::MetricsBar);
        self.charts.clear(ChartSlot::MetricsRadar);
        ticket
    }

    /// Fills the list panel once recommendation and statistics are in.
    pub fn apply_detail(
        &mut self,
        ticket: &SelectionTicket,
        recommendation: Recommendation,
        stats: StationStats,
        report_url: String,
    ) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        let Some(station) = self.view.selected.clone() else {
            return false;
        };
        if let Some(spec) = charts::stats_bar(&stats) {
            self.pending_charts.push((ChartSlot::MetricsBar, spec));
        }
        if let Some(spec) = charts::stats_radar(&stats) {
            self.pending_charts.push((ChartSlot::MetricsRadar, spec));
        }
        self.view.detail = DetailView::Ready(Box::new(StationDetail {
            station,
            stats,
            recommendation,
            report_url,
        }));
        let effects = self.view.panels.open(Panel::List, false);
        self.apply_panel_effects(effects);
        self.pending_roadview = Some(RoadviewCommand::Show(ticket.position));
        self.view.roadview = RoadviewStatus::Open;
        true
    }

    pub fn roadview_missing(&mut self) {
        if self.view.roadview == RoadviewStatus::Open {
            self.view.roadview = RoadviewStatus::Missing;
        }
    }

    fn clear_feature_layers(&mut self) {
        self.aux.clear_all();
        self.view.vehicle_active = false;
        self.view.ev_active = false;
        self.view.feature = FeatureView::Empty;
        self.charts.clear(ChartSlot::AdminRadar);
        self.charts.clear(ChartSlot::AdminDoughnut);
        self.charts.clear(ChartSlot::VehicleDoughnut);
    }

    fn apply_panel_effects(&mut self, effects: PanelEffects) {
        if effects.clear_feature_layers {
            self.aux.clear_all();
            self.view.vehicle_active = false;
            self.view.ev_active = false;
        }
        if effects.close_roadview && self.view.roadview != RoadviewStatus::Closed {
            self.view.roadview = RoadviewStatus::Closed;
            self.pending_roadview = Some(RoadviewCommand::Close);
        }
    }

    /// Navigation button. Opening the parcel panel hands back a ticket for
    /// the land fetch when a station is selected.
    pub fn toggle_panel(&mut self, panel: Panel) -> Option<SelectionTicket> {
        let effects = self.view.panels.toggle(panel);
        self.apply_panel_effects(effects);
        if !self.view.panels.is_open(panel) {
            return None;
        }
        match panel {
            Panel::Feature => {
                self.focus_feature_area();
                None
            }
            Panel::Parcel => self.begin_parcel(),
            Panel::List | Panel::Guide => None,
        }
    }

    pub fn close_panel(&mut self, panel: Panel) {
        let effects = self.view.panels.close(panel);
        self.apply_panel_effects(effects);
    }

    /// ESC, map click and the search navigation button.
    pub fn close_all_panels(&mut self) {
        let effects = self.view.panels.close_all(true);
        self.apply_panel_effects(effects);
    }

    fn focus_feature_area(&mut self) {
        let Some(position) = self.view.selected.as_ref().map(Station::position) else {
            return;
        };
        self.aux.draw_buffer(position);
        self.provider.set_level(FOCUS_LEVEL);
        self.provider
            .pan_to(LatLng::new(position.lat, position.lng - FEATURE_PAN_OFFSET));
    }

    fn require_selection(&mut self) -> Option<SelectionTicket> {
        let ticket = self.ticket();
        if ticket.is_none() {
            self.alert(ALERT_SELECT_FIRST);
        }
        ticket
    }

    fn begin_parcel(&mut self) -> Option<SelectionTicket> {
        match self.ticket() {
            Some(ticket) => {
                self.view.parcel = ParcelView::Loading;
                Some(ticket)
            }
            None => {
                self.view.parcel = ParcelView::NeedsSelection;
                None
            }
        }
    }

    pub fn apply_land(&mut self, ticket: &SelectionTicket, land: Option<LandInfo>) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        for slot in [ChartSlot::LandPrice, ChartSlot::LandCompare, ChartSlot::LandUsage] {
            self.charts.clear(slot);
        }
        let Some(land) = land else {
            self.view.parcel = ParcelView::Failed;
            return true;
        };
        let price_info = land.land_price.clone().unwrap_or_default();
        if let Some(price) = land::price(&price_info) {
            self.pending_charts
                .push((ChartSlot::LandPrice, charts::land_price_bar(price)));
            if let Some(average) = land::region_average(&price_info) {
                self.pending_charts
                    .push((ChartSlot::LandCompare, charts::land_compare_bar(price, average)));
            }
        }
        if let Some(land_use) = &land.land_use {
            if let Some(spec) = charts::land_usage_doughnut(&land::usage_counts(land_use)) {
                self.pending_charts.push((ChartSlot::LandUsage, spec));
            }
        }
        self.view.parcel = ParcelView::Ready(Box::new(land));
        true
    }

    pub fn begin_admin(&mut self) -> Option<SelectionTicket> {
        self.require_selection()
    }

    pub fn apply_admin(&mut self, ticket: &SelectionTicket, stats: Option<AdminStats>) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        let Some(stats) = stats else {
            self.alert(ALERT_ADMIN_FAILED);
            return true;
        };
        let label = stats.region.clone().unwrap_or_else(|| "행정동".to_string());
        self.charts.clear(ChartSlot::VehicleDoughnut);
        self.pending_charts
            .push((ChartSlot::AdminRadar, charts::admin_radar(&stats, &label)));
        self.pending_charts
            .push((ChartSlot::AdminDoughnut, charts::admin_doughnut(&stats)));
        self.view.feature = FeatureView::Admin(stats);
        true
    }

    /// Vehicle/EV button. Returns a ticket when points have to be fetched;
    /// pressing while the set is shown or still loading removes it.
    pub fn toggle_aux(&mut self, kind: AuxKind) -> Option<AuxTicket> {
        let selection = self.require_selection()?;
        match self.aux.toggle(kind) {
            ToggleStep::NeedsFetch(fetch) => Some(AuxTicket { selection, fetch }),
            ToggleStep::Cleared => {
                self.set_aux_active(kind, false);
                let other = match kind {
                    AuxKind::Vehicle => AuxKind::Ev,
                    AuxKind::Ev => AuxKind::Vehicle,
                };
                if !self.aux.is_visible(other) {
                    self.view.feature = FeatureView::Empty;
                    self.charts.clear(ChartSlot::VehicleDoughnut);
                }
                None
            }
        }
    }

    fn set_aux_active(&mut self, kind: AuxKind, active: bool) {
        match kind {
            AuxKind::Vehicle => self.view.vehicle_active = active,
            AuxKind::Ev => self.view.ev_active = active,
        }
    }

    fn settle_aux(&mut self, kind: AuxKind, ticket: &AuxTicket) -> bool {
        self.is_current(&ticket.selection) && self.aux.settle(kind, ticket.fetch)
    }

    pub fn apply_vehicle(&mut self, ticket: &AuxTicket, infra: Option<VehicleInfra>) -> bool {
        if !self.settle_aux(AuxKind::Vehicle, ticket) {
            return false;
        }
        let Some(infra) = infra else {
            return true;
        };
        self.aux.show(AuxKind::Vehicle, &infra.points());
        self.set_aux_active(AuxKind::Vehicle, true);
        self.pending_charts
            .push((ChartSlot::VehicleDoughnut, charts::vehicle_doughnut(&infra)));
        self.view.feature = FeatureView::Vehicle {
            total: infra.total(),
        };
        true
    }

    pub fn apply_ev(&mut self, ticket: &AuxTicket, chargers: Option<EvChargers>) -> bool {
        if !self.settle_aux(AuxKind::Ev, ticket) {
            return false;
        }
        let Some(chargers) = chargers else {
            return true;
        };
        self.aux.show(AuxKind::Ev, &chargers.items);
        self.set_aux_active(AuxKind::Ev, true);
        self.charts.clear(ChartSlot::VehicleDoughnut);
        self.view.feature = FeatureView::Ev {
            count: chargers.display_count(),
        };
        true
    }

    pub fn set_search_text(&mut self, text: String) {
        self.view.search_text = text;
    }

    /// Validates the keyword and resets the suggestion list. Returns the
    /// keyword to search for.
    pub fn begin_search(&mut self) -> Option<String> {
        self.view.suggestions.clear();
        self.view.suggestions_open = false;
        let keyword = self.view.search_text.trim().to_string();
        if keyword.is_empty() {
            self.alert(ALERT_EMPTY_KEYWORD);
            return None;
        }
        Some(keyword)
    }

    /// Keeps stations whose name starts with the keyword, ignoring case.
    pub fn apply_search(&mut self, keyword: &str, result: Result<Vec<Station>, ApiError>) {
        let stations = match result {
            Ok(stations) => stations,
            Err(_) => {
                self.alert(ALERT_SEARCH_FAILED);
                return;
            }
        };
        let needle = keyword.to_lowercase();
        let matches: Vec<Station> = stations
            .into_iter()
            .filter(|station| station.name.to_lowercase().starts_with(&needle))
            .collect();
        if matches.is_empty() {
            self.alert(ALERT_NO_RESULTS);
            return;
        }
        self.view.suggestions = matches;
        self.view.suggestions_open = true;
    }

    pub fn pick_suggestion(&mut self, index: usize) {
        let Some(station) = self.view.suggestions.get(index).cloned() else {
            return;
        };
        let position = station.position();
        self.provider.set_level(FOCUS_LEVEL);
        self.provider.pan_to(position);
        self.stations
            .borrow_mut()
            .highlight_at(position, SUGGESTION_TOLERANCE);
        self.view.suggestions.clear();
        self.view.suggestions_open = false;
        self.view.search_text = station.name;
    }

    pub fn set_search_mode(&mut self, mode: SearchMode) {
        self.view.search_mode = mode;
        self.view.suggestions.clear();
        self.view.suggestions_open = false;
        if mode == SearchMode::Region {
            self.view.region = RegionSelection {
                provinces: self.regions.provinces(),
                ..RegionSelection::default()
            };
        } else {
            self.region_layer.clear();
        }
    }

    pub fn load_regions(&mut self, level: RegionLevel, collection: &FeatureCollection) -> usize {
        self.regions.load(level, collection)
    }

    /// Province dropdown changed. Returns the region name to query stations
    /// for, or `None` when the placeholder was picked.
    pub fn select_province(&mut self, code: &str) -> Option<String> {
        let region = &mut self.view.region;
        region.district = None;
        region.neighborhood = None;
        region.districts.clear();
        region.neighborhoods.clear();
        region.province = region.provinces.iter().find(|entry| entry.code == code).cloned();
        let Some(province) = region.province.clone() else {
            self.region_layer.clear();
            return None;
        };
        self.view.region.districts = self.regions.districts(&province);
        Some(self.focus_region(&province))
    }

    pub fn select_district(&mut self, code: &str) -> Option<String> {
        let region = &mut self.view.region;
        region.neighborhood = None;
        region.neighborhoods.clear();
        region.district = region.districts.iter().find(|entry| entry.code == code).cloned();
        let Some(district) = region.district.clone() else {
            self.region_layer.clear();
            return None;
        };
        self.view.region.neighborhoods = self.regions.neighborhoods(&district);
        Some(self.focus_region(&district))
    }

    pub fn select_neighborhood(&mut self, code: &str) -> Option<String> {
        let region = &mut self.view.region;
        region.neighborhood = region
            .neighborhoods
            .iter()
            .find(|entry| entry.code == code)
            .cloned();
        let Some(neighborhood) = region.neighborhood.clone() else {
            self.region_layer.clear();
            return None;
        };
        Some(self.focus_region(&neighborhood))
    }

    fn focus_region(&mut self, entry: &RegionEntry) -> String {
        match self.regions.polygons(entry.level, &entry.code) {
            Some(polygons) => {
                self.region_layer.show(polygons);
            }
            None => self.region_layer.clear(),
        }
        entry.full_name.clone()
    }

    /// Stations for a region query; ignored if the selection moved on.
    pub fn apply_region_stations(&mut self, region_name: &str, stations: Vec<Station>) -> bool {
        let current = self.view.region.current().map(|entry| entry.full_name.as_str());
        if current != Some(region_name) {
            return false;
        }
        self.show_stations(stations);
        true
    }

    fn alert(&mut self, message: &str) {
        self.pending_alerts.push(message.to_string());
    }

    pub fn take_alerts(&mut self) -> Vec<String> {
        std::mem::take(&mut self.pending_alerts)
    }

    pub fn take_roadview(&mut self) -> Option<RoadviewCommand> {
        self.pending_roadview.take()
    }

    /// Draws queued charts; call once their canvases are in the document.
    pub fn flush_charts(&mut self) -> usize {
        let pending = std::mem::take(&mut self.pending_charts);
        pending
            .into_iter()
            .filter(|(slot, spec)| self.charts.draw(*slot, spec))
            .count()
    }

    pub fn has_pending_charts(&self) -> bool {
        !self.pending_charts.is_empty()
    }

    pub fn aux_residual(&self) -> usize {
        self.aux.residual()
    }

    pub fn highlighted_station(&self) -> Option<Station> {
        let layer = self.stations.borrow();
        layer.highlighted().and_then(|index| layer.station(index).cloned())
    }

    pub fn charts(&self) -> &ChartRegistry<C> {
        &self.charts
    }
}
