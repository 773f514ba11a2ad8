//! Station markers, their info cards, and the auxiliary layers drawn
//! around a selected station.
//!
//! At most one card is open and at most one marker is highlighted at any
//! time. Every render starts from a clean map: markers are recreated, never
//! diffed.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::config::{BUFFER_RADIUS_M, HEAT_RADIUS_M, HOVER_CLOSE_DELAY_MS, STATION_MARKER_IMAGE};
use crate::events::{AppEvent, EventBus};
use crate::provider::{LatLng, MapProvider, MarkerIcon, PointerEvent, ShapeStyle};
use crate::station::{Station, default_image_url};

pub const STATION_ICON: MarkerIcon = MarkerIcon {
    url: STATION_MARKER_IMAGE,
    size: (30, 40),
    offset: (15, 40),
};

pub const HIGHLIGHT_ICON: MarkerIcon = MarkerIcon {
    url: STATION_MARKER_IMAGE,
    size: (35, 45),
    offset: (25, 65),
};

const HIGHLIGHT_Z_INDEX: i32 = 999;

/// Tolerance used to match a selected station back to its marker.
pub const SELECTION_TOLERANCE: f64 = 1e-6;
/// Search suggestions carry rounded coordinates, so they match looser.
pub const SUGGESTION_TOLERANCE: f64 = 1e-5;

/// Handle for a delayed card close; stale tickets are ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CloseTicket(u64);

struct StationMarker<P: MapProvider> {
    station: Station,
    marker: P::Marker,
    overlay: P::Overlay,
}

struct Highlight<P: MapProvider> {
    index: usize,
    marker: P::Marker,
}

pub struct StationLayer<P: MapProvider> {
    provider: Rc<P>,
    entries: Vec<StationMarker<P>>,
    open: Option<usize>,
    pending_close: Option<CloseTicket>,
    tickets: u64,
    highlight: Option<Highlight<P>>,
}

impl<P: MapProvider> StationLayer<P> {
    pub fn new(provider: Rc<P>) -> Self {
        Self {
            provider,
            entries: Vec::new(),
            open: None,
            pending_close: None,
            tickets: 0,
            highlight: None,
        }
    }

    /// Replaces everything on the layer with markers for `stations`.
    /// Returns how many markers were drawn.
    pub fn render(&mut self, stations: Vec<Station>) -> usize {
        self.clear();
        for station in stations {
            if !(station.lat.is_finite() && station.lng.is_finite()) {
                continue;
            }
            let position = station.position();
            let marker = self.provider.create_marker(position, Some(&STATION_ICON));
            let overlay = self.provider.create_overlay(position, &info_card_html(&station));
            self.entries.push(StationMarker {
                station,
                marker,
                overlay,
            });
        }
        let markers: Vec<P::Marker> = self.entries.iter().map(|entry| entry.marker.clone()).collect();
        self.provider.cluster(&markers);
        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.close_card();
        self.reset_highlight();
        self.provider.clear_cluster();
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn station(&self, index: usize) -> Option<&Station> {
        self.entries.get(index).map(|entry| &entry.station)
    }

    pub fn open_card(&self) -> Option<usize> {
        self.open
    }

    pub fn highlighted(&self) -> Option<usize> {
        self.highlight.as_ref().map(|highlight| highlight.index)
    }

    /// Pointer entered a marker: its card replaces whatever card was open.
    pub fn hover(&mut self, index: usize) {
        let Some(entry) = self.entries.get(index) else {
            return;
        };
        self.pending_close = None;
        if let Some(previous) = self.open.take() {
            if let Some(open) = self.entries.get(previous) {
                self.provider.hide_overlay(&open.overlay);
            }
        }
        self.provider.show_overlay(&entry.overlay);
        self.open = Some(index);
    }

    /// Pointer left a marker or its card. The card closes once the returned
    /// ticket is redeemed, unless the pointer comes back first.
    pub fn leave(&mut self) -> Option<CloseTicket> {
        self.open?;
        self.tickets += 1;
        let ticket = CloseTicket(self.tickets);
        self.pending_close = Some(ticket);
        Some(ticket)
    }

    /// Pointer moved onto the open card.
    pub fn card_enter(&mut self) {
        self.pending_close = None;
    }

    pub fn redeem(&mut self, ticket: CloseTicket) {
        if self.pending_close == Some(ticket) {
            self.close_card();
        }
    }

    pub fn close_card(&mut self) {
        self.pending_close = None;
        if let Some(index) = self.open.take() {
            if let Some(entry) = self.entries.get(index) {
                self.provider.hide_overlay(&entry.overlay);
            }
        }
    }

    /// Marker or card clicked: closes the card and hands back the station
    /// to announce.
    pub fn select(&mut self, index: usize) -> Option<Station> {
        let station = self.entries.get(index)?.station.clone();
        self.close_card();
        Some(station)
    }

    /// Highlights the marker at `position`, if one is within `tolerance`.
    pub fn highlight_at(&mut self, position: LatLng, tolerance: f64) -> bool {
        let found = self
            .entries
            .iter()
            .position(|entry| entry.station.position().near(&position, tolerance));
        match found {
            Some(index) => {
                self.highlight(index);
                true
            }
            None => false,
        }
    }

    /// Puts an enlarged marker on top of the station and pans to it.
    pub fn highlight(&mut self, index: usize) {
        let Some(position) = self.entries.get(index).map(|entry| entry.station.position()) else {
            return;
        };
        self.reset_highlight();
        let marker = self.provider.create_marker(position, Some(&HIGHLIGHT_ICON));
        self.provider.set_marker_z_index(&marker, HIGHLIGHT_Z_INDEX);
        self.provider.show_marker(&marker);
        self.provider.pan_to(position);
        self.highlight = Some(Highlight { index, marker });
    }

    pub fn reset_highlight(&mut self) {
        if let Some(highlight) = self.highlight.take() {
            self.provider.remove_marker(&highlight.marker);
        }
    }

    fn handles(&self) -> Vec<(usize, P::Marker, P::Overlay)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, entry)| (index, entry.marker.clone(), entry.overlay.clone()))
            .collect()
    }
}

/// Runs `callback` after `delay_ms`; the browser build backs this with a
/// `gloo_timers` timeout.
pub type Scheduler = Rc<dyn Fn(u32, Box<dyn FnOnce()>)>;

/// Renders `stations` and wires pointer behaviour: hover opens the card,
/// leaving closes it after a short delay, clicking announces the station.
pub fn render_stations<P: MapProvider + 'static>(
    layer: &Rc<RefCell<StationLayer<P>>>,
    stations: Vec<Station>,
    bus: &EventBus,
    schedule: &Scheduler,
) -> usize {
    let (count, handles, provider) = {
        let mut borrowed = layer.borrow_mut();
        let count = borrowed.render(stations);
        (count, borrowed.handles(), borrowed.provider.clone())
    };

    for (index, marker, overlay) in handles {
        let weak = Rc::downgrade(layer);
        provider.on_marker(&marker, PointerEvent::Enter, {
            let weak = weak.clone();
            Rc::new(move || {
                with_layer(&weak, |layer| layer.hover(index));
            })
        });

        let leave = leave_handler(&weak, schedule);
        provider.on_marker(&marker, PointerEvent::Leave, leave.clone());
        provider.on_overlay(&overlay, PointerEvent::Leave, leave);

        provider.on_overlay(&overlay, PointerEvent::Enter, {
            let weak = weak.clone();
            Rc::new(move || {
                with_layer(&weak, |layer| layer.card_enter());
            })
        });

        let click = select_handler(&weak, index, bus);
        provider.on_marker(&marker, PointerEvent::Click, click.clone());
        provider.on_overlay(&overlay, PointerEvent::Click, click);
    }
    count
}

fn with_layer<P: MapProvider, R>(
    weak: &Weak<RefCell<StationLayer<P>>>,
    action: impl FnOnce(&mut StationLayer<P>) -> R,
) -> Option<R> {
    let layer = weak.upgrade()?;
    let mut borrowed = layer.borrow_mut();
    Some(action(&mut borrowed))
}

fn leave_handler<P: MapProvider + 'static>(
    weak: &Weak<RefCell<StationLayer<P>>>,
    schedule: &Scheduler,
) -> Rc<dyn Fn()> {
    let weak = weak.clone();
    let schedule = schedule.clone();
    Rc::new(move || {
        let Some(Some(ticket)) = with_layer(&weak, |layer| layer.leave()) else {
            return;
        };
        let weak = weak.clone();
        schedule(
            HOVER_CLOSE_DELAY_MS,
            Box::new(move || {
                with_layer(&weak, |layer| layer.redeem(ticket));
            }),
        );
    })
}

fn select_handler<P: MapProvider + 'static>(
    weak: &Weak<RefCell<StationLayer<P>>>,
    index: usize,
    bus: &EventBus,
) -> Rc<dyn Fn()> {
    let weak = weak.clone();
    let bus = bus.clone();
    Rc::new(move || {
        // The layer borrow ends before listeners run; they touch the layer too.
        if let Some(Some(station)) = with_layer(&weak, |layer| layer.select(index)) {
            bus.emit(AppEvent::StationSelected(station));
        }
    })
}

/// Info card shown above a hovered marker.
pub fn info_card_html(station: &Station) -> String {
    let status_class = if station.is_closed() {
        "info-status is-closed"
    } else {
        "info-status"
    };
    format!(
        concat!(
            "<div class=\"info-window\">",
            "<div class=\"info-img\"><img src=\"{image}\" width=\"234\" height=\"110\" ",
            "onerror=\"this.src='{fallback}'\"></div>",
            "<div class=\"info-body\">",
            "<div class=\"info-name\">{name}</div>",
            "<div class=\"info-addr\">{address}</div>",
            "<div class=\"{status_class}\"><span>{status}</span></div>",
            "</div></div>"
        ),
        image = escape_html(&station.image_url),
        fallback = escape_html(&default_image_url()),
        name = escape_html(&station.name),
        address = escape_html(&station.address),
        status_class = status_class,
        status = escape_html(&station.status),
    )
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuxKind {
    Vehicle,
    Ev,
}

impl AuxKind {
    fn heat_style(self) -> ShapeStyle {
        match self {
            AuxKind::Vehicle => ShapeStyle {
                stroke_weight: 0,
                stroke_color: "#FF5722",
                stroke_opacity: 0.0,
                fill_color: "#FF5722",
                fill_opacity: 0.15,
            },
            AuxKind::Ev => ShapeStyle {
                stroke_weight: 0,
                stroke_color: "#1E88E5",
                stroke_opacity: 0.0,
                fill_color: "#1E88E5",
                fill_opacity: 0.18,
            },
        }
    }
}

const BUFFER_STYLE: ShapeStyle = ShapeStyle {
    stroke_weight: 2,
    stroke_color: "#2563EB",
    stroke_opacity: 0.8,
    fill_color: "#2563EB",
    fill_opacity: 0.08,
};

struct AuxSet<P: MapProvider> {
    markers: Vec<P::Marker>,
    circles: Vec<P::Shape>,
    visible: bool,
    /// Fetch whose result this set is waiting for.
    pending: Option<u64>,
}

impl<P: MapProvider> AuxSet<P> {
    fn new() -> Self {
        Self {
            markers: Vec::new(),
            circles: Vec::new(),
            visible: false,
            pending: None,
        }
    }

    fn clear(&mut self, provider: &P) {
        for marker in self.markers.drain(..) {
            provider.remove_marker(&marker);
        }
        for circle in self.circles.drain(..) {
            provider.remove_shape(&circle);
        }
        self.visible = false;
        self.pending = None;
    }
}

/// Outcome of pressing a vehicle/EV toggle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToggleStep {
    /// The set was visible, or its fetch was still running, and is now gone.
    Cleared,
    /// The set is hidden; fetch points, then [`AuxLayers::settle`] the id
    /// before calling [`AuxLayers::show`].
    NeedsFetch(u64),
}

/// Vehicle and EV point sets plus the radius buffer, all scoped to the
/// feature panel.
pub struct AuxLayers<P: MapProvider> {
    provider: Rc<P>,
    vehicle: AuxSet<P>,
    ev: AuxSet<P>,
    buffer: Option<P::Shape>,
    next_fetch: u64,
}

impl<P: MapProvider> AuxLayers<P> {
    pub fn new(provider: Rc<P>) -> Self {
        Self {
            provider,
            vehicle: AuxSet::new(),
            ev: AuxSet::new(),
            buffer: None,
            next_fetch: 0,
        }
    }

    fn set(&mut self, kind: AuxKind) -> &mut AuxSet<P> {
        match kind {
            AuxKind::Vehicle => &mut self.vehicle,
            AuxKind::Ev => &mut self.ev,
        }
    }

    pub fn is_visible(&self, kind: AuxKind) -> bool {
        match kind {
            AuxKind::Vehicle => self.vehicle.visible,
            AuxKind::Ev => self.ev.visible,
        }
    }

    pub fn is_pending(&self, kind: AuxKind) -> bool {
        match kind {
            AuxKind::Vehicle => self.vehicle.pending.is_some(),
            AuxKind::Ev => self.ev.pending.is_some(),
        }
    }

    /// A press while a fetch is still out cancels it.
    pub fn toggle(&mut self, kind: AuxKind) -> ToggleStep {
        if self.is_visible(kind) || self.is_pending(kind) {
            self.clear(kind);
            return ToggleStep::Cleared;
        }
        self.next_fetch += 1;
        let fetch = self.next_fetch;
        self.set(kind).pending = Some(fetch);
        ToggleStep::NeedsFetch(fetch)
    }

    /// Marks `fetch` as answered. False when it was cancelled or superseded,
    /// in which case the result must not be drawn.
    pub fn settle(&mut self, kind: AuxKind, fetch: u64) -> bool {
        let set = self.set(kind);
        if set.pending != Some(fetch) {
            return false;
        }
        set.pending = None;
        true
    }

    /// Draws a point marker and a translucent circle per point, replacing
    /// whatever the set showed before.
    pub fn show(&mut self, kind: AuxKind, points: &[LatLng]) {
        let provider = self.provider.clone();
        let style = kind.heat_style();
        let set = self.set(kind);
        set.clear(&provider);
        for point in points {
            let marker = provider.create_marker(*point, None);
            provider.show_marker(&marker);
            set.markers.push(marker);
            set.circles.push(provider.draw_circle(*point, HEAT_RADIUS_M, &style));
        }
        set.visible = true;
    }

    pub fn clear(&mut self, kind: AuxKind) {
        let provider = self.provider.clone();
        self.set(kind).clear(&provider);
    }

    pub fn draw_buffer(&mut self, center: LatLng) {
        self.clear_buffer();
        self.buffer = Some(self.provider.draw_circle(center, BUFFER_RADIUS_M, &BUFFER_STYLE));
    }

    pub fn clear_buffer(&mut self) {
        if let Some(buffer) = self.buffer.take() {
            self.provider.remove_shape(&buffer);
        }
    }

    pub fn clear_all(&mut self) {
        self.clear(AuxKind::Vehicle);
        self.clear(AuxKind::Ev);
        self.clear_buffer();
    }

    /// Markers and shapes this layer still has on the map.
    pub fn residual(&self) -> usize {
        self.vehicle.markers.len()
            + self.vehicle.circles.len()
            + self.ev.markers.len()
            + self.ev.circles.len()
            + usize::from(self.buffer.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockId, MockMap, MockShape};
    use serde_json::json;

    fn station(lat: f64, lng: f64, name: &str) -> Station {
        Station::from_record(&json!({"lat": lat, "lng": lng, "name": name})).unwrap()
    }

    fn layer_with(stations: Vec<Station>) -> (Rc<MockMap>, Rc<RefCell<StationLayer<MockMap>>>, EventBus, Rc<RefCell<Vec<Box<dyn FnOnce()>>>>) {
        let map = Rc::new(MockMap::default());
        let layer = Rc::new(RefCell::new(StationLayer::new(map.clone())));
        let bus = EventBus::new();
        let queued: Rc<RefCell<Vec<Box<dyn FnOnce()>>>> = Rc::new(RefCell::new(Vec::new()));
        let schedule: Scheduler = {
            let queued = queued.clone();
            Rc::new(move |_delay, callback| queued.borrow_mut().push(callback))
        };
        render_stations(&layer, stations, &bus, &schedule);
        (map, layer, bus, queued)
    }

    fn run_timers(queued: &Rc<RefCell<Vec<Box<dyn FnOnce()>>>>) {
        let callbacks: Vec<_> = queued.borrow_mut().drain(..).collect();
        for callback in callbacks {
            callback();
        }
    }

    fn marker_ids(map: &MockMap) -> Vec<MockId> {
        map.state.borrow().clustered.clone()
    }

    fn overlay_ids(map: &MockMap) -> Vec<MockId> {
        map.state.borrow().overlays.keys().copied().collect()
    }

    #[test]
    fn invalid_coordinates_render_nothing() {
        let mut broken = station(36.0, 127.0, "broken");
        broken.lat = f64::NAN;
        let map = Rc::new(MockMap::default());
        let mut layer = StationLayer::new(map.clone());
        assert_eq!(layer.render(vec![broken]), 0);
        assert_eq!(map.markers_on_map(), 0);
    }

    #[test]
    fn render_replaces_previous_markers() {
        let (map, layer, _bus, _) = layer_with(vec![station(36.0, 127.0, "a"), station(36.1, 127.1, "b")]);
        assert_eq!(map.markers_on_map(), 2);
        layer.borrow_mut().render(vec![station(35.0, 129.0, "c")]);
        assert_eq!(map.markers_on_map(), 1);
        assert_eq!(layer.borrow().len(), 1);
    }

    #[test]
    fn hovering_a_second_marker_closes_the_first_card() {
        let (map, layer, _bus, _) = layer_with(vec![station(36.0, 127.0, "a"), station(36.1, 127.1, "b")]);
        let markers = marker_ids(&map);
        map.fire_marker(markers[0], PointerEvent::Enter);
        assert_eq!(map.visible_overlays().len(), 1);
        map.fire_marker(markers[1], PointerEvent::Enter);
        assert_eq!(map.visible_overlays().len(), 1);
        assert_eq!(layer.borrow().open_card(), Some(1));
    }

    #[test]
    fn leaving_closes_after_the_delay() {
        let (map, layer, _bus, queued) = layer_with(vec![station(36.0, 127.0, "a")]);
        let marker = marker_ids(&map)[0];
        map.fire_marker(marker, PointerEvent::Enter);
        map.fire_marker(marker, PointerEvent::Leave);
        assert_eq!(map.visible_overlays().len(), 1);
        run_timers(&queued);
        assert!(map.visible_overlays().is_empty());
        assert_eq!(layer.borrow().open_card(), None);
    }

    #[test]
    fn entering_the_card_keeps_it_open() {
        let (map, _layer, _bus, queued) = layer_with(vec![station(36.0, 127.0, "a")]);
        let marker = marker_ids(&map)[0];
        let overlay = overlay_ids(&map)[0];
        map.fire_marker(marker, PointerEvent::Enter);
        map.fire_marker(marker, PointerEvent::Leave);
        map.fire_overlay(overlay, PointerEvent::Enter);
        run_timers(&queued);
        assert_eq!(map.visible_overlays(), vec![overlay]);

        map.fire_overlay(overlay, PointerEvent::Leave);
        run_timers(&queued);
        assert!(map.visible_overlays().is_empty());
    }

    #[test]
    fn stale_close_ticket_does_not_close_a_newer_card() {
        let (map, _layer, _bus, queued) = layer_with(vec![station(36.0, 127.0, "a"), station(36.1, 127.1, "b")]);
        let markers = marker_ids(&map);
        map.fire_marker(markers[0], PointerEvent::Enter);
        map.fire_marker(markers[0], PointerEvent::Leave);
        map.fire_marker(markers[1], PointerEvent::Enter);
        run_timers(&queued);
        assert_eq!(map.visible_overlays().len(), 1);
    }

    #[test]
    fn clicking_a_card_announces_the_station() {
        let (map, _layer, bus, _) = layer_with(vec![station(36.123456, 127.987654, "a")]);
        let seen = Rc::new(RefCell::new(Vec::new()));
        {
            let seen = seen.clone();
            bus.subscribe(move |event| seen.borrow_mut().push(event.clone()));
        }
        let marker = marker_ids(&map)[0];
        let overlay = overlay_ids(&map)[0];
        map.fire_marker(marker, PointerEvent::Enter);
        map.fire_overlay(overlay, PointerEvent::Click);
        assert!(map.visible_overlays().is_empty());
        match &seen.borrow()[0] {
            AppEvent::StationSelected(selected) => assert_eq!(selected.id(), "36123456_127987654"),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn only_one_marker_is_highlighted() {
        let (map, layer, _bus, _) = layer_with(vec![station(36.0, 127.0, "a"), station(36.1, 127.1, "b")]);
        assert!(layer.borrow_mut().highlight_at(LatLng::new(36.0, 127.0), SELECTION_TOLERANCE));
        assert!(layer.borrow_mut().highlight_at(LatLng::new(36.1, 127.1), SELECTION_TOLERANCE));
        assert_eq!(map.state.borrow().shown.len(), 1);
        assert_eq!(layer.borrow().highlighted(), Some(1));
        let shown = *map.state.borrow().shown.iter().next().unwrap();
        let highlight = map.marker(shown);
        assert_eq!(highlight.icon, Some(HIGHLIGHT_ICON));
        assert_eq!(highlight.z_index, HIGHLIGHT_Z_INDEX);
        assert_eq!(map.state.borrow().panned.last(), Some(&LatLng::new(36.1, 127.1)));

        layer.borrow_mut().reset_highlight();
        assert!(map.state.borrow().shown.is_empty());
    }

    #[test]
    fn highlight_misses_outside_tolerance() {
        let (_map, layer, _bus, _) = layer_with(vec![station(36.0, 127.0, "a")]);
        assert!(!layer.borrow_mut().highlight_at(LatLng::new(36.001, 127.0), SUGGESTION_TOLERANCE));
        assert_eq!(layer.borrow().highlighted(), None);
    }

    #[test]
    fn card_markup_is_escaped() {
        let html = info_card_html(&station(36.0, 127.0, "<b>A&B</b>"));
        assert!(html.contains("&lt;b&gt;A&amp;B&lt;/b&gt;"));
        assert!(html.contains("default.jpg"));
    }

    #[test]
    fn toggling_vehicle_twice_leaves_nothing_behind() {
        let map = Rc::new(MockMap::default());
        let mut aux = AuxLayers::new(map.clone());
        let ToggleStep::NeedsFetch(fetch) = aux.toggle(AuxKind::Vehicle) else {
            panic!("expected a fetch");
        };
        assert!(aux.settle(AuxKind::Vehicle, fetch));
        aux.show(AuxKind::Vehicle, &[LatLng::new(36.0, 127.0), LatLng::new(36.01, 127.01)]);
        assert_eq!(map.markers_on_map(), 2);
        assert_eq!(map.live_shapes(), 2);

        assert_eq!(aux.toggle(AuxKind::Vehicle), ToggleStep::Cleared);
        assert_eq!(map.markers_on_map(), 0);
        assert_eq!(map.live_shapes(), 0);
        assert_eq!(aux.residual(), 0);
        assert!(!aux.is_visible(AuxKind::Vehicle));
    }

    #[test]
    fn pressing_again_before_the_fetch_returns_cancels_it() {
        let map = Rc::new(MockMap::default());
        let mut aux = AuxLayers::new(map.clone());
        let ToggleStep::NeedsFetch(first) = aux.toggle(AuxKind::Ev) else {
            panic!("expected a fetch");
        };
        assert!(aux.is_pending(AuxKind::Ev));
        assert_eq!(aux.toggle(AuxKind::Ev), ToggleStep::Cleared);
        assert!(!aux.is_pending(AuxKind::Ev));
        assert!(!aux.settle(AuxKind::Ev, first));

        let ToggleStep::NeedsFetch(second) = aux.toggle(AuxKind::Ev) else {
            panic!("expected a fetch");
        };
        assert_ne!(first, second);
        aux.clear_all();
        assert!(!aux.settle(AuxKind::Ev, second));
        assert_eq!(map.markers_on_map(), 0);
    }

    #[test]
    fn showing_again_replaces_the_previous_set() {
        let map = Rc::new(MockMap::default());
        let mut aux = AuxLayers::new(map.clone());
        aux.show(AuxKind::Ev, &[LatLng::new(36.0, 127.0); 3]);
        aux.show(AuxKind::Ev, &[LatLng::new(36.0, 127.0)]);
        assert_eq!(map.markers_on_map(), 1);
        assert_eq!(map.live_shapes(), 1);
        let colors: Vec<_> = map
            .state
            .borrow()
            .shapes
            .values()
            .map(|shape| match shape {
                MockShape::Circle { fill_color, .. } => *fill_color,
                MockShape::Polygon { .. } => "polygon",
            })
            .collect();
        assert_eq!(colors, vec!["#1E88E5"]);
    }

    #[test]
    fn buffer_is_single_and_cleared_with_everything_else() {
        let map = Rc::new(MockMap::default());
        let mut aux = AuxLayers::new(map.clone());
        aux.draw_buffer(LatLng::new(36.0, 127.0));
        aux.draw_buffer(LatLng::new(36.5, 127.5));
        assert_eq!(map.live_shapes(), 1);
        aux.show(AuxKind::Vehicle, &[LatLng::new(36.0, 127.0)]);
        aux.clear_all();
        assert_eq!(map.live_shapes(), 0);
        assert_eq!(map.markers_on_map(), 0);
        assert_eq!(aux.residual(), 0);
    }
}
