use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::provider::{Bounds, Handler, LatLng, MapProvider, MarkerIcon, PointerEvent, ShapeStyle};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MockId(pub u32);

#[derive(Clone, Debug)]
pub struct MockMarker {
    pub position: LatLng,
    pub icon: Option<MarkerIcon>,
    pub z_index: i32,
}

#[derive(Clone, Debug)]
pub struct MockOverlay {
    pub position: LatLng,
    pub html: String,
    pub visible: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum MockShape {
    Circle { center: LatLng, radius_m: f64, fill_color: &'static str },
    Polygon { rings: usize },
}

#[derive(Default)]
pub struct MockState {
    next_id: u32,
    pub markers: BTreeMap<MockId, MockMarker>,
    pub shown: BTreeSet<MockId>,
    pub clustered: Vec<MockId>,
    pub overlays: BTreeMap<MockId, MockOverlay>,
    pub shapes: BTreeMap<MockId, MockShape>,
    pub panned: Vec<LatLng>,
    pub level: Option<u8>,
    pub fitted: Vec<Bounds>,
    pub view: Option<Bounds>,
    marker_handlers: HashMap<(MockId, PointerEvent), Handler>,
    overlay_handlers: HashMap<(MockId, PointerEvent), Handler>,
}

impl MockState {
    fn next(&mut self) -> MockId {
        self.next_id += 1;
        MockId(self.next_id)
    }
}

/// Records every call so tests can assert on what ended up on the map.
#[derive(Default)]
pub struct MockMap {
    pub state: RefCell<MockState>,
}

impl MockMap {
    /// Markers visible on the map, directly or through the clusterer.
    pub fn markers_on_map(&self) -> usize {
        let state = self.state.borrow();
        state.shown.len() + state.clustered.len()
    }

    pub fn visible_overlays(&self) -> Vec<MockId> {
        self.state
            .borrow()
            .overlays
            .iter()
            .filter(|(_, overlay)| overlay.visible)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn live_shapes(&self) -> usize {
        self.state.borrow().shapes.len()
    }

    pub fn marker(&self, id: MockId) -> MockMarker {
        self.state.borrow().markers[&id].clone()
    }

    pub fn fire_marker(&self, id: MockId, event: PointerEvent) {
        let handler = self.state.borrow().marker_handlers.get(&(id, event)).cloned();
        if let Some(handler) = handler {
            handler();
        }
    }

    pub fn fire_overlay(&self, id: MockId, event: PointerEvent) {
        let handler = self.state.borrow().overlay_handlers.get(&(id, event)).cloned();
        if let Some(handler) = handler {
            handler();
        }
    }
}

impl MapProvider for MockMap {
    type Marker = MockId;
    type Overlay = MockId;
    type Shape = MockId;

    fn create_marker(&self, position: LatLng, icon: Option<&MarkerIcon>) -> MockId {
        let mut state = self.state.borrow_mut();
        let id = state.next();
        state.markers.insert(
            id,
            MockMarker {
                position,
                icon: icon.cloned(),
                z_index: 0,
            },
        );
        id
    }

    fn set_marker_z_index(&self, marker: &MockId, z_index: i32) {
        if let Some(entry) = self.state.borrow_mut().markers.get_mut(marker) {
            entry.z_index = z_index;
        }
    }

    fn show_marker(&self, marker: &MockId) {
        self.state.borrow_mut().shown.insert(*marker);
    }

    fn remove_marker(&self, marker: &MockId) {
        let mut state = self.state.borrow_mut();
        state.shown.remove(marker);
        state.clustered.retain(|id| id != marker);
    }

    fn cluster(&self, markers: &[MockId]) {
        self.state.borrow_mut().clustered.extend_from_slice(markers);
    }

    fn clear_cluster(&self) {
        self.state.borrow_mut().clustered.clear();
    }

    fn create_overlay(&self, position: LatLng, content_html: &str) -> MockId {
        let mut state = self.state.borrow_mut();
        let id = state.next();
        state.overlays.insert(
            id,
            MockOverlay {
                position,
                html: content_html.to_string(),
                visible: false,
            },
        );
        id
    }

    fn show_overlay(&self, overlay: &MockId) {
        if let Some(entry) = self.state.borrow_mut().overlays.get_mut(overlay) {
            entry.visible = true;
        }
    }

    fn hide_overlay(&self, overlay: &MockId) {
        if let Some(entry) = self.state.borrow_mut().overlays.get_mut(overlay) {
            entry.visible = false;
        }
    }

    fn draw_circle(&self, center: LatLng, radius_m: f64, style: &ShapeStyle) -> MockId {
        let mut state = self.state.borrow_mut();
        let id = state.next();
        state.shapes.insert(
            id,
            MockShape::Circle {
                center,
                radius_m,
                fill_color: style.fill_color,
            },
        );
        id
    }

    fn draw_polygon(&self, rings: &[Vec<LatLng>], _style: &ShapeStyle) -> MockId {
        let mut state = self.state.borrow_mut();
        let id = state.next();
        state.shapes.insert(id, MockShape::Polygon { rings: rings.len() });
        id
    }

    fn remove_shape(&self, shape: &MockId) {
        self.state.borrow_mut().shapes.remove(shape);
    }

    fn pan_to(&self, position: LatLng) {
        self.state.borrow_mut().panned.push(position);
    }

    fn set_level(&self, level: u8) {
        self.state.borrow_mut().level = Some(level);
    }

    fn fit_bounds(&self, bounds: Bounds) {
        self.state.borrow_mut().fitted.push(bounds);
    }

    fn bounds(&self) -> Option<Bounds> {
        self.state.borrow().view
    }

    fn on_marker(&self, marker: &MockId, event: PointerEvent, handler: Handler) {
        self.state
            .borrow_mut()
            .marker_handlers
            .insert((*marker, event), handler);
    }

    fn on_overlay(&self, overlay: &MockId, event: PointerEvent, handler: Handler) {
        self.state
            .borrow_mut()
            .overlay_handlers
            .insert((*overlay, event), handler);
    }
}
