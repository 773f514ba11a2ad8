//! Map capabilities the rest of the client relies on.
//!
//! The Kakao SDK is only reached through [`MapProvider`]; tests drive the
//! same layers with a recording mock.

use std::rc::Rc;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn near(&self, other: &LatLng, tolerance: f64) -> bool {
        (self.lat - other.lat).abs() < tolerance && (self.lng - other.lng).abs() < tolerance
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub south_west: LatLng,
    pub north_east: LatLng,
}

impl Bounds {
    /// Normalizes two arbitrary corners into south-west / north-east order.
    pub fn from_corners(a: LatLng, b: LatLng) -> Self {
        Self {
            south_west: LatLng::new(a.lat.min(b.lat), a.lng.min(b.lng)),
            north_east: LatLng::new(a.lat.max(b.lat), a.lng.max(b.lng)),
        }
    }

    pub fn around(points: impl IntoIterator<Item = LatLng>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        Some(points.fold(Self::from_corners(first, first), |bounds, point| {
            bounds.extend(point)
        }))
    }

    pub fn extend(self, point: LatLng) -> Self {
        Self {
            south_west: LatLng::new(
                self.south_west.lat.min(point.lat),
                self.south_west.lng.min(point.lng),
            ),
            north_east: LatLng::new(
                self.north_east.lat.max(point.lat),
                self.north_east.lng.max(point.lng),
            ),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MarkerIcon {
    pub url: &'static str,
    pub size: (u32, u32),
    pub offset: (u32, u32),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ShapeStyle {
    pub stroke_weight: u32,
    pub stroke_color: &'static str,
    pub stroke_opacity: f64,
    pub fill_color: &'static str,
    pub fill_opacity: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PointerEvent {
    Enter,
    Leave,
    Click,
}

pub type Handler = Rc<dyn Fn()>;

pub trait MapProvider {
    type Marker: Clone;
    type Overlay: Clone;
    type Shape: Clone;

    /// Creates a marker that is not yet on the map.
    fn create_marker(&self, position: LatLng, icon: Option<&MarkerIcon>) -> Self::Marker;
    fn set_marker_z_index(&self, marker: &Self::Marker, z_index: i32);
    /// Puts a marker directly on the map, outside the clusterer.
    fn show_marker(&self, marker: &Self::Marker);
    fn remove_marker(&self, marker: &Self::Marker);

    fn cluster(&self, markers: &[Self::Marker]);
    fn clear_cluster(&self);

    /// Creates an overlay card anchored above `position`; hidden until shown.
    fn create_overlay(&self, position: LatLng, content_html: &str) -> Self::Overlay;
    fn show_overlay(&self, overlay: &Self::Overlay);
    fn hide_overlay(&self, overlay: &Self::Overlay);

    fn draw_circle(&self, center: LatLng, radius_m: f64, style: &ShapeStyle) -> Self::Shape;
    /// Draws one polygon; the first ring is the outline, the rest are holes.
    fn draw_polygon(&self, rings: &[Vec<LatLng>], style: &ShapeStyle) -> Self::Shape;
    fn remove_shape(&self, shape: &Self::Shape);

    fn pan_to(&self, position: LatLng);
    fn set_level(&self, level: u8);
    fn fit_bounds(&self, bounds: Bounds);
    fn bounds(&self) -> Option<Bounds>;

    fn on_marker(&self, marker: &Self::Marker, event: PointerEvent, handler: Handler);
    fn on_overlay(&self, overlay: &Self::Overlay, event: PointerEvent, handler: Handler);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corners_are_normalized() {
        let bounds = Bounds::from_corners(LatLng::new(37.0, 128.0), LatLng::new(36.0, 127.0));
        assert_eq!(bounds.south_west, LatLng::new(36.0, 127.0));
        assert_eq!(bounds.north_east, LatLng::new(37.0, 128.0));
    }

    #[test]
    fn bounds_cover_every_point() {
        let bounds = Bounds::around([
            LatLng::new(35.1, 129.0),
            LatLng::new(37.5, 126.9),
            LatLng::new(33.4, 126.5),
        ])
        .unwrap();
        assert_eq!(bounds.south_west, LatLng::new(33.4, 126.5));
        assert_eq!(bounds.north_east, LatLng::new(37.5, 129.0));
        assert!(Bounds::around(Vec::new()).is_none());
    }

    #[test]
    fn near_uses_strict_tolerance() {
        let a = LatLng::new(36.0, 127.0);
        assert!(a.near(&LatLng::new(36.000_000_5, 127.0), 1e-6));
        assert!(!a.near(&LatLng::new(36.000_01, 127.0), 1e-6));
    }
}
