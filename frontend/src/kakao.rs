//! Kakao Maps SDK behind [`MapProvider`], plus the SDK loader and the
//! roadview widget.

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::{Array, Promise};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Element, HtmlElement, HtmlScriptElement};

use crate::config::{CLUSTER_MIN_LEVEL, CLUSTER_MIN_SIZE, ROADVIEW_SEARCH_RADIUS_M, sdk_url};
use crate::js::{call_method, construct, get_path, object};
use crate::provider::{Bounds, Handler, LatLng, MapProvider, MarkerIcon, PointerEvent, ShapeStyle};

type Listeners = Rc<RefCell<Vec<Closure<dyn Fn()>>>>;

/// Injects the SDK script and resolves once `kakao.maps.load` has run.
pub async fn load_sdk(app_key: &str) -> Result<(), JsValue> {
    let document = web_sys::window()
        .and_then(|window| window.document())
        .ok_or_else(|| JsValue::from_str("no document"))?;
    let head = document.head().ok_or_else(|| JsValue::from_str("no head"))?;
    let script: HtmlScriptElement = document.create_element("script")?.dyn_into()?;
    script.set_src(&sdk_url(app_key));

    let loaded = Promise::new(&mut |resolve, reject| {
        script.set_onload(Some(&resolve));
        script.set_onerror(Some(&reject));
    });
    head.append_child(&script)?;
    JsFuture::from(loaded).await?;

    let maps = get_path(&js_sys::global(), &["kakao", "maps"])?;
    let ready = Promise::new(&mut |resolve, _reject| {
        if let Err(err) = call_method(&maps, "load", &[resolve.into()]) {
            web_sys::console::error_2(&"kakao.maps.load failed".into(), &err);
        }
    });
    JsFuture::from(ready).await?;
    Ok(())
}

#[derive(Clone)]
pub struct KakaoMarker {
    inner: JsValue,
    listeners: Listeners,
}

#[derive(Clone)]
pub struct KakaoOverlay {
    inner: JsValue,
    content: Option<Element>,
    listeners: Listeners,
}

#[derive(Clone)]
pub struct KakaoShape(JsValue);

pub struct KakaoMap {
    maps: JsValue,
    map: JsValue,
    clusterer: JsValue,
    listeners: RefCell<Vec<Closure<dyn Fn()>>>,
}

impl KakaoMap {
    pub fn new(container: &HtmlElement, center: LatLng, level: u8) -> Result<Self, JsValue> {
        let maps = get_path(&js_sys::global(), &["kakao", "maps"])?;
        let center = lat_lng(&maps, center)?;
        let options = object(&[("center", center), ("level", JsValue::from(level))]);
        let map = construct(&maps, "Map", &[container.clone().into(), options.into()])?;

        let clusterer_options = object(&[
            ("map", map.clone()),
            ("averageCenter", JsValue::TRUE),
            ("minLevel", JsValue::from(CLUSTER_MIN_LEVEL)),
            ("minClusterSize", JsValue::from(CLUSTER_MIN_SIZE)),
        ]);
        let clusterer = construct(&maps, "MarkerClusterer", &[clusterer_options.into()])?;

        Ok(Self {
            maps,
            map,
            clusterer,
            listeners: RefCell::new(Vec::new()),
        })
    }

    /// Clicks on empty map area.
    pub fn on_click(&self, handler: impl Fn() + 'static) {
        let callback = Closure::<dyn Fn()>::new(handler);
        self.add_listener(&self.map, "click", &callback);
        self.listeners.borrow_mut().push(callback);
    }

    fn add_listener(&self, target: &JsValue, event: &str, callback: &Closure<dyn Fn()>) {
        let result = get_path(&self.maps, &["event"]).and_then(|events| {
            call_method(
                &events,
                "addListener",
                &[target.clone(), JsValue::from_str(event), callback.as_ref().clone()],
            )
        });
        if let Err(err) = result {
            web_sys::console::warn_2(&format!("addListener({event}) failed").into(), &err);
        }
    }

    fn lat_lng(&self, position: LatLng) -> JsValue {
        lat_lng(&self.maps, position).unwrap_or(JsValue::NULL)
    }

    fn marker_image(&self, icon: &MarkerIcon) -> Result<JsValue, JsValue> {
        let size = construct(
            &self.maps,
            "Size",
            &[JsValue::from(icon.size.0), JsValue::from(icon.size.1)],
        )?;
        let offset = construct(
            &self.maps,
            "Point",
            &[JsValue::from(icon.offset.0), JsValue::from(icon.offset.1)],
        )?;
        let options = object(&[("offset", offset)]);
        construct(
            &self.maps,
            "MarkerImage",
            &[JsValue::from_str(icon.url), size, options.into()],
        )
    }

    fn shape_options(&self, style: &ShapeStyle) -> Vec<(&'static str, JsValue)> {
        vec![
            ("strokeWeight", JsValue::from(style.stroke_weight)),
            ("strokeColor", JsValue::from_str(style.stroke_color)),
            ("strokeOpacity", JsValue::from_f64(style.stroke_opacity)),
            ("fillColor", JsValue::from_str(style.fill_color)),
            ("fillOpacity", JsValue::from_f64(style.fill_opacity)),
        ]
    }

    fn attach(&self, target: &JsValue) {
        log_failure("setMap", call_method(target, "setMap", &[self.map.clone()]));
    }

    fn detach(target: &JsValue) {
        log_failure("setMap(null)", call_method(target, "setMap", &[JsValue::NULL]));
    }

    pub fn relayout(&self) {
        call_method(&self.map, "relayout", &[]).ok();
    }
}

impl MapProvider for KakaoMap {
    type Marker = KakaoMarker;
    type Overlay = KakaoOverlay;
    type Shape = KakaoShape;

    fn create_marker(&self, position: LatLng, icon: Option<&MarkerIcon>) -> KakaoMarker {
        let mut options = vec![("position", self.lat_lng(position))];
        if let Some(icon) = icon {
            match self.marker_image(icon) {
                Ok(image) => options.push(("image", image)),
                Err(err) => web_sys::console::warn_2(&"marker image failed".into(), &err),
            }
        }
        let inner = construct(&self.maps, "Marker", &[object(&options).into()]).unwrap_or_else(|err| {
            web_sys::console::error_2(&"marker creation failed".into(), &err);
            JsValue::NULL
        });
        KakaoMarker {
            inner,
            listeners: Rc::default(),
        }
    }

    fn set_marker_z_index(&self, marker: &KakaoMarker, z_index: i32) {
        call_method(&marker.inner, "setZIndex", &[JsValue::from(z_index)]).ok();
    }

    fn show_marker(&self, marker: &KakaoMarker) {
        self.attach(&marker.inner);
    }

    fn remove_marker(&self, marker: &KakaoMarker) {
        call_method(&self.clusterer, "removeMarker", &[marker.inner.clone()]).ok();
        Self::detach(&marker.inner);
    }

    fn cluster(&self, markers: &[KakaoMarker]) {
        let array: Array = markers.iter().map(|marker| marker.inner.clone()).collect();
        log_failure("addMarkers", call_method(&self.clusterer, "addMarkers", &[array.into()]));
    }

    fn clear_cluster(&self) {
        call_method(&self.clusterer, "clear", &[]).ok();
    }

    fn create_overlay(&self, position: LatLng, content_html: &str) -> KakaoOverlay {
        let content = web_sys::window()
            .and_then(|window| window.document())
            .and_then(|document| document.create_element("div").ok());
        let Some(content) = content else {
            web_sys::console::error_1(&"overlay content element unavailable".into());
            return KakaoOverlay {
                inner: JsValue::NULL,
                content: None,
                listeners: Rc::default(),
            };
        };
        content.set_inner_html(content_html);
        let options = object(&[
            ("position", self.lat_lng(position)),
            ("content", content.clone().into()),
            ("yAnchor", JsValue::from_f64(1.3)),
            ("zIndex", JsValue::from(3)),
            ("clickable", JsValue::TRUE),
        ]);
        let inner = construct(&self.maps, "CustomOverlay", &[options.into()]).unwrap_or(JsValue::NULL);
        KakaoOverlay {
            inner,
            content: Some(content),
            listeners: Rc::default(),
        }
    }

    fn show_overlay(&self, overlay: &KakaoOverlay) {
        self.attach(&overlay.inner);
    }

    fn hide_overlay(&self, overlay: &KakaoOverlay) {
        Self::detach(&overlay.inner);
    }

    fn draw_circle(&self, center: LatLng, radius_m: f64, style: &ShapeStyle) -> KakaoShape {
        let mut options = self.shape_options(style);
        options.push(("center", self.lat_lng(center)));
        options.push(("radius", JsValue::from_f64(radius_m)));
        let circle = construct(&self.maps, "Circle", &[object(&options).into()]).unwrap_or(JsValue::NULL);
        self.attach(&circle);
        KakaoShape(circle)
    }

    fn draw_polygon(&self, rings: &[Vec<LatLng>], style: &ShapeStyle) -> KakaoShape {
        let path: Array = rings
            .iter()
            .map(|ring| -> JsValue {
                ring.iter()
                    .map(|point| self.lat_lng(*point))
                    .collect::<Array>()
                    .into()
            })
            .collect();
        let mut options = self.shape_options(style);
        options.push(("path", path.into()));
        let polygon = construct(&self.maps, "Polygon", &[object(&options).into()]).unwrap_or(JsValue::NULL);
        self.attach(&polygon);
        KakaoShape(polygon)
    }

    fn remove_shape(&self, shape: &KakaoShape) {
        Self::detach(&shape.0);
    }

    fn pan_to(&self, position: LatLng) {
        call_method(&self.map, "panTo", &[self.lat_lng(position)]).ok();
    }

    fn set_level(&self, level: u8) {
        call_method(&self.map, "setLevel", &[JsValue::from(level)]).ok();
    }

    fn fit_bounds(&self, bounds: Bounds) {
        let result = construct(
            &self.maps,
            "LatLngBounds",
            &[self.lat_lng(bounds.south_west), self.lat_lng(bounds.north_east)],
        )
        .and_then(|bounds| call_method(&self.map, "setBounds", &[bounds]));
        log_failure("setBounds", result);
    }

    fn bounds(&self) -> Option<Bounds> {
        let bounds = call_method(&self.map, "getBounds", &[]).ok()?;
        let south_west = read_lat_lng(&call_method(&bounds, "getSouthWest", &[]).ok()?)?;
        let north_east = read_lat_lng(&call_method(&bounds, "getNorthEast", &[]).ok()?)?;
        Some(Bounds::from_corners(south_west, north_east))
    }

    fn on_marker(&self, marker: &KakaoMarker, event: PointerEvent, handler: Handler) {
        let name = match event {
            PointerEvent::Enter => "mouseover",
            PointerEvent::Leave => "mouseout",
            PointerEvent::Click => "click",
        };
        let callback = Closure::<dyn Fn()>::new(move || handler());
        self.add_listener(&marker.inner, name, &callback);
        marker.listeners.borrow_mut().push(callback);
    }

    fn on_overlay(&self, overlay: &KakaoOverlay, event: PointerEvent, handler: Handler) {
        let name = match event {
            PointerEvent::Enter => "mouseenter",
            PointerEvent::Leave => "mouseleave",
            PointerEvent::Click => "click",
        };
        let Some(content) = &overlay.content else {
            return;
        };
        let callback = Closure::<dyn Fn()>::new(move || handler());
        if content
            .add_event_listener_with_callback(name, callback.as_ref().unchecked_ref())
            .is_ok()
        {
            overlay.listeners.borrow_mut().push(callback);
        }
    }
}

fn lat_lng(maps: &JsValue, position: LatLng) -> Result<JsValue, JsValue> {
    construct(
        maps,
        "LatLng",
        &[JsValue::from_f64(position.lat), JsValue::from_f64(position.lng)],
    )
}

fn read_lat_lng(value: &JsValue) -> Option<LatLng> {
    let lat = call_method(value, "getLat", &[]).ok()?.as_f64()?;
    let lng = call_method(value, "getLng", &[]).ok()?.as_f64()?;
    Some(LatLng::new(lat, lng))
}

fn log_failure(what: &str, result: Result<JsValue, JsValue>) {
    if let Err(err) = result {
        web_sys::console::warn_2(&format!("kakao {what} failed").into(), &err);
    }
}

/// Street-level panorama shown next to the map for the selected station.
pub struct Roadview {
    maps: JsValue,
    container: HtmlElement,
    roadview: JsValue,
    client: JsValue,
}

impl Roadview {
    pub fn new(container: HtmlElement) -> Result<Self, JsValue> {
        let maps = get_path(&js_sys::global(), &["kakao", "maps"])?;
        let roadview = construct(&maps, "Roadview", &[container.clone().into()])?;
        let client = construct(&maps, "RoadviewClient", &[])?;
        Ok(Self {
            maps,
            container,
            roadview,
            client,
        })
    }

    /// Looks up the nearest panorama and shows it; `on_missing` runs when
    /// there is none within the search radius.
    pub fn show_at(&self, position: LatLng, on_missing: impl FnOnce() + 'static) {
        let Ok(target) = lat_lng(&self.maps, position) else {
            return;
        };
        self.set_visible(true);
        let roadview = self.roadview.clone();
        let target_for_view = target.clone();
        let callback = Closure::once_into_js(move |pano_id: JsValue| {
            if pano_id.is_null() || pano_id.is_undefined() {
                on_missing();
                return;
            }
            call_method(&roadview, "setPanoId", &[pano_id, target_for_view]).ok();
            call_method(&roadview, "relayout", &[]).ok();
        });
        log_failure(
            "getNearestPanoId",
            call_method(
                &self.client,
                "getNearestPanoId",
                &[target, JsValue::from(ROADVIEW_SEARCH_RADIUS_M), callback],
            ),
        );
    }

    pub fn close(&self) {
        self.set_visible(false);
    }

    fn set_visible(&self, visible: bool) {
        let class = if visible { "roadview is-open" } else { "roadview" };
        self.container.set_class_name(class);
    }
}
