//! Administrative boundaries for the region search: provinces (시도),
//! districts (시군구) and neighbourhoods (읍면동), loaded once from static
//! GeoJSON files.

use std::rc::Rc;

use geojson::{Feature, FeatureCollection, GeoJson, Value};

use crate::provider::{Bounds, LatLng, MapProvider, ShapeStyle};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RegionLevel {
    Sido,
    Sigungu,
    Emd,
}

impl RegionLevel {
    fn code_keys(self) -> &'static [&'static str] {
        match self {
            RegionLevel::Sido => &["CTPRVN_CD"],
            RegionLevel::Sigungu => &["SIG_CD"],
            RegionLevel::Emd => &["adm_cd2", "adm_cd"],
        }
    }

    fn name_keys(self) -> &'static [&'static str] {
        match self {
            RegionLevel::Sido => &["CTP_KOR_NM"],
            RegionLevel::Sigungu => &["SIG_KOR_NM"],
            RegionLevel::Emd => &["adm_nm"],
        }
    }

    pub fn placeholder(self) -> &'static str {
        match self {
            RegionLevel::Sido => "시/도 선택",
            RegionLevel::Sigungu => "시/군/구 선택",
            RegionLevel::Emd => "읍/면/동 선택",
        }
    }
}

/// One selectable region. `full_name` is the space-separated path from the
/// province down, which is what the station API filters on.
#[derive(Clone, Debug, PartialEq)]
pub struct RegionEntry {
    pub level: RegionLevel,
    pub code: String,
    pub name: String,
    pub full_name: String,
}

#[derive(Clone, Debug, PartialEq)]
struct Boundary {
    code: String,
    name: String,
    /// `sgg` code carried by neighbourhood features.
    parent_code: Option<String>,
    polygons: Vec<Vec<Vec<LatLng>>>,
}

const FALLBACK_PROVINCES: &[(&str, &str)] = &[
    ("11", "서울특별시"),
    ("26", "부산광역시"),
    ("27", "대구광역시"),
    ("28", "인천광역시"),
    ("29", "광주광역시"),
    ("30", "대전광역시"),
    ("31", "울산광역시"),
    ("36", "세종특별자치시"),
    ("41", "경기도"),
    ("42", "강원도"),
    ("43", "충청북도"),
    ("44", "충청남도"),
    ("45", "전라북도"),
    ("46", "전라남도"),
    ("47", "경상북도"),
    ("48", "경상남도"),
    ("50", "제주특별자치도"),
];

#[derive(Debug, Default)]
pub struct RegionIndex {
    sido: Vec<Boundary>,
    sigungu: Vec<Boundary>,
    emd: Vec<Boundary>,
}

impl RegionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces one level with the features of `collection`. Returns how
    /// many regions were usable.
    pub fn load(&mut self, level: RegionLevel, collection: &FeatureCollection) -> usize {
        let boundaries: Vec<Boundary> = collection
            .features
            .iter()
            .filter_map(|feature| boundary(level, feature))
            .collect();
        let count = boundaries.len();
        *self.level_mut(level) = boundaries;
        count
    }

    pub fn is_loaded(&self, level: RegionLevel) -> bool {
        !self.level(level).is_empty()
    }

    fn level(&self, level: RegionLevel) -> &[Boundary] {
        match level {
            RegionLevel::Sido => &self.sido,
            RegionLevel::Sigungu => &self.sigungu,
            RegionLevel::Emd => &self.emd,
        }
    }

    fn level_mut(&mut self, level: RegionLevel) -> &mut Vec<Boundary> {
        match level {
            RegionLevel::Sido => &mut self.sido,
            RegionLevel::Sigungu => &mut self.sigungu,
            RegionLevel::Emd => &mut self.emd,
        }
    }

    /// Provinces sorted by code; a built-in list stands in when the
    /// province layer failed to load.
    pub fn provinces(&self) -> Vec<RegionEntry> {
        let mut entries: Vec<RegionEntry> = if self.sido.is_empty() {
            FALLBACK_PROVINCES
                .iter()
                .map(|(code, name)| entry(RegionLevel::Sido, code, name, name.to_string()))
                .collect()
        } else {
            self.sido
                .iter()
                .map(|b| entry(RegionLevel::Sido, &b.code, &b.name, b.name.clone()))
                .collect()
        };
        entries.sort_by(|a, b| a.code.cmp(&b.code));
        entries
    }

    pub fn districts(&self, province: &RegionEntry) -> Vec<RegionEntry> {
        let mut entries: Vec<RegionEntry> = self
            .sigungu
            .iter()
            .filter(|b| b.code.starts_with(&province.code))
            .map(|b| {
                let full_name = format!("{} {}", province.full_name, b.name);
                entry(RegionLevel::Sigungu, &b.code, &b.name, full_name)
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }

    /// Neighbourhoods of a district, matched by the district code and, for
    /// features without a usable code, by the district's full name.
    pub fn neighborhoods(&self, district: &RegionEntry) -> Vec<RegionEntry> {
        let name_prefix = format!("{} ", district.full_name);
        let mut entries: Vec<RegionEntry> = self
            .emd
            .iter()
            .filter(|b| {
                b.parent_code.as_deref() == Some(district.code.as_str())
                    || b.code.starts_with(&district.code)
                    || b.name.starts_with(&name_prefix)
            })
            .map(|b| {
                let short = b.name.rsplit(' ').next().unwrap_or(&b.name);
                entry(RegionLevel::Emd, &b.code, short, b.name.clone())
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries.dedup_by(|a, b| a.code == b.code);
        entries
    }

    pub fn polygons(&self, level: RegionLevel, code: &str) -> Option<&[Vec<Vec<LatLng>>]> {
        self.level(level)
            .iter()
            .find(|b| b.code == code)
            .map(|b| b.polygons.as_slice())
    }
}

fn entry(level: RegionLevel, code: &str, name: &str, full_name: String) -> RegionEntry {
    RegionEntry {
        level,
        code: code.to_string(),
        name: name.to_string(),
        full_name,
    }
}

fn boundary(level: RegionLevel, feature: &Feature) -> Option<Boundary> {
    let name = first_property(feature, level.name_keys())?;
    // Some neighbourhood features carry no code; their name is unique enough.
    let code = first_property(feature, level.code_keys())
        .or_else(|| (level == RegionLevel::Emd).then(|| name.clone()))?;
    let parent_code = match level {
        RegionLevel::Emd => first_property(feature, &["sgg"]),
        _ => None,
    };
    let polygons = feature
        .geometry
        .as_ref()
        .map(|geometry| polygons_of(&geometry.value))
        .unwrap_or_default();
    Some(Boundary {
        code,
        name,
        parent_code,
        polygons,
    })
}

fn first_property(feature: &Feature, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| feature.property(*key))
        .find_map(|value| match value {
            serde_json::Value::String(text) if !text.trim().is_empty() => {
                Some(text.trim().to_string())
            }
            serde_json::Value::Number(number) => Some(number.to_string()),
            _ => None,
        })
}

/// Polygons as rings of points; GeoJSON positions are `[lng, lat]`.
pub fn polygons_of(value: &Value) -> Vec<Vec<Vec<LatLng>>> {
    match value {
        Value::Polygon(rings) => vec![convert_rings(rings)],
        Value::MultiPolygon(polygons) => polygons.iter().map(|rings| convert_rings(rings)).collect(),
        _ => Vec::new(),
    }
}

fn convert_rings(rings: &[Vec<Vec<f64>>]) -> Vec<Vec<LatLng>> {
    rings
        .iter()
        .map(|ring| {
            ring.iter()
                .filter(|position| position.len() >= 2)
                .map(|position| LatLng::new(position[1], position[0]))
                .collect()
        })
        .collect()
}

pub fn parse_collection(text: &str) -> Result<FeatureCollection, String> {
    match text.parse::<GeoJson>() {
        Ok(GeoJson::FeatureCollection(collection)) => Ok(collection),
        Ok(_) => Err("not a FeatureCollection".to_string()),
        Err(err) => Err(err.to_string()),
    }
}

const BOUNDARY_STYLE: ShapeStyle = ShapeStyle {
    stroke_weight: 2,
    stroke_color: "#004c80",
    stroke_opacity: 0.8,
    fill_color: "#A2D4EC",
    fill_opacity: 0.3,
};

/// Boundary polygons currently drawn for the selected region.
pub struct RegionLayer<P: MapProvider> {
    provider: Rc<P>,
    shapes: Vec<P::Shape>,
}

impl<P: MapProvider> RegionLayer<P> {
    pub fn new(provider: Rc<P>) -> Self {
        Self {
            provider,
            shapes: Vec::new(),
        }
    }

    /// Clears prior polygons, draws `polygons` and fits the view to them.
    /// Returns false when there was nothing to draw.
    pub fn show(&mut self, polygons: &[Vec<Vec<LatLng>>]) -> bool {
        self.clear();
        for rings in polygons.iter().filter(|rings| !rings.is_empty()) {
            self.shapes.push(self.provider.draw_polygon(rings, &BOUNDARY_STYLE));
        }
        let points = polygons.iter().flatten().flatten().copied();
        match Bounds::around(points) {
            Some(bounds) => {
                self.provider.fit_bounds(bounds);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        for shape in self.shapes.drain(..) {
            self.provider.remove_shape(&shape);
        }
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockMap;
    use serde_json::json;

    fn square(lng: f64, lat: f64) -> serde_json::Value {
        json!([[[lng, lat], [lng + 0.1, lat], [lng + 0.1, lat + 0.1], [lng, lat + 0.1], [lng, lat]]])
    }

    fn collection(features: serde_json::Value) -> FeatureCollection {
        parse_collection(&json!({"type": "FeatureCollection", "features": features}).to_string()).unwrap()
    }

    fn index() -> RegionIndex {
        let mut index = RegionIndex::new();
        index.load(
            RegionLevel::Sido,
            &collection(json!([
                {"type": "Feature", "properties": {"CTPRVN_CD": "26", "CTP_KOR_NM": "부산광역시"},
                 "geometry": {"type": "Polygon", "coordinates": square(129.0, 35.1)}},
                {"type": "Feature", "properties": {"CTPRVN_CD": "11", "CTP_KOR_NM": "서울특별시"},
                 "geometry": {"type": "MultiPolygon", "coordinates": [square(126.9, 37.5), square(127.1, 37.6)]}}
            ])),
        );
        index.load(
            RegionLevel::Sigungu,
            &collection(json!([
                {"type": "Feature", "properties": {"SIG_CD": "11110", "SIG_KOR_NM": "종로구"},
                 "geometry": {"type": "Polygon", "coordinates": square(126.95, 37.57)}},
                {"type": "Feature", "properties": {"SIG_CD": "11140", "SIG_KOR_NM": "중구"},
                 "geometry": {"type": "Polygon", "coordinates": square(126.99, 37.56)}},
                {"type": "Feature", "properties": {"SIG_CD": "26110", "SIG_KOR_NM": "중구"},
                 "geometry": {"type": "Polygon", "coordinates": square(129.03, 35.1)}}
            ])),
        );
        index.load(
            RegionLevel::Emd,
            &collection(json!([
                {"type": "Feature", "properties": {"adm_cd2": "1111053000", "adm_nm": "서울특별시 종로구 사직동", "sgg": "11110"},
                 "geometry": {"type": "Polygon", "coordinates": square(126.96, 37.57)}},
                {"type": "Feature", "properties": {"adm_nm": "서울특별시 종로구 삼청동"},
                 "geometry": {"type": "Polygon", "coordinates": square(126.98, 37.58)}},
                {"type": "Feature", "properties": {"adm_cd2": "1114052000", "adm_nm": "서울특별시 중구 소공동", "sgg": "11140"},
                 "geometry": {"type": "Polygon", "coordinates": square(126.97, 37.56)}}
            ])),
        );
        index
    }

    #[test]
    fn provinces_are_sorted_by_code() {
        let names: Vec<_> = index().provinces().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["서울특별시", "부산광역시"]);
    }

    #[test]
    fn missing_province_layer_uses_builtin_list() {
        let provinces = RegionIndex::new().provinces();
        assert_eq!(provinces.len(), 17);
        assert_eq!(provinces[0].name, "서울특별시");
    }

    #[test]
    fn districts_filter_on_province_code() {
        let index = index();
        let seoul = index.provinces().remove(0);
        let districts = index.districts(&seoul);
        let names: Vec<_> = districts.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["종로구", "중구"]);
        assert_eq!(districts[0].full_name, "서울특별시 종로구");
    }

    #[test]
    fn neighbourhoods_match_by_code_or_name() {
        let index = index();
        let seoul = index.provinces().remove(0);
        let jongno = index.districts(&seoul).remove(0);
        let neighbourhoods = index.neighborhoods(&jongno);
        let names: Vec<_> = neighbourhoods.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["사직동", "삼청동"]);
        assert_eq!(neighbourhoods[0].full_name, "서울특별시 종로구 사직동");
    }

    #[test]
    fn features_without_names_are_skipped() {
        let mut index = RegionIndex::new();
        let loaded = index.load(
            RegionLevel::Sido,
            &collection(json!([{"type": "Feature", "properties": {"CTPRVN_CD": "11"}, "geometry": null}])),
        );
        assert_eq!(loaded, 0);
        assert!(!index.is_loaded(RegionLevel::Sido));
    }

    #[test]
    fn geojson_positions_become_lat_lng() {
        let index = index();
        let polygons = index.polygons(RegionLevel::Sido, "11").unwrap();
        assert_eq!(polygons.len(), 2);
        assert_eq!(polygons[0][0][0], LatLng::new(37.5, 126.9));
    }

    #[test]
    fn showing_a_region_replaces_prior_polygons_and_fits() {
        let index = index();
        let map = Rc::new(MockMap::default());
        let mut layer = RegionLayer::new(map.clone());

        assert!(layer.show(index.polygons(RegionLevel::Sido, "11").unwrap()));
        assert_eq!(map.live_shapes(), 2);

        assert!(layer.show(index.polygons(RegionLevel::Sigungu, "11110").unwrap()));
        assert_eq!(map.live_shapes(), 1);
        let fitted = *map.state.borrow().fitted.last().unwrap();
        assert!(fitted.south_west.near(&LatLng::new(37.57, 126.95), 1e-9));
        assert!(fitted.north_east.near(&LatLng::new(37.67, 127.05), 1e-9));

        layer.clear();
        assert_eq!(map.live_shapes(), 0);
    }

    #[test]
    fn non_collections_are_rejected() {
        assert!(parse_collection(r#"{"type": "Point", "coordinates": [1.0, 2.0]}"#).is_err());
        assert!(parse_collection("not json").is_err());
    }
}
