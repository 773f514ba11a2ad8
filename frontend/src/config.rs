/// Base URL of the station API.
pub const API_BASE: &str = "https://api.restation.site";

/// Endpoint on the hosting server that hands out the map key in deployment.
pub const KAKAO_KEY_ENDPOINT: &str = "/api/kakao";

const DEV_KAKAO_KEY: &str = "65e1c8f1ab7fa043334d2b12c4bde905";

pub const STATION_MARKER_IMAGE: &str = "https://map.pstatic.net/resource/api/v2/image/maps/selected-marker/229155@1x.png?version=19&mapping=marker-167";
pub const STATION_IMAGE_BASE: &str = "https://absolute-s3-bucket.s3.ap-southeast-2.amazonaws.com/stations";

pub const GEO_SIDO_PATH: &str = "/public/ctprvn_wgs84.json";
pub const GEO_SIGUNGU_PATH: &str = "/public/sig_wgs84_simplified.json";
pub const GEO_EMD_PATH: &str = "/public/HangJeongDong_ver20250401_simplified.json";

pub const DEFAULT_CENTER: (f64, f64) = (36.5, 127.8);
pub const DEFAULT_LEVEL: u8 = 12;
pub const FOCUS_LEVEL: u8 = 4;

pub const CLUSTER_MIN_LEVEL: u8 = 10;
pub const CLUSTER_MIN_SIZE: u32 = 10;

pub const INITIAL_FETCH_LIMIT: u32 = 10_000;
pub const REGION_FETCH_LIMIT: u32 = 5_000;

pub const HOVER_CLOSE_DELAY_MS: u32 = 200;
pub const BUFFER_RADIUS_M: f64 = 500.0;
pub const HEAT_RADIUS_M: f64 = 120.0;
pub const ROADVIEW_SEARCH_RADIUS_M: u32 = 50;

/// Longitude shift applied when focusing the feature panel, so the station
/// is not hidden behind the panel.
pub const FEATURE_PAN_OFFSET: f64 = 0.0025;

pub fn is_local_host(hostname: &str) -> bool {
    matches!(hostname, "localhost" | "127.0.0.1")
}

pub fn local_kakao_key() -> &'static str {
    option_env!("KAKAO_LOCAL_KEY").unwrap_or(DEV_KAKAO_KEY)
}

pub fn sdk_url(app_key: &str) -> String {
    format!(
        "https://dapi.kakao.com/v2/maps/sdk.js?autoload=false&appkey={}&libraries=services,clusterer",
        urlencoding::encode(app_key)
    )
}
