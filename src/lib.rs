use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::{Value, json};
use tower_http::services::ServeDir;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_PUBLIC_DIR: &str = "public";

/// Server settings read from the environment (or a `.env` file).
#[derive(Clone, Debug, PartialEq)]
pub struct ServerConfig {
    pub port: u16,
    pub bind_addr: IpAddr,
    /// Kakao JavaScript key handed to the map page; optional so the static
    /// site still comes up without it.
    pub kakao_map_key: Option<String>,
    pub public_dir: PathBuf,
}

#[derive(Debug, PartialEq)]
pub struct ConfigError(pub String);

impl std::fmt::Display for ConfigError {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl std::error::Error for ConfigError {}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let value = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let port = match value("PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|_| ConfigError(format!("PORT must be a port number, got {raw:?}")))?,
            None => DEFAULT_PORT,
        };
        let bind_addr = match value("BIND_ADDR") {
            Some(raw) => raw
                .parse()
                .map_err(|_| ConfigError(format!("BIND_ADDR must be an IP address, got {raw:?}")))?,
            None => IpAddr::V4(Ipv4Addr::LOCALHOST),
        };

        Ok(Self {
            port,
            bind_addr,
            kakao_map_key: value("KAKAO_MAP_KEY"),
            public_dir: value("PUBLIC_DIR")
                .unwrap_or_else(|| DEFAULT_PUBLIC_DIR.to_string())
                .into(),
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}

#[derive(Clone)]
struct AppState {
    kakao_map_key: Option<Arc<str>>,
}

/// API routes plus the static site. Assets are reachable both from the root
/// and under `/public`, where the map page looks for boundary files.
pub fn build_router(config: &ServerConfig) -> Router {
    let state = AppState {
        kakao_map_key: config.kakao_map_key.as_deref().map(Arc::from),
    };

    Router::new()
        .route("/api/kakao", get(get_kakao_key))
        .route("/api/health", get(get_health))
        .nest_service("/public", ServeDir::new(&config.public_dir))
        .fallback_service(ServeDir::new(&config.public_dir).append_index_html_on_directories(true))
        .with_state(state)
}

async fn get_kakao_key(State(state): State<AppState>) -> Response {
    match &state.kakao_map_key {
        Some(key) => Json(json!({ "key": key.as_ref() })).into_response(),
        None => {
            tracing::warn!("map key requested but KAKAO_MAP_KEY is not set");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "error": "map key is not configured" })),
            )
                .into_response()
        }
    }
}

async fn get_health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use std::collections::HashMap;
    use tower::ServiceExt;

    fn config_from(pairs: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    async fn get(router: Router, uri: &str) -> (StatusCode, Vec<u8>) {
        let response = router
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:3000");
        assert_eq!(config.kakao_map_key, None);
        assert_eq!(config.public_dir, PathBuf::from("public"));
    }

    #[test]
    fn values_are_trimmed_and_blank_key_is_missing() {
        let config = config_from(&[
            ("PORT", " 8080 "),
            ("BIND_ADDR", "0.0.0.0"),
            ("KAKAO_MAP_KEY", "   "),
            ("PUBLIC_DIR", "dist"),
        ])
        .unwrap();
        assert_eq!(config.socket_addr().to_string(), "0.0.0.0:8080");
        assert_eq!(config.kakao_map_key, None);
        assert_eq!(config.public_dir, PathBuf::from("dist"));
    }

    #[test]
    fn malformed_values_are_rejected() {
        assert!(config_from(&[("PORT", "http")]).is_err());
        let err = config_from(&[("BIND_ADDR", "localhost")]).unwrap_err();
        assert!(err.to_string().contains("BIND_ADDR"));
    }

    #[tokio::test]
    async fn kakao_key_is_served_when_configured() {
        let config = config_from(&[("KAKAO_MAP_KEY", "abc123")]).unwrap();
        let (status, body) = get(build_router(&config), "/api/kakao").await;
        assert_eq!(status, StatusCode::OK);
        let payload: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload, json!({ "key": "abc123" }));
    }

    #[tokio::test]
    async fn missing_kakao_key_is_service_unavailable() {
        let config = config_from(&[]).unwrap();
        let (status, body) = get(build_router(&config), "/api/kakao").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        let payload: Value = serde_json::from_slice(&body).unwrap();
        assert!(payload.get("error").is_some());
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let config = config_from(&[]).unwrap();
        let (status, body) = get(build_router(&config), "/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(serde_json::from_slice::<Value>(&body).unwrap(), json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn static_files_are_served_from_root_and_public_prefix() {
        let dir = std::env::temp_dir().join(format!("restation-static-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("index.html"), "<html>map</html>").unwrap();
        std::fs::write(dir.join("ctprvn_wgs84.json"), r#"{"type":"FeatureCollection","features":[]}"#).unwrap();
        let config = config_from(&[("PUBLIC_DIR", dir.to_str().unwrap())]).unwrap();

        let (status, body) = get(build_router(&config), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"<html>map</html>");

        let (status, body) = get(build_router(&config), "/public/ctprvn_wgs84.json").await;
        assert_eq!(status, StatusCode::OK);
        assert!(String::from_utf8(body).unwrap().contains("FeatureCollection"));

        let (status, _) = get(build_router(&config), "/missing.json").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        std::fs::remove_dir_all(&dir).ok();
    }
}
