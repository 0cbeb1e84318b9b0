//! Read-only HTTP surface over the stored catalog.
//!
//! ```text
//! GET /happymoons              all products
//! GET /happymoons/ex=a,b       all products without fields a, b
//! GET /happymoons/in=a,b       all products with only fields a, b
//! GET /happymoons/csv          all products as CSV (projection not applied)
//! ```

pub mod middleware;

use std::convert::Infallible;
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use rusqlite::Connection;
use serde_json::json;
use tracing::{debug, warn};

use crate::db::{self, Product};
use crate::export;
use crate::projection::{self, Projection};

pub const BASE_PATH: &str = "/happymoons";

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub allowed_origins: Vec<String>,
    pub allowed_methods: String,
    pub max_requests_per_minute: u32,
    pub rate_limit_burst: u32,
    pub rate_limit_clients: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            allowed_methods: "GET, OPTIONS".to_string(),
            max_requests_per_minute: 0,
            rate_limit_burst: 0,
            rate_limit_clients: middleware::DEFAULT_TRACKED_CLIENTS,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
}

pub fn router(state: AppState, config: &ApiConfig) -> Router {
    let cors = Arc::new(middleware::CorsPolicy::new(
        config.allowed_origins.clone(),
        config.allowed_methods.clone(),
    ));
    let limiter = middleware::RateLimiter::new(
        config.max_requests_per_minute,
        config.rate_limit_burst,
        config.rate_limit_clients,
    );

    Router::new()
        .route("/healthz", get(healthz))
        .route(BASE_PATH, get(list_products))
        .route(&format!("{BASE_PATH}/:selector"), get(select_products))
        .fallback(not_found)
        .with_state(state)
        .layer(axum::middleware::from_fn_with_state(limiter, middleware::rate_limit))
        .layer(axum::middleware::from_fn_with_state(cors, middleware::cors))
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn list_products(State(state): State<AppState>) -> Response {
    match load_products(&state) {
        Ok(products) => Json(products).into_response(),
        Err(resp) => resp,
    }
}

/// `csv`, `ex=<fields>` or `in=<fields>`; anything else is a 404.
async fn select_products(State(state): State<AppState>, Path(selector): Path<String>) -> Response {
    let projection = if selector == "csv" {
        None
    } else if let Some(list) = selector.strip_prefix("ex=") {
        Some(Projection::exclude(list))
    } else if let Some(list) = selector.strip_prefix("in=") {
        Some(Projection::include(list))
    } else {
        return not_found().await;
    };

    let products = match load_products(&state) {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    match projection {
        Some(projection) => {
            debug!("Projecting {} products: {:?}", products.len(), projection);
            Json(projection::project(&products, &projection)).into_response()
        }
        None => csv_response(products),
    }
}

/// Rows are rendered as the body is polled, not up front.
fn csv_response(products: Vec<Product>) -> Response {
    let lines = export::into_csv_rows(products).map(Ok::<_, Infallible>);
    (
        [
            (header::CONTENT_TYPE, "text/csv"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"catalog.csv\""),
        ],
        Body::from_stream(tokio_stream::iter(lines)),
    )
        .into_response()
}

fn load_products(state: &AppState) -> Result<Vec<Product>, Response> {
    let conn = state
        .db
        .lock()
        .map_err(|_| json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", "store lock poisoned"))?;
    db::fetch_products(&conn).map_err(|e| {
        warn!("Failed to load products: {:#}", e);
        json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", e.to_string())
    })
}

async fn not_found() -> Response {
    json_error(StatusCode::NOT_FOUND, "not_found", "no such resource")
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
