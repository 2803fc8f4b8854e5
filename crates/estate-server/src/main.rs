use axum::http::StatusCode;
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use estate_core::{
    compile, registry, EstateError, FilterRequest, NewListing, PropertyTypeGroup, QueryPlan,
    RENT_SEARCH_ROUTE, SALE_SEARCH_ROUTE,
};
use estate_storage::{snapshot, InMemoryStore, ListingStore};
use prometheus::{Encoder, TextEncoder};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod metrics;

use config::Config;

#[derive(Clone)]
struct AppState {
    store: Arc<dyn ListingStore>,
    config: Arc<Config>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    let store = InMemoryStore::new();
    if let Some(path) = &config.seed_path {
        match snapshot::read_snapshot(std::path::Path::new(path)) {
            Ok(listings) => {
                let n = store.load(listings);
                info!(path = %path, listings = n, "seeded listing store");
            }
            Err(e) => warn!(path = %path, error = %e, "seed snapshot unreadable, starting empty"),
        }
    }

    let http_addr = config.http_addr;
    let state = AppState {
        store: Arc::new(store),
        config: Arc::new(config),
    };
    let listener = tokio::net::TcpListener::bind(http_addr).await?;
    info!("http listening on {}", http_addr);
    axum::serve(listener, app(state)).await?;
    Ok(())
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(SALE_SEARCH_ROUTE, post(sale_search))
        .route(RENT_SEARCH_ROUTE, post(rent_search))
        .route("/admin/explain", post(admin_explain))
        .route("/v1/listings", post(put_listing))
        .route("/v1/listings/:id", get(get_listing).delete(delete_listing))
        .route("/v1/taxonomy", get(taxonomy))
        .route("/metrics", get(metrics))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

fn error_response(e: EstateError) -> Response {
    let status = match e {
        EstateError::NotFound => StatusCode::NOT_FOUND,
        EstateError::UnknownGroup(_) | EstateError::Invalid(_) => StatusCode::BAD_REQUEST,
        EstateError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({"error": e.to_string()}))).into_response()
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

#[derive(Debug, Default, serde::Deserialize)]
struct SearchParams {
    group: Option<String>,
    limit: Option<usize>,
    offset: Option<usize>,
}

impl SearchParams {
    // query string first, then the form's own field
    fn group<'a>(&'a self, req: &'a FilterRequest) -> &'a str {
        self.group
            .as_deref()
            .or(req.property_type_group.as_deref())
            .unwrap_or_default()
    }
}

/// Compiles `req` and records compile latency and skipped filters.
fn compile_observed(group: &str, req: &FilterRequest) -> QueryPlan {
    let t0 = std::time::Instant::now();
    let plan = compile(group, req);
    metrics::COMPILE_MICROS.observe(t0.elapsed().as_micros() as f64);
    for (_, reason) in plan.skipped() {
        metrics::FILTERS_SKIPPED_TOTAL
            .with_label_values(&[reason.as_str()])
            .inc();
    }
    plan
}

async fn sale_search(
    State(app): State<AppState>,
    Query(params): Query<SearchParams>,
    Json(req): Json<FilterRequest>,
) -> Response {
    search(app, SALE_SEARCH_ROUTE, params, req).await
}

async fn rent_search(
    State(app): State<AppState>,
    Query(params): Query<SearchParams>,
    Json(req): Json<FilterRequest>,
) -> Response {
    search(app, RENT_SEARCH_ROUTE, params, req).await
}

async fn search(
    app: AppState,
    route: &str,
    params: SearchParams,
    mut req: FilterRequest,
) -> Response {
    let _timer = metrics::OP_DURATION
        .with_label_values(&["search"])
        .start_timer();
    req.base_route = Some(route.to_string());
    let group = params.group(&req).to_string();
    let plan = compile_observed(&group, &req);

    let group_label = group
        .parse::<PropertyTypeGroup>()
        .map(PropertyTypeGroup::as_str)
        .unwrap_or("unknown");
    let deal_label = req.deal().map(|d| d.as_str()).unwrap_or("any");
    metrics::SEARCH_TOTAL
        .with_label_values(&[group_label, deal_label])
        .inc();

    let page = app.config.page(params.limit, params.offset);
    match app.store.search(&plan, page).await {
        Ok(found) => (
            StatusCode::OK,
            Json(json!({
                "total": found.total,
                "items": found.items,
                "plan_fingerprint": plan.fingerprint(),
            })),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

#[derive(Debug, serde::Deserialize)]
struct ExplainParams {
    group: Option<String>,
    route: Option<String>,
}

async fn admin_explain(
    Query(params): Query<ExplainParams>,
    Json(mut req): Json<FilterRequest>,
) -> impl IntoResponse {
    if let Some(route) = params.route {
        req.base_route = Some(route);
    }
    let group = params
        .group
        .or_else(|| req.property_type_group.clone())
        .unwrap_or_default();
    let plan = compile_observed(&group, &req);
    let resp = json!({
        "group": group,
        "fingerprint": plan.fingerprint(),
        "plan": plan,
    });
    (StatusCode::OK, Json(resp))
}

async fn put_listing(State(app): State<AppState>, Json(req): Json<NewListing>) -> Response {
    let _timer = metrics::OP_DURATION.with_label_values(&["put"]).start_timer();
    match app.store.put(req).await {
        Ok(listing) => (StatusCode::CREATED, Json(listing)).into_response(),
        Err(e) => error_response(e),
    }
}

async fn get_listing(State(app): State<AppState>, Path(id): Path<String>) -> Response {
    let _timer = metrics::OP_DURATION.with_label_values(&["get"]).start_timer();
    match app.store.get(&id).await {
        Ok(listing) => (StatusCode::OK, Json(listing)).into_response(),
        Err(e) => error_response(e),
    }
}

async fn delete_listing(State(app): State<AppState>, Path(id): Path<String>) -> Response {
    match app.store.delete(&id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

async fn taxonomy() -> impl IntoResponse {
    Json(registry())
}

async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buf = Vec::new();
    let _ = encoder.encode(&metric_families, &mut buf);
    (StatusCode::OK, String::from_utf8(buf).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request};
    use chrono::{TimeZone, Utc};
    use estate_core::{CategoricalField, Listing, SaleOrRent, StoredType};
    use serde_json::Value;
    use tower::ServiceExt;

    fn listing(id: &str, ty: StoredType, deal: SaleOrRent, day: u32, attrs: Value) -> Listing {
        Listing::new(NewListing {
            r#type: ty,
            sale_or_rent: deal,
            attributes: attrs,
            id: Some(id.into()),
            created_at: Some(Utc.with_ymd_and_hms(2024, 5, day, 12, 0, 0).unwrap()),
        })
        .unwrap()
    }

    fn test_app(config: Config) -> Router {
        let store = InMemoryStore::new();
        store.load([
            listing(
                "h1",
                StoredType::Hotel,
                SaleOrRent::Rent,
                1,
                json!({"hotel_category": "luxury", "bed_base": 40}),
            ),
            listing(
                "h2",
                StoredType::Hotel,
                SaleOrRent::Rent,
                2,
                json!({"bed_base": 12}),
            ),
            listing(
                "h3",
                StoredType::Hotel,
                SaleOrRent::Sale,
                3,
                json!({"hotel_category": "five-star"}),
            ),
            listing(
                "a1",
                StoredType::Apartment,
                SaleOrRent::Sale,
                4,
                json!({"subtype": "Студио", "price": 90000}),
            ),
            listing(
                "a2",
                StoredType::Apartment,
                SaleOrRent::Sale,
                5,
                json!({"subtype": "two-bedroom", "price": 150000}),
            ),
        ]);
        app(AppState {
            store: Arc::new(store),
            config: Arc::new(config),
        })
    }

    async fn call(
        app: Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let resp = app.oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    fn ids(v: &Value) -> Vec<&str> {
        v["items"]
            .as_array()
            .unwrap()
            .iter()
            .map(|i| i["id"].as_str().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let resp = test_app(Config::default())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn rent_route_sets_the_deal() {
        let (status, body) = call(
            test_app(Config::default()),
            Method::POST,
            "/rent/search?group=hotels-motels",
            Some(json!({"pricePerSqmFrom": 5})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 2);
        assert_eq!(ids(&body), vec!["h2", "h1"]);
        assert_eq!(body["plan_fingerprint"].as_str().unwrap().len(), 64);
    }

    #[tokio::test]
    async fn hotel_category_accepts_labels_and_missing_values() {
        let (status, body) = call(
            test_app(Config::default()),
            Method::POST,
            "/rent/search?group=hotels-motels",
            Some(json!({"selectedCategories": ["Лукс", "uncategorized"]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ids(&body), vec!["h2", "h1"]);
    }

    #[tokio::test]
    async fn bed_base_bounds_filter_hotels() {
        let (_, body) = call(
            test_app(Config::default()),
            Method::POST,
            "/rent/search?group=hotels-motels",
            Some(json!({"isBedBaseNotProvided": false, "bedBaseFrom": 20})),
        )
        .await;
        assert_eq!(ids(&body), vec!["h1"]);
    }

    #[tokio::test]
    async fn group_falls_back_to_body_and_pages_are_capped() {
        let config = Config {
            max_page_size: 1,
            ..Config::default()
        };
        let (status, body) = call(
            test_app(config),
            Method::POST,
            "/sale/search?limit=50",
            Some(json!({"propertyTypeGroup": "apartments", "apartmentSubtypes": ["studio", "two-bedroom"]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 2);
        assert_eq!(ids(&body), vec!["a2"]);
    }

    #[tokio::test]
    async fn explain_reports_diagnostics() {
        let (status, body) = call(
            test_app(Config::default()),
            Method::POST,
            "/admin/explain?group=hotels-motels&route=/rent/search",
            Some(json!({"pricePerSqmTo": 100, "areaFrom": 0})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["group"], "hotels-motels");
        let diags = body["plan"]["diagnostics"].as_array().unwrap();
        assert!(diags
            .iter()
            .any(|d| d["filter"] == "price_per_sqm" && d["reason"] == "rental_listing"));
        assert!(diags
            .iter()
            .any(|d| d["filter"] == "area" && d["reason"] == "non_positive_bound"));
    }

    #[tokio::test]
    async fn listing_lifecycle() {
        let app = test_app(Config::default());
        let (status, created) = call(
            app.clone(),
            Method::POST,
            "/v1/listings",
            Some(json!({"type": "garage", "sale_or_rent": "sale", "attributes": {"property_type": "underground"}})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = created["id"].as_str().unwrap().to_string();

        let (status, fetched) = call(app.clone(), Method::GET, &format!("/v1/listings/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["type"], "garage");

        let (status, _) = call(app.clone(), Method::DELETE, &format!("/v1/listings/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, body) = call(app, Method::GET, &format!("/v1/listings/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "listing not found");
    }

    #[tokio::test]
    async fn bad_payloads_are_rejected() {
        let (status, body) = call(
            test_app(Config::default()),
            Method::POST,
            "/v1/listings",
            Some(json!({"type": "shop", "sale_or_rent": "rent", "attributes": [1]})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("attributes"));

        let resp = test_app(Config::default())
            .oneshot(
                Request::post("/sale/search")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(resp.status().is_client_error());
    }

    #[tokio::test]
    async fn taxonomy_lists_groups_and_fields() {
        let (status, body) = call(test_app(Config::default()), Method::GET, "/v1/taxonomy", None).await;
        assert_eq!(status, StatusCode::OK);
        let groups = body["groups"].as_array().unwrap();
        assert_eq!(groups.len(), PropertyTypeGroup::ALL.len());
        let houses = groups.iter().find(|g| g["id"] == "houses-villas").unwrap();
        assert_eq!(houses["stored_types"], json!(["house", "villa"]));
        assert_eq!(body["fields"].as_array().unwrap().len(), CategoricalField::ALL.len());
    }
}
