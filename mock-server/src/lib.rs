use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;

pub const CATEGORY_PHONES: u64 = 1092;
pub const CATEGORY_CARS: u64 = 18;
pub const PHONE_COUNT: u64 = 95;
pub const CAR_COUNT: u64 = 30;
pub const PASSWORD: &str = "password";
/// Seller owning every phone in the catalog.
pub const PHONE_SELLER: &str = "mobishop";
/// Seller owning every car in the catalog.
pub const CAR_SELLER: &str = "autoplac";
/// Fixed page size of the user listings endpoints.
pub const USER_PAGE_SIZE: u32 = 20;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub city: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Listing {
    pub id: u64,
    pub title: String,
    pub price: f64,
    pub state: String,
    pub category_id: u64,
    pub location: Location,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PageMeta {
    pub total: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_page: Option<u32>,
    pub current_page: u32,
    pub per_page: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub data: Vec<Listing>,
    pub meta: PageMeta,
}

/// Knobs for exercising client behavior against misbehaving servers.
#[derive(Clone, Debug)]
pub struct MockOptions {
    /// Bearer token handed out by `/auth/login` and required by writes.
    pub token: String,
    /// Answer 429 for every search page at or after this one.
    pub fail_from_page: Option<u32>,
    /// Leave `last_page` out of the search meta.
    pub omit_last_page: bool,
}

impl Default for MockOptions {
    fn default() -> Self {
        Self {
            token: "mock-token".to_string(),
            fail_from_page: None,
            omit_last_page: false,
        }
    }
}

struct AppState {
    listings: RwLock<Vec<Listing>>,
    options: MockOptions,
}

type Shared = Arc<AppState>;

/// Deterministic catalog: 95 phones followed by 30 cars.
pub fn catalog() -> Vec<Listing> {
    let cities = ["Sarajevo", "Mostar", "Tuzla", "Banja Luka"];
    let phones = (1..=PHONE_COUNT).map(|i| Listing {
        id: i,
        title: format!("iPhone {}", 6 + i % 10),
        price: (100 + (i * 37) % 900) as f64,
        state: if i % 3 == 0 { "new" } else { "used" }.to_string(),
        category_id: CATEGORY_PHONES,
        location: Location {
            city: cities[(i % 4) as usize].to_string(),
        },
    });
    let cars = (1..=CAR_COUNT).map(|i| Listing {
        id: PHONE_COUNT + i,
        title: format!("Golf {}", 1 + i % 8),
        price: (2_000 + i * 450) as f64,
        state: "used".to_string(),
        category_id: CATEGORY_CARS,
        location: Location {
            city: cities[(i % 4) as usize].to_string(),
        },
    });
    phones.chain(cars).collect()
}

pub fn app() -> Router {
    app_with(MockOptions::default())
}

pub fn app_with(options: MockOptions) -> Router {
    let state: Shared = Arc::new(AppState {
        listings: RwLock::new(catalog()),
        options,
    });
    Router::new()
        .route("/search", get(search))
        .route("/api/autosuggest", get(autosuggest))
        .route("/auth/login", post(login))
        .route("/listings/{id}", get(get_listing).delete(delete_listing))
        .route(
            "/listings/{id}/{action}",
            post(listing_action).put(listing_action),
        )
        .route("/users/{user}/listings", get(user_listings))
        .route("/users/{user}/listings/{status}", get(private_user_listings))
        .route("/categories", get(categories))
        .route("/categories/find", get(find_category))
        .route("/cities", get(cities))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with(listener: TcpListener, options: MockOptions) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(options)).await
}

#[derive(Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub category_id: Option<u64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl SearchParams {
    fn matches(&self, listing: &Listing) -> bool {
        let term = self.q.trim().to_lowercase();
        (term.is_empty() || listing.title.to_lowercase().contains(&term))
            && self.category_id.map_or(true, |c| c == listing.category_id)
    }
}

async fn search(State(state): State<Shared>, Query(params): Query<SearchParams>) -> Response {
    let page = params.page.unwrap_or(1).max(1);
    let per_page = params.per_page.unwrap_or(20).clamp(1, 100);
    debug!(q = %params.q, page, per_page, "search");

    if state.options.fail_from_page.is_some_and(|p| page >= p) {
        return (StatusCode::TOO_MANY_REQUESTS, "Too Many Attempts.").into_response();
    }

    let listings = state.listings.read().await;
    let mut hits: Vec<Listing> = listings.iter().filter(|l| params.matches(l)).cloned().collect();
    if params.sort_by.as_deref() == Some("price") {
        hits.sort_by(|a, b| a.price.total_cmp(&b.price));
        if params.sort_order.as_deref() == Some("desc") {
            hits.reverse();
        }
    }

    let total = hits.len() as u64;
    let last_page = total.div_ceil(u64::from(per_page)).max(1) as u32;
    let data = hits
        .into_iter()
        .skip((page as usize - 1) * per_page as usize)
        .take(per_page as usize)
        .collect();

    Json(SearchResponse {
        data,
        meta: PageMeta {
            total,
            last_page: (!state.options.omit_last_page).then_some(last_page),
            current_page: page,
            per_page,
        },
    })
    .into_response()
}

#[derive(Deserialize)]
pub struct SuggestParams {
    #[serde(default)]
    pub q: String,
}

async fn autosuggest(
    State(state): State<Shared>,
    Query(params): Query<SuggestParams>,
) -> Json<Value> {
    let term = params.q.trim().to_lowercase();
    let listings = state.listings.read().await;
    let hits: Vec<&Listing> = listings
        .iter()
        .filter(|l| !term.is_empty() && l.title.to_lowercase().contains(&term))
        .collect();

    let mut completions: Vec<String> = hits.iter().map(|l| l.title.to_lowercase()).collect();
    completions.sort();
    completions.dedup();
    completions.truncate(5);

    let categories: Vec<Value> = category_tree()
        .into_iter()
        .filter_map(|(id, name, parent)| {
            let count = hits.iter().filter(|l| l.category_id == id).count();
            (count > 0).then(|| {
                json!({"id": id, "name": name, "count": count, "parent_name": parent})
            })
        })
        .collect();

    Json(json!({
        "data": {
            "autocomplete": completions,
            "categories": categories,
            "users": [],
            "suggestions": [],
        }
    }))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub device_name: String,
}

async fn login(State(state): State<Shared>, Json(input): Json<LoginRequest>) -> Response {
    if input.password != PASSWORD {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "Invalid credentials"})),
        )
            .into_response();
    }
    Json(json!({
        "token": state.options.token,
        "user": {"username": input.username, "device_name": input.device_name},
    }))
    .into_response()
}

async fn get_listing(
    State(state): State<Shared>,
    Path(id): Path<u64>,
) -> Result<Json<Listing>, StatusCode> {
    let listings = state.listings.read().await;
    listings
        .iter()
        .find(|l| l.id == id)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), StatusCode> {
    let expected = format!("Bearer {}", state.options.token);
    match headers.get("authorization").and_then(|v| v.to_str().ok()) {
        Some(value) if value == expected => Ok(()),
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

async fn delete_listing(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Result<StatusCode, StatusCode> {
    authorize(&state, &headers)?;
    let mut listings = state.listings.write().await;
    let before = listings.len();
    listings.retain(|l| l.id != id);
    if listings.len() == before {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn listing_action(
    State(state): State<Shared>,
    method: Method,
    headers: HeaderMap,
    Path((id, action)): Path<(u64, String)>,
) -> Result<Json<Value>, StatusCode> {
    authorize(&state, &headers)?;
    let allowed = match action.as_str() {
        "publish" | "finish" | "hide" | "unhide" => method == Method::POST,
        "refresh" => method == Method::PUT,
        _ => false,
    };
    if !allowed {
        return Err(StatusCode::METHOD_NOT_ALLOWED);
    }
    let listings = state.listings.read().await;
    if !listings.iter().any(|l| l.id == id) {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(json!({"id": id, "action": action})))
}

#[derive(Deserialize)]
pub struct PageParam {
    pub page: Option<u32>,
}

fn seller_category(user: &str) -> Option<u64> {
    match user {
        PHONE_SELLER => Some(CATEGORY_PHONES),
        CAR_SELLER => Some(CATEGORY_CARS),
        _ => None,
    }
}

fn paged(hits: Vec<Listing>, page: u32) -> SearchResponse {
    let total = hits.len() as u64;
    let data = hits
        .into_iter()
        .skip((page as usize - 1) * USER_PAGE_SIZE as usize)
        .take(USER_PAGE_SIZE as usize)
        .collect();
    SearchResponse {
        data,
        meta: PageMeta {
            total,
            last_page: Some(total.div_ceil(u64::from(USER_PAGE_SIZE)).max(1) as u32),
            current_page: page,
            per_page: USER_PAGE_SIZE,
        },
    }
}

async fn user_listings(
    State(state): State<Shared>,
    Path(user): Path<String>,
    Query(params): Query<PageParam>,
) -> Result<Json<SearchResponse>, StatusCode> {
    let category = seller_category(&user).ok_or(StatusCode::NOT_FOUND)?;
    let page = params.page.unwrap_or(1).max(1);
    debug!(%user, page, "user listings");
    let listings = state.listings.read().await;
    let hits = listings
        .iter()
        .filter(|l| l.category_id == category)
        .cloned()
        .collect();
    Ok(Json(paged(hits, page)))
}

/// The mock keeps every listing active, so private collections are empty.
async fn private_user_listings(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path((_user, status)): Path<(String, String)>,
    Query(params): Query<PageParam>,
) -> Result<Json<SearchResponse>, StatusCode> {
    authorize(&state, &headers)?;
    if !matches!(status.as_str(), "finished" | "inactive" | "expired" | "hidden") {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(paged(Vec::new(), params.page.unwrap_or(1).max(1))))
}

fn category_tree() -> Vec<(u64, &'static str, &'static str)> {
    vec![
        (CATEGORY_PHONES, "Mobiteli", "Mobilni uređaji"),
        (CATEGORY_CARS, "Automobili", "Vozila"),
    ]
}

#[derive(Deserialize)]
pub struct CategoryParams {
    #[serde(default)]
    pub include_children: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

fn category_json(id: u64, name: &str, parent: &str, with_children: bool) -> Value {
    let mut value = json!({"id": id, "name": name, "parent_name": parent});
    if with_children {
        value["children"] = json!([]);
    }
    value
}

async fn categories(Query(params): Query<CategoryParams>) -> Json<Value> {
    let with_children = params.include_children.as_deref() == Some("true");
    let data: Vec<Value> = category_tree()
        .into_iter()
        .map(|(id, name, parent)| category_json(id, name, parent, with_children))
        .collect();
    Json(json!({ "data": data }))
}

async fn find_category(Query(params): Query<CategoryParams>) -> Json<Value> {
    let needle = params.name.unwrap_or_default().to_lowercase();
    let data: Vec<Value> = category_tree()
        .into_iter()
        .filter(|(_, name, _)| name.to_lowercase().contains(&needle))
        .map(|(id, name, parent)| category_json(id, name, parent, false))
        .collect();
    Json(json!({ "data": data }))
}

async fn cities() -> Json<Value> {
    Json(json!({
        "data": [
            {"id": 1, "name": "Sarajevo"},
            {"id": 2, "name": "Mostar"},
            {"id": 3, "name": "Tuzla"},
            {"id": 4, "name": "Banja Luka"},
        ]
    }))
}
