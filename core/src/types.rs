//! Domain DTOs for the marketplace API.
//!
//! # Design
//! Listing records are left as opaque JSON objects: the server owns their
//! schema and the core only ever reads `price` and `state` from them.
//! Everything the client *sends* is typed, including the search filters,
//! with a string-keyed overflow map for keys the server accepts but this
//! crate does not name.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One listing as returned by the search endpoint, passed through untouched.
pub type Record = Map<String, Value>;

/// Page size the search endpoint answers most consistently with.
pub const DEFAULT_PER_PAGE: u32 = 40;

/// Sort direction accepted by `sort_order`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// Filters the search endpoint understands, plus an overflow map.
///
/// Flags are sent as `1`/`0`. `extra` is merged after every other parameter,
/// so a key there replaces a core parameter of the same name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOptions {
    pub sort_by: Option<String>,
    pub sort_order: Option<SortDirection>,
    pub has_price: Option<bool>,
    pub available: Option<bool>,
    pub shop_only: Option<bool>,
    pub shipping: Option<bool>,
    pub sponsored: Option<bool>,
    pub extra: BTreeMap<String, String>,
}

impl SearchOptions {
    pub fn sorted_by(mut self, field: &str, direction: SortDirection) -> Self {
        self.sort_by = Some(field.to_string());
        self.sort_order = Some(direction);
        self
    }

    pub fn with_extra(mut self, key: &str, value: &str) -> Self {
        self.extra.insert(key.to_string(), value.to_string());
        self
    }

    fn named_params(&self) -> Vec<(&'static str, String)> {
        let flag = |b: bool| if b { "1" } else { "0" }.to_string();
        let mut params = Vec::new();
        if let Some(field) = &self.sort_by {
            params.push(("sort_by", field.clone()));
        }
        if let Some(direction) = self.sort_order {
            params.push(("sort_order", direction.as_str().to_string()));
        }
        for (key, value) in [
            ("has_price", self.has_price),
            ("available", self.available),
            ("shop_only", self.shop_only),
            ("shipping", self.shipping),
            ("sponsored", self.sponsored),
        ] {
            if let Some(v) = value {
                params.push((key, flag(v)));
            }
        }
        params
    }

    /// Append these options to `params`, replacing keys that already exist.
    pub(crate) fn merge_into(&self, params: &mut Vec<(String, String)>) {
        for (key, value) in self.named_params() {
            set_param(params, key, value);
        }
        for (key, value) in &self.extra {
            set_param(params, key, value.clone());
        }
    }
}

/// Last-write-wins insert that keeps the original position of a replaced key.
pub(crate) fn set_param(params: &mut Vec<(String, String)>, key: &str, value: String) {
    match params.iter_mut().find(|(k, _)| k == key) {
        Some(slot) => slot.1 = value,
        None => params.push((key.to_string(), value)),
    }
}

/// A single-page search request. Page and page size are always at least 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    term: String,
    category_id: Option<u64>,
    page: u32,
    per_page: u32,
    attr: String,
    attr_encoded: bool,
    options: SearchOptions,
}

impl SearchQuery {
    pub fn new(term: &str) -> Self {
        Self {
            term: term.to_string(),
            category_id: None,
            page: 1,
            per_page: DEFAULT_PER_PAGE,
            attr: String::new(),
            attr_encoded: true,
            options: SearchOptions::default(),
        }
    }

    pub fn category(mut self, category_id: Option<u64>) -> Self {
        self.category_id = category_id;
        self
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    pub fn per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page.max(1);
        self
    }

    pub fn attr(mut self, attr: &str, encoded: bool) -> Self {
        self.attr = attr.to_string();
        self.attr_encoded = encoded;
        self
    }

    pub fn options(mut self, options: SearchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn category_id(&self) -> Option<u64> {
        self.category_id
    }

    pub fn page_number(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.per_page
    }

    /// Query parameters in wire order: core keys first, then options.
    pub fn params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("q".to_string(), self.term.clone()),
            ("page".to_string(), self.page.to_string()),
            ("per_page".to_string(), self.per_page.to_string()),
            ("attr".to_string(), self.attr.clone()),
            (
                "attr_encoded".to_string(),
                if self.attr_encoded { "1" } else { "0" }.to_string(),
            ),
        ];
        if let Some(id) = self.category_id {
            params.push(("category_id".to_string(), id.to_string()));
        }
        self.options.merge_into(&mut params);
        params
    }
}

/// Pagination metadata of one search response. Absent keys decode as 0 / `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageMeta {
    pub total: u64,
    pub last_page: Option<u32>,
    pub current_page: Option<u32>,
    pub per_page: Option<u32>,
}

/// One decoded search response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchPage {
    pub records: Vec<Record>,
    pub meta: PageMeta,
}

#[derive(Deserialize)]
pub(crate) struct SearchEnvelope {
    #[serde(default)]
    pub data: Option<Vec<Record>>,
    #[serde(default)]
    pub meta: Option<PageMeta>,
}

impl From<SearchEnvelope> for SearchPage {
    fn from(envelope: SearchEnvelope) -> Self {
        Self {
            records: envelope.data.unwrap_or_default(),
            meta: envelope.meta.unwrap_or_default(),
        }
    }
}

/// A category suggested for an autosuggest term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySuggestion {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub parent_name: Option<String>,
}

/// Unwrapped `data` object of the autosuggest endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutosuggestResult {
    #[serde(rename = "autocomplete")]
    pub completions: Vec<String>,
    pub categories: Vec<CategorySuggestion>,
    pub users: Vec<Value>,
    pub suggestions: Vec<Value>,
}

/// Login payload for `/auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub device_name: String,
}

impl Credentials {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
            device_name: "classifieds-core".to_string(),
        }
    }
}

/// Successful login: the bearer token and whatever user profile came with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(default)]
    pub user: Option<Value>,
}

/// Lifecycle operations on one of the caller's own listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingAction {
    Publish,
    Finish,
    Hide,
    Unhide,
    Refresh,
    Delete,
}

/// Which of a seller's listing collections to page through.
///
/// `Active` is public and addressed by username; the others belong to the
/// authenticated seller and are addressed by user id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserListings {
    Active,
    Finished,
    Inactive,
    Expired,
    Hidden,
}

impl UserListings {
    /// Path segment after `/users/{user}/listings`, if any.
    pub fn segment(self) -> Option<&'static str> {
        match self {
            UserListings::Active => None,
            UserListings::Finished => Some("finished"),
            UserListings::Inactive => Some("inactive"),
            UserListings::Expired => Some("expired"),
            UserListings::Hidden => Some("hidden"),
        }
    }

    pub fn requires_token(self) -> bool {
        self != UserListings::Active
    }
}
