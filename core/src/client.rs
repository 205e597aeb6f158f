//! Request builder and response parser for the marketplace API.
//!
//! # Design
//! `MarketClient` holds only its `ClientConfig` and carries no mutable state
//! between calls. Each operation is split into a `build_*` method that
//! produces an `HttpRequest` and a `parse_*` method that consumes an
//! `HttpResponse`. `fetch_page` and `fetch_autosuggest` glue the two halves
//! to a caller-supplied `Transport` for hosts that do not need the split.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport};
use crate::types::{
    set_param, AutosuggestResult, Credentials, ListingAction, LoginResponse, Record,
    SearchEnvelope, SearchOptions, SearchPage, SearchQuery, UserListings,
};

/// Synchronous, stateless client for the marketplace API.
#[derive(Debug, Clone)]
pub struct MarketClient {
    config: ClientConfig,
}

impl MarketClient {
    /// Anonymous client with both roots pointed at `base_url`.
    pub fn new(base_url: &str) -> Self {
        Self::with_config(ClientConfig::for_host(base_url))
    }

    pub fn with_config(config: ClientConfig) -> Self {
        Self {
            config: config.normalized(),
        }
    }

    /// Copy of this client that sends `token` as its bearer credential.
    pub fn with_token(&self, token: &str) -> Self {
        let mut config = self.config.clone();
        config.token = Some(token.to_string());
        Self { config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn is_authenticated(&self) -> bool {
        self.config.token.is_some()
    }

    // -----------------------------------------------------------------------
    // Search
    // -----------------------------------------------------------------------

    pub fn build_search(&self, query: &SearchQuery) -> HttpRequest {
        self.request(HttpMethod::Get, format!("{}/search", self.config.base_url))
            .with_query(query.params())
    }

    pub fn parse_search(&self, response: HttpResponse) -> Result<SearchPage, ApiError> {
        let envelope: SearchEnvelope = decode(&response)?;
        Ok(envelope.into())
    }

    /// Execute one search request through `transport`.
    pub fn fetch_page<T: Transport + ?Sized>(
        &self,
        transport: &T,
        query: &SearchQuery,
    ) -> Result<SearchPage, ApiError> {
        let request = self.build_search(query);
        debug!(page = query.page_number(), term = query.term(), "fetching search page");
        let response = transport.execute(request)?;
        debug!(status = response.status, "search page response");
        self.parse_search(response)
    }

    pub fn build_autosuggest(&self, term: &str, options: &SearchOptions) -> HttpRequest {
        let mut params = vec![("q".to_string(), term.to_string())];
        options.merge_into(&mut params);
        self.request(
            HttpMethod::Get,
            format!("{}/api/autosuggest", self.config.site_url),
        )
        .with_query(params)
    }

    /// Unwrap the `data` object; a body without one yields an empty result.
    pub fn parse_autosuggest(
        &self,
        response: HttpResponse,
    ) -> Result<AutosuggestResult, ApiError> {
        let body: Value = decode(&response)?;
        match body.get("data") {
            Some(Value::Null) | None => Ok(AutosuggestResult::default()),
            Some(data) => Ok(serde_json::from_value(data.clone())?),
        }
    }

    pub fn fetch_autosuggest<T: Transport + ?Sized>(
        &self,
        transport: &T,
        term: &str,
        options: &SearchOptions,
    ) -> Result<AutosuggestResult, ApiError> {
        let response = transport.execute(self.build_autosuggest(term, options))?;
        debug!(status = response.status, "autosuggest response");
        self.parse_autosuggest(response)
    }

    // -----------------------------------------------------------------------
    // Authentication
    // -----------------------------------------------------------------------

    pub fn build_login(&self, credentials: &Credentials) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(credentials)
            .map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(self
            .request(HttpMethod::Post, format!("{}/auth/login", self.config.base_url))
            .with_json(body))
    }

    pub fn parse_login(&self, response: HttpResponse) -> Result<LoginResponse, ApiError> {
        decode(&response)
    }

    // -----------------------------------------------------------------------
    // Listings
    // -----------------------------------------------------------------------

    pub fn build_get_listing(&self, id: u64) -> HttpRequest {
        self.request(HttpMethod::Get, format!("{}/listings/{id}", self.config.base_url))
    }

    pub fn parse_get_listing(&self, response: HttpResponse) -> Result<Record, ApiError> {
        decode(&response)
    }

    /// Lifecycle request for one of the caller's listings. Needs a token.
    pub fn build_listing_action(
        &self,
        id: u64,
        action: ListingAction,
    ) -> Result<HttpRequest, ApiError> {
        if !self.is_authenticated() {
            return Err(ApiError::NotAuthenticated);
        }
        let root = format!("{}/listings/{id}", self.config.base_url);
        let (method, path) = match action {
            ListingAction::Publish => (HttpMethod::Post, format!("{root}/publish")),
            ListingAction::Finish => (HttpMethod::Post, format!("{root}/finish")),
            ListingAction::Hide => (HttpMethod::Post, format!("{root}/hide")),
            ListingAction::Unhide => (HttpMethod::Post, format!("{root}/unhide")),
            ListingAction::Refresh => (HttpMethod::Put, format!("{root}/refresh")),
            ListingAction::Delete => (HttpMethod::Delete, root),
        };
        Ok(self.request(method, path))
    }

    /// The API answers lifecycle calls with either a JSON document or an
    /// empty body; the latter becomes `Value::Null`.
    pub fn parse_listing_action(&self, response: HttpResponse) -> Result<Value, ApiError> {
        check_status(&response)?;
        if response.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&response.body)?)
    }

    /// One page of a seller's listings. `user` is the username for
    /// `UserListings::Active` and the numeric user id for the rest, which
    /// also need a token.
    pub fn build_user_listings(
        &self,
        user: &str,
        kind: UserListings,
        page: u32,
    ) -> Result<HttpRequest, ApiError> {
        if kind.requires_token() && !self.is_authenticated() {
            return Err(ApiError::NotAuthenticated);
        }
        let mut path = format!("{}/users/{user}/listings", self.config.base_url);
        if let Some(segment) = kind.segment() {
            path = format!("{path}/{segment}");
        }
        Ok(self
            .request(HttpMethod::Get, path)
            .with_query(vec![("page".to_string(), page.max(1).to_string())]))
    }

    /// User listing pages share the search envelope.
    pub fn parse_user_listings(&self, response: HttpResponse) -> Result<SearchPage, ApiError> {
        self.parse_search(response)
    }

    // -----------------------------------------------------------------------
    // Categories and locations
    // -----------------------------------------------------------------------

    pub fn build_categories(&self, include_children: bool) -> HttpRequest {
        self.request(HttpMethod::Get, format!("{}/categories", self.config.base_url))
            .with_query(vec![(
                "include_children".to_string(),
                include_children.to_string(),
            )])
    }

    pub fn build_find_category(&self, name: &str) -> HttpRequest {
        self.request(
            HttpMethod::Get,
            format!("{}/categories/find", self.config.base_url),
        )
        .with_query(vec![("name".to_string(), name.to_string())])
    }

    pub fn build_cities(&self) -> HttpRequest {
        self.request(HttpMethod::Get, format!("{}/cities", self.config.base_url))
    }

    /// Parse any of the reference-data endpoints as untyped JSON.
    pub fn parse_json(&self, response: HttpResponse) -> Result<Value, ApiError> {
        decode(&response)
    }

    /// Request with the headers every call carries.
    fn request(&self, method: HttpMethod, path: String) -> HttpRequest {
        let mut headers = vec![
            ("user-agent".to_string(), self.config.user_agent.clone()),
            ("accept".to_string(), "application/json".to_string()),
        ];
        if let Some(token) = &self.config.token {
            headers.push(("authorization".to_string(), format!("Bearer {token}")));
        }
        HttpRequest {
            method,
            path,
            query: Vec::new(),
            headers,
            body: None,
        }
    }
}

trait RequestExt {
    fn with_query(self, params: Vec<(String, String)>) -> Self;
    fn with_json(self, body: String) -> Self;
}

impl RequestExt for HttpRequest {
    fn with_query(mut self, params: Vec<(String, String)>) -> Self {
        for (key, value) in params {
            set_param(&mut self.query, &key, value);
        }
        self
    }

    fn with_json(mut self, body: String) -> Self {
        self.headers
            .push(("content-type".to_string(), "application/json".to_string()));
        self.body = Some(body);
        self
    }
}

/// Map non-2xx statuses to `ApiError::Remote`.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    Err(ApiError::Remote {
        status: response.status,
        body: response.body.clone(),
    })
}

fn decode<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, ApiError> {
    check_status(response)?;
    serde_json::from_str(&response.body).map_err(|e| ApiError::Decode(e.to_string()))
}
