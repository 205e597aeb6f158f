//! Synchronous client core for a classifieds marketplace API.
//!
//! # Overview
//! Builds `HttpRequest` values and parses `HttpResponse` values without
//! touching the network (host-does-IO pattern). On top of that single-request
//! layer sits the `Paginator`, which walks a rate-limited, meta-driven search
//! endpoint page by page through a host-supplied `Transport` and hands back
//! one flattened result set, and `shaping`, which filters, sorts and
//! summarizes that result set.
//!
//! # Design
//! - `MarketClient` is stateless; it holds only its `ClientConfig`.
//! - Each operation is split into `build_*` (produces request) and
//!   `parse_*` (consumes response), so the I/O boundary is explicit.
//! - Aggregation is sequential and tolerant of failures after page 1: the
//!   result says why it stopped instead of raising.
//! - Listing records stay opaque JSON objects; DTOs are defined
//!   independently from the mock-server crate and integration tests catch
//!   schema drift.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod paginate;
pub mod shaping;
pub mod types;

pub use client::MarketClient;
pub use config::ClientConfig;
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport};
pub use paginate::{plan_pages, AggregationResult, CancelFlag, Paginator, StopReason};
pub use shaping::{
    price_of, price_summary, sort_by_price, Condition, ListingFilter, PriceOrder, PriceSummary,
};
pub use types::{
    AutosuggestResult, CategorySuggestion, Credentials, ListingAction, LoginResponse, PageMeta,
    Record, SearchOptions, SearchPage, SearchQuery, SortDirection, UserListings,
    DEFAULT_PER_PAGE,
};
