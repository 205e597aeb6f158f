//! Client configuration.
//!
//! The marketplace exposes its REST API and its autosuggest endpoint on two
//! different hosts, so both roots are configurable. Every field has a
//! default; `from_env` overlays `CLASSIFIEDS_*` variables on top of them.

use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "https://api.olx.ba";
pub const DEFAULT_SITE_URL: &str = "https://olx.ba";

/// Connection settings shared by every request a `MarketClient` builds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Root of the REST API (`/search`, `/listings`, `/auth/login`, ...).
    pub base_url: String,
    /// Root of the public site, which hosts `/api/autosuggest`.
    pub site_url: String,
    pub user_agent: String,
    /// Bearer token sent with every request when present.
    pub token: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            site_url: DEFAULT_SITE_URL.to_string(),
            user_agent: default_user_agent(),
            token: None,
        }
    }
}

impl ClientConfig {
    /// Config pointing both roots at `base_url`, as a single mock or proxy does.
    pub fn for_host(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            site_url: base_url.to_string(),
            ..Self::default()
        }
    }

    /// Defaults overlaid with `CLASSIFIEDS_BASE_URL`, `CLASSIFIEDS_SITE_URL`,
    /// `CLASSIFIEDS_USER_AGENT` and `CLASSIFIEDS_TOKEN`. Empty values are ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();
        if let Some(v) = var("CLASSIFIEDS_BASE_URL") {
            config.base_url = v;
        }
        if let Some(v) = var("CLASSIFIEDS_SITE_URL") {
            config.site_url = v;
        }
        if let Some(v) = var("CLASSIFIEDS_USER_AGENT") {
            config.user_agent = v;
        }
        config.token = var("CLASSIFIEDS_TOKEN");
        config
    }

    /// Strip trailing slashes from both roots.
    pub(crate) fn normalized(mut self) -> Self {
        self.base_url = self.base_url.trim_end_matches('/').to_string();
        self.site_url = self.site_url.trim_end_matches('/').to_string();
        self
    }
}

fn default_user_agent() -> String {
    format!("classifieds-core/{}", env!("CARGO_PKG_VERSION"))
}
