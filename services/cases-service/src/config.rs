//! Configuration for the cases service.

use crate::store::PageLimits;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;

/// Cases service configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CasesServiceConfig {
    /// Service configuration.
    #[serde(default)]
    pub service: ServiceConfig,
    /// List paging configuration.
    #[serde(default)]
    pub listing: ListingConfig,
    /// Caller authentication configuration.
    #[serde(default)]
    pub auth: AuthConfig,
}

/// Service endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// List paging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ListingConfig {
    /// Page size used when a request does not specify one.
    #[serde(default = "default_page_size")]
    pub default_size: usize,
    /// Upper bound on the page size a request may ask for.
    #[serde(default = "default_max_page_size")]
    pub max_size: usize,
}

/// Caller authentication configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    /// Treat requests without identity metadata as an anonymous superuser.
    #[serde(default)]
    pub allow_anonymous: bool,
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    50061
}

const fn default_page_size() -> usize {
    16
}

const fn default_max_page_size() -> usize {
    1000
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            default_size: default_page_size(),
            max_size: default_max_page_size(),
        }
    }
}

impl ListingConfig {
    /// Paging limits applied to list requests.
    #[must_use]
    pub fn limits(&self) -> PageLimits {
        PageLimits::new(self.default_size, self.max_size)
    }
}

impl CasesServiceConfig {
    /// Load configuration from files and environment.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, Box<figment::Error>> {
        Self::from_figment(
            Figment::new()
                .merge(Toml::file("config/default.toml"))
                .merge(Toml::file("config/local.toml"))
                .merge(Env::prefixed("CASES_SERVICE_").split("__")),
        )
    }

    /// Extract configuration from an already assembled figment.
    ///
    /// # Errors
    ///
    /// Returns an error if the figment cannot be deserialized.
    pub fn from_figment(figment: Figment) -> Result<Self, Box<figment::Error>> {
        figment.extract().map_err(Box::new)
    }
}
