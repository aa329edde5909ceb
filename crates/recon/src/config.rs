use std::path::Path;

use serde::Deserialize;

use crate::error::ReconError;

/// Canonical identifier width used when no config overrides it.
pub const DEFAULT_IDENTIFIER_WIDTH: usize = 11;

/// Marketplace item page prefix; the listing id is appended to it.
pub const DEFAULT_LISTING_URL_PREFIX: &str = "https://www.ebay.it/itm/";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ReconConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub inventree: InventreeConfig,
    #[serde(default)]
    pub ebay: EbayConfig,
    #[serde(default)]
    pub stock: StockConfig,
}

fn default_name() -> String {
    "listcheck".into()
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            matching: MatchingConfig::default(),
            inventree: InventreeConfig::default(),
            ebay: EbayConfig::default(),
            stock: StockConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingConfig {
    /// Width W that both inventory IPNs and listing SKUs are cut to before comparison.
    #[serde(default = "default_identifier_width")]
    pub identifier_width: usize,
    /// `listing_url_prefix + listing id` is the URL an inventory part should link to.
    #[serde(default = "default_listing_url_prefix")]
    pub listing_url_prefix: String,
}

fn default_identifier_width() -> usize {
    DEFAULT_IDENTIFIER_WIDTH
}

fn default_listing_url_prefix() -> String {
    DEFAULT_LISTING_URL_PREFIX.into()
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            identifier_width: DEFAULT_IDENTIFIER_WIDTH,
            listing_url_prefix: DEFAULT_LISTING_URL_PREFIX.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Backends
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct InventreeConfig {
    /// Base URL of the InvenTree server. Only required by commands that talk to it.
    #[serde(default)]
    pub server: Option<String>,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page_size() -> u32 {
    500
}

impl Default for InventreeConfig {
    fn default() -> Self {
        Self {
            server: None,
            page_size: default_page_size(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EbayConfig {
    #[serde(default = "default_ebay_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_site_id")]
    pub site_id: u32,
    #[serde(default = "default_compatibility_level")]
    pub compatibility_level: u32,
    #[serde(default = "default_entries_per_page")]
    pub entries_per_page: u32,
}

fn default_ebay_endpoint() -> String {
    "https://api.ebay.com/ws/api.dll".into()
}

fn default_site_id() -> u32 {
    101
}

fn default_compatibility_level() -> u32 {
    1193
}

fn default_entries_per_page() -> u32 {
    200
}

impl Default for EbayConfig {
    fn default() -> Self {
        Self {
            endpoint: default_ebay_endpoint(),
            site_id: default_site_id(),
            compatibility_level: default_compatibility_level(),
            entries_per_page: default_entries_per_page(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StockConfig {
    /// Stock location pk assigned to placeholder stock items.
    #[serde(default)]
    pub placeholder_location: Option<u64>,
    #[serde(default)]
    pub placeholder_quantity: u32,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ReconError> {
        let input = std::fs::read_to_string(path)
            .map_err(|e| ReconError::Io(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml(&input)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.matching.identifier_width == 0 {
            return Err(ReconError::ConfigValidation(
                "matching.identifier_width must be at least 1".into(),
            ));
        }

        if self.matching.listing_url_prefix.trim().is_empty() {
            return Err(ReconError::ConfigValidation(
                "matching.listing_url_prefix must not be empty".into(),
            ));
        }

        if self.inventree.page_size == 0 {
            return Err(ReconError::ConfigValidation(
                "inventree.page_size must be at least 1".into(),
            ));
        }

        // Trading API caps EntriesPerPage at 200
        if !(1..=200).contains(&self.ebay.entries_per_page) {
            return Err(ReconError::ConfigValidation(format!(
                "ebay.entries_per_page must be between 1 and 200, got {}",
                self.ebay.entries_per_page
            )));
        }

        if let Some(ref server) = self.inventree.server {
            check_http_url("inventree.server", server)?;
        }
        check_http_url("ebay.endpoint", &self.ebay.endpoint)?;

        Ok(())
    }

    /// The InvenTree server URL without a trailing slash, or a validation error
    /// naming the missing key.
    pub fn inventree_server(&self) -> Result<String, ReconError> {
        self.inventree
            .server
            .as_deref()
            .map(|s| s.trim_end_matches('/').to_string())
            .ok_or_else(|| {
                ReconError::ConfigValidation("inventree.server is not configured".into())
            })
    }
}

fn check_http_url(key: &str, value: &str) -> Result<(), ReconError> {
    let parsed = url::Url::parse(value).map_err(|e| {
        ReconError::ConfigValidation(format!("{key}: invalid URL {value:?}: {e}"))
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ReconError::ConfigValidation(format!(
            "{key}: unsupported scheme \"{other}\" (expected http or https)"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
