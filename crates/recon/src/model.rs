use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One inventory part as fetched from the inventory backend.
///
/// `identifier` is the raw IPN (it may be wider than the canonical width);
/// `reference_url` is the part's stored link, empty when none is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRecord {
    #[serde(rename = "ipn")]
    pub identifier: String,
    #[serde(rename = "url", default)]
    pub reference_url: String,
    /// Backend primary key, needed to push link corrections.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pk: Option<u64>,
}

impl InventoryRecord {
    pub fn new(identifier: impl Into<String>, reference_url: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            reference_url: reference_url.into(),
            pk: None,
        }
    }
}

/// One active marketplace listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingRecord {
    #[serde(default)]
    pub title: String,
    #[serde(rename = "id")]
    pub external_id: String,
    #[serde(rename = "SKU", default)]
    pub sku: String,
}

impl ListingRecord {
    pub fn new(
        title: impl Into<String>,
        external_id: impl Into<String>,
        sku: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            external_id: external_id.into(),
            sku: sku.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    /// Resolved, and the inventory link points at this listing.
    Matched,
    /// Resolved, but the inventory link points somewhere else.
    NotAMatch,
    /// No inventory identifier could be resolved.
    Missing,
}

impl std::fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Matched => write!(f, "Match"),
            Self::NotAMatch => write!(f, "Not a match"),
            Self::Missing => write!(f, "Missing"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchResult {
    pub listing: ListingRecord,
    /// `listing_url_prefix + external_id`.
    pub listing_url: String,
    pub resolved_identifier: Option<String>,
    pub resolved_url: Option<String>,
    pub status: MatchStatus,
    /// Variant segments that could not be substituted into the base.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub degenerate_variants: Vec<String>,
}

impl MatchResult {
    /// Resolved identifier, falling back to the raw SKU. Used for ordering.
    pub fn sort_key(&self) -> &str {
        self.resolved_identifier
            .as_deref()
            .unwrap_or(&self.listing.sku)
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconCounts {
    pub comparisons: usize,
    pub matched: usize,
    pub not_a_match: usize,
    pub missing: usize,
    pub unmapped: usize,
    pub unlinked: usize,
    pub duplicates: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub name: String,
    pub identifier_width: usize,
    pub listing_url_prefix: String,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconReport {
    pub meta: ReconMeta,
    pub counts: ReconCounts,
    pub duplicate_skus: Vec<String>,
    pub results: Vec<MatchResult>,
    /// Linked inventory identifiers no listing resolved to.
    pub unmapped_identifiers: Vec<String>,
    /// Inventory identifiers with no stored link at all.
    pub unlinked_identifiers: Vec<String>,
}

impl ReconReport {
    /// True when every listing matched and no SKU is duplicated.
    pub fn is_clean(&self) -> bool {
        self.duplicate_skus.is_empty() && self.counts.not_a_match == 0 && self.counts.missing == 0
    }
}

/// A link the inventory backend should be updated with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkCorrection {
    pub identifier: String,
    pub current_url: String,
    pub new_url: String,
}
