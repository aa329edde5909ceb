use std::collections::HashMap;

use crate::model::InventoryRecord;
use crate::normalize::normalize;
use crate::variant::expand;

/// Canonical identifier → reference URL, keyed at a fixed width.
#[derive(Debug, Clone)]
pub struct LookupTable {
    width: usize,
    entries: HashMap<String, String>,
}

impl LookupTable {
    pub fn new(width: usize) -> Self {
        Self {
            width,
            entries: HashMap::new(),
        }
    }

    /// Build from an inventory snapshot. Records without a link are skipped;
    /// on identifier collision the later record wins.
    pub fn from_records(records: &[InventoryRecord], width: usize) -> Self {
        let mut table = Self::new(width);
        for record in records {
            if record.reference_url.is_empty() {
                continue;
            }
            if let Some(previous) = table.insert(&record.identifier, &record.reference_url) {
                tracing::warn!(
                    identifier = normalize(&record.identifier, width),
                    previous = %previous,
                    replacement = %record.reference_url,
                    "duplicate inventory identifier, keeping the later link"
                );
            }
        }
        table
    }

    /// Insert under the normalized identifier. Returns the replaced URL, if any.
    pub fn insert(&mut self, raw_identifier: &str, url: &str) -> Option<String> {
        let key = normalize(raw_identifier, self.width).to_string();
        self.entries.insert(key, url.to_string())
    }

    /// Look up a candidate after normalizing it. Returns the stored key and URL.
    pub fn get(&self, candidate: &str) -> Option<(&str, &str)> {
        self.entries
            .get_key_value(normalize(candidate, self.width))
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn contains(&self, candidate: &str) -> bool {
        self.get(candidate).is_some()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

/// Outcome of resolving one listing SKU against the lookup table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub identifier: Option<String>,
    pub url: Option<String>,
    /// Base lookup plus every variant examined before the scan stopped.
    pub candidates_checked: usize,
    pub degenerate: Vec<String>,
}

impl Resolution {
    pub fn is_resolved(&self) -> bool {
        self.identifier.is_some()
    }
}

/// Resolve a listing SKU to at most one inventory identifier.
///
/// Variant candidates are tried in SKU order and the first one present in
/// the table wins, even over a base that is also present. Without a variant
/// hit the normalized base is used. An empty SKU resolves to nothing and
/// counts no comparisons.
pub fn resolve(sku: &str, lookup: &LookupTable) -> Resolution {
    if sku.is_empty() {
        return Resolution::default();
    }

    let expansion = expand(sku);
    let mut resolution = Resolution {
        candidates_checked: 1,
        degenerate: expansion.degenerate_segments(),
        ..Resolution::default()
    };

    for segment in &resolution.degenerate {
        tracing::warn!(sku, segment = %segment, "variant segment not shorter than base, skipped");
    }

    let base_hit = lookup.get(expansion.base);

    let mut hit = None;
    for variant in &expansion.variants {
        resolution.candidates_checked += 1;
        let Some(candidate) = variant.candidate.as_deref() else {
            continue;
        };
        if let Some(found) = lookup.get(candidate) {
            hit = Some(found);
            break;
        }
    }

    if let Some((identifier, url)) = hit.or(base_hit) {
        tracing::debug!(sku, identifier, "resolved");
        resolution.identifier = Some(identifier.to_string());
        resolution.url = Some(url.to_string());
    } else {
        tracing::debug!(sku, "unresolved");
    }

    resolution
}
