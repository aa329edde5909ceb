//! Physical stock audit: parts with no stock record, and stock records with
//! no packaging attribute.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::model::InventoryRecord;

/// One stock item as reported by the inventory backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockItem {
    pub pk: u64,
    /// Primary key of the part this item belongs to.
    pub part: u64,
    #[serde(default)]
    pub quantity: f64,
    #[serde(default)]
    pub packaging: Option<String>,
}

impl StockItem {
    pub fn has_packaging(&self) -> bool {
        self.packaging
            .as_deref()
            .is_some_and(|p| !p.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartGap {
    pub identifier: String,
    pub pk: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackagingGap {
    pub identifier: String,
    pub stock_pks: Vec<u64>,
}

/// Unpackaged stock whose part is not among the audited parts, keyed by
/// part pk (the part has no IPN or no pk on our side).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrphanPackagingGap {
    pub part: u64,
    pub stock_pks: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaceholderRequest {
    pub identifier: String,
    pub part: u64,
    pub quantity: u32,
    pub location: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StockAudit {
    pub parts_without_stock: Vec<PartGap>,
    pub stock_without_packaging: Vec<PackagingGap>,
    pub orphan_stock_without_packaging: Vec<OrphanPackagingGap>,
    /// Parts that carried no primary key and could not be audited.
    pub skipped_parts: usize,
}

impl StockAudit {
    pub fn is_clean(&self) -> bool {
        self.parts_without_stock.is_empty() && !self.has_unpackaged_stock()
    }

    pub fn has_unpackaged_stock(&self) -> bool {
        !self.stock_without_packaging.is_empty() || !self.orphan_stock_without_packaging.is_empty()
    }

    /// One placeholder stock item per part that has none.
    pub fn placeholder_requests(&self, quantity: u32, location: Option<u64>) -> Vec<PlaceholderRequest> {
        self.parts_without_stock
            .iter()
            .map(|gap| PlaceholderRequest {
                identifier: gap.identifier.clone(),
                part: gap.pk,
                quantity,
                location,
            })
            .collect()
    }
}

/// Audit parts against their stock items. Output lists are sorted by identifier.
pub fn audit(parts: &[InventoryRecord], stock: &[StockItem]) -> StockAudit {
    let stocked: HashSet<u64> = stock.iter().map(|s| s.part).collect();

    let mut unpackaged: BTreeMap<u64, Vec<u64>> = BTreeMap::new();
    for item in stock.iter().filter(|s| !s.has_packaging()) {
        unpackaged.entry(item.part).or_default().push(item.pk);
    }

    let mut result = StockAudit::default();
    for part in parts {
        let Some(pk) = part.pk else {
            result.skipped_parts += 1;
            continue;
        };
        if !stocked.contains(&pk) {
            result.parts_without_stock.push(PartGap {
                identifier: part.identifier.clone(),
                pk,
            });
        }
        if let Some(mut pks) = unpackaged.remove(&pk) {
            pks.sort_unstable();
            result.stock_without_packaging.push(PackagingGap {
                identifier: part.identifier.clone(),
                stock_pks: pks,
            });
        }
    }

    if !unpackaged.is_empty() {
        tracing::warn!(
            parts = unpackaged.len(),
            "stock without packaging belongs to parts outside the audited set"
        );
    }
    // BTreeMap keeps these ordered by part pk
    result.orphan_stock_without_packaging = unpackaged
        .into_iter()
        .map(|(part, mut stock_pks)| {
            stock_pks.sort_unstable();
            OrphanPackagingGap { part, stock_pks }
        })
        .collect();
    if result.skipped_parts > 0 {
        tracing::warn!(skipped = result.skipped_parts, "parts without pk were not audited");
    }

    result
        .parts_without_stock
        .sort_by(|a, b| a.identifier.cmp(&b.identifier));
    result
        .stock_without_packaging
        .sort_by(|a, b| a.identifier.cmp(&b.identifier));
    result
}
