//! JSON snapshot files.
//!
//! Inventory: `[{"ipn": "...", "url": "...", "pk": 1}]` (`url` is `""` when
//! the part has no link, `pk` is optional).
//! Listings: `[{"title": "...", "id": "...", "SKU": "..."}]` (`SKU` is `""`
//! when the listing has none).

use crate::error::ReconError;
use crate::model::{InventoryRecord, ListingRecord};

pub fn parse_inventory(input: &str) -> Result<Vec<InventoryRecord>, ReconError> {
    serde_json::from_str(input).map_err(|e| ReconError::SnapshotParse {
        kind: "inventory",
        message: e.to_string(),
    })
}

pub fn parse_listings(input: &str) -> Result<Vec<ListingRecord>, ReconError> {
    serde_json::from_str(input).map_err(|e| ReconError::SnapshotParse {
        kind: "listings",
        message: e.to_string(),
    })
}

pub fn inventory_to_json(records: &[InventoryRecord]) -> Result<String, ReconError> {
    serde_json::to_string_pretty(records).map_err(|e| ReconError::SnapshotWrite {
        kind: "inventory",
        message: e.to_string(),
    })
}

pub fn listings_to_json(records: &[ListingRecord]) -> Result<String, ReconError> {
    serde_json::to_string_pretty(records).map_err(|e| ReconError::SnapshotWrite {
        kind: "listings",
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_inventory_shape() {
        let json = r#"[
            {"url": "https://www.ebay.it/itm/1", "ipn": "PART000001"},
            {"url": "", "ipn": "PART000002", "pk": 42}
        ]"#;
        let records = parse_inventory(json).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].identifier, "PART000001");
        assert_eq!(records[0].reference_url, "https://www.ebay.it/itm/1");
        assert_eq!(records[0].pk, None);
        assert_eq!(records[1].reference_url, "");
        assert_eq!(records[1].pk, Some(42));
    }

    #[test]
    fn missing_url_defaults_to_empty() {
        let records = parse_inventory(r#"[{"ipn": "A"}]"#).unwrap();
        assert_eq!(records[0].reference_url, "");
    }

    #[test]
    fn parse_listings_shape() {
        let json = r#"[
            {"title": "Widget", "id": "1234", "SKU": "PART000001-A"},
            {"title": "No sku", "id": "5678"}
        ]"#;
        let listings = parse_listings(json).unwrap();
        assert_eq!(listings[0].external_id, "1234");
        assert_eq!(listings[0].sku, "PART000001-A");
        assert_eq!(listings[1].sku, "");
    }

    #[test]
    fn listings_survive_a_write() {
        let listings = vec![ListingRecord::new("Widget", "1", "A-B")];
        let json = listings_to_json(&listings).unwrap();
        assert!(json.contains("\"SKU\": \"A-B\""));
        assert_eq!(parse_listings(&json).unwrap(), listings);
    }

    #[test]
    fn inventory_omits_absent_pk() {
        let json = inventory_to_json(&[InventoryRecord::new("A", "")]).unwrap();
        assert!(!json.contains("pk"));
        assert!(json.contains("\"ipn\": \"A\""));
    }

    #[test]
    fn malformed_snapshot_names_kind() {
        let err = parse_listings("{not json").unwrap_err();
        assert!(err.to_string().starts_with("listings snapshot:"));
        let err = parse_inventory(r#"[{"url": "x"}]"#).unwrap_err();
        assert!(err.to_string().contains("ipn"));
    }
}
