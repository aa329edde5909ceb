use std::path::PathBuf;

use listcheck_recon::config::ReconConfig;
use listcheck_recon::engine::reconcile;
use listcheck_recon::model::{InventoryRecord, ListingRecord, MatchStatus, ReconReport};
use listcheck_recon::report::link_corrections;
use listcheck_recon::snapshot::{parse_inventory, parse_listings};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_and_run() -> ReconReport {
    let dir = fixtures_dir();
    let config = ReconConfig::from_file(&dir.join("listcheck.toml")).unwrap();
    let inventory =
        parse_inventory(&std::fs::read_to_string(dir.join("stock_listings.json")).unwrap())
            .unwrap();
    let listings =
        parse_listings(&std::fs::read_to_string(dir.join("active_listings.json")).unwrap())
            .unwrap();
    reconcile(&config, &inventory, &listings)
}

fn shop_config() -> ReconConfig {
    ReconConfig::from_toml(
        r#"
[matching]
listing_url_prefix = "https://shop/item/"
"#,
    )
    .unwrap()
}

// -------------------------------------------------------------------------
// End-to-end scenarios
// -------------------------------------------------------------------------

#[test]
fn scenario_matched() {
    let inventory = vec![InventoryRecord::new("PART000001", "https://shop/item/1")];
    let listings = vec![ListingRecord::new("t", "1", "PART000001")];
    let report = reconcile(&shop_config(), &inventory, &listings);

    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].status, MatchStatus::Matched);
    assert_eq!(report.results[0].listing_url, "https://shop/item/1");
    assert_eq!(report.counts.comparisons, 1);
    assert_eq!(report.counts.matched, 1);
    assert_eq!(report.counts.not_a_match, 0);
    assert_eq!(report.counts.missing, 0);
    assert!(report.unmapped_identifiers.is_empty());
    assert!(report.is_clean());
}

#[test]
fn scenario_wrong_listing_id() {
    let inventory = vec![InventoryRecord::new("PART000001", "https://shop/item/1")];
    let listings = vec![ListingRecord::new("t", "2", "PART000001")];
    let report = reconcile(&shop_config(), &inventory, &listings);

    assert_eq!(report.results[0].status, MatchStatus::NotAMatch);
    assert_eq!(
        report.results[0].resolved_identifier.as_deref(),
        Some("PART000001")
    );
    assert_eq!(report.counts.not_a_match, 1);
    assert!(!report.is_clean());

    let fixes = link_corrections(&report);
    assert_eq!(fixes.len(), 1);
    assert_eq!(fixes[0].identifier, "PART000001");
    assert_eq!(fixes[0].current_url, "https://shop/item/1");
    assert_eq!(fixes[0].new_url, "https://shop/item/2");
}

#[test]
fn scenario_unknown_sku() {
    let inventory = vec![InventoryRecord::new("PART000001", "u")];
    let listings = vec![ListingRecord::new("t", "9", "UNKNOWN")];
    let report = reconcile(&shop_config(), &inventory, &listings);

    assert_eq!(report.results[0].status, MatchStatus::Missing);
    assert_eq!(report.results[0].resolved_identifier, None);
    assert_eq!(report.counts.missing, 1);
    assert_eq!(report.unmapped_identifiers, vec!["PART000001"]);
    assert_eq!(report.counts.unmapped, 1);
}

#[test]
fn scenario_variant_suffix() {
    let inventory = vec![InventoryRecord::new("PART0000A", "https://shop/item/5")];
    let listings = vec![ListingRecord::new("t", "5", "PART00001-A")];
    let report = reconcile(&shop_config(), &inventory, &listings);

    assert_eq!(
        report.results[0].resolved_identifier.as_deref(),
        Some("PART0000A")
    );
    assert_eq!(report.results[0].status, MatchStatus::Matched);
    assert_eq!(report.counts.comparisons, 2);
}

#[test]
fn duplicate_skus_reported() {
    let listings = vec![
        ListingRecord::new("a", "1", "X"),
        ListingRecord::new("b", "2", "X"),
        ListingRecord::new("c", "3", "Y"),
    ];
    let report = reconcile(&shop_config(), &[], &listings);
    assert_eq!(report.duplicate_skus, vec!["X"]);
    assert_eq!(report.counts.duplicates, 1);
}

#[test]
fn degenerate_variant_listing_is_missing() {
    let inventory = vec![InventoryRecord::new("AB", "https://shop/item/1")];
    let listings = vec![ListingRecord::new("t", "1", "ZZ-LONGER")];
    let report = reconcile(&shop_config(), &inventory, &listings);
    assert_eq!(report.results[0].status, MatchStatus::Missing);
    assert_eq!(report.results[0].degenerate_variants, vec!["LONGER"]);
}

// -------------------------------------------------------------------------
// Fixture run
// -------------------------------------------------------------------------

#[test]
fn fixture_counts() {
    let report = load_and_run();

    assert_eq!(report.meta.name, "fixture");
    assert_eq!(report.results.len(), 7);
    assert_eq!(report.counts.comparisons, 7);
    assert_eq!(report.counts.matched, 3);
    assert_eq!(report.counts.not_a_match, 1);
    assert_eq!(report.counts.missing, 3);
    assert_eq!(report.duplicate_skus, vec!["REL00000700"]);
    assert_eq!(report.unmapped_identifiers, vec!["LED00000500"]);
    assert_eq!(report.unlinked_identifiers, vec!["FUSE0000600"]);
}

#[test]
fn fixture_detail_order() {
    let report = load_and_run();
    let keys: Vec<&str> = report.results.iter().map(|r| r.sort_key()).collect();
    assert_eq!(
        keys,
        vec![
            "",
            "CAP00000100",
            "CAP00000200",
            "IC000000400",
            "REL00000700",
            "REL00000700",
            "RES0000030A",
        ]
    );
    // Equal keys keep listing order
    assert_eq!(report.results[4].listing.external_id, "700");
    assert_eq!(report.results[5].listing.external_id, "701");
}

#[test]
fn fixture_truncated_inventory_ipn_matches() {
    let report = load_and_run();
    let op_amp = report
        .results
        .iter()
        .find(|r| r.listing.external_id == "400")
        .unwrap();
    assert_eq!(op_amp.status, MatchStatus::Matched);
    assert_eq!(op_amp.resolved_identifier.as_deref(), Some("IC000000400"));
}

#[test]
fn fixture_corrections() {
    let report = load_and_run();
    let fixes = link_corrections(&report);
    assert_eq!(fixes.len(), 1);
    assert_eq!(fixes[0].identifier, "CAP00000200");
    assert_eq!(fixes[0].current_url, "https://www.ebay.it/itm/999");
    assert_eq!(fixes[0].new_url, "https://www.ebay.it/itm/200");
}

#[test]
fn report_serializes() {
    let report = load_and_run();
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["counts"]["not_a_match"], 1);
    assert_eq!(json["results"][2]["status"], "not_a_match");
    assert_eq!(json["results"][2]["listing"]["SKU"], "CAP00000200");
}
