use crate::config::ReconConfig;
use crate::matcher::{resolve, LookupTable};
use crate::model::{InventoryRecord, ListingRecord, MatchResult, ReconMeta, ReconReport};
use crate::report::{
    build_result, compute_counts, duplicate_skus, sort_results, unlinked_identifiers,
    unmapped_identifiers,
};

/// Reconcile an inventory snapshot against the active listings.
///
/// Both snapshots must be complete; the engine never sees partial data.
pub fn reconcile(
    config: &ReconConfig,
    inventory: &[InventoryRecord],
    listings: &[ListingRecord],
) -> ReconReport {
    let width = config.matching.identifier_width;
    let prefix = config.matching.listing_url_prefix.as_str();

    let lookup = LookupTable::from_records(inventory, width);

    let mut comparisons = 0;
    let mut results: Vec<MatchResult> = Vec::with_capacity(listings.len());
    for listing in listings {
        let resolution = resolve(&listing.sku, &lookup);
        comparisons += resolution.candidates_checked;
        results.push(build_result(listing, resolution, prefix));
    }
    sort_results(&mut results);

    let duplicates = duplicate_skus(listings);
    let unmapped = unmapped_identifiers(&lookup, &results);
    let unlinked = unlinked_identifiers(inventory, &lookup);
    let counts = compute_counts(
        &results,
        comparisons,
        unmapped.len(),
        unlinked.len(),
        duplicates.len(),
    );

    tracing::info!(
        listings = listings.len(),
        inventory = inventory.len(),
        indexed = lookup.len(),
        comparisons = counts.comparisons,
        matched = counts.matched,
        not_a_match = counts.not_a_match,
        missing = counts.missing,
        "reconciliation complete"
    );

    ReconReport {
        meta: ReconMeta {
            name: config.name.clone(),
            identifier_width: width,
            listing_url_prefix: prefix.to_string(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        counts,
        duplicate_skus: duplicates,
        results,
        unmapped_identifiers: unmapped,
        unlinked_identifiers: unlinked,
    }
}
