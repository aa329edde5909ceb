use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::matcher::{LookupTable, Resolution};
use crate::model::{
    InventoryRecord, LinkCorrection, ListingRecord, MatchResult, MatchStatus, ReconCounts,
    ReconReport,
};
use crate::normalize::normalize;

/// URL the inventory part of a listing is expected to link to.
pub fn listing_url(prefix: &str, external_id: &str) -> String {
    format!("{prefix}{external_id}")
}

/// Non-empty SKUs carried by more than one listing, sorted.
pub fn duplicate_skus(listings: &[ListingRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut duplicates = BTreeSet::new();
    for listing in listings {
        if listing.sku.is_empty() {
            continue;
        }
        if !seen.insert(listing.sku.as_str()) {
            duplicates.insert(listing.sku.clone());
        }
    }
    duplicates.into_iter().collect()
}

pub fn classify(resolution: &Resolution, listing_url: &str) -> MatchStatus {
    match resolution.url.as_deref() {
        None => MatchStatus::Missing,
        Some(url) if url == listing_url => MatchStatus::Matched,
        Some(_) => MatchStatus::NotAMatch,
    }
}

pub fn build_result(listing: &ListingRecord, resolution: Resolution, prefix: &str) -> MatchResult {
    let url = listing_url(prefix, &listing.external_id);
    let status = classify(&resolution, &url);
    MatchResult {
        listing: listing.clone(),
        listing_url: url,
        resolved_identifier: resolution.identifier,
        resolved_url: resolution.url,
        status,
        degenerate_variants: resolution.degenerate,
    }
}

/// Sort detail rows by resolved identifier (raw SKU when unresolved).
/// Stable, so listings sharing a key keep their input order.
pub fn sort_results(results: &mut [MatchResult]) {
    results.sort_by(|a, b| a.sort_key().cmp(b.sort_key()));
}

/// Indexed identifiers that no listing resolved to, sorted.
pub fn unmapped_identifiers(lookup: &LookupTable, results: &[MatchResult]) -> Vec<String> {
    let resolved: HashSet<&str> = results
        .iter()
        .filter_map(|r| r.resolved_identifier.as_deref())
        .collect();

    let unmapped: BTreeSet<&str> = lookup
        .identifiers()
        .filter(|id| !resolved.contains(id))
        .collect();
    unmapped.into_iter().map(str::to_string).collect()
}

/// Normalized identifiers of inventory records with no link, sorted.
///
/// An identifier that also has a linked record is not reported here.
pub fn unlinked_identifiers(records: &[InventoryRecord], lookup: &LookupTable) -> Vec<String> {
    let width = lookup.width();
    let unlinked: BTreeSet<&str> = records
        .iter()
        .filter(|r| r.reference_url.is_empty())
        .map(|r| normalize(&r.identifier, width))
        .filter(|id| !lookup.contains(id))
        .collect();
    unlinked.into_iter().map(str::to_string).collect()
}

pub fn compute_counts(
    results: &[MatchResult],
    comparisons: usize,
    unmapped: usize,
    unlinked: usize,
    duplicates: usize,
) -> ReconCounts {
    let mut counts = ReconCounts {
        comparisons,
        unmapped,
        unlinked,
        duplicates,
        ..ReconCounts::default()
    };

    for r in results {
        match r.status {
            MatchStatus::Matched => counts.matched += 1,
            MatchStatus::NotAMatch => counts.not_a_match += 1,
            MatchStatus::Missing => counts.missing += 1,
        }
    }

    counts
}

/// One correction per identifier whose stored link disagrees with a listing.
///
/// Skips identifiers that some listing already matches and listings whose
/// SKU is duplicated. Among the remaining listings resolving to one
/// identifier the last in report order wins. Output is sorted by identifier.
pub fn link_corrections(report: &ReconReport) -> Vec<LinkCorrection> {
    let matched: HashSet<&str> = report
        .results
        .iter()
        .filter(|r| r.status == MatchStatus::Matched)
        .filter_map(|r| r.resolved_identifier.as_deref())
        .collect();
    let duplicated: HashSet<&str> = report.duplicate_skus.iter().map(String::as_str).collect();

    let mut by_identifier: BTreeMap<&str, LinkCorrection> = BTreeMap::new();

    for r in &report.results {
        if r.status != MatchStatus::NotAMatch || duplicated.contains(r.listing.sku.as_str()) {
            continue;
        }
        let (Some(identifier), Some(current)) =
            (r.resolved_identifier.as_deref(), r.resolved_url.as_deref())
        else {
            continue;
        };
        if matched.contains(identifier) {
            continue;
        }
        by_identifier.insert(
            identifier,
            LinkCorrection {
                identifier: identifier.to_string(),
                current_url: current.to_string(),
                new_url: r.listing_url.clone(),
            },
        );
    }

    by_identifier.into_values().collect()
}
