//! `listcheck run`: reconcile InvenTree part links against active eBay listings.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use listcheck_recon::config::ReconConfig;
use listcheck_recon::normalize::normalize;
use listcheck_recon::report::link_corrections;
use listcheck_recon::snapshot;
use listcheck_recon::{reconcile, InventoryRecord, ListingRecord, MatchStatus, ReconError, ReconReport};

use crate::exit_codes::EXIT_RECON_FINDINGS;
use crate::fetch::ebay::EbayClient;
use crate::fetch::inventree::InventreeClient;
use crate::fetch::show_progress;
use crate::CliError;

pub struct RunArgs {
    pub inventory: Option<PathBuf>,
    pub listings: Option<PathBuf>,
    pub json: bool,
    pub output: Option<PathBuf>,
    pub csv: Option<PathBuf>,
    pub fix_links: bool,
    pub inventree_token: Option<String>,
    pub ebay_token: Option<String>,
    pub quiet: bool,
}

fn read_snapshot<T>(
    path: &Path,
    parse: fn(&str) -> Result<Vec<T>, ReconError>,
) -> Result<Vec<T>, CliError> {
    let data = std::fs::read_to_string(path)
        .map_err(|e| CliError::io(format!("cannot read {}: {e}", path.display())))?;
    parse(&data).map_err(|e| CliError::from(e).with_hint(format!("in {}", path.display())))
}

pub fn cmd_run(config: &ReconConfig, args: RunArgs) -> Result<(), CliError> {
    let progress = show_progress(args.quiet);

    // Inventory first: a live InvenTree client is reused for --fix-links
    let mut inventree: Option<InventreeClient> = None;
    let inventory: Vec<InventoryRecord> = match args.inventory {
        Some(ref path) => read_snapshot(path, snapshot::parse_inventory)?,
        None => {
            let client = InventreeClient::connect(config, args.inventree_token.clone(), "--inventree-token")?;
            if progress {
                eprintln!("Fetching parts from InvenTree...");
            }
            let parts = client.fetch_parts()?;
            inventree = Some(client);
            parts
        }
    };

    if args.fix_links && inventory.iter().all(|r| r.pk.is_none()) && !inventory.is_empty() {
        return Err(CliError::args("--fix-links needs part keys, but the inventory snapshot has none")
            .with_hint("re-create it with `listcheck fetch inventory`"));
    }

    let listings: Vec<ListingRecord> = match args.listings {
        Some(ref path) => read_snapshot(path, snapshot::parse_listings)?,
        None => {
            let client = EbayClient::connect(&config.ebay, args.ebay_token.clone(), "--ebay-token")?;
            if progress {
                eprintln!("Fetching active listings from eBay...");
            }
            client.fetch_active_listings(args.quiet)?
        }
    };

    let report = reconcile(config, &inventory, &listings);

    let json_str = serde_json::to_string_pretty(&report)
        .map_err(|e| CliError::io(format!("JSON serialization error: {e}")))?;

    if let Some(ref path) = args.output {
        std::fs::write(path, &json_str)
            .map_err(|e| CliError::io(format!("cannot write {}: {e}", path.display())))?;
        if !args.quiet {
            eprintln!("wrote {}", path.display());
        }
    }

    if let Some(ref path) = args.csv {
        write_csv(&report, path)?;
        if !args.quiet {
            eprintln!("wrote {}", path.display());
        }
    }

    if args.json {
        println!("{json_str}");
    } else {
        print!("{}", render_human(&report));
    }

    let c = &report.counts;
    if !args.quiet {
        eprintln!(
            "recon '{}': {} listings, {} comparisons ({} matched, {} not a match, {} missing), {} duplicate SKUs, {} unmapped, {} unlinked",
            report.meta.name,
            report.results.len(),
            c.comparisons,
            c.matched,
            c.not_a_match,
            c.missing,
            c.duplicates,
            c.unmapped,
            c.unlinked,
        );
    }

    if args.fix_links {
        let client = match inventree {
            Some(client) => client,
            None => InventreeClient::connect(config, args.inventree_token, "--inventree-token")?,
        };
        push_corrections(&client, &report, &inventory, config.matching.identifier_width, args.quiet)?;
    }

    if !report.is_clean() {
        return Err(CliError {
            code: EXIT_RECON_FINDINGS,
            message: format!(
                "reconciliation found problems: {} duplicate SKUs, {} not a match, {} missing",
                c.duplicates, c.not_a_match, c.missing
            ),
            hint: (c.not_a_match > 0 && !args.fix_links)
                .then(|| "rerun with --fix-links to update the stored links".to_string()),
        });
    }

    Ok(())
}

/// Plain report in the order an operator reads it: duplicates, problem
/// listings, then inventory-side gaps.
fn render_human(report: &ReconReport) -> String {
    let mut out = String::new();

    for sku in &report.duplicate_skus {
        out.push_str(&format!("Duplicate found: {sku}\n"));
    }

    for r in report.results.iter().filter(|r| r.status != MatchStatus::Matched) {
        out.push_str(&format!(
            "eBay URL: {} - IPN: {} - {} on Inventree URL\n",
            r.listing_url,
            r.sort_key(),
            r.status
        ));
    }

    for ipn in &report.unmapped_identifiers {
        out.push_str(&format!("IPN: {ipn} - Not mapped on eBay\n"));
    }

    for ipn in &report.unlinked_identifiers {
        out.push_str(&format!("IPN: {ipn} - No link on Inventree\n"));
    }

    out
}

fn write_csv(report: &ReconReport, path: &Path) -> Result<(), CliError> {
    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());

    writer.write_record([
        "listing_id", "title", "sku", "listing_url", "ipn", "inventree_url", "status",
    ]).map_err(|e| CliError::io(e.to_string()))?;

    for r in &report.results {
        let status = r.status.to_string();
        writer.write_record([
            r.listing.external_id.as_str(),
            r.listing.title.as_str(),
            r.listing.sku.as_str(),
            r.listing_url.as_str(),
            r.resolved_identifier.as_deref().unwrap_or(""),
            r.resolved_url.as_deref().unwrap_or(""),
            status.as_str(),
        ]).map_err(|e| CliError::io(e.to_string()))?;
    }

    let bytes = writer.into_inner().map_err(|e| CliError::io(e.to_string()))?;
    std::fs::write(path, bytes)
        .map_err(|e| CliError::io(format!("cannot write {}: {e}", path.display())))
}

/// Normalized identifier → part pk, built with the same keying and
/// last-write-wins rule as the lookup table.
fn part_keys(inventory: &[InventoryRecord], width: usize) -> HashMap<String, u64> {
    inventory
        .iter()
        .filter(|r| !r.reference_url.is_empty())
        .filter_map(|r| r.pk.map(|pk| (normalize(&r.identifier, width).to_string(), pk)))
        .collect()
}

fn push_corrections(
    client: &InventreeClient,
    report: &ReconReport,
    inventory: &[InventoryRecord],
    width: usize,
    quiet: bool,
) -> Result<(), CliError> {
    let corrections = link_corrections(report);
    if corrections.is_empty() {
        return Ok(());
    }

    let keys = part_keys(inventory, width);
    let mut updated = 0usize;

    for fix in &corrections {
        let Some(&pk) = keys.get(&fix.identifier) else {
            tracing::warn!(identifier = %fix.identifier, "no part key for identifier, link not updated");
            continue;
        };
        client.push_link(pk, &fix.new_url)?;
        tracing::info!(identifier = %fix.identifier, pk, from = %fix.current_url, to = %fix.new_url, "link updated");
        if !quiet {
            eprintln!("updated {}: {} -> {}", fix.identifier, fix.current_url, fix.new_url);
        }
        updated += 1;
    }

    if !quiet {
        eprintln!("updated {updated} of {} links", corrections.len());
    }
    Ok(())
}
