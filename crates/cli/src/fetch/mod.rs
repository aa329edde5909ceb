//! `listcheck fetch`: pull inventory parts and marketplace listings into JSON snapshots.

mod common;
pub(crate) mod ebay;
pub(crate) mod inventree;

use std::path::PathBuf;

use clap::Subcommand;

use listcheck_recon::config::ReconConfig;
use listcheck_recon::snapshot;

use crate::CliError;

pub(crate) use common::show_progress;

#[derive(Subcommand)]
pub enum FetchCommands {
    /// Fetch parts (IPN + link) from InvenTree
    #[command(after_help = "\
Examples:
  listcheck fetch inventory --out stock_listings.json
  listcheck fetch inventory --token 0123abcd...
  INVENTREE_TOKEN=0123abcd... listcheck fetch inventory
  INVENTREE_USERNAME=admin INVENTREE_PASSWORD=... listcheck fetch inventory")]
    Inventory {
        /// Output JSON file path (default: stdout)
        #[arg(long)]
        out: Option<PathBuf>,

        /// InvenTree API token (default: INVENTREE_TOKEN env)
        #[arg(long)]
        token: Option<String>,

        /// Suppress progress on stderr
        #[arg(long, short = 'q')]
        quiet: bool,
    },

    /// Fetch active listings from eBay
    #[command(after_help = "\
Examples:
  listcheck fetch listings --out active_listings.json
  listcheck fetch listings --token v^1.1#i^1...
  EBAY_TOKEN=v^1.1#i^1... listcheck fetch listings")]
    Listings {
        /// Output JSON file path (default: stdout)
        #[arg(long)]
        out: Option<PathBuf>,

        /// eBay Trading API user token (default: EBAY_TOKEN env)
        #[arg(long)]
        token: Option<String>,

        /// Suppress progress on stderr
        #[arg(long, short = 'q')]
        quiet: bool,
    },
}

pub fn cmd_fetch(config: &ReconConfig, command: FetchCommands) -> Result<(), CliError> {
    match command {
        FetchCommands::Inventory { out, token, quiet } => {
            cmd_fetch_inventory(config, out, token, quiet)
        }
        FetchCommands::Listings { out, token, quiet } => {
            cmd_fetch_listings(config, out, token, quiet)
        }
    }
}

fn cmd_fetch_inventory(
    config: &ReconConfig,
    out: Option<PathBuf>,
    token: Option<String>,
    quiet: bool,
) -> Result<(), CliError> {
    let client = inventree::InventreeClient::connect(config, token, "--token")?;
    let parts = client.fetch_parts()?;
    let body = snapshot::inventory_to_json(&parts)?;
    let label = common::write_output(&body, &out)?;

    if show_progress(quiet) {
        let unlinked = parts.iter().filter(|p| p.reference_url.is_empty()).count();
        eprintln!(
            "Fetched {} parts ({} without link) -> {}",
            parts.len(),
            unlinked,
            label
        );
    }
    Ok(())
}

fn cmd_fetch_listings(
    config: &ReconConfig,
    out: Option<PathBuf>,
    token: Option<String>,
    quiet: bool,
) -> Result<(), CliError> {
    let client = ebay::EbayClient::connect(&config.ebay, token, "--token")?;
    let listings = client.fetch_active_listings(quiet)?;
    let body = snapshot::listings_to_json(&listings)?;
    let label = common::write_output(&body, &out)?;

    if show_progress(quiet) {
        let no_sku = listings.iter().filter(|l| l.sku.is_empty()).count();
        eprintln!(
            "Fetched {} active listings ({} without SKU) -> {}",
            listings.len(),
            no_sku,
            label
        );
    }
    Ok(())
}
