//! `listcheck stock`: physical stock checks against InvenTree.

use clap::Subcommand;

use listcheck_recon::config::ReconConfig;
use listcheck_recon::stock::{audit, StockAudit};

use crate::exit_codes::EXIT_RECON_FINDINGS;
use crate::fetch::inventree::InventreeClient;
use crate::fetch::show_progress;
use crate::CliError;

#[derive(Subcommand)]
pub enum StockCommands {
    /// Report parts without stock items and stock items without packaging
    #[command(after_help = "\
Examples:
  listcheck stock audit
  listcheck stock audit --json
  listcheck stock audit --create-placeholders")]
    Audit {
        /// Create one placeholder stock item for each part that has none
        #[arg(long)]
        create_placeholders: bool,

        /// Output JSON to stdout instead of human summary
        #[arg(long)]
        json: bool,

        /// InvenTree API token (default: INVENTREE_TOKEN env)
        #[arg(long)]
        inventree_token: Option<String>,

        /// Suppress progress on stderr
        #[arg(long, short = 'q')]
        quiet: bool,
    },
}

pub fn cmd_stock(config: &ReconConfig, cmd: StockCommands) -> Result<(), CliError> {
    match cmd {
        StockCommands::Audit {
            create_placeholders,
            json,
            inventree_token,
            quiet,
        } => cmd_stock_audit(config, create_placeholders, json, inventree_token, quiet),
    }
}

fn cmd_stock_audit(
    config: &ReconConfig,
    create_placeholders: bool,
    json: bool,
    inventree_token: Option<String>,
    quiet: bool,
) -> Result<(), CliError> {
    let client = InventreeClient::connect(config, inventree_token, "--inventree-token")?;

    if show_progress(quiet) {
        eprintln!("Fetching parts and stock from InvenTree...");
    }
    let parts = client.fetch_parts()?;
    let stock = client.fetch_stock()?;
    let result = audit(&parts, &stock);

    if json {
        let json_str = serde_json::to_string_pretty(&result)
            .map_err(|e| CliError::io(format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    } else {
        print!("{}", render_human(&result));
    }

    if !quiet {
        eprintln!(
            "stock audit: {} parts, {} stock items, {} without stock, {} with unpackaged stock",
            parts.len(),
            stock.len(),
            result.parts_without_stock.len(),
            unpackaged_parts(&result),
        );
    }

    if create_placeholders {
        let requests = result.placeholder_requests(
            config.stock.placeholder_quantity,
            config.stock.placeholder_location,
        );
        for req in &requests {
            let created = client.create_stock_item(req)?;
            tracing::info!(identifier = %req.identifier, part = req.part, stock_pk = ?created, "placeholder stock created");
            if !quiet {
                eprintln!("created placeholder stock for {}", req.identifier);
            }
        }
    }

    if result.is_clean() {
        return Ok(());
    }

    // Parts that just got a placeholder are no longer gaps
    let missing_stock = if create_placeholders {
        0
    } else {
        result.parts_without_stock.len()
    };
    let unpackaged = unpackaged_parts(&result);

    if missing_stock > 0 || result.has_unpackaged_stock() {
        return Err(CliError {
            code: EXIT_RECON_FINDINGS,
            message: format!(
                "stock audit found problems: {missing_stock} parts without stock, {unpackaged} parts with unpackaged stock"
            ),
            hint: (missing_stock > 0)
                .then(|| "rerun with --create-placeholders to add empty stock items".to_string()),
        });
    }

    Ok(())
}

/// Parts (audited or not) holding at least one unpackaged stock item.
fn unpackaged_parts(result: &StockAudit) -> usize {
    result.stock_without_packaging.len() + result.orphan_stock_without_packaging.len()
}

fn join_pks(pks: &[u64]) -> String {
    pks.iter().map(u64::to_string).collect::<Vec<_>>().join(", ")
}

fn render_human(result: &StockAudit) -> String {
    let mut out = String::new();
    for gap in &result.parts_without_stock {
        out.push_str(&format!("IPN: {} - No stock item\n", gap.identifier));
    }
    for gap in &result.stock_without_packaging {
        out.push_str(&format!(
            "IPN: {} - Stock without packaging (items {})\n",
            gap.identifier,
            join_pks(&gap.stock_pks)
        ));
    }
    for gap in &result.orphan_stock_without_packaging {
        out.push_str(&format!(
            "Part pk {} (no IPN) - Stock without packaging (items {})\n",
            gap.part,
            join_pks(&gap.stock_pks)
        ));
    }
    out
}
