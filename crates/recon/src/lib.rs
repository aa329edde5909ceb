//! `listcheck-recon`: inventory-to-marketplace listing reconciliation engine.
//!
//! Pure engine crate: receives pre-loaded snapshots, returns classified results.
//! No CLI or network dependencies.

pub mod config;
pub mod engine;
pub mod error;
pub mod matcher;
pub mod model;
pub mod normalize;
pub mod report;
pub mod snapshot;
pub mod stock;
pub mod variant;

pub use config::ReconConfig;
pub use engine::reconcile;
pub use error::ReconError;
pub use model::{InventoryRecord, ListingRecord, MatchResult, MatchStatus, ReconReport};
