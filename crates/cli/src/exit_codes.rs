//! CLI Exit Code Registry
//!
//! Single source of truth for `listcheck` exit codes. Scripts and cron jobs
//! rely on them, so existing values never change meaning.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain    | Description                               |
//! |---------|-----------|-------------------------------------------|
//! | 0       | Universal | Success                                   |
//! | 1       | Universal | General error (unspecified)               |
//! | 2       | Universal | CLI usage error (bad args)                |
//! | 3       | Universal | File I/O error                            |
//! | 50-59   | fetch     | InvenTree / eBay connectors               |
//! | 60-69   | recon     | Reconciliation and stock audit outcomes   |

// =============================================================================
// Universal (0-3)
// =============================================================================

/// Success - command completed, nothing to report.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, conflicting options.
pub const EXIT_USAGE: u8 = 2;

/// Cannot read or write a local file.
pub const EXIT_IO: u8 = 3;

// =============================================================================
// Fetch (50-59)
// =============================================================================

/// No credential provided (neither flag nor env var).
pub const EXIT_FETCH_NOT_AUTH: u8 = 50;

/// Auth rejected by upstream (401/403, or eBay auth token error).
pub const EXIT_FETCH_AUTH: u8 = 51;

/// Bad request rejected by upstream (400).
pub const EXIT_FETCH_VALIDATION: u8 = 52;

/// Rate limited after retries (429).
pub const EXIT_FETCH_RATE_LIMIT: u8 = 53;

/// Upstream error (5xx, malformed body) or network failure after retries.
pub const EXIT_FETCH_UPSTREAM: u8 = 54;

/// Writing a corrected link or placeholder stock item back failed.
pub const EXIT_FETCH_PUSH: u8 = 57;

// =============================================================================
// Recon (60-69)
// =============================================================================

/// Duplicate SKUs, incorrect links, or listings without an inventory part.
/// Also used by `stock audit` when gaps are found.
pub const EXIT_RECON_FINDINGS: u8 = 60;

/// Config file failed to parse or validate.
pub const EXIT_RECON_INVALID_CONFIG: u8 = 61;

/// Snapshot file is not valid JSON of the expected shape.
pub const EXIT_RECON_SNAPSHOT: u8 = 62;
