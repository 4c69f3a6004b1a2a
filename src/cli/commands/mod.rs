//! CLI command implementations.

/// Catalog listing, refresh and status.
pub mod catalog;
/// Desired character list edits.
pub mod characters;
/// Website filter settings and checks.
pub mod filter;
/// Pointer interaction toggle.
pub mod interaction;
/// Run the reconcile loop for one page.
pub mod watch;
