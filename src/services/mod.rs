pub mod catalog_refresher;
pub mod desired_state;
pub mod domain_matcher;
pub mod reconciler;
pub mod version;

pub use catalog_refresher::{CatalogRefresher, LoadedCatalog};
pub use desired_state::DesiredStateStore;
pub use domain_matcher::{matches, matches_pattern, should_activate};
pub use reconciler::{
    LiveInstance, LiveTable, ReconcileReport, Reconciler, StoreInteractionHandler,
};
pub use version::{compare_semver, is_stale};
