//! The navigation menu: data model, artifact file, reconciliation against
//! visible pages, and building from a definition file.

pub mod artifact;
pub mod builder;
pub mod model;
pub mod reconcile;

pub use builder::{MenuDefinition, build_tree, experience_url};
pub use model::{MenuCategory, MenuLink, MenuTree, PAGE_MARKER};
pub use reconcile::{Reconciliation, RemovedLink, reconcile};
