//! Menuguard
//!
//! Keeps an Experience Builder navigation menu in step with the pages that
//! are actually visible, and publishes it to a git remote and a menu API.

pub mod config;
pub mod deploy;
pub mod error;
pub mod menu;
pub mod platform;
pub mod sync;
pub mod visibility;

pub use config::{Credentials, Project, PublishEndpoint, Settings};
pub use error::{MenuError, MenuResult, PublishError, PublishTarget, TreeViolation};
