//! Error types for visibility classification, menu handling, and publishing.
//!
//! Every variant names the key, path, index, status, or command involved so
//! a failure can be diagnosed from the message alone.

use std::fmt;

use thiserror::Error;

/// Errors produced by the menuguard library.
#[derive(Debug, Error)]
pub enum MenuError {
    /// A setting required by the current operation is absent.
    #[error("required setting '{key}' is missing from the credential store")]
    MissingCredential { key: &'static str },

    /// A setting is present but unusable.
    #[error("setting '{key}' has an invalid value '{value}': {details}")]
    InvalidSetting {
        key: &'static str,
        value: String,
        details: String,
    },

    /// The credential store could not be read or parsed.
    #[error("credential store {path}: {details}")]
    CredentialStore { path: String, details: String },

    /// The visibility rules file could not be read or parsed.
    #[error("visibility rules {path}: {details}")]
    RulesFile { path: String, details: String },

    /// The client-credentials exchange was rejected or returned no token.
    #[error("token exchange failed: {details}")]
    Auth { details: String },

    /// The page collection request failed.
    #[error("failed to fetch pages for app '{app_id}': {details}")]
    Fetch { app_id: String, details: String },

    /// The menu artifact failed structural validation.
    #[error("invalid menu artifact: {0}")]
    InvalidTree(#[from] TreeViolation),

    /// A menu definition file could not be used to build a menu.
    #[error("menu definition {path}: {details}")]
    Definition { path: String, details: String },

    /// A publish target failed.
    #[error(transparent)]
    Publish(#[from] PublishError),

    /// Local filesystem failure.
    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl MenuError {
    /// Create an I/O error tagged with the path involved.
    pub fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    /// Create a fetch error for an application.
    pub fn fetch(app_id: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Fetch {
            app_id: app_id.into(),
            details: details.into(),
        }
    }

    /// Create an auth error.
    pub fn auth(details: impl Into<String>) -> Self {
        Self::Auth {
            details: details.into(),
        }
    }
}

/// Result type alias using MenuError.
pub type MenuResult<T> = Result<T, MenuError>;

/// Location and cause of a structural problem in a menu artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeViolation {
    /// Index of the offending category, if the problem is inside one.
    pub category: Option<usize>,
    /// Index of the offending link within that category.
    pub link: Option<usize>,
    pub reason: String,
}

impl TreeViolation {
    /// A problem with the artifact as a whole.
    pub fn root(reason: impl Into<String>) -> Self {
        Self {
            category: None,
            link: None,
            reason: reason.into(),
        }
    }

    /// A problem with one category.
    pub fn category(index: usize, reason: impl Into<String>) -> Self {
        Self {
            category: Some(index),
            link: None,
            reason: reason.into(),
        }
    }

    /// A problem with one link of a category.
    pub fn link(category: usize, link: usize, reason: impl Into<String>) -> Self {
        Self {
            category: Some(category),
            link: Some(link),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for TreeViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.category, self.link) {
            (Some(c), Some(l)) => write!(f, "category {c}, link {l}: {}", self.reason),
            (Some(c), None) => write!(f, "category {c}: {}", self.reason),
            _ => f.write_str(&self.reason),
        }
    }
}

impl std::error::Error for TreeViolation {}

/// The two independent destinations of a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PublishTarget {
    /// Version-control remote.
    Vcs,
    /// Menu API endpoint.
    Http,
}

impl fmt::Display for PublishTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishTarget::Vcs => f.write_str("vcs"),
            PublishTarget::Http => f.write_str("http"),
        }
    }
}

/// Failure of one publish target. Never affects the other target.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{target} publish failed at '{step}': {details}")]
pub struct PublishError {
    pub target: PublishTarget,
    /// The command or request that failed (e.g. `git push`, `POST /menu`).
    pub step: String,
    pub details: String,
}

impl PublishError {
    /// Create a version-control publish error.
    pub fn vcs(step: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            target: PublishTarget::Vcs,
            step: step.into(),
            details: details.into(),
        }
    }

    /// Create an HTTP publish error.
    pub fn http(step: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            target: PublishTarget::Http,
            step: step.into(),
            details: details.into(),
        }
    }
}
