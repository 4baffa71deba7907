//! Configuration loaded from the credential store.
//!
//! The store is a `KEY=VALUE` file (by default `~/.config/arcgis/.env`).
//! It is read once into memory; the process environment is left untouched.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{MenuError, MenuResult};

/// Portal used to build page URLs when `ARCGIS_PORTAL_URL` is absent.
pub const DEFAULT_PORTAL_URL: &str = "https://experience.arcgis.com";

/// OAuth2 token endpoint used when `ARCGIS_TOKEN_URL` is absent.
pub const DEFAULT_TOKEN_URL: &str = "https://www.arcgis.com/sharing/rest/oauth2/token";

/// Content items endpoint used when `ARCGIS_CONTENT_URL` is absent.
pub const DEFAULT_CONTENT_URL: &str = "https://www.arcgis.com/sharing/rest/content/items";

/// Timeout for every outbound HTTP request (default: 30s).
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Artifact file name inside a project directory.
pub const MENU_FILE_NAME: &str = "menu.json";

/// Settings read from the credential store.
#[derive(Debug, Clone)]
pub struct Settings {
    /// OAuth client id.
    pub client_id: Option<String>,

    /// OAuth client secret.
    pub client_secret: Option<String>,

    /// Portal base URL for building page links.
    pub portal_url: String,

    /// Published application whose pages drive the menu.
    pub app_id: Option<String>,

    /// Client-credentials token endpoint.
    pub token_url: String,

    /// Content items endpoint; page data lives at `{content_url}/{app_id}/data`.
    pub content_url: String,

    /// Menu API base URL for the HTTP publish target.
    pub menu_api_base_url: Option<String>,

    /// Password passed to the menu API as the `pw` query parameter.
    pub menu_api_password: Option<String>,

    /// Public URL of the rendered menu, reported after a deploy.
    pub menu_site_url: Option<String>,

    /// Timeout for token, page fetch, and publish requests.
    pub http_timeout: Duration,
}

/// Credentials needed to classify an application's pages.
#[derive(Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub portal_url: String,
    pub app_id: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("portal_url", &self.portal_url)
            .field("app_id", &self.app_id)
            .finish()
    }
}

/// Where the HTTP publish target lives.
#[derive(Clone)]
pub struct PublishEndpoint {
    pub base_url: String,
    pub password: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for PublishEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublishEndpoint")
            .field("base_url", &self.base_url)
            .field("password", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Settings {
    /// Default credential store location: `~/.config/arcgis/.env`.
    pub fn default_store_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config").join("arcgis").join(".env"))
    }

    /// Load settings from a credential store file.
    pub fn load(path: &Path) -> MenuResult<Self> {
        let store_error = |details: String| MenuError::CredentialStore {
            path: path.display().to_string(),
            details,
        };

        let iter = dotenvy::from_path_iter(path).map_err(|e| store_error(e.to_string()))?;

        let mut pairs = Vec::new();
        for entry in iter {
            pairs.push(entry.map_err(|e| store_error(e.to_string()))?);
        }

        Self::from_pairs(pairs)
    }

    /// Build settings from key/value pairs. Blank values count as absent.
    pub fn from_pairs<I, K, V>(pairs: I) -> MenuResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut store: HashMap<String, String> = pairs
            .into_iter()
            .map(|(k, v)| (k.into().trim().to_string(), v.into().trim().to_string()))
            .filter(|(_, v)| !v.is_empty())
            .collect();

        let mut take = |key: &str| store.remove(key);

        let http_timeout = match take("HTTP_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw.parse().map_err(|e: std::num::ParseIntError| {
                    MenuError::InvalidSetting {
                        key: "HTTP_TIMEOUT_SECS",
                        value: raw.clone(),
                        details: e.to_string(),
                    }
                })?;
                if secs == 0 {
                    return Err(MenuError::InvalidSetting {
                        key: "HTTP_TIMEOUT_SECS",
                        value: raw,
                        details: "timeout must be at least one second".to_string(),
                    });
                }
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        };

        Ok(Self {
            client_id: take("ARCGIS_CLIENT_ID"),
            client_secret: take("ARCGIS_CLIENT_SECRET"),
            portal_url: take("ARCGIS_PORTAL_URL").unwrap_or_else(|| DEFAULT_PORTAL_URL.to_string()),
            app_id: take("ARCGIS_BASE_EXPERIENCE_ID"),
            token_url: take("ARCGIS_TOKEN_URL").unwrap_or_else(|| DEFAULT_TOKEN_URL.to_string()),
            content_url: take("ARCGIS_CONTENT_URL")
                .unwrap_or_else(|| DEFAULT_CONTENT_URL.to_string()),
            menu_api_base_url: take("MENU_API_BASE_URL"),
            menu_api_password: take("MENU_API_PASSWORD"),
            menu_site_url: take("MENU_SITE_URL"),
            http_timeout,
        })
    }

    /// Credentials for classification. Every field is required.
    pub fn credentials(&self) -> MenuResult<Credentials> {
        Ok(Credentials {
            client_id: required(&self.client_id, "ARCGIS_CLIENT_ID")?,
            client_secret: required(&self.client_secret, "ARCGIS_CLIENT_SECRET")?,
            portal_url: self.portal_url.clone(),
            app_id: required(&self.app_id, "ARCGIS_BASE_EXPERIENCE_ID")?,
        })
    }

    /// The HTTP publish endpoint. Base URL and password are required.
    pub fn publish_endpoint(&self) -> MenuResult<PublishEndpoint> {
        Ok(PublishEndpoint {
            base_url: required(&self.menu_api_base_url, "MENU_API_BASE_URL")?,
            password: required(&self.menu_api_password, "MENU_API_PASSWORD")?,
            timeout: self.http_timeout,
        })
    }
}

fn required(value: &Option<String>, key: &'static str) -> MenuResult<String> {
    value
        .clone()
        .ok_or(MenuError::MissingCredential { key })
}

/// A project directory holding the menu artifact and its git checkout.
#[derive(Debug, Clone)]
pub struct Project {
    root: PathBuf,
    menu_path: PathBuf,
    backup_dir: Option<PathBuf>,
}

impl Project {
    /// A project rooted at `root` with the artifact at `root/menu.json`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let menu_path = root.join(MENU_FILE_NAME);
        Self {
            root,
            menu_path,
            backup_dir: None,
        }
    }

    /// Use a different artifact path. Relative paths resolve against the root.
    pub fn with_menu_path(mut self, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        self.menu_path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };
        self
    }

    /// Write backups to `dir` instead of next to the artifact. Relative
    /// paths resolve against the root.
    pub fn with_backup_dir(mut self, dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        self.backup_dir = Some(if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            self.root.join(dir)
        });
        self
    }

    /// Project root; git commands run here.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Menu artifact path.
    pub fn menu_path(&self) -> &Path {
        &self.menu_path
    }

    /// Where artifact backups go (default: the artifact's directory).
    pub fn backup_dir(&self) -> &Path {
        self.backup_dir
            .as_deref()
            .or_else(|| self.menu_path.parent())
            .unwrap_or(&self.root)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_keys_absent() {
        let settings = Settings::from_pairs(Vec::<(String, String)>::new()).unwrap();
        assert_eq!(settings.portal_url, DEFAULT_PORTAL_URL);
        assert_eq!(settings.token_url, DEFAULT_TOKEN_URL);
        assert_eq!(settings.content_url, DEFAULT_CONTENT_URL);
        assert_eq!(settings.http_timeout, Duration::from_secs(30));
        assert!(settings.app_id.is_none());
        assert!(settings.menu_api_password.is_none());
    }

    #[test]
    fn credentials_require_every_key() {
        let settings = Settings::from_pairs([
            ("ARCGIS_CLIENT_ID", "abc"),
            ("ARCGIS_BASE_EXPERIENCE_ID", "exp1"),
        ])
        .unwrap();

        let err = settings.credentials().unwrap_err();
        assert!(matches!(
            err,
            MenuError::MissingCredential {
                key: "ARCGIS_CLIENT_SECRET"
            }
        ));
    }

    #[test]
    fn blank_values_count_as_absent() {
        let settings = Settings::from_pairs([("MENU_API_PASSWORD", "  ")]).unwrap();
        assert!(settings.menu_api_password.is_none());
        assert!(matches!(
            settings.publish_endpoint(),
            Err(MenuError::MissingCredential { .. })
        ));
    }

    #[test]
    fn invalid_timeout_is_rejected() {
        let err = Settings::from_pairs([("HTTP_TIMEOUT_SECS", "soon")]).unwrap_err();
        assert!(err.to_string().contains("HTTP_TIMEOUT_SECS"));

        let err = Settings::from_pairs([("HTTP_TIMEOUT_SECS", "0")]).unwrap_err();
        assert!(matches!(err, MenuError::InvalidSetting { .. }));
    }

    #[test]
    fn load_reads_store_file_with_comments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(
            &path,
            concat!(
                "# arcgis\n",
                "ARCGIS_CLIENT_ID=abc\n",
                "ARCGIS_CLIENT_SECRET=s3cret\n",
                "\n",
                "ARCGIS_BASE_EXPERIENCE_ID=exp1\n",
                "MENU_API_BASE_URL=https://menu.example.com\n",
            ),
        )
        .unwrap();

        let settings = Settings::load(&path).unwrap();
        let creds = settings.credentials().unwrap();
        assert_eq!(creds.client_id, "abc");
        assert_eq!(creds.app_id, "exp1");
        assert_eq!(
            settings.menu_api_base_url.as_deref(),
            Some("https://menu.example.com")
        );
        assert!(!format!("{creds:?}").contains("s3cret"));
    }

    #[test]
    fn missing_store_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::load(&dir.path().join("absent.env")).unwrap_err();
        assert!(matches!(err, MenuError::CredentialStore { .. }));
    }

    #[test]
    fn project_resolves_relative_menu_path() {
        let project = Project::new("/srv/menu").with_menu_path("nav/menu.json");
        assert_eq!(project.menu_path(), Path::new("/srv/menu/nav/menu.json"));

        let project = Project::new("/srv/menu").with_menu_path("/tmp/other.json");
        assert_eq!(project.menu_path(), Path::new("/tmp/other.json"));
        assert_eq!(project.backup_dir(), Path::new("/tmp"));
    }

    #[test]
    fn project_backup_dir_defaults_to_artifact_dir() {
        let project = Project::new("/srv/menu").with_menu_path("nav/menu.json");
        assert_eq!(project.backup_dir(), Path::new("/srv/menu/nav"));

        let project = project.with_backup_dir("backups");
        assert_eq!(project.backup_dir(), Path::new("/srv/menu/backups"));
    }
}
