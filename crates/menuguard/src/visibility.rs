//! Page visibility classification.
//!
//! Each page is run through an ordered rule list. The first rule that
//! matches hides the page and records why; a page no rule matches is
//! visible. Keyword sets and manual overrides come from [`VisibilityRules`]
//! so they can be tuned without touching the rule order.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::config::Credentials;
use crate::error::{MenuError, MenuResult};
use crate::platform::PlatformClient;

/// A page record as returned by the content platform.
///
/// Only the fields the classifier reads are kept. An omitted
/// `visible`/`showInNav` is treated as `true`; a present one is read by
/// JSON truthiness, so `null`, `0`, `""` and `false` all clear the flag.
/// A `label` that is not a string is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    #[serde(
        default,
        deserialize_with = "lenient_label",
        skip_serializing_if = "Option::is_none"
    )]
    pub label: Option<String>,

    #[serde(
        default,
        deserialize_with = "truthy_flag",
        skip_serializing_if = "Option::is_none"
    )]
    pub visible: Option<bool>,

    #[serde(
        default,
        rename = "showInNav",
        deserialize_with = "truthy_flag",
        skip_serializing_if = "Option::is_none"
    )]
    pub show_in_nav: Option<bool>,
}

fn truthy_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
    Ok(Some(is_truthy(&Value::deserialize(deserializer)?)))
}

fn lenient_label<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(label) => Some(label),
        _ => None,
    })
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

impl PageRecord {
    /// A visible, navigable page with the given label.
    pub fn labeled(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            visible: None,
            show_in_nav: None,
        }
    }

    /// Display label, or the empty string when absent.
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or("")
    }

    pub fn is_visible(&self) -> bool {
        self.visible.unwrap_or(true)
    }

    pub fn shows_in_nav(&self) -> bool {
        self.show_in_nav.unwrap_or(true)
    }
}

/// Pages keyed by platform page key (`page_<n>`).
pub type PageSet = BTreeMap<String, PageRecord>;

/// Why a page was hidden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HideReason {
    NotVisible,
    HiddenFromNav,
    TestPage,
    UnderConstruction,
    AdminPage,
    ManualOverride,
}

impl fmt::Display for HideReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            HideReason::NotVisible => "not visible",
            HideReason::HiddenFromNav => "hidden from navigation",
            HideReason::TestPage => "test/development page",
            HideReason::UnderConstruction => "under construction",
            HideReason::AdminPage => "admin/internal page",
            HideReason::ManualOverride => "manual override",
        };
        f.write_str(text)
    }
}

/// Keyword sets and manual overrides consulted by the rules.
///
/// Loaded from TOML; any omitted list keeps its default.
///
/// ```toml
/// test_keywords = ["test", "beta"]
/// manual_overrides = ["page_154"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VisibilityRules {
    /// Labels containing any of these mark test/development pages.
    pub test_keywords: Vec<String>,

    /// Labels containing any of these mark pages under construction.
    pub construction_keywords: Vec<String>,

    /// Labels containing any of these mark admin/internal pages.
    pub admin_keywords: Vec<String>,

    /// Page keys that are always hidden.
    pub manual_overrides: BTreeSet<String>,
}

impl Default for VisibilityRules {
    fn default() -> Self {
        Self {
            test_keywords: words(&["test", "beta", "old", "temp", "draft", "dev", "debug"]),
            construction_keywords: words(&[
                "construction",
                "wip",
                "todo",
                "pending",
                "coming soon",
            ]),
            admin_keywords: words(&["admin", "internal", "private", "restricted access"]),
            manual_overrides: ["page_154", "page_181", "page_129", "page_130"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| (*w).to_string()).collect()
}

/// A rule predicate: page key, page record, lower-cased label.
type Rule = fn(&VisibilityRules, &str, &PageRecord, &str) -> bool;

/// Evaluated in order; the first match wins.
const RULES: [(Rule, HideReason); 6] = [
    (flagged_not_visible, HideReason::NotVisible),
    (flagged_out_of_nav, HideReason::HiddenFromNav),
    (test_label, HideReason::TestPage),
    (construction_label, HideReason::UnderConstruction),
    (admin_label, HideReason::AdminPage),
    (manual_override, HideReason::ManualOverride),
];

fn flagged_not_visible(_: &VisibilityRules, _: &str, page: &PageRecord, _: &str) -> bool {
    !page.is_visible()
}

fn flagged_out_of_nav(_: &VisibilityRules, _: &str, page: &PageRecord, _: &str) -> bool {
    !page.shows_in_nav()
}

fn test_label(rules: &VisibilityRules, _: &str, _: &PageRecord, label: &str) -> bool {
    contains_any(label, &rules.test_keywords)
}

fn construction_label(rules: &VisibilityRules, _: &str, _: &PageRecord, label: &str) -> bool {
    contains_any(label, &rules.construction_keywords)
}

fn admin_label(rules: &VisibilityRules, _: &str, _: &PageRecord, label: &str) -> bool {
    contains_any(label, &rules.admin_keywords)
}

fn manual_override(rules: &VisibilityRules, key: &str, _: &PageRecord, _: &str) -> bool {
    rules.manual_overrides.contains(key)
}

fn contains_any(label: &str, keywords: &[String]) -> bool {
    keywords.iter().any(|kw| label.contains(kw.as_str()))
}

impl VisibilityRules {
    /// Parse rules from a TOML string.
    pub fn from_toml_str(content: &str, path: &Path) -> MenuResult<Self> {
        let rules: VisibilityRules = toml::from_str(content).map_err(|e| MenuError::RulesFile {
            path: path.display().to_string(),
            details: e.to_string(),
        })?;
        Ok(rules.normalized())
    }

    /// Load rules from a TOML file.
    pub fn load(path: &Path) -> MenuResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| MenuError::RulesFile {
            path: path.display().to_string(),
            details: e.to_string(),
        })?;
        Self::from_toml_str(&content, path)
    }

    /// Lower-case keywords and drop blank ones (a blank keyword would match
    /// every label).
    fn normalized(mut self) -> Self {
        for list in [
            &mut self.test_keywords,
            &mut self.construction_keywords,
            &mut self.admin_keywords,
        ] {
            *list = list
                .iter()
                .map(|kw| kw.trim().to_lowercase())
                .filter(|kw| !kw.is_empty())
                .collect();
        }
        self
    }

    /// The reason a page is hidden, or `None` if it is visible.
    pub fn hide_reason(&self, key: &str, page: &PageRecord) -> Option<HideReason> {
        let label = page.label().to_lowercase();
        RULES
            .iter()
            .find(|(rule, _)| rule(self, key, page, &label))
            .map(|(_, reason)| *reason)
    }
}

/// Result of classifying a page collection.
///
/// `visible` and `hidden` partition the input. Reasons are a side report
/// keyed by hidden page key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub visible: PageSet,
    pub hidden: PageSet,
    pub reasons: BTreeMap<String, HideReason>,
}

impl Classification {
    /// A classification of zero pages.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Total number of pages classified.
    pub fn total(&self) -> usize {
        self.visible.len() + self.hidden.len()
    }

    pub fn is_visible(&self, key: &str) -> bool {
        self.visible.contains_key(key)
    }

    /// Hidden pages with their labels and reasons, in key order.
    pub fn hidden_report(&self) -> Vec<(&str, &str, HideReason)> {
        self.reasons
            .iter()
            .map(|(key, reason)| {
                let label = self.hidden.get(key).map_or("", PageRecord::label);
                (key.as_str(), label, *reason)
            })
            .collect()
    }
}

/// Split a page collection into visible and hidden pages.
pub fn classify_pages(pages: PageSet, rules: &VisibilityRules) -> Classification {
    let mut result = Classification::empty();

    for (key, page) in pages {
        match rules.hide_reason(&key, &page) {
            Some(reason) => {
                debug!(page = %key, label = %page.label(), reason = %reason, "page hidden");
                result.reasons.insert(key.clone(), reason);
                result.hidden.insert(key, page);
            }
            None => {
                result.visible.insert(key, page);
            }
        }
    }

    info!(
        visible = result.visible.len(),
        hidden = result.hidden.len(),
        "page visibility analysed"
    );

    result
}

/// Acquire a token, fetch the application's pages, and classify them.
pub async fn classify(
    client: &PlatformClient,
    credentials: &Credentials,
    rules: &VisibilityRules,
) -> MenuResult<Classification> {
    let token = client.acquire_token(credentials).await?;
    let pages = client.fetch_pages(&token, &credentials.app_id).await?;
    Ok(classify_pages(pages, rules))
}
