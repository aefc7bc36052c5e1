//! Configuration settings
//!
//! Settings are read from `stylepack.toml`:
//!
//! ```toml
//! [pack]
//! in_dir_name = "in"
//! out_dir_name = "out"
//! default_extension = "dotx"
//!
//! [[pack.rules]]
//! keywords = ["Normal"]
//! stem = "Normal"
//! extension = "dotm"
//!
//! [snippet]
//! fragment_markers = ["snippet", "fragment"]
//! id_attribute = "id"
//!
//! [merge]
//! drop_orphan_companions = false
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Top-level settings structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    /// Default output naming for `pack`
    pub pack: PackSettings,
    /// Fragment discovery in snippet files
    pub snippet: SnippetSettings,
    /// Snippet merge behaviour
    pub merge: MergeSettings,
}

impl Settings {
    /// Parse settings from a TOML string
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }
}

/// Convention used to derive a pack destination when none is given
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PackSettings {
    /// Name of the expanded source directory the convention applies to
    pub in_dir_name: String,
    /// Name of the output directory created beside it
    pub out_dir_name: String,
    /// Extension used when no rule matches
    pub default_extension: String,
    /// Keyword rules, first match wins
    pub rules: Vec<NamingRule>,
}

impl Default for PackSettings {
    fn default() -> Self {
        Self {
            in_dir_name: "in".to_string(),
            out_dir_name: "out".to_string(),
            default_extension: "dotx".to_string(),
            rules: default_rules(),
        }
    }
}

/// Maps template directory names to archive file names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamingRule {
    /// Matched case-insensitively as substrings of the template directory name
    pub keywords: Vec<String>,
    /// Fixed file stem; the template directory name is used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stem: Option<String>,
    /// Archive extension without the dot
    pub extension: String,
}

impl NamingRule {
    fn new(keywords: &[&str], stem: Option<&str>, extension: &str) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            stem: stem.map(str::to_string),
            extension: extension.to_string(),
        }
    }

    /// Whether any keyword occurs in `name`, ignoring ASCII case
    pub fn matches(&self, name: &str) -> bool {
        let name = name.to_ascii_lowercase();
        self.keywords
            .iter()
            .any(|k| name.contains(&k.to_ascii_lowercase()))
    }
}

fn default_rules() -> Vec<NamingRule> {
    vec![
        NamingRule::new(&["Normal"], Some("Normal"), "dotm"),
        NamingRule::new(&["Sheet"], Some("Sheet"), "xltx"),
        NamingRule::new(&["Book"], Some("Book"), "xltx"),
        NamingRule::new(&["Theme"], None, "thmx"),
        NamingRule::new(&["Letterhead", "Memo", "Form"], None, "dotx"),
    ]
}

/// Snippet fragment discovery
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnippetSettings {
    /// Local element names that mark a fragment
    pub fragment_markers: Vec<String>,
    /// Attribute carrying a fragment identifier
    pub id_attribute: String,
}

impl Default for SnippetSettings {
    fn default() -> Self {
        Self {
            fragment_markers: vec!["snippet".to_string(), "fragment".to_string()],
            id_attribute: "id".to_string(),
        }
    }
}

/// Snippet merge behaviour
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MergeSettings {
    /// Drop `<Id>Char` companions the snippet leaves behind
    pub drop_orphan_companions: bool,
}
