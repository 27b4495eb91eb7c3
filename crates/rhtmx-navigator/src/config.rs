// File: src/config.rs
// Purpose: Navigator options and TOML loading

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Runtime options accepted by `Navigator::start` and `Navigator::configure`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Options {
    /// Percent/`+` decoding of query strings, hashes and params (default: true)
    #[serde(default = "default_true")]
    pub decode_url_components: bool,

    /// Ask the host to bind its `popstate` listener (default: true)
    #[serde(default = "default_true")]
    pub popstate: bool,

    /// Ask the host to bind its link `click` listener (default: true)
    #[serde(default = "default_true")]
    pub click: bool,

    /// Encode canonical URLs as `#!/path` (default: false)
    #[serde(default = "default_false")]
    pub hashbang: bool,

    /// Dispatch the initial location on start (default: true)
    #[serde(default = "default_true")]
    pub dispatch: bool,
}

/// Full navigator configuration: base path, strictness and [`Options`]
///
/// ```toml
/// base = "/app"
/// strict = false
/// hashbang = true
/// click = false
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct NavigatorConfig {
    /// Prefix added to and stripped from every path (e.g. "/app")
    #[serde(default)]
    pub base: String,

    /// Trailing-slash strictness for routes that do not set their own
    #[serde(default = "default_false")]
    pub strict: bool,

    #[serde(flatten)]
    pub options: Options,
}

fn default_true() -> bool {
    true
}

fn default_false() -> bool {
    false
}

impl Default for Options {
    fn default() -> Self {
        Self {
            decode_url_components: true,
            popstate: true,
            click: true,
            hashbang: false,
            dispatch: true,
        }
    }
}

impl NavigatorConfig {
    /// Parse configuration from a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        toml::from_str(content).context("Failed to parse navigator config")
    }

    /// Load configuration from a TOML file
    ///
    /// A missing or empty file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
