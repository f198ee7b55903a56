use std::path::PathBuf;

use nvmw_backend::Architecture;
use nvmw_platform::HostProcessor;

pub const DEFAULT_NODE_MIRROR: &str = "https://nodejs.org/dist/";
pub const DEFAULT_NPM_MIRROR: &str = "https://github.com/npm/cli/archive/";
pub const DEFAULT_SYMLINK: &str = r"C:\Program Files\nodejs";

/// Base addresses for Node.js distributions and npm source archives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mirrors {
    node: String,
    npm: String,
}

impl Default for Mirrors {
    fn default() -> Self {
        Self {
            node: DEFAULT_NODE_MIRROR.to_string(),
            npm: DEFAULT_NPM_MIRROR.to_string(),
        }
    }
}

impl Mirrors {
    /// Build mirrors from raw setting values; empty or `none` keeps the default.
    #[must_use]
    pub fn new(node: Option<&str>, npm: Option<&str>) -> Self {
        let defaults = Self::default();
        Self {
            node: node.and_then(normalize_mirror).unwrap_or(defaults.node),
            npm: npm.and_then(normalize_mirror).unwrap_or(defaults.npm),
        }
    }

    #[must_use]
    pub fn node_url(&self, path: &str) -> String {
        format!("{}{path}", self.node)
    }

    #[must_use]
    pub fn npm_url(&self, path: &str) -> String {
        format!("{}{path}", self.npm)
    }

    #[must_use]
    pub fn index_url(&self) -> String {
        self.node_url("index.json")
    }
}

fn with_scheme(value: &str) -> String {
    let lower = value.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        value.to_string()
    } else {
        format!("http://{value}")
    }
}

/// Normalize a mirror address: `http://` is added when no scheme is given and
/// the result always ends with `/`. Empty input and `none` mean "unset".
#[must_use]
pub fn normalize_mirror(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("none") {
        return None;
    }
    let mut url = with_scheme(value);
    if !url.ends_with('/') {
        url.push('/');
    }
    Some(url)
}

/// Normalize a proxy address the same way as a mirror, minus the trailing slash.
#[must_use]
pub fn normalize_proxy(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("none") {
        return None;
    }
    Some(with_scheme(value))
}

/// Everything an operation needs to know about the local installation,
/// resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the `v<version>` installations.
    pub root: PathBuf,
    /// Activation pointer (`NVM_SYMLINK`).
    pub symlink: PathBuf,
    pub default_arch: Option<Architecture>,
    pub proxy: Option<String>,
    pub mirrors: Mirrors,
    pub verify_ssl: bool,
    pub host: HostProcessor,
}

impl Config {
    #[must_use]
    pub fn new(root: PathBuf, symlink: PathBuf, host: HostProcessor) -> Self {
        Self {
            root,
            symlink,
            default_arch: None,
            proxy: None,
            mirrors: Mirrors::default(),
            verify_ssl: true,
            host,
        }
    }

    #[must_use]
    pub fn version_dir(&self, version: &nvmw_backend::NodeVersion) -> PathBuf {
        self.root.join(version.dir_name())
    }
}

#[cfg(test)]
mod tests {
    use super::{Mirrors, normalize_mirror, normalize_proxy};

    #[test]
    fn mirror_gets_scheme_and_trailing_slash() {
        assert_eq!(
            normalize_mirror("npmmirror.com/mirrors/node").as_deref(),
            Some("http://npmmirror.com/mirrors/node/")
        );
        assert_eq!(
            normalize_mirror("https://example.com/dist/").as_deref(),
            Some("https://example.com/dist/")
        );
    }

    #[test]
    fn none_and_empty_mirror_are_unset() {
        assert_eq!(normalize_mirror("none"), None);
        assert_eq!(normalize_mirror("  "), None);
        assert_eq!(normalize_proxy("NONE"), None);
    }

    #[test]
    fn proxy_keeps_path_without_trailing_slash() {
        assert_eq!(
            normalize_proxy("proxy.local:8080").as_deref(),
            Some("http://proxy.local:8080")
        );
    }

    #[test]
    fn mirrors_fall_back_to_defaults() {
        let mirrors = Mirrors::new(Some("none"), None);
        assert_eq!(
            mirrors.index_url(),
            "https://nodejs.org/dist/index.json"
        );
        assert_eq!(
            mirrors.npm_url("v10.2.0.zip"),
            "https://github.com/npm/cli/archive/v10.2.0.zip"
        );
    }

    #[test]
    fn custom_node_mirror_is_used() {
        let mirrors = Mirrors::new(Some("mirror.example/node"), None);
        assert_eq!(
            mirrors.node_url("latest/SHASUMS256.txt"),
            "http://mirror.example/node/latest/SHASUMS256.txt"
        );
    }
}
