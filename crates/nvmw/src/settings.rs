//! The `settings.txt` file next to the executable (or in `NVM_HOME`).
//!
//! One `key: value` pair per line. Keys this tool does not know about are
//! kept as they are when the file is rewritten.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use log::debug;
use nvmw_backend::Architecture;
use nvmw_core::{Config, Mirrors, normalize_proxy};
use nvmw_platform::HostProcessor;

use crate::error::AppError;

pub const ROOT: &str = "root";
pub const ARCH: &str = "arch";
pub const PROXY: &str = "proxy";
pub const ORIGINAL_PATH: &str = "originalpath";
pub const ORIGINAL_VERSION: &str = "originalversion";
pub const NODE_MIRROR: &str = "node_mirror";
pub const NPM_MIRROR: &str = "npm_mirror";
pub const VERIFY_SSL: &str = "verifyssl";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    entries: Vec<(String, String)>,
}

impl Settings {
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let entries = text
            .lines()
            .filter_map(|line| {
                let line = line.trim();
                if line.is_empty() {
                    return None;
                }
                let Some((key, value)) = line.split_once(':') else {
                    debug!("Ignoring settings line without a key: {line}");
                    return None;
                };
                Some((key.trim().to_ascii_lowercase(), value.trim().to_string()))
            })
            .collect();
        Self { entries }
    }

    /// Read the settings file; a missing file means defaults.
    ///
    /// # Errors
    /// Returns an error when an existing file cannot be read.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Ok(Self::parse(&text)),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                debug!("No settings file at {}", path.display());
                Ok(Self::default())
            }
            Err(source) => Err(AppError::settings("read", path, source)),
        }
    }

    /// # Errors
    /// Returns an error when the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), AppError> {
        write_atomic(path, self.render().as_bytes())
            .map_err(|source| AppError::settings("write", path, source))
    }

    #[must_use]
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|(key, value)| format!("{key}: {value}\r\n"))
            .collect()
    }

    /// A non-empty value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value.as_str())
            .filter(|value| !value.is_empty())
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(existing, _)| existing == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key.to_string(), value)),
        }
    }

    /// Installation root: the `root` setting, else `home`.
    #[must_use]
    pub fn root(&self, home: &Path) -> PathBuf {
        self.get(ROOT).map_or_else(|| home.to_path_buf(), PathBuf::from)
    }

    #[must_use]
    pub fn default_arch(&self) -> Option<Architecture> {
        self.get(ARCH).and_then(Architecture::from_token)
    }

    #[must_use]
    pub fn verify_ssl(&self) -> bool {
        !self
            .get(VERIFY_SSL)
            .is_some_and(|value| value.eq_ignore_ascii_case("false"))
    }

    /// Resolve everything an operation needs into one [`Config`].
    #[must_use]
    pub fn to_config(&self, home: &Path, symlink: PathBuf, host: HostProcessor) -> Config {
        let mut config = Config::new(self.root(home), symlink, host);
        config.default_arch = self.default_arch();
        config.proxy = self.get(PROXY).and_then(normalize_proxy);
        config.mirrors = Mirrors::new(self.get(NODE_MIRROR), self.get(NPM_MIRROR));
        config.verify_ssl = self.verify_ssl();
        config
    }
}

/// Write through a unique temp file in the same directory, then rename over
/// the target.
fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let parent = path.parent().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "settings path has no parent")
    })?;
    std::fs::create_dir_all(parent)?;

    let file_name = path
        .file_name()
        .and_then(std::ffi::OsStr::to_str)
        .unwrap_or("settings.txt");
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |duration| duration.as_nanos());
    let pid = std::process::id();

    let mut tmp_path = None;
    for attempt in 0..16_u8 {
        let candidate = parent.join(format!(".{file_name}.{pid}.{timestamp}.{attempt}.tmp"));
        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
        {
            Ok(mut file) => {
                file.write_all(data)?;
                file.sync_all()?;
                tmp_path = Some(candidate);
                break;
            }
            Err(error) if error.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(error) => return Err(error),
        }
    }

    let Some(tmp_path) = tmp_path else {
        return Err(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            "failed to create unique settings temp file",
        ));
    };

    if let Err(error) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(error);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use nvmw_backend::Architecture;
    use nvmw_platform::HostProcessor;

    use super::{ARCH, NODE_MIRROR, PROXY, Settings};

    const SAMPLE: &str = "root: C:\\Users\\dev\\AppData\\Roaming\\nvm\r\n\
arch: 32\r\n\
proxy: none\r\n\
originalpath: C:\\Program Files\\nodejs\r\n\
originalversion: 18.2.0\r\n\
custom_key: keep me\r\n";

    #[test]
    fn parses_keys_and_windows_paths() {
        let settings = Settings::parse(SAMPLE);

        assert_eq!(settings.get("root"), Some("C:\\Users\\dev\\AppData\\Roaming\\nvm"));
        assert_eq!(settings.default_arch(), Some(Architecture::X86));
        assert_eq!(settings.get("custom_key"), Some("keep me"));
        assert!(settings.verify_ssl());
    }

    #[test]
    fn rewrite_preserves_unknown_keys_and_order() {
        let mut settings = Settings::parse(SAMPLE);
        settings.set(ARCH, "64");
        settings.set(NODE_MIRROR, "https://npmmirror.com/mirrors/node/");

        let rendered = settings.render();
        let reparsed = Settings::parse(&rendered);
        assert_eq!(reparsed.get(ARCH), Some("64"));
        assert_eq!(reparsed.get("custom_key"), Some("keep me"));
        assert!(rendered.starts_with("root: "));
        assert!(rendered.ends_with("node_mirror: https://npmmirror.com/mirrors/node/\r\n"));
    }

    #[test]
    fn config_normalizes_values() {
        let mut settings = Settings::parse(SAMPLE);
        settings.set(PROXY, "proxy.local:8080");
        settings.set(NODE_MIRROR, "mirror.local/node");
        settings.set("verifyssl", "false");

        let config = settings.to_config(
            Path::new("home"),
            PathBuf::from("link"),
            HostProcessor::from_reported("AMD64"),
        );
        assert_eq!(config.root, PathBuf::from("C:\\Users\\dev\\AppData\\Roaming\\nvm"));
        assert_eq!(config.proxy.as_deref(), Some("http://proxy.local:8080"));
        assert_eq!(config.mirrors.index_url(), "http://mirror.local/node/index.json");
        assert_eq!(config.default_arch, Some(Architecture::X86));
        assert!(!config.verify_ssl);
    }

    #[test]
    fn empty_settings_fall_back_to_home() {
        let settings = Settings::parse("");
        let config = settings.to_config(
            Path::new("home"),
            PathBuf::from("link"),
            HostProcessor::from_reported("AMD64"),
        );
        assert_eq!(config.root, PathBuf::from("home"));
        assert_eq!(config.proxy, None);
        assert!(config.verify_ssl);
    }

    #[test]
    fn save_and_load_round_trip() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let path = temp.path().join("settings.txt");
        assert_eq!(
            Settings::load(&path).expect("missing file should load"),
            Settings::default()
        );

        let settings = Settings::parse(SAMPLE);
        settings.save(&path).expect("settings should be saved");
        assert_eq!(Settings::load(&path).expect("settings should load"), settings);

        let leftovers = std::fs::read_dir(temp.path())
            .expect("dir should be readable")
            .count();
        assert_eq!(leftovers, 1);
    }
}
