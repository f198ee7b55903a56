use std::collections::HashMap;

use chrono::NaiveDate;
use log::{debug, warn};
use nvmw_backend::{CatalogEntry, NodeVersion, NvmError, PartialVersion, ReleaseChannel};
use serde::Deserialize;

use crate::config::Mirrors;
use crate::transfer::Transfer;

#[derive(Deserialize)]
#[serde(untagged)]
enum LtsField {
    Flag(bool),
    Codename(String),
}

#[derive(Deserialize)]
struct RawEntry {
    version: String,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    npm: Option<String>,
    #[serde(default)]
    lts: Option<LtsField>,
    #[serde(default)]
    security: bool,
}

impl RawEntry {
    fn into_entry(self) -> Option<CatalogEntry> {
        let version = match self.version.parse::<NodeVersion>() {
            Ok(version) => version,
            Err(error) => {
                warn!("Skipping catalog entry {}: {error}", self.version);
                return None;
            }
        };
        let (is_lts, lts_codename) = match self.lts {
            Some(LtsField::Flag(flag)) => (flag, None),
            Some(LtsField::Codename(name)) if !name.trim().is_empty() => (true, Some(name)),
            Some(LtsField::Codename(_)) | None => (false, None),
        };
        Some(CatalogEntry {
            version,
            date: self
                .date
                .and_then(|date| NaiveDate::parse_from_str(&date, "%Y-%m-%d").ok()),
            npm: self.npm.filter(|npm| !npm.trim().is_empty()),
            is_lts,
            lts_codename,
            security: self.security,
        })
    }
}

/// The remote release list, bucketed by channel.
///
/// Every list keeps the order of `index.json`, which publishes newest first.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub all: Vec<CatalogEntry>,
    pub lts: Vec<NodeVersion>,
    pub current: Vec<NodeVersion>,
    pub stable: Vec<NodeVersion>,
    pub unstable: Vec<NodeVersion>,
    pub npm: HashMap<NodeVersion, String>,
}

impl Catalog {
    #[must_use]
    pub fn from_entries(entries: Vec<CatalogEntry>) -> Self {
        let mut catalog = Self::default();
        for entry in &entries {
            let bucket = match entry.channel() {
                ReleaseChannel::Lts => &mut catalog.lts,
                ReleaseChannel::Current => &mut catalog.current,
                ReleaseChannel::Stable => &mut catalog.stable,
                ReleaseChannel::Unstable => &mut catalog.unstable,
            };
            bucket.push(entry.version.clone());
            if let Some(npm) = &entry.npm {
                catalog.npm.insert(entry.version.clone(), npm.clone());
            }
        }
        catalog.all = entries;
        catalog
    }

    /// Parse the body of `index.json` fetched from `url`.
    ///
    /// # Errors
    /// Blank or malformed documents yield [`NvmError::CatalogUnavailable`].
    pub fn from_json(body: &str, url: &str) -> Result<Self, NvmError> {
        if body.trim().is_empty() {
            return Err(NvmError::CatalogUnavailable {
                url: url.to_string(),
                details: "the server returned blank results".to_string(),
            });
        }
        let raw: Vec<RawEntry> =
            serde_json::from_str(body).map_err(|error| NvmError::CatalogUnavailable {
                url: url.to_string(),
                details: error.to_string(),
            })?;
        let entries: Vec<CatalogEntry> = raw.into_iter().filter_map(RawEntry::into_entry).collect();
        if entries.is_empty() {
            return Err(NvmError::CatalogUnavailable {
                url: url.to_string(),
                details: "the release list is empty".to_string(),
            });
        }
        Ok(Self::from_entries(entries))
    }

    #[must_use]
    pub fn contains(&self, version: &NodeVersion) -> bool {
        self.all.iter().any(|entry| entry.version == *version)
    }

    #[must_use]
    pub fn npm_version(&self, version: &NodeVersion) -> Option<&str> {
        self.npm.get(version).map(String::as_str)
    }

    #[must_use]
    pub fn newest_current(&self) -> Option<&NodeVersion> {
        self.current.iter().max()
    }

    #[must_use]
    pub fn newest_lts(&self) -> Option<&NodeVersion> {
        self.lts.iter().max()
    }

    /// Highest patch release of a `major.minor` line.
    ///
    /// The scan stops once the listing drops below the requested line. That
    /// is only a shortcut for the usual newest-first order of `index.json`;
    /// an out-of-order listing can hide a patch past the break.
    #[must_use]
    pub fn latest_patch(&self, line: PartialVersion) -> Option<NodeVersion> {
        let minor = line.minor?;
        let mut best: Option<&NodeVersion> = None;
        for entry in &self.all {
            let version = &entry.version;
            if (version.major, version.minor) < (line.major, minor) {
                break;
            }
            if line.matches(version) && best.is_none_or(|current| version > current) {
                best = Some(version);
            }
        }
        best.cloned()
    }
}

/// Download and parse `<node_mirror>index.json`.
///
/// # Errors
/// Any transfer or parse failure becomes [`NvmError::CatalogUnavailable`],
/// except cancellation, which is passed through.
pub async fn fetch_catalog(transfer: &dyn Transfer, mirrors: &Mirrors) -> Result<Catalog, NvmError> {
    let url = mirrors.index_url();
    debug!("Fetching release catalog from {url}");
    let body = match transfer.get_text(&url).await {
        Ok(body) => body,
        Err(NvmError::Cancelled) => return Err(NvmError::Cancelled),
        Err(error) => {
            return Err(NvmError::CatalogUnavailable {
                url,
                details: error.to_string(),
            });
        }
    };
    let catalog = Catalog::from_json(&body, &url)?;
    debug!("Catalog lists {} releases", catalog.all.len());
    Ok(catalog)
}

#[cfg(test)]
pub(crate) const SAMPLE_INDEX: &str = r#"[
  {"version":"v21.1.0","date":"2023-10-24","files":["win-x64-zip"],"npm":"10.2.0","lts":false,"security":false},
  {"version":"v20.9.0","date":"2023-10-24","npm":"10.1.0","lts":"Iron","security":false},
  {"version":"v20.8.1","date":"2023-10-13","npm":"10.1.0","lts":false,"security":true},
  {"version":"v18.18.2","date":"2023-10-13","npm":"9.8.1","lts":"Hydrogen","security":true},
  {"version":"v18.2.0","date":"2022-05-17","npm":"8.9.0","lts":false,"security":false},
  {"version":"v18.1.0","date":"2022-05-03","npm":"8.8.0","lts":false,"security":false},
  {"version":"v16.8.0","date":"2021-08-25","npm":"7.21.0","lts":false,"security":false},
  {"version":"v0.12.18","date":"2017-02-22","npm":"2.15.11","lts":false,"security":false},
  {"version":"v0.11.16","date":"2015-01-30","npm":"2.3.0","lts":false,"security":false},
  {"version":"v0.6.21","date":"2012-08-03","lts":false,"security":false}
]"#;

#[cfg(test)]
mod tests {
    use nvmw_backend::{NodeVersion, NvmError};

    use super::{Catalog, SAMPLE_INDEX, fetch_catalog};
    use crate::config::Mirrors;
    use crate::testing::MockTransfer;

    fn sample() -> Catalog {
        Catalog::from_json(SAMPLE_INDEX, "https://nodejs.org/dist/index.json")
            .expect("sample index should parse")
    }

    #[test]
    fn entries_are_bucketed_by_first_matching_rule() {
        let catalog = sample();
        assert_eq!(
            catalog.lts,
            vec![NodeVersion::new(20, 9, 0), NodeVersion::new(18, 18, 2)]
        );
        assert_eq!(catalog.current.first(), Some(&NodeVersion::new(21, 1, 0)));
        assert_eq!(catalog.current.len(), 5);
        assert_eq!(catalog.stable, vec![NodeVersion::new(0, 12, 18)]);
        assert_eq!(
            catalog.unstable,
            vec![NodeVersion::new(0, 11, 16)]
        );
        assert_eq!(catalog.all.len(), 10);
    }

    #[test]
    fn lts_codename_and_npm_are_kept() {
        let catalog = sample();
        let iron = catalog
            .all
            .iter()
            .find(|entry| entry.version == NodeVersion::new(20, 9, 0))
            .expect("iron release should be listed");
        assert_eq!(iron.lts_codename.as_deref(), Some("Iron"));
        assert_eq!(catalog.npm_version(&NodeVersion::new(18, 2, 0)), Some("8.9.0"));
        assert_eq!(catalog.npm_version(&NodeVersion::new(0, 6, 21)), None);
    }

    #[test]
    fn newest_aliases_pick_highest() {
        let catalog = sample();
        assert_eq!(catalog.newest_current(), Some(&NodeVersion::new(21, 1, 0)));
        assert_eq!(catalog.newest_lts(), Some(&NodeVersion::new(20, 9, 0)));
    }

    #[test]
    fn latest_patch_scans_minor_line() {
        let catalog = sample();
        let line = "18.2".parse().expect("partial should parse");
        assert_eq!(catalog.latest_patch(line), Some(NodeVersion::new(18, 2, 0)));
        let missing = "18.3".parse().expect("partial should parse");
        assert_eq!(catalog.latest_patch(missing), None);
    }

    #[test]
    fn blank_document_is_catalog_unavailable() {
        let result = Catalog::from_json("  \n", "https://nodejs.org/dist/index.json");
        assert!(matches!(result, Err(NvmError::CatalogUnavailable { .. })));
    }

    #[test]
    fn malformed_document_is_catalog_unavailable() {
        let result = Catalog::from_json("{\"oops\":", "https://nodejs.org/dist/index.json");
        assert!(matches!(result, Err(NvmError::CatalogUnavailable { .. })));
    }

    #[tokio::test]
    async fn fetch_maps_transfer_failure() {
        let transfer = MockTransfer::new();
        let result = fetch_catalog(&transfer, &Mirrors::default()).await;
        assert!(matches!(
            result,
            Err(NvmError::CatalogUnavailable { ref url, .. }) if url == "https://nodejs.org/dist/index.json"
        ));
    }

    #[tokio::test]
    async fn fetch_parses_served_index() {
        let transfer = MockTransfer::new().with_text("https://nodejs.org/dist/index.json", SAMPLE_INDEX);
        let catalog = fetch_catalog(&transfer, &Mirrors::default())
            .await
            .expect("catalog should be fetched");
        assert!(catalog.contains(&NodeVersion::new(16, 8, 0)));
    }
}
