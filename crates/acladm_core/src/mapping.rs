//! Authorization records: "user U may run app A against dataset D".

use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// A persisted mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mapping {
    pub id: u64,
    pub user: String,
    pub app: PathBuf,
    pub dataset: PathBuf,
    /// Opaque data for downstream consumers; never interpreted here
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<serde_json::Value>,
}

impl Mapping {
    /// Whether `path` is this mapping's app or dataset.
    pub fn references(&self, path: &Path) -> bool {
        self.app == path || self.dataset == path
    }
}

/// A mapping that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMapping {
    pub user: String,
    pub app: PathBuf,
    pub dataset: PathBuf,
    pub extensions: Option<serde_json::Value>,
}

impl NewMapping {
    /// Build a new mapping with trimmed user and lexically normalized paths.
    pub fn new(user: impl Into<String>, app: impl AsRef<Path>, dataset: impl AsRef<Path>) -> Self {
        Self {
            user: user.into().trim().to_string(),
            app: normalize_path(app.as_ref()),
            dataset: normalize_path(dataset.as_ref()),
            extensions: None,
        }
    }

    pub fn with_extensions(mut self, extensions: serde_json::Value) -> Self {
        self.extensions = Some(extensions);
        self
    }

    pub(crate) fn into_mapping(self, id: u64) -> Mapping {
        Mapping {
            id,
            user: self.user,
            app: self.app,
            dataset: self.dataset,
            extensions: self.extensions,
        }
    }
}

/// Lexical normalization: drops `.` components, resolves `..` against
/// preceding components, strips trailing separators. Does not touch the
/// filesystem, so symlinks are left as written.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let last = out.components().next_back();
                if matches!(last, Some(Component::Normal(_))) {
                    out.pop();
                } else if !matches!(last, Some(Component::RootDir | Component::Prefix(_))) {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
