//! Read-only directory permission diagnostics.
//!
//! The mapping store lives somewhere under a user-owned tree; every
//! non-root-owned ancestor of it must be `0775` so the admin group can
//! write there. Nothing here changes modes, it only reports and suggests.

use crate::error::{AclError, AclResult};
use crate::mapping::normalize_path;
use acladm_hal::fs as hal_fs;
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const REQUIRED_MODE: u32 = 0o775;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditFinding {
    pub path: PathBuf,
    pub owner: String,
    /// Permission bits (`st_mode & 0o7777`)
    pub mode: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DirectoryAudit {
    pub offending: Vec<AuditFinding>,
}

impl DirectoryAudit {
    pub fn has_errors(&self) -> bool {
        !self.offending.is_empty()
    }

    /// `chmod 0775 <dir>` for each offending directory, joined with `&&`.
    pub fn remediation_command(&self) -> Option<String> {
        if self.offending.is_empty() {
            return None;
        }
        Some(
            self.offending
                .iter()
                .map(|f| format!("chmod 0775 {}", f.path.display()))
                .collect::<Vec<_>>()
                .join(" && "),
        )
    }
}

/// Walk from `start` up through its ancestors, stopping after `stop_at`
/// when given. Missing paths and non-directories are passed over; so are
/// directories owned by root.
pub fn audit_ancestors(start: &Path, stop_at: Option<&Path>) -> AclResult<DirectoryAudit> {
    let start = normalize_path(start);
    let stop_at = stop_at.map(normalize_path);
    let mut offending = Vec::new();

    for dir in start.ancestors() {
        if let Some(stop) = &stop_at {
            if !dir.starts_with(stop) {
                break;
            }
        }
        if dir.as_os_str().is_empty() || !dir.is_dir() {
            continue;
        }
        let info = hal_fs::stat(dir)?;
        if info.uid == 0 {
            continue;
        }
        let mode = info.permission_bits();
        if mode & 0o777 != REQUIRED_MODE {
            let owner = hal_fs::user_name(info.uid)?.unwrap_or_else(|| info.uid.to_string());
            offending.push(AuditFinding {
                path: dir.to_path_buf(),
                owner,
                mode,
            });
        }
    }

    offending.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(DirectoryAudit { offending })
}

/// Whether the group owner of `path` is `admin_group`.
pub fn has_admin_group(path: &Path, admin_group: &str) -> AclResult<bool> {
    if !path.exists() {
        return Err(AclError::InvalidPath { path: path.to_path_buf() });
    }
    let info = hal_fs::stat(path)?;
    Ok(hal_fs::group_name(info.gid)?.as_deref() == Some(admin_group))
}
