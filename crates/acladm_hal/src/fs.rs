//! File ownership and mode queries.
//!
//! Only reads metadata; nothing here changes mode bits or owners.

use crate::error::{HalError, HalResult};
use std::fs;
use std::path::Path;

/// Owner, group and permission bits of one path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileOwnership {
    pub uid: u32,
    pub gid: u32,
    /// Full `st_mode` including the file type bits
    pub mode: u32,
    pub is_dir: bool,
}

impl FileOwnership {
    /// Permission bits only (setuid/setgid/sticky + rwx triplets).
    pub fn permission_bits(&self) -> u32 {
        self.mode & 0o7777
    }
}

#[cfg(unix)]
pub fn stat(path: &Path) -> HalResult<FileOwnership> {
    use std::os::unix::fs::MetadataExt;

    let meta = fs::metadata(path).map_err(|e| HalError::io_error("stat", Some(path), e))?;
    Ok(FileOwnership {
        uid: meta.uid(),
        gid: meta.gid(),
        mode: meta.mode(),
        is_dir: meta.is_dir(),
    })
}

#[cfg(not(unix))]
pub fn stat(_path: &Path) -> HalResult<FileOwnership> {
    Err(HalError::unsupported("file ownership queries require a Unix platform"))
}

/// Effective uid of this process.
#[cfg(unix)]
pub fn effective_uid() -> u32 {
    nix::unistd::geteuid().as_raw()
}

#[cfg(not(unix))]
pub fn effective_uid() -> u32 {
    u32::MAX
}

/// Whether `path` is owned by the effective user of this process.
pub fn is_owned_by_current_user(path: &Path) -> HalResult<bool> {
    Ok(stat(path)?.uid == effective_uid())
}

/// Resolve a uid to its account name.
#[cfg(unix)]
pub fn user_name(uid: u32) -> HalResult<Option<String>> {
    use nix::unistd::{Uid, User};

    User::from_uid(Uid::from_raw(uid))
        .map(|user| user.map(|u| u.name))
        .map_err(|e| HalError::invalid(&format!("user lookup for uid {uid} failed: {e}")))
}

#[cfg(not(unix))]
pub fn user_name(_uid: u32) -> HalResult<Option<String>> {
    Err(HalError::unsupported("user lookup requires a Unix platform"))
}

/// Resolve a gid to its group name.
#[cfg(unix)]
pub fn group_name(gid: u32) -> HalResult<Option<String>> {
    use nix::unistd::{Gid, Group};

    Group::from_gid(Gid::from_raw(gid))
        .map(|group| group.map(|g| g.name))
        .map_err(|e| HalError::invalid(&format!("group lookup for gid {gid} failed: {e}")))
}

#[cfg(not(unix))]
pub fn group_name(_gid: u32) -> HalResult<Option<String>> {
    Err(HalError::unsupported("group lookup requires a Unix platform"))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    #[test]
    fn tempdir_is_owned_by_us() {
        let dir = tempfile::tempdir().unwrap();
        assert!(is_owned_by_current_user(dir.path()).unwrap());
    }

    #[test]
    fn permission_bits_strip_file_type() {
        let dir = tempfile::tempdir().unwrap();
        fs::set_permissions(dir.path(), fs::Permissions::from_mode(0o775)).unwrap();
        let info = stat(dir.path()).unwrap();
        assert!(info.is_dir);
        assert_eq!(info.permission_bits(), 0o775);
    }

    #[test]
    fn missing_path_is_not_found() {
        let err = stat(Path::new("/no/such/acladm/path")).unwrap_err();
        assert!(err.is_missing_path());
    }

    #[test]
    fn root_uid_resolves() {
        assert_eq!(user_name(0).unwrap().as_deref(), Some("root"));
    }
}
