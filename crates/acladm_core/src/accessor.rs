//! Reading and writing ACLs on disk.

use crate::acl::Acl;
use crate::entry::AclEntry;
use crate::error::AclResult;
use acladm_hal::Nfs4FaclTool;
use std::path::Path;
use tracing::info;

/// Full-ACL reads and writes plus single-entry edits for one path.
///
/// Every call is one synchronous attempt. A read followed by a write is not
/// atomic; whatever changed on disk in between is overwritten.
pub trait AclAccessor {
    /// Full ACL text of `path`.
    fn get_acl(&self, path: &Path) -> AclResult<String>;

    /// Replace the whole ACL of `path`.
    fn set_acl(&self, path: &Path, acl: &str) -> AclResult<()>;

    /// Append one entry, leaving the rest as is.
    fn add_entry(&self, path: &Path, entry: &AclEntry) -> AclResult<()>;

    /// Remove one entry, leaving the rest as is.
    fn remove_entry(&self, path: &Path, entry: &AclEntry) -> AclResult<()>;

    fn read_acl(&self, path: &Path) -> AclResult<Acl> {
        self.get_acl(path)?.parse()
    }
}

impl<T: AclAccessor + ?Sized> AclAccessor for &T {
    fn get_acl(&self, path: &Path) -> AclResult<String> {
        (**self).get_acl(path)
    }

    fn set_acl(&self, path: &Path, acl: &str) -> AclResult<()> {
        (**self).set_acl(path, acl)
    }

    fn add_entry(&self, path: &Path, entry: &AclEntry) -> AclResult<()> {
        (**self).add_entry(path, entry)
    }

    fn remove_entry(&self, path: &Path, entry: &AclEntry) -> AclResult<()> {
        (**self).remove_entry(path, entry)
    }
}

impl AclAccessor for Nfs4FaclTool {
    fn get_acl(&self, path: &Path) -> AclResult<String> {
        Ok(self.get(path)?)
    }

    fn set_acl(&self, path: &Path, acl: &str) -> AclResult<()> {
        Ok(self.set(path, acl)?)
    }

    fn add_entry(&self, path: &Path, entry: &AclEntry) -> AclResult<()> {
        Ok(Nfs4FaclTool::add_entry(self, path, &entry.to_string())?)
    }

    fn remove_entry(&self, path: &Path, entry: &AclEntry) -> AclResult<()> {
        Ok(Nfs4FaclTool::remove_entry(self, path, &entry.to_string())?)
    }
}

/// Passes reads through and only logs writes.
#[derive(Debug, Clone)]
pub struct DryRun<A> {
    inner: A,
}

impl<A: AclAccessor> DryRun<A> {
    pub fn new(inner: A) -> Self {
        Self { inner }
    }
}

impl<A: AclAccessor> AclAccessor for DryRun<A> {
    fn get_acl(&self, path: &Path) -> AclResult<String> {
        self.inner.get_acl(path)
    }

    fn set_acl(&self, path: &Path, acl: &str) -> AclResult<()> {
        info!(path = %path.display(), acl = %acl.trim_end(), "dry run: would replace acl");
        Ok(())
    }

    fn add_entry(&self, path: &Path, entry: &AclEntry) -> AclResult<()> {
        info!(path = %path.display(), %entry, "dry run: would add entry");
        Ok(())
    }

    fn remove_entry(&self, path: &Path, entry: &AclEntry) -> AclResult<()> {
        info!(path = %path.display(), %entry, "dry run: would remove entry");
        Ok(())
    }
}
