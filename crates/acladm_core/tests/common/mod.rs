#![allow(dead_code)]

use acladm_core::{Acl, AclAccessor, AclEntry, AclError, AclResult};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// ACL accessor double keeping ACL text in memory. Paths must exist on disk,
/// like with the real tools; unknown paths start with an empty ACL.
#[derive(Default)]
pub struct MemoryAccessor {
    acls: RefCell<HashMap<PathBuf, String>>,
    fail_read: RefCell<HashSet<PathBuf>>,
    fail_write: RefCell<HashSet<PathBuf>>,
    pub writes: Cell<usize>,
}

impl MemoryAccessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn preload(&self, path: &Path, acl: &str) {
        self.acls.borrow_mut().insert(path.to_path_buf(), acl.to_string());
    }

    pub fn acl_of(&self, path: &Path) -> String {
        self.acls.borrow().get(path).cloned().unwrap_or_default()
    }

    pub fn fail_reads_on(&self, path: &Path) {
        self.fail_read.borrow_mut().insert(path.to_path_buf());
    }

    pub fn fail_writes_on(&self, path: &Path) {
        self.fail_write.borrow_mut().insert(path.to_path_buf());
    }

    pub fn heal(&self) {
        self.fail_read.borrow_mut().clear();
        self.fail_write.borrow_mut().clear();
    }

    fn check_exists(path: &Path) -> AclResult<()> {
        if path.exists() {
            Ok(())
        } else {
            Err(AclError::InvalidPath { path: path.to_path_buf() })
        }
    }

    fn check_write(&self, path: &Path) -> AclResult<()> {
        Self::check_exists(path)?;
        if self.fail_write.borrow().contains(path) {
            return Err(AclError::tool("nfs4_setfacl exited with status 1: Operation not permitted"));
        }
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }
}

impl AclAccessor for MemoryAccessor {
    fn get_acl(&self, path: &Path) -> AclResult<String> {
        Self::check_exists(path)?;
        if self.fail_read.borrow().contains(path) {
            return Err(AclError::tool("nfs4_getfacl exited with status 1: Input/output error"));
        }
        Ok(self.acl_of(path))
    }

    fn set_acl(&self, path: &Path, acl: &str) -> AclResult<()> {
        self.check_write(path)?;
        self.preload(path, acl);
        Ok(())
    }

    fn add_entry(&self, path: &Path, entry: &AclEntry) -> AclResult<()> {
        self.check_write(path)?;
        let mut text = self.acl_of(path);
        text.push_str(&format!("{entry}\n"));
        self.preload(path, &text);
        Ok(())
    }

    fn remove_entry(&self, path: &Path, entry: &AclEntry) -> AclResult<()> {
        self.check_write(path)?;
        let acl: Acl = self.acl_of(path).parse()?;
        let kept: Vec<AclEntry> = acl.entries().iter().filter(|e| *e != entry).cloned().collect();
        self.preload(path, &Acl::new(kept).to_text());
        Ok(())
    }
}

pub const DOMAIN: &str = "example.org";
