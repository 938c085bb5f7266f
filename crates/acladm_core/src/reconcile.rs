//! Single-grant reconciliation.
//!
//! Each mapping needs `A::<user>@<domain>:rx` on its app and its dataset.
//! The same grant is shared by every mapping of that user that references
//! the path, so removal is reference counted against the mapping store.

use crate::accessor::AclAccessor;
use crate::entry::AclEntry;
use crate::error::{AclError, AclResult};
use crate::store::MappingStore;
use std::path::Path;
use tracing::{debug, info};

/// Result of probing a path for a user's grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantState {
    Present,
    Absent,
    /// The ACL could not be read or parsed
    ProbeFailed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantOutcome {
    Applied,
    Skipped,
}

type ModifyCheck<'a> = Box<dyn Fn(&Path) -> bool + 'a>;

pub struct GrantReconciler<'a> {
    accessor: &'a dyn AclAccessor,
    store: &'a dyn MappingStore,
    domain: &'a str,
    modify_check: Option<ModifyCheck<'a>>,
}

impl<'a> GrantReconciler<'a> {
    pub fn new(accessor: &'a dyn AclAccessor, store: &'a dyn MappingStore, domain: &'a str) -> Self {
        Self {
            accessor,
            store,
            domain,
            modify_check: None,
        }
    }

    /// Replace the ownership-based modifiability check.
    pub fn with_modify_check(mut self, check: impl Fn(&Path) -> bool + 'a) -> Self {
        self.modify_check = Some(Box::new(check));
        self
    }

    pub fn grant_for(&self, user: &str) -> AclEntry {
        AclEntry::read_execute_grant(user, self.domain)
    }

    /// Whether this process may rewrite the ACL of `path`: the path exists
    /// and is owned by us, or its group entry carries write-ACL (`C`).
    ///
    /// Assumes no deny entries take write-ACL away again.
    pub fn can_modify(&self, path: &Path) -> bool {
        if let Some(check) = &self.modify_check {
            return check(path);
        }
        if !path.exists() {
            return false;
        }
        if let Ok(true) = acladm_hal::fs::is_owned_by_current_user(path) {
            return true;
        }
        match self.accessor.read_acl(path) {
            Ok(acl) => {
                let result = acl.group_can_write_acl();
                debug!(path = %path.display(), result, "group entry write-acl check");
                result
            }
            Err(err) => {
                debug!(path = %path.display(), error = %err, "group entry check failed");
                false
            }
        }
    }

    pub fn probe(&self, user: &str, path: &Path) -> GrantState {
        match self.accessor.read_acl(path) {
            Ok(acl) if acl.contains(&self.grant_for(user)) => GrantState::Present,
            Ok(_) => GrantState::Absent,
            Err(err) => GrantState::ProbeFailed(err.to_string()),
        }
    }

    /// Modifiable and the grant is missing.
    pub fn should_add(&self, user: &str, path: &Path) -> AclResult<bool> {
        // can_modify first: it rules out missing paths before the probe runs
        if !self.can_modify(path) {
            return Ok(false);
        }
        match self.probe(user, path) {
            GrantState::Present => Ok(false),
            GrantState::Absent => Ok(true),
            GrantState::ProbeFailed(message) => Err(AclError::tool(message)),
        }
    }

    /// Append the user's grant if [`should_add`](Self::should_add) says so.
    pub fn add_grant(&self, user: &str, path: &Path) -> AclResult<GrantOutcome> {
        if !self.should_add(user, path)? {
            debug!(user, path = %path.display(), "grant add skipped");
            return Ok(GrantOutcome::Skipped);
        }
        let entry = self.grant_for(user);
        self.accessor.add_entry(path, &entry)?;
        info!(user, path = %path.display(), %entry, "grant added");
        Ok(GrantOutcome::Applied)
    }

    /// Modifiable, the grant exists, and at most one mapping (the one being
    /// destroyed) still references this (path, user).
    pub fn should_remove(&self, user: &str, path: &Path) -> AclResult<bool> {
        if !self.can_modify(path) {
            return Ok(false);
        }
        match self.probe(user, path) {
            GrantState::Absent => return Ok(false),
            GrantState::ProbeFailed(message) => return Err(AclError::tool(message)),
            GrantState::Present => {}
        }
        Ok(self.store.reference_count(path, user)? <= 1)
    }

    /// Remove the user's grant if [`should_remove`](Self::should_remove) says so.
    pub fn remove_grant(&self, user: &str, path: &Path) -> AclResult<GrantOutcome> {
        if !self.should_remove(user, path)? {
            debug!(user, path = %path.display(), "grant removal skipped");
            return Ok(GrantOutcome::Skipped);
        }
        let entry = self.grant_for(user);
        self.accessor.remove_entry(path, &entry)?;
        info!(user, path = %path.display(), %entry, "grant removed");
        Ok(GrantOutcome::Applied)
    }
}
