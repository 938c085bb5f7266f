//! Ordered NFSv4 ACLs and their canonical text form.

use crate::entry::{AcePermissions, AceType, AclEntry, Principal};
use crate::error::AclResult;
use std::fmt;
use std::str::FromStr;

/// Entries for one path, in evaluation order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Acl {
    entries: Vec<AclEntry>,
}

impl Acl {
    pub fn new(entries: Vec<AclEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[AclEntry] {
        &self.entries
    }

    pub fn contains(&self, entry: &AclEntry) -> bool {
        self.entries.contains(entry)
    }

    /// The owning-group special entry, if present.
    pub fn group_entry(&self) -> Option<&AclEntry> {
        self.entries.iter().find(|e| e.is_group_owner())
    }

    /// Whether the owning group is allowed to rewrite this ACL.
    pub fn group_can_write_acl(&self) -> bool {
        self.group_entry()
            .map(|e| e.is_allow() && e.permissions.contains(AcePermissions::WRITE_ACL))
            .unwrap_or(false)
    }

    /// First-match evaluation of `permission` for a named user.
    ///
    /// Only entries naming the user (in any domain) or `EVERYONE@` take part;
    /// owner and group entries need uid/gid context this check does not have.
    pub fn allows_user(&self, user: &str, permission: AcePermissions) -> bool {
        for entry in &self.entries {
            let applies = match &entry.principal {
                Principal::Everyone => true,
                Principal::Named { name, .. } => name == user,
                _ => false,
            };
            if !applies || !entry.permissions.contains(permission) {
                continue;
            }
            match entry.ace_type {
                AceType::Allow => return true,
                AceType::Deny => return false,
                AceType::Audit | AceType::Alarm => {}
            }
        }
        false
    }

    /// Canonical text: one entry per line, newline terminated.
    pub fn to_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Acl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            writeln!(f, "{entry}")?;
        }
        Ok(())
    }
}

impl FromStr for Acl {
    type Err = crate::error::AclError;

    /// Parse tool output. Blank lines and `#` header lines are skipped.
    fn from_str(text: &str) -> AclResult<Self> {
        let entries = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::parse)
            .collect::<AclResult<Vec<AclEntry>>>()?;
        Ok(Self { entries })
    }
}
