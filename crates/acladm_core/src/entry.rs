//! Typed NFSv4 ACL entries.
//!
//! One entry is the `nfs4_acl(5)` line `type:flags:principal:permissions`,
//! e.g. `A:g:GROUP@:rwaDxtncCy` or `A::amy@example.org:rx`. Permission and
//! flag letters always render in the canonical order the tools print them,
//! so a parsed-then-rendered entry is byte-identical to the tool output.

use crate::error::{AclError, AclResult};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

bitflags! {
    /// Access mask bits, one per permission letter.
    #[derive(Default)]
    pub struct AcePermissions: u16 {
        const READ_DATA = 1 << 0;
        const WRITE_DATA = 1 << 1;
        const APPEND_DATA = 1 << 2;
        const DELETE_CHILD = 1 << 3;
        const DELETE = 1 << 4;
        const EXECUTE = 1 << 5;
        const READ_ATTRIBUTES = 1 << 6;
        const WRITE_ATTRIBUTES = 1 << 7;
        const READ_NAMED_ATTRS = 1 << 8;
        const WRITE_NAMED_ATTRS = 1 << 9;
        const READ_ACL = 1 << 10;
        const WRITE_ACL = 1 << 11;
        const WRITE_OWNER = 1 << 12;
        const SYNCHRONIZE = 1 << 13;

        /// The only grant this system hands out to named users.
        const READ_EXECUTE = Self::READ_DATA.bits | Self::EXECUTE.bits;
    }
}

bitflags! {
    /// Inheritance and administrative flags.
    #[derive(Default)]
    pub struct AceFlags: u8 {
        const FILE_INHERIT = 1 << 0;
        const DIRECTORY_INHERIT = 1 << 1;
        const NO_PROPAGATE_INHERIT = 1 << 2;
        const INHERIT_ONLY = 1 << 3;
        const SUCCESSFUL_ACCESS = 1 << 4;
        const FAILED_ACCESS = 1 << 5;
        /// Principal names a group rather than a user
        const IDENTIFIER_GROUP = 1 << 6;
    }
}

const PERMISSION_LETTERS: [(char, AcePermissions); 14] = [
    ('r', AcePermissions::READ_DATA),
    ('w', AcePermissions::WRITE_DATA),
    ('a', AcePermissions::APPEND_DATA),
    ('D', AcePermissions::DELETE_CHILD),
    ('d', AcePermissions::DELETE),
    ('x', AcePermissions::EXECUTE),
    ('t', AcePermissions::READ_ATTRIBUTES),
    ('T', AcePermissions::WRITE_ATTRIBUTES),
    ('n', AcePermissions::READ_NAMED_ATTRS),
    ('N', AcePermissions::WRITE_NAMED_ATTRS),
    ('c', AcePermissions::READ_ACL),
    ('C', AcePermissions::WRITE_ACL),
    ('o', AcePermissions::WRITE_OWNER),
    ('y', AcePermissions::SYNCHRONIZE),
];

const FLAG_LETTERS: [(char, AceFlags); 7] = [
    ('f', AceFlags::FILE_INHERIT),
    ('d', AceFlags::DIRECTORY_INHERIT),
    ('n', AceFlags::NO_PROPAGATE_INHERIT),
    ('i', AceFlags::INHERIT_ONLY),
    ('S', AceFlags::SUCCESSFUL_ACCESS),
    ('F', AceFlags::FAILED_ACCESS),
    ('g', AceFlags::IDENTIFIER_GROUP),
];

impl AcePermissions {
    pub fn parse(letters: &str) -> AclResult<Self> {
        let mut perms = AcePermissions::empty();
        for c in letters.chars() {
            let (_, bit) = PERMISSION_LETTERS
                .iter()
                .find(|(letter, _)| *letter == c)
                .ok_or_else(|| AclError::parse(letters, format!("unknown permission '{c}'")))?;
            perms |= *bit;
        }
        Ok(perms)
    }
}

impl fmt::Display for AcePermissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (letter, bit) in PERMISSION_LETTERS.iter() {
            if self.contains(*bit) {
                write!(f, "{letter}")?;
            }
        }
        Ok(())
    }
}

impl AceFlags {
    pub fn parse(letters: &str) -> AclResult<Self> {
        let mut flags = AceFlags::empty();
        for c in letters.chars() {
            let (_, bit) = FLAG_LETTERS
                .iter()
                .find(|(letter, _)| *letter == c)
                .ok_or_else(|| AclError::parse(letters, format!("unknown flag '{c}'")))?;
            flags |= *bit;
        }
        Ok(flags)
    }
}

impl fmt::Display for AceFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (letter, bit) in FLAG_LETTERS.iter() {
            if self.contains(*bit) {
                write!(f, "{letter}")?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AceType {
    Allow,
    Deny,
    Audit,
    Alarm,
}

impl AceType {
    fn letter(self) -> char {
        match self {
            AceType::Allow => 'A',
            AceType::Deny => 'D',
            AceType::Audit => 'U',
            AceType::Alarm => 'L',
        }
    }

    fn from_letter(s: &str) -> Option<Self> {
        match s {
            "A" => Some(AceType::Allow),
            "D" => Some(AceType::Deny),
            "U" => Some(AceType::Audit),
            "L" => Some(AceType::Alarm),
            _ => None,
        }
    }
}

/// Who an entry applies to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Principal {
    Owner,
    Group,
    Everyone,
    Named { name: String, domain: Option<String> },
}

impl Principal {
    pub fn user(name: impl Into<String>, domain: impl Into<String>) -> Self {
        Principal::Named {
            name: name.into(),
            domain: Some(domain.into()),
        }
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Principal::Owner => f.write_str("OWNER@"),
            Principal::Group => f.write_str("GROUP@"),
            Principal::Everyone => f.write_str("EVERYONE@"),
            Principal::Named { name, domain: Some(domain) } => write!(f, "{name}@{domain}"),
            Principal::Named { name, domain: None } => f.write_str(name),
        }
    }
}

impl FromStr for Principal {
    type Err = AclError;

    fn from_str(s: &str) -> AclResult<Self> {
        match s {
            "OWNER@" => Ok(Principal::Owner),
            "GROUP@" => Ok(Principal::Group),
            "EVERYONE@" => Ok(Principal::Everyone),
            "" => Err(AclError::parse(s, "empty principal")),
            // the domain never contains '@', the user part may
            _ => match s.rsplit_once('@') {
                Some((name, _)) if name.is_empty() => Err(AclError::parse(s, "empty principal name")),
                Some((name, "")) => Ok(Principal::Named { name: name.to_string(), domain: None }),
                Some((name, domain)) => Ok(Principal::user(name, domain)),
                None => Ok(Principal::Named { name: s.to_string(), domain: None }),
            },
        }
    }
}

/// One line of an NFSv4 ACL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AclEntry {
    pub ace_type: AceType,
    pub flags: AceFlags,
    pub principal: Principal,
    pub permissions: AcePermissions,
}

impl AclEntry {
    pub fn allow(principal: Principal, permissions: AcePermissions) -> Self {
        Self {
            ace_type: AceType::Allow,
            flags: AceFlags::empty(),
            principal,
            permissions,
        }
    }

    /// The read+execute grant for `user@domain`.
    pub fn read_execute_grant(user: &str, domain: &str) -> Self {
        Self::allow(Principal::user(user, domain), AcePermissions::READ_EXECUTE)
    }

    pub fn is_allow(&self) -> bool {
        self.ace_type == AceType::Allow
    }

    /// Whether this is the owning-group special entry, with or without the `g` marker.
    pub fn is_group_owner(&self) -> bool {
        self.principal == Principal::Group
    }
}

impl fmt::Display for AclEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.ace_type.letter(),
            self.flags,
            self.principal,
            self.permissions
        )
    }
}

impl FromStr for AclEntry {
    type Err = AclError;

    fn from_str(line: &str) -> AclResult<Self> {
        let line = line.trim();
        let parts: Vec<&str> = line.splitn(4, ':').collect();
        if parts.len() != 4 {
            return Err(AclError::parse(line, "expected type:flags:principal:permissions"));
        }
        let ace_type = AceType::from_letter(parts[0])
            .ok_or_else(|| AclError::parse(line, format!("unknown entry type '{}'", parts[0])))?;
        Ok(Self {
            ace_type,
            flags: AceFlags::parse(parts[1]).map_err(|e| reparse(line, e))?,
            principal: parts[2].parse().map_err(|e| reparse(line, e))?,
            permissions: AcePermissions::parse(parts[3]).map_err(|e| reparse(line, e))?,
        })
    }
}

// Report the whole line rather than the fragment that failed.
fn reparse(line: &str, err: AclError) -> AclError {
    match err {
        AclError::Parse { reason, .. } => AclError::parse(line, reason),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_group_entry_with_marker() {
        let entry: AclEntry = "A:g:GROUP@:rwaDxtncCy".parse().unwrap();
        assert_eq!(entry.ace_type, AceType::Allow);
        assert_eq!(entry.flags, AceFlags::IDENTIFIER_GROUP);
        assert!(entry.is_group_owner());
        assert!(entry.permissions.contains(AcePermissions::WRITE_ACL));
        assert_eq!(entry.to_string(), "A:g:GROUP@:rwaDxtncCy");
    }

    #[test]
    fn permissions_render_in_canonical_order() {
        let perms = AcePermissions::parse("yxr").unwrap();
        assert_eq!(perms.to_string(), "rxy");
        assert_eq!(AcePermissions::READ_EXECUTE.to_string(), "rx");
    }

    #[test]
    fn user_grant_renders_with_domain() {
        let entry = AclEntry::read_execute_grant("amy", "example.org");
        assert_eq!(entry.to_string(), "A::amy@example.org:rx");
        let back: AclEntry = entry.to_string().parse().unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn principal_without_domain() {
        let p: Principal = "amy".parse().unwrap();
        assert_eq!(p, Principal::Named { name: "amy".into(), domain: None });
        assert_eq!(p.to_string(), "amy");
    }

    #[test]
    fn user_with_at_sign_keeps_last_segment_as_domain() {
        let entry = AclEntry::read_execute_grant("amy@lab", "example.org");
        assert_eq!(entry.to_string(), "A::amy@lab@example.org:rx");
        let back: AclEntry = "A::amy@lab@example.org:rx".parse().unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn rejects_unknown_letters() {
        assert!("A::OWNER@:rwQ".parse::<AclEntry>().is_err());
        assert!("Z::OWNER@:r".parse::<AclEntry>().is_err());
        assert!("A:q:OWNER@:r".parse::<AclEntry>().is_err());
        assert!("A::OWNER@".parse::<AclEntry>().is_err());
    }

    #[test]
    fn parse_error_reports_full_line() {
        let err = "A::OWNER@:rwQ".parse::<AclEntry>().unwrap_err();
        assert!(err.to_string().contains("A::OWNER@:rwQ"));
    }
}
