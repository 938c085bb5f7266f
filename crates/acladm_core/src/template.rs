//! Desired-ACL templates.
//!
//! Three policy classes exist. Plain files and plain directories under a
//! managed root get fixed owner/group/everyone tiers. Dataset and app
//! directories get one read+execute grant per authorized user and an
//! everyone tier that can traverse but not list.

use crate::acl::Acl;
use crate::entry::{AcePermissions as P, AclEntry, Principal};
use serde::Serialize;

/// Policy class of a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PathClass {
    File,
    Directory,
    /// Dataset or app directory with an explicit per-user allow-list
    Restricted,
}

fn owner_file() -> P {
    P::READ_DATA
        | P::WRITE_DATA
        | P::APPEND_DATA
        | P::READ_ATTRIBUTES
        | P::WRITE_ATTRIBUTES
        | P::READ_NAMED_ATTRS
        | P::WRITE_NAMED_ATTRS
        | P::READ_ACL
        | P::WRITE_ACL
        | P::WRITE_OWNER
        | P::SYNCHRONIZE
}

fn group_file() -> P {
    P::READ_DATA
        | P::WRITE_DATA
        | P::APPEND_DATA
        | P::READ_ATTRIBUTES
        | P::READ_NAMED_ATTRS
        | P::READ_ACL
        | P::WRITE_ACL
        | P::SYNCHRONIZE
}

fn browse() -> P {
    P::READ_ATTRIBUTES | P::READ_NAMED_ATTRS | P::READ_ACL | P::SYNCHRONIZE
}

fn directory_bits() -> P {
    P::DELETE_CHILD | P::EXECUTE
}

/// Builds template ACLs for one user domain.
#[derive(Debug, Clone)]
pub struct TemplateGenerator {
    domain: String,
}

impl TemplateGenerator {
    pub fn new(domain: impl Into<String>) -> Self {
        Self { domain: domain.into() }
    }

    /// Desired ACL for `class`. `users` only matters for `Restricted`;
    /// it is sorted and deduplicated so the output depends on the set alone.
    pub fn template_for<S: AsRef<str>>(&self, class: PathClass, users: &[S]) -> Acl {
        let mut entries = Vec::new();
        match class {
            PathClass::File => {
                entries.push(AclEntry::allow(Principal::Owner, owner_file()));
                entries.push(AclEntry::allow(Principal::Group, group_file()));
                entries.push(AclEntry::allow(Principal::Everyone, P::READ_DATA | browse()));
            }
            PathClass::Directory => {
                entries.push(AclEntry::allow(Principal::Owner, owner_file() | directory_bits()));
                entries.push(AclEntry::allow(Principal::Group, group_file() | directory_bits()));
                entries.push(AclEntry::allow(
                    Principal::Everyone,
                    P::READ_DATA | P::EXECUTE | browse(),
                ));
            }
            PathClass::Restricted => {
                let mut sorted: Vec<&str> = users.iter().map(|u| u.as_ref()).collect();
                sorted.sort_unstable();
                sorted.dedup();
                entries.extend(
                    sorted
                        .into_iter()
                        .map(|user| AclEntry::read_execute_grant(user, &self.domain)),
                );
                entries.push(AclEntry::allow(Principal::Owner, owner_file() | directory_bits()));
                entries.push(AclEntry::allow(Principal::Group, group_file() | directory_bits()));
                entries.push(AclEntry::allow(Principal::Everyone, browse()));
            }
        }
        Acl::new(entries)
    }

    /// Canonical text of [`template_for`](Self::template_for).
    pub fn render<S: AsRef<str>>(&self, class: PathClass, users: &[S]) -> String {
        self.template_for(class, users).to_text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const NONE: &[&str] = &[];

    #[test]
    fn file_template() {
        let text = TemplateGenerator::new("example.org").render(PathClass::File, NONE);
        assert_eq!(
            text,
            "A::OWNER@:rwatTnNcCoy\nA::GROUP@:rwatncCy\nA::EVERYONE@:rtncy\n"
        );
    }

    #[test]
    fn directory_template() {
        let text = TemplateGenerator::new("example.org").render(PathClass::Directory, NONE);
        assert_eq!(
            text,
            "A::OWNER@:rwaDxtTnNcCoy\nA::GROUP@:rwaDxtncCy\nA::EVERYONE@:rxtncy\n"
        );
    }

    #[test]
    fn restricted_template_sorts_users_and_hides_listing() {
        let acl = TemplateGenerator::new("example.org").template_for(PathClass::Restricted, &["bob", "amy"]);
        assert_eq!(
            acl.to_text(),
            "A::amy@example.org:rx\nA::bob@example.org:rx\nA::OWNER@:rwaDxtTnNcCoy\nA::GROUP@:rwaDxtncCy\nA::EVERYONE@:tncy\n"
        );
        let everyone = acl.entries().last().unwrap();
        assert_eq!(everyone.principal, Principal::Everyone);
        assert!(!everyone.permissions.contains(P::READ_DATA));
    }

    #[test]
    fn restricted_template_without_users() {
        let text = TemplateGenerator::new("example.org").render(PathClass::Restricted, NONE);
        assert!(text.starts_with("A::OWNER@"));
    }

    #[test]
    fn duplicate_users_collapse() {
        let gen = TemplateGenerator::new("example.org");
        assert_eq!(
            gen.render(PathClass::Restricted, &["amy", "amy", "bob"]),
            gen.render(PathClass::Restricted, &["bob", "amy"])
        );
    }

    proptest! {
        #[test]
        fn restricted_output_ignores_input_order(mut users in proptest::collection::vec("[a-z]{1,8}", 0..8)) {
            let gen = TemplateGenerator::new("example.org");
            let first = gen.render(PathClass::Restricted, &users);
            users.reverse();
            let second = gen.render(PathClass::Restricted, &users);
            prop_assert_eq!(first, second);
        }
    }
}
