//! Mapping validation, run before any ACL is touched.

use crate::error::AclResult;
use crate::mapping::NewMapping;
use crate::store::MappingStore;
use std::fmt;
use std::path::PathBuf;

/// One violated invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    MissingUser,
    /// Would not survive as the principal of an ACL entry line
    InvalidUser(String),
    MissingApp,
    MissingDataset,
    RelativeApp(PathBuf),
    RelativeDataset(PathBuf),
    DatasetNotFound(PathBuf),
    DuplicateUserApp { user: String, app: PathBuf },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::MissingUser => f.write_str("User can't be blank."),
            Violation::InvalidUser(_) => f.write_str("User can't contain ':' or whitespace."),
            Violation::MissingApp => f.write_str("App can't be blank."),
            Violation::MissingDataset => f.write_str("Dataset can't be blank."),
            Violation::RelativeApp(p) => write!(f, "App must be an absolute path ({}).", p.display()),
            Violation::RelativeDataset(p) => {
                write!(f, "Dataset must be an absolute path ({}).", p.display())
            }
            Violation::DatasetNotFound(_) => f.write_str("Dataset must exist."),
            Violation::DuplicateUserApp { .. } => {
                f.write_str("Unable to create a second mapping between user and app.")
            }
        }
    }
}

/// Collect every violated invariant of `new`. An empty list means valid.
pub fn validate(new: &NewMapping, store: &dyn MappingStore) -> AclResult<Vec<Violation>> {
    let mut violations = Vec::new();

    if new.user.is_empty() {
        violations.push(Violation::MissingUser);
    } else if new.user.contains(|c: char| c == ':' || c.is_whitespace()) {
        violations.push(Violation::InvalidUser(new.user.clone()));
    }

    if new.app.as_os_str().is_empty() {
        violations.push(Violation::MissingApp);
    } else if !new.app.is_absolute() {
        violations.push(Violation::RelativeApp(new.app.clone()));
    }

    if new.dataset.as_os_str().is_empty() {
        violations.push(Violation::MissingDataset);
    } else if !new.dataset.is_absolute() {
        violations.push(Violation::RelativeDataset(new.dataset.clone()));
    } else if !new.dataset.exists() {
        violations.push(Violation::DatasetNotFound(new.dataset.clone()));
    }

    if !new.user.is_empty() && !new.app.as_os_str().is_empty() && store.exists_user_app(&new.user, &new.app)? {
        violations.push(Violation::DuplicateUserApp {
            user: new.user.clone(),
            app: new.app.clone(),
        });
    }

    Ok(violations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn blank_fields_are_reported_together() {
        let store = MemoryStore::default();
        let new = NewMapping::new("", "", "");
        let violations = validate(&new, &store).unwrap();
        assert_eq!(
            violations,
            vec![Violation::MissingUser, Violation::MissingApp, Violation::MissingDataset]
        );
    }

    #[test]
    fn user_must_fit_an_acl_entry() {
        let store = MemoryStore::default();
        for user in ["amy:x", "amy smith"] {
            let violations = validate(&NewMapping::new(user, "/apps/x", "/"), &store).unwrap();
            assert_eq!(violations, vec![Violation::InvalidUser(user.to_string())]);
        }
        assert!(validate(&NewMapping::new("amy@lab", "/apps/x", "/"), &store)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn dataset_must_exist() {
        let store = MemoryStore::default();
        let new = NewMapping::new("amy", "/apps/x", "/no/such/dataset/here");
        let violations = validate(&new, &store).unwrap();
        assert_eq!(violations, vec![Violation::DatasetNotFound("/no/such/dataset/here".into())]);
    }

    #[test]
    fn relative_paths_are_rejected() {
        let store = MemoryStore::default();
        let new = NewMapping::new("amy", "apps/x", "data/d");
        let violations = validate(&new, &store).unwrap();
        assert!(violations.contains(&Violation::RelativeApp("apps/x".into())));
        assert!(violations.contains(&Violation::RelativeDataset("data/d".into())));
    }

    #[test]
    fn user_app_pair_is_unique() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = MemoryStore::default();
        store.insert(NewMapping::new("amy", "/apps/x", dir.path())).unwrap();

        let again = NewMapping::new("amy", "/apps/x", dir.path());
        let violations = validate(&again, &store).unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(
            violations[0].to_string(),
            "Unable to create a second mapping between user and app."
        );

        let other_user = NewMapping::new("bob", "/apps/x", dir.path());
        assert!(validate(&other_user, &store).unwrap().is_empty());
    }
}
