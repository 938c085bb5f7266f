//! Mapping create/destroy, keeping records and grants in step.
//!
//! The record and its grants are kept together by ordering, not by a
//! transaction. Create persists first and rolls back the record, and the app
//! grant it added, if a grant fails. Destroy revokes first and only deletes
//! the record once every revoke went through.

use crate::accessor::AclAccessor;
use crate::entry::AcePermissions;
use crate::error::{AclError, AclResult};
use crate::mapping::{Mapping, NewMapping};
use crate::reconcile::{GrantOutcome, GrantReconciler};
use crate::store::MappingStore;
use crate::validation;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

/// A failed create/destroy, with the one message shown to the operator.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct LifecycleFailure {
    pub message: String,
    #[source]
    pub source: AclError,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DestroyOutcome {
    Destroyed(Mapping),
    /// Record was already gone, e.g. a repeated delete request
    AlreadyGone,
}

impl DestroyOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            DestroyOutcome::Destroyed(_) => "Mapping successfully destroyed.",
            DestroyOutcome::AlreadyGone => "Mapping was already removed.",
        }
    }
}

pub const CREATED_MESSAGE: &str = "Mapping successfully created.";

pub struct MappingService<'a> {
    accessor: &'a dyn AclAccessor,
    store: &'a mut dyn MappingStore,
    domain: &'a str,
}

impl<'a> MappingService<'a> {
    pub fn new(accessor: &'a dyn AclAccessor, store: &'a mut dyn MappingStore, domain: &'a str) -> Self {
        Self { accessor, store, domain }
    }

    fn reconciler(&self) -> GrantReconciler<'_> {
        GrantReconciler::new(self.accessor, &*self.store, self.domain)
    }

    /// Validate, persist, then grant rx on app and dataset.
    pub fn create(&mut self, new: NewMapping) -> Result<Mapping, LifecycleFailure> {
        let violations = validation::validate(&new, &*self.store).map_err(|e| LifecycleFailure {
            message: format!("Unable to create mapping because {e}"),
            source: e,
        })?;
        if !violations.is_empty() {
            let err = AclError::Validation(violations);
            return Err(LifecycleFailure {
                message: err.to_string(),
                source: err,
            });
        }

        let mapping = self.store.insert(new).map_err(|e| LifecycleFailure {
            message: format!("Unable to create mapping because {e}"),
            source: e,
        })?;

        let app_grant = match self.reconciler().add_grant(&mapping.user, &mapping.app) {
            Ok(outcome) => self
                .reconciler()
                .add_grant(&mapping.user, &mapping.dataset)
                .map(|_| outcome)
                .map_err(|err| (err, outcome)),
            Err(err) => Err((err, GrantOutcome::Skipped)),
        };
        if let Err((err, app_outcome)) = app_grant {
            warn!(id = mapping.id, error = %err, "grant failed, rolling back mapping");
            self.roll_back(&mapping, app_outcome);
            return Err(LifecycleFailure {
                message: format!("Unable to set FACLs because {err}"),
                source: err,
            });
        }

        info!(id = mapping.id, user = %mapping.user, app = %mapping.app.display(), dataset = %mapping.dataset.display(), "mapping created");
        Ok(mapping)
    }

    /// Undo a half-finished create: drop the record, then the app grant if
    /// this create added it. Failures here are logged only.
    fn roll_back(&mut self, mapping: &Mapping, app_outcome: GrantOutcome) {
        if let Err(err) = self.store.delete(mapping.id) {
            warn!(id = mapping.id, error = %err, "rollback of mapping failed");
            return;
        }
        if app_outcome != GrantOutcome::Applied {
            return;
        }
        if let Err(err) = self.reconciler().remove_grant(&mapping.user, &mapping.app) {
            warn!(id = mapping.id, app = %mapping.app.display(), error = %err, "rollback of app grant failed");
        }
    }

    /// Revoke grants no other mapping needs, then delete the record.
    ///
    /// The dataset grant goes first. If it is revoked and the app revoke then
    /// fails, the record stays while the user has already lost the dataset;
    /// retrying the destroy finishes the job.
    pub fn destroy(&mut self, id: u64) -> Result<DestroyOutcome, LifecycleFailure> {
        let mapping = match self.store.find(id) {
            Ok(Some(mapping)) => mapping,
            Ok(None) => {
                let race = AclError::RaceNotFound { id };
                debug!(error = %race, "destroy of missing mapping ignored");
                return Ok(DestroyOutcome::AlreadyGone);
            }
            Err(e) => {
                return Err(LifecycleFailure {
                    message: format!("Unable to destroy mapping because {e}"),
                    source: e,
                })
            }
        };

        let revoke = {
            let reconciler = self.reconciler();
            reconciler
                .remove_grant(&mapping.user, &mapping.dataset)
                .and_then(|_| reconciler.remove_grant(&mapping.user, &mapping.app))
        };
        if let Err(err) = revoke {
            return Err(LifecycleFailure {
                message: format!("Unable to destroy mapping because {err}"),
                source: err,
            });
        }

        match self.store.delete(id) {
            Ok(true) => {
                info!(id, user = %mapping.user, "mapping destroyed");
                Ok(DestroyOutcome::Destroyed(mapping))
            }
            Ok(false) => Ok(DestroyOutcome::AlreadyGone),
            Err(e) => Err(LifecycleFailure {
                message: format!("Unable to destroy mapping because {e}"),
                source: e,
            }),
        }
    }

    /// App and dataset still exist and the on-disk ACLs still let the user
    /// read and traverse both.
    pub fn is_still_valid(&self, mapping: &Mapping) -> AclResult<bool> {
        if !mapping.app.exists() || !mapping.dataset.exists() {
            return Ok(false);
        }
        Ok(self.user_allowed_rx(&mapping.user, &mapping.app)?
            && self.user_allowed_rx(&mapping.user, &mapping.dataset)?)
    }

    fn user_allowed_rx(&self, user: &str, path: &Path) -> AclResult<bool> {
        let acl = match self.accessor.read_acl(path) {
            Ok(acl) => acl,
            Err(AclError::InvalidPath { .. }) => return Ok(false),
            Err(e) => return Err(e),
        };
        Ok(acl.allows_user(user, AcePermissions::READ_DATA)
            && acl.allows_user(user, AcePermissions::EXECUTE))
    }
}
