//! acladm core library
//!
//! Keeps NFSv4 ACLs on shared dataset and application trees in line with
//! a store of user/app/dataset mappings. Two paths lead to the disk:
//!
//! - [`tree::TreeFixer`] sweeps a whole tree, rendering each path's desired
//!   ACL from [`template`] and rewriting it only when [`diff`] says it drifted.
//! - [`reconcile::GrantReconciler`] adds or removes a single `rx` grant for
//!   one user on one path as mappings come and go ([`lifecycle`]).

pub mod accessor;
pub mod acl;
pub mod audit;
pub mod config;
pub mod diff;
pub mod entry;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod mapping;
pub mod reconcile;
pub mod store;
pub mod template;
pub mod tree;
pub mod validation;

pub use accessor::{AclAccessor, DryRun};
pub use acl::Acl;
pub use config::Config;
pub use entry::{AceFlags, AcePermissions, AceType, AclEntry, Principal};
pub use error::{AclError, AclResult};
pub use lifecycle::{DestroyOutcome, LifecycleFailure, MappingService};
pub use mapping::{Mapping, NewMapping};
pub use reconcile::{GrantOutcome, GrantReconciler, GrantState};
pub use store::{JsonFileStore, MappingStore, MemoryStore};
pub use template::{PathClass, TemplateGenerator};
pub use tree::{PathOutcome, PathPolicy, SweepFailure, SweepReport, TreeFixer};
pub use validation::Violation;
