//! Whole-tree ACL sweeps.
//!
//! Paths are enumerated up front, then visited one at a time: classify,
//! render the desired ACL, read the actual one, write only if they differ.
//! A failure on one path is recorded and the sweep moves on.

use crate::accessor::AclAccessor;
use crate::diff::acls_differ;
use crate::error::{AclError, AclResult};
use crate::mapping::normalize_path;
use crate::store::MappingStore;
use crate::template::{PathClass, TemplateGenerator};
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Classification plus the allow-list it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPolicy {
    pub class: PathClass,
    pub users: Vec<String>,
}

impl PathPolicy {
    pub fn file() -> Self {
        Self { class: PathClass::File, users: Vec::new() }
    }

    pub fn directory() -> Self {
        Self { class: PathClass::Directory, users: Vec::new() }
    }

    pub fn restricted(users: Vec<String>) -> Self {
        Self { class: PathClass::Restricted, users }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepFailure {
    pub path: PathBuf,
    pub error: String,
}

/// Per-sweep log of what changed and what could not be processed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub updated: Vec<PathBuf>,
    pub failed: Vec<SweepFailure>,
}

impl SweepReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    fn record(&mut self, path: PathBuf, outcome: PathOutcome) {
        match outcome {
            PathOutcome::Unchanged => {}
            PathOutcome::Updated => self.updated.push(path),
            PathOutcome::Failed(error) => self.failed.push(SweepFailure { path, error }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathOutcome {
    Unchanged,
    Updated,
    Failed(String),
}

fn failure_text(err: &AclError) -> String {
    format!("{}: {}", err.kind_name(), err)
}

pub struct TreeFixer<'a> {
    accessor: &'a dyn AclAccessor,
    store: &'a dyn MappingStore,
    templates: TemplateGenerator,
}

impl<'a> TreeFixer<'a> {
    pub fn new(accessor: &'a dyn AclAccessor, store: &'a dyn MappingStore, templates: TemplateGenerator) -> Self {
        Self { accessor, store, templates }
    }

    /// Converge one path to `desired`. Errors from either the read or the
    /// write become `Failed` instead of propagating.
    pub fn fix_acl(&self, path: &Path, desired: &str) -> PathOutcome {
        let result = self.accessor.get_acl(path).and_then(|actual| {
            if acls_differ(&actual, desired) {
                self.accessor.set_acl(path, desired)?;
                Ok(true)
            } else {
                Ok(false)
            }
        });
        match result {
            Ok(true) => {
                info!(path = %path.display(), "acl updated");
                PathOutcome::Updated
            }
            Ok(false) => {
                debug!(path = %path.display(), "acl unchanged");
                PathOutcome::Unchanged
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "acl fix failed");
                PathOutcome::Failed(failure_text(&err))
            }
        }
    }

    /// Sweep a fixed list of paths.
    pub fn reconcile_paths<I, F>(&self, paths: I, mut classify: F) -> SweepReport
    where
        I: IntoIterator<Item = PathBuf>,
        F: FnMut(&Path) -> AclResult<PathPolicy>,
    {
        let mut report = SweepReport::default();
        for path in paths {
            let outcome = match classify(&path) {
                Ok(policy) => {
                    let desired = self.templates.render(policy.class, &policy.users);
                    self.fix_acl(&path, &desired)
                }
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "classification failed");
                    PathOutcome::Failed(failure_text(&err))
                }
            };
            report.record(path, outcome);
        }
        info!(updated = report.updated.len(), failed = report.failed.len(), "sweep finished");
        report
    }

    /// Sweep every path below `root` (not `root` itself). `classify` gets the
    /// path and whether it is a directory. Symlinks are not followed or fixed.
    pub fn reconcile_tree<F>(&self, root: &Path, mut classify: F) -> SweepReport
    where
        F: FnMut(&Path, bool) -> AclResult<PathPolicy>,
    {
        let root = normalize_path(root);
        let mut walk_failures = Vec::new();
        let mut paths = Vec::new();
        for entry in WalkDir::new(&root).min_depth(1).sort_by_file_name() {
            match entry {
                Ok(entry) if entry.file_type().is_symlink() => {
                    debug!(path = %entry.path().display(), "skipping symlink");
                }
                Ok(entry) => paths.push((entry.path().to_path_buf(), entry.file_type().is_dir())),
                Err(err) => {
                    let path = err.path().map(Path::to_path_buf).unwrap_or_else(|| root.clone());
                    warn!(path = %path.display(), error = %err, "walk failed");
                    walk_failures.push(SweepFailure {
                        path,
                        error: format!("InvalidPath: {err}"),
                    });
                }
            }
        }
        debug!(root = %root.display(), count = paths.len(), "enumerated paths");

        let dirs: HashSet<PathBuf> = paths.iter().filter(|(_, d)| *d).map(|(p, _)| p.clone()).collect();
        let mut report = self.reconcile_paths(paths.into_iter().map(|(p, _)| p), |path| {
            classify(path, dirs.contains(path))
        });
        report.failed.extend(walk_failures);
        report
    }

    /// Sweep the dataset root. Registered datasets get the allow-list
    /// template with their mapped users; everything else is a plain file
    /// or directory.
    pub fn fix_dataset_root(&self, dataset_root: &Path) -> AclResult<SweepReport> {
        let datasets: HashSet<PathBuf> = self.store.datasets()?.into_iter().collect();
        let store = self.store;
        Ok(self.reconcile_tree(dataset_root, |path, is_dir| {
            if datasets.contains(path) {
                Ok(PathPolicy::restricted(store.users_for_dataset(path)?))
            } else if is_dir {
                Ok(PathPolicy::directory())
            } else {
                Ok(PathPolicy::file())
            }
        }))
    }

    /// Sweep installed app directories, each with its mapped users.
    pub fn fix_app_permissions(&self, apps: &[PathBuf]) -> SweepReport {
        let store = self.store;
        self.reconcile_paths(apps.iter().cloned(), |path| {
            Ok(PathPolicy::restricted(store.users_for_app(path)?))
        })
    }
}

/// Immediate child directories of the shared apps root, sorted.
pub fn installed_apps(shared_apps_root: &Path) -> AclResult<Vec<PathBuf>> {
    let root = normalize_path(shared_apps_root);
    let mut apps = Vec::new();
    for entry in fs::read_dir(&root).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => AclError::InvalidPath { path: root.clone() },
        _ => AclError::io(&root, e),
    })? {
        let entry = entry.map_err(|e| AclError::io(&root, e))?;
        let file_type = entry.file_type().map_err(|e| AclError::io(entry.path(), e))?;
        if file_type.is_dir() {
            apps.push(entry.path());
        }
    }
    apps.sort();
    Ok(apps)
}
