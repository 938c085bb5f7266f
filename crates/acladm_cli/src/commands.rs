//! Subcommand bodies. Each returns Ok(false) when the operation itself
//! reported a failure, so `main` can map it to a non-zero exit status.

use crate::output::{self, Message};
use acladm_core::audit::{audit_ancestors, has_admin_group};
use acladm_core::lifecycle::CREATED_MESSAGE;
use acladm_core::tree::installed_apps;
use acladm_core::{
    AclAccessor, Config, JsonFileStore, MappingService, MappingStore, NewMapping, TemplateGenerator, TreeFixer,
};
use anyhow::{anyhow, Context};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub struct Session<'a> {
    pub config: &'a Config,
    pub accessor: &'a dyn AclAccessor,
    pub json: bool,
}

impl Session<'_> {
    fn open_store(&self) -> anyhow::Result<JsonFileStore> {
        JsonFileStore::open(&self.config.database_path)
            .with_context(|| format!("opening mapping database {}", self.config.database_path.display()))
    }

    fn templates(&self) -> TemplateGenerator {
        TemplateGenerator::new(self.config.facl_user_domain.as_str())
    }

    fn domain(&self) -> &str {
        &self.config.facl_user_domain
    }

    /// Warn when the database directory is not group-owned by the admin group.
    fn check_admin_group(&self) {
        let Some(group) = &self.config.admin_group else {
            return;
        };
        let Some(dir) = self.config.database_path.parent() else {
            return;
        };
        match has_admin_group(dir, group) {
            Ok(true) => {}
            Ok(false) => warn!(dir = %dir.display(), group = %group, "mapping database directory is not owned by the admin group"),
            Err(err) => warn!(dir = %dir.display(), error = %err, "admin group check failed"),
        }
    }
}

pub fn fix_datasets(session: &Session<'_>) -> anyhow::Result<bool> {
    let store = session.open_store()?;
    let fixer = TreeFixer::new(session.accessor, &store, session.templates());
    let report = fixer
        .fix_dataset_root(&session.config.dataset_root)
        .context("sweeping dataset root")?;
    info!(updated = report.updated.len(), failed = report.failed.len(), "dataset sweep finished");
    output::sweep_report(session.json, "fix-datasets", &report)?;
    Ok(report.is_clean())
}

pub fn fix_apps(session: &Session<'_>) -> anyhow::Result<bool> {
    let store = session.open_store()?;
    let apps = installed_apps(&session.config.shared_apps_root).context("listing installed apps")?;
    let fixer = TreeFixer::new(session.accessor, &store, session.templates());
    let report = fixer.fix_app_permissions(&apps);
    info!(apps = apps.len(), updated = report.updated.len(), failed = report.failed.len(), "app sweep finished");
    output::sweep_report(session.json, "fix-apps", &report)?;
    Ok(report.is_clean())
}

pub fn add_mapping(
    session: &Session<'_>,
    user: String,
    app: PathBuf,
    dataset: PathBuf,
    extensions: Option<&str>,
) -> anyhow::Result<bool> {
    let mut new = NewMapping::new(user, app, dataset);
    if let Some(raw) = extensions {
        let value: serde_json::Value = serde_json::from_str(raw).context("parsing --extensions")?;
        new = new.with_extensions(value);
    }
    session.check_admin_group();

    let mut store = session.open_store()?;
    let mut service = MappingService::new(session.accessor, &mut store, session.domain());
    let body = match service.create(new) {
        Ok(mapping) => {
            output::message(
                session.json,
                "add-mapping",
                Message {
                    ok: true,
                    message: CREATED_MESSAGE,
                    mapping: Some(&mapping),
                },
            )?;
            return Ok(true);
        }
        Err(failure) => failure,
    };
    output::message(
        session.json,
        "add-mapping",
        Message {
            ok: false,
            message: &body.message,
            mapping: None,
        },
    )?;
    Ok(false)
}

pub fn remove_mapping(session: &Session<'_>, id: u64) -> anyhow::Result<bool> {
    session.check_admin_group();
    let mut store = session.open_store()?;
    let mut service = MappingService::new(session.accessor, &mut store, session.domain());
    let (ok, message) = match service.destroy(id) {
        Ok(outcome) => (true, outcome.message().to_string()),
        Err(failure) => (false, failure.message),
    };
    output::message(
        session.json,
        "remove-mapping",
        Message {
            ok,
            message: &message,
            mapping: None,
        },
    )?;
    Ok(ok)
}

pub fn list_mappings(
    session: &Session<'_>,
    user: Option<&str>,
    app: Option<&Path>,
    dataset: Option<&Path>,
) -> anyhow::Result<bool> {
    let store = session.open_store()?;
    let app = app.map(acladm_core::mapping::normalize_path);
    let dataset = dataset.map(acladm_core::mapping::normalize_path);
    let mappings: Vec<_> = store
        .all()?
        .into_iter()
        .filter(|m| user.map_or(true, |u| m.user == u))
        .filter(|m| app.as_ref().map_or(true, |a| &m.app == a))
        .filter(|m| dataset.as_ref().map_or(true, |d| &m.dataset == d))
        .collect();
    output::mappings(session.json, &mappings)?;
    Ok(true)
}

pub fn check_mapping(session: &Session<'_>, id: u64) -> anyhow::Result<bool> {
    let mut store = session.open_store()?;
    let mapping = store
        .find(id)?
        .ok_or_else(|| anyhow!("mapping {id} not found"))?;
    let service = MappingService::new(session.accessor, &mut store, session.domain());
    let valid = service
        .is_still_valid(&mapping)
        .with_context(|| format!("checking mapping {id}"))?;
    let message = if valid {
        "Mapping is still valid."
    } else {
        "Mapping is no longer valid."
    };
    output::message(
        session.json,
        "check-mapping",
        Message {
            ok: valid,
            message,
            mapping: Some(&mapping),
        },
    )?;
    Ok(valid)
}

pub fn audit_dirs(session: &Session<'_>, path: Option<PathBuf>, stop_at: Option<PathBuf>) -> anyhow::Result<bool> {
    let start = match path {
        Some(path) => path,
        None => session
            .config
            .database_path
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| anyhow!("mapping database path has no parent directory"))?,
    };
    let audit = audit_ancestors(&start, stop_at.as_deref())
        .with_context(|| format!("auditing {}", start.display()))?;
    let admin_group_ok = match &session.config.admin_group {
        Some(group) => Some(has_admin_group(&start, group)?),
        None => None,
    };
    output::audit(session.json, &audit, admin_group_ok)?;
    Ok(!audit.has_errors() && admin_group_ok != Some(false))
}
