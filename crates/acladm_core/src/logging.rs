//! Tracing subscriber setup.

use crate::config::{LogFormat, LogSettings};
use crate::error::{AclError, AclResult};
use once_cell::sync::OnceCell;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, writer::BoxMakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

static INITIALIZED: OnceCell<()> = OnceCell::new();

/// Install the global subscriber once. `ACLADM_LOG`, then `RUST_LOG`,
/// override the configured level.
///
/// When a log file is configured the returned guard must be held until
/// exit, otherwise buffered lines are lost.
pub fn init(settings: &LogSettings) -> AclResult<Option<WorkerGuard>> {
    let mut guard = None;
    INITIALIZED.get_or_try_init(|| -> AclResult<()> {
        let filter = EnvFilter::try_from_env("ACLADM_LOG")
            .or_else(|_| EnvFilter::try_from_default_env())
            .or_else(|_| EnvFilter::try_new(&settings.level))
            .map_err(|e| AclError::Config(format!("invalid log level '{}': {e}", settings.level)))?;

        let (writer, ansi) = match &settings.file {
            Some(path) => {
                let (writer, file_guard) = file_writer(path)?;
                guard = Some(file_guard);
                (writer, false)
            }
            None => (BoxMakeWriter::new(std::io::stderr), true),
        };

        let registry = tracing_subscriber::registry().with(filter);
        let result = match settings.format {
            LogFormat::Json => registry.with(fmt::layer().json().with_writer(writer)).try_init(),
            LogFormat::Pretty => registry
                .with(fmt::layer().pretty().with_ansi(ansi).with_writer(writer))
                .try_init(),
            LogFormat::Compact => registry
                .with(fmt::layer().compact().with_ansi(ansi).with_writer(writer))
                .try_init(),
        };
        result.map_err(|e| AclError::Config(format!("failed to install log subscriber: {e}")))
    })?;
    Ok(guard)
}

fn file_writer(path: &Path) -> AclResult<(BoxMakeWriter, WorkerGuard)> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|e| AclError::io(dir, e))?;
    let file_name = path
        .file_name()
        .ok_or_else(|| AclError::Config(format!("log file {} has no file name", path.display())))?;
    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    Ok((BoxMakeWriter::new(writer), guard))
}
