//! NFSv4 ACL tool adapter.
//!
//! Runs the `nfs4-acl-tools` binaries synchronously, one attempt per call.
//! ACLs cross this boundary as text; parsing lives in the core crate.

use crate::command::Command;
use crate::error::{HalError, HalResult};
use std::path::Path;
use tracing::debug;

pub const DEFAULT_GETFACL: &str = "nfs4_getfacl";
pub const DEFAULT_SETFACL: &str = "nfs4_setfacl";

/// Invokes `nfs4_getfacl` / `nfs4_setfacl`.
#[derive(Debug, Clone)]
pub struct Nfs4FaclTool {
    getfacl: String,
    setfacl: String,
}

impl Default for Nfs4FaclTool {
    fn default() -> Self {
        Self::new(DEFAULT_GETFACL, DEFAULT_SETFACL)
    }
}

impl Nfs4FaclTool {
    pub fn new(getfacl: impl Into<String>, setfacl: impl Into<String>) -> Self {
        Self {
            getfacl: getfacl.into(),
            setfacl: setfacl.into(),
        }
    }

    /// Whether both tools resolve on PATH (or as given paths).
    pub fn is_available(&self) -> bool {
        crate::command::command_exists(&self.getfacl) && crate::command::command_exists(&self.setfacl)
    }

    /// Read the full ACL text of `path`.
    pub fn get(&self, path: &Path) -> HalResult<String> {
        ensure_exists(path)?;
        debug!(path = %path.display(), tool = %self.getfacl, "reading acl");
        let result = Command::new(&self.getfacl).arg(path).output()?.into_checked(&self.getfacl)?;
        Ok(result.stdout_string())
    }

    /// Replace the full ACL of `path` with `acl` (fed on stdin via `-S -`).
    pub fn set(&self, path: &Path, acl: &str) -> HalResult<()> {
        ensure_exists(path)?;
        debug!(path = %path.display(), tool = %self.setfacl, "replacing acl");
        Command::new(&self.setfacl)
            .args(["-S", "-"])
            .arg(path)
            .output_with_input(acl.as_bytes())?
            .into_checked(&self.setfacl)?;
        Ok(())
    }

    /// Append one entry without touching the rest of the ACL.
    pub fn add_entry(&self, path: &Path, entry: &str) -> HalResult<()> {
        ensure_exists(path)?;
        debug!(path = %path.display(), entry, "adding acl entry");
        Command::new(&self.setfacl)
            .arg("-a")
            .arg(entry)
            .arg(path)
            .output()?
            .into_checked(&self.setfacl)?;
        Ok(())
    }

    /// Remove exactly one entry, leaving the others in place.
    pub fn remove_entry(&self, path: &Path, entry: &str) -> HalResult<()> {
        ensure_exists(path)?;
        debug!(path = %path.display(), entry, "removing acl entry");
        Command::new(&self.setfacl)
            .arg("-x")
            .arg(entry)
            .arg(path)
            .output()?
            .into_checked(&self.setfacl)?;
        Ok(())
    }
}

fn ensure_exists(path: &Path) -> HalResult<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(HalError::invalid_path(path))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    fn script(dir: &Path, name: &str, body: &str) -> String {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path.display().to_string()
    }

    #[test]
    fn missing_path_is_rejected_before_spawning() {
        let tool = Nfs4FaclTool::new("/nonexistent/getfacl", "/nonexistent/setfacl");
        let err = tool.get(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, HalError::InvalidPath(_)));
    }

    #[test]
    fn get_returns_tool_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let getfacl = script(dir.path(), "getfacl", "echo 'A::OWNER@:rwatTnNcCoy'");
        let tool = Nfs4FaclTool::new(getfacl, "/bin/true");
        let acl = tool.get(dir.path()).unwrap();
        assert_eq!(acl, "A::OWNER@:rwatTnNcCoy\n");
    }

    #[test]
    fn set_passes_acl_on_stdin_and_path_last() {
        let dir = tempfile::tempdir().unwrap();
        let capture = dir.path().join("captured");
        let setfacl = script(
            dir.path(),
            "setfacl",
            &format!("cat > '{}'; echo \"$1 $2 $3\" >> '{}'", capture.display(), capture.display()),
        );
        let tool = Nfs4FaclTool::new("/bin/true", setfacl);
        tool.set(dir.path(), "A::EVERYONE@:tncy\n").unwrap();
        let captured = fs::read_to_string(&capture).unwrap();
        assert_eq!(
            captured,
            format!("A::EVERYONE@:tncy\n-S - {}\n", dir.path().display())
        );
    }

    #[test]
    fn remove_entry_passes_entry_then_path() {
        let dir = tempfile::tempdir().unwrap();
        let capture = dir.path().join("captured");
        let setfacl = script(dir.path(), "setfacl", &format!("echo \"$1 $2 $3\" > '{}'", capture.display()));
        let tool = Nfs4FaclTool::new("/bin/true", setfacl);
        tool.remove_entry(dir.path(), "A::amy@example.org:rx").unwrap();
        let captured = fs::read_to_string(&capture).unwrap();
        assert_eq!(captured, format!("-x A::amy@example.org:rx {}\n", dir.path().display()));
    }

    #[test]
    fn failing_tool_reports_diagnostic() {
        let dir = tempfile::tempdir().unwrap();
        let setfacl = script(dir.path(), "setfacl", "echo 'Operation not permitted' >&2; exit 1");
        let tool = Nfs4FaclTool::new("/bin/true", setfacl);
        let err = tool.add_entry(dir.path(), "A::amy@example.org:rx").unwrap_err();
        assert!(err.to_string().contains("Operation not permitted"));
    }
}
