//! Result printing: plain lines for humans, one JSON document for scripts.

use acladm_core::audit::DirectoryAudit;
use acladm_core::{Mapping, SweepReport};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    command: &'a str,
    finished_at: String,
    #[serde(flatten)]
    body: T,
}

pub fn json<T: Serialize>(command: &str, body: T) -> anyhow::Result<()> {
    let envelope = Envelope {
        command,
        finished_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        body,
    };
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}

#[derive(Serialize)]
pub struct Message<'a> {
    pub ok: bool,
    pub message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mapping: Option<&'a Mapping>,
}

pub fn message(as_json: bool, command: &str, body: Message<'_>) -> anyhow::Result<()> {
    if as_json {
        return json(command, body);
    }
    if body.ok {
        println!("{}", body.message);
        if let Some(mapping) = body.mapping {
            println!("{}", mapping_line(mapping));
        }
    } else {
        eprintln!("{}", body.message);
    }
    Ok(())
}

pub fn sweep_report(as_json: bool, command: &str, report: &SweepReport) -> anyhow::Result<()> {
    if as_json {
        return json(command, report);
    }
    for path in &report.updated {
        println!("updated {}", path.display());
    }
    for failure in &report.failed {
        eprintln!("failed  {}: {}", failure.path.display(), failure.error);
    }
    println!("{} updated, {} failed", report.updated.len(), report.failed.len());
    Ok(())
}

pub fn mapping_line(mapping: &Mapping) -> String {
    format!(
        "{}\t{}\t{}\t{}",
        mapping.id,
        mapping.user,
        mapping.app.display(),
        mapping.dataset.display()
    )
}

#[derive(Serialize)]
struct MappingList<'a> {
    mappings: &'a [Mapping],
}

pub fn mappings(as_json: bool, list: &[Mapping]) -> anyhow::Result<()> {
    if as_json {
        return json("list-mappings", MappingList { mappings: list });
    }
    for mapping in list {
        println!("{}", mapping_line(mapping));
    }
    Ok(())
}

#[derive(Serialize)]
struct AuditBody<'a> {
    #[serde(flatten)]
    audit: &'a DirectoryAudit,
    remediation: Option<String>,
    admin_group_ok: Option<bool>,
}

pub fn audit(as_json: bool, audit: &DirectoryAudit, admin_group_ok: Option<bool>) -> anyhow::Result<()> {
    if as_json {
        return json(
            "audit-dirs",
            AuditBody {
                audit,
                remediation: audit.remediation_command(),
                admin_group_ok,
            },
        );
    }
    for finding in &audit.offending {
        println!(
            "{} owned by {} has mode {:04o}",
            finding.path.display(),
            finding.owner,
            finding.mode
        );
    }
    if let Some(command) = audit.remediation_command() {
        println!("fix with: {command}");
    }
    if admin_group_ok == Some(false) {
        println!("group owner is not the configured admin group");
    }
    Ok(())
}
