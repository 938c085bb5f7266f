use acladm_core::config::LogSettings;
use acladm_core::{AclAccessor, Config, DryRun, PathClass, TemplateGenerator};
use acladm_hal::Nfs4FaclTool;
use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;

mod commands;
mod output;

/// NFSv4 ACL administration for shared dataset and app trees.
#[derive(Parser, Debug)]
#[command(author, version, about = "NFSv4 ACL administration for shared datasets and apps", long_about = None)]
struct Cli {
    /// TOML configuration file; environment variables override it
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print results as JSON on stdout
    #[arg(long, global = true)]
    json: bool,

    /// Compute and report ACL changes without writing any
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rewrite drifted ACLs under the dataset root
    FixDatasets,
    /// Rewrite drifted ACLs on installed app directories
    FixApps,
    /// Create a mapping and grant the user rx on its app and dataset
    AddMapping {
        #[arg(long)]
        user: String,
        #[arg(long)]
        app: PathBuf,
        #[arg(long)]
        dataset: PathBuf,
        /// Opaque JSON object stored with the mapping
        #[arg(long, value_name = "JSON")]
        extensions: Option<String>,
    },
    /// Revoke a mapping's grants and delete it
    RemoveMapping {
        #[arg(long)]
        id: u64,
    },
    /// List stored mappings
    ListMappings {
        #[arg(long)]
        user: Option<String>,
        #[arg(long)]
        app: Option<PathBuf>,
        #[arg(long)]
        dataset: Option<PathBuf>,
    },
    /// Check that a mapping's paths still exist and still grant the user rx
    CheckMapping {
        #[arg(long)]
        id: u64,
    },
    /// Report ancestor directories that are not mode 0775
    AuditDirs {
        /// Directory to start from (defaults to the mapping database's directory)
        path: Option<PathBuf>,
        /// Stop ascending once this directory has been checked
        #[arg(long, value_name = "DIR")]
        stop_at: Option<PathBuf>,
    },
    /// Print the desired ACL for a policy class
    Template {
        #[arg(value_enum)]
        class: ClassArg,
        /// Authorized user (repeatable)
        #[arg(long = "user", value_name = "USER")]
        users: Vec<String>,
        /// Principal domain; taken from the configuration when omitted
        #[arg(long)]
        domain: Option<String>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ClassArg {
    File,
    Directory,
    Restricted,
}

impl From<ClassArg> for PathClass {
    fn from(arg: ClassArg) -> Self {
        match arg {
            ClassArg::File => PathClass::File,
            ClassArg::Directory => PathClass::Directory,
            ClassArg::Restricted => PathClass::Restricted,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            eprintln!("acladm: {err:#}");
            ExitCode::from(2)
        }
    }
}

/// Ok(false) means the command ran but something it reports on failed.
fn run(cli: Cli) -> anyhow::Result<bool> {
    // `template --domain` works without any configuration
    if let Command::Template {
        class,
        users,
        domain: Some(domain),
    } = &cli.command
    {
        let _guard = acladm_core::logging::init(&LogSettings::default())?;
        let templates = TemplateGenerator::new(domain.as_str());
        print!("{}", templates.render((*class).into(), users.as_slice()));
        return Ok(true);
    }

    let config = Config::load(cli.config.as_deref()).context("loading configuration")?;
    let _guard = acladm_core::logging::init(&config.logging)?;
    tracing::debug!(?config, "configuration loaded");

    let tool = Nfs4FaclTool::new(config.tools.getfacl.as_str(), config.tools.setfacl.as_str());
    let needs_tools = !matches!(cli.command, Command::ListMappings { .. } | Command::AuditDirs { .. } | Command::Template { .. });
    if needs_tools && !tool.is_available() {
        bail!(
            "ACL tools not found on PATH ({} / {})",
            config.tools.getfacl,
            config.tools.setfacl
        );
    }
    let accessor: Box<dyn AclAccessor> = if cli.dry_run {
        Box::new(DryRun::new(tool))
    } else {
        Box::new(tool)
    };

    let session = commands::Session {
        config: &config,
        accessor: accessor.as_ref(),
        json: cli.json,
    };

    match cli.command {
        Command::FixDatasets => commands::fix_datasets(&session),
        Command::FixApps => commands::fix_apps(&session),
        Command::AddMapping {
            user,
            app,
            dataset,
            extensions,
        } => commands::add_mapping(&session, user, app, dataset, extensions.as_deref()),
        Command::RemoveMapping { id } => commands::remove_mapping(&session, id),
        Command::ListMappings { user, app, dataset } => {
            commands::list_mappings(&session, user.as_deref(), app.as_deref(), dataset.as_deref())
        }
        Command::CheckMapping { id } => commands::check_mapping(&session, id),
        Command::AuditDirs { path, stop_at } => commands::audit_dirs(&session, path, stop_at),
        Command::Template { class, users, .. } => {
            let templates = TemplateGenerator::new(config.facl_user_domain.as_str());
            print!("{}", templates.render(class.into(), users.as_slice()));
            Ok(true)
        }
    }
}
