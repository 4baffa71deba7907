//! menuguard command line.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use menuguard::deploy::{DeployReport, DeploymentPipeline, TargetOutcome};
use menuguard::menu::{MenuDefinition, RemovedLink, artifact};
use menuguard::platform::PlatformClient;
use menuguard::visibility::{self, VisibilityRules};
use menuguard::{Project, Settings, sync};

#[derive(Parser)]
#[command(
    name = "menuguard",
    version,
    about = "Keep an Experience Builder menu in sync with visible pages"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Project directory holding the menu artifact and its git checkout.
    #[arg(long, global = true, env = "MENUGUARD_PROJECT_DIR", default_value = ".")]
    project_dir: PathBuf,

    /// Menu artifact path, relative to the project directory.
    #[arg(long, global = true)]
    menu: Option<PathBuf>,

    /// Directory for artifact backups (default: next to the artifact).
    #[arg(long, global = true)]
    backup_dir: Option<PathBuf>,

    /// Credential store (default: ~/.config/arcgis/.env).
    #[arg(long, global = true, env = "MENUGUARD_CONFIG")]
    config: Option<PathBuf>,

    /// Visibility rules TOML file (default: built-in rules).
    #[arg(long, global = true)]
    rules: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Classify the configured application's pages.
    Pages,
    /// Report menu links that point at hidden pages, without changing anything.
    Audit,
    /// Remove links to hidden pages from the menu artifact.
    Reconcile,
    /// Build the menu artifact from a definition file.
    Generate {
        /// Menu definition JSON file.
        #[arg(long)]
        definition: PathBuf,

        /// Keep links to hidden pages.
        #[arg(long)]
        skip_visibility: bool,
    },
    /// Print a starter menu definition.
    Template,
    /// Check the structure of the menu artifact.
    Validate,
    /// Back up, validate, and publish the menu artifact.
    Deploy {
        /// Commit message (default: timestamped update message).
        message: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_tracing();

    let cli = Cli::parse();
    let mut project = Project::new(&cli.project_dir);
    if let Some(menu) = &cli.menu {
        project = project.with_menu_path(menu);
    }
    if let Some(dir) = &cli.backup_dir {
        project = project.with_backup_dir(dir);
    }

    match cli.command {
        Command::Template => {
            let json = serde_json::to_string_pretty(&MenuDefinition::template())?;
            println!("{json}");
            Ok(ExitCode::SUCCESS)
        }
        Command::Validate => cmd_validate(&project).await,
        Command::Pages => {
            let (settings, rules) = load_context(cli.config.as_deref(), cli.rules.as_deref())?;
            cmd_pages(&settings, &rules).await
        }
        Command::Audit => {
            let (settings, rules) = load_context(cli.config.as_deref(), cli.rules.as_deref())?;
            cmd_audit(&project, &settings, &rules).await
        }
        Command::Reconcile => {
            let (settings, rules) = load_context(cli.config.as_deref(), cli.rules.as_deref())?;
            let client = PlatformClient::from_settings(&settings);
            let update = sync::reconcile_artifact(&project, &client, &settings, &rules)
                .await
                .context("failed to reconcile menu")?;
            if let Some(backup) = &update.backup {
                println!("Backup: {}", backup.display());
            }
            print_removed(&update.reconciliation.removed);
            println!(
                "Saved {} ({} categories, {} links).",
                project.menu_path().display(),
                update.reconciliation.tree.len(),
                update.reconciliation.tree.link_count()
            );
            Ok(ExitCode::SUCCESS)
        }
        Command::Generate {
            definition,
            skip_visibility,
        } => {
            let (settings, rules) = load_context(cli.config.as_deref(), cli.rules.as_deref())?;
            let definition = MenuDefinition::load(&definition)?;
            let client = PlatformClient::from_settings(&settings);
            let update = sync::generate(
                &project,
                &definition,
                &client,
                &settings,
                &rules,
                skip_visibility,
            )
            .await
            .context("failed to generate menu")?;
            print_removed(&update.reconciliation.removed);
            println!(
                "Generated {} ({} categories, {} links).",
                project.menu_path().display(),
                update.reconciliation.tree.len(),
                update.reconciliation.tree.link_count()
            );
            Ok(ExitCode::SUCCESS)
        }
        Command::Deploy { message } => {
            let settings = load_settings(cli.config.as_deref())?;
            let pipeline = DeploymentPipeline::from_settings(&project, &settings)?;
            let message = (!message.is_empty()).then(|| message.join(" "));
            let report = pipeline.run(message.as_deref()).await;
            print_deploy_report(&report, settings.menu_site_url.as_deref());
            Ok(if report.succeeded() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => Settings::default_store_path()
            .context("cannot locate home directory for the default credential store")?,
    };
    Settings::load(&path).context("failed to load configuration")
}

fn load_context(
    config: Option<&Path>,
    rules: Option<&Path>,
) -> Result<(Settings, VisibilityRules)> {
    let settings = load_settings(config)?;
    let rules = match rules {
        Some(path) => VisibilityRules::load(path)?,
        None => VisibilityRules::default(),
    };
    Ok((settings, rules))
}

async fn cmd_validate(project: &Project) -> Result<ExitCode> {
    match artifact::load(project.menu_path()).await {
        Ok(tree) => {
            println!(
                "{}: valid ({} categories, {} links).",
                project.menu_path().display(),
                tree.len(),
                tree.link_count()
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            println!("{}: {e}", project.menu_path().display());
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn cmd_pages(settings: &Settings, rules: &VisibilityRules) -> Result<ExitCode> {
    let credentials = settings.credentials()?;
    let client = PlatformClient::from_settings(settings);
    let classification = visibility::classify(&client, &credentials, rules).await?;

    println!(
        "{} pages: {} visible, {} hidden.",
        classification.total(),
        classification.visible.len(),
        classification.hidden.len()
    );
    let hidden = classification.hidden_report();
    if !hidden.is_empty() {
        println!();
        println!("{:<14} {:<40} {}", "PAGE", "LABEL", "REASON");
        println!("{}", "-".repeat(80));
        for (key, label, reason) in hidden {
            println!("{key:<14} {label:<40} {reason}");
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn cmd_audit(
    project: &Project,
    settings: &Settings,
    rules: &VisibilityRules,
) -> Result<ExitCode> {
    let tree = artifact::load(project.menu_path()).await?;
    let client = PlatformClient::from_settings(settings);
    let Some(classification) = sync::visible_pages(&client, settings, rules).await? else {
        println!("No application configured; nothing to audit.");
        return Ok(ExitCode::SUCCESS);
    };

    let removed = sync::audit(&tree, &classification);
    if removed.is_empty() {
        println!("All menu links point at visible pages.");
        return Ok(ExitCode::SUCCESS);
    }
    print_removed(&removed);
    Ok(ExitCode::FAILURE)
}

fn print_removed(removed: &[RemovedLink]) {
    if removed.is_empty() {
        return;
    }
    println!("{:<30} {:<30} {}", "CATEGORY", "LINK", "PAGE");
    println!("{}", "-".repeat(76));
    for link in removed {
        println!("{:<30} {:<30} {}", link.category, link.label, link.page_key);
    }
}

fn print_deploy_report(report: &DeployReport, site_url: Option<&str>) {
    if let Some(backup) = &report.backup {
        println!("Backup: {}", backup.display());
    }
    if let Some(violation) = &report.validation {
        println!("Validation failed: {violation}");
        println!("Deployment aborted.");
        return;
    }

    println!("VCS:  {}", describe(&report.vcs));
    println!("HTTP: {}", describe(&report.http));

    if report.succeeded() {
        println!("Deployment completed.");
        if let Some(url) = site_url {
            println!("Menu URL: {url}");
        }
    } else {
        println!("Deployment completed with issues.");
    }
}

fn describe(outcome: &TargetOutcome) -> String {
    match outcome {
        TargetOutcome::Published { detail: Some(d) } => format!("published ({d})"),
        TargetOutcome::Published { detail: None } => "published".to_string(),
        TargetOutcome::Unchanged => "no changes".to_string(),
        TargetOutcome::Skipped => "skipped".to_string(),
        TargetOutcome::Failed(e) => format!("FAILED at '{}': {}", e.step, e.details),
    }
}
