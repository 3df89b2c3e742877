// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use ghkeep::{
    config::{create_local, list_projects, ConfigResolver, GlobalIdentity},
    manager::FileManager,
    path::home_dir,
    scaffold::initialize,
    server::GhkeepServer,
};

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use inquire::{Password, PasswordDisplayMode, Text};
use rmcp::{transport::stdio, ServiceExt};
use std::{
    env::current_dir,
    io::stderr,
    path::PathBuf,
    process::exit,
    time::Duration,
};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "\n  ghkeep [options] <ghkeep-command>",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    async fn run(self) -> Result<()> {
        match self.command {
            Command::Init(opts) => run_init(opts),
            Command::InitProject(opts) => run_init_project(opts),
            Command::Config(opts) => run_config(opts),
            Command::Projects(opts) => run_projects(opts),
            Command::Scaffold => run_scaffold().await,
            Command::Serve => run_serve().await,
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Set repository and access token used by every project.
    #[command(override_usage = "ghkeep init [options]")]
    Init(InitOptions),

    /// Mark directory as project with its own namespace.
    #[command(override_usage = "ghkeep init-project [options]")]
    InitProject(InitProjectOptions),

    /// Show resolved configuration.
    #[command(override_usage = "ghkeep config [options]")]
    Config(ConfigOptions),

    /// List projects marked below a directory.
    #[command(override_usage = "ghkeep projects [options]")]
    Projects(ProjectsOptions),

    /// Detect project type and generate documentation structure.
    #[command(override_usage = "ghkeep scaffold")]
    Scaffold,

    /// Serve tools over stdio for MCP clients.
    #[command(override_usage = "ghkeep serve")]
    Serve,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct InitOptions {
    /// GitHub access token.
    #[arg(short, long, value_name = "token")]
    pub token: Option<String>,

    /// User or organization owning the repository.
    #[arg(short, long, value_name = "owner")]
    pub owner: Option<String>,

    /// Name of repository holding project memory.
    #[arg(short, long, value_name = "name")]
    pub repository: Option<String>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct InitProjectOptions {
    /// Namespace inside the repository.
    #[arg(short, long, value_name = "namespace")]
    pub namespace: Option<String>,

    /// Display name of project.
    #[arg(short = 'N', long, value_name = "name")]
    pub name: Option<String>,

    /// Overwrite existing marker.
    #[arg(short, long)]
    pub force: bool,

    /// Directory to mark, defaults to current directory.
    #[arg(short, long, value_name = "path")]
    pub dir: Option<String>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct ConfigOptions {
    /// Directory to resolve from, defaults to current directory.
    #[arg(short, long, value_name = "path")]
    pub dir: Option<String>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct ProjectsOptions {
    /// Directory to scan, defaults to home directory.
    #[arg(short, long, value_name = "path")]
    pub dir: Option<String>,
}

#[tokio::main]
async fn main() {
    // INVARIANT: Stdout belongs to the MCP transport, logs go to stderr.
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .without_time()
        .with_writer(stderr);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run().await {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

async fn run() -> Result<()> {
    Cli::parse().run().await
}

fn expand_dir(dir: Option<String>) -> Result<PathBuf> {
    match dir {
        Some(dir) => {
            let expanded = shellexpand::full(&dir).with_context(|| format!("cannot expand {dir:?}"))?;
            Ok(PathBuf::from(expanded.as_ref()))
        }
        None => Ok(current_dir()?),
    }
}

fn prompt_missing(value: Option<String>, prompt: &str) -> Result<String> {
    match value {
        Some(value) => Ok(value),
        None => Ok(Text::new(prompt).prompt()?),
    }
}

fn run_init(opts: InitOptions) -> Result<()> {
    let token = match opts.token {
        Some(token) => token,
        None => Password::new("GitHub token")
            .without_confirmation()
            .with_display_mode(PasswordDisplayMode::Masked)
            .prompt()?,
    };
    let owner = prompt_missing(opts.owner, "Repository owner")?;
    let repository = prompt_missing(opts.repository, "Repository name")?;

    let identity = GlobalIdentity::new(token, owner, repository);
    if !identity.is_complete() {
        anyhow::bail!("token, owner, and repository must all be non-empty");
    }

    let resolver = ConfigResolver::try_default()?;
    resolver.save_global(&identity)?;
    info!(
        "saved {} to {}",
        identity.slug(),
        resolver.global_file().display()
    );

    Ok(())
}

fn run_init_project(opts: InitProjectOptions) -> Result<()> {
    let dir = expand_dir(opts.dir)?;
    let basename = dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let namespace = match opts.namespace {
        Some(namespace) => namespace,
        None => Text::new("Namespace").with_default(&basename).prompt()?,
    };
    let name = match opts.name {
        Some(name) => name,
        None => Text::new("Project name").with_default(&namespace).prompt()?,
    };

    let project_name = (name != namespace).then_some(name);
    let marker = create_local(&dir, namespace, project_name, opts.force)?;
    info!("created {}", marker.display());

    Ok(())
}

fn run_config(opts: ConfigOptions) -> Result<()> {
    let dir = expand_dir(opts.dir)?;
    let resolver = ConfigResolver::try_default()?;
    let config = resolver.resolve(&dir)?;

    println!("repository: {}", config.identity.slug());
    println!("source:     {}", config.source);
    match &config.local {
        Some(local) => {
            println!("namespace:  {}", local.namespace);
            println!("project:    {}", local.project_name);
            println!("path:       {}", local.project_path.display());
        }
        None => println!("namespace:  <repository root>"),
    }

    Ok(())
}

fn run_projects(opts: ProjectsOptions) -> Result<()> {
    let dir = match opts.dir {
        Some(dir) => expand_dir(Some(dir))?,
        None => home_dir()?,
    };

    let projects = list_projects(&dir)?;
    if projects.is_empty() {
        info!("no projects found under {}", dir.display());
    }

    for project in projects {
        println!(
            "{:<24} {:<24} {}",
            project.name,
            project.namespace,
            project.path.display()
        );
    }

    Ok(())
}

async fn run_scaffold() -> Result<()> {
    let config = ConfigResolver::try_default()?.resolve(current_dir()?)?;
    let manager = FileManager::from_config(&config)?;
    let identity = &config.identity;

    let bar = spinner(&identity.slug())?;
    let outcome = initialize(&manager, &identity.repository, Local::now().date_naive()).await;
    bar.finish_and_clear();

    let detection = &outcome.detection;
    println!("project: {} ({})", detection.info.name, detection.info.project_type);
    for failure in &detection.failures {
        println!("  probe failed: {failure}");
    }
    for confirmation in &outcome.manifest.created {
        println!("  {:<8} {}", confirmation.action, confirmation.path);
    }
    for failure in &outcome.manifest.failures {
        println!("  failed   {}: {}", failure.path, failure.reason);
    }

    Ok(())
}

fn spinner(message: &str) -> Result<ProgressBar> {
    let bar = ProgressBar::new_spinner();
    bar.set_style(ProgressStyle::with_template("{spinner:.green} {elapsed_precise}  {msg}")?);
    bar.set_message(format!("scaffolding {message}"));
    bar.enable_steady_tick(Duration::from_millis(100));

    Ok(bar)
}

async fn run_serve() -> Result<()> {
    let config = ConfigResolver::try_default()?.resolve(current_dir()?)?;
    let manager = FileManager::from_config(&config)?;
    info!(
        "serving {} in namespace {:?}",
        config.identity.slug(),
        config.namespace()
    );

    let server = GhkeepServer::new(config.identity, manager)
        .serve(stdio())
        .await?;
    server.waiting().await?;
    info!("server stopped");

    Ok(())
}
