//! Scriptdeck: an interactive script launcher for multi-project workspaces.
//!
//! This is the entry point of the application. It parses command-line
//! arguments, discovers the workspace, and drives the run loop: pick scripts,
//! run workspace pre-scripts sequentially, run the optional workspace build,
//! then run the chosen project scripts concurrently, and start over.

mod build;
mod picker;
mod plan;
mod runner;
mod store;
mod supervise;
mod workspace;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::builder::styling::{AnsiColor, Effects, Style};
use clap::builder::Styles;
use clap::{CommandFactory, Parser, Subcommand};

use crate::build::BuildInvocation;
use crate::plan::{MainEntry, Plan, Selection, BUILD_GROUP};
use crate::runner::RunEntry;
use crate::store::SelectionStore;
use crate::workspace::Workspace;

/// Command-line interface definition.
#[derive(Debug, Parser)]
#[command(
    name = "scriptdeck",
    version,
    about = "Interactive script launcher for multi-project workspaces",
    styles = help_styles(),
    color = clap::ColorChoice::Always,
    disable_help_subcommand = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
    /// Only offer these script names as project choices (repeatable).
    #[arg(long, value_name = "NAME")]
    include: Vec<String>,
    /// Never offer these script names as project choices (repeatable).
    #[arg(long, value_name = "NAME")]
    exclude: Vec<String>,
    /// Start directory for workspace discovery.
    #[arg(long)]
    root: Option<PathBuf>,
    /// Path to the workspace manifest (skips upward discovery).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Path to the persisted-selection file.
    #[arg(long)]
    store: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show help information.
    Help,
    /// Show version information.
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    if let Some(command) = &cli.command {
        match command {
            Commands::Help => {
                Cli::command().print_help()?;
                println!();
                return Ok(());
            }
            Commands::Version => {
                println!("scriptdeck {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
        }
    }

    let workspace = load_workspace(&cli)?;
    let store = match &cli.store {
        Some(path) => SelectionStore::at(path.clone()),
        None => SelectionStore::default_location(),
    };
    run_loop(&cli, &workspace, &store).await
}

fn load_workspace(cli: &Cli) -> Result<Workspace> {
    if let Some(config) = &cli.config {
        return Workspace::load(config);
    }
    let start = match &cli.root {
        Some(root) => root.clone(),
        None => std::env::current_dir().context("failed to resolve current directory")?,
    };
    Workspace::discover(&start)
}

/// Outcome of one select-and-run cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CycleOutcome {
    /// Go back to selection.
    Continue,
    /// The operator is done; end the loop cleanly.
    Aborted,
}

/// Repeats cycles until the operator aborts selection. A failed workspace
/// step inside a cycle is fatal and propagates out as an error instead.
async fn run_loop(cli: &Cli, workspace: &Workspace, store: &SelectionStore) -> Result<()> {
    loop {
        if run_cycle(cli, workspace, store).await? == CycleOutcome::Aborted {
            return Ok(());
        }
    }
}

async fn run_cycle(
    cli: &Cli,
    workspace: &Workspace,
    store: &SelectionStore,
) -> Result<CycleOutcome> {
    // SELECTING: the picker owns the terminal until the operator confirms
    // or aborts.
    let saved = store.load(&workspace.root);
    let rows = picker::build_rows(workspace, &saved, &cli.include, &cli.exclude);
    let picked = tokio::task::spawn_blocking(move || picker::run(rows))
        .await
        .context("picker task failed")??;
    let Some(selections) = picked else {
        return Ok(CycleOutcome::Aborted);
    };
    let Some(plan) = plan::build_plan(selections, &workspace.projects, store, &workspace.root)
    else {
        return Ok(CycleOutcome::Aborted);
    };

    let mut failed = false;

    // RUNNING_PRE: workspace operations must not overlap, so each one is
    // spawned and fully awaited before the next. A failure does not stop
    // the remaining pre-scripts; it only gates the later phases.
    if !plan.pre.is_empty() {
        println!("Starting pre-scripts");
    }
    for selection in &plan.pre {
        let entry = pre_entry(selection, workspace);
        let handles = runner::spawn_all(std::slice::from_ref(&entry), &workspace.root);
        failed |= supervise::await_all(handles).await.error;
    }

    // RUNNING_BUILD: skipped after a pre failure; a null invocation (no
    // build chosen, or nothing to target) is a silent no-op.
    if !failed {
        let packages = plan.main_packages();
        if let Some(invocation) = build::select_build_invocation(plan.build.as_ref(), &packages) {
            println!("{}", invocation.label);
            let entry = build_entry(&invocation, workspace);
            let handles = runner::spawn_all(std::slice::from_ref(&entry), &workspace.root);
            failed |= supervise::await_all(handles).await.error;
        }
    }

    // RUNNING_MAIN: never runs against a workspace left inconsistent by a
    // failed pre or build step; that case ends the whole run loop.
    if failed {
        bail!("a workspace step failed; project scripts were not run");
    }
    if !plan.main.is_empty() {
        println!("Starting main scripts");
        let entries = main_entries(&plan, workspace);
        let handles = runner::spawn_all(&entries, &workspace.root);
        let outcome = supervise::await_all(handles).await;
        if outcome.error {
            println!("Some scripts failed");
        } else {
            println!("All scripts finished successfully");
        }
    }

    Ok(CycleOutcome::Continue)
}

/// Resolves a pre-script selection to a run entry: the workspace tool
/// invoked with the operation name, at the workspace root.
fn pre_entry(selection: &Selection, workspace: &Workspace) -> RunEntry {
    RunEntry {
        package_name: selection.package_name.clone(),
        script: selection.script.clone(),
        executable: selection
            .script_executable
            .clone()
            .unwrap_or_else(|| workspace.tool.clone()),
        args: command_args(selection.script_command.as_deref(), &selection.script),
        folder: None,
    }
}

/// Resolves the build invocation to a run entry at the workspace root.
fn build_entry(invocation: &BuildInvocation, workspace: &Workspace) -> RunEntry {
    RunEntry {
        package_name: BUILD_GROUP.to_string(),
        script: invocation.script.clone(),
        executable: workspace.tool.clone(),
        args: invocation.args.clone(),
        folder: None,
    }
}

fn main_entries(plan: &Plan, workspace: &Workspace) -> Vec<RunEntry> {
    plan.main
        .iter()
        .map(|entry| main_entry(entry, workspace))
        .collect()
}

/// Resolves a main selection to a run entry: the project's runner invoked
/// as `<runner> run <script>` in the project folder, with per-selection
/// overrides applied.
fn main_entry(entry: &MainEntry, workspace: &Workspace) -> RunEntry {
    let selection = &entry.selection;
    let project = &entry.project;
    let executable = selection
        .script_executable
        .clone()
        .or_else(|| project.runner.clone())
        .unwrap_or_else(|| workspace.runner.clone());
    let command = selection.script_command.as_deref().unwrap_or("run");
    RunEntry {
        package_name: project.package_name.clone(),
        script: selection.script.clone(),
        executable,
        args: command_args(Some(command), &selection.script),
        folder: Some(project.folder.clone()),
    }
}

fn command_args(command: Option<&str>, script: &str) -> Vec<String> {
    match command {
        Some(command) if !command.is_empty() => {
            vec![command.to_string(), script.to_string()]
        }
        _ => vec![script.to_string()],
    }
}

fn help_styles() -> Styles {
    Styles::styled()
        .header(
            Style::new()
                .fg_color(Some(AnsiColor::Cyan.into()))
                .effects(Effects::BOLD),
        )
        .usage(
            Style::new()
                .fg_color(Some(AnsiColor::Green.into()))
                .effects(Effects::BOLD),
        )
        .literal(Style::new().fg_color(Some(AnsiColor::Yellow.into())))
        .placeholder(Style::new().fg_color(Some(AnsiColor::Magenta.into())))
        .valid(Style::new().fg_color(Some(AnsiColor::Green.into())))
        .invalid(
            Style::new()
                .fg_color(Some(AnsiColor::Red.into()))
                .effects(Effects::BOLD),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::PRE_GROUP;
    use crate::workspace::Project;

    fn test_workspace() -> Workspace {
        Workspace {
            root: PathBuf::from("/ws"),
            tool: "rush".to_string(),
            runner: "npm".to_string(),
            projects: vec![Project {
                package_name: "web".to_string(),
                folder: "apps/web".to_string(),
                scripts: vec!["build".to_string()],
                runner: None,
            }],
        }
    }

    #[test]
    fn pre_entries_invoke_the_workspace_tool() {
        let workspace = test_workspace();
        let entry = pre_entry(&Selection::new(PRE_GROUP, "install"), &workspace);
        assert_eq!(entry.executable, "rush");
        assert_eq!(entry.args, vec!["install"]);
        assert_eq!(entry.folder, None);
    }

    #[test]
    fn build_entries_carry_the_invocation_args() {
        let workspace = test_workspace();
        let invocation = BuildInvocation {
            script: "smart".to_string(),
            args: vec!["build".to_string(), "--to".to_string(), "web".to_string()],
            label: String::new(),
        };
        let entry = build_entry(&invocation, &workspace);
        assert_eq!(entry.package_name, BUILD_GROUP);
        assert_eq!(entry.executable, "rush");
        assert_eq!(entry.args, vec!["build", "--to", "web"]);
        assert_eq!(entry.folder, None);
    }

    #[test]
    fn main_entries_default_to_the_workspace_runner() {
        let workspace = test_workspace();
        let entry = MainEntry {
            selection: Selection::new("web", "build"),
            project: workspace.projects[0].clone(),
        };
        let resolved = main_entry(&entry, &workspace);
        assert_eq!(resolved.executable, "npm");
        assert_eq!(resolved.args, vec!["run", "build"]);
        assert_eq!(resolved.folder.as_deref(), Some("apps/web"));
    }

    #[test]
    fn project_runner_overrides_the_workspace_runner() {
        let workspace = test_workspace();
        let mut project = workspace.projects[0].clone();
        project.runner = Some("pnpm".to_string());
        let entry = MainEntry {
            selection: Selection::new("web", "build"),
            project,
        };
        assert_eq!(main_entry(&entry, &workspace).executable, "pnpm");
    }

    #[test]
    fn selection_overrides_win_over_defaults() {
        let workspace = test_workspace();
        let mut selection = Selection::new("web", "build");
        selection.script_executable = Some("yarn".to_string());
        selection.script_command = Some("exec".to_string());
        let entry = MainEntry {
            selection,
            project: workspace.projects[0].clone(),
        };
        let resolved = main_entry(&entry, &workspace);
        assert_eq!(resolved.executable, "yarn");
        assert_eq!(resolved.args, vec!["exec", "build"]);
    }

    #[test]
    fn empty_command_prefix_invokes_the_script_directly() {
        assert_eq!(command_args(None, "install"), vec!["install"]);
        assert_eq!(command_args(Some(""), "install"), vec!["install"]);
        assert_eq!(command_args(Some("run"), "build"), vec!["run", "build"]);
    }
}
