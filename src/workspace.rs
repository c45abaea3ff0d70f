//! Workspace and project discovery.
//!
//! This module locates the `scriptdeck.toml` workspace manifest, loads it,
//! and reads each member project's `project.toml` to learn the scripts that
//! can be run there. Discovery happens once per process start; the resulting
//! records are immutable for the lifetime of the run loop.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

/// File name of the workspace manifest, searched upward from the start directory.
pub const WORKSPACE_MANIFEST: &str = "scriptdeck.toml";

/// File name of the per-project manifest inside each project folder.
pub const PROJECT_MANIFEST: &str = "project.toml";

const DEFAULT_TOOL: &str = "rush";
const DEFAULT_RUNNER: &str = "npm";

/// Top-level structure of `scriptdeck.toml`.
#[derive(Debug, Clone, Deserialize)]
struct WorkspaceManifest {
    /// Workspace-management executable (install/update/build steps).
    tool: Option<String>,
    /// Default per-project script runner.
    runner: Option<String>,
    /// Member projects.
    #[serde(rename = "project", default)]
    projects: Vec<ProjectRef>,
}

/// A single `[[project]]` entry in the workspace manifest.
#[derive(Debug, Clone, Deserialize)]
struct ProjectRef {
    /// Project folder, relative to the workspace root.
    folder: String,
}

/// Structure of a project's `project.toml`.
#[derive(Debug, Clone, Deserialize)]
struct ProjectManifest {
    /// Unique package name.
    name: String,
    /// Script runner override for this project.
    runner: Option<String>,
    /// Script names runnable in this project.
    #[serde(default)]
    scripts: Vec<String>,
}

/// A buildable unit of the workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    /// Unique, stable package name.
    pub package_name: String,
    /// Folder relative to the workspace root.
    pub folder: String,
    /// Script names runnable in this project, in manifest order.
    pub scripts: Vec<String>,
    /// Script runner override; falls back to the workspace runner.
    pub runner: Option<String>,
}

/// The discovered workspace: root, executables, and member projects.
#[derive(Debug, Clone)]
pub struct Workspace {
    /// Absolute workspace root (the directory holding the manifest).
    pub root: PathBuf,
    /// Workspace-management executable.
    pub tool: String,
    /// Default per-project script runner.
    pub runner: String,
    /// Member projects, in manifest order.
    pub projects: Vec<Project>,
}

impl Workspace {
    /// Discovers the workspace by walking up from `start` until a
    /// `scriptdeck.toml` is found.
    pub fn discover(start: &Path) -> Result<Workspace> {
        let manifest = find_manifest(start).with_context(|| {
            format!(
                "no {} found in {} or any parent directory",
                WORKSPACE_MANIFEST,
                start.display()
            )
        })?;
        Self::load(&manifest)
    }

    /// Loads the workspace from an explicit manifest path.
    pub fn load(manifest: &Path) -> Result<Workspace> {
        let raw = std::fs::read_to_string(manifest)
            .with_context(|| format!("failed to read workspace manifest {}", manifest.display()))?;
        let parsed: WorkspaceManifest = toml::from_str(&raw)
            .with_context(|| format!("failed to parse workspace manifest {}", manifest.display()))?;
        let root = manifest
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let mut projects = Vec::with_capacity(parsed.projects.len());
        for reference in &parsed.projects {
            projects.push(load_project(&root, &reference.folder)?);
        }
        ensure_unique_names(&projects)?;

        Ok(Workspace {
            root,
            tool: parsed.tool.unwrap_or_else(|| DEFAULT_TOOL.to_string()),
            runner: parsed.runner.unwrap_or_else(|| DEFAULT_RUNNER.to_string()),
            projects,
        })
    }

    /// Looks up a project by exact package name.
    pub fn project(&self, package_name: &str) -> Option<&Project> {
        self.projects
            .iter()
            .find(|project| project.package_name == package_name)
    }
}

fn find_manifest(start: &Path) -> Option<PathBuf> {
    let mut dir = Some(start);
    while let Some(current) = dir {
        let candidate = current.join(WORKSPACE_MANIFEST);
        if candidate.is_file() {
            return Some(candidate);
        }
        dir = current.parent();
    }
    None
}

fn load_project(root: &Path, folder: &str) -> Result<Project> {
    let manifest = root.join(folder).join(PROJECT_MANIFEST);
    let raw = std::fs::read_to_string(&manifest)
        .with_context(|| format!("failed to read project manifest {}", manifest.display()))?;
    let parsed: ProjectManifest = toml::from_str(&raw)
        .with_context(|| format!("failed to parse project manifest {}", manifest.display()))?;
    Ok(Project {
        package_name: parsed.name,
        folder: folder.to_string(),
        scripts: parsed.scripts,
        runner: parsed.runner,
    })
}

fn ensure_unique_names(projects: &[Project]) -> Result<()> {
    let mut seen = HashSet::new();
    for project in projects {
        if !seen.insert(project.package_name.clone()) {
            bail!("duplicate package name: {}", project.package_name);
        }
    }
    Ok(())
}
