//! Selection records, execution groups, and plan construction.
//!
//! A cycle's raw picker output is a flat list of `Selection`s. `build_plan`
//! partitions it into the three ordered phases of a run (workspace
//! pre-scripts, an optional workspace-build choice, per-project main
//! scripts), resolving each main selection to its owning project and
//! persisting the main choices for the next invocation.

use std::collections::HashSet;
use std::path::Path;

use crate::store::{SavedSelections, SelectionStore};
use crate::workspace::Project;

/// Sentinel script name meaning "run nothing for this row".
pub const SKIP_SCRIPT: &str = "ignore";

/// Reserved package name routing a selection to the pre-script group.
pub const PRE_GROUP: &str = "workspace";

/// Reserved package name routing a selection to the workspace-build group.
pub const BUILD_GROUP: &str = "workspace-build";

/// A named category of selections sharing one executable and sort position.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionGroup {
    /// Display label for the picker.
    pub label: &'static str,
    /// Reserved package name identifying the group's selections.
    pub package_name: &'static str,
    /// Script names offered by this group.
    pub scripts: &'static [&'static str],
    /// Whether more than one of the group's scripts may be chosen at once.
    pub allow_multiple: bool,
    /// Display/sort position relative to other groups.
    pub sort_key: u8,
}

/// The two workspace-level groups, in display order. Project rows sort
/// after both.
pub const GROUPS: [ExecutionGroup; 2] = [
    ExecutionGroup {
        label: "Workspace",
        package_name: PRE_GROUP,
        scripts: &["install", "update"],
        allow_multiple: true,
        sort_key: 0,
    },
    ExecutionGroup {
        label: "Build",
        package_name: BUILD_GROUP,
        scripts: &["smart", "regular", "rebuild"],
        allow_multiple: false,
        sort_key: 1,
    },
];

/// One operator choice from the picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Package the choice applies to, or a reserved group identifier.
    pub package_name: String,
    /// Chosen script name, possibly the skip sentinel.
    pub script: String,
    /// Executable override; defaults to the group tool or project runner.
    pub script_executable: Option<String>,
    /// Invoke-prefix override; defaults to `run` for project scripts.
    pub script_command: Option<String>,
}

impl Selection {
    pub fn new(package_name: impl Into<String>, script: impl Into<String>) -> Self {
        Self {
            package_name: package_name.into(),
            script: script.into(),
            script_executable: None,
            script_command: None,
        }
    }

    fn is_skip(&self) -> bool {
        self.script == SKIP_SCRIPT
    }
}

/// A main selection paired with its resolved project.
#[derive(Debug, Clone)]
pub struct MainEntry {
    pub selection: Selection,
    pub project: Project,
}

/// The three-way partition of one cycle's non-skip selections.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    /// Workspace pre-scripts, in picker order.
    pub pre: Vec<Selection>,
    /// The workspace-build choice, if one was made.
    pub build: Option<Selection>,
    /// Per-project scripts, in picker order.
    pub main: Vec<MainEntry>,
}

impl Plan {
    fn is_empty(&self) -> bool {
        self.pre.is_empty() && self.build.is_none() && self.main.is_empty()
    }

    /// Distinct package names across `main`, in first-seen order.
    pub fn main_packages(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut packages = Vec::new();
        for entry in &self.main {
            if seen.insert(entry.project.package_name.clone()) {
                packages.push(entry.project.package_name.clone());
            }
        }
        packages
    }
}

/// Partitions `selections` into a plan and persists the main choices.
///
/// Skip-sentinel selections are discarded up front. Main candidates that do
/// not resolve to a known project are silently dropped; the picker only
/// offers known projects, so this is a defensive no-op in practice. Returns
/// `None` when nothing at all was selected, which the caller must treat as
/// "end the run loop". The store is only written when a plan is returned.
pub fn build_plan(
    selections: Vec<Selection>,
    projects: &[Project],
    store: &SelectionStore,
    root: &Path,
) -> Option<Plan> {
    let mut plan = Plan::default();
    for selection in selections {
        if selection.is_skip() {
            continue;
        }
        match selection.package_name.as_str() {
            PRE_GROUP => plan.pre.push(selection),
            BUILD_GROUP => plan.build = Some(selection),
            _ => {
                let Some(project) = projects
                    .iter()
                    .find(|project| project.package_name == selection.package_name)
                else {
                    continue;
                };
                plan.main.push(MainEntry {
                    selection,
                    project: project.clone(),
                });
            }
        }
    }

    if plan.is_empty() {
        return None;
    }

    let saved: SavedSelections = plan
        .main
        .iter()
        .map(|entry| {
            (
                entry.project.package_name.clone(),
                entry.selection.script.clone(),
            )
        })
        .collect();
    store.save(root, &saved);

    Some(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SelectionStore;

    fn project(name: &str) -> Project {
        Project {
            package_name: name.to_string(),
            folder: format!("packages/{}", name),
            scripts: vec!["build".to_string(), "test".to_string()],
            runner: None,
        }
    }

    fn temp_store(dir: &tempfile::TempDir) -> SelectionStore {
        SelectionStore::at(dir.path().join("selections.json"))
    }

    #[test]
    fn all_skip_selections_yield_no_plan() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir);
        let selections = vec![
            Selection::new(PRE_GROUP, SKIP_SCRIPT),
            Selection::new(BUILD_GROUP, SKIP_SCRIPT),
            Selection::new("web", SKIP_SCRIPT),
        ];
        let plan = build_plan(selections, &[project("web")], &store, dir.path());
        assert!(plan.is_none());
        // Nothing selected leaves the prior record alone.
        assert!(store.load(dir.path()).is_empty());
    }

    #[test]
    fn partitions_into_pre_build_and_main() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir);
        let selections = vec![
            Selection::new(PRE_GROUP, "install"),
            Selection::new(PRE_GROUP, "update"),
            Selection::new(BUILD_GROUP, "smart"),
            Selection::new("web", "build"),
            Selection::new("core", "test"),
        ];
        let projects = [project("web"), project("core")];
        let plan = build_plan(selections, &projects, &store, dir.path()).unwrap();
        assert_eq!(plan.pre.len(), 2);
        assert_eq!(plan.pre[0].script, "install");
        assert_eq!(plan.pre[1].script, "update");
        assert_eq!(plan.build.as_ref().unwrap().script, "smart");
        assert_eq!(plan.main.len(), 2);
    }

    #[test]
    fn main_entries_resolve_to_their_project() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir);
        let selections = vec![
            Selection::new("core", "test"),
            Selection::new("web", "build"),
        ];
        let projects = [project("web"), project("core")];
        let plan = build_plan(selections, &projects, &store, dir.path()).unwrap();
        for entry in &plan.main {
            assert_eq!(entry.project.package_name, entry.selection.package_name);
        }
        // Picker order is preserved, not project order.
        assert_eq!(plan.main[0].selection.package_name, "core");
        assert_eq!(plan.main[1].selection.package_name, "web");
    }

    #[test]
    fn unresolvable_selections_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir);
        let selections = vec![
            Selection::new("web", "build"),
            Selection::new("ghost", "build"),
        ];
        let plan = build_plan(selections, &[project("web")], &store, dir.path()).unwrap();
        assert_eq!(plan.main.len(), 1);
        assert_eq!(plan.main[0].project.package_name, "web");
    }

    #[test]
    fn persists_main_selections_keyed_by_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir);
        let selections = vec![
            Selection::new("web", "build"),
            Selection::new("core", "test"),
        ];
        let projects = [project("web"), project("core")];
        build_plan(selections, &projects, &store, dir.path()).unwrap();
        let saved = store.load(dir.path());
        assert_eq!(saved.get("web").map(String::as_str), Some("build"));
        assert_eq!(saved.get("core").map(String::as_str), Some("test"));
    }

    #[test]
    fn persists_even_when_only_pre_is_selected() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir);
        let mut stale = crate::store::SavedSelections::new();
        stale.insert("web".to_string(), "build".to_string());
        store.save(dir.path(), &stale);

        let selections = vec![Selection::new(PRE_GROUP, "install")];
        build_plan(selections, &[project("web")], &store, dir.path()).unwrap();
        assert!(store.load(dir.path()).is_empty());
    }

    #[test]
    fn main_packages_deduplicate_in_first_seen_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir);
        let selections = vec![
            Selection::new("core", "build"),
            Selection::new("web", "build"),
            Selection::new("core", "test"),
        ];
        let projects = [project("web"), project("core")];
        let plan = build_plan(selections, &projects, &store, dir.path()).unwrap();
        assert_eq!(plan.main_packages(), vec!["core", "web"]);
    }
}
