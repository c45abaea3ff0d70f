//! Workspace-build selection.
//!
//! Decides which concrete invocation of the workspace-management tool the
//! build phase should run, based on the operator's build-mode choice and the
//! packages that will run main scripts. Pure decision logic; spawning is the
//! runner's job.

use crate::plan::Selection;

/// A concrete build invocation for the workspace-management tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildInvocation {
    /// The chosen build mode, used for the output prefix.
    pub script: String,
    /// Arguments passed to the workspace tool.
    pub args: Vec<String>,
    /// Human status line printed when the phase starts.
    pub label: String,
}

/// Resolves the build choice to an invocation, or `None` to skip the phase.
///
/// `packages` is the deduplicated list of package names with main scripts,
/// in first-seen order. A "smart" choice with no such packages has no useful
/// incremental target and is silently skipped.
pub fn select_build_invocation(
    choice: Option<&Selection>,
    packages: &[String],
) -> Option<BuildInvocation> {
    let choice = choice?;
    match choice.script.as_str() {
        "smart" => {
            if packages.is_empty() {
                return None;
            }
            let mut args = vec!["build".to_string()];
            for package in packages {
                args.push("--to".to_string());
                args.push(package.clone());
            }
            Some(BuildInvocation {
                script: choice.script.clone(),
                args,
                label: format!(
                    "Starting incremental build of {} package(s)",
                    packages.len()
                ),
            })
        }
        "regular" => Some(BuildInvocation {
            script: choice.script.clone(),
            args: vec!["build".to_string()],
            label: "Starting incremental build".to_string(),
        }),
        "rebuild" => Some(BuildInvocation {
            script: choice.script.clone(),
            args: vec!["rebuild".to_string()],
            label: "Starting full rebuild".to_string(),
        }),
        _ => None,
    }
}
