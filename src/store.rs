//! Persisted selection state.
//!
//! Remembers, per workspace root, which script each package ran in the last
//! cycle, so the next invocation can seed the picker with the same choices.
//! The store is best-effort: a missing or unreadable file means "no prior
//! selection", and a failed write never interrupts a run.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Last-used main selections for one workspace: package name to script.
pub type SavedSelections = BTreeMap<String, String>;

const STORE_FILE: &str = "selections.json";

/// File-backed record of the last cycle's main selections, keyed by
/// workspace root.
#[derive(Debug, Clone)]
pub struct SelectionStore {
    path: Option<PathBuf>,
}

impl SelectionStore {
    /// A store backed by an explicit file path.
    pub fn at(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    /// The default store under the user cache directory. Persistence is
    /// silently disabled when no cache directory can be determined.
    pub fn default_location() -> Self {
        Self {
            path: cache_dir().map(|dir| dir.join("scriptdeck").join(STORE_FILE)),
        }
    }

    /// Returns the saved selections for `root`, or an empty map when there
    /// is no usable record.
    pub fn load(&self, root: &Path) -> SavedSelections {
        self.read_all().remove(&store_key(root)).unwrap_or_default()
    }

    /// Overwrites the record for `root` with `selections`, leaving other
    /// workspaces' records untouched.
    pub fn save(&self, root: &Path, selections: &SavedSelections) {
        let Some(path) = &self.path else {
            return;
        };
        let mut all = self.read_all();
        all.insert(store_key(root), selections.clone());
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        if let Ok(serialized) = serde_json::to_string_pretty(&all) {
            let _ = fs::write(path, serialized);
        }
    }

    fn read_all(&self) -> BTreeMap<String, SavedSelections> {
        let Some(path) = &self.path else {
            return BTreeMap::new();
        };
        let Ok(data) = fs::read_to_string(path) else {
            return BTreeMap::new();
        };
        serde_json::from_str(&data).unwrap_or_default()
    }
}

fn store_key(root: &Path) -> String {
    root.to_string_lossy().into_owned()
}

fn cache_dir() -> Option<PathBuf> {
    if let Ok(path) = env::var("XDG_CACHE_HOME") {
        return Some(PathBuf::from(path));
    }
    if cfg!(windows) {
        return env::var("LOCALAPPDATA").ok().map(PathBuf::from);
    }
    env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(".cache"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selections(pairs: &[(&str, &str)]) -> SavedSelections {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn load_without_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = SelectionStore::at(dir.path().join("selections.json"));
        assert!(store.load(Path::new("/ws")).is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = SelectionStore::at(dir.path().join("nested/selections.json"));
        let saved = selections(&[("web", "build"), ("core", "test")]);
        store.save(Path::new("/ws"), &saved);
        assert_eq!(store.load(Path::new("/ws")), saved);
    }

    #[test]
    fn save_overwrites_previous_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = SelectionStore::at(dir.path().join("selections.json"));
        store.save(Path::new("/ws"), &selections(&[("web", "build")]));
        store.save(Path::new("/ws"), &selections(&[("core", "test")]));
        let loaded = store.load(Path::new("/ws"));
        assert_eq!(loaded, selections(&[("core", "test")]));
    }

    #[test]
    fn records_are_keyed_by_workspace_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = SelectionStore::at(dir.path().join("selections.json"));
        store.save(Path::new("/one"), &selections(&[("web", "build")]));
        store.save(Path::new("/two"), &selections(&[("web", "start")]));
        assert_eq!(store.load(Path::new("/one")), selections(&[("web", "build")]));
        assert_eq!(store.load(Path::new("/two")), selections(&[("web", "start")]));
    }

    #[test]
    fn corrupt_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("selections.json");
        fs::write(&path, "not json").unwrap();
        let store = SelectionStore::at(path);
        assert!(store.load(Path::new("/ws")).is_empty());
    }
}
