use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::Context;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::container::InstanceContainer;
use crate::hooks::InstanceHooks;
use crate::instance::{CONFIG_FILE_NAME, Instance, is_valid_instance};

/// File holding group assignments, stored beside the instance directories.
pub const GROUPS_FILE_NAME: &str = "instgroups.json";

#[derive(Debug, Serialize, Deserialize)]
struct GroupsFile {
    #[serde(rename = "formatVersion")]
    format_version: u32,
    groups: HashMap<String, String>,
}

/// Container-side state shared with every loaded instance.
///
/// Tracks group membership by instance id, persists it to
/// [`GROUPS_FILE_NAME`], and remembers rename notifications until the owner
/// consumes them with [`GroupRegistry::take_renamed`].
#[derive(Debug, Default)]
pub struct GroupRegistry {
    path: Option<PathBuf>,
    groups: RefCell<HashMap<String, String>>,
    renamed: Cell<bool>,
}

impl GroupRegistry {
    /// A registry with no backing file; group changes stay in memory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the registry persisted at `path`. A missing file is a fresh
    /// registry; a corrupt one is logged and discarded.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let groups = match fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str::<GroupsFile>(&text) {
                Ok(file) => file.groups,
                Err(e) => {
                    warn!("corrupt {}: {e}", path.display());
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };
        Self {
            path: Some(path),
            groups: RefCell::new(groups),
            renamed: Cell::new(false),
        }
    }

    /// Write the registry back to its backing file, if it has one.
    pub fn save(&self) -> Result<(), InstanceManagerError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let file = GroupsFile {
            format_version: 1,
            groups: self.groups.borrow().clone(),
        };
        let json = serde_json::to_string_pretty(&file)
            .context("failed to serialize group registry")
            .map_err(|e| InstanceManagerError::GroupsWriteFailed {
                path: path.clone(),
                source: e,
            })?;
        fs::write(path, json)
            .context("failed to write group registry")
            .map_err(|e| InstanceManagerError::GroupsWriteFailed {
                path: path.clone(),
                source: e,
            })
    }

    /// True once per rename burst: reports whether any instance was renamed
    /// since the last call.
    pub fn take_renamed(&self) -> bool {
        self.renamed.replace(false)
    }
}

impl InstanceContainer for GroupRegistry {
    fn instance_renamed(&self, id: &str) {
        debug!("instance '{id}' renamed");
        self.renamed.set(true);
    }

    fn group_for(&self, id: &str) -> Option<String> {
        self.groups.borrow().get(id).cloned()
    }

    fn set_group(&self, id: &str, group: &str) {
        if group.is_empty() {
            self.groups.borrow_mut().remove(id);
        } else {
            self.groups
                .borrow_mut()
                .insert(id.to_string(), group.to_string());
        }
        if let Err(e) = self.save() {
            warn!("could not persist group change for '{id}': {e}");
        }
    }
}

/// Discovers and owns the instances under one root directory, keeping them
/// sorted by display name.
pub struct InstanceManager {
    instances_dir: PathBuf,
    instances: Vec<Instance>,
    registry: Rc<GroupRegistry>,
    hooks: InstanceHooks,
}

impl InstanceManager {
    pub fn new(instances_dir: impl Into<PathBuf>) -> Self {
        Self::with_hooks(instances_dir, InstanceHooks::default())
    }

    /// A manager whose instances share `hooks` (jar sniffer, icon resolver).
    pub fn with_hooks(instances_dir: impl Into<PathBuf>, hooks: InstanceHooks) -> Self {
        let instances_dir = instances_dir.into();
        let registry = Rc::new(GroupRegistry::load(instances_dir.join(GROUPS_FILE_NAME)));
        Self {
            instances_dir,
            instances: Vec::new(),
            registry,
            hooks,
        }
    }

    /// Default per-user instances directory.
    pub fn default_dir() -> Result<PathBuf, InstanceManagerError> {
        let project_dirs = ProjectDirs::from("", "", "deepslate")
            .ok_or(InstanceManagerError::ProjectDirectoriesUnavailable)?;
        Ok(project_dirs.data_dir().join("instances"))
    }

    /// Drop the current set and reload every valid instance directory.
    ///
    /// Directories without an `instance.cfg` are skipped with a log line, as
    /// are entries that stop being loadable mid-scan; only failures to read
    /// the instances directory itself are errors.
    #[instrument(skip(self), level = "info")]
    pub fn discover(&mut self) -> Result<(), InstanceManagerError> {
        info!("scanning {} for instances", self.instances_dir.display());

        if !self.instances_dir.is_dir() {
            fs::create_dir_all(&self.instances_dir)
                .context("failed to create instances directory")
                .map_err(|e| InstanceManagerError::DirectoryCreationFailed {
                    path: self.instances_dir.clone(),
                    source: e,
                })?;
        }

        let entries = fs::read_dir(&self.instances_dir)
            .context("failed to read instances directory")
            .map_err(|e| InstanceManagerError::DirectoryReadFailed {
                path: self.instances_dir.clone(),
                source: e,
            })?;

        self.instances.clear();
        let mut loaded = 0usize;
        let mut skipped = 0usize;

        for entry in entries {
            let entry = entry
                .context("failed to read directory entry")
                .map_err(|e| InstanceManagerError::DirectoryEntryReadFailed {
                    directory: self.instances_dir.clone(),
                    source: e,
                })?;
            let path = entry.path();

            if !path.is_dir() {
                debug!("skipping non-directory entry {}", path.display());
                continue;
            }
            if !is_valid_instance(&path) {
                debug!("{} has no {}, skipping", path.display(), CONFIG_FILE_NAME);
                skipped += 1;
                continue;
            }

            match Instance::load_with(&path, self.hooks.clone()) {
                Some(mut instance) => {
                    let container: Rc<dyn InstanceContainer> = self.registry.clone();
                    instance.set_container(container);
                    debug!("loaded instance '{}' from {}", instance.name(), path.display());
                    self.instances.push(instance);
                    loaded += 1;
                }
                None => {
                    warn!("{} vanished while loading, skipping", path.display());
                    skipped += 1;
                }
            }
        }

        self.sort();
        info!("finished scan: {loaded} loaded, {skipped} skipped");
        Ok(())
    }

    /// Create a fresh standard instance in `dir_name`, named `name`.
    #[instrument(skip(self), level = "debug")]
    pub fn create(&mut self, dir_name: &str, name: &str) -> Result<&mut Instance, InstanceManagerError> {
        let root = self.instances_dir.join(dir_name);
        if root.exists() {
            return Err(InstanceManagerError::InstanceExists { path: root });
        }

        fs::create_dir_all(&root)
            .context("failed to create instance directory")
            .map_err(|e| InstanceManagerError::DirectoryCreationFailed {
                path: root.clone(),
                source: e,
            })?;

        let mut instance = Instance::create_with(root, self.hooks.clone());
        let container: Rc<dyn InstanceContainer> = self.registry.clone();
        instance.set_container(container);
        instance.set_name(name);
        info!("created instance '{name}' ({dir_name})");

        let index = self.instances.len();
        self.instances.push(instance);
        Ok(&mut self.instances[index])
    }

    /// Re-sort when a rename notification came in since the last check.
    /// Returns whether a re-sort happened.
    pub fn resort_if_renamed(&mut self) -> bool {
        if self.registry.take_renamed() {
            self.sort();
            true
        } else {
            false
        }
    }

    fn sort(&mut self) {
        self.instances
            .sort_by_cached_key(|instance| (instance.name().to_lowercase(), instance.instance_id()));
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    pub fn instances_mut(&mut self) -> &mut [Instance] {
        &mut self.instances
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    pub fn get(&self, id: &str) -> Option<&Instance> {
        self.instances
            .iter()
            .find(|instance| instance.instance_id() == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Instance> {
        self.instances
            .iter_mut()
            .find(|instance| instance.instance_id() == id)
    }

    pub fn instances_dir(&self) -> &PathBuf {
        &self.instances_dir
    }

    pub fn registry(&self) -> &Rc<GroupRegistry> {
        &self.registry
    }
}

impl std::fmt::Debug for InstanceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceManager")
            .field("instances_dir", &self.instances_dir)
            .field("instance_count", &self.instances.len())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Error)]
pub enum InstanceManagerError {
    #[error(
        "project directories are unavailable - this usually indicates an unsupported OS or missing home directory"
    )]
    ProjectDirectoriesUnavailable,

    #[error("failed to create directory '{path}': {source}")]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to read directory '{path}': {source}")]
    DirectoryReadFailed {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to read directory entry in '{directory}': {source}")]
    DirectoryEntryReadFailed {
        directory: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("instance directory already exists: '{path}'")]
    InstanceExists { path: PathBuf },

    #[error("failed to write groups file '{path}': {source}")]
    GroupsWriteFailed {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::tempdir;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    }

    fn seed_instance(base: &Path, id: &str, name: &str) {
        let root = base.join(id);
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join(CONFIG_FILE_NAME), format!("name={name}\n")).unwrap();
    }

    #[test]
    fn discover_loads_valid_instances_sorted_by_name() {
        init_tracing();
        let dir = tempdir().unwrap();
        seed_instance(dir.path(), "zulu", "Alpha Pack");
        seed_instance(dir.path(), "alpha", "Zulu Pack");
        fs::create_dir(dir.path().join("not-an-instance")).unwrap();
        fs::write(dir.path().join("stray.txt"), b"x").unwrap();

        let mut manager = InstanceManager::new(dir.path());
        manager.discover().unwrap();

        assert_eq!(manager.instance_count(), 2);
        assert_eq!(manager.instances()[0].name(), "Alpha Pack");
        assert_eq!(manager.instances()[1].name(), "Zulu Pack");
    }

    #[test]
    fn discover_on_missing_root_creates_it() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("instances");

        let mut manager = InstanceManager::new(&root);
        manager.discover().unwrap();
        assert!(root.is_dir());
        assert_eq!(manager.instance_count(), 0);
    }

    #[test]
    fn create_builds_a_full_instance_and_rejects_duplicates() {
        let dir = tempdir().unwrap();
        let mut manager = InstanceManager::new(dir.path());

        let instance = manager.create("beta", "Beta Pack").unwrap();
        assert_eq!(instance.name(), "Beta Pack");
        assert!(is_valid_instance(&dir.path().join("beta")));
        assert!(dir.path().join("beta/minecraft/bin").is_dir());

        let duplicate = manager.create("beta", "Again");
        assert!(matches!(
            duplicate,
            Err(InstanceManagerError::InstanceExists { .. })
        ));
    }

    #[test]
    fn rename_notification_triggers_a_resort() {
        let dir = tempdir().unwrap();
        let mut manager = InstanceManager::new(dir.path());
        manager.create("one", "AAA").unwrap();
        manager.create("two", "BBB").unwrap();
        manager.resort_if_renamed();
        assert_eq!(manager.instances()[0].name(), "AAA");

        manager.instances_mut()[0].set_name("ZZZ");
        assert!(manager.resort_if_renamed());
        assert_eq!(manager.instances()[0].name(), "BBB");
        assert!(!manager.resort_if_renamed());
    }

    #[test]
    fn groups_persist_across_managers() {
        let dir = tempdir().unwrap();
        let mut manager = InstanceManager::new(dir.path());
        manager.create("grouped", "Grouped").unwrap();
        manager.get_mut("grouped").unwrap().set_group("Modded");
        assert!(dir.path().join(GROUPS_FILE_NAME).is_file());

        let mut second = InstanceManager::new(dir.path());
        second.discover().unwrap();
        assert_eq!(second.get("grouped").unwrap().group(), "Modded");

        second.get_mut("grouped").unwrap().set_group("");
        let third = InstanceManager::new(dir.path());
        assert_eq!(third.registry().group_for("grouped"), None);
    }

    #[test]
    fn corrupt_groups_file_degrades_to_empty() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(GROUPS_FILE_NAME), "{not json").unwrap();

        let registry = GroupRegistry::load(dir.path().join(GROUPS_FILE_NAME));
        assert_eq!(registry.group_for("anything"), None);
    }

    #[test]
    fn unbacked_registry_stays_in_memory() {
        let registry = GroupRegistry::new();
        registry.set_group("id", "Group");
        assert_eq!(registry.group_for("id"), Some("Group".to_string()));
        registry.save().unwrap();
    }
}
