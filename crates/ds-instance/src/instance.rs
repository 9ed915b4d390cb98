use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::{ConfigFile, ConfigValue};
use crate::container::InstanceContainer;
use crate::hooks::{InstanceHooks, VERSION_UNKNOWN};
use crate::lists::{ModList, TexturePackList, WorldList};

/// File that marks a directory as an instance and stores its settings.
pub const CONFIG_FILE_NAME: &str = "instance.cfg";

/// Extensions the config-file scan always picks up.
const CONFIG_EXTENSIONS: &[&str] = &[
    "cfg",
    "conf",
    "config",
    "props",
    "properties",
    "xml",
    "yml",
];

/// Concrete instance flavor, selected by the integer `type` config field.
///
/// Only one flavor exists today. Unknown tags fall back to it, so older
/// builds keep opening directories written by newer ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InstanceType {
    #[default]
    Standard,
}

impl InstanceType {
    pub fn from_tag(tag: i64) -> Self {
        match tag {
            0 => Self::Standard,
            other => {
                debug!("unknown instance type tag {other}, treating as standard");
                Self::Standard
            }
        }
    }

    pub fn tag(self) -> i64 {
        match self {
            Self::Standard => 0,
        }
    }
}

/// True iff `root` is an existing directory containing an `instance.cfg`.
pub fn is_valid_instance(root: &Path) -> bool {
    root.is_dir() && root.join(CONFIG_FILE_NAME).is_file()
}

/// One configured game installation: a root directory holding a flat
/// `instance.cfg` plus a fixed layout of game subdirectories and some cached
/// facts about the installed jar.
///
/// Construction is side-effecting: every missing layout directory is created
/// up front, and the jar version cache is refreshed. The instance never
/// signals failure for the day-to-day accessors; missing or malformed state
/// degrades to documented defaults.
pub struct Instance {
    root: PathBuf,
    kind: InstanceType,
    config: ConfigFile,
    hooks: InstanceHooks,
    container: Option<Rc<dyn InstanceContainer>>,
    running: bool,

    jar_mods: ModList,
    ml_mods: ModList,
    core_mods: ModList,
    worlds: WorldList,
    texture_packs: TexturePackList,
    jar_mods_inited: bool,
    ml_mods_inited: bool,
    core_mods_inited: bool,
    worlds_inited: bool,
    texture_packs_inited: bool,
}

impl Instance {
    /// Inspect `root` and build the matching instance flavor.
    ///
    /// Returns `None` when `root` is not a valid instance directory.
    pub fn load(root: impl Into<PathBuf>) -> Option<Self> {
        Self::load_with(root, InstanceHooks::default())
    }

    pub fn load_with(root: impl Into<PathBuf>, hooks: InstanceHooks) -> Option<Self> {
        let root = root.into();
        if !is_valid_instance(&root) {
            return None;
        }
        let config = ConfigFile::open(root.join(CONFIG_FILE_NAME));
        let kind = InstanceType::from_tag(config.get("type", 0));
        Some(Self::build(root, kind, hooks))
    }

    /// Initialize `root` as a standard instance, creating `instance.cfg` and
    /// the directory layout as needed. Creation flows use this; everything
    /// else goes through [`Instance::load`].
    pub fn create(root: impl Into<PathBuf>) -> Self {
        Self::create_with(root, InstanceHooks::default())
    }

    pub fn create_with(root: impl Into<PathBuf>, hooks: InstanceHooks) -> Self {
        Self::build(root.into(), InstanceType::Standard, hooks)
    }

    fn build(root: PathBuf, kind: InstanceType, hooks: InstanceHooks) -> Self {
        if let Err(e) = fs::create_dir_all(&root) {
            warn!("could not create instance root {}: {e}", root.display());
        }
        let config = ConfigFile::open(root.join(CONFIG_FILE_NAME));
        let mut instance = Self {
            root,
            kind,
            config,
            hooks,
            container: None,
            running: false,
            jar_mods: ModList::default(),
            ml_mods: ModList::default(),
            core_mods: ModList::default(),
            worlds: WorldList::default(),
            texture_packs: TexturePackList::default(),
            jar_mods_inited: false,
            ml_mods_inited: false,
            core_mods_inited: false,
            worlds_inited: false,
            texture_packs_inited: false,
        };
        instance.make_dirs();

        // The lists stay empty until their accessor is first called.
        instance.jar_mods.set_dir(instance.inst_mods_dir());
        instance.ml_mods.set_dir(instance.ml_mods_dir());
        instance.core_mods.set_dir(instance.core_mods_dir());
        instance.worlds.set_dir(instance.saves_dir());
        instance.texture_packs.set_dir(instance.texture_packs_dir());

        instance.update_version(false);
        instance
    }

    /// Create every missing directory of the fixed layout. Each creation is
    /// independent and idempotent; failures are logged, not raised.
    fn make_dirs(&self) {
        for dir in [
            self.data_dir(),
            self.bin_dir(),
            self.saves_dir(),
            self.ml_mods_dir(),
            self.core_mods_dir(),
            self.resources_dir(),
            self.screenshots_dir(),
            self.texture_packs_dir(),
            self.inst_mods_dir(),
        ] {
            if dir.is_dir() {
                continue;
            }
            if let Err(e) = fs::create_dir_all(&dir) {
                warn!("could not create {}: {e}", dir.display());
            }
        }
    }

    // ---- identity -------------------------------------------------------

    /// The instance's identity: the name of its root directory.
    pub fn instance_id(&self) -> String {
        self.root
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn kind(&self) -> InstanceType {
        self.kind
    }

    // ---- derived paths --------------------------------------------------

    pub fn root_dir(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE_NAME)
    }

    /// The game's own data directory. The dot-prefixed form wins only when
    /// it already exists and the plain form does not.
    pub fn data_dir(&self) -> PathBuf {
        let dotted = self.root.join(".minecraft");
        let plain = self.root.join("minecraft");
        if dotted.is_dir() && !plain.is_dir() {
            dotted
        } else {
            plain
        }
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.data_dir().join("bin")
    }

    pub fn saves_dir(&self) -> PathBuf {
        self.data_dir().join("saves")
    }

    /// Loader mods, picked up by the mod loader at runtime.
    pub fn ml_mods_dir(&self) -> PathBuf {
        self.data_dir().join("mods")
    }

    pub fn core_mods_dir(&self) -> PathBuf {
        self.data_dir().join("coremods")
    }

    pub fn resources_dir(&self) -> PathBuf {
        self.data_dir().join("resources")
    }

    pub fn screenshots_dir(&self) -> PathBuf {
        self.data_dir().join("screenshots")
    }

    pub fn texture_packs_dir(&self) -> PathBuf {
        self.data_dir().join("texturepacks")
    }

    /// Jar-patch mods, applied to the jar at rebuild time.
    pub fn inst_mods_dir(&self) -> PathBuf {
        self.root.join("instMods")
    }

    pub fn version_file(&self) -> PathBuf {
        self.bin_dir().join("version")
    }

    pub fn mc_jar(&self) -> PathBuf {
        self.bin_dir().join("minecraft.jar")
    }

    pub fn mc_backup(&self) -> PathBuf {
        self.bin_dir().join("mcbackup.jar")
    }

    pub fn mod_list_file(&self) -> PathBuf {
        self.root.join("modlist")
    }

    pub fn has_mc_jar(&self) -> bool {
        self.mc_jar().is_file()
    }

    pub fn has_mc_backup(&self) -> bool {
        self.mc_backup().is_file()
    }

    // ---- settings -------------------------------------------------------

    /// Read a setting, falling back to `default` when the key is absent or
    /// unparseable.
    pub fn setting<T: ConfigValue>(&self, key: &str, default: T) -> T {
        self.config.get(key, default)
    }

    /// Write a setting through to `instance.cfg`.
    pub fn set_setting<T: ConfigValue>(&mut self, key: &str, value: T) {
        self.config.set(key, value);
    }

    pub fn name(&self) -> String {
        self.setting("name", "Unnamed Instance".to_string())
    }

    pub fn set_name(&mut self, name: &str) {
        self.set_setting("name", name.to_string());
        if let Some(container) = &self.container {
            container.instance_renamed(&self.instance_id());
        }
    }

    /// The icon key to display. The stored key passes through the resolver
    /// hook, which may substitute a name-derived key; the stored value is
    /// never rewritten by that substitution.
    pub fn icon_key(&self) -> String {
        let stored = self.setting("iconKey", "default".to_string());
        self.hooks.icons.resolve(&stored, &self.name())
    }

    pub fn set_icon_key(&mut self, icon_key: &str) {
        self.set_setting("iconKey", icon_key.to_string());
    }

    pub fn notes(&self) -> String {
        self.setting("notes", String::new())
    }

    pub fn set_notes(&mut self, notes: &str) {
        self.set_setting("notes", notes.to_string());
    }

    pub fn should_rebuild(&self) -> bool {
        self.setting("NeedsRebuild", false)
    }

    pub fn set_needs_rebuild(&mut self, value: bool) {
        self.set_setting("NeedsRebuild", value);
    }

    pub fn jar_version(&self) -> String {
        self.setting("JarVersion", VERSION_UNKNOWN.to_string())
    }

    fn set_jar_version(&mut self, version: &str) {
        self.set_setting("JarVersion", version.to_string());
    }

    pub fn jar_timestamp(&self) -> i64 {
        self.setting("JarTimestamp", 0)
    }

    fn set_jar_timestamp(&mut self, timestamp: i64) {
        self.set_setting("JarTimestamp", timestamp);
    }

    // ---- jar version cache ----------------------------------------------

    /// Refresh the cached jar version from the jar's modification time (UTC,
    /// second resolution).
    ///
    /// With `keep_current` the new timestamp is recorded without re-deriving
    /// the version, for callers that touched the jar without changing its
    /// contents.
    pub fn update_version(&mut self, keep_current: bool) {
        let jar = self.mc_jar();
        let Ok(metadata) = fs::metadata(&jar) else {
            self.set_jar_timestamp(0);
            self.set_jar_version(VERSION_UNKNOWN);
            return;
        };
        let timestamp = match metadata.modified() {
            Ok(mtime) => DateTime::<Utc>::from(mtime).timestamp(),
            Err(e) => {
                warn!("no modification time for {}: {e}", jar.display());
                return;
            }
        };
        if keep_current {
            self.set_jar_timestamp(timestamp);
            return;
        }
        if timestamp == self.jar_timestamp() {
            return;
        }
        let version = self.hooks.sniffer.sniff(&jar);
        info!("{}: jar changed, version now '{version}'", self.instance_id());
        self.set_jar_timestamp(timestamp);
        self.set_jar_version(&version);
    }

    // ---- version file ---------------------------------------------------

    /// Patch-level version recorded beside the jar, -1 when the file is
    /// absent or unreadable. The content is not validated beyond an integer
    /// parse.
    pub fn read_version_file(&self) -> i64 {
        let path = self.version_file();
        if !path.is_file() {
            return -1;
        }
        match fs::read_to_string(&path) {
            Ok(text) => text.trim().parse().unwrap_or(-1),
            Err(e) => {
                warn!("could not read {}: {e}", path.display());
                -1
            }
        }
    }

    /// Write `number` as plain decimal text, truncating any previous
    /// content. The bin directory is created when missing.
    pub fn write_version_file(&self, number: i64) {
        let bin = self.bin_dir();
        if !bin.is_dir()
            && let Err(e) = fs::create_dir_all(&bin)
        {
            warn!("could not create {}: {e}", bin.display());
            return;
        }
        if let Err(e) = fs::write(self.version_file(), number.to_string()) {
            warn!("could not write {}: {e}", self.version_file().display());
        }
    }

    // ---- child collections ----------------------------------------------

    /// Jar-patch mods under `instMods/`, ordered by the persisted `modlist`
    /// file.
    ///
    /// The first access loads the persisted order, folds in what is actually
    /// on disk and writes the merged result back. Later calls return the
    /// same handle without rescanning.
    pub fn mod_list(&mut self) -> &mut ModList {
        if !self.jar_mods_inited {
            let path = self.mod_list_file();
            if let Err(e) = self.jar_mods.load_from(&path) {
                warn!("could not read {}: {e}", path.display());
            }
            self.jar_mods.update();
            if let Err(e) = self.jar_mods.save_to(&path) {
                warn!("could not write {}: {e}", path.display());
            }
            self.jar_mods_inited = true;
        }
        &mut self.jar_mods
    }

    /// Loader mods under `mods/`. Scanned once, on first access.
    pub fn ml_mod_list(&mut self) -> &mut ModList {
        if !self.ml_mods_inited {
            self.ml_mods.update();
            self.ml_mods_inited = true;
        }
        &mut self.ml_mods
    }

    /// Core mods under `coremods/`. Scanned once, on first access.
    pub fn core_mod_list(&mut self) -> &mut ModList {
        if !self.core_mods_inited {
            self.core_mods.update();
            self.core_mods_inited = true;
        }
        &mut self.core_mods
    }

    pub fn world_list(&mut self) -> &mut WorldList {
        if !self.worlds_inited {
            self.worlds.update();
            self.worlds_inited = true;
        }
        &mut self.worlds
    }

    pub fn texture_pack_list(&mut self) -> &mut TexturePackList {
        if !self.texture_packs_inited {
            self.texture_packs.update();
            self.texture_packs_inited = true;
        }
        &mut self.texture_packs
    }

    // ---- config discovery -----------------------------------------------

    /// Files under the data directory a user might want to edit or back up.
    ///
    /// Heuristic on purpose: an extension allow-list plus case-sensitive
    /// substring matches on "config"/"options", skipping everything under a
    /// `saves` directory. Paths come back relative to the instance root, in
    /// plain enumeration order.
    pub fn possible_config_files(&self) -> Vec<PathBuf> {
        let mut found = Vec::new();
        let walker = WalkDir::new(self.data_dir())
            .into_iter()
            .filter_entry(|entry| !(entry.file_type().is_dir() && entry.file_name() == "saves"));
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("config scan: {e}");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if looks_like_config_file(path) {
                let relative = path.strip_prefix(&self.root).unwrap_or(path);
                found.push(relative.to_path_buf());
            }
        }
        found
    }

    // ---- container association ------------------------------------------

    /// Attach the owning container. Rename and group calls are no-ops until
    /// this happens.
    pub fn set_container(&mut self, container: Rc<dyn InstanceContainer>) {
        self.container = Some(container);
    }

    /// Name of the group this instance belongs to; empty when ungrouped or
    /// when no container is attached.
    pub fn group(&self) -> String {
        match &self.container {
            Some(container) => container.group_for(&self.instance_id()).unwrap_or_default(),
            None => String::new(),
        }
    }

    pub fn set_group(&mut self, group: &str) {
        if let Some(container) = &self.container {
            container.set_group(&self.instance_id(), group);
        }
    }

    // ---- runtime state ---------------------------------------------------

    pub fn running(&self) -> bool {
        self.running
    }

    pub fn set_running(&mut self, running: bool) {
        self.running = running;
    }
}

fn looks_like_config_file(path: &Path) -> bool {
    let extension = path.extension().and_then(|ext| ext.to_str());
    if extension.is_some_and(|ext| CONFIG_EXTENSIONS.contains(&ext)) {
        return true;
    }
    if path.to_string_lossy().contains("options") {
        return true;
    }
    let directory = path
        .parent()
        .map(|parent| parent.to_string_lossy().into_owned())
        .unwrap_or_default();
    if directory.contains("config") {
        return true;
    }
    let stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or_default();
    stem.contains("config") || stem.contains("options")
}
