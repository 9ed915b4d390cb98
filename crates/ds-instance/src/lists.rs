use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// Ordered list of mod files in one directory.
///
/// Order is user data (jar patches apply in list order), so a refresh keeps
/// the known order for files that still exist and appends newcomers at the
/// end in enumeration order.
#[derive(Debug, Default)]
pub struct ModList {
    dir: PathBuf,
    entries: Vec<String>,
}

impl ModList {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            entries: Vec::new(),
        }
    }

    pub fn set_dir(&mut self, dir: impl Into<PathBuf>) {
        self.dir = dir.into();
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rescan the backing directory and merge with the known order.
    pub fn update(&mut self) {
        let on_disk = list_file_names(&self.dir);
        let mut next: Vec<String> = self
            .entries
            .iter()
            .filter(|known| on_disk.contains(known))
            .cloned()
            .collect();
        for name in on_disk {
            if !next.contains(&name) {
                next.push(name);
            }
        }
        debug!("{}: {} mods", self.dir.display(), next.len());
        self.entries = next;
    }

    /// Replace the in-memory order with the one persisted at `path`. A
    /// missing file is an empty list, not an error.
    pub fn load_from(&mut self, path: &Path) -> io::Result<()> {
        if !path.is_file() {
            self.entries.clear();
            return Ok(());
        }
        let text = fs::read_to_string(path)?;
        self.entries = text
            .lines()
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        Ok(())
    }

    /// Persist the current order to `path`, one file name per line.
    pub fn save_to(&self, path: &Path) -> io::Result<()> {
        let mut text = String::new();
        for entry in &self.entries {
            text.push_str(entry);
            text.push('\n');
        }
        fs::write(path, text)
    }
}

/// Save-game directories under `saves/`: every subdirectory holding a
/// `level.dat`.
#[derive(Debug, Default)]
pub struct WorldList {
    dir: PathBuf,
    worlds: Vec<String>,
}

impl WorldList {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            worlds: Vec::new(),
        }
    }

    pub fn set_dir(&mut self, dir: impl Into<PathBuf>) {
        self.dir = dir.into();
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn worlds(&self) -> &[String] {
        &self.worlds
    }

    pub fn update(&mut self) {
        self.worlds = read_dir_or_empty(&self.dir)
            .filter(|entry| entry.path().join("level.dat").is_file())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect();
        debug!("{}: {} worlds", self.dir.display(), self.worlds.len());
    }
}

/// Texture packs under `texturepacks/`: zip archives and unpacked
/// directories.
#[derive(Debug, Default)]
pub struct TexturePackList {
    dir: PathBuf,
    packs: Vec<String>,
}

impl TexturePackList {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            packs: Vec::new(),
        }
    }

    pub fn set_dir(&mut self, dir: impl Into<PathBuf>) {
        self.dir = dir.into();
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn packs(&self) -> &[String] {
        &self.packs
    }

    pub fn update(&mut self) {
        self.packs = read_dir_or_empty(&self.dir)
            .filter(|entry| {
                let path = entry.path();
                path.is_dir() || path.extension().is_some_and(|ext| ext == "zip")
            })
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect();
        debug!("{}: {} texture packs", self.dir.display(), self.packs.len());
    }
}

fn read_dir_or_empty(dir: &Path) -> impl Iterator<Item = fs::DirEntry> + use<> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => Some(entries),
        Err(e) => {
            warn!("could not read {}: {e}", dir.display());
            None
        }
    };
    entries.into_iter().flatten().filter_map(|entry| entry.ok())
}

fn list_file_names(dir: &Path) -> Vec<String> {
    read_dir_or_empty(dir)
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn mod_list_keeps_known_order_and_appends_new_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("alpha.jar"), b"a").unwrap();
        fs::write(dir.path().join("beta.jar"), b"b").unwrap();

        let mut mods = ModList::new(dir.path());
        mods.entries = vec!["beta.jar".to_string(), "gone.jar".to_string()];
        mods.update();

        assert_eq!(mods.entries()[0], "beta.jar");
        assert_eq!(mods.len(), 2);
        assert!(mods.entries().contains(&"alpha.jar".to_string()));
        assert!(!mods.entries().contains(&"gone.jar".to_string()));
    }

    #[test]
    fn mod_list_persists_and_reloads_order() {
        let dir = tempdir().unwrap();
        let list_file = dir.path().join("modlist");

        let mut mods = ModList::new(dir.path().join("instMods"));
        mods.entries = vec!["z.jar".to_string(), "a.jar".to_string()];
        mods.save_to(&list_file).unwrap();

        let mut reloaded = ModList::new(dir.path().join("instMods"));
        reloaded.load_from(&list_file).unwrap();
        assert_eq!(reloaded.entries(), ["z.jar".to_string(), "a.jar".to_string()]);
    }

    #[test]
    fn mod_list_load_from_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let mut mods = ModList::new(dir.path());
        mods.entries = vec!["stale.jar".to_string()];
        mods.load_from(&dir.path().join("modlist")).unwrap();
        assert!(mods.is_empty());
    }

    #[test]
    fn mod_list_update_on_missing_dir_is_empty() {
        let dir = tempdir().unwrap();
        let mut mods = ModList::new(dir.path().join("nope"));
        mods.update();
        assert!(mods.is_empty());
    }

    #[test]
    fn world_list_requires_level_dat() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("World One")).unwrap();
        fs::write(dir.path().join("World One/level.dat"), b"nbt").unwrap();
        fs::create_dir(dir.path().join("empty")).unwrap();
        fs::write(dir.path().join("stray.txt"), b"x").unwrap();

        let mut worlds = WorldList::new(dir.path());
        worlds.update();
        assert_eq!(worlds.worlds(), ["World One".to_string()]);
    }

    #[test]
    fn texture_pack_list_takes_zips_and_directories() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("faithful.zip"), b"pk").unwrap();
        fs::create_dir(dir.path().join("unpacked")).unwrap();
        fs::write(dir.path().join("readme.txt"), b"x").unwrap();

        let mut packs = TexturePackList::new(dir.path());
        packs.update();
        let mut names = packs.packs().to_vec();
        names.sort();
        assert_eq!(names, ["faithful.zip".to_string(), "unpacked".to_string()]);
    }
}
