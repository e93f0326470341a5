//! Archive Index (B), `spec.md` §4.2 / §3.
//!
//! Grounded on `injection/file_index.rs`'s `FileIndex` +
//! `GLOBAL_FILE_INDEX: Lazy<Arc<Mutex<FileIndex>>>` pattern (the once_cell
//! global-state idiom used throughout this codebase), adapted from the
//! teacher's champion-name-keyed layout to the numeric
//! `<root>/<champion_id>/<skin_id>/<skin_id>.{archive,bundle}` tree `spec.md`
//! §3 specifies. Build is single-threaded; the `Mutex` only guards the swap
//! on rebuild, matching §5's "readers never block on a rebuild beyond the
//! swap of the root map".

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use once_cell::sync::Lazy;
use walkdir::WalkDir;

/// Same container format under two extensions (`spec.md` §9 open question:
/// "the source tolerates archives with either of two extensions ... the
/// resolver should preserve the original extension in logs").
pub const ARCHIVE_EXT: &str = "zip";
pub const BUNDLE_EXT: &str = "fantome";

#[derive(Debug, Default)]
pub struct ArchiveIndex {
    root: PathBuf,
    skins: HashMap<u32, PathBuf>,
    chromas: HashMap<u32, PathBuf>,
    champion_skins: HashMap<u32, HashSet<u32>>,
    last_built: Option<Instant>,
}

impl ArchiveIndex {
    pub fn build(root: &Path) -> Self {
        let mut index = Self::default();
        index.root = root.to_path_buf();
        index.scan(root);
        index.last_built = Some(Instant::now());
        index
    }

    /// The scan root, retained so the Archive Resolver's Named lookups
    /// (`spec.md` §4.2 rule 4) can search the archive tree without every
    /// caller threading the root path through separately.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn scan(&mut self, root: &Path) {
        if !root.exists() {
            return;
        }
        // Depth 2 from root: <root>/<champion_id>/<skin_id>/
        for champ_entry in WalkDir::new(root)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(Result::ok)
        {
            let Some(champion_id) = parse_u32_component(champ_entry.path()) else {
                continue;
            };
            for skin_entry in WalkDir::new(champ_entry.path())
                .min_depth(1)
                .max_depth(1)
                .into_iter()
                .filter_map(Result::ok)
            {
                let skin_dir = skin_entry.path();
                let Some(skin_id) = parse_u32_component(skin_dir) else {
                    continue;
                };
                if let Some(path) = find_with_either_ext(skin_dir, skin_id) {
                    self.skins.insert(skin_id, path);
                    self.champion_skins
                        .entry(champion_id)
                        .or_default()
                        .insert(skin_id);
                }
                for chroma_entry in WalkDir::new(skin_dir)
                    .min_depth(1)
                    .max_depth(1)
                    .into_iter()
                    .filter_map(Result::ok)
                {
                    let chroma_dir = chroma_entry.path();
                    let Some(chroma_id) = parse_u32_component(chroma_dir) else {
                        continue;
                    };
                    if let Some(path) = find_with_either_ext(chroma_dir, chroma_id) {
                        self.chromas.insert(chroma_id, path);
                    }
                }
            }
        }
    }

    pub fn get_skin(&self, id: u32) -> Option<&Path> {
        self.skins.get(&id).map(PathBuf::as_path)
    }

    pub fn get_chroma(&self, id: u32) -> Option<&Path> {
        self.chromas.get(&id).map(PathBuf::as_path)
    }

    pub fn skins_for_champion(&self, champion_id: u32) -> HashSet<u32> {
        self.champion_skins
            .get(&champion_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn invalidate(&mut self) {
        self.skins.clear();
        self.chromas.clear();
        self.champion_skins.clear();
        self.last_built = None;
    }

    pub fn refresh(&mut self, root: &Path) {
        self.invalidate();
        self.root = root.to_path_buf();
        self.scan(root);
        self.last_built = Some(Instant::now());
    }
}

fn parse_u32_component(path: &Path) -> Option<u32> {
    path.file_name()?.to_str()?.parse().ok()
}

fn find_with_either_ext(dir: &Path, id: u32) -> Option<PathBuf> {
    let archive = dir.join(format!("{id}.{ARCHIVE_EXT}"));
    if archive.exists() {
        return Some(archive);
    }
    let bundle = dir.join(format!("{id}.{BUNDLE_EXT}"));
    if bundle.exists() {
        return Some(bundle);
    }
    None
}

pub static GLOBAL_ARCHIVE_INDEX: Lazy<Arc<Mutex<ArchiveIndex>>> =
    Lazy::new(|| Arc::new(Mutex::new(ArchiveIndex::default())));

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_archive(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"fake").unwrap();
    }

    #[test]
    fn test_build_indexes_skins_and_chromas() {
        let dir = std::env::temp_dir().join(format!(
            "skin-injection-engine-index-test-{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        write_archive(&dir.join("99/99002/99002.zip"));
        write_archive(&dir.join("99/99002/99021/99021.zip"));

        let index = ArchiveIndex::build(&dir);
        let expected_skin = dir.join("99/99002/99002.zip");
        let expected_chroma = dir.join("99/99002/99021/99021.zip");
        assert_eq!(index.get_skin(99002), Some(expected_skin.as_path()));
        assert_eq!(index.get_chroma(99021), Some(expected_chroma.as_path()));
        assert!(index.skins_for_champion(99).contains(&99002));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_invalidate_clears_entries() {
        let mut index = ArchiveIndex::default();
        index.skins.insert(1, PathBuf::from("a"));
        index.invalidate();
        assert!(index.get_skin(1).is_none());
    }
}
