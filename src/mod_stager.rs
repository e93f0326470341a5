//! Mod Stager (D), `spec.md` §4.3.
//!
//! Grounded on `injection/skin_file.rs` (`extract_skin_file`/
//! `extract_skin_file_mmap`'s `enclosed_name()`-guarded zip extraction, the
//! memory-mapping threshold for files over 1 MiB) and `injection/mod_tools.rs`'s
//! `copy_mod_to_game` (`WalkDir`-based recursive tree copy, existing-target
//! removal first).

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;
use zip::ZipArchive;

use crate::error::{EngineError, EngineResult, StagingCause};
use crate::model::{Category, ModRequest};

/// Files at or above this size are extracted via `memmap2` instead of
/// buffered reads, matching `extract_skin_file_mmap`'s threshold.
const MMAP_THRESHOLD_BYTES: u64 = 1_048_576;

pub struct ModStager {
    workspace_root: PathBuf,
}

impl ModStager {
    pub fn new(workspace_root: PathBuf) -> Self {
        Self { workspace_root }
    }

    pub fn mods_dir(&self) -> PathBuf {
        self.workspace_root.join("mods")
    }

    pub fn overlay_dir(&self) -> PathBuf {
        self.workspace_root.join("overlay")
    }

    /// Deletes `mods/` and `overlay/` contents recursively then recreates
    /// them empty. Tolerates files locked by a previous run: each removal
    /// failure is logged and skipped rather than aborting the clean.
    pub fn clean_workspace(&self) {
        for dir in [self.mods_dir(), self.overlay_dir()] {
            if dir.exists() {
                if let Err(err) = fs::remove_dir_all(&dir) {
                    tracing::warn!(dir = %dir.display(), error = %err, "failed to remove workspace dir, continuing best-effort");
                }
            }
            if let Err(err) = fs::create_dir_all(&dir) {
                tracing::warn!(dir = %dir.display(), error = %err, "failed to recreate workspace dir");
            }
        }
    }

    /// Extracts `archive` into a freshly named subfolder of `mods/` and
    /// returns the mod folder name. The folder name is the archive stem;
    /// a name collision removes the existing folder first.
    pub fn extract(&self, archive: &Path) -> EngineResult<String> {
        let name = mod_folder_name_for(archive)
            .ok_or_else(|| EngineError::Resolution(format!("{}", archive.display())))?;
        let dest = self.mods_dir().join(&name);
        if dest.exists() {
            fs::remove_dir_all(&dest).map_err(|e| EngineError::Staging {
                name: name.clone(),
                source: StagingCause::Io(e),
            })?;
        }
        fs::create_dir_all(&dest).map_err(|e| EngineError::Staging {
            name: name.clone(),
            source: StagingCause::Io(e),
        })?;

        let result = extract_archive_into(archive, &dest);
        if let Err(err) = result {
            let _ = fs::remove_dir_all(&dest);
            return Err(EngineError::Staging { name, source: err });
        }
        Ok(name)
    }

    /// Copies a mod directory tree (e.g. one already extracted elsewhere)
    /// into `mods/<name>`, matching `copy_mod_to_game`'s semantics.
    pub fn copy_tree(&self, source: &Path) -> EngineResult<String> {
        let name = source
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| EngineError::Resolution(format!("{}", source.display())))?;
        let dest = self.mods_dir().join(&name);

        let copy = || -> Result<(), StagingCause> {
            if dest.exists() {
                fs::remove_dir_all(&dest)?;
            }
            fs::create_dir_all(&dest)?;
            for entry in WalkDir::new(source) {
                let entry = entry?;
                let rel = entry
                    .path()
                    .strip_prefix(source)
                    .expect("walkdir yields children of source");
                let target = dest.join(rel);
                if entry.file_type().is_dir() {
                    fs::create_dir_all(&target)?;
                } else if entry.file_type().is_file() {
                    if let Some(parent) = target.parent() {
                        fs::create_dir_all(parent)?;
                    }
                    fs::copy(entry.path(), &target)?;
                }
            }
            Ok(())
        };

        copy().map_err(|source| EngineError::Staging { name: name.clone(), source })?;
        Ok(name)
    }

    /// Stages, in order, the base skin archive (if any), then each extra
    /// category in the order given. Per-mod extraction failures are
    /// recorded and the affected mod is skipped; the whole call fails only
    /// if nothing staged at all.
    pub fn stage_request(&self, request: &ModRequest) -> EngineResult<Vec<String>> {
        let mut staged = Vec::new();
        let mut failures = Vec::new();

        if let Some(skin) = &request.skin {
            match self.extract(skin) {
                Ok(name) => staged.push(name),
                Err(err) => failures.push(err),
            }
        }
        for selection in ordered(&request.extras) {
            match self.extract(&selection.archive) {
                Ok(name) => staged.push(name),
                Err(err) => failures.push(err),
            }
        }

        if staged.is_empty() && !failures.is_empty() {
            return Err(failures.into_iter().next().expect("checked non-empty"));
        }
        for err in failures {
            tracing::warn!(error = %err, "mod skipped during staging");
        }
        Ok(staged)
    }
}

/// Enforces the fixed staging order from `spec.md` §4.3: "base skin archive
/// (if any), custom skin mod, map, font, announcer, other".
fn ordered(extras: &[crate::model::ModSelection]) -> Vec<&crate::model::ModSelection> {
    let order = [
        Category::CustomSkinMod,
        Category::Map,
        Category::Font,
        Category::Announcer,
        Category::Other,
    ];
    let mut out = Vec::with_capacity(extras.len());
    for category in order {
        out.extend(extras.iter().filter(|s| s.category == category));
    }
    out
}

fn mod_folder_name_for(archive: &Path) -> Option<String> {
    archive.file_stem()?.to_str().map(str::to_string)
}

fn extract_archive_into(archive: &Path, dest: &Path) -> Result<(), StagingCause> {
    let metadata = fs::metadata(archive)?;
    if metadata.len() >= MMAP_THRESHOLD_BYTES {
        extract_mmap(archive, dest)
    } else {
        extract_buffered(archive, dest)
    }
}

fn extract_buffered(archive: &Path, dest: &Path) -> Result<(), StagingCause> {
    let file = File::open(archive)?;
    let mut zip = ZipArchive::new(file)?;
    extract_entries(&mut zip, dest)
}

fn extract_mmap(archive: &Path, dest: &Path) -> Result<(), StagingCause> {
    let file = File::open(archive)?;
    // Safety: the archive file is not concurrently mutated by another
    // process while this extraction runs; this mirrors the same
    // unchecked assumption `extract_skin_file_mmap` makes.
    let mmap = unsafe { memmap2::MmapOptions::new().map(&file)? };
    let cursor = io::Cursor::new(&mmap[..]);
    let mut zip = ZipArchive::new(cursor)?;
    extract_entries(&mut zip, dest)
}

fn extract_entries<R: io::Read + io::Seek>(
    zip: &mut ZipArchive<R>,
    dest: &Path,
) -> Result<(), StagingCause> {
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        let Some(enclosed) = entry.enclosed_name() else {
            continue;
        };
        let out_path = dest.join(enclosed);
        if entry.name().ends_with('/') {
            fs::create_dir_all(&out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out_file = File::create(&out_path)?;
        io::copy(&mut entry, &mut out_file)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mod_folder_name_for_uses_stem() {
        let path = Path::new("/skins/99/99002/99002.zip");
        assert_eq!(mod_folder_name_for(path), Some("99002".to_string()));
    }

    #[test]
    fn test_ordered_puts_custom_skin_mod_before_others() {
        use crate::model::ModSelection;
        let extras = vec![
            ModSelection { category: Category::Other, archive: PathBuf::from("a") },
            ModSelection { category: Category::CustomSkinMod, archive: PathBuf::from("b") },
        ];
        let result = ordered(&extras);
        assert_eq!(result[0].category, Category::CustomSkinMod);
    }

    #[test]
    fn test_clean_workspace_recreates_empty_dirs() {
        let root = std::env::temp_dir().join(format!(
            "skin-injection-engine-stager-test-{}",
            std::process::id()
        ));
        let stager = ModStager::new(root.clone());
        fs::create_dir_all(stager.mods_dir().join("leftover")).unwrap();
        stager.clean_workspace();
        assert!(stager.mods_dir().read_dir().unwrap().next().is_none());
        let _ = fs::remove_dir_all(&root);
    }
}
