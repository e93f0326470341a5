//! Archive Resolver (C), `spec.md` §4.2.
//!
//! Grounded on `injection/file_index.rs`'s `find_fantome_for_skin` (indexed
//! lookup by `(champion_id, chroma_id)` with a skin-id substring
//! fallback) and `injection/skin_file.rs`'s `find_skin_file_for_skin`
//! (filename/extension-swap fallback search), generalized onto the Archive
//! Index's numeric tree instead of the teacher's champion-name/flat-fantome
//! layout.

use std::path::{Path, PathBuf};

use crate::archive_index::ArchiveIndex;
use crate::model::ArchiveRequest;

/// Fixed table of chroma-id ranges that are actually hard-coded "form"/"HOL"
/// variants rather than real chromas (`spec.md` §9, "an input table, not a
/// computation"). The exact range-to-variant mapping belongs beside this
/// resolver per the spec's instruction; the entries below are the shape of
/// that table (folder name + candidate filenames to search for), not a
/// claim of exhaustiveness — extending it is a data change, not a code
/// change.
struct NamedFormRange {
    range: std::ops::RangeInclusive<u32>,
    folder: &'static str,
    filename_patterns: &'static [&'static str],
}

const FORM_RANGES: &[NamedFormRange] = &[NamedFormRange {
    range: 900000..=900999,
    folder: "forms",
    filename_patterns: &["human_form", "alt_form"],
}];

fn named_range_for_chroma(chroma_id: u32) -> Option<&'static NamedFormRange> {
    FORM_RANGES.iter().find(|r| r.range.contains(&chroma_id))
}

/// Resolves a logical skin selection, applying rule 2 of `spec.md` §4.2: a
/// `chroma_id` delegates straight to the chroma path; otherwise the skin
/// path is tried first and, if absent, the same id is re-tried as a chroma
/// ("handles UI-layer confusion").
pub fn resolve_skin_selection(
    index: &ArchiveIndex,
    champion_id: u32,
    skin_id: u32,
    chroma_id: Option<u32>,
) -> Option<PathBuf> {
    if let Some(chroma_id) = chroma_id {
        return resolve(index, &ArchiveRequest::Chroma {
            champion_id,
            chroma_id,
        });
    }
    if let Some(path) = resolve(index, &ArchiveRequest::Skin {
        champion_id,
        skin_id,
    }) {
        return Some(path);
    }
    resolve(index, &ArchiveRequest::Chroma {
        champion_id,
        chroma_id: skin_id,
    })
}

/// `resolve(request) -> Option<ArchivePath>` (`spec.md` §4.2). Rule 1
/// ("if the input is a literal existing path, return it") is handled before
/// a caller ever builds an `ArchiveRequest`: `ModSelection::archive` and
/// `ModRequest::skin` already carry resolved paths for callers that hand the
/// engine a literal path (e.g. a custom skin mod descriptor), so this
/// function only ever sees logical ids that still need lookup (see
/// DESIGN.md).
pub fn resolve(index: &ArchiveIndex, request: &ArchiveRequest) -> Option<PathBuf> {
    match request {
        ArchiveRequest::Skin { skin_id, .. } => index.get_skin(*skin_id).map(Path::to_path_buf),
        ArchiveRequest::Chroma { chroma_id, .. } => {
            if let Some(form) = named_range_for_chroma(*chroma_id) {
                return resolve(index, &ArchiveRequest::Named {
                    folder: form.folder.to_string(),
                    filename_patterns: form
                        .filename_patterns
                        .iter()
                        .map(|s| s.to_string())
                        .collect(),
                });
            }
            index.get_chroma(*chroma_id).map(Path::to_path_buf)
        }
        ArchiveRequest::Named {
            folder,
            filename_patterns,
        } => resolve_named(index, folder, filename_patterns),
    }
}

fn resolve_named(
    index: &ArchiveIndex,
    folder: &str,
    filename_patterns: &[String],
) -> Option<PathBuf> {
    let base = index.root().join(folder);
    for pattern in filename_patterns {
        let archive = base.join(format!("{pattern}.{}", crate::archive_index::ARCHIVE_EXT));
        if archive.exists() {
            return Some(archive);
        }
        let bundle = base.join(format!("{pattern}.{}", crate::archive_index::BUNDLE_EXT));
        if bundle.exists() {
            return Some(bundle);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_form_range_lookup() {
        assert!(named_range_for_chroma(900500).is_some());
        assert!(named_range_for_chroma(1).is_none());
    }

    #[test]
    fn test_resolve_skin_falls_back_to_chroma() {
        // No skin entry for 99021 under 99/99002/, but a chroma entry
        // exists at 99/99002/99021/99021.zip.
        let dir = std::env::temp_dir().join(format!(
            "skin-injection-engine-resolver-test-{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        let chroma_dir = dir.join("99/99002/99021");
        std::fs::create_dir_all(&chroma_dir).unwrap();
        std::fs::write(chroma_dir.join("99021.zip"), b"fake").unwrap();

        let index = ArchiveIndex::build(&dir);
        let resolved = resolve_skin_selection(&index, 99, 99021, None);
        assert_eq!(resolved, Some(chroma_dir.join("99021.zip")));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_named_form_chroma_resolves_from_index_root() {
        let dir = std::env::temp_dir().join(format!(
            "skin-injection-engine-resolver-named-test-{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        let forms_dir = dir.join("forms");
        std::fs::create_dir_all(&forms_dir).unwrap();
        std::fs::write(forms_dir.join("human_form.zip"), b"fake").unwrap();

        let index = ArchiveIndex::build(&dir);
        let resolved = resolve(&index, &ArchiveRequest::Chroma {
            champion_id: 99,
            chroma_id: 900500,
        });
        assert_eq!(resolved, Some(forms_dir.join("human_form.zip")));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
