//! Path/Tool Resolver (A), `spec.md` §4.1.
//!
//! Grounded on `commands/league_detection.rs` (`auto_detect_league`'s common
//! install paths + registry fallback, `select_league_directory`'s
//! executable-presence validation) and `injection/core.rs`'s
//! `SkinInjector::new` multi-location `mod-tools.exe` search. Generalized
//! away from the PowerShell `FolderBrowserDialog`/registry-query subprocess
//! calls (a UI-driven picker, out of scope here) to pure discovery: explicit
//! configured path, then a running-process scan.

use std::path::{Path, PathBuf};

use crate::error::{EngineError, EngineResult};

pub const GAME_EXECUTABLE: &str = "League of Legends.exe";
pub const CLIENT_EXECUTABLE: &str = "LeagueClient.exe";

#[cfg(target_os = "windows")]
const COMMON_INSTALL_DIRS: &[&str] = &[
    r"C:\Riot Games\League of Legends",
    r"C:\Program Files\Riot Games\League of Legends",
    r"C:\Program Files (x86)\Riot Games\League of Legends",
];

/// An absolute path containing the game executable. Invariant enforced by
/// construction: `GameDirectory::validate` is the only way to obtain one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameDirectory(PathBuf);

impl GameDirectory {
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    fn validate(dir: PathBuf) -> Option<Self> {
        if dir.join(GAME_EXECUTABLE).exists() {
            Some(Self(dir))
        } else {
            None
        }
    }
}

/// The set of binary/data files the overlay tool requires. Presence is
/// checked once at startup; absence is reported, not fatal (`spec.md` §3,
/// "ToolSet").
#[derive(Debug, Clone, Default)]
pub struct ToolSet {
    pub mod_tools_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct MissingTools {
    pub missing: Vec<&'static str>,
}

/// `check_tools(tools_dir) -> Result<ToolSet, MissingTools>`.
pub fn check_tools(tools_dir: &Path) -> Result<ToolSet, MissingTools> {
    let candidate = tools_dir.join("mod-tools.exe");
    if candidate.exists() {
        Ok(ToolSet {
            mod_tools_path: Some(candidate),
        })
    } else {
        Err(MissingTools {
            missing: vec!["mod-tools.exe"],
        })
    }
}

/// `resolve_game_dir() -> Option<GameDirectory>` (`spec.md` §4.1).
///
/// `configured` is the previously-persisted path, if any
/// (`EngineConfig::league_path`). On success the caller is responsible for
/// persisting the result via `EngineConfig::persist_discovered_game_dir`
/// (step 3: "never persist an invalid path" is enforced by only ever
/// returning a validated `GameDirectory`).
pub fn resolve_game_dir(configured: Option<&Path>) -> EngineResult<GameDirectory> {
    if let Some(configured) = configured {
        if let Some(dir) = GameDirectory::validate(configured.to_path_buf()) {
            return Ok(dir);
        }
    }

    if let Some(dir) = discover_from_running_process() {
        return Ok(dir);
    }

    #[cfg(target_os = "windows")]
    for candidate in COMMON_INSTALL_DIRS {
        let game_dir = PathBuf::from(candidate).join("Game");
        if let Some(dir) = GameDirectory::validate(game_dir) {
            return Ok(dir);
        }
    }

    Err(EngineError::Configuration(
        "could not locate League of Legends game directory".into(),
    ))
}

/// Step 2: "enumerate running processes; if the client process is found,
/// derive the game directory from its executable path by taking the parent
/// and appending a 'Game' segment, or by ascending to the installer root."
///
/// Not present in any Rust example in the corpus (the teacher drives this
/// through a UI folder picker and a registry query instead); implemented
/// fresh on the `windows` crate's process snapshot APIs, which the teacher
/// already depends on for Process Supervisor needs.
#[cfg(target_os = "windows")]
fn discover_from_running_process() -> Option<GameDirectory> {
    use crate::winproc::{enum_processes, process_image_path};

    for proc in enum_processes().ok()? {
        let name_lower = proc.name.to_lowercase();
        if name_lower != "league of legends.exe" && name_lower != "leagueclient.exe" {
            continue;
        }
        let Some(exe_path) = process_image_path(proc.pid) else {
            continue;
        };
        let exe_dir = exe_path.parent()?;

        // Layout 1: exe already lives directly under the Game directory.
        if let Some(dir) = GameDirectory::validate(exe_dir.to_path_buf()) {
            return Some(dir);
        }
        // Layout 2: client exe lives at the installer root; Game is a
        // sibling directory.
        if let Some(dir) = GameDirectory::validate(exe_dir.join("Game")) {
            return Some(dir);
        }
        // Layout 3: ascend one level (exe under Game/<subdir>/) to the
        // installer root, then descend into Game.
        if let Some(parent) = exe_dir.parent() {
            if let Some(dir) = GameDirectory::validate(parent.join("Game")) {
                return Some(dir);
            }
        }
    }
    None
}

#[cfg(not(target_os = "windows"))]
fn discover_from_running_process() -> Option<GameDirectory> {
    None
}
