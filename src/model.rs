//! Core data model (`spec.md` §3). Grounded on `injection/error.rs`'s
//! `Skin`/`MiscItem`/`InjectionRequest`/`ModState`, generalized to the
//! request shapes Injection Controller (H) and Archive Resolver (C) need.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A mod category, in the order the overlay tool expects them staged
/// (`spec.md` §4.3, `stage_request`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Map,
    Font,
    Announcer,
    Other,
    CustomSkinMod,
}

/// A single resolved mod selection: a category plus the archive backing it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModSelection {
    pub category: Category,
    pub archive: PathBuf,
}

/// One overlay build request, already resolved to concrete archive paths.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModRequest {
    pub skin: Option<PathBuf>,
    pub extras: Vec<ModSelection>,
}

impl ModRequest {
    pub fn is_empty(&self) -> bool {
        self.skin.is_none() && self.extras.is_empty()
    }
}

/// A logical identifier the Archive Resolver (C) can turn into an archive
/// path. Mirrors `spec.md` §4.2's three request shapes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArchiveRequest {
    Skin { champion_id: u32, skin_id: u32 },
    Chroma { champion_id: u32, chroma_id: u32 },
    Named {
        folder: String,
        filename_patterns: Vec<String>,
    },
}

/// What a caller asks the Injection Controller (H) to do (`spec.md` §4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum InjectionIntent {
    Skin {
        champion_id: u32,
        skin_id: u32,
        chroma_id: Option<u32>,
    },
    Mods {
        champion_id: u32,
        skin_id: Option<u32>,
        selections: Vec<ModSelection>,
    },
    CustomSkinMod {
        champion_id: u32,
        descriptor: PathBuf,
        base_skin_if_unowned: u32,
    },
}

/// Outcome of `inject`. `Ok` carries nothing extra; the informational and
/// error variants mirror the §7 taxonomy but are returned, not raised, since
/// `SkippedBaseSkin`/`SkippedOwned` are not failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InjectionOutcome {
    Ok,
    SkippedBaseSkin,
    SkippedOwned,
}

/// Inputs the State/Event Router (I) consumes from external collaborators
/// (`spec.md` §4.8, "Consumed SharedState fields"). The core treats this as
/// read-only except for the narrowly scoped clears documented there.
#[derive(Debug, Clone, Default)]
pub struct SharedState {
    pub phase: GamePhase,
    pub locked_champ_id: Option<u32>,
    pub last_hovered_skin_id: Option<u32>,
    pub selected_chroma_id: Option<u32>,
    pub owned_skin_ids: std::collections::HashSet<u32>,
    pub selected_custom_mod: Option<ModSelection>,
    pub selected_map_mod: Option<ModSelection>,
    pub selected_font_mod: Option<ModSelection>,
    pub selected_announcer_mod: Option<ModSelection>,
    pub selected_other_mod: Option<ModSelection>,
    pub historic_mode_active: bool,
    pub historic_skin_id: Option<u32>,
    pub random_mode_active: bool,
    pub random_skin_id: Option<u32>,
}

impl SharedState {
    /// Per-game-state clear on a new champion lock (`spec.md` §4.8).
    pub fn clear_per_game_state(&mut self) {
        self.last_hovered_skin_id = None;
        self.selected_chroma_id = None;
        self.selected_custom_mod = None;
        self.selected_map_mod = None;
        self.selected_font_mod = None;
        self.selected_announcer_mod = None;
        self.selected_other_mod = None;
        self.historic_mode_active = false;
        self.historic_skin_id = None;
        self.random_mode_active = false;
        self.random_skin_id = None;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GamePhase {
    #[default]
    None,
    Lobby,
    ChampSelect,
    GameStart,
    InProgress,
    Reconnect,
    WaitingForStats,
    PreEndOfGame,
    EndOfGame,
}

/// Returns the champion's base skin id, used by the base-skin short-circuit
/// in `spec.md` §4.7 ("id `champion_id * 1000`").
pub fn base_skin_id(champion_id: u32) -> u32 {
    champion_id * 1000
}
