//! State/Event Router (I), `spec.md` §4.8.
//!
//! Grounded on `commands/lcu_watcher/watcher.rs`'s gameflow-phase match arms
//! (`"ChampSelect" => ...`, `"InProgress" => ...`) that call into the
//! injector directly from the websocket event loop. The engine generalizes
//! that into a standalone router over the same `SharedState`/`GameMonitor`
//! handles `InjectionController` (H) already owns, per `spec.md` §9's
//! "explicit handles, not module-level state" re-architecture note.
//!
//! The router produces effects only by calling `InjectionController`/
//! `GameMonitor` operations; it performs no IO of its own (`spec.md` §4.8,
//! "Produced effects: calls to H operations; no direct IO").

use std::sync::{Arc, Mutex};

use crate::controller::InjectionController;
use crate::model::{GamePhase, SharedState};

/// Translates external phase/lock events into controller calls.
///
/// Holds the same `SharedState` handle as the controller it drives, plus a
/// reference to the controller itself so phase transitions can trigger
/// monitor stop/start and state resets without the caller wiring that up at
/// every call site.
pub struct StateEventRouter {
    controller: Arc<InjectionController>,
    shared_state: Arc<Mutex<SharedState>>,
}

impl StateEventRouter {
    pub fn new(controller: Arc<InjectionController>, shared_state: Arc<Mutex<SharedState>>) -> Self {
        Self {
            controller,
            shared_state,
        }
    }

    /// `on_phase_change(new_phase)` (`spec.md` §4.8): triggers resets on
    /// `ChampSelect` entry, monitor stop and cleanup on `InProgress` entry,
    /// full reset on exit (phase returning to `None`/`Lobby`).
    pub fn on_phase_change(&self, new_phase: GamePhase) {
        let previous = {
            let mut state = self.shared_state.lock().expect("shared state poisoned");
            let previous = state.phase;
            state.phase = new_phase;
            previous
        };

        if previous == new_phase {
            return;
        }

        match new_phase {
            GamePhase::ChampSelect => {
                self.shared_state
                    .lock()
                    .expect("shared state poisoned")
                    .clear_per_game_state();
            }
            GamePhase::InProgress => {
                self.controller.stop_overlay();
                self.controller.clean_system();
            }
            GamePhase::None | GamePhase::Lobby => {
                self.shared_state
                    .lock()
                    .expect("shared state poisoned")
                    .clear_per_game_state();
                {
                    let mut state = self.shared_state.lock().expect("shared state poisoned");
                    state.locked_champ_id = None;
                }
                self.controller.stop_overlay();
            }
            _ => {}
        }
    }

    /// `on_own_champion_locked(champion_id)` (`spec.md` §4.8): first-time or
    /// exchange lock clears all per-game state and prepares the controller
    /// for an injection trigger (the trigger itself is raised by the
    /// skin-selection collaborator once it observes the cleared state and a
    /// hovered/selected skin; this router only performs the reset, per
    /// "Produced effects: calls to H operations; no direct IO").
    pub fn on_own_champion_locked(&self, champion_id: u32) {
        let mut state = self.shared_state.lock().expect("shared state poisoned");
        let is_exchange = state.locked_champ_id.is_some() && state.locked_champ_id != Some(champion_id);
        state.clear_per_game_state();
        state.locked_champ_id = Some(champion_id);
        drop(state);

        if is_exchange {
            self.controller.stop_overlay();
        }
    }

    /// `on_loadout_tick(seconds_remaining)` (`spec.md` §4.8): unused for
    /// monitor start, kept as a hook for future policies. Deliberately a
    /// no-op body; the spec is explicit that this callback currently does
    /// nothing but must exist as an extension point.
    pub fn on_loadout_tick(&self, _seconds_remaining: u32) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::events::default_sink;
    use crate::game_monitor::{GameMonitor, ProcessLocator};

    struct NeverFindLocator;
    impl ProcessLocator for NeverFindLocator {
        fn find(&self, _name: &str) -> Option<u32> {
            None
        }
        fn suspend(&self, _pid: u32) -> bool {
            true
        }
        fn resume(&self, _pid: u32) {}
    }

    fn make_router(dir: &std::path::Path) -> (StateEventRouter, Arc<Mutex<SharedState>>) {
        let shared_state = Arc::new(Mutex::new(SharedState::default()));
        let monitor = GameMonitor::new(Arc::new(NeverFindLocator), default_sink());
        let controller = Arc::new(InjectionController::new(
            dir.to_path_buf(),
            dir.join("skins"),
            monitor,
            shared_state.clone(),
            default_sink(),
        ));
        let _ = EngineConfig::load(dir);
        (StateEventRouter::new(controller, shared_state.clone()), shared_state)
    }

    #[test]
    fn test_locking_champion_clears_per_game_state() {
        let dir = std::env::temp_dir().join(format!(
            "skin-injection-engine-router-test-{}",
            std::process::id()
        ));
        let (router, shared_state) = make_router(&dir);
        shared_state.lock().expect("poisoned").last_hovered_skin_id = Some(123);
        router.on_own_champion_locked(99);
        let state = shared_state.lock().expect("poisoned");
        assert_eq!(state.locked_champ_id, Some(99));
        assert!(state.last_hovered_skin_id.is_none());
    }

    #[test]
    fn test_champ_select_entry_resets_selection_state() {
        let dir = std::env::temp_dir().join(format!(
            "skin-injection-engine-router-test-champselect-{}",
            std::process::id()
        ));
        let (router, shared_state) = make_router(&dir);
        shared_state.lock().expect("poisoned").selected_chroma_id = Some(5);
        router.on_phase_change(GamePhase::ChampSelect);
        assert!(shared_state
            .lock()
            .expect("poisoned")
            .selected_chroma_id
            .is_none());
    }

    #[test]
    fn test_repeated_phase_is_a_no_op() {
        let dir = std::env::temp_dir().join(format!(
            "skin-injection-engine-router-test-repeat-{}",
            std::process::id()
        ));
        let (router, shared_state) = make_router(&dir);
        router.on_phase_change(GamePhase::ChampSelect);
        shared_state.lock().expect("poisoned").selected_chroma_id = Some(7);
        router.on_phase_change(GamePhase::ChampSelect);
        assert_eq!(
            shared_state.lock().expect("poisoned").selected_chroma_id,
            Some(7)
        );
    }
}
