//! Integration coverage for the Injection Controller (H) against `spec.md`
//! §8 end-to-end scenarios S1/S2 (short-circuits leave the workspace
//! untouched) and the "workspace cleanliness" invariant.

use injection_engine::events::default_sink;
use injection_engine::game_monitor::{GameMonitor, ProcessLocator};
use injection_engine::{InjectionController, InjectionIntent, InjectionOutcome, SharedState};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

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

fn scratch_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "skin-injection-engine-it-controller-{name}-{}",
        std::process::id()
    ))
}

fn make_controller(dir: &std::path::Path) -> InjectionController {
    let monitor = GameMonitor::new(Arc::new(NeverFindLocator), default_sink());
    InjectionController::new(
        dir.to_path_buf(),
        dir.join("skins"),
        monitor,
        Arc::new(Mutex::new(SharedState::default())),
        default_sink(),
    )
}

#[test]
fn base_skin_short_circuit_leaves_the_workspace_untouched() {
    let dir = scratch_dir("base-skin");
    let _ = std::fs::remove_dir_all(&dir);
    let controller = make_controller(&dir);

    let outcome = controller.inject(InjectionIntent::Skin {
        champion_id: 99,
        skin_id: 99000,
        chroma_id: None,
    });

    assert_eq!(outcome, Ok(InjectionOutcome::SkippedBaseSkin));
    assert!(
        !dir.join("injection").join("mods").exists(),
        "the base skin short-circuit must not stage anything"
    );

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn owned_skin_short_circuit_leaves_the_workspace_untouched() {
    let dir = scratch_dir("owned-skin");
    let _ = std::fs::remove_dir_all(&dir);
    let controller = make_controller(&dir);

    // `ensure_initialized`'s own state is private to the controller, so this
    // exercises the short-circuit by driving the same public shared-state
    // handle an embedder would use.
    let shared_state: Arc<Mutex<SharedState>> = Arc::new(Mutex::new(SharedState::default()));
    shared_state.lock().unwrap().owned_skin_ids.insert(99001);
    let monitor = GameMonitor::new(Arc::new(NeverFindLocator), default_sink());
    let controller = InjectionController::new(
        dir.clone(),
        dir.join("skins"),
        monitor,
        shared_state,
        default_sink(),
    );

    let outcome = controller.inject(InjectionIntent::Skin {
        champion_id: 99,
        skin_id: 99001,
        chroma_id: None,
    });

    assert_eq!(outcome, Ok(InjectionOutcome::SkippedOwned));
    assert!(!dir.join("injection").join("mods").exists());

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn clean_system_recreates_an_empty_workspace() {
    let dir = scratch_dir("clean-system");
    let _ = std::fs::remove_dir_all(&dir);
    let controller = make_controller(&dir);

    std::fs::create_dir_all(dir.join("injection/mods/leftover")).unwrap();
    controller.clean_system();

    let mods_dir = dir.join("injection/mods");
    assert!(mods_dir.exists());
    assert!(
        mods_dir.read_dir().unwrap().next().is_none(),
        "clean_system must leave the mods dir empty"
    );

    let _ = std::fs::remove_dir_all(&dir);
}
