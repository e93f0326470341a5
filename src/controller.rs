//! Injection Controller (H), `spec.md` §4.7.
//!
//! Owns Path/Tool Resolver (A), Archive Index/Resolver (B/C), Mod Stager
//! (D), and the Overlay Pipeline (G); drives the Game Monitor (F) around
//! each request. Grounded on `injection/core.rs`'s
//! `inject_skins_and_misc_internal` for the overall shape (clean workspace,
//! stage mods, run overlay, report status) and on
//! `examples/original_source/injection/overlay/process_manager.py`'s
//! `kill_all_runoverlay_processes` for the name-filtered, timeout-bounded
//! cleanup operations.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use parking_lot::Mutex as FastMutex;

use crate::archive_index::{ArchiveIndex, GLOBAL_ARCHIVE_INDEX};
use crate::archive_resolver::resolve_skin_selection;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult, ToolFailureCause, ToolPhase};
use crate::events::{EngineEvent, SharedEventSink};
use crate::game_monitor::GameMonitor;
use crate::mod_stager::ModStager;
use crate::model::{
    base_skin_id, GamePhase, InjectionIntent, InjectionOutcome, ModRequest, SharedState,
};
use crate::overlay_pipeline::{self, OverlayPaths};
use crate::paths::{self, GameDirectory, ToolSet};

/// Bound on how long `inject` waits to acquire the single-writer lock
/// before reporting `Busy`. `spec.md` requires "a single try-lock with
/// timeout" but specifies no number; a short bound keeps the "must not
/// block" requirement honest while absorbing the lock's typical hold time
/// (a few milliseconds) against a near-simultaneous caller. Decided here,
/// not guessed mid-flight — recorded in DESIGN.md.
const LOCK_ACQUIRE_TIMEOUT: Duration = Duration::from_millis(50);

const GAME_PROCESS_NAME: &str = "League of Legends.exe";
const TOOL_PROCESS_NAME: &str = "mod-tools.exe";

pub struct InjectionController {
    user_data_dir: PathBuf,
    skins_root: PathBuf,
    config: Mutex<EngineConfig>,
    lock: FastMutex<()>,
    last_injection: Mutex<Option<Instant>>,
    game_dir: Mutex<Option<GameDirectory>>,
    tool_set: Mutex<Option<ToolSet>>,
    stager: ModStager,
    monitor: GameMonitor,
    shared_state: Arc<Mutex<SharedState>>,
    event_sink: SharedEventSink,
    /// Latch for `game_ended`'s "left `InProgress` after having entered it"
    /// de-bounce (`spec.md` §4.6). Reset at the start of every pipeline run.
    was_in_progress: AtomicBool,
}

impl InjectionController {
    pub fn new(
        user_data_dir: PathBuf,
        skins_root: PathBuf,
        monitor: GameMonitor,
        shared_state: Arc<Mutex<SharedState>>,
        event_sink: SharedEventSink,
    ) -> Self {
        let config = EngineConfig::load(&user_data_dir);
        let stager = ModStager::new(user_data_dir.join("injection"));
        Self {
            user_data_dir,
            skins_root,
            config: Mutex::new(config),
            lock: FastMutex::new(()),
            last_injection: Mutex::new(None),
            game_dir: Mutex::new(None),
            tool_set: Mutex::new(None),
            stager,
            monitor,
            shared_state,
            event_sink,
            was_in_progress: AtomicBool::new(false),
        }
    }

    pub fn refresh_archive_index(&self) {
        let mut index = GLOBAL_ARCHIVE_INDEX.lock().expect("archive index poisoned");
        index.refresh(&self.skins_root);
    }

    /// `refresh_threshold()`: re-reads configuration so a live settings
    /// change applies to the very next `inject` call.
    pub fn refresh_threshold(&self) {
        let fresh = EngineConfig::load(&self.user_data_dir);
        *self.config.lock().expect("config poisoned") = fresh;
    }

    fn ensure_initialized(&self) -> EngineResult<(GameDirectory, ToolSet)> {
        {
            let game_dir = self.game_dir.lock().expect("game_dir poisoned");
            let tool_set = self.tool_set.lock().expect("tool_set poisoned");
            if let (Some(g), Some(t)) = (&*game_dir, &*tool_set) {
                return Ok((g.clone(), t.clone()));
            }
        }

        let configured = self
            .config
            .lock()
            .expect("config poisoned")
            .league_path
            .clone();
        let resolved = paths::resolve_game_dir(configured.as_deref())?;

        let tools_dir = self.user_data_dir.join("cslol-tools");
        let tool_set = paths::check_tools(&tools_dir)
            .map_err(|missing| EngineError::Configuration(format!("missing tools: {:?}", missing.missing)))?;

        self.config
            .lock()
            .expect("config poisoned")
            .persist_discovered_game_dir(&self.user_data_dir, resolved.as_path().to_path_buf());
        *self.game_dir.lock().expect("game_dir poisoned") = Some(resolved.clone());
        *self.tool_set.lock().expect("tool_set poisoned") = Some(tool_set.clone());

        Ok((resolved, tool_set))
    }

    /// `inject(request) -> bool` (`spec.md` §4.7). Modeled as
    /// `Result<InjectionOutcome, EngineError>` so the §7 taxonomy is
    /// visible in the type instead of collapsed to a boolean.
    pub fn inject(&self, intent: InjectionIntent) -> EngineResult<InjectionOutcome> {
        let threshold = self
            .config
            .lock()
            .expect("config poisoned")
            .injection_threshold_duration();

        if let Some(last) = *self.last_injection.lock().expect("last_injection poisoned") {
            let elapsed = last.elapsed();
            if elapsed < threshold {
                return Err(EngineError::Cooldown {
                    remaining: threshold - elapsed,
                });
            }
        }

        let Some(_guard) = self.lock.try_lock_for(LOCK_ACQUIRE_TIMEOUT) else {
            return Err(EngineError::Busy);
        };

        self.event_sink.handle(EngineEvent::InjectionStarted);
        let result = self.inject_locked(intent);
        match &result {
            Ok(InjectionOutcome::Ok) => self.event_sink.handle(EngineEvent::InjectionCompleted),
            Ok(outcome) => self.event_sink.handle(EngineEvent::InjectionSkipped {
                reason: skip_reason(outcome),
            }),
            Err(err) => self.event_sink.handle(EngineEvent::InjectionFailed {
                reason: err.to_string(),
            }),
        }
        result
    }

    fn inject_locked(&self, intent: InjectionIntent) -> EngineResult<InjectionOutcome> {
        // Lazy initialization only gates paths that actually touch the game
        // directory or external tools. The base-skin/owned-skin
        // short-circuits below stage nothing and must succeed even before
        // the game directory has ever been resolved.
        match intent {
            InjectionIntent::Skin {
                champion_id,
                skin_id,
                chroma_id,
            } => {
                if chroma_id.is_none() && skin_id == base_skin_id(champion_id) {
                    self.monitor.stop();
                    return Ok(InjectionOutcome::SkippedBaseSkin);
                }
                if chroma_id.is_none()
                    && self
                        .shared_state
                        .lock()
                        .expect("shared state poisoned")
                        .owned_skin_ids
                        .contains(&skin_id)
                {
                    self.event_sink
                        .handle(EngineEvent::Log { message: format!("forcing client selection of owned skin {skin_id}") });
                    self.monitor.stop();
                    return Ok(InjectionOutcome::SkippedOwned);
                }

                let (game_dir, tool_set) = self.ensure_initialized()?;
                let archive = {
                    let index = GLOBAL_ARCHIVE_INDEX.lock().expect("archive index poisoned");
                    resolve_skin_selection(&index, champion_id, skin_id, chroma_id)
                }
                .ok_or_else(|| EngineError::Resolution(format!("skin {skin_id} (champion {champion_id})")))?;

                let request = ModRequest {
                    skin: Some(archive),
                    extras: Vec::new(),
                };
                self.run_pipeline(&game_dir, &tool_set, &request)
            }
            InjectionIntent::Mods {
                skin_id, selections, ..
            } => {
                let (game_dir, tool_set) = self.ensure_initialized()?;
                let skin_archive = skin_id.and_then(|id| {
                    let index = GLOBAL_ARCHIVE_INDEX.lock().expect("archive index poisoned");
                    index.get_skin(id).map(Path::to_path_buf)
                });
                let request = ModRequest {
                    skin: skin_archive,
                    extras: selections,
                };
                self.run_pipeline(&game_dir, &tool_set, &request)
            }
            InjectionIntent::CustomSkinMod {
                champion_id: _,
                descriptor,
                base_skin_if_unowned,
            } => {
                let (game_dir, tool_set) = self.ensure_initialized()?;
                // Unowned + mods path (spec.md §4.7): force the base skin
                // selection in the client first, then stage and run.
                self.event_sink.handle(EngineEvent::Log {
                    message: format!("forcing base skin {base_skin_if_unowned} before custom mod"),
                });
                let request = ModRequest {
                    skin: None,
                    extras: vec![crate::model::ModSelection {
                        category: crate::model::Category::CustomSkinMod,
                        archive: descriptor,
                    }],
                };
                self.run_pipeline(&game_dir, &tool_set, &request)
            }
        }
    }

    fn run_pipeline(
        &self,
        game_dir: &GameDirectory,
        tool_set: &ToolSet,
        request: &ModRequest,
    ) -> EngineResult<InjectionOutcome> {
        let mod_tools_path = tool_set
            .mod_tools_path
            .clone()
            .ok_or_else(|| EngineError::Configuration("mod-tools.exe missing".into()))?;

        self.monitor.start(
            GAME_PROCESS_NAME.to_string(),
            self.config
                .lock()
                .expect("config poisoned")
                .monitor_auto_resume_timeout_duration(),
        );

        self.was_in_progress.store(false, Ordering::SeqCst);

        self.stager.clean_workspace();
        let staged = self.stager.stage_request(request)?;
        if staged.is_empty() {
            self.monitor.stop();
            return Err(EngineError::Staging {
                name: "<none>".into(),
                source: crate::error::StagingCause::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "no mods staged",
                )),
            });
        }

        let overlay_paths = OverlayPaths {
            mods_dir: &self.stager.mods_dir(),
            overlay_dir: &self.stager.overlay_dir(),
            game_dir: game_dir.as_path(),
            mod_tools_path: &mod_tools_path,
        };

        let result = overlay_pipeline::mk_run_overlay(
            &staged,
            overlay_paths,
            Duration::from_secs(30),
            || self.game_ended(),
            &self.monitor,
        );

        match &result {
            Ok(()) => {
                self.monitor.stop();
                *self.last_injection.lock().expect("last_injection poisoned") = Some(Instant::now());
                Ok(InjectionOutcome::Ok)
            }
            Err(EngineError::ToolFailure {
                phase: ToolPhase::MkOverlay,
                ..
            }) => {
                // Do not resume here: the monitor's auto-resume safety
                // timeout is what recovers the game (spec.md §4.6 step 4).
                result.map(|_| InjectionOutcome::Ok)
            }
            Err(_) => {
                self.monitor.stop();
                result.map(|_| InjectionOutcome::Ok)
            }
        }
    }

    /// The game-ended predicate the Overlay Pipeline polls: true once the
    /// phase has left `InProgress` after having entered it. `GameStart` and
    /// `Reconnect` are transient states de-bounced against (`spec.md`
    /// §4.6): neither arms the latch nor counts as having left
    /// `InProgress`. Before `InProgress` is ever observed, this is always
    /// `false` — otherwise a pipeline started during e.g. `ChampSelect`
    /// would see its very first poll report the game as already ended.
    fn game_ended(&self) -> bool {
        let phase = self.shared_state.lock().expect("shared state poisoned").phase;
        if phase == GamePhase::InProgress {
            self.was_in_progress.store(true, Ordering::SeqCst);
            return false;
        }
        if matches!(phase, GamePhase::GameStart | GamePhase::Reconnect) {
            return false;
        }
        self.was_in_progress.load(Ordering::SeqCst)
    }

    pub fn clean_system(&self) {
        self.stager.clean_workspace();
    }

    pub fn stop_overlay(&self) {
        self.monitor.stop();
    }

    /// `kill_all_runoverlay()`: name-filtered process kill, matching
    /// `kill_all_runoverlay_processes`'s cheap name check. The Python
    /// original also inspects `cmdline()` for a `runoverlay` argument to
    /// avoid killing an unrelated `mod-tools.exe mkoverlay` run; the
    /// `windows` crate has no safe cmdline accessor, and the teacher's own
    /// Rust port (`cleanup_mod_tools_processes`) doesn't distinguish either
    /// — it kills every `mod-tools.exe`. This keeps that simplification.
    pub fn kill_all_runoverlay(&self) {
        self.kill_all_tool_processes();
    }

    pub fn kill_all_tool_processes(&self) {
        #[cfg(target_os = "windows")]
        {
            if let Ok(procs) = crate::winproc::enum_processes() {
                for proc in procs {
                    if proc.name.eq_ignore_ascii_case(TOOL_PROCESS_NAME) {
                        // Best-effort: a process that already exited
                        // between enumeration and this point is not an
                        // error.
                        let _ = std::process::Command::new("taskkill")
                            .args(["/F", "/PID", &proc.pid.to_string()])
                            .output();
                    }
                }
            }
        }
    }
}

fn skip_reason(outcome: &InjectionOutcome) -> &'static str {
    match outcome {
        InjectionOutcome::SkippedBaseSkin => "base skin",
        InjectionOutcome::SkippedOwned => "already owned",
        InjectionOutcome::Ok => "ok",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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

    fn make_controller(dir: &Path) -> InjectionController {
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
    fn test_base_skin_short_circuits_without_lock_contention() {
        let dir = std::env::temp_dir().join(format!(
            "skin-injection-engine-controller-test-{}",
            std::process::id()
        ));
        let controller = make_controller(&dir);
        let outcome = controller.inject(InjectionIntent::Skin {
            champion_id: 99,
            skin_id: 99000,
            chroma_id: None,
        });
        assert_eq!(outcome, Ok(InjectionOutcome::SkippedBaseSkin));
    }

    #[test]
    fn test_owned_skin_short_circuits() {
        let dir = std::env::temp_dir().join(format!(
            "skin-injection-engine-controller-test-owned-{}",
            std::process::id()
        ));
        let controller = make_controller(&dir);
        controller
            .shared_state
            .lock()
            .expect("shared state poisoned")
            .owned_skin_ids
            .insert(99001);
        let outcome = controller.inject(InjectionIntent::Skin {
            champion_id: 99,
            skin_id: 99001,
            chroma_id: None,
        });
        assert_eq!(outcome, Ok(InjectionOutcome::SkippedOwned));
    }

    #[test]
    fn test_cooldown_rejects_second_call() {
        let dir = std::env::temp_dir().join(format!(
            "skin-injection-engine-controller-test-cooldown-{}",
            std::process::id()
        ));
        let controller = make_controller(&dir);
        *controller.last_injection.lock().expect("poisoned") = Some(Instant::now());
        let outcome = controller.inject(InjectionIntent::Skin {
            champion_id: 99,
            skin_id: 99000,
            chroma_id: None,
        });
        // The cooldown check runs before the base-skin short-circuit, so a
        // freshly fabricated last_injection timestamp rejects this call
        // regardless of what it would otherwise resolve to.
        assert!(matches!(outcome, Err(EngineError::Cooldown { .. })));
    }
}
