//! Overlay Pipeline (G), `spec.md` §4.6.
//!
//! Grounded on `injection/mod_tools.rs`'s `run_overlay` (the exact
//! `mkoverlay`/`runoverlay` command shapes, config.json contents, retry
//! handling) sequenced through the generalized `ProcessSupervisor` (E)
//! instead of ad-hoc `Command::output()`/`.spawn()` calls, and on
//! `examples/original_source/injection/overlay/process_manager.py`'s
//! graceful-terminate-then-kill shutdown for the game-ended case.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use crate::error::{EngineError, EngineResult, ToolFailureCause, ToolPhase};
use crate::game_monitor::GameMonitor;
use crate::process_supervisor::{Exit, OutputMode, Supervised};

/// Short cadence for polling `runoverlay` against the game-ended predicate
/// (`spec.md` §4.6 step 7, "order of 100 ms").
const RUNOVERLAY_POLL_INTERVAL: Duration = Duration::from_millis(100);
const RUNOVERLAY_TERMINATE_TIMEOUT: Duration = Duration::from_secs(3);

pub struct OverlayPaths<'a> {
    pub mods_dir: &'a Path,
    pub overlay_dir: &'a Path,
    pub game_dir: &'a Path,
    pub mod_tools_path: &'a Path,
}

/// `mk_run_overlay(mods, timeout, game_ended_predicate, monitor) -> Result`
/// (`spec.md` §4.6). `game_ended_predicate` is supplied by the Injection
/// Controller (H); it returns `true` once the phase has left `InProgress`
/// after having entered it.
pub fn mk_run_overlay(
    mod_folder_names: &[String],
    paths: OverlayPaths<'_>,
    mkoverlay_timeout: Duration,
    mut game_ended_predicate: impl FnMut() -> bool,
    monitor: &GameMonitor,
) -> EngineResult<()> {
    run_mkoverlay(mod_folder_names, &paths, mkoverlay_timeout)?;

    let config_path = paths.overlay_dir.join("cslol-config.json");
    std::fs::write(&config_path, br#"{"enableMods":true}"#).map_err(|e| {
        EngineError::ToolFailure {
            phase: ToolPhase::MkOverlay,
            cause: ToolFailureCause::SpawnFailed(e),
        }
    })?;

    let mut runoverlay_command = Command::new(paths.mod_tools_path);
    runoverlay_command.args([
        "runoverlay",
        paths.overlay_dir.to_str().unwrap_or_default(),
        config_path.to_str().unwrap_or_default(),
        &format!("--game:{}", paths.game_dir.to_str().unwrap_or_default()),
        "--opts:configless",
    ]);

    let mut runoverlay = Supervised::spawn(runoverlay_command, OutputMode::Null, OutputMode::Null, false)
        .map_err(|e| EngineError::ToolFailure {
            phase: ToolPhase::RunOverlay,
            cause: ToolFailureCause::SpawnFailed(e),
        })?;

    // mkoverlay completes-happens-before this resume call
    // happens-before runoverlay has a chance to run further — the
    // ordering guarantee spec.md §5 exists to enforce.
    monitor.resume();

    loop {
        if game_ended_predicate() {
            terminate_gracefully(&mut runoverlay);
            return Ok(());
        }
        match runoverlay.wait(RUNOVERLAY_POLL_INTERVAL) {
            Exit::Exited(code) => {
                return if code == 0 {
                    Ok(())
                } else {
                    Err(EngineError::ToolFailure {
                        phase: ToolPhase::RunOverlay,
                        cause: ToolFailureCause::ExitCode(code),
                    })
                };
            }
            Exit::TimedOut => continue,
            Exit::Killed => return Ok(()),
        }
    }
}

fn run_mkoverlay(
    mod_folder_names: &[String],
    paths: &OverlayPaths<'_>,
    timeout: Duration,
) -> EngineResult<()> {
    let mut command = Command::new(paths.mod_tools_path);
    command.args([
        "mkoverlay",
        paths.mods_dir.to_str().unwrap_or_default(),
        paths.overlay_dir.to_str().unwrap_or_default(),
        &format!("--game:{}", paths.game_dir.to_str().unwrap_or_default()),
        &format!("--mods:{}", mod_folder_names.join("/")),
        "--noTFT",
        "--ignoreConflict",
    ]);

    let mut supervised = Supervised::spawn(command, OutputMode::Capture, OutputMode::Capture, false)
        .map_err(|e| EngineError::ToolFailure {
            phase: ToolPhase::MkOverlay,
            cause: ToolFailureCause::SpawnFailed(e),
        })?;

    match supervised.wait(timeout) {
        Exit::Exited(0) => Ok(()),
        Exit::Exited(code) => Err(EngineError::ToolFailure {
            phase: ToolPhase::MkOverlay,
            cause: ToolFailureCause::ExitCode(code),
        }),
        Exit::TimedOut => Err(EngineError::ToolFailure {
            phase: ToolPhase::MkOverlay,
            cause: ToolFailureCause::TimedOut,
        }),
        Exit::Killed => Err(EngineError::ToolFailure {
            phase: ToolPhase::MkOverlay,
            cause: ToolFailureCause::TimedOut,
        }),
    }
}

/// `TerminateProcess` (what a "graceful" shutdown reduces to on Windows,
/// matching `psutil.Process.terminate()`'s own behavior there) followed by
/// a bounded wait; `kill()` again if the process is still around, matching
/// `stop_overlay_process`'s `terminate()` + `wait(timeout)` + `kill()`
/// fallback.
fn terminate_gracefully(supervised: &mut Supervised) {
    supervised.kill();
    if let Exit::TimedOut = supervised.wait(RUNOVERLAY_TERMINATE_TIMEOUT) {
        supervised.kill();
    }
}
