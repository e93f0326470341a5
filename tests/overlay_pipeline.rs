//! Integration coverage for the Overlay Pipeline (G) against `spec.md` §4.6
//! step 4 ("if mkoverlay exits non-zero or times out, do not resume") using
//! a nonexistent tool binary to force a deterministic spawn failure without
//! depending on the real external `mod-tools` executable.

use injection_engine::error::EngineError;
use injection_engine::events::default_sink;
use injection_engine::game_monitor::{GameMonitor, ProcessLocator};
use injection_engine::overlay_pipeline::{mk_run_overlay, OverlayPaths};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct RecordingLocator {
    resumed: Arc<AtomicBool>,
}

impl ProcessLocator for RecordingLocator {
    fn find(&self, _process_name: &str) -> Option<u32> {
        None
    }
    fn suspend(&self, _pid: u32) -> bool {
        true
    }
    fn resume(&self, _pid: u32) {
        self.resumed.store(true, Ordering::SeqCst);
    }
}

#[test]
fn mkoverlay_spawn_failure_never_resumes_the_monitor() {
    let dir = std::env::temp_dir().join(format!(
        "skin-injection-engine-it-overlay-spawn-fail-{}",
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();

    let mods_dir = dir.join("mods");
    let overlay_dir = dir.join("overlay");
    let game_dir = dir.join("Game");
    let mod_tools_path = dir.join("definitely-does-not-exist.exe");

    let resumed = Arc::new(AtomicBool::new(false));
    let monitor = GameMonitor::new(
        Arc::new(RecordingLocator {
            resumed: Arc::clone(&resumed),
        }),
        default_sink(),
    );

    let paths = OverlayPaths {
        mods_dir: &mods_dir,
        overlay_dir: &overlay_dir,
        game_dir: &game_dir,
        mod_tools_path: &mod_tools_path,
    };

    let result = mk_run_overlay(
        &["99002".to_string()],
        paths,
        Duration::from_secs(5),
        || false,
        &monitor,
    );

    assert!(matches!(
        result,
        Err(EngineError::ToolFailure { .. })
    ));
    assert!(
        !resumed.load(Ordering::SeqCst),
        "a failed mkoverlay spawn must never trigger a resume"
    );

    let _ = std::fs::remove_dir_all(&dir);
}

#[cfg(unix)]
#[test]
fn mkoverlay_failure_exit_code_does_not_resume() {
    let dir = std::env::temp_dir().join(format!(
        "skin-injection-engine-it-overlay-exit-fail-{}",
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();

    // A shell script standing in for `mod-tools.exe` that always exits
    // non-zero, to exercise the "mkoverlay exits non-zero" branch of step 4
    // without depending on the real external tool.
    let fake_tool = dir.join("fake-mod-tools.sh");
    std::fs::write(&fake_tool, "#!/bin/sh\nexit 1\n").unwrap();
    use std::os::unix::fs::PermissionsExt;
    let mut perms = std::fs::metadata(&fake_tool).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&fake_tool, perms).unwrap();

    let resumed = Arc::new(AtomicBool::new(false));
    let monitor = GameMonitor::new(
        Arc::new(RecordingLocator {
            resumed: Arc::clone(&resumed),
        }),
        default_sink(),
    );

    let mods_dir = dir.join("mods");
    let overlay_dir = dir.join("overlay");
    let game_dir = dir.join("Game");
    let paths = OverlayPaths {
        mods_dir: &mods_dir,
        overlay_dir: &overlay_dir,
        game_dir: &game_dir,
        mod_tools_path: &fake_tool,
    };

    let result = mk_run_overlay(
        &["99002".to_string()],
        paths,
        Duration::from_secs(5),
        || false,
        &monitor,
    );

    assert!(matches!(result, Err(EngineError::ToolFailure { .. })));
    assert!(!resumed.load(Ordering::SeqCst));

    let _ = std::fs::remove_dir_all(&dir);
}
