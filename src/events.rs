//! Structured replacement for the teacher's `log()` method and its
//! `app.emit("injection-status" | "terminal-log", ...)` calls
//! (`injection/core.rs`, `commands/lcu_watcher/watcher.rs`). The UI layer is
//! out of scope for this crate, so instead of reaching into a Tauri
//! `AppHandle`, the engine hands every state change to an `EventSink` the
//! embedder supplies.

use std::sync::Arc;

/// One state change an embedder may want to mirror to a UI, a log file, or
/// both. Mirrors the status strings the teacher emitted as ad-hoc JSON
/// (`"injecting"`, `"completed"`, `"idle"`) as a closed enum.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    InjectionStarted,
    InjectionCompleted,
    InjectionFailed { reason: String },
    InjectionSkipped { reason: &'static str },
    MonitorStateChanged { state: &'static str },
    Log { message: String },
}

pub trait EventSink: Send + Sync {
    fn handle(&self, event: EngineEvent);
}

/// Default sink: forwards every event to `tracing`, matching the teacher's
/// `println!`-plus-file-log idiom but through the structured logging stack.
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn handle(&self, event: EngineEvent) {
        match event {
            EngineEvent::InjectionStarted => tracing::info!("injection started"),
            EngineEvent::InjectionCompleted => tracing::info!("injection completed"),
            EngineEvent::InjectionFailed { reason } => {
                tracing::error!(reason = %reason, "injection failed")
            }
            EngineEvent::InjectionSkipped { reason } => {
                tracing::debug!(reason, "injection skipped")
            }
            EngineEvent::MonitorStateChanged { state } => {
                tracing::debug!(state, "monitor state changed")
            }
            EngineEvent::Log { message } => tracing::info!("{message}"),
        }
    }
}

pub type SharedEventSink = Arc<dyn EventSink>;

pub fn default_sink() -> SharedEventSink {
    Arc::new(TracingEventSink)
}
