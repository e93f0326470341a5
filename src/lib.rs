//! Skin Injection Engine — the concurrency and timing core described in
//! `spec.md`: game-process monitoring, mod staging, the external overlay
//! pipeline, and the injection controller that sequences them.
//!
//! Grounded on `injection/mod.rs`'s module-declaration-plus-glob-re-export
//! shape; narrowed here to the lifecycle core (`spec.md` §1's "out of
//! scope" list — LCU polling, UI, OCR, Pengu bridge, telemetry, updater —
//! stays with the embedding application).

pub mod archive_index;
pub mod archive_resolver;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod game_monitor;
pub mod mod_stager;
pub mod model;
pub mod overlay_pipeline;
pub mod paths;
pub mod process_supervisor;
pub mod router;

#[cfg(target_os = "windows")]
pub mod winproc;

pub use archive_index::ArchiveIndex;
pub use config::EngineConfig;
pub use controller::InjectionController;
pub use error::{EngineError, EngineResult};
pub use events::{EngineEvent, EventSink, SharedEventSink};
pub use game_monitor::{GameMonitor, MonitorState, ProcessLocator};
pub use model::{
    ArchiveRequest, Category, GamePhase, InjectionIntent, InjectionOutcome, ModRequest,
    ModSelection, SharedState,
};
pub use router::StateEventRouter;
