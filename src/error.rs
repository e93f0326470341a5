use std::time::Duration;

/// Error taxonomy for the injection engine.
///
/// Grounded on `injection/error.rs`'s hand-written `InjectionError`, upgraded
/// to `thiserror` in the style of `LeagueToolkit-league-mod`'s `PatcherError`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("could not resolve archive for {0:?}")]
    Resolution(String),

    #[error("failed to stage mod {name}: {source}")]
    Staging {
        name: String,
        #[source]
        source: StagingCause,
    },

    #[error("external tool failed in {phase:?}: {cause}")]
    ToolFailure {
        phase: ToolPhase,
        cause: ToolFailureCause,
    },

    #[error("another injection is already in progress")]
    Busy,

    #[error("cooldown active, {remaining:?} remaining")]
    Cooldown { remaining: Duration },

    #[error("skipped: requested skin is the champion's base skin")]
    SkippedBaseSkin,

    #[error("skipped: requested skin is already owned")]
    SkippedOwned,

    #[error("game monitor error: {0}")]
    Monitor(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StagingCause {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Walkdir(#[from] walkdir::Error),
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolPhase {
    MkOverlay,
    RunOverlay,
}

impl std::fmt::Display for ToolPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MkOverlay => write!(f, "mkoverlay"),
            Self::RunOverlay => write!(f, "runoverlay"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ToolFailureCause {
    #[error("exited with code {0}")]
    ExitCode(i32),
    #[error("timed out")]
    TimedOut,
    #[error("failed to spawn: {0}")]
    SpawnFailed(#[from] std::io::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;
