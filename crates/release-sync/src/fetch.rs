use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::pending::WorkItem;

/// Errors raised while starting a fetch.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to prepare {path}: {source}")]
    Prepare {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Why a started fetch did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    /// The fetch exited unsuccessfully. `None` means it was killed by a signal.
    Exited { code: Option<i32> },
    /// The fetch outlived its time bound and was killed.
    TimedOut { after: Duration },
    /// The fetch exited successfully but left nothing at the target path.
    Missing { path: PathBuf },
    /// The fetch could not be waited on.
    Wait(String),
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exited { code: Some(code) } => write!(f, "exited with status {code}"),
            Self::Exited { code: None } => write!(f, "terminated by signal"),
            Self::TimedOut { after } => write!(f, "timed out after {}s", after.as_secs_f64()),
            Self::Missing { path } => {
                write!(f, "finished but {} was not written", path.display())
            }
            Self::Wait(reason) => write!(f, "wait failed: {reason}"),
        }
    }
}

/// Terminal state of one fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Succeeded,
    Failed(FetchFailure),
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    pub fn failure(&self) -> Option<&FetchFailure> {
        match self {
            Self::Succeeded => None,
            Self::Failed(failure) => Some(failure),
        }
    }
}

/// A fetch that has been started and not yet awaited.
#[async_trait::async_trait]
pub trait RunningFetch: Send {
    /// Wait until the fetch finishes.
    ///
    /// Must be cancel-safe: dropping the returned future leaves the fetch
    /// running so it can still be killed.
    async fn wait(&mut self) -> FetchOutcome;

    /// Stop a fetch that outlived its time bound.
    async fn kill(&mut self);
}

/// Starts remote fetches for work items.
///
/// `start` must return as soon as the fetch is running; waiting happens
/// through the returned handle so a whole batch can be started before any
/// of it is awaited.
pub trait Fetcher: Send + Sync {
    /// Human-readable label identifying this fetcher.
    fn label(&self) -> &str;

    /// Shell rendering of the command issued for `item`.
    fn command_line(&self, item: &WorkItem) -> String;

    /// Begin fetching `item` into its category directory.
    fn start(&self, item: &WorkItem) -> Result<Box<dyn RunningFetch>, FetchError>;
}
