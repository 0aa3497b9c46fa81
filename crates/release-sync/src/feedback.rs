use std::sync::Arc;

/// User-facing messages emitted while a run progresses.
///
/// The library never prints; callers decide how to present these (the CLI
/// sends commands and progress to stdout, warnings and errors to stderr).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feedback {
    /// Shell echo of a fetch command, issued or previewed.
    Command(String),
    /// Progress and summary lines.
    Info(String),
    /// The run continued but something noteworthy occurred.
    Warning(String),
    /// Something failed.
    Error(String),
}

/// Receiver for [`Feedback`], shared between the synchronizer and dispatcher.
pub type FeedbackSink = Arc<dyn Fn(Feedback) + Send + Sync>;

/// A sink that drops everything.
pub fn discard() -> FeedbackSink {
    Arc::new(|_| {})
}

impl Feedback {
    pub fn command(line: impl Into<String>) -> Self {
        Self::Command(line.into())
    }

    pub fn info(msg: impl Into<String>) -> Self {
        Self::Info(msg.into())
    }

    pub fn warning(msg: impl Into<String>) -> Self {
        Self::Warning(msg.into())
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self::Error(msg.into())
    }

    pub fn is_command(&self) -> bool {
        matches!(self, Self::Command(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    pub fn is_warning(&self) -> bool {
        matches!(self, Self::Warning(_))
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Command(msg) | Self::Info(msg) | Self::Warning(msg) | Self::Error(msg) => msg,
        }
    }
}

impl std::fmt::Display for Feedback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Command(msg) | Self::Info(msg) => write!(f, "{msg}"),
            Self::Warning(msg) => write!(f, "warning: {msg}"),
            Self::Error(msg) => write!(f, "error: {msg}"),
        }
    }
}
