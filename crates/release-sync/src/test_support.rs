use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::fetch::{FetchError, FetchFailure, FetchOutcome, Fetcher, RunningFetch};
use crate::pending::WorkItem;

/// What a scripted fetch does for one target path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    /// Write a small PDF to the target path and succeed.
    Succeed,
    /// Exit with the given status without writing anything.
    Exit(i32),
    /// Never finish on its own.
    Hang,
    /// Fail to start.
    SpawnError,
}

#[derive(Debug, Default)]
struct Counters {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    killed: AtomicUsize,
}

/// In-process fetcher for tests. Targets default to [`Script::Succeed`].
pub struct ScriptedFetcher {
    asset_root: PathBuf,
    scripts: HashMap<PathBuf, Script>,
    delay: Duration,
    started: Mutex<Vec<PathBuf>>,
    counters: Arc<Counters>,
}

impl ScriptedFetcher {
    pub fn new(asset_root: impl Into<PathBuf>) -> Self {
        Self {
            asset_root: asset_root.into(),
            scripts: HashMap::new(),
            delay: Duration::ZERO,
            started: Mutex::new(Vec::new()),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Script the fetch for `target_path` (relative to the asset root).
    pub fn script(mut self, target_path: impl AsRef<Path>, script: Script) -> Self {
        self.scripts
            .insert(target_path.as_ref().to_path_buf(), script);
        self
    }

    /// Make every fetch take at least `delay` before finishing.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Target paths passed to `start`, in call order.
    pub fn started(&self) -> Vec<PathBuf> {
        self.started.lock().unwrap().clone()
    }

    /// Highest number of fetches running at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.counters.peak.load(Ordering::SeqCst)
    }

    /// Number of fetches killed after a timeout.
    pub fn killed(&self) -> usize {
        self.counters.killed.load(Ordering::SeqCst)
    }
}

impl Fetcher for ScriptedFetcher {
    fn label(&self) -> &str {
        "scripted"
    }

    fn command_line(&self, item: &WorkItem) -> String {
        format!(
            "scripted-fetch {} --dir {}",
            item.record.repo,
            item.record.category_dir(&self.asset_root).display()
        )
    }

    fn start(&self, item: &WorkItem) -> Result<Box<dyn RunningFetch>, FetchError> {
        let target = &item.record.target_path;
        self.started.lock().unwrap().push(target.clone());

        let script = self.scripts.get(target).copied().unwrap_or(Script::Succeed);
        if script == Script::SpawnError {
            return Err(FetchError::Spawn {
                program: "scripted-fetch".into(),
                source: io::Error::new(io::ErrorKind::NotFound, "scripted spawn failure"),
            });
        }

        let running = self.counters.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.peak.fetch_max(running, Ordering::SeqCst);

        Ok(Box::new(ScriptedRun {
            script,
            destination: item.record.local_path(&self.asset_root),
            delay: self.delay,
            counters: Arc::clone(&self.counters),
            done: false,
        }))
    }
}

struct ScriptedRun {
    script: Script,
    destination: PathBuf,
    delay: Duration,
    counters: Arc<Counters>,
    done: bool,
}

impl ScriptedRun {
    fn finish(&mut self) {
        if !self.done {
            self.done = true;
            self.counters.in_flight.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn write_destination(&self) -> io::Result<()> {
        if let Some(parent) = self.destination.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.destination, b"%PDF-1.4\n% scripted\n")
    }
}

#[async_trait::async_trait]
impl RunningFetch for ScriptedRun {
    async fn wait(&mut self) -> FetchOutcome {
        tokio::time::sleep(self.delay).await;

        let outcome = match self.script {
            Script::Succeed => match self.write_destination() {
                Ok(()) => FetchOutcome::Succeeded,
                Err(e) => FetchOutcome::Failed(FetchFailure::Wait(e.to_string())),
            },
            Script::Exit(code) => FetchOutcome::Failed(FetchFailure::Exited { code: Some(code) }),
            Script::Hang | Script::SpawnError => std::future::pending().await,
        };

        self.finish();
        outcome
    }

    async fn kill(&mut self) {
        self.counters.killed.fetch_add(1, Ordering::SeqCst);
        self.finish();
    }
}
