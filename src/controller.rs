//! Owns at most one active script run and serializes replacements.
//!
//! Replacing a run is cancel-then-join: the old run's cancellation signal is
//! set and its task is awaited to completion before the new run is spawned.
//! The shared sink therefore never sees interleaved output from two runs.

use crate::cancel::CancelToken;
use crate::runner::{RunContext, RunError, RunOutcome, run_script};
use crate::sink::CommandSink;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// One in-flight script execution: its cancellation signal and its task.
///
/// A run is considered terminated only once the task has been joined; the
/// controller never drops a handle without awaiting it.
struct RunHandle {
    source: PathBuf,
    cancel: CancelToken,
    task: JoinHandle<Result<RunOutcome, RunError>>,
}

/// Guarantees at most one active run against the shared command sink.
///
/// Callers must serialize access themselves; `&mut self` on every method
/// makes concurrent calls impossible without an external lock, matching the
/// single-writer discipline the sink requires.
pub struct RunController {
    sink: Arc<dyn CommandSink>,
    active: Option<RunHandle>,
}

impl RunController {
    pub fn new(sink: Arc<dyn CommandSink>) -> Self {
        Self { sink, active: None }
    }

    /// Start running the script at `source`, replacing any active run.
    ///
    /// Does not return until a previously active run has fully terminated,
    /// so sink writes from successive runs are strictly ordered.
    pub async fn start_run(&mut self, source: impl AsRef<Path>, ctx: RunContext) {
        self.stop_active().await;

        let source = source.as_ref().to_path_buf();
        let cancel = CancelToken::new();
        let task = tokio::spawn({
            let source = source.clone();
            let sink = Arc::clone(&self.sink);
            let cancel = cancel.clone();
            async move {
                let result = run_script(&source, sink.as_ref(), &ctx, &cancel).await;
                match &result {
                    Ok(RunOutcome::Completed) => {
                        info!(script = %source.display(), "script run completed")
                    }
                    Ok(RunOutcome::Stopped) => {
                        info!(script = %source.display(), "script run stopped by directive")
                    }
                    Ok(RunOutcome::Cancelled) => {
                        debug!(script = %source.display(), "script run cancelled")
                    }
                    Err(e) => {
                        error!(script = %source.display(), "script run failed: {e:#}")
                    }
                }
                result
            }
        });

        debug!(script = %source.display(), "script run started");
        self.active = Some(RunHandle {
            source,
            cancel,
            task,
        });
    }

    /// Cancel the active run, if any, and wait for it to terminate.
    ///
    /// Idempotent; a run that already finished on its own joins immediately.
    pub async fn stop_active(&mut self) {
        let Some(handle) = self.active.take() else {
            return;
        };
        handle.cancel.cancel();
        match handle.task.await {
            Ok(_) => {}
            Err(e) if e.is_panic() => {
                error!(script = %handle.source.display(), "script task panicked: {e}")
            }
            Err(_) => {}
        }
    }

    /// Whether a run has been started and not yet stopped or replaced.
    ///
    /// A run that terminated on its own still counts until the next
    /// `start_run` or `stop_active` joins it.
    pub fn has_active_run(&self) -> bool {
        self.active.is_some()
    }

    /// Source path of the current run, if any.
    pub fn active_source(&self) -> Option<&Path> {
        self.active.as_ref().map(|h| h.source.as_path())
    }
}
