//! Executes one script from start to completion, cancellation, or failure.
//!
//! The runner reads its source line by line, resolves each line through the
//! [`directive`](crate::directive) parser, and pushes resolved commands into
//! a [`CommandSink`]. Looping re-opens the source, so edits to the script
//! file take effect on the next pass. Cancellation is checked before every
//! line and inside every wait slice.

use crate::cancel::CancelToken;
use crate::directive::{Directive, add_media_command, parse_line};
use crate::sink::CommandSink;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, trace, warn};

/// Fixed slice a wait is chopped into so cancellation latency stays bounded.
pub const WAIT_SLICE: Duration = Duration::from_millis(500);

/// Callback fired when the script hits a `#STOP` directive.
pub type StopCallback = Arc<dyn Fn() + Send + Sync>;

/// Terminal outcome of a run. None of these are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The script reached its end with no pending loop.
    Completed,
    /// The cancellation signal was observed.
    Cancelled,
    /// A `#STOP` directive ended the run.
    Stopped,
}

/// Failures that abort the current run. Terminal for the run only; the
/// controller stays usable and already-sent lines stand.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Failed to read script {path}")]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Script line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Remote send failed")]
    Sink(#[source] anyhow::Error),
}

/// Per-run parameters: the display name substituted into command lines, the
/// recording file `#ADD` refers to, and the optional `#STOP` callback.
#[derive(Clone)]
pub struct RunContext {
    pub display_name: String,
    pub media_file: Option<String>,
    pub on_stop: Option<StopCallback>,
}

impl RunContext {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            media_file: None,
            on_stop: None,
        }
    }

    pub fn with_media_file(mut self, file: impl Into<String>) -> Self {
        self.media_file = Some(file.into());
        self
    }

    pub fn with_on_stop(mut self, on_stop: StopCallback) -> Self {
        self.on_stop = Some(on_stop);
        self
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new(crate::directive::DEFAULT_DISPLAY_NAME)
    }
}

/// How one pass over the source ended.
enum Pass {
    /// End of source, no loop pending.
    End,
    /// A `#LOOP` directive asked for a restart.
    Restart,
    Cancelled,
    Stopped,
}

/// Execute the script at `source` against `sink` until it completes, is
/// cancelled, or fails.
///
/// # Errors
///
/// [`RunError::SourceUnreadable`] if the script cannot be read,
/// [`RunError::Parse`] at the first malformed directive, and
/// [`RunError::Sink`] when a send fails. All abort the run with no retry.
pub async fn run_script(
    source: &Path,
    sink: &dyn CommandSink,
    ctx: &RunContext,
    cancel: &CancelToken,
) -> Result<RunOutcome, RunError> {
    loop {
        match run_pass(source, sink, ctx, cancel).await? {
            Pass::End => return Ok(RunOutcome::Completed),
            Pass::Cancelled => return Ok(RunOutcome::Cancelled),
            Pass::Stopped => {
                if let Some(on_stop) = &ctx.on_stop {
                    on_stop();
                }
                return Ok(RunOutcome::Stopped);
            }
            Pass::Restart => {
                if cancel.is_cancelled() {
                    return Ok(RunOutcome::Cancelled);
                }
                debug!(script = %source.display(), "restarting script from the top");
            }
        }
    }
}

/// One pass over the source, from first line to end, loop, stop, or cancel.
async fn run_pass(
    source: &Path,
    sink: &dyn CommandSink,
    ctx: &RunContext,
    cancel: &CancelToken,
) -> Result<Pass, RunError> {
    // Re-read per pass rather than caching, so external edits to the script
    // take effect on the next loop iteration.
    let content =
        tokio::fs::read_to_string(source)
            .await
            .map_err(|source_err| RunError::SourceUnreadable {
                path: source.to_path_buf(),
                source: source_err,
            })?;

    for (line_num, raw) in content.lines().enumerate() {
        if cancel.is_cancelled() {
            return Ok(Pass::Cancelled);
        }

        let directive = parse_line(raw, &ctx.display_name).map_err(|e| RunError::Parse {
            line: line_num + 1,
            message: format!("{e:#}"),
        })?;

        match directive {
            None => {}
            Some(Directive::Wait(ms)) => {
                if sleep_sliced(ms, cancel).await {
                    return Ok(Pass::Cancelled);
                }
            }
            Some(Directive::Loop) => return Ok(Pass::Restart),
            Some(Directive::Stop) => return Ok(Pass::Stopped),
            Some(Directive::AddMedia) => match &ctx.media_file {
                Some(file) => {
                    let command = add_media_command(file);
                    trace!(%command, "sending");
                    sink.send(&command).await.map_err(RunError::Sink)?;
                }
                None => warn!(
                    script = %source.display(),
                    line = line_num + 1,
                    "#ADD with no active recording file, skipping"
                ),
            },
            Some(Directive::Send(text)) => {
                trace!(command = %text, "sending");
                sink.send(&text).await.map_err(RunError::Sink)?;
            }
        }
    }

    Ok(Pass::End)
}

/// Sleep for `ms` milliseconds in [`WAIT_SLICE`] increments, waking early on
/// cancellation. Returns `true` if the token was cancelled.
async fn sleep_sliced(ms: u64, cancel: &CancelToken) -> bool {
    let mut remaining = Duration::from_millis(ms);
    while !remaining.is_zero() {
        if cancel.is_cancelled() {
            return true;
        }
        let slice = remaining.min(WAIT_SLICE);
        match tokio::time::timeout(slice, cancel.cancelled()).await {
            Ok(()) => return true,
            Err(_elapsed) => remaining -= slice,
        }
    }
    cancel.is_cancelled()
}
