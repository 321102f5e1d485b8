//! Operational state machine layered on the run controller.
//!
//! Tracks whether the studio is idle, recording, or playing back the last
//! recording, and swaps the on-air / off-air scripts on each transition.
//! State changes are published on a `watch` channel; observers treat that
//! state as the single source of truth for which operations are valid.

use crate::controller::RunController;
use crate::runner::RunContext;
use crate::sink::CommandSink;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

/// The studio's operational state. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StudioState {
    Idle,
    Recording,
    Playing,
}

/// Posted when a running script hits a `#STOP` directive.
///
/// The embedding event loop receives these from the channel returned by
/// [`Studio::new`] and forwards them to [`Studio::stop`]; the runner's task
/// cannot mutate the studio directly.
#[derive(Debug)]
pub struct StopRequest;

/// Configuration for a [`Studio`].
#[derive(Debug, Clone)]
pub struct StudioConfig {
    /// Directory the playout server records clips into.
    pub media_dir: PathBuf,
    /// Clip name prefix, e.g. `circom` yields `circom0.mp4`, `circom1.mp4`, ...
    pub clip_prefix: String,
    /// Clip name extension, including the dot.
    pub clip_ext: String,
    /// Script run while recording.
    pub onair_script: PathBuf,
    /// Script run while idle.
    pub offair_script: PathBuf,
    /// Display name substituted for `#NAME#` in script lines.
    pub display_name: String,
}

impl StudioConfig {
    pub fn new(
        media_dir: impl Into<PathBuf>,
        onair_script: impl Into<PathBuf>,
        offair_script: impl Into<PathBuf>,
    ) -> Self {
        Self {
            media_dir: media_dir.into(),
            clip_prefix: "circom".to_string(),
            clip_ext: ".mp4".to_string(),
            onair_script: onair_script.into(),
            offair_script: offair_script.into(),
            display_name: crate::directive::DEFAULT_DISPLAY_NAME.to_string(),
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }
}

/// Idle / Recording / Playing state machine driving the run controller.
pub struct Studio {
    config: StudioConfig,
    sink: Arc<dyn CommandSink>,
    controller: RunController,
    current_filename: Option<String>,
    last_filename: Option<String>,
    state: watch::Sender<StudioState>,
    stop_tx: mpsc::UnboundedSender<StopRequest>,
}

impl Studio {
    /// Create a studio in the `Idle` state.
    ///
    /// The returned receiver yields a [`StopRequest`] whenever a script run
    /// started by this studio hits a `#STOP` directive.
    pub fn new(
        config: StudioConfig,
        sink: Arc<dyn CommandSink>,
    ) -> (Self, mpsc::UnboundedReceiver<StopRequest>) {
        let (state, _) = watch::channel(StudioState::Idle);
        let (stop_tx, stop_rx) = mpsc::unbounded_channel();
        let studio = Self {
            controller: RunController::new(Arc::clone(&sink)),
            config,
            sink,
            current_filename: None,
            last_filename: None,
            state,
            stop_tx,
        };
        (studio, stop_rx)
    }

    /// Launch the off-air script. Call once after construction.
    pub async fn start(&mut self) {
        let ctx = self.run_ctx();
        self.controller
            .start_run(self.config.offair_script.clone(), ctx)
            .await;
    }

    pub fn state(&self) -> StudioState {
        *self.state.borrow()
    }

    /// Observe state transitions.
    pub fn subscribe(&self) -> watch::Receiver<StudioState> {
        self.state.subscribe()
    }

    /// The most recent completed recording, if it has not been consumed.
    pub fn last_recording(&self) -> Option<&str> {
        self.last_filename.as_deref()
    }

    /// Consume the last recording, e.g. once it has been shipped somewhere.
    pub fn take_last_recording(&mut self) -> Option<String> {
        let taken = self.last_filename.take();
        if taken.is_some() {
            // Re-publish so observers re-derive what is currently valid.
            let current = self.state();
            self.state.send_replace(current);
        }
        taken
    }

    /// Begin recording: pick a fresh clip name and swap in the on-air script.
    ///
    /// An in-progress recording is finalized first, so calling this while
    /// already recording starts a new clip.
    pub async fn start_recording(&mut self) {
        self.finish_recording().await;

        let clip = next_clip_name(
            &self.config.media_dir,
            &self.config.clip_prefix,
            &self.config.clip_ext,
        );
        info!(%clip, "recording started");
        self.current_filename = Some(clip.clone());

        let ctx = self.run_ctx().with_media_file(clip);
        self.controller
            .start_run(self.config.onair_script.clone(), ctx)
            .await;

        self.state.send_replace(StudioState::Recording);
    }

    /// Stop whatever is active and return to `Idle`.
    ///
    /// Finalizes an in-progress recording; also ends playback.
    pub async fn stop(&mut self) {
        self.finish_recording().await;
        self.state.send_replace(StudioState::Idle);
    }

    /// Begin playback of the last recording.
    ///
    /// Returns the path of the clip to play, or `None` (and stays out of
    /// `Playing`) when there is no completed recording. Playback rendering
    /// itself is the caller's concern; report the end of it with
    /// [`playback_finished`](Self::playback_finished).
    pub async fn play(&mut self) -> Option<PathBuf> {
        self.finish_recording().await;

        let clip = self.last_filename.as_ref()?;
        let path = self.config.media_dir.join(clip);
        info!(%clip, "playback started");
        self.state.send_replace(StudioState::Playing);
        Some(path)
    }

    /// Notify the studio that playback of the last recording has ended.
    pub async fn playback_finished(&mut self) {
        if self.state() == StudioState::Playing {
            self.state.send_replace(StudioState::Idle);
        }
    }

    /// Finalize the in-progress recording: issue the remove command, promote
    /// the clip to `last`, and swap back to the off-air script.
    async fn finish_recording(&mut self) {
        let Some(clip) = self.current_filename.take() else {
            return;
        };

        let command = crate::directive::remove_media_command(&clip);
        if let Err(e) = self.sink.send(&command).await {
            // A dead sink must not wedge the state machine; the transition
            // proceeds and the failure is surfaced in the log.
            warn!(%clip, "failed to finalize recording: {e:#}");
        }
        info!(%clip, "recording finished");
        self.last_filename = Some(clip);

        let ctx = self.run_ctx();
        self.controller
            .start_run(self.config.offair_script.clone(), ctx)
            .await;
    }

    fn run_ctx(&self) -> RunContext {
        let stop_tx = self.stop_tx.clone();
        RunContext::new(&self.config.display_name).with_on_stop(Arc::new(move || {
            let _ = stop_tx.send(StopRequest);
        }))
    }
}

/// First `<prefix><n><ext>` under `media_dir` whose path does not exist yet.
pub fn next_clip_name(media_dir: &Path, prefix: &str, ext: &str) -> String {
    let mut n: u32 = 0;
    loop {
        let name = format!("{prefix}{n}{ext}");
        if !media_dir.join(&name).exists() {
            return name;
        }
        n += 1;
    }
}
