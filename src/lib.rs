//! # Playmacro
//!
//! A macro scripting engine for driving broadcast playout servers.
//!
//! Playmacro replays human-authored text scripts against a remote
//! command-controlled playout engine. Scripts are plain command lines plus a
//! small directive language for timed waits, looping, and operational
//! control, making it easy to build "on-air" and "off-air" loops for a
//! self-service recording booth or an unattended channel.
//!
//! ## Quick start
//!
//! ```no_run
//! use playmacro::{MemorySink, RunContext, RunController};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let sink = Arc::new(MemorySink::new());
//!     let mut controller = RunController::new(sink.clone());
//!
//!     controller.start_run("onair.txt", RunContext::new("Jane")).await;
//!     // ... later: replacing the run cancels and joins the previous one
//!     controller.start_run("offair.txt", RunContext::default()).await;
//!
//!     controller.stop_active().await;
//!     println!("{:?}", sink.sent());
//!     Ok(())
//! }
//! ```
//!
//! ## Script syntax
//!
//! One directive per line, UTF-8, lines trimmed before parsing:
//!
//! | Line | Meaning |
//! |------|---------|
//! | `#WAIT 500` | pause 500 ms, sliced so cancellation stays responsive |
//! | `#LOOP` | restart the script from the top (the file is re-read) |
//! | `#STOP` | request an operational stop from the controller |
//! | `#ADD` | emit the media-add command for the current recording file |
//! | anything else | sent verbatim, with `#NAME#` replaced by the display name |
//! | blank line | ignored |
//!
//! ## Hot-swapping runs
//!
//! [`RunController::start_run`] cancels the active run and waits for its
//! task to fully terminate before launching the replacement, so the remote
//! sink never receives interleaved output from two scripts. Cancellation is
//! cooperative: the runner checks its [`CancelToken`] between every line and
//! inside every wait slice.
//!
//! ## The studio layer
//!
//! [`Studio`] adds an Idle / Recording / Playing state machine on top of the
//! controller: starting a recording derives a fresh clip name, swaps in the
//! on-air script, and publishes the new state on a `watch` channel;
//! stopping finalizes the clip and swaps back to the off-air script.
//!
//! ## Custom sinks
//!
//! Commands are delivered through the [`CommandSink`] trait. The crate ships
//! [`AmcpConnection`] for a TCP-connected playout server and [`MemorySink`]
//! for capturing output in tests or dry runs.

pub mod cancel;
pub mod controller;
pub mod directive;
pub mod runner;
pub mod sink;
pub mod studio;

pub use cancel::CancelToken;
pub use controller::RunController;
pub use directive::{Directive, parse_line, parse_str};
pub use runner::{RunContext, RunError, RunOutcome, WAIT_SLICE, run_script};
pub use sink::{AmcpConnection, CommandSink, MemorySink};
pub use studio::{StopRequest, Studio, StudioConfig, StudioState};
