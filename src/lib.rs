//! The supporting library for `romdiff`.
//!
//! `romdiff` shows the disassembly of an original binary next to the disassembly of a binary
//! rebuilt from decompiled sources. A build watcher sends a stream of updates: build started,
//! build failed, a fresh diff, or a match. The diff is a single stream of line operations that we
//! split into two aligned columns.
//!
//! The pipeline is:
//!
//! 1. [message] decodes updates from JSON lines.
//! 2. [state] folds them into a [state::ViewState].
//! 3. [project] splits a diff into [project::Columns], using [classify] to categorize lines,
//!    [align] to check that each column's addresses are contiguous and [compose] to check the
//!    sub-line change runs.
//! 4. [render] draws a [state::Frame] of the state.

pub mod align;
pub mod classify;
pub mod cli;
pub mod compose;
pub mod config;
pub mod console_utils;
pub mod diff;
mod figment_utils;
pub mod message;
pub mod project;
pub mod render;
pub mod state;

#[cfg(test)]
mod test_utils;
