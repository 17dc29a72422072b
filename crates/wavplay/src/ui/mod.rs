//! Ratatui transport for interactive playback.
//!
//! Keys:
//! - Space: pause/play
//! - Left/r: rewind
//! - Right/f: fast-forward
//! - n/p: next/previous file in the playlist
//! - q/Esc: quit

mod app;
mod render;

pub(crate) use app::run_tui;
