//! WAV playback core: RIFF/WAVE parsing, a cursor-driven playback engine, and a CPAL
//! output sink that pulls from it.

pub mod config;
pub mod device;
pub mod engine;
pub mod error;
pub mod format;
pub mod playback;
pub mod riff;
pub mod session;
pub mod sink;
pub mod status;
pub mod wav;

#[cfg(test)]
mod test_support;

pub use error::{Error, Result};
