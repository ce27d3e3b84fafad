//! Playback synchronization with the presentation engine

pub mod driver;

pub use driver::{EventSink, PlaybackDriver, PlaybackSink};
