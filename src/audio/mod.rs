//! Sample storage and the playback side.
//! Ring buffers carry resampled input and rendered PCM; the playback pump
//! moves rendered PCM into the device-facing ring once per video frame.

pub mod output_ring;
pub mod playback;
pub mod ring_buffer;

#[cfg(feature = "device")]
pub mod device;

pub use output_ring::OutputRing;
pub use playback::{PlaybackBuffer, PlaybackFrame};
pub use ring_buffer::RingBuffer;
