//! engine-synth: real-time engine sound synthesis.
//! A simulation thread feeds per-cylinder pressure samples at a variable rate;
//! a render thread resamples, filters, mixes and levels them into PCM16 that a
//! playback pump moves into the device-facing ring.

pub mod audio;
pub mod config;
pub mod error;
pub mod filters;
pub mod impulse;
pub mod metrics;
pub mod state_machine;
pub mod synthesizer;

pub use config::{AppConfig, AudioParameters, Parameters, PlaybackConfig};
pub use error::{Result, SynthError};
pub use state_machine::SynthState;
pub use synthesizer::Synthesizer;

const DEFAULT_LOG_FILTER: &str = "engine_synth=debug";

/// Install the global `tracing` subscriber. `RUST_LOG` overrides the default
/// filter. Safe to call more than once; later calls are ignored.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .try_init();
}
