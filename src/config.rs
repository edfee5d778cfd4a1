//! Configuration: synthesizer parameters, live audio parameters, playback
//! window and demo settings. Everything has a usable default and can be
//! loaded from a JSON file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, SynthError};

/// Live-tunable mix and leveler settings. Copied across threads, never shared.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioParameters {
    pub volume: f32,
    /// Wet amount of the impulse-response convolution.
    pub convolution: f32,
    /// Mix between the derivative and the DC-removed signal.
    pub high_freq_gain: f32,
    /// Amount of low-frequency noise modulation.
    pub air_noise: f32,
    pub air_noise_frequency_cutoff: f32,
    /// Jitter amount applied to the raw input.
    pub input_sample_noise: f32,
    pub input_sample_noise_frequency_cutoff: f32,
    pub leveler_target: f32,
    pub leveler_max_gain: f32,
    pub leveler_min_gain: f32,
}

impl Default for AudioParameters {
    fn default() -> Self {
        Self {
            volume: 1.0,
            convolution: 1.0,
            high_freq_gain: 0.01,
            air_noise: 1.0,
            air_noise_frequency_cutoff: 2000.0,
            input_sample_noise: 0.5,
            input_sample_noise_frequency_cutoff: 10000.0,
            leveler_target: 30000.0,
            leveler_max_gain: 1.9,
            leveler_min_gain: 0.00001,
        }
    }
}

impl AudioParameters {
    /// Settings that leave the signal untouched apart from DC removal and leveling.
    pub fn dry() -> Self {
        Self {
            convolution: 0.0,
            high_freq_gain: 0.0,
            air_noise: 0.0,
            input_sample_noise: 0.0,
            ..Self::default()
        }
    }

    /// Mix amounts pinned to `[0, 1]`, gains and cutoffs to non-negative values.
    /// Non-finite inputs fall back to the default for that field.
    pub fn clamped(&self) -> Self {
        let defaults = Self::default();
        let unit = |v: f32, d: f32| if v.is_finite() { v.clamp(0.0, 1.0) } else { d };
        let positive = |v: f32, d: f32| if v.is_finite() { v.max(0.0) } else { d };
        let min_gain = positive(self.leveler_min_gain, defaults.leveler_min_gain);
        Self {
            volume: positive(self.volume, defaults.volume),
            convolution: unit(self.convolution, defaults.convolution),
            high_freq_gain: unit(self.high_freq_gain, defaults.high_freq_gain),
            air_noise: unit(self.air_noise, defaults.air_noise),
            air_noise_frequency_cutoff: positive(
                self.air_noise_frequency_cutoff,
                defaults.air_noise_frequency_cutoff,
            ),
            input_sample_noise: unit(self.input_sample_noise, defaults.input_sample_noise),
            input_sample_noise_frequency_cutoff: positive(
                self.input_sample_noise_frequency_cutoff,
                defaults.input_sample_noise_frequency_cutoff,
            ),
            leveler_target: positive(self.leveler_target, defaults.leveler_target),
            leveler_max_gain: positive(self.leveler_max_gain, defaults.leveler_max_gain)
                .max(min_gain),
            leveler_min_gain: min_gain,
        }
    }
}

/// Buffer layout and rates fixed at `Synthesizer::initialize`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    pub input_channel_count: usize,
    pub input_buffer_size: usize,
    pub audio_buffer_size: usize,
    pub input_sample_rate: f64,
    pub audio_sample_rate: f64,
    pub initial_audio_parameters: AudioParameters,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            input_channel_count: 1,
            input_buffer_size: 1024,
            audio_buffer_size: 44100,
            input_sample_rate: 10000.0,
            audio_sample_rate: 44100.0,
            initial_audio_parameters: AudioParameters::default(),
        }
    }
}

impl Parameters {
    /// Clamp sizes to at least one sample and non-positive rates to 1 Hz.
    pub fn sanitized(&self) -> Self {
        let rate = |r: f64| if r > 0.0 && r.is_finite() { r } else { 1.0 };
        Self {
            input_channel_count: self.input_channel_count,
            input_buffer_size: self.input_buffer_size.max(1),
            audio_buffer_size: self.audio_buffer_size.max(1),
            input_sample_rate: rate(self.input_sample_rate),
            audio_sample_rate: rate(self.audio_sample_rate),
            initial_audio_parameters: self.initial_audio_parameters,
        }
    }
}

/// Lead window the playback pump keeps ahead of the device play cursor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub buffer_secs: f64,
    pub target_lead_secs: f64,
    pub max_lead_secs: f64,
    pub reset_lead_secs: f64,
    pub frame_rate: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            buffer_secs: 1.0,
            target_lead_secs: 0.1,
            max_lead_secs: 0.5,
            reset_lead_secs: 0.05,
            frame_rate: 60.0,
        }
    }
}

/// A raw little-endian PCM16 impulse response bound to one input channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpulseResponseSource {
    pub path: PathBuf,
    #[serde(default = "default_ir_volume")]
    pub volume: f32,
    #[serde(default)]
    pub channel: usize,
}

fn default_ir_volume() -> f32 {
    1.0
}

/// Synthetic producer used by the demo binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub duration_secs: f64,
    pub rpm: f64,
    /// Peak exhaust pressure pulse amplitude fed to each channel.
    pub pulse_amplitude: f64,
    /// Simulation substeps per video frame.
    pub steps_per_frame: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            duration_secs: 5.0,
            rpm: 2400.0,
            pulse_amplitude: 2000.0,
            steps_per_frame: 166,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub synthesizer: Parameters,
    pub playback: PlaybackConfig,
    pub impulse_responses: Vec<ImpulseResponseSource>,
    pub simulation: SimulationConfig,
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| SynthError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: AppConfig =
            serde_json::from_str(&text).map_err(|source| SynthError::Config {
                path: path.to_path_buf(),
                source,
            })?;
        info!(
            path = %path.display(),
            channels = config.synthesizer.input_channel_count,
            "config loaded"
        );
        Ok(config)
    }
}
