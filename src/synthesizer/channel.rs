//! Render side: the per-channel filter chain and the master bus that mixes
//! channels down to one PCM16 stream.

use crate::config::AudioParameters;
use crate::filters::{
    flush_subnormal, ConvolutionFilter, DerivativeFilter, Filter, JitterFilter, LevelingFilter,
    LowPassFilter,
};

const DC_FILTER_CUTOFF: f32 = 10.0;
const JITTER_HISTORY: usize = 10;
/// Longest impulse response kept, in taps.
pub(crate) const MAX_IMPULSE_SAMPLES: usize = 10_000;
/// Samples at or below this magnitude at the tail of an impulse response are trimmed.
const IMPULSE_SILENCE_THRESHOLD: i32 = 100;

/// Filter state owned by one input channel.
pub(crate) struct ChannelProcessor {
    /// Input copied from the channel ring for the current pass.
    pub transfer: Vec<f32>,
    jitter: JitterFilter,
    dc_filter: LowPassFilter,
    derivative: DerivativeFilter,
    air_noise_low_pass: LowPassFilter,
    convolution: ConvolutionFilter,
    rng: fastrand::Rng,
}

impl ChannelProcessor {
    pub fn new(transfer_len: usize, audio_sample_rate: f32, parameters: &AudioParameters) -> Self {
        let mut jitter = JitterFilter::default();
        jitter.initialize(
            JITTER_HISTORY,
            parameters.input_sample_noise_frequency_cutoff,
            audio_sample_rate,
        );
        jitter.set_jitter_scale(parameters.input_sample_noise);

        let mut convolution = ConvolutionFilter::default();
        convolution.initialize_identity();

        Self {
            transfer: vec![0.0; transfer_len],
            jitter,
            dc_filter: LowPassFilter::new(DC_FILTER_CUTOFF, audio_sample_rate),
            derivative: DerivativeFilter::new(1.0 / audio_sample_rate),
            air_noise_low_pass: LowPassFilter::new(
                parameters.air_noise_frequency_cutoff,
                audio_sample_rate,
            ),
            convolution,
            rng: fastrand::Rng::new(),
        }
    }

    /// Refresh the settings that are re-read at the start of every pass.
    pub fn apply_parameters(&mut self, parameters: &AudioParameters, audio_sample_rate: f32) {
        self.air_noise_low_pass
            .set_cutoff_frequency(parameters.air_noise_frequency_cutoff, audio_sample_rate);
        self.jitter.set_jitter_scale(parameters.input_sample_noise);
    }

    /// Replace the convolution kernel from signed 16-bit PCM.
    ///
    /// Trailing samples within ±100 are trimmed, the kernel is capped at
    /// 10000 taps and each tap is `volume * s / i16::MAX`. An empty or fully
    /// trimmed response falls back to the identity kernel.
    pub fn load_impulse_response(&mut self, pcm: &[i16], volume: f32) -> usize {
        let clipped = pcm
            .iter()
            .rposition(|&s| i32::from(s).abs() > IMPULSE_SILENCE_THRESHOLD)
            .map_or(0, |i| i + 1);
        if clipped == 0 {
            self.convolution.initialize_identity();
            return 1;
        }

        let taps = clipped.min(MAX_IMPULSE_SAMPLES);
        self.convolution.initialize(taps);
        for (tap, &s) in self.convolution.impulse_response_mut().iter_mut().zip(pcm) {
            *tap = volume * f32::from(s) / f32::from(i16::MAX);
        }
        taps
    }

    #[cfg(test)]
    pub fn impulse_response(&self) -> &[f32] {
        self.convolution.impulse_response()
    }

    #[cfg(test)]
    pub fn seed(&mut self, seed: u64) {
        self.rng = fastrand::Rng::with_seed(seed);
        self.jitter.seed(seed.wrapping_add(1));
    }

    /// Run one input sample through jitter, DC removal, derivative mix, air
    /// noise and convolution.
    #[inline]
    pub fn process(&mut self, sample: f32, parameters: &AudioParameters) -> f32 {
        let f_in = self.jitter.process(sample);
        let f_dc = self.dc_filter.process(f_in);
        let f = f_in - f_dc;
        let f_p = self.derivative.process(f_in);

        let noise = self.rng.f32() * 2.0 - 1.0;
        let r = self.air_noise_low_pass.process(noise);
        let r_mixed = parameters.air_noise * r + (1.0 - parameters.air_noise);

        let hf = parameters.high_freq_gain;
        let v_in = flush_subnormal(f_p * hf + f * r_mixed * (1.0 - hf));

        let c = parameters.convolution;
        c * self.convolution.process(v_in) + (1.0 - c) * v_in
    }
}

/// Mixdown: master antialiasing, leveler, volume and PCM16 quantization.
pub(crate) struct MasterBus {
    antialiasing: LowPassFilter,
    leveler: LevelingFilter,
}

impl MasterBus {
    pub fn new(audio_sample_rate: f32, parameters: &AudioParameters) -> Self {
        Self {
            antialiasing: LowPassFilter::new(audio_sample_rate * 0.45, audio_sample_rate),
            leveler: LevelingFilter::new(
                parameters.leveler_target,
                parameters.leveler_min_gain,
                parameters.leveler_max_gain,
            ),
        }
    }

    #[inline]
    pub fn process(&mut self, signal: f32, parameters: &AudioParameters) -> i16 {
        let filtered = self.antialiasing.process(signal);

        self.leveler.target = parameters.leveler_target;
        self.leveler.min_gain = parameters.leveler_min_gain;
        self.leveler.max_gain = parameters.leveler_max_gain;
        quantize(self.leveler.process(filtered) * parameters.volume)
    }

    pub fn leveler_gain(&self) -> f32 {
        self.leveler.attenuation()
    }
}

/// Round half away from zero and saturate to the i16 range.
#[inline]
pub(crate) fn quantize(value: f32) -> i16 {
    // `as` maps NaN to 0 and saturates at the bounds
    value.round().clamp(f32::from(i16::MIN), f32::from(i16::MAX)) as i16
}
