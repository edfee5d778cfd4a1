//! Demo driver: a synthetic pulse-train producer feeds the synthesizer at the
//! simulation rate while a frame loop pumps rendered audio into the playback
//! ring, against the default device with `--features device` or a simulated
//! play cursor otherwise.

use std::path::Path;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel as cb;
use parking_lot::Mutex;
use tracing::{error, info, warn};

use engine_synth::audio::PlaybackBuffer;
use engine_synth::config::SimulationConfig;
use engine_synth::{impulse, init_tracing, AppConfig, Result, Synthesizer};

/// Largest sample-to-sample jump reported as a click in the playback ring.
const DISCONTINUITY_THRESHOLD: i32 = 8000;

fn main() {
    init_tracing();
    if let Err(e) = run() {
        error!(error = %e, "engine-synth failed");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let config = match std::env::args_os().nth(1) {
        Some(path) => AppConfig::load_from_file(Path::new(&path))?,
        None => {
            info!("no config file given, using defaults");
            AppConfig::default()
        }
    };

    let synth = Arc::new(Synthesizer::new());
    synth.initialize(&config.synthesizer)?;
    for source in &config.impulse_responses {
        match impulse::read_pcm16_file(&source.path) {
            Ok(pcm) => synth.initialize_impulse_response(&pcm, source.volume, source.channel),
            Err(e) => warn!(error = %e, channel = source.channel, "impulse response skipped"),
        }
    }
    synth.start_audio_rendering_thread()?;

    let frame_interval = Duration::from_secs_f64(1.0 / config.playback.frame_rate.max(1.0));
    let (stop_tx, stop_rx) = cb::bounded::<()>(0);
    let producer = spawn_producer(
        Arc::clone(&synth),
        config.simulation.clone(),
        config.synthesizer.input_channel_count,
        frame_interval,
        stop_rx,
    )?;

    let sample_rate = config.synthesizer.audio_sample_rate.max(1.0) as u32;
    let playback = Arc::new(Mutex::new(PlaybackBuffer::new(sample_rate, &config.playback)));
    let cursor = PlayCursor::open(Arc::clone(&playback), sample_rate);

    let run_for = Duration::from_secs_f64(config.simulation.duration_secs.max(0.0));
    let deadline = Instant::now() + run_for;
    let ticker = cb::tick(frame_interval);
    let mut frames = 0u64;
    let mut samples_played = 0u64;
    let mut lead_resets = 0u64;
    let mut wraps = 0u64;

    while Instant::now() < deadline {
        if ticker.recv().is_err() {
            break;
        }

        let mut pb = playback.lock();
        let safe_write_position = cursor.position(pb.ring().buffer_size());
        let frame = pb.fill(&synth, safe_write_position);
        drop(pb);

        frames += 1;
        samples_played += frame.samples_written as u64;
        lead_resets += u64::from(frame.lead_reset);
        wraps += u64::from(frame.wrapped);
    }

    drop(stop_tx);
    if producer.join().is_err() {
        warn!("producer thread panicked");
    }
    synth.end_audio_rendering_thread()?;

    let discontinuity = playback
        .lock()
        .ring()
        .check_for_discontinuity(DISCONTINUITY_THRESHOLD);
    let summary = serde_json::json!({
        "frames": frames,
        "samples_played": samples_played,
        "lead_resets": lead_resets,
        "ring_wraps": wraps,
        "discontinuity": discontinuity,
        "input_latency_secs": synth.latency(),
        "leveler_gain": synth.leveler_gain(),
        "render": synth.render_stats(),
    });
    info!(summary = %summary, "run complete");

    synth.destroy()?;
    Ok(())
}

/// Per-channel exhaust pressure pulses: each channel fires once every two
/// crank revolutions, phase-shifted evenly across channels.
struct PulseTrain {
    phase: f64,
    step: f64,
    amplitude: f64,
    values: Vec<f64>,
}

impl PulseTrain {
    fn new(sim: &SimulationConfig, channels: usize, input_rate: f64) -> Self {
        let firing_hz = sim.rpm / 60.0 / 2.0;
        Self {
            phase: 0.0,
            step: firing_hz / input_rate.max(1.0),
            amplitude: sim.pulse_amplitude,
            values: vec![0.0; channels],
        }
    }

    fn next(&mut self) -> &[f64] {
        let channels = self.values.len() as f64;
        for (i, value) in self.values.iter_mut().enumerate() {
            let local = (self.phase + i as f64 / channels).fract();
            *value = self.amplitude * (-local * 40.0).exp();
        }
        self.phase = (self.phase + self.step).fract();
        &self.values
    }
}

fn spawn_producer(
    synth: Arc<Synthesizer>,
    sim: SimulationConfig,
    channels: usize,
    frame_interval: Duration,
    stop_rx: cb::Receiver<()>,
) -> Result<JoinHandle<()>> {
    let steps = sim.steps_per_frame.max(1);
    let input_rate = steps as f64 / frame_interval.as_secs_f64();
    synth.set_input_sample_rate(input_rate);

    std::thread::Builder::new()
        .name("simulation".into())
        .spawn(move || {
            let mut pulses = PulseTrain::new(&sim, channels, input_rate);
            let ticker = cb::tick(frame_interval);
            info!(steps_per_frame = steps, input_rate, "simulation producer started");
            loop {
                cb::select! {
                    recv(stop_rx) -> _ => break,
                    recv(ticker) -> _ => {
                        for _ in 0..steps {
                            synth.write_input(pulses.next());
                        }
                        synth.end_input_block();
                    }
                }
            }
            info!("simulation producer stopped");
        })
        .map_err(engine_synth::SynthError::ThreadSpawn)
}

/// Where the device is currently playing in the playback ring.
enum PlayCursor {
    Simulated { started: Instant, sample_rate: f64 },
    #[cfg(feature = "device")]
    Device(engine_synth::audio::device::DeviceOutput),
}

impl PlayCursor {
    #[cfg_attr(not(feature = "device"), allow(unused_variables))]
    fn open(playback: Arc<Mutex<PlaybackBuffer>>, sample_rate: u32) -> Self {
        #[cfg(feature = "device")]
        {
            match engine_synth::audio::device::DeviceOutput::start(playback) {
                Ok(output) => return PlayCursor::Device(output),
                Err(e) => warn!(error = %e, "audio device unavailable, using simulated cursor"),
            }
        }

        PlayCursor::Simulated {
            started: Instant::now(),
            sample_rate: f64::from(sample_rate),
        }
    }

    fn position(&self, ring_size: usize) -> usize {
        match self {
            PlayCursor::Simulated {
                started,
                sample_rate,
            } => {
                let played = (started.elapsed().as_secs_f64() * sample_rate) as usize;
                played % ring_size.max(1)
            }
            #[cfg(feature = "device")]
            PlayCursor::Device(output) => output.play_cursor(),
        }
    }
}
