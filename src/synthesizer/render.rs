//! The render thread: waits for a pending input block, filters it into PCM16
//! and appends the result to the output ring.
//!
//! Lock order is always render → input → dsp. The DSP work itself runs with
//! only the dsp lock held, so producers and the playback reader are never
//! blocked for the duration of a pass.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use super::{Core, HIGH_WATER_MARK};

pub(super) fn run_render_loop(core: Arc<Core>) {
    info!("audio render thread started");
    let mut scratch = vec![0i16; HIGH_WATER_MARK];

    while core.running.load(Ordering::Acquire) {
        render_pass(&core, &mut scratch);

        if let Some(window) = core.metrics.take_heartbeat(Instant::now()) {
            let output_buffered = core.render.lock().output.size();
            let latency_samples = core.input.lock().latency;
            debug!(
                cycles = window.cycles,
                underruns = window.underruns,
                overruns = window.overruns,
                avg_cycle_us = format!("{:.1}", window.avg_cycle_us),
                output_buffered,
                latency_samples,
                "render heartbeat"
            );
        }
    }

    info!(stats = ?core.metrics.stats(), "audio render thread exiting");
}

/// One pass. Returns the number of samples appended to the output ring.
pub(super) fn render_pass(core: &Core, scratch: &mut [i16]) -> usize {
    let mut render = core.render.lock();
    core.render_signal.wait_while(&mut render, |shared| {
        core.running.load(Ordering::Acquire) && !core.block_ready(shared)
    });
    if !core.running.load(Ordering::Acquire) {
        return 0;
    }

    let started = Instant::now();
    let parameters = render.audio_parameters;

    let mut input = core.input.lock();
    let mut dsp = core.dsp.lock();
    let free = render.output.capacity() - render.output.size();
    let n = input
        .queued()
        .min(HIGH_WATER_MARK.saturating_sub(render.output.size()))
        .min(free)
        .min(scratch.len());

    for (channel, processor) in input.channels.iter().zip(dsp.processors.iter_mut()) {
        channel.data.read(&mut processor.transfer[..n]);
    }
    input.samples_read = n;
    let input_buffered = input.queued();
    let input_capacity = input.capacity();
    render.processed = true;
    render.in_flight = true;
    drop(input);
    drop(render);

    dsp.render(n, &parameters, &mut scratch[..n]);
    let leveler_gain = dsp.leveler_gain();
    drop(dsp);

    let mut render = core.render.lock();
    for &sample in &scratch[..n] {
        render.output.write(sample);
    }
    render.leveler_gain = leveler_gain;
    render.in_flight = false;
    drop(render);
    core.render_signal.notify_all();

    let elapsed_us = started.elapsed().as_secs_f64() * 1e6;
    core.metrics.record_cycle(elapsed_us, n, input_buffered, input_capacity);
    n
}
