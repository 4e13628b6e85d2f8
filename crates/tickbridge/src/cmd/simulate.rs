use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use bytes::Bytes;
use serde::Serialize;
use tickbridge_bridge::{
    BridgeConfig, BridgeMode, BridgeStats, FrameBridge, FrameTick, FrameWorker, ShutdownHandle,
    WorkerError,
};
use tickbridge_wire::{
    split, ChannelReader, ChannelSet, EventKind, Multiplexer, Packer, WireError, AUDIO, RENDERER,
};

use crate::cmd::SimulateArgs;
use crate::exit::{bridge_error, io_error, wire_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_json, print_raw, print_table, OutputFormat};

const DEMO_SPRITE: u32 = 1;
const LABEL_EVERY: i32 = 60;

#[derive(Serialize)]
struct SimulateOutput {
    mode: BridgeMode,
    throttle: usize,
    frames_requested: u32,
    frames_submitted: u32,
    outputs_received: u32,
    output_records: u64,
    interrupted: bool,
    elapsed_ms: u128,
    stats: BridgeStats,
}

/// Answers each batch with a sprite move, plus a label and a sound on
/// selected frames. Counts the mouse-motion records it was given.
struct DemoWorker {
    delay: Duration,
    channels: ChannelSet,
    mux: Multiplexer,
}

fn failed(err: impl std::fmt::Display) -> WorkerError {
    WorkerError::Failed(err.to_string())
}

impl DemoWorker {
    fn new(delay: Duration, capacity: usize) -> Self {
        Self {
            delay,
            channels: ChannelSet::with_channel_capacity(capacity),
            mux: Multiplexer::with_capacity(capacity * 2),
        }
    }

    fn count_motion(input: &[u8]) -> Result<u32, WorkerError> {
        if input.is_empty() {
            return Ok(0);
        }
        let mut motions = 0;
        for record in ChannelReader::new(Bytes::copy_from_slice(input)).map_err(failed)? {
            if record.map_err(failed)?.event_kind() == Some(EventKind::InputMouseMotion) {
                motions += 1;
            }
        }
        Ok(motions)
    }
}

impl DemoWorker {
    fn pack_frame(&mut self, tick: &FrameTick<'_>, motions: u32) -> tickbridge_wire::Result<()> {
        if tick.frame == 0 {
            let mut sprite = [0u8; 128];
            sprite[0..4].copy_from_slice(&DEMO_SPRITE.to_le_bytes());
            drop_if_full(
                EventKind::SpriteAdd,
                self.channels.channel(RENDERER).pack_fixed(EventKind::SpriteAdd, &sprite),
            )?;

            let path = b"sounds/start.ogg";
            drop_if_full(
                EventKind::AudioLoad,
                self.channels.channel(AUDIO).pack_variable(
                    EventKind::AudioLoad,
                    &(path.len() as u32).to_le_bytes(),
                    path,
                ),
            )?;
        }

        let mut mv = [0u8; 40];
        mv[0..4].copy_from_slice(&DEMO_SPRITE.to_le_bytes());
        mv[8..16].copy_from_slice(&tick.delta.to_le_bytes());
        mv[16..20].copy_from_slice(&motions.to_le_bytes());
        drop_if_full(
            EventKind::SpriteMove,
            self.channels.channel(RENDERER).pack_fixed(EventKind::SpriteMove, &mv),
        )?;

        if tick.frame % LABEL_EVERY == 0 {
            let label = format!("frame {}", tick.frame);
            let mut header = [0u8; 24];
            header[16..20].copy_from_slice(&(label.len() as u32).to_le_bytes());
            drop_if_full(
                EventKind::TextSetString,
                self.channels.channel(RENDERER).pack_variable(
                    EventKind::TextSetString,
                    &header,
                    label.as_bytes(),
                ),
            )?;
        }
        Ok(())
    }
}

/// A full channel truncates this frame's output at the last packed record.
fn drop_if_full(kind: EventKind, result: tickbridge_wire::Result<()>) -> tickbridge_wire::Result<()> {
    match result {
        Err(err @ WireError::BufferFull { .. }) => {
            tracing::warn!(kind = ?kind, error = %err, "channel full, record dropped");
            Ok(())
        }
        other => other,
    }
}

impl FrameWorker for DemoWorker {
    fn run_frame(&mut self, tick: FrameTick<'_>) -> Result<Bytes, WorkerError> {
        let motions = Self::count_motion(tick.input)?;
        if let Err(err) = self.pack_frame(&tick, motions) {
            self.channels.reset();
            return Err(failed(err));
        }

        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }

        let frame = self.channels.finish(&mut self.mux).map_err(failed)?;
        Ok(Bytes::copy_from_slice(frame))
    }

    fn shutdown(&mut self) {
        tracing::debug!("demo worker released");
    }
}

pub fn run(args: SimulateArgs, format: OutputFormat) -> CliResult<i32> {
    let config = BridgeConfig::default()
        .with_mode(args.mode.into())
        .with_throttle_threshold(args.throttle);
    let capacity = config.initial_buffer_capacity;
    let delay = Duration::from_millis(args.worker_delay_ms);

    let mut bridge = FrameBridge::start(config, move |_| Ok(DemoWorker::new(delay, capacity)))
        .map_err(|err| bridge_error("bridge start failed", err))?;
    install_ctrlc_handler(bridge.shutdown_handle())?;

    let interval = Duration::from_millis(args.frame_interval_ms);
    let mut input = Packer::with_capacity(4096);
    let mut last_output: Vec<u8> = Vec::new();
    let mut frames_submitted = 0u32;
    let mut interrupted = false;
    let mut outputs_received = 0u32;
    let mut output_records = 0u64;
    let started = Instant::now();
    let mut last_tick = started;

    for frame in 0..args.frames {
        if !bridge.is_running() {
            interrupted = true;
            break;
        }
        let now = Instant::now();
        let delta = now.duration_since(last_tick).as_secs_f64();
        last_tick = now;

        input.reset();
        let mut motion = [0u8; 16];
        motion[0..4].copy_from_slice(&(frame as f32).to_le_bytes());
        input
            .pack_fixed(EventKind::InputMouseMotion, &motion)
            .map_err(|err| wire_error("pack input", err))?;

        let out = bridge.submit(frame as i32, delta, input.finalize());
        frames_submitted += 1;
        if !out.is_empty() {
            outputs_received += 1;
            output_records += count_records(out)?;
            last_output.clear();
            last_output.extend_from_slice(out);
        }
        if !bridge.is_running() {
            interrupted = true;
            break;
        }

        if !interval.is_zero() {
            thread::sleep(interval.saturating_sub(now.elapsed()));
        }
    }

    let stats = bridge.stats();
    bridge.stop();
    tracing::info!(frames = frames_submitted, interrupted, "simulation finished");

    if let Some(path) = &args.dump {
        write_dump(path, &last_output)?;
    }

    let out = SimulateOutput {
        mode: args.mode.into(),
        throttle: args.throttle,
        frames_requested: args.frames,
        frames_submitted,
        outputs_received,
        output_records,
        interrupted,
        elapsed_ms: started.elapsed().as_millis(),
        stats,
    };
    print_output(&out, &last_output, format);
    Ok(SUCCESS)
}

fn count_records(frame: &[u8]) -> CliResult<u64> {
    let views = split(frame).map_err(|err| wire_error("split output", err))?;
    let mut total = 0u64;
    for view in views {
        let reader = ChannelReader::new(view.data.to_vec())
            .map_err(|err| wire_error("read output channel", err))?;
        total += u64::from(reader.declared_count());
    }
    Ok(total)
}

fn write_dump(path: &Path, frame: &[u8]) -> CliResult<()> {
    if frame.is_empty() {
        tracing::warn!(path = %path.display(), "no output collected; dump left empty");
    }
    std::fs::write(path, frame).map_err(|err| io_error(&format!("write {}", path.display()), err))
}

fn install_ctrlc_handler(handle: ShutdownHandle) -> CliResult<()> {
    ctrlc::set_handler(move || handle.stop()).map_err(|err| {
        CliError::new(INTERNAL, format!("signal handler setup failed: {err}"))
    })
}

fn print_output(out: &SimulateOutput, last_output: &[u8], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => print_table(
            &["METRIC", "VALUE"],
            [
                ("mode", out.mode.to_string()),
                ("throttle", out.throttle.to_string()),
                ("frames submitted", out.frames_submitted.to_string()),
                ("outputs received", out.outputs_received.to_string()),
                ("output records", out.output_records.to_string()),
                ("worker frames", out.stats.worker_frames.to_string()),
                ("frames coalesced", out.stats.frames_coalesced.to_string()),
                ("worker failures", out.stats.worker_failures.to_string()),
                ("input dropped", out.stats.input_dropped.to_string()),
                ("max pending", out.stats.max_pending_at_submit.to_string()),
                ("elapsed ms", out.elapsed_ms.to_string()),
            ]
            .into_iter()
            .map(|(k, v)| vec![k.to_string(), v]),
        ),
        OutputFormat::Pretty => {
            println!(
                "mode={} frames={}/{} outputs={} records={} coalesced={} failures={} max_pending={}{}",
                out.mode,
                out.frames_submitted,
                out.frames_requested,
                out.outputs_received,
                out.output_records,
                out.stats.frames_coalesced,
                out.stats.worker_failures,
                out.stats.max_pending_at_submit,
                if out.interrupted { " (interrupted)" } else { "" }
            );
        }
        OutputFormat::Raw => print_raw(last_output),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tickbridge_bridge::BridgeContext;

    #[test]
    fn test_demo_worker_counts_motion_and_emits_frame() {
        let mut input = Packer::with_capacity(256);
        input.pack_fixed(EventKind::InputMouseMotion, &[0u8; 16]).unwrap();
        input.pack_fixed(EventKind::InputKeyDown, &[0u8; 12]).unwrap();
        input.pack_fixed(EventKind::InputMouseMotion, &[0u8; 16]).unwrap();
        assert_eq!(DemoWorker::count_motion(input.finalize()).unwrap(), 2);
        assert_eq!(DemoWorker::count_motion(&[]).unwrap(), 0);
        assert!(DemoWorker::count_motion(&[1, 2]).is_err());
    }

    #[test]
    fn test_first_frame_carries_setup_records() {
        let mut bridge = FrameBridge::start(
            BridgeConfig::default().with_mode(BridgeMode::Direct),
            |_: &BridgeContext| Ok(DemoWorker::new(Duration::ZERO, 4096)),
        )
        .unwrap();
        let out = bridge.submit(0, 0.0, &[]).to_vec();
        let views = split(&out).unwrap();
        let ids: Vec<u32> = views.iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![RENDERER, AUDIO]);
        // Sprite add, move and label on the renderer, plus the sound load.
        assert_eq!(count_records(&out).unwrap(), 4);

        let out = bridge.submit(1, 0.016, &[]).to_vec();
        assert_eq!(count_records(&out).unwrap(), 1);
    }

    #[test]
    fn test_full_channel_truncates_frame_and_recovers() {
        // Room for the sprite add and nothing else on the renderer channel.
        let capacity = 8 + 144 + 8;
        let mut bridge = FrameBridge::start(
            BridgeConfig::default().with_mode(BridgeMode::Direct),
            move |_: &BridgeContext| Ok(DemoWorker::new(Duration::ZERO, capacity)),
        )
        .unwrap();

        let out = bridge.submit(0, 0.0, &[]).to_vec();
        let views = split(&out).unwrap();
        assert_eq!(views.len(), 2);
        let first = ChannelReader::new(views[0].data.to_vec()).unwrap();
        assert_eq!(first.declared_count(), 1);
        assert_eq!(count_records(&out).unwrap(), 2);

        for frame in 1..4 {
            let out = bridge.submit(frame, 0.016, &[]).to_vec();
            assert_eq!(count_records(&out).unwrap(), 1, "frame {frame}");
        }
        assert_eq!(bridge.stats().worker_failures, 0);
    }
}
