//! Pipelined loop example: a driver at ~60 Hz feeding a slower worker thread.
//!
//! Run with:
//!   cargo run --example pipelined-loop

use std::thread;
use std::time::Duration;

use bytes::Bytes;
use tickbridge::bridge::{BridgeConfig, BridgeMode, FrameBridge, FrameTick, WorkerError};
use tickbridge::wire::{split, ChannelReader, ChannelSet, EventKind, Multiplexer, Packer, RENDERER};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = BridgeConfig::default()
        .with_mode(BridgeMode::Pipelined)
        .with_throttle_threshold(2);

    // The worker state lives on the worker thread; the factory builds it there.
    let mut bridge = FrameBridge::start(config, |ctx| {
        eprintln!("[worker] starting, entry point {}", ctx.entry_point());
        let mut channels = ChannelSet::with_channel_capacity(64 * 1024);
        let mut mux = Multiplexer::with_capacity(128 * 1024);
        Ok(move |tick: FrameTick<'_>| -> Result<Bytes, WorkerError> {
            let keys = if tick.input.is_empty() {
                0
            } else {
                ChannelReader::new(Bytes::copy_from_slice(tick.input))
                    .map_err(|e| WorkerError::Failed(e.to_string()))?
                    .declared_count()
            };
            // Simulate a worker that cannot keep up with the driver.
            thread::sleep(Duration::from_millis(25));

            let mut mv = [0u8; 40];
            mv[0..4].copy_from_slice(&tick.frame.to_le_bytes());
            mv[4..8].copy_from_slice(&keys.to_le_bytes());
            channels
                .channel(RENDERER)
                .pack_fixed(EventKind::SpriteMove, &mv)
                .map_err(|e| WorkerError::Failed(e.to_string()))?;
            let frame = channels
                .finish(&mut mux)
                .map_err(|e| WorkerError::Failed(e.to_string()))?;
            Ok(Bytes::copy_from_slice(frame))
        })
    })?;

    let mut input = Packer::with_capacity(1024);
    for frame in 0..30 {
        input.reset();
        input.pack_fixed(EventKind::InputKeyDown, &[0u8; 12])?;

        let out = bridge.submit(frame, 1.0 / 60.0, input.finalize());
        if out.is_empty() {
            eprintln!("[driver] frame {frame}: worker busy");
        } else {
            let views = split(out)?;
            let record = ChannelReader::new(views[0].data.to_vec())?
                .next()
                .transpose()?;
            if let Some(record) = record {
                let name = record.event_kind().map_or("UNKNOWN", |k| k.name());
                eprintln!("[driver] frame {frame}: got {name}");
            }
        }
        thread::sleep(Duration::from_millis(16));
    }

    let stats = bridge.stats();
    bridge.stop();
    eprintln!(
        "[driver] worker ran {} frames, {} submissions coalesced, max backlog {}",
        stats.worker_frames, stats.frames_coalesced, stats.max_pending_at_submit
    );
    Ok(())
}
