//! Multi-channel example: pack renderer and audio records, combine them into
//! one frame, then split and decode it the way a driver would.
//!
//! Run with:
//!   cargo run --example multi-channel

use tickbridge::wire::{
    channel_name, split, ChannelReader, ChannelSet, EventKind, Multiplexer, RecordBody, AUDIO,
    RENDERER,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut channels = ChannelSet::with_channel_capacity(4096);
    let mut mux = Multiplexer::with_capacity(16 * 1024);

    let mut color = [0u8; 24];
    color[0..4].copy_from_slice(&7u32.to_le_bytes());
    channels.channel(RENDERER).pack_fixed(EventKind::SpriteColor, &color)?;

    let label = b"score: 42";
    let mut header = [0u8; 24];
    header[16..20].copy_from_slice(&(label.len() as u32).to_le_bytes());
    channels
        .channel(RENDERER)
        .pack_variable(EventKind::TextSetString, &header, label)?;

    let path = b"music/theme.ogg";
    channels
        .channel(AUDIO)
        .pack_variable(EventKind::AudioLoad, &(path.len() as u32).to_le_bytes(), path)?;
    channels.channel(AUDIO).pack_fixed(EventKind::AudioStopAll, &[])?;

    let frame = channels.finish(&mut mux)?.to_vec();
    eprintln!("[worker] combined frame: {} bytes", frame.len());

    for view in split(&frame)? {
        eprintln!("[driver] channel {} ({} bytes)", channel_name(view.id), view.data.len());
        for record in ChannelReader::new(view.data.to_vec())? {
            let record = record?;
            let name = record.event_kind().map_or("UNKNOWN", |k| k.name());
            match record.body {
                RecordBody::Variable { parts, .. } => {
                    let text: Vec<_> = parts.iter().map(|p| String::from_utf8_lossy(p)).collect();
                    eprintln!("[driver]   {name} {text:?}");
                }
                body => eprintln!("[driver]   {name} {body:?}"),
            }
        }
    }
    Ok(())
}
