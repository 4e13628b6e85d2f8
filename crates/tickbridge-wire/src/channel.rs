//! Well-known channel IDs.
//!
//! Any `u32` is a valid channel id on the wire. The ids below are the ones the
//! driver routes to its built-in subsystems.

/// Sprites, geometry, text, and camera commands.
pub const RENDERER: u32 = 0;

/// Keyboard and mouse events from the driver.
pub const INPUT: u32 = 1;

/// Rigid-body commands and collision notifications.
pub const PHYSICS: u32 = 2;

/// Sound loading and playback.
pub const AUDIO: u32 = 3;

/// Immediate-mode UI commands.
pub const GUI: u32 = 4;

/// Window title, size, and flags.
pub const WINDOW: u32 = 5;

/// Script subscription management.
pub const SCRIPT: u32 = 6;

/// First channel id not claimed by a built-in subsystem.
pub const USER_CHANNEL_START: u32 = 256;

/// Returns a human-readable name for a channel ID.
pub fn channel_name(id: u32) -> &'static str {
    match id {
        RENDERER => "RENDERER",
        INPUT => "INPUT",
        PHYSICS => "PHYSICS",
        AUDIO => "AUDIO",
        GUI => "GUI",
        WINDOW => "WINDOW",
        SCRIPT => "SCRIPT",
        7..=255 => "RESERVED",
        _ => "USER",
    }
}

/// Returns true if the channel ID is a built-in channel.
pub fn is_builtin(id: u32) -> bool {
    id <= SCRIPT
}
