//! Per-frame handoff between a real-time driver and a worker, with a compact
//! binary event format for what crosses between them.
//!
//! # Crate Structure
//!
//! - [`wire`]: event catalog, channel packer/unpacker and frame multiplexing
//! - [`bridge`]: the direct and pipelined frame bridge
//!
//! C callers link `tickbridge-ffi` instead.

/// Re-export wire format types.
pub mod wire {
    pub use tickbridge_wire::*;
}

/// Re-export bridge types.
pub mod bridge {
    pub use tickbridge_bridge::*;
}
