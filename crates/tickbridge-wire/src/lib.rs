//! Binary event wire format for per-frame command buffers.
//!
//! A frame is a set of independently packed channels, each a count-prefixed
//! stream of 8-byte-aligned records:
//! - [`Packer`] builds one channel, never writing a partial record
//! - [`Unpacker`] reads one with bounds-checked, non-advancing failures
//! - [`combine`] and [`split`] multiplex channels into one outer frame
//! - the [`catalog`] maps event kinds to fixed payload sizes so that decoders
//!   can skip what they do not interpret
//!
//! All integers are little-endian.

pub mod catalog;
pub mod channel;
pub mod channel_set;
pub mod error;
pub mod mux;
pub mod packer;
pub mod record;
pub mod unpacker;

pub use catalog::{has_legacy_padding, payload_size, CatalogEntry, EventCategory, EventKind, PayloadLayout};
pub use channel::{channel_name, AUDIO, GUI, INPUT, PHYSICS, RENDERER, SCRIPT, WINDOW};
pub use channel_set::ChannelSet;
pub use error::{Result, WireError};
pub use mux::{combine, split, ChannelInput, ChannelView, Multiplexer, DEFAULT_FRAME_CAPACITY};
pub use packer::{Packer, CHANNEL_HEADER_SIZE, DEFAULT_CHANNEL_CAPACITY, RECORD_HEADER_SIZE};
pub use record::{ChannelReader, Record, RecordBody};
pub use unpacker::{pad8, Unpacker};
