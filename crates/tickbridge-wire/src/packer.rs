use bytes::{BufMut, BytesMut};

use crate::catalog::has_legacy_padding;
use crate::error::{Result, WireError};
use crate::unpacker::pad8;

/// Channel header: record count (4) + reserved (4).
pub const CHANNEL_HEADER_SIZE: usize = 8;

/// Record prefix: kind (4) + timestamp (8) + reserved (4).
pub const RECORD_HEADER_SIZE: usize = 16;

/// Extra zero bytes written after the header of legacy padded kinds.
pub const LEGACY_PAD_SIZE: usize = 4;

/// Default capacity of one channel buffer: 25 MiB.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 25 * 1024 * 1024;

const ZEROS: [u8; 8] = [0; 8];

/// Builds one channel's record stream into a fixed-capacity buffer.
///
/// Channel layout:
/// ```text
/// ┌────────────────┬──────────┬──────────────────────────────┐
/// │ Count (4B LE)  │ Reserved │ Records ...                  │
/// │ back-patched   │ (4B)     │ each a multiple of 8 bytes   │
/// └────────────────┴──────────┴──────────────────────────────┘
/// ```
///
/// Record layout:
/// ```text
/// ┌─────────────┬────────────────┬──────────┬─────────┬─────────────┐
/// │ Kind (4B LE)│ Timestamp (8B) │ Reserved │ Payload │ Pad to 8    │
/// │             │ always 0       │ (4B)     │         │             │
/// └─────────────┴────────────────┴──────────┴─────────┴─────────────┘
/// ```
///
/// A pack call that would exceed capacity fails with
/// [`WireError::BufferFull`] and writes nothing.
#[derive(Debug)]
pub struct Packer {
    buf: BytesMut,
    capacity: usize,
    command_count: u32,
}

impl Packer {
    /// Create a packer whose buffer holds at most `capacity` bytes, header included.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(CHANNEL_HEADER_SIZE);
        let mut packer = Self {
            buf: BytesMut::with_capacity(capacity),
            capacity,
            command_count: 0,
        };
        packer.reset();
        packer
    }

    /// Drop all records and start a fresh channel in the same allocation.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.buf.put_slice(&ZEROS);
        self.command_count = 0;
    }

    fn reserve(&self, record_size: usize) -> Result<()> {
        let remaining = self.capacity - self.buf.len();
        if record_size > remaining {
            return Err(WireError::BufferFull {
                requested: record_size,
                remaining,
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    fn put_prefix(&mut self, kind: u32) {
        self.buf.put_u32_le(kind);
        self.buf.put_u64_le(0);
        self.buf.put_u32_le(0);
    }

    fn legacy_pad(kind: u32) -> usize {
        if has_legacy_padding(kind) {
            LEGACY_PAD_SIZE
        } else {
            0
        }
    }

    /// Append a record with a fixed-size payload.
    pub fn pack_fixed(&mut self, kind: impl Into<u32>, payload: &[u8]) -> Result<()> {
        let kind = kind.into();
        let unaligned = RECORD_HEADER_SIZE + payload.len() + Self::legacy_pad(kind);
        let size = unaligned + pad8(unaligned);
        self.reserve(size)?;

        self.put_prefix(kind);
        self.buf.put_slice(payload);
        self.buf.put_bytes(0, size - RECORD_HEADER_SIZE - payload.len());
        self.command_count += 1;
        Ok(())
    }

    /// Append a record with a fixed header followed by one byte string.
    pub fn pack_variable(&mut self, kind: impl Into<u32>, header: &[u8], data: &[u8]) -> Result<()> {
        self.pack_variable_parts(kind, header, &[data])
    }

    /// Append a record with a fixed header followed by several byte strings.
    ///
    /// Each string is padded to 8 bytes in order. The header's own length
    /// fields are the caller's responsibility.
    pub fn pack_variable_parts(
        &mut self,
        kind: impl Into<u32>,
        header: &[u8],
        parts: &[&[u8]],
    ) -> Result<()> {
        let kind = kind.into();
        let legacy = Self::legacy_pad(kind);
        let strings: usize = parts.iter().map(|p| p.len() + pad8(p.len())).sum();
        let unaligned = RECORD_HEADER_SIZE + header.len() + legacy + strings;
        let size = unaligned + pad8(unaligned);
        self.reserve(size)?;

        self.put_prefix(kind);
        self.buf.put_slice(header);
        self.buf.put_bytes(0, legacy);
        for part in parts {
            self.buf.put_slice(part);
            self.buf.put_bytes(0, pad8(part.len()));
        }
        self.buf.put_bytes(0, pad8(unaligned));
        self.command_count += 1;
        Ok(())
    }

    /// Write the record count into the channel header and return the bytes.
    pub fn finalize(&mut self) -> &[u8] {
        self.buf[0..4].copy_from_slice(&self.command_count.to_le_bytes());
        &self.buf
    }

    /// Records packed since the last reset.
    pub fn command_count(&self) -> u32 {
        self.command_count
    }

    /// Bytes written so far, header included.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// True when no record has been packed since the last reset.
    pub fn is_empty(&self) -> bool {
        self.command_count == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current bytes. The count field is only valid after [`finalize`](Self::finalize).
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }
}

impl Default for Packer {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }
}
