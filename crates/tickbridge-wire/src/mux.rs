use crate::error::{Result, WireError};
use crate::unpacker::Unpacker;

/// Frame header: channel count (4) + padding (4).
pub const FRAME_HEADER_SIZE: usize = 8;

/// Index entry: channel id (4) + channel size (4).
pub const INDEX_ENTRY_SIZE: usize = 8;

/// Default capacity of the combined frame buffer: 50 MiB.
pub const DEFAULT_FRAME_CAPACITY: usize = 50 * 1024 * 1024;

/// One finalized channel buffer to be combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelInput<'a> {
    pub id: u32,
    pub data: &'a [u8],
}

impl<'a> ChannelInput<'a> {
    pub fn new(id: u32, data: &'a [u8]) -> Self {
        Self { id, data }
    }
}

/// A channel blob borrowed out of a combined frame.
pub type ChannelView<'a> = ChannelInput<'a>;

/// Total bytes `combine` needs for `channels`.
pub fn frame_size(channels: &[ChannelInput<'_>]) -> usize {
    FRAME_HEADER_SIZE
        + channels.len() * INDEX_ENTRY_SIZE
        + channels.iter().map(|c| c.data.len()).sum::<usize>()
}

/// Combine finalized channel buffers into one frame.
///
/// Wire format:
/// ```text
/// ┌─────────────┬──────────┬──────────────────────────┬───────────────────┐
/// │ Count (4B)  │ Pad (4B) │ Index: {id, size}[count] │ Channel blobs     │
/// │             │          │ (8B each, LE)            │ (in index order)  │
/// └─────────────┴──────────┴──────────────────────────┴───────────────────┘
/// ```
///
/// Returns the number of bytes written to `out`. If the frame does not fit,
/// fails with [`WireError::BufferFull`] and the caller should treat the frame
/// as empty.
pub fn combine(out: &mut [u8], channels: &[ChannelInput<'_>]) -> Result<usize> {
    let total = frame_size(channels);
    if total > out.len() {
        return Err(WireError::BufferFull {
            requested: total,
            remaining: out.len(),
            capacity: out.len(),
        });
    }
    let count = u32::try_from(channels.len())
        .map_err(|_| WireError::Malformed(format!("too many channels ({})", channels.len())))?;

    out[0..4].copy_from_slice(&count.to_le_bytes());
    out[4..8].fill(0);

    let mut index = FRAME_HEADER_SIZE;
    let mut cursor = FRAME_HEADER_SIZE + channels.len() * INDEX_ENTRY_SIZE;
    for channel in channels {
        let size = u32::try_from(channel.data.len()).map_err(|_| {
            WireError::Malformed(format!("channel {} exceeds u32 size", channel.id))
        })?;
        out[index..index + 4].copy_from_slice(&channel.id.to_le_bytes());
        out[index + 4..index + 8].copy_from_slice(&size.to_le_bytes());
        index += INDEX_ENTRY_SIZE;

        out[cursor..cursor + channel.data.len()].copy_from_slice(channel.data);
        cursor += channel.data.len();
    }

    tracing::trace!(channels = channels.len(), bytes = total, "combined frame");
    Ok(total)
}

/// Split a combined frame back into its channel blobs.
///
/// A zero-length frame carries no channels.
pub fn split(frame: &[u8]) -> Result<Vec<ChannelView<'_>>> {
    if frame.is_empty() {
        return Ok(Vec::new());
    }
    let mut un = Unpacker::new(frame);
    let count = un.read_u32()? as usize;
    un.skip(4)?;

    let index_len = count
        .checked_mul(INDEX_ENTRY_SIZE)
        .filter(|len| *len <= un.remaining())
        .ok_or_else(|| {
            WireError::Malformed(format!(
                "index for {count} channels exceeds frame length {}",
                frame.len()
            ))
        })?;

    let mut index = Unpacker::new(un.read_fixed(index_len)?);
    let mut views = Vec::with_capacity(count);
    for _ in 0..count {
        let id = index.read_u32()?;
        let size = index.read_u32()? as usize;
        let data = un.read_fixed(size).map_err(|_| {
            WireError::Malformed(format!(
                "channel {id} declares {size} bytes, {} remain",
                un.remaining()
            ))
        })?;
        views.push(ChannelView { id, data });
    }
    if !un.is_exhausted() {
        return Err(WireError::Malformed(format!(
            "{} trailing bytes after last channel",
            un.remaining()
        )));
    }
    Ok(views)
}

/// Owns a pre-sized destination reused for every frame.
#[derive(Debug)]
pub struct Multiplexer {
    buf: Vec<u8>,
    len: usize,
}

impl Multiplexer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: vec![0; capacity],
            len: 0,
        }
    }

    /// Combine `channels` into the owned buffer and return the frame.
    ///
    /// On error the previous frame is discarded and [`as_bytes`](Self::as_bytes)
    /// is empty.
    pub fn combine(&mut self, channels: &[ChannelInput<'_>]) -> Result<&[u8]> {
        self.len = 0;
        self.len = combine(&mut self.buf, channels)?;
        Ok(&self.buf[..self.len])
    }

    /// The most recently combined frame.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }
}

impl Default for Multiplexer {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_FRAME_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combine_layout() {
        let a = [1u8; 16];
        let b = [2u8; 8];
        let mut out = [0xFFu8; 64];
        let n = combine(&mut out, &[ChannelInput::new(3, &a), ChannelInput::new(0, &b)]).unwrap();

        assert_eq!(n, 8 + 2 * 8 + 16 + 8);
        assert_eq!(&out[0..8], &[2, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(&out[8..16], &[3, 0, 0, 0, 16, 0, 0, 0]);
        assert_eq!(&out[16..24], &[0, 0, 0, 0, 8, 0, 0, 0]);
        assert_eq!(&out[24..40], &a);
        assert_eq!(&out[40..48], &b);
    }

    #[test]
    fn test_size_accounting() {
        let blobs = [vec![0u8; 40], vec![0u8; 8], vec![0u8; 1000]];
        let inputs: Vec<_> = blobs
            .iter()
            .enumerate()
            .map(|(i, b)| ChannelInput::new(i as u32, b))
            .collect();
        let mut out = vec![0u8; 2048];
        let n = combine(&mut out, &inputs).unwrap();

        let views = split(&out[..n]).unwrap();
        let sizes: usize = views.iter().map(|v| v.data.len()).sum();
        assert_eq!(sizes + FRAME_HEADER_SIZE + 3 * INDEX_ENTRY_SIZE, n);
    }

    #[test]
    fn test_combine_too_small() {
        let data = [0u8; 32];
        let mut out = [0u8; 40];
        let err = combine(&mut out, &[ChannelInput::new(1, &data)]).unwrap_err();
        assert_eq!(
            err,
            WireError::BufferFull {
                requested: 48,
                remaining: 40,
                capacity: 40
            }
        );
    }

    #[test]
    fn test_combine_no_channels() {
        let mut out = [0xAAu8; 8];
        assert_eq!(combine(&mut out, &[]).unwrap(), 8);
        assert_eq!(out, [0u8; 8]);
    }

    #[test]
    fn test_split_roundtrip_preserves_order() {
        let mut mux = Multiplexer::with_capacity(256);
        let frame = mux
            .combine(&[ChannelInput::new(5, b"windowxx"), ChannelInput::new(2, b"physicsx")])
            .unwrap()
            .to_vec();
        let views = split(&frame).unwrap();
        assert_eq!(views.len(), 2);
        assert_eq!(views[0].id, 5);
        assert_eq!(views[1].data, b"physicsx");
    }

    #[test]
    fn test_split_empty_frame() {
        assert!(split(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_split_rejects_bad_index() {
        let mut frame = Vec::new();
        frame.extend_from_slice(&1000u32.to_le_bytes());
        frame.extend_from_slice(&[0; 4]);
        assert!(matches!(split(&frame), Err(WireError::Malformed(_))));

        let mut frame = Vec::new();
        frame.extend_from_slice(&1u32.to_le_bytes());
        frame.extend_from_slice(&[0; 4]);
        frame.extend_from_slice(&0u32.to_le_bytes());
        frame.extend_from_slice(&64u32.to_le_bytes());
        frame.extend_from_slice(&[0; 8]);
        assert!(matches!(split(&frame), Err(WireError::Malformed(_))));
    }

    #[test]
    fn test_multiplexer_error_clears_frame() {
        let mut mux = Multiplexer::with_capacity(32);
        mux.combine(&[ChannelInput::new(0, &[1; 8])]).unwrap();
        assert_eq!(mux.as_bytes().len(), 24);

        assert!(mux.combine(&[ChannelInput::new(0, &[1; 64])]).is_err());
        assert!(mux.as_bytes().is_empty());
    }
}
