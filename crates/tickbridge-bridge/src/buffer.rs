use tickbridge_wire::record::record_count;
use tickbridge_wire::{WireError, CHANNEL_HEADER_SIZE};

use crate::error::{BridgeError, Result};

/// Slack added before doubling when a buffer grows.
const GROWTH_SLACK: usize = 4096;

/// What [`FrameBuffer::merge_batch`] did with a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Merge {
    /// The batch was empty.
    Nothing,
    /// The buffer was empty and now holds the batch as-is.
    Staged,
    /// The batch's records were appended to the ones already held.
    Coalesced,
}

/// Growable byte storage owned by exactly one side of the bridge at a time.
///
/// Growth goes through `try_reserve`, so running out of memory surfaces as
/// [`BridgeError::Allocation`] instead of aborting.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    name: &'static str,
    data: Vec<u8>,
}

impl FrameBuffer {
    pub fn with_capacity(name: &'static str, capacity: usize) -> Self {
        Self {
            name,
            data: Vec::with_capacity(capacity),
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    fn grow_to(&mut self, needed: usize) -> Result<()> {
        if needed <= self.data.capacity() {
            return Ok(());
        }
        let target = needed.saturating_add(GROWTH_SLACK).saturating_mul(2);
        let additional = target - self.data.len();
        if self.data.try_reserve(additional).is_ok() {
            return Ok(());
        }
        self.data
            .try_reserve_exact(needed - self.data.len())
            .map_err(|_| BridgeError::Allocation {
                buffer: self.name,
                requested: needed,
            })
    }

    /// Replace the contents with `bytes`. On failure the buffer is left empty.
    pub fn replace_with(&mut self, bytes: &[u8]) -> Result<()> {
        self.data.clear();
        self.grow_to(bytes.len())?;
        self.data.extend_from_slice(bytes);
        Ok(())
    }

    /// Fold a channel blob into the one already held.
    ///
    /// Record counts are summed and the incoming blob's header is dropped,
    /// leaving one larger batch. On failure the held batch is untouched.
    pub fn merge_batch(&mut self, batch: &[u8]) -> Result<Merge> {
        if batch.is_empty() {
            return Ok(Merge::Nothing);
        }
        if batch.len() < CHANNEL_HEADER_SIZE {
            return Err(BridgeError::Wire(WireError::Malformed(format!(
                "input batch of {} bytes has no channel header",
                batch.len()
            ))));
        }
        if self.data.is_empty() {
            self.replace_with(batch)?;
            return Ok(Merge::Staged);
        }

        let held = record_count(&self.data)?;
        let incoming = record_count(batch)?;
        let total = held.checked_add(incoming).ok_or_else(|| {
            BridgeError::Wire(WireError::Malformed("merged record count overflows u32".to_string()))
        })?;

        let records = &batch[CHANNEL_HEADER_SIZE..];
        self.grow_to(self.data.len() + records.len())?;
        self.data.extend_from_slice(records);
        self.data[0..4].copy_from_slice(&total.to_le_bytes());
        Ok(Merge::Coalesced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tickbridge_wire::{ChannelReader, EventKind, Packer};

    fn batch(keys: &[u8]) -> Vec<u8> {
        let mut packer = Packer::with_capacity(1024);
        for key in keys {
            packer.pack_fixed(EventKind::InputKeyDown, &[*key; 12]).unwrap();
        }
        packer.finalize().to_vec()
    }

    #[test]
    fn test_merge_into_empty_stages() {
        let mut buf = FrameBuffer::with_capacity("input", 16);
        assert_eq!(buf.merge_batch(&batch(&[1])).unwrap(), Merge::Staged);
        assert_eq!(buf.len(), 8 + 32);
    }

    #[test]
    fn test_merge_sums_counts_and_drops_header() {
        let mut buf = FrameBuffer::with_capacity("input", 16);
        buf.merge_batch(&batch(&[1, 2])).unwrap();
        assert_eq!(buf.merge_batch(&batch(&[3])).unwrap(), Merge::Coalesced);
        assert_eq!(buf.len(), 8 + 3 * 32);

        let keys: Vec<u8> = ChannelReader::new(buf.as_slice().to_vec())
            .unwrap()
            .map(|r| match r.unwrap().body {
                tickbridge_wire::RecordBody::Fixed(b) => b[0],
                other => panic!("unexpected body {other:?}"),
            })
            .collect();
        assert_eq!(keys, vec![1, 2, 3]);
    }

    #[test]
    fn test_merge_empty_batch_is_noop() {
        let mut buf = FrameBuffer::default();
        assert_eq!(buf.merge_batch(&[]).unwrap(), Merge::Nothing);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_merge_rejects_headerless_batch() {
        let mut buf = FrameBuffer::default();
        buf.merge_batch(&batch(&[1])).unwrap();
        let before = buf.len();
        assert!(buf.merge_batch(&[1, 0, 0, 0, 0]).is_err());
        assert_eq!(buf.len(), before);

        let mut empty = FrameBuffer::default();
        assert!(empty.merge_batch(&[1, 0]).is_err());
        assert!(empty.is_empty());
    }

    #[test]
    fn test_replace_grows_with_slack() {
        let mut buf = FrameBuffer::with_capacity("output", 8);
        buf.replace_with(&[9u8; 100]).unwrap();
        assert_eq!(buf.as_slice(), &[9u8; 100]);
        assert!(buf.capacity() >= (100 + GROWTH_SLACK) * 2);
    }
}
