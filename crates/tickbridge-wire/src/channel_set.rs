use std::collections::BTreeMap;

use crate::error::Result;
use crate::mux::{ChannelInput, Multiplexer};
use crate::packer::{Packer, DEFAULT_CHANNEL_CAPACITY};

/// One packer per channel, created on first use.
///
/// Channels are emitted in ascending id order. A channel with no records this
/// frame is left out of the combined frame entirely.
#[derive(Debug)]
pub struct ChannelSet {
    channels: BTreeMap<u32, Packer>,
    channel_capacity: usize,
}

impl ChannelSet {
    pub fn new() -> Self {
        Self::with_channel_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Packers created by this set hold at most `capacity` bytes each.
    pub fn with_channel_capacity(capacity: usize) -> Self {
        Self {
            channels: BTreeMap::new(),
            channel_capacity: capacity,
        }
    }

    /// The packer for `id`, created empty if this is its first use.
    pub fn channel(&mut self, id: u32) -> &mut Packer {
        let capacity = self.channel_capacity;
        self.channels
            .entry(id)
            .or_insert_with(|| Packer::with_capacity(capacity))
    }

    /// Ids of channels holding at least one record, ascending.
    pub fn active_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.channels
            .iter()
            .filter(|(_, packer)| !packer.is_empty())
            .map(|(id, _)| *id)
    }

    /// True when no channel holds a record.
    pub fn is_empty(&self) -> bool {
        self.active_ids().next().is_none()
    }

    /// Finalize every active channel and combine them into `mux`.
    ///
    /// All packers are reset afterwards, whether or not combining succeeded.
    pub fn finish<'m>(&mut self, mux: &'m mut Multiplexer) -> Result<&'m [u8]> {
        let inputs: Vec<ChannelInput<'_>> = self
            .channels
            .iter_mut()
            .filter(|(_, packer)| !packer.is_empty())
            .map(|(id, packer)| ChannelInput::new(*id, packer.finalize()))
            .collect();
        let result = mux.combine(&inputs);
        drop(inputs);
        self.reset();
        result
    }

    /// Reset every packer, keeping their allocations.
    pub fn reset(&mut self) {
        for packer in self.channels.values_mut() {
            packer.reset();
        }
    }
}

impl Default for ChannelSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::EventKind;
    use crate::channel::{AUDIO, RENDERER, WINDOW};
    use crate::mux::split;
    use crate::record::ChannelReader;

    #[test]
    fn test_finish_sorts_and_skips_empty() {
        let mut set = ChannelSet::with_channel_capacity(1024);
        let mut mux = Multiplexer::with_capacity(4096);

        set.channel(WINDOW).pack_fixed(EventKind::WindowResize, &[0; 8]).unwrap();
        set.channel(RENDERER).pack_fixed(EventKind::SpriteRemove, &[0; 16]).unwrap();
        set.channel(AUDIO);

        let frame = set.finish(&mut mux).unwrap().to_vec();
        let views = split(&frame).unwrap();
        let ids: Vec<u32> = views.iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![RENDERER, WINDOW]);

        let records = ChannelReader::new(views[1].data.to_vec()).unwrap().collect_records().unwrap();
        assert_eq!(records[0].event_kind(), Some(EventKind::WindowResize));
    }

    #[test]
    fn test_finish_resets_packers() {
        let mut set = ChannelSet::with_channel_capacity(256);
        let mut mux = Multiplexer::with_capacity(1024);
        set.channel(AUDIO).pack_fixed(EventKind::AudioStopAll, &[]).unwrap();
        assert!(!set.is_empty());

        set.finish(&mut mux).unwrap();
        assert!(set.is_empty());
        assert_eq!(set.finish(&mut mux).unwrap(), &[0u8; 8]);
    }

    #[test]
    fn test_finish_reports_overflow() {
        let mut set = ChannelSet::with_channel_capacity(1024);
        let mut mux = Multiplexer::with_capacity(16);
        set.channel(RENDERER).pack_fixed(EventKind::SpriteAdd, &[0; 128]).unwrap();
        assert!(set.finish(&mut mux).is_err());
        assert!(set.is_empty());
    }
}
