//! Decoding of packed channel streams into typed records.

use bytes::Bytes;

use crate::catalog::{entry, has_legacy_padding, primitive, CatalogEntry, EventKind, PayloadLayout};
use crate::error::{Result, WireError};
use crate::packer::{CHANNEL_HEADER_SIZE, LEGACY_PAD_SIZE};
use crate::unpacker::{pad8, u32_at, Unpacker};

/// One decoded event.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub kind: u32,
    pub timestamp: u64,
    pub body: RecordBody,
}

/// Payload of a decoded event, shaped by the kind's catalog layout.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordBody {
    /// Known kind with no payload.
    Empty,
    /// Known fixed-size payload.
    Fixed(Bytes),
    /// Fixed header plus the variable data that followed it.
    Variable { header: Bytes, parts: Vec<Bytes> },
    /// Kind not in the catalog. Its payload is assumed empty.
    Unknown,
}

impl Record {
    pub fn event_kind(&self) -> Option<EventKind> {
        EventKind::from_u32(self.kind)
    }

    /// Payload bytes carried by the record, padding excluded.
    pub fn payload_len(&self) -> usize {
        match &self.body {
            RecordBody::Empty | RecordBody::Unknown => 0,
            RecordBody::Fixed(bytes) => bytes.len(),
            RecordBody::Variable { header, parts } => {
                header.len() + parts.iter().map(Bytes::len).sum::<usize>()
            }
        }
    }
}

type DecodeFn = fn(&Bytes, &mut Unpacker<'_>, &CatalogEntry) -> Result<RecordBody>;

fn decoder(layout: &PayloadLayout) -> DecodeFn {
    match layout {
        PayloadLayout::Empty => decode_empty,
        PayloadLayout::Fixed => decode_fixed,
        PayloadLayout::Strings { .. } => decode_strings,
        PayloadLayout::Primitives { .. } => decode_primitives,
    }
}

fn skip_legacy(un: &mut Unpacker<'_>, entry: &CatalogEntry) -> Result<()> {
    if has_legacy_padding(entry.kind.id()) {
        un.skip(LEGACY_PAD_SIZE)?;
    }
    Ok(())
}

fn decode_empty(_: &Bytes, un: &mut Unpacker<'_>, entry: &CatalogEntry) -> Result<RecordBody> {
    skip_legacy(un, entry)?;
    Ok(RecordBody::Empty)
}

fn decode_fixed(src: &Bytes, un: &mut Unpacker<'_>, entry: &CatalogEntry) -> Result<RecordBody> {
    let payload = un.read_fixed(entry.fixed_size)?;
    skip_legacy(un, entry)?;
    Ok(RecordBody::Fixed(src.slice_ref(payload)))
}

fn read_part(src: &Bytes, un: &mut Unpacker<'_>, len: usize) -> Result<Bytes> {
    let data = un.read_fixed(len)?;
    un.skip(pad8(len))?;
    Ok(src.slice_ref(data))
}

fn header_field(header: &[u8], offset: usize, entry: &CatalogEntry) -> Result<usize> {
    u32_at(header, offset)
        .map(|v| v as usize)
        .ok_or_else(|| WireError::Malformed(format!("{} header has no field at offset {offset}", entry.name)))
}

fn decode_strings(src: &Bytes, un: &mut Unpacker<'_>, entry: &CatalogEntry) -> Result<RecordBody> {
    let PayloadLayout::Strings { length_offsets } = entry.layout else {
        return decode_fixed(src, un, entry);
    };
    let header = un.read_fixed(entry.fixed_size)?;
    skip_legacy(un, entry)?;

    let mut parts = Vec::with_capacity(length_offsets.len());
    for &offset in length_offsets {
        let len = header_field(header, offset, entry)?;
        parts.push(read_part(src, un, len)?);
    }
    Ok(RecordBody::Variable {
        header: src.slice_ref(header),
        parts,
    })
}

fn decode_primitives(src: &Bytes, un: &mut Unpacker<'_>, entry: &CatalogEntry) -> Result<RecordBody> {
    let PayloadLayout::Primitives {
        type_offset,
        count_offset,
    } = entry.layout
    else {
        return decode_fixed(src, un, entry);
    };
    let header = un.read_fixed(entry.fixed_size)?;
    skip_legacy(un, entry)?;

    let primitive_type = header_field(header, type_offset, entry)? as u32;
    let count = header_field(header, count_offset, entry)?;
    let len = count
        .checked_mul(primitive::element_size(primitive_type))
        .ok_or_else(|| WireError::Malformed(format!("{} element count {count} overflows", entry.name)))?;

    let data = read_part(src, un, len)?;
    Ok(RecordBody::Variable {
        header: src.slice_ref(header),
        parts: vec![data],
    })
}

/// Decode the record starting at `offset` in `src`.
///
/// Returns the record and the offset of the next one, which always sits on an
/// 8-byte boundary. Unknown kinds are read as a bare prefix; a decoder that
/// meets one relies on the alignment invariant to land on the following record.
pub fn decode_record(src: &Bytes, offset: usize) -> Result<(Record, usize)> {
    let mut un = Unpacker::new(src);
    un.skip(offset)?;
    let kind = un.read_u32()?;
    let timestamp = un.read_u64()?;
    un.skip(4)?;

    let body = match entry(kind) {
        Some(entry) => decoder(&entry.layout)(src, &mut un, entry)?,
        None => RecordBody::Unknown,
    };
    un.align_to(8)?;

    let record = Record {
        kind,
        timestamp,
        body,
    };
    Ok((record, un.position()))
}

/// Read the record count from a channel header.
pub fn record_count(blob: &[u8]) -> Result<u32> {
    Unpacker::new(blob).read_u32()
}

/// Iterator over the records of one channel blob.
///
/// Yields `Err` once when the stream is truncated or malformed, then stops.
/// Records decoded before the failure remain valid.
#[derive(Debug, Clone)]
pub struct ChannelReader {
    src: Bytes,
    pos: usize,
    declared: u32,
    remaining: u32,
    done: bool,
}

impl ChannelReader {
    /// Parse the channel header. Fails if the blob is shorter than a header.
    pub fn new(blob: impl Into<Bytes>) -> Result<Self> {
        let src = blob.into();
        let mut un = Unpacker::new(&src);
        let declared = un.read_u32()?;
        un.skip(4)?;
        debug_assert_eq!(un.position(), CHANNEL_HEADER_SIZE);
        Ok(Self {
            src,
            pos: CHANNEL_HEADER_SIZE,
            declared,
            remaining: declared,
            done: false,
        })
    }

    /// Record count from the channel header.
    pub fn declared_count(&self) -> u32 {
        self.declared
    }

    /// Offset of the next record in the blob.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Decode all remaining records, stopping at the first error.
    pub fn collect_records(self) -> Result<Vec<Record>> {
        self.collect()
    }
}

impl Iterator for ChannelReader {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.remaining == 0 {
            return None;
        }
        match decode_record(&self.src, self.pos) {
            Ok((record, next)) => {
                self.pos = next;
                self.remaining -= 1;
                Some(Ok(record))
            }
            Err(err) => {
                tracing::warn!(
                    offset = self.pos,
                    remaining = self.remaining,
                    error = %err,
                    "abandoning channel stream"
                );
                self.done = true;
                Some(Err(err))
            }
        }
    }
}
