use serde::Serialize;
use tickbridge_wire::{channel_name, split, ChannelReader, Record, RecordBody};

use crate::cmd::InspectArgs;
use crate::exit::{io_error, wire_error, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{hex_preview, print_json, print_table, OutputFormat};

const PREVIEW_BYTES: usize = 16;

#[derive(Serialize)]
struct InspectOutput {
    total_bytes: usize,
    channels: Vec<ChannelReport>,
}

#[derive(Serialize)]
struct ChannelReport {
    id: u32,
    name: &'static str,
    bytes: usize,
    declared_records: u32,
    records: Vec<RecordReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
struct RecordReport {
    offset: usize,
    kind: u32,
    name: Option<&'static str>,
    body: &'static str,
    payload_bytes: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    parts: Vec<String>,
    preview: String,
}

impl RecordReport {
    fn new(offset: usize, record: &Record) -> Self {
        let (body, preview, parts) = match &record.body {
            RecordBody::Empty => ("empty", String::new(), Vec::new()),
            RecordBody::Unknown => ("unknown", String::new(), Vec::new()),
            RecordBody::Fixed(payload) => ("fixed", hex_preview(payload, PREVIEW_BYTES), Vec::new()),
            RecordBody::Variable { header, parts } => (
                "variable",
                hex_preview(header, PREVIEW_BYTES),
                parts.iter().map(|p| String::from_utf8_lossy(p).into_owned()).collect(),
            ),
        };
        Self {
            offset,
            kind: record.kind,
            name: record.event_kind().map(|k| k.name()),
            body,
            payload_bytes: record.payload_len(),
            parts,
            preview,
        }
    }
}

pub fn run(args: InspectArgs, format: OutputFormat) -> CliResult<i32> {
    let data = std::fs::read(&args.file)
        .map_err(|err| io_error(&format!("read {}", args.file.display()), err))?;

    let channels = if args.channel_blob {
        vec![decode_channel(0, &data)?]
    } else {
        split(&data)
            .map_err(|err| wire_error("split frame", err))?
            .into_iter()
            .filter(|view| args.channels.as_ref().is_none_or(|ids| ids.contains(&view.id)))
            .map(|view| decode_channel(view.id, view.data))
            .collect::<CliResult<Vec<_>>>()?
    };

    let out = InspectOutput {
        total_bytes: data.len(),
        channels,
    };
    print_output(&out, format);

    if out.channels.iter().any(|c| c.error.is_some()) {
        return Ok(DATA_INVALID);
    }
    Ok(SUCCESS)
}

/// Decode every record of one blob. A truncated stream keeps the records
/// before the failure and reports the error alongside them.
fn decode_channel(id: u32, blob: &[u8]) -> CliResult<ChannelReport> {
    let mut reader = ChannelReader::new(blob.to_vec())
        .map_err(|err| wire_error(&format!("channel {id} header"), err))?;
    let declared_records = reader.declared_count();

    let mut records = Vec::new();
    let mut error = None;
    loop {
        let offset = reader.position();
        match reader.next() {
            Some(Ok(record)) => records.push(RecordReport::new(offset, &record)),
            Some(Err(err)) => {
                error = Some(err.to_string());
                break;
            }
            None => break,
        }
    }

    Ok(ChannelReport {
        id,
        name: channel_name(id),
        bytes: blob.len(),
        declared_records,
        records,
        error,
    })
}

fn print_output(out: &InspectOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => {
            println!("{} bytes, {} channel(s)", out.total_bytes, out.channels.len());
            for channel in &out.channels {
                println!(
                    "channel {} ({}): {} bytes, {} record(s)",
                    channel.id, channel.name, channel.bytes, channel.declared_records
                );
                print_table(
                    &["OFFSET", "KIND", "NAME", "BODY", "BYTES", "PREVIEW"],
                    channel.records.iter().map(|r| {
                        vec![
                            r.offset.to_string(),
                            r.kind.to_string(),
                            r.name.unwrap_or("?").to_string(),
                            r.body.to_string(),
                            r.payload_bytes.to_string(),
                            r.preview.clone(),
                        ]
                    }),
                );
                if let Some(err) = &channel.error {
                    println!("  stream error: {err}");
                }
            }
        }
        OutputFormat::Pretty => {
            for channel in &out.channels {
                println!(
                    "channel={} ({}) bytes={} records={}",
                    channel.id, channel.name, channel.bytes, channel.declared_records
                );
                for r in &channel.records {
                    println!(
                        "  @{:<6} {:<28} {} bytes{}",
                        r.offset,
                        r.name.unwrap_or("UNKNOWN"),
                        r.payload_bytes,
                        if r.parts.is_empty() {
                            String::new()
                        } else {
                            format!(" {:?}", r.parts)
                        }
                    );
                }
                if let Some(err) = &channel.error {
                    println!("  error: {err}");
                }
            }
        }
        OutputFormat::Raw => {
            for channel in &out.channels {
                for r in &channel.records {
                    println!("{}\t{}\t{}\t{}", channel.id, r.offset, r.kind, r.payload_bytes);
                }
            }
        }
    }
}
