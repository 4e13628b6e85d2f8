use serde::Serialize;
use tickbridge_wire::catalog::{self, CatalogEntry};
use tickbridge_wire::has_legacy_padding;

use crate::cmd::CatalogArgs;
use crate::exit::{CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_json, print_table, OutputFormat};

#[derive(Serialize)]
struct KindRow {
    id: u32,
    name: &'static str,
    category: &'static str,
    fixed_size: usize,
    layout: &'static str,
    legacy_padding: bool,
}

impl From<&CatalogEntry> for KindRow {
    fn from(entry: &CatalogEntry) -> Self {
        Self {
            id: entry.kind.id(),
            name: entry.name,
            category: entry.kind.category().as_str(),
            fixed_size: entry.fixed_size,
            layout: entry.layout.label(),
            legacy_padding: has_legacy_padding(entry.kind.id()),
        }
    }
}

pub fn run(args: CatalogArgs, format: OutputFormat) -> CliResult<i32> {
    let filter = args.category.map(|c| c.to_ascii_lowercase());
    let rows: Vec<KindRow> = catalog::entries()
        .iter()
        .map(KindRow::from)
        .filter(|row| filter.as_deref().is_none_or(|c| row.category == c))
        .collect();

    if rows.is_empty() {
        if let Some(category) = filter {
            return Err(CliError::new(USAGE, format!("unknown category: {category}")));
        }
    }

    print_rows(&rows, format);
    Ok(SUCCESS)
}

fn print_rows(rows: &[KindRow], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&rows),
        OutputFormat::Table => print_table(
            &["ID", "NAME", "CATEGORY", "SIZE", "LAYOUT"],
            rows.iter().map(|r| {
                let layout = if r.legacy_padding {
                    format!("{} (+4 pad)", r.layout)
                } else {
                    r.layout.to_string()
                };
                vec![
                    r.id.to_string(),
                    r.name.to_string(),
                    r.category.to_string(),
                    r.fixed_size.to_string(),
                    layout,
                ]
            }),
        ),
        OutputFormat::Pretty => {
            for r in rows {
                println!(
                    "{:>5}  {:<28} {:<9} size={:<4} layout={}",
                    r.id, r.name, r.category, r.fixed_size, r.layout
                );
            }
        }
        OutputFormat::Raw => {
            for r in rows {
                println!("{}\t{}\t{}", r.id, r.name, r.fixed_size);
            }
        }
    }
}
