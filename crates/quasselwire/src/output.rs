use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use quasselwire_session::{Event, NotificationSink};
use quasselwire_types::SemanticValue;
use serde::Serialize;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

/// Prints every session notification as it arrives.
#[derive(Debug)]
pub struct EventPrinter {
    format: OutputFormat,
}

impl EventPrinter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }
}

impl NotificationSink for EventPrinter {
    fn notify(&mut self, event: Event) {
        print_event(&event, self.format);
    }
}

pub fn print_event(event: &Event, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!("{}", to_json(event)),
        OutputFormat::Pretty => println!("{}: {}", event.name(), data_json(event)),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["EVENT", "DATA"])
                .add_row(vec![event.name().to_string(), data_json(event)]);
            println!("{table}");
        }
    }
}

#[derive(Serialize)]
struct DecodedFrame<'a> {
    frame: usize,
    size: usize,
    kind: &'static str,
    value: &'a SemanticValue,
}

/// Print one decoded frame of a capture.
pub fn print_value(index: usize, size: usize, value: &SemanticValue, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = DecodedFrame {
                frame: index,
                size,
                kind: value.kind(),
                value,
            };
            println!("{}", to_json(&out));
        }
        OutputFormat::Pretty => {
            let tree = serde_json::to_string_pretty(value).unwrap_or_else(|_| "null".to_string());
            println!("frame {index} ({size} bytes, {}):\n{tree}", value.kind());
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FRAME", "ENTRY", "TYPE", "VALUE"]);
            for (entry, item) in entries(value) {
                table.add_row(vec![
                    index.to_string(),
                    entry,
                    item.kind().to_string(),
                    to_json(item),
                ]);
            }
            println!("{table}");
        }
    }
}

/// Top-level rows of a value: map entries by key, list items by position,
/// anything else as a single row.
fn entries(value: &SemanticValue) -> Vec<(String, &SemanticValue)> {
    if let Some(map) = value.as_map() {
        return map.iter().map(|(k, v)| (k.clone(), v)).collect();
    }
    if let Some(items) = value.as_list() {
        return items
            .iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v))
            .collect();
    }
    vec![(String::new(), value)]
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
}

fn data_json(event: &Event) -> String {
    match serde_json::to_value(event) {
        Ok(serde_json::Value::Object(mut fields)) => fields
            .remove("data")
            .map(|data| data.to_string())
            .unwrap_or_else(|| "null".to_string()),
        _ => "null".to_string(),
    }
}
