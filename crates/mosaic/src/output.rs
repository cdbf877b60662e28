use std::fmt::Write as _;
use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use mosaic::frame::{DecodedMessage, Encoding};
use mosaic::link::HandlerResult;
use mosaic::Publisher;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct MessageOutput<'a> {
    destination: &'a str,
    frame_id: &'a str,
    identifier: &'a str,
    encoding: &'static str,
    valid: bool,
    size: usize,
    payload: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fields: Vec<&'a str>,
    timestamp: String,
}

/// Writes every published message to stdout.
pub struct StdoutPublisher {
    format: OutputFormat,
    frame_id: String,
}

impl StdoutPublisher {
    pub fn new(format: OutputFormat, frame_id: impl Into<String>) -> Self {
        Self {
            format,
            frame_id: frame_id.into(),
        }
    }
}

impl Publisher for StdoutPublisher {
    fn publish(&self, message: &DecodedMessage, destination: &str) -> HandlerResult {
        print_message(message, destination, &self.frame_id, self.format);
        Ok(())
    }
}

pub fn print_message(
    message: &DecodedMessage,
    destination: &str,
    frame_id: &str,
    format: OutputFormat,
) {
    match format {
        OutputFormat::Json => {
            let out = MessageOutput {
                destination,
                frame_id,
                identifier: &message.identifier,
                encoding: message.encoding.as_str(),
                valid: message.valid,
                size: message.payload.len(),
                payload: payload_preview(message),
                fields: message.fields(),
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["DESTINATION", "FRAME", "ID", "VALID", "SIZE", "PAYLOAD"])
                .add_row(vec![
                    destination.to_string(),
                    frame_id.to_string(),
                    message.identifier.clone(),
                    message.valid.to_string(),
                    message.payload.len().to_string(),
                    payload_preview(message),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "{} frame={} id={} ({}) valid={} size={} payload={}",
                destination,
                frame_id,
                message.identifier,
                message.encoding.as_str(),
                message.valid,
                message.payload.len(),
                payload_preview(message)
            );
        }
        OutputFormat::Raw => {
            print_raw(message.payload.as_ref());
            if message.encoding == Encoding::Ascii {
                print_raw(b"\r\n");
            }
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

/// Sentence text without its terminator, or the block as lowercase hex.
fn payload_preview(message: &DecodedMessage) -> String {
    match (message.encoding, message.as_str()) {
        (Encoding::Ascii, Some(text)) => text.trim_end_matches(['\r', '\n']).to_string(),
        _ => {
            let mut hex = String::with_capacity(message.payload.len() * 2);
            for byte in message.payload.iter() {
                let _ = write!(hex, "{byte:02x}");
            }
            hex
        }
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(encoding: Encoding, payload: &'static [u8]) -> DecodedMessage {
        DecodedMessage {
            identifier: "X".to_string(),
            payload: payload.into(),
            encoding,
            valid: true,
        }
    }

    #[test]
    fn ascii_preview_drops_terminator() {
        let m = message(Encoding::Ascii, b"$GPGGA,1*4B\r\n");
        assert_eq!(payload_preview(&m), "$GPGGA,1*4B");
    }

    #[test]
    fn binary_preview_is_hex() {
        let m = message(Encoding::Binary, &[0x24, 0x40, 0x00, 0xff]);
        assert_eq!(payload_preview(&m), "244000ff");
    }
}
