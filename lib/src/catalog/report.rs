//! Builds one decoded record while a decoder walks its packet.
//!
//! Decoders push labelled values in QCAT order. Depending on the
//! [DecodeMode] the same calls end up as QCAT text lines, as typed fields, or
//! as a GSMTAP osmocore log frame wrapping the text.

use std::fmt::Display;

use chrono::{DateTime, FixedOffset};
use log::error;

use crate::catalog::{DecodeContext, DecodeMode};
use crate::diag::LogPacket;
use crate::gsmtap::osmocore_log_frame;
use crate::record::{DecodedRecord, FieldValue, Fields, RecordKind};

/// `2024 Mar  5  13:04:22.118`, milliseconds truncated.
pub const QCAT_TIMESTAMP_FORMAT: &str = "%Y %b %e  %H:%M:%S%.3f";
pub const QCAT_TIME_FORMAT: &str = "%H:%M:%S%.3f";

pub fn qcat_timestamp(ts: &DateTime<FixedOffset>) -> String {
    ts.format(QCAT_TIMESTAMP_FORMAT).to_string()
}

/// `"Power Level"` -> `power_level`, `"Band[2]"` -> `band_2`.
pub fn field_key(label: &str) -> String {
    let mut key = String::with_capacity(label.len());
    for c in label.trim().chars() {
        if c.is_ascii_alphanumeric() {
            key.push(c.to_ascii_lowercase());
        } else if !key.is_empty() && !key.ends_with('_') {
            key.push('_');
        }
    }
    while key.ends_with('_') {
        key.pop();
    }
    key
}

struct Scope {
    key_prefix: String,
    indent: usize,
    braced: bool,
}

pub struct Report<'a> {
    ctx: &'a DecodeContext,
    message_type: u16,
    timestamp: DateTime<FixedOffset>,
    kind: RecordKind,
    thread: u8,
    title: String,
    lines: Vec<String>,
    fields: Fields,
    indent: String,
    scopes: Vec<Scope>,
}

impl<'a> Report<'a> {
    pub fn new(
        ctx: &'a DecodeContext,
        packet: &LogPacket,
        kind: RecordKind,
        title: impl Into<String>,
    ) -> Self {
        Report {
            ctx,
            message_type: packet.message_type,
            timestamp: packet.timestamp.to_datetime(),
            kind,
            thread: 0,
            title: title.into(),
            lines: Vec::new(),
            fields: Fields::new(),
            indent: String::new(),
            scopes: Vec::new(),
        }
    }

    /// The bracketed thread column of the QCAT header line.
    pub fn with_thread(mut self, thread: u8) -> Self {
        self.thread = thread;
        self
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    fn key(&self, label: &str) -> String {
        match self.scopes.last() {
            Some(scope) if !scope.key_prefix.is_empty() => {
                format!("{}_{}", scope.key_prefix, field_key(label))
            }
            _ => field_key(label),
        }
    }

    /// `label = value`, value displayed as-is.
    pub fn field(&mut self, label: &str, value: impl Into<FieldValue>) {
        let value = value.into();
        self.line(format!("{label} = {value}"));
        self.value(label, value);
    }

    /// `label = display`, with `value` kept as the typed field.
    pub fn field_as(&mut self, label: &str, display: impl Display, value: impl Into<FieldValue>) {
        self.line(format!("{label} = {display}"));
        self.value(label, value);
    }

    /// `label = text`, stored as a string field.
    pub fn text(&mut self, label: &str, text: impl Display) {
        let text = text.to_string();
        self.line(format!("{label} = {text}"));
        self.value(label, text);
    }

    /// Typed field without a text line, for values folded into a composite line.
    pub fn value(&mut self, label: &str, value: impl Into<FieldValue>) {
        if self.ctx.mode == DecodeMode::Structured {
            let key = self.key(label);
            self.fields.insert(key, value.into());
        }
    }

    /// A raw text line at the current indentation.
    pub fn line(&mut self, line: impl AsRef<str>) {
        if self.ctx.mode != DecodeMode::Structured {
            self.lines.push(format!("{}{}", self.indent, line.as_ref()));
        }
    }

    fn push_scope(&mut self, key: &str, indent: &str, braced: bool) {
        let key_prefix = self.key(key);
        self.scopes.push(Scope {
            key_prefix,
            indent: self.indent.len(),
            braced,
        });
        self.indent.push_str(indent);
    }

    /// A title line followed by indented content until `close`.
    pub fn open(&mut self, title: &str, indent: &str) {
        self.line(title);
        self.push_scope(title, indent, false);
    }

    /// `title {` followed by indented content until `close` writes `}`.
    pub fn open_braced(&mut self, title: &str) {
        self.line(format!("{title} {{"));
        self.push_scope(title, "   ", true);
    }

    /// Indents the following lines under `key` without writing a title.
    pub fn nest(&mut self, key: &str, indent: &str) {
        self.push_scope(key, indent, false);
    }

    /// A field-key scope without any text of its own.
    pub fn group(&mut self, key: &str) {
        self.push_scope(key, "", false);
    }

    pub fn close(&mut self) {
        if let Some(scope) = self.scopes.pop() {
            self.indent.truncate(scope.indent);
            if scope.braced {
                self.line("}");
            }
        }
    }

    fn header(&self) -> String {
        format!(
            "{}  [{:02X}]  0x{:04X}  {}",
            qcat_timestamp(&self.timestamp),
            self.thread,
            self.message_type,
            self.title
        )
    }

    pub fn finish(mut self) -> DecodedRecord {
        while !self.scopes.is_empty() {
            self.close();
        }
        match self.ctx.mode {
            DecodeMode::Text => {
                let mut lines = Vec::with_capacity(self.lines.len() + 1);
                lines.push(self.header());
                lines.extend(self.lines);
                DecodedRecord::TextBlock {
                    lines,
                    timestamp: self.timestamp,
                }
            }
            DecodeMode::Structured => {
                let mut fields = self.fields;
                fields.insert("log_id".to_string(), self.message_type.into());
                fields.insert("log_name".to_string(), self.title.trim_end().into());
                DecodedRecord::StructuredFields {
                    kind: self.kind,
                    fields,
                    timestamp: self.timestamp,
                    radio_id: self.ctx.radio_id,
                }
            }
            DecodeMode::Network => {
                let mut content = self.header();
                for line in &self.lines {
                    content.push('\n');
                    content.push_str(line);
                }
                match osmocore_log_frame(
                    self.timestamp,
                    "Log",
                    self.message_type as u32,
                    content.as_bytes(),
                ) {
                    Ok(framed_bytes) => DecodedRecord::Encapsulated {
                        framed_bytes,
                        timestamp: self.timestamp,
                    },
                    Err(err) => {
                        error!("failed to frame log 0x{:04X}: {err}", self.message_type);
                        DecodedRecord::Insufficient
                    }
                }
            }
        }
    }
}
