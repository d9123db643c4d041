//! DIAG event decoding. Events have their own identifier namespace and a
//! much simpler shape than log packets: a canonical name plus a payload
//! rendered either as hex or as a short semantic string.

use std::borrow::Cow;
use std::collections::HashMap;

use log::error;

use crate::catalog::fields::printable_ascii;
use crate::catalog::report::{QCAT_TIME_FORMAT, qcat_timestamp};
use crate::catalog::{DecodeContext, DecodeMode, RegistryError, Specificity, resolve};
use crate::diag::EventPacket;
use crate::gsmtap::osmocore_log_frame;
use crate::record::{DecodedRecord, FieldValue, Fields, RecordKind, hex_string};

pub mod common;
pub mod lte;

/// QCAT lists every event under this pseudo log code.
pub const EVENT_LOG_CODE: u16 = 0x1FFB;

/// What an event decoder extracts from a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSummary {
    /// Shown after `Payload =` and as the `payload` field.
    pub payload: String,
    /// Best-effort ASCII or semantic rendering, possibly empty.
    pub payload_str: String,
    /// Text following `NAME: ` in the osmocore log frame.
    pub content: String,
}

impl EventSummary {
    /// Hex rendering for events without a dedicated decoder.
    pub fn hex(payload: &[u8]) -> Self {
        EventSummary {
            payload: hex_string(payload, " "),
            payload_str: printable_ascii(payload),
            content: hex_string(payload, " ").to_lowercase(),
        }
    }

    /// Uppercase hex payload with a semantic string used for both the
    /// payload string and the frame content.
    pub fn semantic(payload: &[u8], text: String) -> Self {
        EventSummary {
            payload: hex_string(payload, " "),
            payload_str: text.clone(),
            content: text,
        }
    }
}

pub type EventDecodeFn = fn(&[u8]) -> EventSummary;

#[derive(Debug, Clone, Copy)]
pub struct EventEntry {
    pub event_id: u16,
    pub name: &'static str,
    pub decoder: EventDecodeFn,
}

pub const fn event(event_id: u16, name: &'static str, decoder: EventDecodeFn) -> EventEntry {
    EventEntry {
        event_id,
        name,
        decoder,
    }
}

#[derive(Debug)]
pub struct EventCategory {
    pub name: &'static str,
    pub specificity: Specificity,
    pub entries: &'static [EventEntry],
}

pub const CATEGORIES: [&EventCategory; 2] = [&common::CATEGORY, &lte::CATEGORY];

#[derive(Debug, Clone, Copy)]
pub struct RegisteredEvent {
    pub entry: EventEntry,
    pub source_category: &'static str,
    pub specificity: Specificity,
}

#[derive(Debug)]
pub struct EventRegistry {
    entries: HashMap<u16, RegisteredEvent>,
}

impl EventRegistry {
    pub fn build(categories: &[&EventCategory]) -> Result<Self, RegistryError> {
        let mut entries: HashMap<u16, RegisteredEvent> = HashMap::new();
        for category in categories {
            for entry in category.entries {
                let claim = RegisteredEvent {
                    entry: *entry,
                    source_category: category.name,
                    specificity: category.specificity,
                };
                let winner = match entries.get(&entry.event_id) {
                    Some(existing) => {
                        resolve(
                            entry.event_id,
                            (*existing, existing.source_category, existing.specificity),
                            (claim, claim.source_category, claim.specificity),
                        )?
                        .0
                    }
                    None => claim,
                };
                entries.insert(entry.event_id, winner);
            }
        }
        Ok(EventRegistry { entries })
    }

    pub fn get(&self, event_id: u16) -> Option<&RegisteredEvent> {
        self.entries.get(&event_id)
    }

    pub fn name(&self, event_id: u16) -> Cow<'static, str> {
        match self.get(event_id) {
            Some(registered) => Cow::Borrowed(registered.entry.name),
            None => Cow::Owned(format!("UNKNOWN_EVENT_{event_id}")),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Never fails: unknown identifiers get a synthesized name and the hex
    /// rendering.
    pub fn decode(&self, packet: &EventPacket, ctx: &DecodeContext) -> DecodedRecord {
        let name = self.name(packet.event_id);
        let summary = match self.get(packet.event_id) {
            Some(registered) => (registered.entry.decoder)(&packet.payload),
            None => EventSummary::hex(&packet.payload),
        };
        render(packet, ctx, &name, summary)
    }
}

fn render(
    packet: &EventPacket,
    ctx: &DecodeContext,
    name: &str,
    summary: EventSummary,
) -> DecodedRecord {
    let timestamp = packet.timestamp.to_datetime();
    match ctx.mode {
        DecodeMode::Text => {
            let lines = vec![
                format!(
                    "{}  [00]  0x{EVENT_LOG_CODE:04X}  Event  --  {name}",
                    qcat_timestamp(&timestamp)
                ),
                format!(
                    "\t{} Event  0 : {name} (ID={})  Payload = {}",
                    timestamp.format(QCAT_TIME_FORMAT),
                    packet.event_id,
                    summary.payload
                ),
                format!("\t\tPayload String = {}", summary.payload_str),
            ];
            DecodedRecord::TextBlock { lines, timestamp }
        }
        DecodeMode::Structured => {
            let mut fields = Fields::new();
            fields.insert("type".to_string(), FieldValue::from(name));
            fields.insert("id".to_string(), packet.event_id.into());
            fields.insert("thread".to_string(), "00".into());
            fields.insert("payload".to_string(), summary.payload.into());
            fields.insert("payload_str".to_string(), summary.payload_str.into());
            DecodedRecord::StructuredFields {
                kind: RecordKind::Event,
                fields,
                timestamp,
                radio_id: ctx.radio_id,
            }
        }
        DecodeMode::Network => {
            let content = format!("{name}: {}", summary.content);
            match osmocore_log_frame(timestamp, "Event", packet.event_id as u32, content.as_bytes()) {
                Ok(framed_bytes) => DecodedRecord::Encapsulated {
                    framed_bytes,
                    timestamp,
                },
                Err(err) => {
                    error!("failed to frame event {}: {err}", packet.event_id);
                    DecodedRecord::Insufficient
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::diag::Timestamp;

    fn packet(event_id: u16, payload: &[u8]) -> EventPacket {
        EventPacket {
            event_id,
            timestamp: Timestamp { ts: 0 },
            payload: payload.to_vec(),
        }
    }

    fn registry() -> EventRegistry {
        EventRegistry::build(&CATEGORIES).unwrap()
    }

    #[test]
    fn test_topic_events_win() {
        let registry = registry();
        assert_eq!(registry.get(1606).unwrap().source_category, "lte");
        assert_eq!(registry.get(2865).unwrap().source_category, "common");
        assert_eq!(registry.name(1606), "LTE_RRC_STATE_CHANGE");
    }

    #[test]
    fn test_equal_specificity_conflicts() {
        let err = EventRegistry::build(&[&common::CATEGORY, &common::CATEGORY]).unwrap_err();
        assert!(matches!(err, RegistryError::Conflict { .. }));
    }

    #[test]
    fn test_unknown_event_text() {
        let record = registry().decode(&packet(4000, b"ok"), &DecodeContext::new(DecodeMode::Text));
        assert_eq!(
            record.lines(),
            &[
                "1980 Jan  6  00:00:00.000  [00]  0x1FFB  Event  --  UNKNOWN_EVENT_4000",
                "\t00:00:00.000 Event  0 : UNKNOWN_EVENT_4000 (ID=4000)  Payload = 6F 6B",
                "\t\tPayload String = ok",
            ]
        );
    }

    #[test]
    fn test_empty_payload_keeps_payload_string_line() {
        let record = registry().decode(&packet(4000, &[]), &DecodeContext::new(DecodeMode::Text));
        assert_eq!(
            record.lines(),
            &[
                "1980 Jan  6  00:00:00.000  [00]  0x1FFB  Event  --  UNKNOWN_EVENT_4000",
                "\t00:00:00.000 Event  0 : UNKNOWN_EVENT_4000 (ID=4000)  Payload = ",
                "\t\tPayload String = ",
            ]
        );
    }

    #[test]
    fn test_structured_event() {
        let mut ctx = DecodeContext::new(DecodeMode::Structured);
        ctx.radio_id = 1;
        let record = registry().decode(&packet(1606, &[4]), &ctx);
        match &record {
            DecodedRecord::StructuredFields {
                kind, radio_id, ..
            } => {
                assert_eq!(*kind, RecordKind::Event);
                assert_eq!(*radio_id, 1);
            }
            other => panic!("unexpected record {other:?}"),
        }
        assert_eq!(
            record.field("type"),
            Some(&FieldValue::Str("LTE_RRC_STATE_CHANGE".to_string()))
        );
        assert_eq!(record.field("id"), Some(&FieldValue::UInt(1606)));
        assert_eq!(record.field("thread"), Some(&FieldValue::Str("00".to_string())));
        assert_eq!(record.field("payload"), Some(&FieldValue::Str("04".to_string())));
        assert_eq!(
            record.field("payload_str"),
            Some(&FieldValue::Str("rrc_state=RRC_CONNECTED".to_string()))
        );
    }

    #[test]
    fn test_network_event_frame() {
        let record = registry().decode(&packet(1606, &[2]), &DecodeContext::new(DecodeMode::Network));
        match record {
            DecodedRecord::Encapsulated { framed_bytes, .. } => {
                assert_eq!(&framed_bytes[24..29], b"Event");
                assert_eq!(&framed_bytes[40..44], &1606u32.to_be_bytes());
                assert_eq!(&framed_bytes[84..], b"LTE_RRC_STATE_CHANGE: rrc_state=RRC_IDLE_CAMPED");
            }
            other => panic!("unexpected record {other:?}"),
        }
    }

    #[test]
    fn test_hex_summary() {
        let summary = EventSummary::hex(&[0x04, 0x80, 0x02]);
        assert_eq!(summary.payload, "04 80 02");
        assert_eq!(summary.payload_str, "");
        assert_eq!(summary.content, "04 80 02");
    }
}
