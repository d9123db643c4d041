//! Diag protocol deserialization: HDLC framed containers, log messages and
//! packed event reports.

use bytes::Buf;
use chrono::{DateTime, FixedOffset, TimeDelta, Utc};
use crc::{Algorithm, Crc};
use deku::prelude::*;
use log::{debug, warn};
use thiserror::Error;

use crate::hdlc::{self, hdlc_decapsulate};

pub const MESSAGE_TERMINATOR: u8 = 0x7e;
pub const MESSAGE_ESCAPE_CHAR: u8 = 0x7d;

pub const ESCAPED_MESSAGE_TERMINATOR: u8 = 0x5e;
pub const ESCAPED_MESSAGE_ESCAPE_CHAR: u8 = 0x5d;

/// Size of log_type + timestamp, which inner_length counts but the body doesn't.
pub const LOG_HEADER_LEN: u16 = 12;

#[derive(Debug, Clone, PartialEq, DekuRead, DekuWrite)]
#[deku(id_type = "u32", endian = "little")]
pub enum DataType {
    #[deku(id = "32")]
    UserSpace,
    #[deku(id_pat = "_")]
    Other(u32),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DiagParsingError {
    #[error("Failed to parse Message: {0}, data: {1:?}")]
    MessageParsingError(deku::DekuError, Vec<u8>),
    #[error("HDLC decapsulation of message failed: {0}, data: {1:?}")]
    HdlcDecapsulationError(hdlc::HdlcError, Vec<u8>),
}

// CRC-16/X.25, the same parameters QCSuper and scat use for diag frames
pub const CRC_CCITT_ALG: Algorithm<u16> = Algorithm {
    poly: 0x1021,
    init: 0xffff,
    refin: true,
    refout: true,
    width: 16,
    xorout: 0xffff,
    check: 0x2189,
    residue: 0x0000,
};

pub const CRC_CCITT: Crc<u16> = Crc::<u16>::new(&CRC_CCITT_ALG);

#[derive(Debug, Clone, PartialEq, DekuRead, DekuWrite)]
pub struct MessagesContainer {
    pub data_type: DataType,
    pub num_messages: u32,
    #[deku(count = "num_messages")]
    pub messages: Vec<HdlcEncapsulatedMessage>,
}

impl MessagesContainer {
    /// Splits every HDLC frame out of the container and parses it. Passing
    /// `validate_crc = false` accepts frames whose checksum doesn't match.
    pub fn into_messages(self, validate_crc: bool) -> Vec<Result<Message, DiagParsingError>> {
        let crc = validate_crc.then_some(&CRC_CCITT);
        let mut result = Vec::new();
        for msg in self.messages {
            for sub_msg in msg.data.split_inclusive(|&b| b == MESSAGE_TERMINATOR) {
                match hdlc_decapsulate(sub_msg, crc) {
                    Ok(data) => match Message::from_bytes((&data, 0)) {
                        Ok(((leftover_bytes, _), res)) => {
                            if !leftover_bytes.is_empty() && matches!(res, Message::Log { .. }) {
                                warn!(
                                    "warning: {} leftover bytes when parsing Message",
                                    leftover_bytes.len()
                                );
                            }
                            result.push(Ok(res));
                        }
                        Err(e) => result.push(Err(DiagParsingError::MessageParsingError(e, data))),
                    },
                    Err(err) => result.push(Err(DiagParsingError::HdlcDecapsulationError(
                        err,
                        sub_msg.to_vec(),
                    ))),
                }
            }
        }
        result
    }
}

#[derive(Debug, Clone, PartialEq, DekuRead, DekuWrite)]
pub struct HdlcEncapsulatedMessage {
    pub len: u32,
    #[deku(count = "len")]
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, DekuRead, DekuWrite)]
#[deku(id_type = "u8", endian = "little")]
pub enum Message {
    #[deku(id = "0x10")]
    Log {
        pending_msgs: u8,
        outer_length: u16,
        inner_length: u16,
        log_type: u16,
        timestamp: Timestamp,
        #[deku(count = "inner_length.saturating_sub(LOG_HEADER_LEN)")]
        body: Vec<u8>,
    },

    #[deku(id = "0x60")]
    EventReport {
        length: u16,
        #[deku(count = "length")]
        data: Vec<u8>,
    },

    // deku 0.20 stores the discriminant of an id_pat variant in its first field
    #[deku(id_pat = "_")]
    Other { command: u8 },
}

/// One log packet as handed to the decoding catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct LogPacket {
    pub message_type: u16,
    pub timestamp: Timestamp,
    pub body: Vec<u8>,
}

impl LogPacket {
    pub fn new(message_type: u16, timestamp: Timestamp, body: Vec<u8>) -> Self {
        LogPacket {
            message_type,
            timestamp,
            body,
        }
    }
}

/// One event unpacked from an event report.
#[derive(Debug, Clone, PartialEq)]
pub struct EventPacket {
    pub event_id: u16,
    pub timestamp: Timestamp,
    pub payload: Vec<u8>,
}

/// Anything the decoding catalog knows how to consume.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Log(LogPacket),
    Event(EventPacket),
}

impl MessagesContainer {
    /// Like `into_messages`, but keeps only log packets and unpacked events.
    /// Other diag commands are silently dropped.
    pub fn into_packets(self, validate_crc: bool) -> Vec<Result<Packet, DiagParsingError>> {
        let mut packets = Vec::new();
        for maybe_msg in self.into_messages(validate_crc) {
            match maybe_msg {
                Ok(msg @ Message::Log { .. }) => {
                    packets.extend(msg.into_log_packet().map(|p| Ok(Packet::Log(p))))
                }
                Ok(msg @ Message::EventReport { .. }) => {
                    packets.extend(msg.into_events().into_iter().map(|e| Ok(Packet::Event(e))))
                }
                Ok(Message::Other { command }) => debug!("skipping diag command 0x{command:02x}"),
                Err(err) => packets.push(Err(err)),
            }
        }
        packets
    }
}

impl Message {
    pub fn into_log_packet(self) -> Option<LogPacket> {
        match self {
            Message::Log {
                log_type,
                timestamp,
                body,
                ..
            } => Some(LogPacket::new(log_type, timestamp, body)),
            _ => None,
        }
    }

    pub fn into_events(self) -> Vec<EventPacket> {
        match self {
            Message::EventReport { data, .. } => parse_event_report(&data),
            _ => Vec::new(),
        }
    }
}

const EVENT_ID_MASK: u16 = 0x0fff;
const EVENT_PAYLOAD_LEN_SHIFT: u16 = 13;
const EVENT_TRUNCATED_TS_FLAG: u16 = 0x8000;

/// Unpacks the event stream carried by an event report. Each event is a
/// u16 id word (12 bits id, 2 bits payload length code, 1 bit truncated
/// timestamp) then a timestamp then the payload. Stops at the first event
/// that doesn't fit in the remaining bytes.
pub fn parse_event_report(mut data: &[u8]) -> Vec<EventPacket> {
    let mut events = Vec::new();
    let mut last_ts = 0u64;
    while data.remaining() >= 2 {
        let word = data.get_u16_le();
        let event_id = word & EVENT_ID_MASK;
        let len_code = (word >> EVENT_PAYLOAD_LEN_SHIFT) & 0x3;

        if word & EVENT_TRUNCATED_TS_FLAG != 0 {
            if data.remaining() < 2 {
                break;
            }
            // truncated timestamps only carry the low bits, keep the last full one
            data.advance(2);
        } else {
            if data.remaining() < 8 {
                break;
            }
            last_ts = data.get_u64_le();
        }

        let payload_len = match len_code {
            0 => 0,
            1 => 1,
            2 => 2,
            _ => {
                if data.remaining() < 1 {
                    break;
                }
                data.get_u8() as usize
            }
        };
        if data.remaining() < payload_len {
            debug!("event {event_id} claims {payload_len} payload bytes, stopping");
            break;
        }
        let payload = data[..payload_len].to_vec();
        data.advance(payload_len);
        events.push(EventPacket {
            event_id,
            timestamp: Timestamp { ts: last_ts },
            payload,
        });
    }
    events
}

// 1980-01-06T00:00:00Z
const GPS_EPOCH_UNIX_SECONDS: i64 = 315_964_800;

#[derive(Debug, Clone, Copy, PartialEq, Eq, DekuRead, DekuWrite)]
#[deku(
    endian = "little",
    ctx = "_endian: deku::ctx::Endian",
    ctx_default = "deku::ctx::Endian::Little"
)]
pub struct Timestamp {
    pub ts: u64,
}

impl Timestamp {
    pub fn to_datetime(&self) -> DateTime<FixedOffset> {
        // Upper 48 bits: epoch at 1980-01-06 00:00:00, incremented by 1 for 1/800s
        // Lower 16 bits: time since last 1/800s tick in 1/32 chip units
        let ts_upper = (self.ts >> 16) as i64;
        let ts_lower = (self.ts & 0xffff) as i64;
        let micros = ts_upper
            .saturating_mul(1250)
            .saturating_add(ts_lower * 1000 / 40960);
        let epoch = DateTime::<Utc>::from_timestamp(GPS_EPOCH_UNIX_SECONDS, 0).unwrap_or_default();
        epoch
            .checked_add_signed(TimeDelta::microseconds(micros))
            .unwrap_or(epoch)
            .fixed_offset()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn make_container(data_type: DataType, message: HdlcEncapsulatedMessage) -> MessagesContainer {
        MessagesContainer {
            data_type,
            num_messages: 1,
            messages: vec![message],
        }
    }

    fn get_test_message(payload: &[u8]) -> (HdlcEncapsulatedMessage, Message) {
        let inner_length = LOG_HEADER_LEN + payload.len() as u16;
        let message = Message::Log {
            pending_msgs: 0,
            outer_length: inner_length,
            inner_length,
            log_type: 0x1098,
            timestamp: Timestamp {
                ts: 72659535985485082,
            },
            body: payload.to_vec(),
        };
        let serialized = message
            .to_bytes()
            .expect("failed to serialize test message");
        let encapsulated_data = hdlc::hdlc_encapsulate(&serialized, &CRC_CCITT);
        let encapsulated = HdlcEncapsulatedMessage {
            len: encapsulated_data.len() as u32,
            data: encapsulated_data,
        };
        (encapsulated, message)
    }

    #[test]
    fn test_log_message() {
        let data = vec![
            0x10, 0, 16, 0, 16, 0, 0x98, 0x10, 26, 165, 245, 135, 118, 35, 2, 1, 0, 0xa4, 0x7e,
            0x01,
        ];
        let msg = Message::from_bytes((&data, 0)).unwrap().1;
        assert_eq!(
            msg.into_log_packet(),
            Some(LogPacket::new(
                0x1098,
                Timestamp {
                    ts: 72659535985485082
                },
                vec![0, 0xa4, 0x7e, 0x01]
            ))
        );
    }

    #[test]
    fn test_containers_with_multiple_messages() {
        let (encapsulated1, message1) = get_test_message(&[1]);
        let (encapsulated2, message2) = get_test_message(&[2]);
        let mut container = make_container(DataType::UserSpace, encapsulated1);
        container.messages.push(encapsulated2);
        container.num_messages += 1;
        assert_eq!(
            container.into_messages(true),
            vec![Ok(message1), Ok(message2)]
        );
    }

    #[test]
    fn test_containers_with_concatenated_message() {
        let (mut encapsulated1, message1) = get_test_message(&[1]);
        let (encapsulated2, message2) = get_test_message(&[0x7e, 0x7d]);
        encapsulated1.data.extend(encapsulated2.data);
        encapsulated1.len += encapsulated2.len;
        let container = make_container(DataType::UserSpace, encapsulated1);
        assert_eq!(
            container.into_messages(true),
            vec![Ok(message1), Ok(message2)]
        );
    }

    #[test]
    fn test_handles_encapsulation_errors() {
        let (encapsulated1, message1) = get_test_message(&[1]);
        let bad_encapsulation = HdlcEncapsulatedMessage {
            len: 4,
            data: vec![0x01, 0x02, 0x03, 0x04],
        };
        let mut container = make_container(DataType::UserSpace, encapsulated1);
        container.messages.push(bad_encapsulation);
        container.num_messages += 1;
        let result = container.into_messages(true);
        assert_eq!(result[0], Ok(message1));
        assert!(matches!(
            result[1],
            Err(DiagParsingError::HdlcDecapsulationError(_, _))
        ));
    }

    #[test]
    fn test_crc_validation_can_be_disabled() {
        let (mut encapsulated, _) = get_test_message(&[1, 2, 3]);
        let (_, message) = get_test_message(&[9, 2, 3]);
        // the 16 byte log header has no escaped bytes, so the body starts at 16
        encapsulated.data[16] = 9;
        let container = make_container(DataType::UserSpace, encapsulated.clone());
        assert!(matches!(
            container.into_messages(true)[0],
            Err(DiagParsingError::HdlcDecapsulationError(
                hdlc::HdlcError::InvalidChecksum(_, _),
                _
            ))
        ));
        let container = make_container(DataType::UserSpace, encapsulated);
        assert_eq!(container.into_messages(false), vec![Ok(message)]);
    }

    #[test]
    fn test_fuzz_crash_inner_length_underflow() {
        // inner_length smaller than the log header must not underflow
        let data = [0x10, 0, 4, 0, 4, 0, 0x98, 0x10, 0, 0, 0, 0, 0, 0, 0, 0];
        let msg = Message::from_bytes((&data, 0)).unwrap().1;
        assert_eq!(msg.into_log_packet().unwrap().body, Vec::<u8>::new());
    }

    #[test]
    fn test_into_packets() {
        let (encapsulated1, _) = get_test_message(&[1, 2]);
        let other = hdlc::hdlc_encapsulate(&[0x4b, 0x01], &CRC_CCITT);
        let mut container = make_container(DataType::UserSpace, encapsulated1);
        container.messages.push(HdlcEncapsulatedMessage {
            len: other.len() as u32,
            data: other,
        });
        container.num_messages += 1;
        let packets = container.into_packets(true);
        assert_eq!(packets.len(), 1);
        assert!(matches!(&packets[0], Ok(Packet::Log(p)) if p.body == vec![1, 2]));
    }

    #[test]
    fn test_other_commands() {
        let data = [0x4b, 0x12, 0x00];
        let msg = Message::from_bytes((&data, 0)).unwrap().1;
        assert_eq!(msg, Message::Other { command: 0x4b });
        assert_eq!(msg.into_log_packet(), None);
    }

    #[test]
    fn test_event_report() {
        let mut data = Vec::new();
        // event 1606, one byte payload, full timestamp
        data.extend((1606u16 | (1 << 13)).to_le_bytes());
        data.extend(0x1122_3344_5566_7788u64.to_le_bytes());
        data.push(4);
        // event 2866, length-prefixed payload, truncated timestamp
        data.extend((2866u16 | (3 << 13) | 0x8000).to_le_bytes());
        data.extend([0xaa, 0xbb]);
        data.extend([3, 7, b'r', b'x']);
        let mut msg = vec![0x60];
        msg.extend((data.len() as u16).to_le_bytes());
        msg.extend(&data);

        let events = Message::from_bytes((&msg, 0)).unwrap().1.into_events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_id, 1606);
        assert_eq!(events[0].payload, vec![4]);
        assert_eq!(events[1].event_id, 2866);
        assert_eq!(events[1].timestamp, events[0].timestamp);
        assert_eq!(events[1].payload, vec![7, b'r', b'x']);
    }

    #[test]
    fn test_event_report_truncated_payload() {
        let mut data = Vec::new();
        data.extend((1684u16 | (3 << 13)).to_le_bytes());
        data.extend(0u64.to_le_bytes());
        data.extend([10, 1, 2]);
        assert!(parse_event_report(&data).is_empty());
    }

    #[test]
    fn test_timestamp() {
        let ts = Timestamp { ts: 0 };
        assert_eq!(ts.to_datetime().to_rfc3339(), "1980-01-06T00:00:00+00:00");

        // 800 ticks of 1.25 ms is one second
        let ts = Timestamp { ts: 800 << 16 };
        assert_eq!(ts.to_datetime().to_rfc3339(), "1980-01-06T00:00:01+00:00");

        // must not panic on absurd values
        let _ = Timestamp { ts: u64::MAX }.to_datetime();
    }
}
