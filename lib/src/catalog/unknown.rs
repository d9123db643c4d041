//! Fallback for every message type without a dedicated decoder: name,
//! version, length and a short hex dump.

use std::borrow::Cow;

use crate::catalog::fields::FieldReader;
use crate::catalog::report::Report;
use crate::catalog::{Category, DecodeContext, DispatchEntry, Specificity, entry};
use crate::diag::LogPacket;
use crate::record::{DecodedRecord, RecordKind, hex_string};

const HEX_DUMP_LIMIT: usize = 64;
const HEX_DUMP_ROW: usize = 16;

/// Best-known name for a message type, whether or not it has a decoder.
pub fn display_name(message_type: u16) -> Cow<'static, str> {
    match CATEGORY
        .entries
        .iter()
        .find(|entry| entry.message_type == message_type)
    {
        Some(entry) => Cow::Borrowed(entry.display_name),
        None => Cow::Owned(format!("Unknown Log 0x{message_type:04X}")),
    }
}

const fn named(message_type: u16, display_name: &'static str) -> DispatchEntry {
    entry(message_type, display_name, 0, decode_unknown)
}

/// Names for message types seen in QCAT output. All of them decode with the
/// fallback unless a more specific category claims them.
pub const CATEGORY: Category = Category {
    name: "unknown",
    specificity: Specificity::Fallback,
    entries: &[
        named(0x418B, "WCDMA Flexible DL RLC AM PDU"),
        named(0x421E, "WCDMA MAC-ehs Reassembly"),
        named(0x1849, "RF Device Status"),
        named(0x18F7, "RF Calibration Data"),
        named(0x19ED, "Atuner Detune Info"),
        named(0x4179, "RF LTE TX Report"),
        named(0x41D4, "RF LTE RX Report"),
        named(0x0000, "System Status"),
        named(0x4186, "RF GSM TX Report"),
        named(0x4134, "RF WCDMA TX Report"),
        named(0x4222, "WCDMA Advanced Report"),
        named(0x1544, "QMI_MCS_QCSI_PKT"),
        named(0x4178, "RF Power Report"),
        named(0x4146, "RF Antenna Report"),
        named(0x4169, "RF Band Report"),
        named(0x4168, "RF Channel Report"),
        named(0x4344, "WCDMA Multi Carrier EUL Combined L1 MAC"),
        named(0x4177, "RF Status Report"),
        named(0x4322, "WCDMA Diversity Report"),
        named(0x435D, "WCDMA Calibration Report"),
        named(0x1384, "CGPS PDSM External Status NMEA Report"),
        named(0x1476, "GNSS Position Report"),
        named(0x13D1, "XO Frequency Estimation"),
        named(0x1273, "CM Phone Event"),
        named(0x1998, "PM PH History Info"),
        named(0x1841, "RF ASDIV"),
        named(0x7152, "UMTS NAS_FPLMN List"),
        named(0x7132, "UMTS NAS_REG State"),
        named(0x7131, "UMTS NAS_MM State"),
        named(0x7130, "UMTS NAS_GMM State"),
        named(0x18C4, "RF Advanced Status"),
        named(0x18C3, "RF Configuration Report"),
        named(0x1C72, "System Configuration"),
        named(0x1C70, "System Status Extended"),
        named(0x1C6E, "System Performance"),
        named(0x1375, "Power Management Report"),
        named(0x41D6, "RF Advanced RX Report"),
        named(0x41CD, "RF Calibration Status"),
        named(0x4189, "RF Power Management"),
        named(0x4191, "RF System Report"),
        named(0x4188, "RF Configuration Status"),
    ],
};

/// Accepts any message type and any body length, including empty.
pub fn decode_unknown(packet: &LogPacket, ctx: &DecodeContext) -> DecodedRecord {
    let body = packet.body.as_slice();
    let name = display_name(packet.message_type);
    let mut out = Report::new(ctx, packet, RecordKind::UnknownLog, name);

    if let Some(version) = body.read_u8(0) {
        out.field("Version", version);
    }
    out.field("Packet Length", body.len());

    match packet.message_type {
        0x1998 => pm_history_details(body, &mut out),
        _ => hex_dump(body, &mut out),
    }
    out.finish()
}

fn pm_history_details(body: &[u8], out: &mut Report) {
    if body.len() >= 8 {
        if let Some(history_type) = body.read_u8(1) {
            out.field("History Type", history_type);
        }
    }
}

fn hex_dump(body: &[u8], out: &mut Report) {
    let shown = &body[..body.len().min(HEX_DUMP_LIMIT)];
    for (row, chunk) in shown.chunks(HEX_DUMP_ROW).enumerate() {
        out.line(format!(
            "Data[{:04X}] = {}",
            row * HEX_DUMP_ROW,
            hex_string(chunk, " ")
        ));
    }
    if !shown.is_empty() {
        out.value("Data", shown.to_vec());
    }
    if body.len() > HEX_DUMP_LIMIT {
        let more = body.len() - HEX_DUMP_LIMIT;
        out.line(format!("... ({more} more bytes)"));
        out.value("More Bytes", more);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::catalog::DecodeMode;
    use crate::diag::Timestamp;
    use crate::record::FieldValue;

    fn decode(message_type: u16, body: Vec<u8>, mode: DecodeMode) -> DecodedRecord {
        let packet = LogPacket::new(message_type, Timestamp { ts: 0 }, body);
        decode_unknown(&packet, &DecodeContext::new(mode))
    }

    #[test]
    fn test_empty_body() {
        let record = decode(0x7777, vec![], DecodeMode::Text);
        assert_eq!(
            record.lines(),
            &[
                "1980 Jan  6  00:00:00.000  [00]  0x7777  Unknown Log 0x7777",
                "Packet Length = 0",
            ]
        );
    }

    #[test]
    fn test_hex_dump_rows() {
        let body: Vec<u8> = (0..70).collect();
        let record = decode(0x4169, body, DecodeMode::Text);
        let lines = record.lines();
        assert!(lines[0].ends_with("0x4169  RF Band Report"));
        assert_eq!(lines[1], "Version = 0");
        assert_eq!(lines[2], "Packet Length = 70");
        assert_eq!(
            lines[3],
            "Data[0000] = 00 01 02 03 04 05 06 07 08 09 0A 0B 0C 0D 0E 0F"
        );
        assert_eq!(
            lines[6],
            "Data[0030] = 30 31 32 33 34 35 36 37 38 39 3A 3B 3C 3D 3E 3F"
        );
        assert_eq!(lines[7], "... (6 more bytes)");
        assert_eq!(lines.len(), 8);
    }

    #[test]
    fn test_short_dump_has_partial_row() {
        let record = decode(0xBEEF, vec![0xAA, 0xBB, 0xCC], DecodeMode::Text);
        assert_eq!(record.lines()[3], "Data[0000] = AA BB CC");
        assert_eq!(record.lines().len(), 4);
    }

    #[test]
    fn test_pm_history() {
        let record = decode(0x1998, vec![2, 5, 0, 0, 0, 0, 0, 0], DecodeMode::Text);
        assert_eq!(record.lines()[3], "History Type = 5");
    }

    #[test]
    fn test_structured() {
        let record = decode(0xBEEF, vec![1; 80], DecodeMode::Structured);
        assert!(matches!(
            record,
            DecodedRecord::StructuredFields {
                kind: RecordKind::UnknownLog,
                ..
            }
        ));
        assert_eq!(record.field("packet_length"), Some(&FieldValue::UInt(80)));
        assert_eq!(record.field("more_bytes"), Some(&FieldValue::UInt(16)));
        assert_eq!(record.field("data"), Some(&FieldValue::Bytes(vec![1; 64])));
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name(0x1998), "PM PH History Info");
        assert_eq!(display_name(0x0abc), "Unknown Log 0x0ABC");
    }
}
