//! Legacy QCAT message logs: SIM card APDUs, QMI messages with their TLV
//! chain, call manager phone events and power manager policy statistics.

use num_enum::TryFromPrimitive;

use crate::catalog::fields::{EnumTable, FieldReader};
use crate::catalog::report::Report;
use crate::catalog::{Category, DecodeContext, Specificity, entry};
use crate::diag::LogPacket;
use crate::record::{DecodedRecord, RecordKind, hex_string};

pub const CATEGORY: Category = Category {
    name: "qcat",
    specificity: Specificity::Topic,
    entries: &[
        entry(0x1098, "RUIM Debug", 2, ruim_debug),
        entry(0x1544, "QMI_MCS_QCSI_PKT", 12, qmi_message),
        entry(0x1273, "CM Phone Event", 4, cm_phone_event),
        entry(0x199B, "PM Policy Stats Info", 20, pm_policy_stats),
    ],
};

pub const QMI_HEADER_LEN: usize = 15;
pub const MAX_QMI_TLVS: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum ApduDirection {
    Command = 0,
    Response = 1,
}

const APDU_INSTRUCTIONS: EnumTable = EnumTable(&[
    (0xF2, "STATUS"),
    (0xA4, "SELECT"),
    (0xB0, "READ BINARY"),
    (0xB2, "READ RECORD"),
    (0xD6, "UPDATE BINARY"),
    (0xDC, "UPDATE RECORD"),
    (0x88, "AUTHENTICATE"),
    (0x20, "VERIFY"),
    (0x84, "GET CHALLENGE"),
    (0xC0, "GET RESPONSE"),
]);

const QMI_SERVICES: EnumTable = EnumTable(&[
    (1, "CTL"),
    (2, "WDS"),
    (3, "DMS"),
    (4, "NAS"),
    (5, "QOS"),
    (6, "WMS"),
    (7, "PDS"),
    (8, "AUTH"),
    (9, "AT"),
    (10, "VOICE"),
    (11, "CAT2"),
    (12, "UIM"),
    (13, "PBM"),
    (14, "QCHAT"),
    (15, "RMTFS"),
    (16, "TEST"),
    (17, "LOC"),
    (18, "SAR"),
    (19, "IMSS"),
    (20, "ADC"),
    (21, "MFS"),
]);

const CM_PH_EVENTS: EnumTable = EnumTable(&[
    (0, "CM_PH_EVENT_OPRT_MODE"),
    (1, "CM_PH_EVENT_TEST_CONTROL_TYPE"),
    (2, "CM_PH_EVENT_SYS_SEL_PREF"),
    (3, "CM_PH_EVENT_ANSWER_VOICE"),
    (4, "CM_PH_EVENT_NAM_SEL"),
    (5, "CM_PH_EVENT_CURR_NAM"),
    (6, "CM_PH_EVENT_IN_USE_STATE"),
    (7, "CM_PH_EVENT_CDMA_LOCK_MODE"),
    (8, "CM_PH_EVENT_UIM_NOT_AVAILABLE"),
    (9, "CM_PH_EVENT_SUBSCRIPTION_AVAILABLE"),
    (10, "CM_PH_EVENT_SUBSCRIPTION_NOT_AVAILABLE"),
    (11, "CM_PH_EVENT_SUBSCRIPTION_CHANGED"),
    (12, "CM_PH_EVENT_AVAILABLE_NETWORKS_CONF"),
    (13, "CM_PH_EVENT_PREFERRED_NETWORKS_CONF"),
    (14, "CM_PH_EVENT_FUNDS_LOW"),
    (15, "CM_PH_EVENT_WAKEUP_FROM_STANDBY"),
    (16, "CM_PH_EVENT_NVRUIM_CONFIG_CHANGED"),
    (17, "CM_PH_EVENT_PREFERRED_NETWORKS"),
    (18, "CM_PH_EVENT_PS_ATTACH_FAILED"),
    (19, "CM_PH_EVENT_RESET_ACM_COMPLETED"),
    (20, "CM_PH_EVENT_DDTM_STATUS"),
]);

const OPERATING_MODES: EnumTable = EnumTable(&[
    (0, "Poweroff"),
    (1, "FTM"),
    (2, "Offline"),
    (3, "Offline AMPS"),
    (4, "Offline CDMA"),
    (5, "Online"),
    (6, "Low power mode"),
    (7, "Reset"),
]);

fn apdu_command(ins: u8) -> String {
    match APDU_INSTRUCTIONS.get(ins as u32) {
        Some(name) => name.to_string(),
        None => format!("UNKNOWN (0x{ins:02X})"),
    }
}

/// ISO 7816-4 status word interpretation.
pub fn status_words(sw1: u8, sw2: u8) -> String {
    match (sw1, sw2) {
        (0x90, 0x00) => "Normal ending of the command".to_string(),
        (0x91, _) => format!("Normal ending with extra info (0x{sw2:02X})"),
        (0x92, _) => format!("Command successful with warning (0x{sw2:02X})"),
        (0x93, _) => format!("Command successful but after retry (0x{sw2:02X})"),
        (0x94, _) => format!("Error, no precise diagnosis (0x{sw2:02X})"),
        (0x98, _) => format!("Security error (0x{sw2:02X})"),
        (0x6A, _) => format!("Wrong parameter(s) P1-P2 (0x{sw2:02X})"),
        (0x6B, _) => "Wrong parameter(s) P1-P2".to_string(),
        (0x6D, _) => "Instruction code not supported".to_string(),
        (0x6E, _) => "Class not supported".to_string(),
        (0x6F, _) => "Technical problem, no precise diagnosis".to_string(),
        _ => format!("Unknown status (0x{sw1:02X} 0x{sw2:02X})"),
    }
}

fn ruim_debug(packet: &LogPacket, ctx: &DecodeContext) -> DecodedRecord {
    let body = packet.body.as_slice();
    if body.len() < 2 {
        return DecodedRecord::Insufficient;
    }
    let direction = ApduDirection::try_from(body[0]).ok();
    let data = &body[1..];

    let mut out = Report::new(ctx, packet, RecordKind::QcatMessage, "RUIM Debug");
    let direction_label = match direction {
        Some(ApduDirection::Command) => "TX",
        _ => "RX",
    };
    out.text("Direction", direction_label);
    out.field_as("Data", hex_string(data, ""), data.to_vec());

    match direction {
        Some(ApduDirection::Command) => {
            if let Some(&[cla, ins, p1, p2, p3]) = data.get(..5) {
                out.text("Command", apdu_command(ins));
                out.field_as("CLA", format!("0x{cla:02X}"), cla);
                out.field_as("INS", format!("0x{ins:02X}"), ins);
                out.field_as("P1", format!("0x{p1:02X}"), p1);
                out.field_as("P2", format!("0x{p2:02X}"), p2);
                out.field_as("P3", format!("0x{p3:02X}"), p3);
                out.field("Slot", 1u8);
                out.field("Logical Channel", cla & 0x03);
                let sm = if cla & 0x0C == 0 { "No SM used" } else { "SM used" };
                out.text("Secure Messaging", sm);
            }
        }
        Some(ApduDirection::Response) => {
            if let [response @ .., sw1, sw2] = data {
                out.field_as("SW1", format!("0x{sw1:02X}"), *sw1);
                out.field_as("SW2", format!("0x{sw2:02X}"), *sw2);
                out.text("Status", status_words(*sw1, *sw2));
                out.field("Slot", 1u8);
                if !response.is_empty() {
                    out.field_as("Response Data", hex_string(response, ""), response.to_vec());
                }
            }
        }
        None => {}
    }
    out.finish()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QmiTlv<'a> {
    pub tlv_type: u8,
    pub length: u16,
    pub value: &'a [u8],
}

/// Walks a TLV chain, stopping at the first entry that runs past the end of
/// `data` or after [MAX_QMI_TLVS] entries.
pub fn parse_qmi_tlvs(data: &[u8]) -> Vec<QmiTlv<'_>> {
    let mut tlvs = Vec::new();
    let mut pos = 0;
    while tlvs.len() < MAX_QMI_TLVS {
        let (Some(tlv_type), Some(length)) = (data.read_u8(pos), data.read_u16(pos + 1)) else {
            break;
        };
        let Some(value) = data.read_bytes(pos + 3, length as usize) else {
            break;
        };
        tlvs.push(QmiTlv {
            tlv_type,
            length,
            value,
        });
        pos += 3 + length as usize;
    }
    tlvs
}

fn qmi_message_type(msg_type: u8) -> &'static str {
    match msg_type {
        0 => "Request",
        2 => "Response",
        _ => "Indication",
    }
}

fn qmi_message(packet: &LogPacket, ctx: &DecodeContext) -> DecodedRecord {
    let body = packet.body.as_slice();
    if body.len() < 12 {
        return DecodedRecord::Insufficient;
    }
    let service_id = body[4];
    let mut out = Report::new(ctx, packet, RecordKind::QcatMessage, "QMI_MCS_QCSI_PKT");
    out.field("Version", body[0]);
    out.text("Message Type", qmi_message_type(body[1]));
    out.field("Counter", body.read_u16(2).unwrap_or_default());
    out.field("Service ID", service_id);
    out.text("Service Name", QMI_SERVICES.label(service_id));
    out.field("Major Rev", body[5]);
    out.field("Minor Rev", body[6]);
    let handle = body.read_u32(7).unwrap_or_default();
    out.field_as("Connection Handle", format!("0x{handle:08X}"), handle);
    let msg_id = body.read_u16(11).unwrap_or_default();
    out.field_as("Message ID", format!("0x{msg_id:04X}"), msg_id);
    out.field("QMI Length", body.read_u16(13).unwrap_or_default());

    let tlvs = body
        .get(QMI_HEADER_LEN..)
        .map(parse_qmi_tlvs)
        .unwrap_or_default();
    out.field("Number of TLVs", tlvs.len());
    for (i, tlv) in tlvs.iter().enumerate() {
        out.open_braced(&format!("TLV[{i}]"));
        out.field_as("Type", format!("0x{:02X}", tlv.tlv_type), tlv.tlv_type);
        out.field("Length", tlv.length);
        out.field_as("Value", hex_string(tlv.value, ""), tlv.value.to_vec());
        out.close();
    }
    out.finish()
}

fn cm_phone_event(packet: &LogPacket, ctx: &DecodeContext) -> DecodedRecord {
    let body = packet.body.as_slice();
    if body.len() < 4 {
        return DecodedRecord::Insufficient;
    }
    let event_type = body.read_u16(1).unwrap_or_default();
    let mut out = Report::new(ctx, packet, RecordKind::QcatMessage, "CM Phone Event");
    out.field("Version", body[0]);
    out.field("Event Type", event_type);
    out.text("Event Name", CM_PH_EVENTS.label(event_type));
    if body.len() >= 10 {
        out.text("Is In Use", if body[3] != 0 { "YES" } else { "NO" });
        out.text("Operating Mode", OPERATING_MODES.label(body[4]));
    }
    out.finish()
}

fn pm_policy_stats(packet: &LogPacket, ctx: &DecodeContext) -> DecodedRecord {
    let body = packet.body.as_slice();
    if body.len() < 20 {
        return DecodedRecord::Insufficient;
    }
    let mut out = Report::new(ctx, packet, RecordKind::QcatMessage, "PM Policy Stats Info");
    out.field("Version", body[0]);
    out.field("Policy Num", body.read_u16(1).unwrap_or_default());
    out.field("Policy Type", body[3]);
    out.field("Policy Version", body[4]);
    out.field("Last Exec Time", body.read_u32(5).unwrap_or_default());
    out.field("Elapsed Time", body.read_u32(9).unwrap_or_default());
    out.field("Num Rules", body.read_u16(13).unwrap_or_default());
    out.field("Suspend Count", body.read_u16(15).unwrap_or_default());
    out.text("Is Policy Init", if body[17] != 0 { "true" } else { "false" });
    out.finish()
}
