//! High rate WCDMA logs: downlink RLC AM PDUs, MAC-ehs reassembly, the
//! multi-carrier EUL report and the TX power report.

use crate::catalog::fields::{EnumTable, FieldReader, power_dbm};
use crate::catalog::report::Report;
use crate::catalog::{Category, DecodeContext, Specificity, entry};
use crate::diag::LogPacket;
use crate::record::{DecodedRecord, RecordKind};

pub const CATEGORY: Category = Category {
    name: "wcdma",
    specificity: Specificity::Topic,
    entries: &[
        entry(0x418B, "WCDMA Flexible DL RLC AM PDU", 8, flexible_dl_rlc_am_pdu),
        entry(0x421E, "WCDMA MAC-ehs Reassembly", 8, mac_ehs_reassembly),
        entry(0x4134, "WCDMA TX Report", 1, tx_report),
        entry(0x4222, "WCDMA Advanced Report", 1, version_only),
        entry(0x4344, "WCDMA Multi Carrier EUL Combined L1 MAC", 2, multi_carrier_eul),
        entry(0x4322, "WCDMA Diversity Report", 1, version_only),
        entry(0x435D, "WCDMA Calibration Report", 1, version_only),
    ],
};

const MAX_RLC_ENTITIES: usize = 8;
const MAX_RLC_PDUS: usize = 4;
const MAX_RAW_PDU_BYTES: usize = 16;
const MAX_EHS_PDUS: usize = 16;

const RLC_MODE_AM: u8 = 2;

const RLC_MODES: EnumTable = EnumTable(&[(0, "TM"), (1, "UM"), (2, "AM")]);
const ACTIVE_MACS: EnumTable = EnumTable(&[(0, "MAC-d"), (1, "MAC-ehs"), (2, "MAC-i/is")]);
const CARRIER_STATES: EnumTable = EnumTable(&[(0, "SINGLE_CARRIER"), (1, "DUAL_CARRIER")]);

fn label(table: &EnumTable, code: u8) -> String {
    table.spaced_label(code).into_owned()
}

fn flexible_dl_rlc_am_pdu(packet: &LogPacket, ctx: &DecodeContext) -> DecodedRecord {
    let body = packet.body.as_slice();
    if body.len() < 8 {
        return DecodedRecord::Insufficient;
    }
    let num_entities = body[2];
    let mut out = Report::new(
        ctx,
        packet,
        RecordKind::MacMessage,
        "WCDMA Flexible DL RLC AM PDU",
    )
    .with_thread(0xF7);
    out.field("Subscription ID", body[0]);
    out.field("Version", body[1]);
    out.field("Number of DL Entities", num_entities);

    let mut pos = 4;
    for i in 0..(num_entities as usize).min(MAX_RLC_ENTITIES) {
        let Some(&[logical_ch, num_pdus, li_length, rlc_mode]) = body.get(pos..pos + 4) else {
            break;
        };
        if pos + 8 > body.len() {
            break;
        }
        out.open(&format!("Entity Info[{i}]"), "   ");
        out.field("Data Logical Channel ID", logical_ch);
        out.field("Number of PDUs Logged", num_pdus);
        out.field("LI Length", li_length);
        out.text("RLC Mode", label(&RLC_MODES, rlc_mode));
        out.close();
        pos += 4;

        out.open(&format!("Entity Data[{i}]"), "   ");
        out.line(format!(
            "Entity Index = {i}{{ {logical_ch}, {num_pdus}, {li_length}  }}"
        ));
        for j in 0..(num_pdus as usize).min(MAX_RLC_PDUS) {
            if pos + 8 > body.len() {
                break;
            }
            let size_bits = body.read_u16(pos).unwrap_or_default();
            let size_bytes = (size_bits as usize).div_ceil(8);
            out.open(&format!("PDU[{j}]"), "   ");
            out.field("PDU Size (in Bits)", size_bits);
            if let Some(pdu) = body.read_bytes(pos + 2, size_bytes) {
                let raw = &pdu[..pdu.len().min(MAX_RAW_PDU_BYTES)];
                rlc_pdu_summary(&mut out, raw, logical_ch, rlc_mode);
            }
            out.close();
            pos += 2 + size_bytes;
        }
        out.close();
    }
    out.finish()
}

fn rlc_pdu_summary(out: &mut Report, raw: &[u8], logical_ch: u8, rlc_mode: u8) {
    let listed = raw
        .iter()
        .map(|b| format!("0x{b:02X}"))
        .collect::<Vec<_>>()
        .join(", ");
    out.field_as("Raw Data", format!("{{ {listed} }}"), raw.to_vec());
    let Some(&first) = raw.first() else {
        return;
    };
    if rlc_mode != RLC_MODE_AM {
        return;
    }
    if first & 0x80 != 0 {
        out.line(format!("->, DATA PDU:: {logical_ch}"));
        out.value("PDU Type", "DATA");
    } else {
        out.line(format!("->, CTL PDU:: {logical_ch}, Type = STATUS"));
        out.value("PDU Type", "STATUS");
        if let Some(&[_, _, hi, lo]) = raw.get(..4) {
            let ack_sn = (hi as u16) << 4 | (lo as u16) >> 4;
            out.open("SUFI[0]", "   ");
            out.line(format!("ACK, LSN = 0x{ack_sn:X}- {ack_sn}"));
            out.value("ACK LSN", ack_sn);
            out.close();
        }
    }
}

fn mac_ehs_reassembly(packet: &LogPacket, ctx: &DecodeContext) -> DecodedRecord {
    let body = packet.body.as_slice();
    if body.len() < 8 {
        return DecodedRecord::Insufficient;
    }
    let num_pdus = body[3];
    let mut out = Report::new(ctx, packet, RecordKind::MacMessage, "WCDMA MAC-ehs Reassembly")
        .with_thread(0xE8);
    out.field("Subscription ID", body[0]);
    out.field("Version", body[1]);
    out.text("Active MAC", label(&ACTIVE_MACS, body[2]));
    out.field("Number of PDUs", num_pdus);
    let efach = if body[4] == 0 {
        "TSN does not contain Enahanced Cell FACH TM mode PDUs"
    } else {
        "Enhanced Cell FACH TM mode enabled"
    };
    out.text("E-FACH TM mode", efach);

    let mut pos = 8;
    for i in 0..(num_pdus as usize).min(MAX_EHS_PDUS) {
        if pos + 12 > body.len() {
            break;
        }
        out.open(&format!("PDU[{i}]"), "   ");
        out.field("TSN", body.read_u32(pos).unwrap_or_default());
        let size = body.read_u16(pos + 4).unwrap_or_default();
        out.field_as("Size", format!("{size} bytes"), size);
        out.field("Queue ID", body.read_u16(pos + 6).unwrap_or_default());
        out.field("Status", body.read_u16(pos + 8).unwrap_or_default());
        out.close();
        pos += 10;
    }
    out.finish()
}

fn tx_report(packet: &LogPacket, ctx: &DecodeContext) -> DecodedRecord {
    let body = packet.body.as_slice();
    if body.is_empty() {
        return DecodedRecord::Insufficient;
    }
    let mut out = Report::new(ctx, packet, RecordKind::Measurement, "WCDMA TX Report");
    out.field("Version", body[0]);
    if body.len() >= 12 {
        let power = power_dbm(body.read_i16(4).unwrap_or_default());
        out.field_as("TX Power", format!("{power:.2} dBm"), power);
        out.field("PA State", body[6]);
    }
    out.finish()
}

fn multi_carrier_eul(packet: &LogPacket, ctx: &DecodeContext) -> DecodedRecord {
    let body = packet.body.as_slice();
    if body.len() < 2 {
        return DecodedRecord::Insufficient;
    }
    let mut out = Report::new(
        ctx,
        packet,
        RecordKind::MacMessage,
        "WCDMA Multi Carrier EUL Combined L1 MAC ",
    )
    .with_thread(0xEC);
    out.field("Subscription ID", body[0]);
    out.line(" ");
    out.field("Version", body[1]);
    if body.len() >= 8 {
        out.text("Carrier State", label(&CARRIER_STATES, body[2]));
        out.line(" ");
        out.line("Primary Carrier:");
        out.line(" ");
        if body.len() >= 16 {
            out.nest("Primary Carrier", "\t");
            out.field("Number of Samples", body[8]);
            out.field_as("TTI", format!("{}ms", body[9]), body[9]);
            out.field("ETFCI Table", body[10]);
            out.field("Start CFN", body.read_u16(12).unwrap_or_default());
            out.field("Number of Cells", body[14]);
            out.close();
        }
    }
    out.finish()
}

fn version_only(packet: &LogPacket, ctx: &DecodeContext) -> DecodedRecord {
    if packet.body.is_empty() {
        return DecodedRecord::Insufficient;
    }
    let title = match packet.message_type {
        0x4222 => "WCDMA Advanced Report",
        0x4322 => "WCDMA Diversity Report",
        _ => "WCDMA Calibration Report",
    };
    let mut out = Report::new(ctx, packet, RecordKind::Measurement, title);
    out.field("Version", packet.body[0]);
    out.finish()
}
