//! WCDMA signaling and cell measurement logs. The BCCH signaling log gets a
//! skeleton of the ASN.1 value notation QCAT prints for system information.

use crate::catalog::fields::{EnumTable, FieldReader};
use crate::catalog::report::Report;
use crate::catalog::{Category, DecodeContext, Specificity, entry};
use crate::diag::LogPacket;
use crate::record::{DecodedRecord, RecordKind};

pub const CATEGORY: Category = Category {
    name: "wcdma_signaling",
    specificity: Specificity::Topic,
    entries: &[
        entry(0x412F, "WCDMA Signaling Messages", 16, signaling_messages),
        entry(0x4135, "WCDMA Cell ID", 1, cell_id),
        entry(0x4342, "WCDMA Search Cell Reselection", 1, search_cell_reselection),
        entry(0x423F, "WCDMA AGC", 1, agc),
        entry(0x421C, "WCDMA Finger Info", 1, finger_info),
        entry(0x41D3, "WCDMA TX AGC Adj", 1, measurement_version),
        entry(0x4345, "WCDMA RRC States", 1, rrc_version),
        entry(0x4176, "WCDMA RX Diversity", 1, measurement_version),
        entry(0x41B2, "WCDMA Compressed Mode", 1, measurement_version),
        entry(0x19B5, "WCDMA RRC OTA Message", 1, rrc_version),
    ],
};

const MAX_SIBS: usize = 8;
const MAX_CELLS: usize = 8;
const MAX_FINGERS: usize = 6;

const CHANNELS: EnumTable = EnumTable(&[
    (0, "DL_BCCH_BCH"),
    (1, "DL_BCCH_FACH"),
    (2, "DL_PCCH"),
    (3, "DL_CCCH"),
    (4, "DL_DCCH"),
    (5, "UL_CCCH"),
    (6, "UL_DCCH"),
    (7, "DL_SHCCH"),
]);

const SEARCH_TYPES: EnumTable =
    EnumTable(&[(0, "INITIAL_SEARCH"), (1, "RESELECTION"), (2, "HANDOVER")]);

fn upper_label(table: &EnumTable, code: u8) -> String {
    match table.get(code as u32) {
        Some(label) => label.to_string(),
        None => format!("UNKNOWN_{code}"),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SibPayload {
    CompleteList,
    FirstSegment,
    SubsequentSegment,
    LastSegmentShort,
    LastSegmentLong,
}

impl SibPayload {
    fn from_indicator(indicator: Option<u8>) -> Self {
        match indicator {
            Some(0x01) => SibPayload::FirstSegment,
            Some(0x02) => SibPayload::SubsequentSegment,
            Some(0x03) => SibPayload::LastSegmentShort,
            Some(0x04) => SibPayload::LastSegmentLong,
            _ => SibPayload::CompleteList,
        }
    }

    fn description(self) -> &'static str {
        match self {
            SibPayload::CompleteList => "Complete SIB List",
            SibPayload::FirstSegment => "First Segment",
            SibPayload::SubsequentSegment => "Subsequent Segment",
            SibPayload::LastSegmentShort => "Last Segment Short",
            SibPayload::LastSegmentLong => "Last Segment Long",
        }
    }
}

fn signaling_messages(packet: &LogPacket, ctx: &DecodeContext) -> DecodedRecord {
    let body = packet.body.as_slice();
    if body.len() < 16 {
        return DecodedRecord::Insufficient;
    }
    let channel = upper_label(&CHANNELS, body[1]);
    let rb_id = body[2];
    let uarfcn = body.read_u16(4).unwrap_or_default();
    let psc = body.read_u16(6).unwrap_or_default();
    let msg_len = body.read_u16(8).unwrap_or_default();
    let payload = SibPayload::from_indicator(body.read_u8(16));

    let title = format!(
        "WCDMA Signaling Messages  --  {channel} {}",
        payload.description()
    );
    let mut out = Report::new(ctx, packet, RecordKind::RrcMessage, title).with_thread(0x99);
    out.field("Subscription ID", body[0]);
    out.line(format!(
        "\tChannel Type = {channel}, Radio Bearer ID = {rb_id}, Uarfcn = {uarfcn}, Psc = {psc}, Message Length = {msg_len}"
    ));
    out.value("Channel Type", channel);
    out.value("Radio Bearer ID", rb_id);
    out.value("Uarfcn", uarfcn);
    out.value("Psc", psc);
    out.value("Message Length", msg_len);
    out.value("Payload", payload.description());

    out.line("Interpreted PDU:");
    out.line("value BCCH-BCH-Message ::= ");
    out.line("{");
    out.line("  message ");
    out.line("  {");
    if let Some(sfn_prime) = body.read_u16(18) {
        out.line(format!("    sfn-Prime {sfn_prime},"));
        out.value("SFN Prime", sfn_prime);
        match payload {
            SibPayload::CompleteList => {
                out.line("    payload completeSIB-List : ");
                out.line("      {");
                if body.len() >= 24 {
                    sib_list(body, &mut out);
                }
                out.line("      }");
            }
            SibPayload::FirstSegment => {
                segment(&mut out, "firstSegment", "seg-Count 4", "sib-Data-fixed")
            }
            SibPayload::SubsequentSegment => {
                segment(&mut out, "subsequentSegment", "segmentIndex 2", "sib-Data-fixed")
            }
            SibPayload::LastSegmentShort | SibPayload::LastSegmentLong => segment(
                &mut out,
                "lastSegmentShort",
                "segmentIndex 3",
                "sib-Data-variable",
            ),
        }
    }
    out.line("  }");
    out.line("}");
    out.finish()
}

fn sib_list(body: &[u8], out: &mut Report) {
    let seg_count = body[22];
    out.line(format!("        segCount {seg_count},"));
    out.value("Seg Count", seg_count);
    out.line("        sib-Data-variable");
    out.line("        {");
    let mut pos = 24;
    for i in 0..(seg_count as usize).min(MAX_SIBS) {
        if pos + 4 > body.len() {
            break;
        }
        let sib_type = body[pos];
        let sib_len = body[pos + 1];
        out.line(format!("          sib{sib_type} : length {sib_len}"));
        out.group(&format!("SIB[{i}]"));
        out.value("Type", sib_type);
        out.value("Length", sib_len);
        out.close();
        pos += 4 + sib_len as usize;
    }
    out.line("        }");
}

fn segment(out: &mut Report, name: &str, position: &str, data: &str) {
    out.line(format!("    payload {name} : "));
    out.line("      {");
    out.line("        sib-Type sib1,");
    out.line(format!("        {position},"));
    out.line(format!("        {data}"));
    out.line("      }");
}

fn cell_id(packet: &LogPacket, ctx: &DecodeContext) -> DecodedRecord {
    let body = packet.body.as_slice();
    if body.is_empty() {
        return DecodedRecord::Insufficient;
    }
    let mut out = Report::new(ctx, packet, RecordKind::CellInfo, "WCDMA Cell ID");
    out.field("Version", body[0]);
    if body.len() >= 12 {
        out.field("Cell ID", body.read_u32(4).unwrap_or_default());
        out.field(
            "Primary Scrambling Code",
            body.read_u16(8).unwrap_or_default(),
        );
    }
    out.finish()
}

fn search_cell_reselection(packet: &LogPacket, ctx: &DecodeContext) -> DecodedRecord {
    let body = packet.body.as_slice();
    if body.is_empty() {
        return DecodedRecord::Insufficient;
    }
    let mut out = Report::new(ctx, packet, RecordKind::CellInfo, "WCDMA Search Cell Reselection");
    out.field("Version", body[0]);
    if body.len() >= 16 {
        let num_cells = body[2];
        out.text("Search Type", upper_label(&SEARCH_TYPES, body[1]));
        out.field("Number of Cells", num_cells);
        let mut pos = 8;
        for i in 0..(num_cells as usize).min(MAX_CELLS) {
            if pos + 12 > body.len() {
                break;
            }
            let psc = body.read_u16(pos).unwrap_or_default();
            let rscp = body.read_i16(pos + 2).unwrap_or_default() as f64 / 16.0;
            let ecio = body.read_i16(pos + 4).unwrap_or_default() as f64 / 16.0;
            let label = format!("Cell[{i}]");
            out.line(format!(
                "{label}: PSC = {psc}, RSCP = {rscp:.1} dBm, Ec/Io = {ecio:.1} dB"
            ));
            out.group(&label);
            out.value("PSC", psc);
            out.value("RSCP", rscp);
            out.value("Ec/Io", ecio);
            out.close();
            pos += 12;
        }
    }
    out.finish()
}

fn agc(packet: &LogPacket, ctx: &DecodeContext) -> DecodedRecord {
    let body = packet.body.as_slice();
    if body.is_empty() {
        return DecodedRecord::Insufficient;
    }
    let mut out = Report::new(ctx, packet, RecordKind::Measurement, "WCDMA AGC");
    out.field("Version", body[0]);
    if body.len() >= 16 {
        out.field("AGC Value", body.read_i16(4).unwrap_or_default());
        out.field("LNA State", body[6]);
    }
    out.finish()
}

fn finger_info(packet: &LogPacket, ctx: &DecodeContext) -> DecodedRecord {
    let body = packet.body.as_slice();
    if body.is_empty() {
        return DecodedRecord::Insufficient;
    }
    let mut out = Report::new(ctx, packet, RecordKind::Measurement, "WCDMA Finger Info");
    out.field("Version", body[0]);
    if body.len() >= 12 {
        let num_fingers = body[1];
        out.field("Number of Fingers", num_fingers);
        let mut pos = 4;
        for i in 0..(num_fingers as usize).min(MAX_FINGERS) {
            if pos + 8 > body.len() {
                break;
            }
            let finger_id = body[pos];
            let pn_position = body.read_u16(pos + 2).unwrap_or_default();
            let energy = body.read_u16(pos + 4).unwrap_or_default();
            let label = format!("Finger[{i}]");
            out.line(format!(
                "{label}: ID = {finger_id}, PN Position = {pn_position}, Energy = {energy}"
            ));
            out.group(&label);
            out.value("ID", finger_id);
            out.value("PN Position", pn_position);
            out.value("Energy", energy);
            out.close();
            pos += 8;
        }
    }
    out.finish()
}

fn version_report(packet: &LogPacket, ctx: &DecodeContext, kind: RecordKind) -> DecodedRecord {
    let Some(&version) = packet.body.first() else {
        return DecodedRecord::Insufficient;
    };
    let title = CATEGORY
        .entries
        .iter()
        .find(|e| e.message_type == packet.message_type)
        .map_or("WCDMA Report", |e| e.display_name);
    let mut out = Report::new(ctx, packet, kind, title);
    out.field("Version", version);
    out.finish()
}

fn measurement_version(packet: &LogPacket, ctx: &DecodeContext) -> DecodedRecord {
    version_report(packet, ctx, RecordKind::Measurement)
}

fn rrc_version(packet: &LogPacket, ctx: &DecodeContext) -> DecodedRecord {
    version_report(packet, ctx, RecordKind::RrcMessage)
}
