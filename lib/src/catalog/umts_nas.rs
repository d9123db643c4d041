//! UMTS NAS state logs: forbidden PLMNs, registration, MM and GMM state.

use crate::catalog::fields::{EnumTable, FieldReader};
use crate::catalog::plmn::decode_plmn;
use crate::catalog::report::Report;
use crate::catalog::{Category, DecodeContext, Specificity, entry};
use crate::diag::LogPacket;
use crate::record::{DecodedRecord, RecordKind};

pub const CATEGORY: Category = Category {
    name: "umts_nas",
    specificity: Specificity::Topic,
    entries: &[
        entry(0x7152, "UMTS NAS_FPLMN List", 4, fplmn_list),
        entry(0x7132, "UMTS NAS_REG State", 4, reg_state),
        entry(0x7131, "UMTS NAS_MM State", 4, mm_state),
        entry(0x7130, "UMTS NAS_GMM State", 4, gmm_state),
    ],
};

const MAX_FPLMNS: usize = 16;

const REG_STATES: EnumTable = EnumTable(&[
    (0, "Not Registered"),
    (1, "Registered (Home Network)"),
    (2, "Not Registered (Searching)"),
    (3, "Registration Denied"),
    (4, "Unknown"),
    (5, "Registered (Roaming)"),
]);

const MM_STATES: EnumTable = EnumTable(&[
    (0, "MM_IDLE"),
    (1, "MM_WAIT_FOR_OUTGOING_MM_CONNECTION"),
    (2, "MM_CONNECTION_ACTIVE"),
    (3, "MM_IMSI_DETACH_INITIATED"),
    (4, "MM_PROCESS_CM_SERVICE_PROMPT"),
    (5, "MM_WAIT_FOR_ADDITIONAL_OUTGOING_MM_CONNECTION"),
    (6, "MM_WAIT_FOR_RR_CONNECTION_MM"),
    (7, "MM_WAIT_FOR_NETWORK_COMMAND"),
    (8, "MM_WAIT_FOR_RR_ACTIVE"),
    (9, "MM_LOCATION_UPDATE_INITIATED"),
    (10, "MM_LOCATION_UPDATE_REJECTED"),
    (11, "MM_WAIT_FOR_RR_CONNECTION_LU"),
    (12, "MM_WAIT_FOR_RR_CONNECTION_IMSI_DETACH"),
]);

const GMM_STATES: EnumTable = EnumTable(&[
    (0, "GMM_DEREGISTERED"),
    (1, "GMM_REGISTERED_INITIATED"),
    (2, "GMM_REGISTERED"),
    (3, "GMM_DEREGISTERED_INITIATED"),
    (4, "GMM_ROUTING_AREA_UPDATING_INITIATED"),
    (5, "GMM_SERVICE_REQUEST_INITIATED"),
    (6, "GMM_REGISTERED_NORMAL_SERVICE"),
    (7, "GMM_REGISTERED_LIMITED_SERVICE"),
    (8, "GMM_REGISTERED_UPDATE_NEEDED"),
    (9, "GMM_REGISTERED_ATTEMPTING_TO_UPDATE"),
    (10, "GMM_REGISTERED_IMSI_DETACH_INITIATED"),
    (11, "GMM_REGISTERED_ATTEMPTING_TO_UPDATE_MM"),
    (12, "GMM_REGISTERED_NO_CELL_AVAILABLE"),
]);

fn start<'a>(packet: &LogPacket, ctx: &'a DecodeContext, title: &str) -> Report<'a> {
    let mut out = Report::new(ctx, packet, RecordKind::NasMessage, title);
    out.field("Version", packet.body[0]);
    out
}

fn fplmn_list(packet: &LogPacket, ctx: &DecodeContext) -> DecodedRecord {
    let body = packet.body.as_slice();
    if body.len() < 4 {
        return DecodedRecord::Insufficient;
    }
    let mut out = start(packet, ctx, "UMTS NAS_FPLMN List");
    if body.len() >= 8 {
        let count = body[1];
        out.field("Number of FPLMNs", count);
        for i in 0..(count as usize).min(MAX_FPLMNS) {
            let Some(bytes) = body.read_array::<3>(4 + i * 3) else {
                break;
            };
            let plmn = decode_plmn(bytes);
            out.line(format!("FPLMN {i}: {plmn}"));
            out.group(&format!("FPLMN[{i}]"));
            out.value("MCC", plmn.mcc);
            out.value("MNC", plmn.mnc);
            out.close();
        }
    }
    out.finish()
}

fn reg_state(packet: &LogPacket, ctx: &DecodeContext) -> DecodedRecord {
    let body = packet.body.as_slice();
    if body.len() < 4 {
        return DecodedRecord::Insufficient;
    }
    let mut out = start(packet, ctx, "UMTS NAS_REG State");
    if body.len() >= 8 {
        out.text("Registration State", state_label(&REG_STATES, body[1]));
        out.field("Registration Domain", body[2]);
    }
    if body.len() >= 12 {
        let lac = body.read_u16(4).unwrap_or_default();
        let cell_id = body.read_u16(6).unwrap_or_default();
        out.field_as("Location Area Code", format!("0x{lac:04X}"), lac);
        out.field_as("Cell ID", format!("0x{cell_id:04X}"), cell_id);
    }
    out.finish()
}

fn state_label(table: &EnumTable, code: u8) -> String {
    table.spaced_label(code).into_owned()
}

/// MM and GMM state logs differ only in their labels.
fn state_and_substate(
    packet: &LogPacket,
    ctx: &DecodeContext,
    title: &str,
    prefix: &str,
    table: &EnumTable,
) -> DecodedRecord {
    let body = packet.body.as_slice();
    if body.len() < 4 {
        return DecodedRecord::Insufficient;
    }
    let mut out = start(packet, ctx, title);
    if body.len() >= 8 {
        out.text(&format!("{prefix} State"), state_label(table, body[1]));
        out.field(&format!("{prefix} Substate"), body[2]);
    }
    out.finish()
}

fn mm_state(packet: &LogPacket, ctx: &DecodeContext) -> DecodedRecord {
    state_and_substate(packet, ctx, "UMTS NAS_MM State", "MM", &MM_STATES)
}

fn gmm_state(packet: &LogPacket, ctx: &DecodeContext) -> DecodedRecord {
    state_and_substate(packet, ctx, "UMTS NAS_GMM State", "GMM", &GMM_STATES)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::catalog::DecodeMode;
    use crate::diag::Timestamp;
    use crate::record::FieldValue;

    fn decode(decoder: crate::catalog::DecodeFn, id: u16, body: Vec<u8>, mode: DecodeMode) -> DecodedRecord {
        let packet = LogPacket::new(id, Timestamp { ts: 0 }, body);
        decoder(&packet, &DecodeContext::new(mode))
    }

    #[test]
    fn test_fplmn_list() {
        let body = vec![1, 2, 0, 0, 0x13, 0xF8, 0x23, 0x13, 0x00, 0x62];
        let record = decode(fplmn_list, 0x7152, body, DecodeMode::Text);
        assert_eq!(
            &record.lines()[1..],
            &[
                "Version = 1",
                "Number of FPLMNs = 2",
                "FPLMN 0: MCC=318, MNC=32",
                "FPLMN 1: MCC=310, MNC=026",
            ]
        );
    }

    #[test]
    fn test_fplmn_count_capped() {
        let mut body = vec![1, 255, 0, 0];
        body.extend([0x13, 0xF0, 0x10].repeat(20));
        let record = decode(fplmn_list, 0x7152, body, DecodeMode::Structured);
        assert_eq!(
            record.field("fplmn_15_mnc"),
            Some(&FieldValue::Str("01".to_string()))
        );
        assert_eq!(record.field("fplmn_16_mnc"), None);
    }

    #[test]
    fn test_reg_state() {
        let mut body = vec![1, 5, 2, 0];
        body.extend(0x1A2Bu16.to_le_bytes());
        body.extend(0x0042u16.to_le_bytes());
        body.extend([0; 4]);
        let record = decode(reg_state, 0x7132, body, DecodeMode::Text);
        assert_eq!(
            &record.lines()[1..],
            &[
                "Version = 1",
                "Registration State = Registered (Roaming)",
                "Registration Domain = 2",
                "Location Area Code = 0x1A2B",
                "Cell ID = 0x0042",
            ]
        );
    }

    #[test]
    fn test_mm_and_gmm_state() {
        let record = decode(mm_state, 0x7131, vec![1, 9, 3, 0, 0, 0, 0, 0], DecodeMode::Text);
        assert_eq!(record.lines()[2], "MM State = MM_LOCATION_UPDATE_INITIATED");
        assert_eq!(record.lines()[3], "MM Substate = 3");

        let record = decode(gmm_state, 0x7130, vec![1, 40, 0, 0, 0, 0, 0, 0], DecodeMode::Text);
        assert_eq!(record.lines()[2], "GMM State = Unknown (40)");

        let record = decode(gmm_state, 0x7130, vec![1, 2, 0, 0], DecodeMode::Text);
        assert_eq!(record.lines().len(), 2);
    }
}
