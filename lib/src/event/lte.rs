//! LTE RRC and NAS events with short semantic renderings. WCDMA, GSM and
//! NR events are named here as well but only carry hex payloads.

use crate::catalog::Specificity;
use crate::catalog::fields::{EnumTable, FieldReader};
use crate::event::{EventCategory, EventEntry, EventSummary, event};

pub const CATEGORY: EventCategory = EventCategory {
    name: "lte",
    specificity: Specificity::Topic,
    entries: ENTRIES,
};

const ENTRIES: &[EventEntry] = &[
    event(1605, "LTE_RRC_TIMER_STATUS", EventSummary::hex),
    event(1606, "LTE_RRC_STATE_CHANGE", rrc_state_change),
    event(1609, "LTE_RRC_DL_MSG", rrc_dl_msg),
    event(1610, "LTE_RRC_UL_MSG", rrc_ul_msg),
    event(1614, "LTE_RRC_PAGING_DRX_CYCLE", byte_pair),
    event(1627, "LTE_CM_INCOMING_MSG", nas_msg),
    event(1628, "LTE_CM_OUTGOING_MSG", nas_msg),
    event(1629, "LTE_EMM_INCOMING_MSG", nas_msg),
    event(1630, "LTE_EMM_OUTGOING_MSG", nas_msg),
    event(1633, "LTE_REG_INCOMING_MSG", nas_msg),
    event(1634, "LTE_REG_OUTGOING_MSG", nas_msg),
    event(1635, "LTE_ESM_INCOMING_MSG", nas_msg),
    event(1636, "LTE_ESM_OUTGOING_MSG", nas_msg),
    event(1966, "LTE_EMM_OTA_INCOMING_MSG", single_byte),
    event(1967, "LTE_EMM_OTA_OUTGOING_MSG", single_byte),
    event(1968, "LTE_ESM_OTA_INCOMING_MSG", single_byte),
    event(1969, "LTE_ESM_OTA_OUTGOING_MSG", single_byte),
    event(1631, "LTE_EMM_TIMER_START", single_byte),
    event(1632, "LTE_EMM_TIMER_EXPIRY", single_byte),
    event(1637, "LTE_ESM_TIMER_START", single_byte),
    event(1638, "LTE_ESM_TIMER_EXPIRY", single_byte),
    event(1938, "LTE_ML1_PHR_REPORT", byte_pair),
    event(1994, "LTE_RRC_STATE_CHANGE_TRIGGER", single_byte),
    event(2100, "WCDMA_RRC_STATE_CHANGE", EventSummary::hex),
    event(2101, "WCDMA_RRC_DL_MSG", EventSummary::hex),
    event(2102, "WCDMA_RRC_UL_MSG", EventSummary::hex),
    event(2103, "WCDMA_RRC_PAGING_DRX_CYCLE", EventSummary::hex),
    event(2127, "WCDMA_CM_INCOMING_MSG", EventSummary::hex),
    event(2128, "WCDMA_CM_OUTGOING_MSG", EventSummary::hex),
    event(2129, "WCDMA_EMM_INCOMING_MSG", EventSummary::hex),
    event(2130, "WCDMA_EMM_OUTGOING_MSG", EventSummary::hex),
    event(2133, "WCDMA_REG_INCOMING_MSG", EventSummary::hex),
    event(2134, "WCDMA_REG_OUTGOING_MSG", EventSummary::hex),
    event(2135, "WCDMA_ESM_INCOMING_MSG", EventSummary::hex),
    event(2136, "WCDMA_ESM_OUTGOING_MSG", EventSummary::hex),
    event(1200, "GSM_RACH_ATTEMPT", EventSummary::hex),
    event(1201, "GSM_RACH_SUCCESS", EventSummary::hex),
    event(1202, "GSM_RACH_FAILURE", EventSummary::hex),
    event(1210, "GSM_CELL_SELECTION", EventSummary::hex),
    event(1211, "GSM_CELL_RESELECTION", EventSummary::hex),
    event(3000, "NR_RRC_STATE_CHANGE", EventSummary::hex),
    event(3001, "NR_RRC_DL_MSG", EventSummary::hex),
    event(3002, "NR_RRC_UL_MSG", EventSummary::hex),
    event(3010, "NR_RRC_PAGING_DRX_CYCLE", EventSummary::hex),
    event(3027, "NR_CM_INCOMING_MSG", EventSummary::hex),
    event(3028, "NR_CM_OUTGOING_MSG", EventSummary::hex),
    event(3029, "NR_EMM_INCOMING_MSG", EventSummary::hex),
    event(3030, "NR_EMM_OUTGOING_MSG", EventSummary::hex),
    event(3033, "NR_REG_INCOMING_MSG", EventSummary::hex),
    event(3034, "NR_REG_OUTGOING_MSG", EventSummary::hex),
    event(3035, "NR_ESM_INCOMING_MSG", EventSummary::hex),
    event(3036, "NR_ESM_OUTGOING_MSG", EventSummary::hex),
];

const RRC_STATES: EnumTable = EnumTable(&[
    (1, "RRC_IDLE_NOT_CAMPED"),
    (2, "RRC_IDLE_CAMPED"),
    (3, "RRC_CONNECTING"),
    (4, "RRC_CONNECTED"),
    (7, "RRC_CLOSING"),
]);

const DL_CHANNELS: EnumTable = EnumTable(&[(1, "BCCH"), (2, "PCCH"), (3, "CCCH"), (4, "DCCH")]);

const DL_MESSAGES: EnumTable = EnumTable(&[
    (0x00, "MasterInformationBlock"),
    (0x01, "SystemInformationBlockType1"),
    (0x02, "SystemInformationBlockType2"),
    (0x03, "SystemInformationBlockType3"),
    (0x04, "SystemInformationBlockType4"),
    (0x05, "SystemInformationBlockType5"),
    (0x06, "SystemInformationBlockType6"),
    (0x07, "SystemInformationBlockType7"),
    (0x40, "Paging"),
    (0x4b, "RRCConnectionSetup"),
    (0x81, "DLInformationTransfer"),
    (0x85, "RRCConnectionRelease"),
]);

const UL_CHANNELS: EnumTable = EnumTable(&[(5, "CCCH"), (6, "DCCH")]);

const UL_MESSAGES: EnumTable = EnumTable(&[
    (0x01, "RRCConnectionRequest"),
    (0x84, "RRCConnectionSetupComplete"),
    (0x89, "ULInformationTransfer"),
]);

fn rrc_state_change(payload: &[u8]) -> EventSummary {
    let Some(state) = payload.read_u8(0) else {
        return EventSummary::hex(payload);
    };
    let state = match RRC_STATES.get(state as u32) {
        Some(label) => label.to_string(),
        None => format!("{state:02x}"),
    };
    EventSummary::semantic(payload, format!("rrc_state={state}"))
}

fn rrc_msg(payload: &[u8], channels: &EnumTable, messages: &EnumTable) -> EventSummary {
    let (Some(channel), Some(message)) = (payload.read_u8(0), payload.read_u8(1)) else {
        return EventSummary::hex(payload);
    };
    let channel = channels.get(channel as u32).unwrap_or("Unknown");
    let message = match messages.get(message as u32) {
        Some(label) => label.to_string(),
        None => format!("Unknown ({message:2x})"),
    };
    EventSummary::semantic(payload, format!("channel={channel}, message_type={message}"))
}

fn rrc_dl_msg(payload: &[u8]) -> EventSummary {
    rrc_msg(payload, &DL_CHANNELS, &DL_MESSAGES)
}

fn rrc_ul_msg(payload: &[u8]) -> EventSummary {
    rrc_msg(payload, &UL_CHANNELS, &UL_MESSAGES)
}

fn byte_pair(payload: &[u8]) -> EventSummary {
    match (payload.read_u8(0), payload.read_u8(1)) {
        (Some(a), Some(b)) => EventSummary::semantic(payload, format!("{a:02x} {b:02x}")),
        _ => EventSummary::hex(payload),
    }
}

fn single_byte(payload: &[u8]) -> EventSummary {
    match payload.read_u8(0) {
        Some(value) => EventSummary::semantic(payload, format!("{value:02x}")),
        None => EventSummary::hex(payload),
    }
}

/// NAS message identifier as a little-endian word.
fn nas_msg(payload: &[u8]) -> EventSummary {
    match payload.read_u32(0) {
        Some(message_id) => EventSummary::semantic(payload, format!("0x{message_id:04x}")),
        None => EventSummary::hex(payload),
    }
}
