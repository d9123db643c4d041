//! Events every modem emits regardless of the active RAT. Most are only
//! named here and rendered as hex; the LTE table overrides the ones it
//! knows better.

use crate::catalog::Specificity;
use crate::catalog::fields::c_string;
use crate::event::{EventCategory, EventEntry, EventSummary, event};
use crate::record::hex_string;

pub const CATEGORY: EventCategory = EventCategory {
    name: "common",
    specificity: Specificity::Generic,
    entries: ENTRIES,
};

const ENTRIES: &[EventEntry] = &[
    event(1682, "IPV6_SM_EVENT", EventSummary::hex),
    event(1684, "IPV6_PREFIX_UPDATE", EventSummary::hex),
    event(2865, "DIAG_QSHRINK_ID", qshrink_id),
    event(2866, "DIAG_PROCESS_NAME", process_name),
    event(1605, "LTE_RRC_TIMER_STATUS", EventSummary::hex),
    event(1606, "LTE_RRC_STATE_CHANGE", EventSummary::hex),
    event(1609, "LTE_RRC_DL_MSG", EventSummary::hex),
    event(1610, "LTE_RRC_UL_MSG", EventSummary::hex),
    event(1614, "LTE_RRC_PAGING_DRX_CYCLE", EventSummary::hex),
    event(2100, "WCDMA_RRC_STATE_CHANGE", EventSummary::hex),
    event(2101, "WCDMA_RRC_DL_MSG", EventSummary::hex),
    event(2102, "WCDMA_RRC_UL_MSG", EventSummary::hex),
    event(2103, "WCDMA_RRC_PAGING_DRX_CYCLE", EventSummary::hex),
    event(1200, "GSM_RACH_ATTEMPT", EventSummary::hex),
    event(1201, "GSM_RACH_SUCCESS", EventSummary::hex),
    event(1202, "GSM_RACH_FAILURE", EventSummary::hex),
    event(1210, "GSM_CELL_SELECTION", EventSummary::hex),
    event(1211, "GSM_CELL_RESELECTION", EventSummary::hex),
    event(3000, "NR_RRC_STATE_CHANGE", EventSummary::hex),
    event(3001, "NR_RRC_DL_MSG", EventSummary::hex),
    event(3002, "NR_RRC_UL_MSG", EventSummary::hex),
    event(3010, "NR_RRC_PAGING_DRX_CYCLE", EventSummary::hex),
];

const GUID_LEN: usize = 16;
const GUID_BLOCKS: [usize; 5] = [4, 2, 2, 2, 6];

/// Byte blocks of the image GUID, each printed as a big-endian decimal.
fn guid(bytes: &[u8]) -> Option<String> {
    if bytes.len() != GUID_LEN {
        return None;
    }
    let mut pos = 0;
    let blocks: Vec<String> = GUID_BLOCKS
        .iter()
        .map(|&len| {
            let value = bytes[pos..pos + len]
                .iter()
                .fold(0u64, |acc, &b| acc << 8 | b as u64);
            pos += len;
            value.to_string()
        })
        .collect();
    Some(blocks.join("-"))
}

fn id_and_rest(payload: &[u8]) -> Option<(u8, &[u8])> {
    let (&id, rest) = payload.split_first()?;
    Some((id, rest))
}

fn prefixed_hex(diag_id: u8, rest: &[u8]) -> String {
    if rest.is_empty() {
        format!("0x{diag_id:02X}")
    } else {
        format!("0x{diag_id:02X} {}", hex_string(rest, " "))
    }
}

/// One byte diag id followed by a 16 byte GUID.
fn qshrink_id(payload: &[u8]) -> EventSummary {
    let Some((diag_id, rest)) = id_and_rest(payload) else {
        return EventSummary::hex(payload);
    };
    let payload_str = match guid(rest) {
        Some(guid) => format!("Diag Id = {diag_id}, GUID = {guid}"),
        None => String::new(),
    };
    EventSummary {
        payload: prefixed_hex(diag_id, rest),
        content: payload_str.clone(),
        payload_str,
    }
}

/// One byte diag id followed by the process name.
fn process_name(payload: &[u8]) -> EventSummary {
    let Some((diag_id, rest)) = id_and_rest(payload) else {
        return EventSummary::hex(payload);
    };
    let name = c_string(rest);
    EventSummary {
        payload: prefixed_hex(diag_id, rest),
        content: name.clone(),
        payload_str: name,
    }
}
