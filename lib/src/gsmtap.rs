//! GSMTAP framing for network replay of decoded output. The GSMTAP header is
//! described here: <https://github.com/osmocom/libosmocore/blob/master/include/osmocom/core/gsmtap.h>
//! and the osmocore log header that follows it in `logging_gsmtap.c`.

use chrono::{DateTime, FixedOffset};
use deku::prelude::*;

pub const GSMTAP_VERSION: u8 = 2;
pub const GSMTAP_TYPE_OSMOCORE_LOG: u8 = 0x10;

#[derive(Debug, Clone, PartialEq, DekuWrite)]
#[deku(endian = "big")]
pub struct GsmtapHeader {
    #[deku(assert_eq = "2")]
    pub version: u8,
    #[deku(assert_eq = "4")]
    pub header_len: u8, // length in 4-byte words
    pub packet_type: u8,
    pub timeslot: u8,
    #[deku(bits = 1)]
    pub pcs_band_indicator: bool,
    #[deku(bits = 1)]
    pub uplink: bool,
    #[deku(bits = 14)]
    pub arfcn: u16,
    pub signal_dbm: i8,
    pub signal_noise_ratio_db: u8,
    pub frame_number: u32,
    pub subtype: u8,
    pub antenna_number: u8,
    pub subslot: u8,
    #[deku(assert_eq = "0")]
    pub reserved: u8,
}

impl GsmtapHeader {
    pub fn new(packet_type: u8) -> Self {
        GsmtapHeader {
            version: GSMTAP_VERSION,
            header_len: 4,
            packet_type,
            timeslot: 0,
            pcs_band_indicator: false,
            uplink: false,
            arfcn: 0,
            signal_dbm: 0,
            signal_noise_ratio_db: 0,
            frame_number: 0,
            subtype: 0,
            antenna_number: 0,
            subslot: 0,
            reserved: 0,
        }
    }
}

/// libosmocore's `struct gsmtap_osmocore_log_hdr`, names NUL padded to 16 bytes.
#[derive(Debug, Clone, PartialEq, DekuWrite)]
#[deku(endian = "big")]
pub struct OsmocoreLogHeader {
    pub ts_sec: u32,
    pub ts_usec: u32,
    pub process_name: [u8; 16],
    pub pid: u32,
    pub level: u8,
    pub padding: [u8; 3],
    pub subsys: [u8; 16],
    pub filename: [u8; 16],
    pub line_number: u32,
}

fn padded_name(name: &str) -> [u8; 16] {
    let mut out = [0u8; 16];
    for (dst, src) in out.iter_mut().zip(name.bytes()) {
        *dst = src;
    }
    out
}

impl OsmocoreLogHeader {
    pub fn new(timestamp: DateTime<FixedOffset>, process_name: &str, pid: u32) -> Self {
        OsmocoreLogHeader {
            ts_sec: timestamp.timestamp().clamp(0, u32::MAX as i64) as u32,
            ts_usec: timestamp.timestamp_subsec_micros(),
            process_name: padded_name(process_name),
            pid,
            level: 0,
            padding: [0; 3],
            subsys: [0; 16],
            filename: [0; 16],
            line_number: 0,
        }
    }
}

/// GSMTAP header, osmocore log header, then `content` verbatim.
pub fn osmocore_log_frame(
    timestamp: DateTime<FixedOffset>,
    process_name: &str,
    pid: u32,
    content: &[u8],
) -> Result<Vec<u8>, DekuError> {
    let mut frame = GsmtapHeader::new(GSMTAP_TYPE_OSMOCORE_LOG).to_bytes()?;
    frame.extend(OsmocoreLogHeader::new(timestamp, process_name, pid).to_bytes()?);
    frame.extend_from_slice(content);
    Ok(frame)
}
