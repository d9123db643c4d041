//! RF front-end logs: antenna switch diversity, antenna tuner state and the
//! per-technology TX/RX power reports.

use crate::catalog::fields::{EnumTable, FieldReader, power_dbm};
use crate::catalog::report::Report;
use crate::catalog::{Category, DecodeContext, Specificity, entry};
use crate::diag::LogPacket;
use crate::record::{DecodedRecord, RecordKind};

pub const CATEGORY: Category = Category {
    name: "rf",
    specificity: Specificity::Topic,
    entries: &[
        entry(0x1841, "RF ASDIV", 4, rf_asdiv),
        entry(0x19ED, "Atuner Detune Info", 8, atuner_detune_info),
        entry(0x1849, "RF Device Status", 1, rf_device_status),
        entry(0x18F7, "RF Calibration Data", 1, rf_calibration_data),
        entry(0x4179, "RF LTE TX Report", 1, rf_lte_tx_report),
        entry(0x41D4, "RF LTE RX Report", 1, rf_lte_rx_report),
        entry(0x4186, "RF GSM TX Report", 1, version_only),
        entry(0x4178, "RF Power Report", 1, version_only),
        entry(0x4146, "RF Antenna Report", 1, version_only),
    ],
};

const MAX_ANTENNAS: usize = 16;
const ANTENNA_ENTRY_LEN: usize = 20;
const ANTENNA_TABLE_START: usize = 8;
const EXTRA_SYSTEM_BANDS: usize = 5;

const TUNER_STATES: EnumTable = EnumTable(&[(0, "OFF_STATE"), (1, "ON_STATE"), (2, "IDLE_STATE")]);

const RFM_MODES: EnumTable = EnumTable(&[
    (0, "LTE"),
    (1, "WCDMA"),
    (2, "GSM"),
    (3, "CDMA"),
    (4, "TDSCDMA"),
    (5, "GPS"),
    (6, "WIFI"),
    (7, "BT"),
    (20, "20"),
    (97, "97"),
]);

const DEVICE_TYPES: EnumTable = EnumTable(&[(0, "PRX"), (1, "DRX"), (2, "TX")]);

const ANTENNA_RULE: &str =
    "------------------------------------------------------------------------------------------------";
const SYSTEM_RULE: &str =
    "-------------------------------------------------------------------------";

fn start<'a>(packet: &LogPacket, ctx: &'a DecodeContext, title: &str) -> Report<'a> {
    let mut out = Report::new(ctx, packet, RecordKind::Measurement, title);
    out.field("Version", packet.body.read_u8(0).unwrap_or_default());
    out
}

fn rf_asdiv(packet: &LogPacket, ctx: &DecodeContext) -> DecodedRecord {
    let body = packet.body.as_slice();
    if body.len() < 4 {
        return DecodedRecord::Insufficient;
    }
    let mut out = start(packet, ctx, "RF ASDIV");
    if body.len() >= 8 {
        out.field("ASDIV State", body[1]);
        out.field("Antenna Selection", body[2]);
        out.field("Switch Count", body[3]);
    }
    if body.len() >= 12 {
        for (antenna, offset) in [(0, 4), (1, 6)] {
            let rssi = power_dbm(body.read_i16(offset).unwrap_or_default());
            out.field_as(
                &format!("RSSI Antenna {antenna}"),
                format!("{rssi:.2} dBm"),
                rssi,
            );
        }
    }
    out.finish()
}

fn rfm_mode_label(mode: u8) -> String {
    match RFM_MODES.get(mode as u32) {
        Some(label) => label.to_string(),
        None => format!("{mode:8}"),
    }
}

fn atuner_detune_info(packet: &LogPacket, ctx: &DecodeContext) -> DecodedRecord {
    let body = packet.body.as_slice();
    if body.len() < 8 {
        return DecodedRecord::Insufficient;
    }
    let num_antennas = body[1];
    let tuner_state = body[2];

    let mut out = start(packet, ctx, "Atuner Detune Info").with_thread(0xFE);
    out.field("Num Antennas", num_antennas);
    match TUNER_STATES.get(tuner_state as u32) {
        Some(label) => out.text("Tuner System State", label),
        None => out.text("Tuner System State", format!("UNKNOWN_STATE_{tuner_state}")),
    }

    out.open("Antenna Data", "   ");
    out.line(ANTENNA_RULE);
    out.line("|   |       |        |        |Carrier Info                                                    |");
    out.line("|   |Antenna|        |Num     |   |               |        |Device  |               |Channel   |");
    out.line("|#  |Number |RFM Mode|Carriers|#  |Carrier Id     |Band    |Type    |RFM Device     |Number    |");
    out.line(ANTENNA_RULE);

    let mut pos = ANTENNA_TABLE_START;
    for i in 0..(num_antennas as usize).min(MAX_ANTENNAS) {
        let Some(antenna) = body.read_bytes(pos, ANTENNA_ENTRY_LEN) else {
            break;
        };
        let antenna_num = antenna[0];
        let rfm_mode = rfm_mode_label(antenna[1]);
        let num_carriers = antenna[2];
        let antenna_label = if antenna_num == 0xFF {
            "INVALID".to_string()
        } else {
            format!("{antenna_num:7}")
        };

        out.group(&format!("Antenna[{i}]"));
        out.value("Antenna Number", antenna_num);
        out.value("RFM Mode", rfm_mode.trim().to_string());
        out.value("Num Carriers", num_carriers);
        if num_carriers > 0 {
            let carrier_id = format!("CARRIER_ID_{}", antenna[4]);
            let band = antenna[5];
            let device_type = match DEVICE_TYPES.get(antenna[6] as u32) {
                Some(label) => label.to_string(),
                None => format!("TYPE_{}", antenna[6]),
            };
            let rfm_device = format!("DEVICE_{}", antenna[7]);
            let channel = antenna.read_u32(8).unwrap_or_default();
            out.line(format!(
                "|{i:3}|{antenna_label}|{rfm_mode:8}|{num_carriers:8}|{:3}|{carrier_id:15}|{band:8}|{device_type:8}|{rfm_device:15}|{channel:10}|",
                0
            ));
            out.value("Carrier Id", carrier_id);
            out.value("Band", band);
            out.value("Device Type", device_type);
            out.value("RFM Device", rfm_device);
            out.value("Channel Number", channel);
        } else {
            out.line(format!(
                "|{i:3}|{antenna_label}|{rfm_mode:8}|{num_carriers:8}|   |               |        |        |               |          |"
            ));
        }
        out.close();
        pos += ANTENNA_ENTRY_LEN;
    }
    out.close();

    out.line("");
    out.open("System Data", "   ");
    out.line(SYSTEM_RULE);
    out.line("|   |            |Num     |PCC Band    |        |           |           |");
    out.line("|#  |RFM Mode    |Carriers|Index       |Band    |RX Channels|TX Channels|");
    out.line(SYSTEM_RULE);
    if pos + 32 < body.len() {
        let rfm_mode = body[pos];
        let num_carriers = body[pos + 1];
        let pcc_band_index = body[pos + 2];
        let band = body[pos + 3];
        let rx_channels = body.read_u32(pos + 4).unwrap_or_default();
        let tx_channels = body.read_u32(pos + 8).unwrap_or_default();
        out.line(format!(
            "|{:3}|{rfm_mode:12}|{num_carriers:8}|{pcc_band_index:12}|{band:8}|{rx_channels:11}|{tx_channels:11}|",
            0
        ));
        out.group("System");
        out.value("RFM Mode", rfm_mode);
        out.value("Num Carriers", num_carriers);
        out.value("PCC Band Index", pcc_band_index);
        out.value("Band", band);
        out.value("RX Channels", rx_channels);
        out.value("TX Channels", tx_channels);
        for j in 1..=EXTRA_SYSTEM_BANDS {
            let extra = body.read_u32(pos + 12 + j * 4).unwrap_or_default();
            if extra != 0 {
                out.line(format!(
                    "|   |            |        |            |{extra:8}|{:11}|{:11}|",
                    0, 0
                ));
                out.value(&format!("Extra Band[{j}]"), extra);
            }
        }
        out.close();
    }
    out.finish()
}

fn rf_device_status(packet: &LogPacket, ctx: &DecodeContext) -> DecodedRecord {
    let body = packet.body.as_slice();
    if body.is_empty() {
        return DecodedRecord::Insufficient;
    }
    let mut out = start(packet, ctx, "RF Device Status");
    if body.len() >= 8 {
        out.field("Device ID", body[1]);
        out.field("Status", body[2]);
    }
    out.finish()
}

fn rf_calibration_data(packet: &LogPacket, ctx: &DecodeContext) -> DecodedRecord {
    let body = packet.body.as_slice();
    if body.is_empty() {
        return DecodedRecord::Insufficient;
    }
    let mut out = start(packet, ctx, "RF Calibration Data");
    if body.len() >= 8 {
        out.field("Calibration Type", body[1]);
        out.field("Band", body[2]);
    }
    out.finish()
}

/// TX and RX reports share one layout: power at 4..6, a state byte at 6.
fn power_and_state(
    packet: &LogPacket,
    ctx: &DecodeContext,
    title: &str,
    power_label: &str,
    state_label: &str,
) -> DecodedRecord {
    let body = packet.body.as_slice();
    if body.is_empty() {
        return DecodedRecord::Insufficient;
    }
    let mut out = start(packet, ctx, title);
    if body.len() >= 12 {
        let power = power_dbm(body.read_i16(4).unwrap_or_default());
        out.field_as(power_label, format!("{power:.2} dBm"), power);
        out.field(state_label, body[6]);
    }
    out.finish()
}

fn rf_lte_tx_report(packet: &LogPacket, ctx: &DecodeContext) -> DecodedRecord {
    power_and_state(packet, ctx, "RF LTE TX Report", "TX Power", "PA State")
}

fn rf_lte_rx_report(packet: &LogPacket, ctx: &DecodeContext) -> DecodedRecord {
    power_and_state(packet, ctx, "RF LTE RX Report", "RX Power", "LNA State")
}

fn version_only(packet: &LogPacket, ctx: &DecodeContext) -> DecodedRecord {
    if packet.body.is_empty() {
        return DecodedRecord::Insufficient;
    }
    let title = CATEGORY
        .entries
        .iter()
        .find(|e| e.message_type == packet.message_type)
        .map_or("RF Report", |e| e.display_name);
    start(packet, ctx, title).finish()
}
