//! System and RF status reports that QCAT shows with a fixed set of fields.

use crate::catalog::fields::{EnumTable, FieldReader, power_dbm, temperature_c};
use crate::catalog::report::Report;
use crate::catalog::{Category, DecodeContext, Specificity, entry};
use crate::diag::LogPacket;
use crate::record::{DecodedRecord, RecordKind};

pub const CATEGORY: Category = Category {
    name: "comprehensive",
    specificity: Specificity::Generic,
    entries: &[
        entry(0x0000, "System Status", 1, system_status),
        entry(0x18C4, "RF Advanced Status", 1, rf_advanced_status),
        entry(0x18C3, "RF Configuration Report", 1, rf_configuration_report),
        entry(0x1C72, "System Configuration", 1, system_configuration),
        entry(0x1C70, "System Status Extended", 1, system_status_extended),
        entry(0x1C6E, "System Performance", 1, system_performance),
        entry(0x1375, "Power Management Report", 1, power_management_report),
        entry(0x41D6, "RF Advanced RX Report", 1, rf_advanced_rx_report),
        entry(0x41CD, "RF Calibration Status", 1, rf_calibration_status),
        entry(0x4189, "RF Power Management", 1, version_only),
        entry(0x4191, "RF System Report", 1, version_only),
        entry(0x4188, "RF Configuration Status", 1, version_only),
    ],
};

const MAX_BANDS: usize = 8;
const MAX_SUBSYSTEMS: usize = 8;

const CONFIG_TYPES: EnumTable = EnumTable(&[
    (0, "POWER_CONFIG"),
    (1, "RF_CONFIG"),
    (2, "PROTOCOL_CONFIG"),
    (3, "ANTENNA_CONFIG"),
    (4, "CALIBRATION_CONFIG"),
]);

const SYSTEM_STATES: EnumTable =
    EnumTable(&[(0, "IDLE"), (1, "ACTIVE"), (2, "SLEEP"), (3, "SHUTDOWN")]);

const SUBSYSTEMS: EnumTable =
    EnumTable(&[(0, "MODEM"), (1, "RF"), (2, "GPS"), (3, "WLAN"), (4, "BT")]);

const SUBSYSTEM_STATUS: EnumTable =
    EnumTable(&[(0, "OFF"), (1, "ON"), (2, "STANDBY"), (3, "ERROR")]);

const POWER_STATES: EnumTable = EnumTable(&[
    (0, "SLEEP"),
    (1, "IDLE"),
    (2, "ACTIVE"),
    (3, "HIGH_PERFORMANCE"),
]);

const CAL_TYPES: EnumTable = EnumTable(&[
    (0, "TX_POWER_CAL"),
    (1, "RX_GAIN_CAL"),
    (2, "FREQUENCY_CAL"),
    (3, "IQ_CAL"),
]);

const CAL_STATUS: EnumTable = EnumTable(&[
    (0, "PENDING"),
    (1, "IN_PROGRESS"),
    (2, "COMPLETED"),
    (3, "FAILED"),
]);

/// Opens a report with the common `Version` line, or `None` for an empty body.
fn start<'a>(packet: &LogPacket, ctx: &'a DecodeContext, title: &str) -> Option<Report<'a>> {
    let version = packet.body.read_u8(0)?;
    let mut out = Report::new(ctx, packet, RecordKind::Measurement, title);
    out.field("Version", version);
    Some(out)
}

fn system_status(packet: &LogPacket, ctx: &DecodeContext) -> DecodedRecord {
    let Some(mut out) = start(packet, ctx, "System Status") else {
        return DecodedRecord::Insufficient;
    };
    if let Some(flags) = packet.body.read_u32(4) {
        out.field_as("Status Flags", format!("0x{flags:08X}"), flags);
        if flags & 0x01 != 0 {
            out.text("System State", "ACTIVE");
        }
        if flags & 0x02 != 0 {
            out.text("Power State", "ON");
        }
        if flags & 0x04 != 0 {
            out.text("RF State", "ENABLED");
        }
    }
    out.finish()
}

fn rf_advanced_status(packet: &LogPacket, ctx: &DecodeContext) -> DecodedRecord {
    let Some(mut out) = start(packet, ctx, "RF Advanced Status") else {
        return DecodedRecord::Insufficient;
    };
    let body = packet.body.as_slice();
    if body.len() >= 16 {
        let band = body.read_u8(1).unwrap_or_default();
        let channel = body.read_u16(2).unwrap_or_default();
        let power = power_dbm(body.read_i16(4).unwrap_or_default());
        let frequency = body.read_u32(8).unwrap_or_default();
        out.field("RF Band", band);
        out.field("Channel", channel);
        out.field_as("Power Level", format!("{power:.2} dBm"), power);
        out.field_as("Frequency", format!("{frequency} Hz"), frequency);
        if body.len() >= 20 {
            let temperature = temperature_c(body.read_i16(12).unwrap_or_default());
            let voltage = body.read_u16(14).unwrap_or_default();
            out.field_as("Temperature", format!("{temperature:.1} C"), temperature);
            out.field_as("Voltage", format!("{voltage} mV"), voltage);
        }
    }
    out.finish()
}

fn rf_configuration_report(packet: &LogPacket, ctx: &DecodeContext) -> DecodedRecord {
    let Some(mut out) = start(packet, ctx, "RF Configuration Report") else {
        return DecodedRecord::Insufficient;
    };
    let body = packet.body.as_slice();
    if body.len() >= 12 {
        let num_bands = body.read_u8(2).unwrap_or_default();
        out.field("Configuration ID", body.read_u8(1).unwrap_or_default());
        out.field("Number of Bands", num_bands);
        for i in 0..(num_bands as usize).min(MAX_BANDS) {
            let pos = 8 + i * 8;
            let (Some(band_id), Some(config)) = (body.read_u8(pos), body.read_u32(pos + 4)) else {
                break;
            };
            let label = format!("Band[{i}]");
            out.line(format!("{label} = {band_id}, Config = 0x{config:08X}"));
            out.group(&label);
            out.value("Band", band_id);
            out.value("Config", config);
            out.close();
        }
    }
    out.finish()
}

fn system_configuration(packet: &LogPacket, ctx: &DecodeContext) -> DecodedRecord {
    let Some(mut out) = start(packet, ctx, "System Configuration") else {
        return DecodedRecord::Insufficient;
    };
    let body = packet.body.as_slice();
    if body.len() >= 16 {
        let config_type = body.read_u8(1).unwrap_or_default();
        let value = body.read_u32(4).unwrap_or_default();
        out.text("Configuration Type", CONFIG_TYPES.label(config_type));
        out.field_as("Configuration Value", format!("0x{value:08X}"), value);
        out.field("Timestamp", body.read_u32(8).unwrap_or_default());
    }
    out.finish()
}

fn system_status_extended(packet: &LogPacket, ctx: &DecodeContext) -> DecodedRecord {
    let Some(mut out) = start(packet, ctx, "System Status Extended") else {
        return DecodedRecord::Insufficient;
    };
    let body = packet.body.as_slice();
    if body.len() >= 20 {
        let count = body.read_u8(2).unwrap_or_default();
        out.text("System State", SYSTEM_STATES.label(body.read_u8(1).unwrap_or_default()));
        out.field("Subsystem Count", count);
        for i in 0..(count as usize).min(MAX_SUBSYSTEMS) {
            let pos = 8 + i * 4;
            if body.read_bytes(pos, 4).is_none() {
                break;
            }
            let name = SUBSYSTEMS.label(body.read_u8(pos).unwrap_or_default());
            let status = SUBSYSTEM_STATUS.label(body.read_u8(pos + 1).unwrap_or_default());
            let label = format!("Subsystem[{i}]");
            out.line(format!("{label} = {name}, Status = {status}"));
            out.group(&label);
            out.value("Name", name.into_owned());
            out.value("Status", status.into_owned());
            out.close();
        }
    }
    out.finish()
}

fn system_performance(packet: &LogPacket, ctx: &DecodeContext) -> DecodedRecord {
    let Some(mut out) = start(packet, ctx, "System Performance") else {
        return DecodedRecord::Insufficient;
    };
    let body = packet.body.as_slice();
    if body.len() >= 24 {
        let cpu = body.read_u8(1).unwrap_or_default();
        let memory = body.read_u16(2).unwrap_or_default();
        let throughput = body.read_u32(4).unwrap_or_default();
        let latency = body.read_u16(8).unwrap_or_default();
        out.field_as("CPU Usage", format!("{cpu}%"), cpu);
        out.field_as("Memory Usage", format!("{memory} KB"), memory);
        out.field_as("Throughput", format!("{throughput} bps"), throughput);
        out.field_as("Latency", format!("{latency} ms"), latency);
    }
    out.finish()
}

fn power_management_report(packet: &LogPacket, ctx: &DecodeContext) -> DecodedRecord {
    let Some(mut out) = start(packet, ctx, "Power Management Report") else {
        return DecodedRecord::Insufficient;
    };
    let body = packet.body.as_slice();
    if body.len() >= 16 {
        let voltage = body.read_u16(2).unwrap_or_default();
        let current = body.read_u16(4).unwrap_or_default();
        let temperature = temperature_c(body.read_i16(6).unwrap_or_default());
        out.text("Power State", POWER_STATES.label(body.read_u8(1).unwrap_or_default()));
        out.field_as("Voltage", format!("{voltage} mV"), voltage);
        out.field_as("Current", format!("{current} mA"), current);
        out.field_as("Temperature", format!("{temperature:.1} C"), temperature);
        if body.len() >= 24 {
            let rf = body.read_u16(8).unwrap_or_default();
            let baseband = body.read_u16(10).unwrap_or_default();
            out.field_as("RF Power Consumption", format!("{rf} mW"), rf);
            out.field_as("Baseband Power Consumption", format!("{baseband} mW"), baseband);
        }
    }
    out.finish()
}

fn rf_advanced_rx_report(packet: &LogPacket, ctx: &DecodeContext) -> DecodedRecord {
    let Some(mut out) = start(packet, ctx, "RF Advanced RX Report") else {
        return DecodedRecord::Insufficient;
    };
    let body = packet.body.as_slice();
    if body.len() >= 20 {
        let rx_power = power_dbm(body.read_i16(2).unwrap_or_default());
        let lna = body.read_u8(4).unwrap_or_default();
        let mixer = body.read_u8(5).unwrap_or_default();
        out.field("RX Chain", body.read_u8(1).unwrap_or_default());
        out.field_as("RX Power", format!("{rx_power:.2} dBm"), rx_power);
        out.field_as("LNA Gain", format!("{lna} dB"), lna);
        out.field_as("Mixer Gain", format!("{mixer} dB"), mixer);
        if body.len() >= 32 {
            let snr = body.read_i16(8).unwrap_or_default() as f64 / 10.0;
            let rssi = power_dbm(body.read_i16(10).unwrap_or_default());
            out.field_as("SNR", format!("{snr:.1} dB"), snr);
            out.field_as("RSSI", format!("{rssi:.2} dBm"), rssi);
        }
    }
    out.finish()
}

fn rf_calibration_status(packet: &LogPacket, ctx: &DecodeContext) -> DecodedRecord {
    let Some(mut out) = start(packet, ctx, "RF Calibration Status") else {
        return DecodedRecord::Insufficient;
    };
    let body = packet.body.as_slice();
    if body.len() >= 16 {
        out.text("Calibration Type", CAL_TYPES.label(body.read_u8(1).unwrap_or_default()));
        out.text("Calibration Status", CAL_STATUS.label(body.read_u8(2).unwrap_or_default()));
        out.field("Calibration Result", body.read_i16(4).unwrap_or_default());
    }
    out.finish()
}

fn version_only(packet: &LogPacket, ctx: &DecodeContext) -> DecodedRecord {
    let title = match packet.message_type {
        0x4189 => "RF Power Management",
        0x4191 => "RF System Report",
        _ => "RF Configuration Status",
    };
    match start(packet, ctx, title) {
        Some(out) => out.finish(),
        None => DecodedRecord::Insufficient,
    }
}
