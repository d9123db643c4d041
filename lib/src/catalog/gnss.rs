//! GNSS engine logs: NMEA passthrough, the position fix report and the XO
//! frequency estimate.

use crate::catalog::fields::{EnumTable, FieldReader, float_repr, radians_to_degrees};
use crate::catalog::report::Report;
use crate::catalog::{Category, DecodeContext, Specificity, entry};
use crate::diag::LogPacket;
use crate::record::{DecodedRecord, RecordKind, hex_string};

pub const CATEGORY: Category = Category {
    name: "gnss",
    specificity: Specificity::Topic,
    entries: &[
        entry(0x1384, "CGPS PDSM External Status NMEA Report", 8, nmea_report),
        entry(0x1476, "GNSS Position Report", 20, position_report),
        entry(0x13D1, "XO Frequency Estimation", 4, xo_frequency_estimation),
    ],
};

const POSITION_SOURCES: EnumTable =
    EnumTable(&[(0, "Internal Database"), (1, "Network"), (2, "Sensor")]);

fn nmea_report(packet: &LogPacket, ctx: &DecodeContext) -> DecodedRecord {
    let body = packet.body.as_slice();
    if body.len() < 8 {
        return DecodedRecord::Insufficient;
    }
    let mut out = Report::new(
        ctx,
        packet,
        RecordKind::Measurement,
        "CGPS PDSM External Status NMEA Report",
    )
    .with_thread(0xD5);
    out.field("Version", body[0]);
    if let Some(client_id) = body.read_u32(1) {
        out.field("Client ID", client_id);
    }
    if let Some(sentence_type) = body.read_u32(5) {
        out.field("NMEA Sentence Type", sentence_type);
    }
    if let Some(sentence_len) = body.read_u8(9) {
        out.field("NMEA Sentence Length", sentence_len);
        let end = (10 + sentence_len as usize).min(body.len());
        if sentence_len > 0 && end > 10 {
            let ascii: String = body[10..end]
                .iter()
                .filter(|b| b.is_ascii())
                .map(|&b| b as char)
                .collect();
            out.text("NMEA Sentence Data", ascii.trim());
        }
    }
    out.finish()
}

fn position_report(packet: &LogPacket, ctx: &DecodeContext) -> DecodedRecord {
    let body = packet.body.as_slice();
    if body.len() < 20 {
        return DecodedRecord::Insufficient;
    }
    let len = body.len();
    let f64_at = |offset| body.read_f64(offset).unwrap_or_default();
    let f32_at = |offset| body.read_f32(offset).unwrap_or_default() as f64;

    let mut out = Report::new(ctx, packet, RecordKind::Measurement, "GNSS Position Report")
        .with_thread(0x61);
    out.field("Version", body[0]);
    out.field("F Count", body[1]);
    out.text("Position Source", POSITION_SOURCES.spaced_label(body[2]));

    let flag = body.read_u32(4).unwrap_or_default();
    out.open_braced("PosVelFlag_IntDB");
    out.field("Pos Vel Flag", flag & 0xFFFF);
    out.field_as("Raw Value", format!("0x{flag:04X}"), flag);
    out.close();

    let flag2 = body.read_u64(8).unwrap_or_default();
    out.open_braced("PosVelFlag2_IntDB");
    out.field_as("Pos Vel Flag", format!("0x{:X}", flag2 & 0xFFFF_FFFF), flag2 & 0xFFFF_FFFF);
    out.field_as("Raw Value", format!("0x{flag2:016X}"), flag2);
    out.close();

    if let Some(flag3) = body.read_u64(16) {
        out.open_braced("PosVelFlag3_IntDB");
        out.field("Pos Vel Flag", flag3 & 0xFFFF_FFFF);
        out.field_as("Raw Value", format!("0x{flag3:016X}"), flag3);
        out.close();
    }
    if len >= 26 {
        out.field("u_FixMode", body[24]);
        out.field("Failure Code", body[25]);
    }
    if let Some(fix_events) = body.read_u16(26) {
        out.open_braced("Fix Events");
        out.field("Fix Events", fix_events);
        out.field_as("Raw Value", format!("0x{fix_events:04X}"), fix_events);
        out.close();
    }
    if len >= 34 {
        out.field("GPS Week Number", body.read_u16(28).unwrap_or_default());
        out.field("GPS Milliseconds", body.read_u32(30).unwrap_or_default());
    }
    if len >= 42 {
        out.field(
            "GLONASS Cycle Number 4 Years",
            body.read_u16(34).unwrap_or_default(),
        );
        out.field(
            "GLONASS Number Of Days In 4 Year",
            body.read_u16(36).unwrap_or_default(),
        );
        out.field("GLONASS Milliseconds", body.read_u32(38).unwrap_or_default());
    }
    if let Some(positions) = body.read_u16(42) {
        out.field("Number Of Positions", positions);
    }
    if len >= 60 {
        let lat = f64_at(44);
        let lon = f64_at(52);
        let lat_deg = radians_to_degrees(lat);
        let lon_deg = radians_to_degrees(lon);
        out.field_as("Final Position Latitude", format!("{lat:.10}"), lat);
        out.field_as("Latitude", format!("{lat_deg:.9} degree"), lat_deg);
        out.field_as("Final Position Longitude", format!("{lon:.10}"), lon);
        out.field_as("Longitude", format!("{lon_deg:.8} degree"), lon_deg);
    }
    if len >= 64 {
        let alt = f32_at(60);
        out.field_as("Final Position Altitude", format!("{alt:.3}"), alt);
    }
    if len >= 68 {
        let heading_unc = f32_at(66);
        out.field("Heading", body.read_i16(64).unwrap_or_default());
        out.field_as(
            "Heading Uncertainty In Radians",
            format!("{heading_unc:.4}"),
            heading_unc,
        );
    }
    if len >= 82 {
        for (label, offset) in [
            ("East Velocity", 70),
            ("North Velocity", 74),
            ("Vertical Velocity", 78),
        ] {
            let v = f32_at(offset);
            out.field_as(label, float_repr(v), v);
        }
    }
    if len >= 94 {
        for (label, offset) in [
            ("East Velocity Uncertainty", 82),
            ("North Velocity Uncertainty", 86),
            ("Vertical Velocity Uncertainty", 90),
        ] {
            let v = f32_at(offset);
            out.field_as(label, format!("{v:.4}"), v);
        }
    }
    if len >= 102 {
        let bias = f64_at(94);
        out.field_as("Clock Bias", float_repr(bias), bias);
    }
    if len >= 106 {
        let unc = f32_at(102);
        out.field_as("Clock Bias Uncertainty", format!("{unc:.1}"), unc);
    }
    if len >= 138 {
        out.open_braced("Inter GNSS TB");
        let bias = f64_at(106);
        let unc = f32_at(114);
        let filtered = f64_at(118);
        let filtered_unc = f32_at(126);
        let bds = f64_at(130);
        out.field_as("GPS To GLONASS Time Bias", float_repr(bias), bias);
        out.field_as("GPS To GLONASS Time Bias Uncertainty", format!("{unc:.0}"), unc);
        out.field_as("Filtered GPS To GLONASS Time Bias", float_repr(filtered), filtered);
        out.field_as(
            "Filtered GPS To GLONASS Time Bias Uncertainty",
            format!("{filtered_unc:.0}"),
            filtered_unc,
        );
        out.field_as("GPS To Beidou Time Bias (m)", float_repr(bds), bds);
        if len >= 154 {
            let bds_unc = f32_at(138);
            let filtered_bds = f64_at(142);
            let filtered_bds_unc = f32_at(150);
            out.field_as("GPS To Beidou Time Bias Unc (m)", format!("{bds_unc:.0}"), bds_unc);
            out.field_as(
                "Filtered GPS To Beidou Time Bias (m)",
                float_repr(filtered_bds),
                filtered_bds,
            );
            out.field_as(
                "Filtered GPS To Beidou Time Bias Unc (m)",
                format!("{filtered_bds_unc:.0}"),
                filtered_bds_unc,
            );
        }
        out.close();
    }
    out.finish()
}

fn xo_frequency_estimation(packet: &LogPacket, ctx: &DecodeContext) -> DecodedRecord {
    let body = packet.body.as_slice();
    if body.len() < 4 {
        return DecodedRecord::Insufficient;
    }
    let mut out = Report::new(ctx, packet, RecordKind::Measurement, "XO Frequency Estimation");
    out.field("Version", body[0]);
    if let Some(estimate) = body.read_u32(4) {
        out.field("Frequency Estimate", estimate);
    }
    if let Some(uncertainty) = body.read_u32(8) {
        out.field("Frequency Uncertainty", uncertainty);
    }
    if body.len() > 12 {
        let table = &body[12..];
        out.field_as("Frequency Table Data", hex_string(table, "").to_lowercase(), table.to_vec());
    }
    out.finish()
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
    fn test_nmea_sentence() {
        let sentence = b"$GPGGA,123519\r\n";
        let mut body = vec![1];
        body.extend(7u32.to_le_bytes());
        body.extend(2u32.to_le_bytes());
        body.push(sentence.len() as u8);
        body.extend(sentence);
        let record = decode(nmea_report, 0x1384, body, DecodeMode::Text);
        let lines = record.lines();
        assert!(lines[0].contains("[D5]  0x1384"));
        assert_eq!(
            &lines[1..],
            &[
                "Version = 1",
                "Client ID = 7",
                "NMEA Sentence Type = 2",
                "NMEA Sentence Length = 15",
                "NMEA Sentence Data = $GPGGA,123519",
            ]
        );
    }

    #[test]
    fn test_nmea_partial_header() {
        let record = decode(nmea_report, 0x1384, vec![1; 8], DecodeMode::Text);
        assert_eq!(record.lines().len(), 3);
    }

    fn position_body() -> Vec<u8> {
        let mut body = vec![4, 2, 1, 0];
        body.extend(0x0001_0203u32.to_le_bytes());
        body.extend(0xAABB_CCDD_0000_0010u64.to_le_bytes());
        body.extend(0u64.to_le_bytes());
        body.extend([3, 0]);
        body.extend(0x0101u16.to_le_bytes());
        body.extend(2300u16.to_le_bytes());
        body.extend(100_000u32.to_le_bytes());
        body.extend([0; 8]);
        body.extend(1u16.to_le_bytes());
        body.extend(0.5f64.to_le_bytes());
        body.extend((-1.0f64).to_le_bytes());
        body.extend(12.5f32.to_le_bytes());
        body
    }

    #[test]
    fn test_position_report() {
        let record = decode(position_report, 0x1476, position_body(), DecodeMode::Text);
        let lines = record.lines();
        assert!(lines[0].contains("[61]  0x1476  GNSS Position Report"));
        assert_eq!(lines[3], "Position Source = Network");
        assert_eq!(lines[4], "PosVelFlag_IntDB {");
        assert_eq!(lines[5], "   Pos Vel Flag = 515");
        assert_eq!(lines[6], "   Raw Value = 0x10203");
        assert_eq!(lines[9], "   Pos Vel Flag = 0x10");
        assert_eq!(lines[10], "   Raw Value = 0xAABBCCDD00000010");
        assert!(lines.contains(&"Latitude = 28.647889757 degree".to_string()));
        assert!(lines.contains(&"Longitude = -57.29577951 degree".to_string()));
        assert!(lines.contains(&"Final Position Latitude = 0.5000000000".to_string()));
        assert_eq!(lines.last().unwrap(), "Final Position Altitude = 12.500");
    }

    #[test]
    fn test_position_unknown_source() {
        let mut body = position_body();
        body[2] = 9;
        let record = decode(position_report, 0x1476, body, DecodeMode::Text);
        assert_eq!(record.lines()[3], "Position Source = Unknown (9)");
    }

    #[test]
    fn test_position_structured() {
        let record = decode(position_report, 0x1476, position_body(), DecodeMode::Structured);
        match record.field("latitude") {
            Some(FieldValue::Float(lat)) => assert!((lat - 28.647889757).abs() < 1e-6),
            other => panic!("unexpected latitude {other:?}"),
        }
        assert_eq!(
            record.field("posvelflag_intdb_raw_value"),
            Some(&FieldValue::UInt(0x0001_0203))
        );
        assert_eq!(record.field("gps_week_number"), Some(&FieldValue::UInt(2300)));
    }

    #[test]
    fn test_xo_estimate() {
        let mut body = vec![1, 0, 0, 0];
        body.extend(19_200_000u32.to_le_bytes());
        body.extend(12u32.to_le_bytes());
        body.extend([0xAB, 0x01]);
        let record = decode(xo_frequency_estimation, 0x13D1, body, DecodeMode::Text);
        assert_eq!(
            &record.lines()[1..],
            &[
                "Version = 1",
                "Frequency Estimate = 19200000",
                "Frequency Uncertainty = 12",
                "Frequency Table Data = ab01",
            ]
        );
    }
}
