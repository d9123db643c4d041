//! Bounds-checked little-endian readers, unit conversions and code tables.
//!
//! Every reader returns `None` instead of failing when the requested bytes
//! run past the end of the body, so decoders can emit whatever prefix of a
//! truncated packet is present.

use std::borrow::Cow;

/// Radians to degrees, as used for GNSS latitude/longitude.
pub const RAD_TO_DEG: f64 = 57.2957795131;

pub trait FieldReader {
    fn read_bytes(&self, offset: usize, len: usize) -> Option<&[u8]>;

    fn read_array<const N: usize>(&self, offset: usize) -> Option<[u8; N]> {
        self.read_bytes(offset, N)?.try_into().ok()
    }

    fn read_u8(&self, offset: usize) -> Option<u8> {
        self.read_array::<1>(offset).map(|b| b[0])
    }

    fn read_i8(&self, offset: usize) -> Option<i8> {
        self.read_array::<1>(offset).map(i8::from_le_bytes)
    }

    fn read_u16(&self, offset: usize) -> Option<u16> {
        self.read_array(offset).map(u16::from_le_bytes)
    }

    fn read_i16(&self, offset: usize) -> Option<i16> {
        self.read_array(offset).map(i16::from_le_bytes)
    }

    fn read_u32(&self, offset: usize) -> Option<u32> {
        self.read_array(offset).map(u32::from_le_bytes)
    }

    fn read_i32(&self, offset: usize) -> Option<i32> {
        self.read_array(offset).map(i32::from_le_bytes)
    }

    fn read_u64(&self, offset: usize) -> Option<u64> {
        self.read_array(offset).map(u64::from_le_bytes)
    }

    fn read_f32(&self, offset: usize) -> Option<f32> {
        self.read_array(offset).map(f32::from_le_bytes)
    }

    fn read_f64(&self, offset: usize) -> Option<f64> {
        self.read_array(offset).map(f64::from_le_bytes)
    }

    fn read_u16_be(&self, offset: usize) -> Option<u16> {
        self.read_array(offset).map(u16::from_be_bytes)
    }

    fn read_u32_be(&self, offset: usize) -> Option<u32> {
        self.read_array(offset).map(u32::from_be_bytes)
    }
}

impl FieldReader for [u8] {
    fn read_bytes(&self, offset: usize, len: usize) -> Option<&[u8]> {
        self.get(offset..offset.checked_add(len)?)
    }
}

/// Power levels are stored as sixteenths of a dBm.
pub fn power_dbm(raw: i16) -> f64 {
    raw as f64 / 16.0
}

/// Temperatures are stored as tenths of a degree Celsius.
pub fn temperature_c(raw: i16) -> f64 {
    raw as f64 / 10.0
}

pub fn radians_to_degrees(radians: f64) -> f64 {
    radians * RAD_TO_DEG
}

/// Shortest round-trip rendering in the legacy tool's float style: `3`
/// becomes `3.0`, and exponents below -4 or from 16 up switch to `1e-05`
/// and `1.5e+16`.
pub fn float_repr(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let sci = format!("{value:e}");
    let (mantissa, exponent) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or_default();
    if (-4..16).contains(&exponent) {
        let out = value.to_string();
        if out.contains('.') { out } else { format!("{out}.0") }
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{mantissa}e{sign}{:02}", exponent.unsigned_abs())
    }
}

/// Static code-to-label mapping.
#[derive(Debug, Clone, Copy)]
pub struct EnumTable(pub &'static [(u32, &'static str)]);

impl EnumTable {
    pub fn get(&self, code: u32) -> Option<&'static str> {
        self.0
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, label)| *label)
    }

    /// Never fails: unknown codes render as `Unknown(<code>)`.
    pub fn label(&self, code: impl Into<u32>) -> Cow<'static, str> {
        let code = code.into();
        match self.get(code) {
            Some(label) => Cow::Borrowed(label),
            None => Cow::Owned(format!("Unknown({code})")),
        }
    }

    /// Like `label`, but spaced as `Unknown (<code>)`, which is what the NAS
    /// state, WCDMA and GNSS reports print.
    pub fn spaced_label(&self, code: impl Into<u32>) -> Cow<'static, str> {
        let code = code.into();
        match self.get(code) {
            Some(label) => Cow::Borrowed(label),
            None => Cow::Owned(format!("Unknown ({code})")),
        }
    }
}

/// Printable ASCII only, otherwise empty.
pub fn printable_ascii(bytes: &[u8]) -> String {
    if bytes.iter().all(|b| (32..127).contains(b)) {
        bytes.iter().map(|&b| b as char).collect()
    } else {
        String::new()
    }
}

/// Decodes a NUL padded string field, dropping everything after the first NUL.
pub fn c_string(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

#[cfg(test)]
mod test {
    use super::*;

    const STATES: EnumTable = EnumTable(&[(0, "OFF"), (1, "ON")]);

    #[test]
    fn test_bounds() {
        let body = [0x01u8, 0x02, 0x03, 0x04, 0x05];
        assert_eq!(body.read_u8(4), Some(5));
        assert_eq!(body.read_u8(5), None);
        assert_eq!(body.read_u16(0), Some(0x0201));
        assert_eq!(body.read_u16(4), None);
        assert_eq!(body.read_u32(1), Some(0x05040302));
        assert_eq!(body.read_u32(2), None);
        assert_eq!(body.read_u64(0), None);
        assert_eq!(body.read_u16_be(0), Some(0x0102));
        assert_eq!(body.read_bytes(usize::MAX, 2), None);
        assert_eq!([0xffu8, 0xff].read_i16(0), Some(-1));
    }

    #[test]
    fn test_floats() {
        let body = 1.5f32.to_le_bytes();
        assert_eq!(body.read_f32(0), Some(1.5));
        let body = (-0.25f64).to_le_bytes();
        assert_eq!(body.read_f64(0), Some(-0.25));
    }

    #[test]
    fn test_scaling() {
        for raw in [-1600i16, -1, 0, 7, i16::MAX, i16::MIN] {
            assert!((power_dbm(raw) - raw as f64 / 16.0).abs() < 1e-9);
            assert!((temperature_c(raw) - raw as f64 / 10.0).abs() < 1e-9);
        }
        assert!((radians_to_degrees(std::f64::consts::PI) - 180.0).abs() < 1e-6);
    }

    #[test]
    fn test_float_repr() {
        assert_eq!(float_repr(3.0), "3.0");
        assert_eq!(float_repr(-0.5), "-0.5");
        assert_eq!(float_repr(0.1f32 as f64), "0.10000000149011612");
        assert_eq!(float_repr(0.0001), "0.0001");
        assert_eq!(float_repr(1e15), "1000000000000000.0");
    }

    #[test]
    fn test_float_repr_exponents() {
        assert_eq!(float_repr(1e-5), "1e-05");
        assert_eq!(float_repr(-1.5e-7), "-1.5e-07");
        assert_eq!(float_repr(1e16), "1e+16");
        assert_eq!(float_repr(1.2345678901234568e17), "1.2345678901234568e+17");
        assert_eq!(float_repr(1e300), "1e+300");
        assert_eq!(float_repr(f64::NAN), "nan");
        assert_eq!(float_repr(f64::NEG_INFINITY), "-inf");
    }

    #[test]
    fn test_enum_table() {
        assert_eq!(STATES.label(1u8), "ON");
        assert_eq!(STATES.label(7u8), "Unknown(7)");
        assert_eq!(STATES.get(7), None);
        assert_eq!(STATES.spaced_label(1u8), "ON");
        assert_eq!(STATES.spaced_label(7u8), "Unknown (7)");
    }

    #[test]
    fn test_strings() {
        assert_eq!(printable_ascii(b"abc"), "abc");
        assert_eq!(printable_ascii(&[0x61, 0x00]), "");
        assert_eq!(c_string(b"lte\0\0junk"), "lte");
    }
}
