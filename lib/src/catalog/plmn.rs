//! BCD packed PLMN identifiers as carried in NAS messages (3GPP TS 24.008
//! 10.5.1.3): MCC digit 2 | MCC digit 1, MNC digit 3 | MCC digit 3,
//! MNC digit 2 | MNC digit 1. A two digit MNC has `0xF` as MNC digit 3.

use std::fmt;

const FILLER: u8 = 0xF;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plmn {
    pub mcc: String,
    pub mnc: String,
}

impl fmt::Display for Plmn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MCC={}, MNC={}", self.mcc, self.mnc)
    }
}

fn digit(nibble: u8) -> char {
    char::from_digit(nibble as u32, 16)
        .unwrap_or('?')
        .to_ascii_uppercase()
}

pub fn decode_plmn(bytes: [u8; 3]) -> Plmn {
    let [b0, b1, b2] = bytes;
    let mcc = [b0 & 0x0F, b0 >> 4, b1 & 0x0F]
        .into_iter()
        .map(digit)
        .collect();
    let mnc_digit3 = b1 >> 4;
    let mut mnc: String = [b2 & 0x0F, b2 >> 4].into_iter().map(digit).collect();
    if mnc_digit3 != FILLER {
        mnc.insert(0, digit(mnc_digit3));
    }
    Plmn { mcc, mnc }
}

fn nibbles(digits: &str) -> Option<Vec<u8>> {
    digits
        .chars()
        .map(|c| c.to_digit(10).map(|d| d as u8))
        .collect()
}

/// Inverse of [decode_plmn]. `None` unless the MCC has 3 decimal digits and
/// the MNC has 2 or 3.
pub fn encode_plmn(mcc: &str, mnc: &str) -> Option<[u8; 3]> {
    let mcc = nibbles(mcc)?;
    let mnc = nibbles(mnc)?;
    if mcc.len() != 3 {
        return None;
    }
    let (mnc_digit3, mnc1, mnc2) = match mnc.as_slice() {
        [d1, d2] => (FILLER, *d1, *d2),
        [d3, d1, d2] => (*d3, *d1, *d2),
        _ => return None,
    };
    Some([
        mcc[1] << 4 | mcc[0],
        mnc_digit3 << 4 | mcc[2],
        mnc2 << 4 | mnc1,
    ])
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_two_digit_mnc() {
        let plmn = decode_plmn([0x13, 0xF8, 0x23]);
        assert_eq!(plmn.mcc, "318");
        assert_eq!(plmn.mnc, "32");
        assert_eq!(encode_plmn("318", "32"), Some([0x13, 0xF8, 0x23]));
    }

    #[test]
    fn test_three_digit_mnc_keeps_leading_zero() {
        // 310 / 010
        let plmn = decode_plmn([0x13, 0x00, 0x01]);
        assert_eq!(plmn.to_string(), "MCC=310, MNC=010");
        assert_eq!(encode_plmn("310", "010"), Some([0x13, 0x00, 0x01]));
    }

    #[test]
    fn test_invalid_encodings() {
        assert_eq!(encode_plmn("31", "26"), None);
        assert_eq!(encode_plmn("310", "2"), None);
        assert_eq!(encode_plmn("3a0", "26"), None);
    }

    #[test]
    fn test_non_decimal_nibbles() {
        assert_eq!(decode_plmn([0xFF, 0xFF, 0xFF]).mcc, "FFF");
    }
}
