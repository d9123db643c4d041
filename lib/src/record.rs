//! The output side of decoding: every decoder returns exactly one
//! [DecodedRecord].

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Serialize, Serializer};

/// The categories structured writers group records by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    CellInfo,
    Measurement,
    RrcMessage,
    NasMessage,
    MacMessage,
    SecurityInfo,
    CaCombo,
    Event,
    QcatMessage,
    UnknownLog,
}

impl RecordKind {
    pub const ALL: [RecordKind; 10] = [
        RecordKind::CellInfo,
        RecordKind::Measurement,
        RecordKind::RrcMessage,
        RecordKind::NasMessage,
        RecordKind::MacMessage,
        RecordKind::SecurityInfo,
        RecordKind::CaCombo,
        RecordKind::Event,
        RecordKind::QcatMessage,
        RecordKind::UnknownLog,
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    Bytes(#[serde(serialize_with = "serialize_hex")] Vec<u8>),
}

fn serialize_hex<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex_string(bytes, ""))
}

/// Uppercase hex with `sep` between bytes.
pub fn hex_string(bytes: &[u8], sep: &str) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(sep)
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Int(v) => write!(f, "{v}"),
            FieldValue::UInt(v) => write!(f, "{v}"),
            FieldValue::Float(v) => write!(f, "{v}"),
            FieldValue::Str(v) => f.write_str(v),
            FieldValue::Bytes(v) => f.write_str(&hex_string(v, " ")),
        }
    }
}

macro_rules! field_value_from {
    ($variant:ident, $target:ty, $($t:ty),+) => {
        $(impl From<$t> for FieldValue {
            fn from(v: $t) -> Self {
                FieldValue::$variant(v as $target)
            }
        })+
    };
}

field_value_from!(UInt, u64, u8, u16, u32, u64, usize);
field_value_from!(Int, i64, i8, i16, i32, i64);
field_value_from!(Float, f64, f32, f64);

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Str(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Str(v.to_string())
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(v: Vec<u8>) -> Self {
        FieldValue::Bytes(v)
    }
}

pub type Fields = BTreeMap<String, FieldValue>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum DecodedRecord {
    /// QCAT-formatted lines, header line first.
    TextBlock {
        lines: Vec<String>,
        timestamp: DateTime<FixedOffset>,
    },
    StructuredFields {
        kind: RecordKind,
        fields: Fields,
        timestamp: DateTime<FixedOffset>,
        radio_id: u8,
    },
    /// GSMTAP framed bytes ready to be sent or written to a pcap.
    Encapsulated {
        #[serde(serialize_with = "serialize_hex")]
        framed_bytes: Vec<u8>,
        timestamp: DateTime<FixedOffset>,
    },
    /// The body was too short or malformed for its decoder.
    Insufficient,
}

impl DecodedRecord {
    pub fn is_insufficient(&self) -> bool {
        matches!(self, DecodedRecord::Insufficient)
    }

    pub fn timestamp(&self) -> Option<DateTime<FixedOffset>> {
        match self {
            DecodedRecord::TextBlock { timestamp, .. }
            | DecodedRecord::StructuredFields { timestamp, .. }
            | DecodedRecord::Encapsulated { timestamp, .. } => Some(*timestamp),
            DecodedRecord::Insufficient => None,
        }
    }

    pub fn lines(&self) -> &[String] {
        match self {
            DecodedRecord::TextBlock { lines, .. } => lines,
            _ => &[],
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        match self {
            DecodedRecord::StructuredFields { fields, .. } => fields.get(name),
            _ => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::diag::Timestamp;

    #[test]
    fn test_serialization() {
        let mut fields = Fields::new();
        fields.insert("payload".to_string(), FieldValue::Bytes(vec![0xde, 0xad]));
        fields.insert("rssi".to_string(), FieldValue::Float(-70.5));
        fields.insert("version".to_string(), 1u8.into());
        let record = DecodedRecord::StructuredFields {
            kind: RecordKind::Measurement,
            fields,
            timestamp: Timestamp { ts: 0 }.to_datetime(),
            radio_id: 1,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["record"], "structured_fields");
        assert_eq!(json["kind"], "measurement");
        assert_eq!(json["fields"]["payload"], "DEAD");
        assert_eq!(json["fields"]["rssi"], -70.5);
        assert_eq!(json["fields"]["version"], 1);
        assert_eq!(json["radio_id"], 1);

        let json = serde_json::to_value(DecodedRecord::Insufficient).unwrap();
        assert_eq!(json["record"], "insufficient");
    }

    #[test]
    fn test_display() {
        assert_eq!(FieldValue::from(-3i16).to_string(), "-3");
        assert_eq!(FieldValue::from(vec![1u8, 0xab]).to_string(), "01 AB");
        assert_eq!(FieldValue::from("ON").to_string(), "ON");
    }
}
