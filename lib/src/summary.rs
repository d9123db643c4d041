//! Per-run counters, written once at the end of a structured run.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::record::{DecodedRecord, RecordKind};
use crate::util::RuntimeMetadata;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DumpSummary {
    pub decoder: RuntimeMetadata,
    pub source: Option<String>,
    /// Log packets and events handed to the catalog.
    pub packets: u64,
    pub log_packets: u64,
    pub events: u64,
    /// Events dropped because event decoding is disabled.
    pub skipped_events: u64,
    pub insufficient: u64,
    /// Frames that failed HDLC decapsulation or message parsing.
    pub framing_errors: u64,
    /// Only populated for structured records, which are the only ones that
    /// carry a kind.
    pub by_kind: BTreeMap<RecordKind, u64>,
}

impl DumpSummary {
    pub fn new(source: Option<String>) -> Self {
        DumpSummary {
            decoder: RuntimeMetadata::new(),
            source,
            packets: 0,
            log_packets: 0,
            events: 0,
            skipped_events: 0,
            insufficient: 0,
            framing_errors: 0,
            by_kind: BTreeMap::new(),
        }
    }

    pub fn count_record(&mut self, record: &DecodedRecord, is_event: bool) {
        self.packets += 1;
        if is_event {
            self.events += 1;
        } else {
            self.log_packets += 1;
        }
        match record {
            DecodedRecord::Insufficient => self.insufficient += 1,
            DecodedRecord::StructuredFields { kind, .. } => {
                *self.by_kind.entry(*kind).or_insert(0) += 1;
            }
            DecodedRecord::TextBlock { .. } | DecodedRecord::Encapsulated { .. } => {}
        }
    }

    pub fn count_framing_error(&mut self) {
        self.framing_errors += 1;
    }

    pub fn count_skipped_event(&mut self) {
        self.skipped_events += 1;
    }

    /// Records that made it to a writer.
    pub fn decoded(&self) -> u64 {
        self.packets - self.insufficient
    }

    /// Folds the counters of another run into this one.
    pub fn merge(&mut self, other: &DumpSummary) {
        self.packets += other.packets;
        self.log_packets += other.log_packets;
        self.events += other.events;
        self.skipped_events += other.skipped_events;
        self.insufficient += other.insufficient;
        self.framing_errors += other.framing_errors;
        for (kind, count) in &other.by_kind {
            *self.by_kind.entry(*kind).or_insert(0) += count;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::diag::Timestamp;
    use crate::record::Fields;

    fn structured(kind: RecordKind) -> DecodedRecord {
        DecodedRecord::StructuredFields {
            kind,
            fields: Fields::new(),
            timestamp: Timestamp { ts: 0 }.to_datetime(),
            radio_id: 0,
        }
    }

    #[test]
    fn test_counts() {
        let mut summary = DumpSummary::new(Some("capture.qmdl".to_string()));
        summary.count_record(&structured(RecordKind::Measurement), false);
        summary.count_record(&structured(RecordKind::Measurement), false);
        summary.count_record(&structured(RecordKind::Event), true);
        summary.count_record(&DecodedRecord::Insufficient, false);
        summary.count_framing_error();

        assert_eq!(summary.packets, 4);
        assert_eq!(summary.log_packets, 3);
        assert_eq!(summary.events, 1);
        assert_eq!(summary.insufficient, 1);
        assert_eq!(summary.decoded(), 3);
        assert_eq!(summary.by_kind[&RecordKind::Measurement], 2);

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["by_kind"]["measurement"], 2);
        assert_eq!(json["framing_errors"], 1);
        assert_eq!(json["source"], "capture.qmdl");
    }

    #[test]
    fn test_merge() {
        let mut total = DumpSummary::new(None);
        let mut run = DumpSummary::new(None);
        run.count_record(&structured(RecordKind::CellInfo), false);
        run.count_skipped_event();
        total.merge(&run);
        total.merge(&run);
        assert_eq!(total.packets, 2);
        assert_eq!(total.skipped_events, 2);
        assert_eq!(total.by_kind[&RecordKind::CellInfo], 2);
    }
}
