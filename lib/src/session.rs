//! Drives a [Catalog] over the containers read from a capture and keeps the
//! run's [DumpSummary].

use log::{debug, warn};

use crate::catalog::{Catalog, RegistryError};
use crate::config::DecoderConfig;
use crate::diag::{MessagesContainer, Packet};
use crate::record::DecodedRecord;
use crate::summary::DumpSummary;

pub struct DecodeSession {
    catalog: Catalog,
    config: DecoderConfig,
    summary: DumpSummary,
}

impl DecodeSession {
    pub fn new(config: DecoderConfig, source: Option<String>) -> Result<Self, RegistryError> {
        Ok(DecodeSession {
            catalog: Catalog::standard(config.context())?,
            config,
            summary: DumpSummary::new(source),
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    pub fn summary(&self) -> &DumpSummary {
        &self.summary
    }

    pub fn into_summary(self) -> DumpSummary {
        self.summary
    }

    /// Decodes every packet in `container`. Insufficient records are
    /// counted but not returned.
    pub fn decode_container(&mut self, container: MessagesContainer) -> Vec<DecodedRecord> {
        let mut records = Vec::new();
        for maybe_packet in container.into_packets(self.config.validate_crc) {
            let packet = match maybe_packet {
                Ok(packet) => packet,
                Err(err) => {
                    warn!("skipping malformed frame: {err}");
                    self.summary.count_framing_error();
                    continue;
                }
            };
            let is_event = matches!(packet, Packet::Event(_));
            if is_event && !self.config.decode_events {
                self.summary.count_skipped_event();
                continue;
            }
            let record = self.catalog.decode_packet(&packet);
            self.summary.count_record(&record, is_event);
            if record.is_insufficient() {
                continue;
            }
            records.push(record);
        }
        debug!("{} records decoded so far", self.summary.decoded());
        records
    }
}
