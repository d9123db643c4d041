//! The log packet decoding catalog: per-category decoder tables merged into
//! one registry keyed by message type.

use std::borrow::Cow;
use std::collections::HashMap;

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::diag::{EventPacket, LogPacket, Packet};
use crate::event::{self, EventRegistry};
use crate::record::DecodedRecord;

pub mod fields;
pub mod plmn;
pub mod report;

pub mod comprehensive;
pub mod gnss;
pub mod qcat;
pub mod rf;
pub mod umts_nas;
pub mod unknown;
pub mod wcdma;
pub mod wcdma_signaling;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DecodeMode {
    /// QCAT text blocks
    #[default]
    Text,
    /// typed fields grouped by record kind
    Structured,
    /// GSMTAP osmocore log frames
    Network,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeContext {
    pub mode: DecodeMode,
    pub radio_id: u8,
}

impl DecodeContext {
    pub fn new(mode: DecodeMode) -> Self {
        DecodeContext { mode, radio_id: 0 }
    }
}

pub type DecodeFn = fn(&LogPacket, &DecodeContext) -> DecodedRecord;

/// How topic-focused a category is. When two categories claim the same
/// identifier the more specific one wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Specificity {
    Fallback,
    Generic,
    Topic,
}

#[derive(Debug, Clone, Copy)]
pub struct DispatchEntry {
    pub message_type: u16,
    pub display_name: &'static str,
    /// Bodies shorter than this decode to `Insufficient`.
    pub min_len: usize,
    pub decoder: DecodeFn,
}

pub const fn entry(
    message_type: u16,
    display_name: &'static str,
    min_len: usize,
    decoder: DecodeFn,
) -> DispatchEntry {
    DispatchEntry {
        message_type,
        display_name,
        min_len,
        decoder,
    }
}

#[derive(Debug)]
pub struct Category {
    pub name: &'static str,
    pub specificity: Specificity,
    pub entries: &'static [DispatchEntry],
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    #[error("0x{id:04X} is claimed by both {first} and {second} at the same specificity")]
    Conflict {
        id: u16,
        first: &'static str,
        second: &'static str,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct RegisteredEntry {
    pub entry: DispatchEntry,
    pub source_category: &'static str,
    pub specificity: Specificity,
}

/// Picks the winner between an existing registration and a new claim on the
/// same identifier. Shared with the event registry.
pub(crate) fn resolve<T: Copy>(
    id: u16,
    existing: (T, &'static str, Specificity),
    claim: (T, &'static str, Specificity),
) -> Result<(T, &'static str, Specificity), RegistryError> {
    match existing.2.cmp(&claim.2) {
        std::cmp::Ordering::Greater => Ok(existing),
        std::cmp::Ordering::Less => Ok(claim),
        std::cmp::Ordering::Equal => Err(RegistryError::Conflict {
            id,
            first: existing.1,
            second: claim.1,
        }),
    }
}

/// The merged, immutable message-type table.
#[derive(Debug)]
pub struct Registry {
    entries: HashMap<u16, RegisteredEntry>,
    fallback: DecodeFn,
}

impl Registry {
    pub fn build(categories: &[&Category], fallback: DecodeFn) -> Result<Self, RegistryError> {
        let mut entries: HashMap<u16, RegisteredEntry> = HashMap::new();
        for category in categories {
            for entry in category.entries {
                let claim = RegisteredEntry {
                    entry: *entry,
                    source_category: category.name,
                    specificity: category.specificity,
                };
                let winner = match entries.get(&entry.message_type) {
                    Some(existing) => {
                        let (winner, _, _) = resolve(
                            entry.message_type,
                            (*existing, existing.source_category, existing.specificity),
                            (claim, claim.source_category, claim.specificity),
                        )?;
                        winner
                    }
                    None => claim,
                };
                entries.insert(entry.message_type, winner);
            }
        }
        Ok(Registry { entries, fallback })
    }

    pub fn get(&self, message_type: u16) -> Option<&RegisteredEntry> {
        self.entries.get(&message_type)
    }

    pub fn dispatch(&self, message_type: u16) -> DecodeFn {
        self.get(message_type)
            .map(|registered| registered.entry.decoder)
            .unwrap_or(self.fallback)
    }

    pub fn display_name(&self, message_type: u16) -> Cow<'static, str> {
        match self.get(message_type) {
            Some(registered) => Cow::Borrowed(registered.entry.display_name),
            None => unknown::display_name(message_type),
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &RegisteredEntry> {
        self.entries.values()
    }

    pub fn decode(&self, packet: &LogPacket, ctx: &DecodeContext) -> DecodedRecord {
        (self.dispatch(packet.message_type))(packet, ctx)
    }
}

pub const CATEGORIES: [&Category; 8] = [
    &unknown::CATEGORY,
    &comprehensive::CATEGORY,
    &rf::CATEGORY,
    &gnss::CATEGORY,
    &qcat::CATEGORY,
    &umts_nas::CATEGORY,
    &wcdma::CATEGORY,
    &wcdma_signaling::CATEGORY,
];

/// A decoding session: the log registry, the event registry and the output
/// mode, built once and then only read.
#[derive(Debug)]
pub struct Catalog {
    logs: Registry,
    events: EventRegistry,
    ctx: DecodeContext,
}

impl Catalog {
    pub fn standard(ctx: DecodeContext) -> Result<Self, RegistryError> {
        Ok(Catalog {
            logs: Registry::build(&CATEGORIES, unknown::decode_unknown)?,
            events: EventRegistry::build(&event::CATEGORIES)?,
            ctx,
        })
    }

    pub fn context(&self) -> &DecodeContext {
        &self.ctx
    }

    pub fn logs(&self) -> &Registry {
        &self.logs
    }

    pub fn events(&self) -> &EventRegistry {
        &self.events
    }

    pub fn display_name(&self, message_type: u16) -> Cow<'static, str> {
        self.logs.display_name(message_type)
    }

    pub fn decode(&self, packet: &LogPacket) -> DecodedRecord {
        let record = self.logs.decode(packet, &self.ctx);
        if record.is_insufficient() {
            debug!(
                "0x{:04X} ({}): {} byte body is insufficient",
                packet.message_type,
                self.display_name(packet.message_type),
                packet.body.len()
            );
        }
        record
    }

    pub fn decode_event(&self, packet: &EventPacket) -> DecodedRecord {
        self.events.decode(packet, &self.ctx)
    }

    pub fn decode_packet(&self, packet: &Packet) -> DecodedRecord {
        match packet {
            Packet::Log(log) => self.decode(log),
            Packet::Event(event) => self.decode_event(event),
        }
    }
}
