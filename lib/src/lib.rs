pub mod catalog;
pub mod config;
pub mod diag;
pub mod event;
pub mod gsmtap;
pub mod hdlc;
pub mod ndjson_writer;
pub mod pcap;
pub mod qcat_writer;
pub mod qmdl;
pub mod record;
pub mod session;
pub mod summary;
pub mod util;

pub use catalog::{Catalog, DecodeContext, DecodeMode};
pub use config::DecoderConfig;
pub use record::{DecodedRecord, FieldValue, RecordKind};
pub use session::DecodeSession;
