//! Writes network-mode records to a pcapng file.
//! Each GSMTAP frame gets a plausible IPv4 and UDP header (destination port
//! 4729) so wireshark hands it to its [GSMtap](https://osmocom.org/projects/baseband/wiki/GSMTAP)
//! dissector.
use crate::record::DecodedRecord;
use crate::util::RuntimeMetadata;

use chrono::prelude::*;
use deku::prelude::*;
use pcap_file_tokio::pcapng::PcapNgWriter;
use pcap_file_tokio::pcapng::blocks::enhanced_packet::EnhancedPacketBlock;
use pcap_file_tokio::pcapng::blocks::interface_description::InterfaceDescriptionBlock;
use pcap_file_tokio::pcapng::blocks::section_header::{SectionHeaderBlock, SectionHeaderOption};
use pcap_file_tokio::{Endianness, PcapError};
use std::borrow::Cow;
use thiserror::Error;
use tokio::io::AsyncWrite;

#[derive(Error, Debug)]
pub enum GsmtapPcapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Pcap error: {0}")]
    Pcap(#[from] PcapError),
    #[error("Timestamp out of range: {0}")]
    TimestampOutOfRange(#[from] chrono::OutOfRangeError),
    #[error("Deku error: {0}")]
    Deku(#[from] DekuError),
    #[error("Frame of {0} bytes doesn't fit in a UDP datagram")]
    FrameTooLarge(usize),
}

pub struct GsmtapPcapWriter<T>
where
    T: AsyncWrite,
{
    writer: PcapNgWriter<T>,
    ip_id: u16,
    radio_id: u8,
}

const IP_HEADER_LEN: u16 = 20;
const LOCALHOST: u32 = 0x7f000001;

#[derive(DekuWrite)]
#[deku(endian = "big")]
struct IpHeader {
    version_and_ihl: u8,
    dscp: u8,
    total_len: u16,
    identification: u16,
    flags_and_frag_offset: u16,
    ttl: u8,
    protocol: u8,
    checksum: u16,
    src_addr: u32,
    dst_addr: u32,
}

const UDP_HEADER_LEN: u16 = 8;
const GSMTAP_PORT: u16 = 4729;
const SOURCE_PORT: u16 = 13337;

#[derive(DekuWrite)]
#[deku(endian = "big")]
struct UdpHeader {
    src_port: u16,
    dst_port: u16,
    length: u16,
    checksum: u16,
}

impl<T> GsmtapPcapWriter<T>
where
    T: AsyncWrite + Unpin + Send,
{
    /// `radio_id` selects the destination address, 127.0.0.1 for the first
    /// radio, 127.0.0.2 for the second.
    pub async fn new(writer: T, radio_id: u8) -> Result<Self, GsmtapPcapError> {
        let metadata = RuntimeMetadata::new();
        let package = metadata.package();
        let section = SectionHeaderBlock {
            endianness: Endianness::Big,
            major_version: 1,
            minor_version: 0,
            section_length: -1,
            options: vec![
                SectionHeaderOption::Hardware(Cow::from(metadata.arch)),
                SectionHeaderOption::OS(Cow::from(metadata.system_os)),
                SectionHeaderOption::UserApplication(Cow::from(package)),
            ],
        };
        let writer = PcapNgWriter::with_section_header(writer, section).await?;
        Ok(GsmtapPcapWriter {
            writer,
            ip_id: 0,
            radio_id,
        })
    }

    pub async fn write_iface_header(&mut self) -> Result<(), GsmtapPcapError> {
        let interface = InterfaceDescriptionBlock {
            linktype: pcap_file_tokio::DataLink::IPV4,
            snaplen: 0xffff,
            options: vec![],
        };
        self.writer.write_pcapng_block(interface).await?;
        Ok(())
    }

    /// Returns whether a packet was written; only encapsulated records are.
    pub async fn write_record(&mut self, record: &DecodedRecord) -> Result<bool, GsmtapPcapError> {
        match record {
            DecodedRecord::Encapsulated {
                framed_bytes,
                timestamp,
            } => {
                self.write_gsmtap_frame(framed_bytes, *timestamp).await?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    pub async fn write_gsmtap_frame(
        &mut self,
        frame: &[u8],
        timestamp: DateTime<FixedOffset>,
    ) -> Result<(), GsmtapPcapError> {
        let headers_len = (IP_HEADER_LEN + UDP_HEADER_LEN) as usize;
        let total_len = u16::try_from(frame.len() + headers_len)
            .map_err(|_| GsmtapPcapError::FrameTooLarge(frame.len()))?;
        let duration = timestamp
            .signed_duration_since(DateTime::UNIX_EPOCH)
            .to_std()?;

        // pcap-file writes this field as if it held microseconds
        // https://github.com/courvoif/pcap-file/pull/32
        let duration = std::time::Duration::from_nanos(duration.as_micros() as u64);

        let ip_header = IpHeader {
            version_and_ihl: 0x45,
            dscp: 0,
            total_len,
            identification: self.ip_id,
            flags_and_frag_offset: 0x4000, // don't fragment
            ttl: 64,
            protocol: 0x11, // UDP
            checksum: 0xffff,
            src_addr: LOCALHOST,
            dst_addr: LOCALHOST + self.radio_id as u32,
        };
        let udp_header = UdpHeader {
            src_port: SOURCE_PORT,
            dst_port: GSMTAP_PORT,
            length: total_len - IP_HEADER_LEN,
            checksum: 0xffff,
        };
        let mut data: Vec<u8> = Vec::with_capacity(total_len as usize);
        data.extend(&ip_header.to_bytes()?);
        data.extend(&udp_header.to_bytes()?);
        data.extend(frame);
        let packet = EnhancedPacketBlock {
            interface_id: 0,
            timestamp: duration,
            original_len: data.len() as u32,
            data: Cow::Owned(data),
            options: vec![],
        };
        self.writer.write_pcapng_block(packet).await?;
        self.ip_id = self.ip_id.wrapping_add(1);
        Ok(())
    }
}
