//! Text output in the layout QCAT uses for its parsed message files: a short
//! `%`-prefixed preamble, then each text block followed by a blank line.

use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};

use crate::record::DecodedRecord;

pub const QCAT_VERSION: &str = "QCAT 07.01.250 patch 03";
pub const SILK_VERSION: &str = "SILK_9.83";
const CONFIDENTIALITY: &str = "%Confidential - Qualcomm Technologies, Inc.and / or its affiliated companies - May Contain Trade Secrets";

pub struct QcatWriter<T>
where
    T: AsyncWrite + Unpin,
{
    writer: BufWriter<T>,
    blocks_written: usize,
}

impl<T> QcatWriter<T>
where
    T: AsyncWrite + Unpin,
{
    /// Writes the preamble naming `log_file_name` straight away.
    pub async fn new(writer: T, log_file_name: &str) -> Result<Self, std::io::Error> {
        let mut writer = BufWriter::new(writer);
        let preamble = format!(
            "%MOBILE PARSED MESSAGE FILE\n\
             %QCAT VERSION   : {QCAT_VERSION}\n\
             %SILK VERSION   : {SILK_VERSION}\n\
             %LOG FILE NAME  : {log_file_name}\n\n\
             {CONFIDENTIALITY}\n"
        );
        writer.write_all(preamble.as_bytes()).await?;
        Ok(QcatWriter {
            writer,
            blocks_written: 0,
        })
    }

    /// Returns whether anything was written; only text blocks are.
    pub async fn write_record(&mut self, record: &DecodedRecord) -> Result<bool, std::io::Error> {
        let DecodedRecord::TextBlock { lines, .. } = record else {
            return Ok(false);
        };
        let mut block = lines.join("\n");
        block.push_str("\n\n");
        self.writer.write_all(block.as_bytes()).await?;
        self.blocks_written += 1;
        Ok(true)
    }

    pub fn blocks_written(&self) -> usize {
        self.blocks_written
    }

    pub async fn close(mut self) -> Result<T, std::io::Error> {
        self.writer.flush().await?;
        Ok(self.writer.into_inner())
    }
}
