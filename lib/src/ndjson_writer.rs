//! NDJSON (Newline Delimited JSON) writer for structured decoding output
//!
//! Each decoded record is written as one JSON line as soon as it is
//! produced, so a long capture never has to be held in memory and a partial
//! output file stays readable.
//!
//! See: [Newline Delimited JSON](https://docs.mulesoft.com/dataweave/latest/dataweave-formats-ndjson)

use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};

pub struct NdjsonWriter<T>
where
    T: AsyncWrite + Unpin,
{
    writer: BufWriter<T>,
    lines_written: usize,
}

impl<T> NdjsonWriter<T>
where
    T: AsyncWrite + Unpin,
{
    pub fn new(writer: T) -> Self {
        Self {
            writer: BufWriter::new(writer),
            lines_written: 0,
        }
    }

    /// Write a serializable value as a line of NDJSON
    pub async fn write<V: Serialize>(&mut self, value: &V) -> Result<(), std::io::Error> {
        let mut value_str = serde_json::to_string(value)?;
        value_str.push('\n');
        self.writer.write_all(value_str.as_bytes()).await?;
        self.lines_written += 1;
        Ok(())
    }

    pub fn lines_written(&self) -> usize {
        self.lines_written
    }

    pub async fn flush(&mut self) -> Result<(), std::io::Error> {
        self.writer.flush().await
    }

    /// Flush and hand back the underlying writer
    pub async fn close(mut self) -> Result<T, std::io::Error> {
        self.writer.flush().await?;
        Ok(self.writer.into_inner())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::diag::Timestamp;
    use crate::record::{DecodedRecord, Fields, RecordKind};

    #[tokio::test]
    async fn test_one_record_per_line() {
        let mut writer = NdjsonWriter::new(Vec::new());
        let record = DecodedRecord::StructuredFields {
            kind: RecordKind::Event,
            fields: Fields::new(),
            timestamp: Timestamp { ts: 0 }.to_datetime(),
            radio_id: 0,
        };
        writer.write(&record).await.unwrap();
        writer.write(&DecodedRecord::Insufficient).await.unwrap();
        assert_eq!(writer.lines_written(), 2);

        let bytes = writer.close().await.unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["kind"], "event");
        assert_eq!(lines[1], r#"{"record":"insufficient"}"#);
    }
}
