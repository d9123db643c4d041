//! Qualcomm Mobile Diagnostic Log (QMDL) files have a very simple format: just
//! a series of concatenated HDLC encapsulated diag::Message structs.
//! QmdlReader turns such a file back into MessagesContainers, one HDLC frame
//! per container.

use crate::diag::{DataType, HdlcEncapsulatedMessage, MESSAGE_TERMINATOR, MessagesContainer};

use futures::TryStream;
use log::error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

pub struct QmdlReader<T>
where
    T: AsyncRead,
{
    reader: BufReader<T>,
    bytes_read: usize,
    max_bytes: Option<usize>,
}

impl<T> QmdlReader<T>
where
    T: AsyncRead + Unpin,
{
    pub fn new(reader: T, max_bytes: Option<usize>) -> Self {
        QmdlReader {
            reader: BufReader::new(reader),
            bytes_read: 0,
            max_bytes,
        }
    }

    pub fn bytes_read(&self) -> usize {
        self.bytes_read
    }

    pub fn as_stream(
        &mut self,
    ) -> impl TryStream<Ok = MessagesContainer, Error = std::io::Error> + '_ {
        futures::stream::try_unfold(self, |reader| async {
            let maybe_container = reader.get_next_messages_container().await?;
            match maybe_container {
                Some(container) => Ok(Some((container, reader))),
                None => Ok(None),
            }
        })
    }

    pub async fn get_next_messages_container(
        &mut self,
    ) -> Result<Option<MessagesContainer>, std::io::Error> {
        if let Some(max_bytes) = self.max_bytes {
            if self.bytes_read >= max_bytes {
                if self.bytes_read > max_bytes {
                    error!(
                        "warning: {} bytes read, but max_bytes was {}",
                        self.bytes_read, max_bytes
                    );
                }
                return Ok(None);
            }
        }

        let mut buf = Vec::new();
        let bytes_read = self.reader.read_until(MESSAGE_TERMINATOR, &mut buf).await?;
        if bytes_read == 0 {
            return Ok(None);
        }
        self.bytes_read += bytes_read;

        // a QMDL file doesn't preserve the container boundaries of the live
        // capture, so every frame becomes its own single-message container
        Ok(Some(MessagesContainer {
            data_type: DataType::UserSpace,
            num_messages: 1,
            messages: vec![HdlcEncapsulatedMessage {
                len: bytes_read as u32,
                data: buf,
            }],
        }))
    }
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use futures::TryStreamExt;

    use crate::diag::{CRC_CCITT, Packet};
    use crate::hdlc::hdlc_encapsulate;

    use super::*;

    // cmd, pending, outer len, inner len, log type, timestamp, body
    fn log_frame(log_type: u16, body: &[u8]) -> Vec<u8> {
        let len = (body.len() + 12) as u16;
        let mut frame = vec![0x10, 0];
        frame.extend(len.to_le_bytes());
        frame.extend(len.to_le_bytes());
        frame.extend(log_type.to_le_bytes());
        frame.extend(0u64.to_le_bytes());
        frame.extend(body);
        hdlc_encapsulate(&frame, &CRC_CCITT)
    }

    fn capture() -> Vec<Vec<u8>> {
        vec![
            log_frame(0x7131, &[1, 2, 0, 0, 0, 0, 0, 0]),
            // escaped bytes in the body must not split the frame
            log_frame(0x1098, &[0x7e, 0x7d, 0x00]),
            hdlc_encapsulate(&[0x4b, 0x01, 0x02], &CRC_CCITT),
        ]
    }

    #[tokio::test]
    async fn test_one_container_per_frame() {
        let frames = capture();
        let mut reader = QmdlReader::new(Cursor::new(frames.concat()), None);
        for frame in &frames {
            let container = reader.get_next_messages_container().await.unwrap().unwrap();
            assert_eq!(container.data_type, DataType::UserSpace);
            assert_eq!(container.num_messages, 1);
            assert_eq!(&container.messages[0].data, frame);
        }
        assert!(matches!(
            reader.get_next_messages_container().await,
            Ok(None)
        ));
        assert_eq!(reader.bytes_read(), frames.concat().len());
    }

    #[tokio::test]
    async fn test_byte_limit_stops_reading() {
        let frames = capture();
        let limit = frames[0].len() + frames[1].len();
        let mut reader = QmdlReader::new(Cursor::new(frames.concat()), Some(limit));
        let mut stream = std::pin::pin!(reader.as_stream().into_stream());
        let mut containers = Vec::new();
        while let Some(container) = stream.try_next().await.unwrap() {
            containers.push(container);
        }
        assert_eq!(containers.len(), 2);

        let packets: Vec<_> = containers
            .into_iter()
            .flat_map(|c| c.into_packets(true))
            .collect();
        assert_eq!(packets.len(), 2);
        assert!(matches!(&packets[0], Ok(Packet::Log(p)) if p.message_type == 0x7131));
        assert!(matches!(&packets[1], Ok(Packet::Log(p)) if p.body == vec![0x7e, 0x7d, 0x00]));
    }
}
