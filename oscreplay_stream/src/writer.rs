//! Append-only group serializer.

use oscreplay_proto::{Group, packet};
use std::io;

/// Counters kept while writing a stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteStats {
    pub groups: u64,
    pub messages: u64,
    pub bytes: u64,
}

/// Appends groups to a stream, flushing after each one.
#[derive(Debug)]
pub struct GroupWriter<W: io::Write> {
    inner: W,
    stats: WriteStats,
}

impl<W: io::Write> GroupWriter<W> {
    #[inline(always)]
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            stats: WriteStats::default(),
        }
    }

    #[inline(always)]
    pub const fn stats(&self) -> WriteStats {
        self.stats
    }

    /// Serializes `group` and flushes the underlying writer.
    ///
    /// Returns the number of bytes written.
    pub fn write_group(&mut self, group: &Group) -> io::Result<usize> {
        let n = packet::write_group(group, &mut self.inner)?;
        self.inner.flush()?;

        self.stats.groups += 1;
        self.stats.messages += group.len() as u64;
        self.stats.bytes += n as u64;

        Ok(n)
    }

    #[inline(always)]
    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }

    #[inline(always)]
    pub fn into_inner(self) -> W {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oscreplay_proto::{RawMessage, Timetag};

    /// Records how many bytes had been written at each flush.
    #[derive(Default)]
    struct FlushLog {
        data: Vec<u8>,
        flushed_at: Vec<usize>,
    }

    impl io::Write for FlushLog {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            io::Write::write(&mut self.data, buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            self.flushed_at.push(self.data.len());
            Ok(())
        }
    }

    #[test]
    fn flushes_after_every_group() {
        let message = RawMessage::new("/a", "", &[]).unwrap();
        let mut writer = GroupWriter::new(FlushLog::default());

        let first = writer
            .write_group(&Group::with_messages(Timetag::new(1, 0), [message.clone()]))
            .unwrap();
        let second = writer
            .write_group(&Group::with_messages(
                Timetag::new(2, 0),
                [message.clone(), message],
            ))
            .unwrap();

        assert_eq!(
            writer.stats(),
            WriteStats {
                groups: 2,
                messages: 3,
                bytes: (first + second) as u64
            }
        );

        let log = writer.into_inner();
        assert_eq!(log.flushed_at, [first, first + second]);
        assert_eq!(log.data.len(), first + second);
    }

    #[test]
    fn oversized_message_writes_nothing() {
        let huge = RawMessage::new("/big", "b", &vec![0; packet::MAX_MESSAGE_LEN]).unwrap();
        let mut writer = GroupWriter::new(Vec::new());

        let err = writer
            .write_group(&Group::with_messages(Timetag::new(1, 0), [huge]))
            .unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(writer.into_inner().is_empty());
    }
}
