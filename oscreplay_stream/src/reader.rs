//! Fail-soft group parser.

use log::{debug, warn};
use oscreplay_proto::{GROUP_HEADER_SIZE, Group, RawMessage, Timetag, packet};
use oscreplay_utils::{ByteCursor, Chunk};
use std::io;

/// Counters kept while reading a stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadStats {
    pub groups: u64,
    pub messages: u64,
    /// Messages dropped because they failed to decode.
    pub skipped_messages: u64,
}

/// Reads groups sequentially from a stored stream.
///
/// Framing damage (a truncated header, length or message, or an absurd length)
/// ends the stream with a warning. A group whose marker is wrong is still decoded,
/// also with a warning. Messages that don't decode are skipped.
pub struct GroupReader<R> {
    cursor: ByteCursor<R>,
    done: bool,
    // source failure hit while reading a group, reported on the next read
    failure: Option<io::Error>,
    stats: ReadStats,
}

impl<R: io::Read> GroupReader<R> {
    #[inline(always)]
    pub fn new(inner: R) -> Self {
        Self {
            cursor: ByteCursor::new(inner),
            done: false,
            failure: None,
            stats: ReadStats::default(),
        }
    }

    #[inline(always)]
    pub const fn stats(&self) -> ReadStats {
        self.stats
    }

    /// Number of bytes of the stream consumed so far.
    #[inline(always)]
    pub const fn position(&self) -> u64 {
        self.cursor.position()
    }

    /// Reads the next group. Returns `Ok(None)` once the stream has ended.
    ///
    /// If the stream is cut short inside a message, the group is returned with
    /// the messages read in full, and the stream ends there.
    ///
    /// Errors are only returned for I/O failures of the underlying source. A
    /// failure partway through a group first yields the messages read so far,
    /// and is returned by the following call.
    pub fn read_group(&mut self) -> io::Result<Option<Group>> {
        if let Some(e) = self.failure.take() {
            self.done = true;
            return Err(e);
        }

        if self.done {
            return Ok(None);
        }

        let Some(timestamp) = self.read_header()? else {
            self.done = true;
            return Ok(None);
        };

        let mut group = Group::new(timestamp);

        if let Err(e) = self.read_messages(&mut group) {
            warn!(
                "read failed inside group {}, keeping its {} message(s)",
                group.timestamp,
                group.len()
            );
            self.failure = Some(e);
        }

        self.stats.groups += 1;
        self.stats.messages += group.len() as u64;

        debug!(
            "read group {} with {} message(s)",
            group.timestamp,
            group.len()
        );

        Ok(Some(group))
    }

    fn read_messages(&mut self, group: &mut Group) -> io::Result<()> {
        // one byte of look-ahead tells messages apart from the next group's marker
        while let Some(next) = self.cursor.peek_byte()? {
            if packet::starts_bundle_marker(next) {
                break;
            }

            let offset = self.cursor.position();

            let Some(payload) = self.read_payload()? else {
                self.done = true;
                break;
            };

            match RawMessage::decode(payload) {
                Ok(message) => group.push(message),
                Err(e) => {
                    warn!("skipping malformed message at byte {offset}: {e}");
                    self.stats.skipped_messages += 1;
                }
            }
        }

        Ok(())
    }

    fn read_header(&mut self) -> io::Result<Option<Timetag>> {
        let offset = self.cursor.position();
        let mut header = [0; GROUP_HEADER_SIZE];

        match self.cursor.read_exact(GROUP_HEADER_SIZE)? {
            Chunk::Full(bytes) => header.copy_from_slice(bytes),
            Chunk::Short(0) => return Ok(None),
            Chunk::Short(n) => {
                warn!("discarding {n} trailing bytes at byte {offset}: truncated group header");
                return Ok(None);
            }
        }

        let (marker, timestamp) = packet::split_group_header(&header);

        if marker != packet::BUNDLE_MARKER {
            warn!(
                "group at byte {offset} has a malformed marker \"{}\", decoding it anyway",
                marker.escape_ascii()
            );
        }

        Ok(Some(timestamp))
    }

    /// Reads one length-prefixed payload, `None` if framing is damaged.
    fn read_payload(&mut self) -> io::Result<Option<Vec<u8>>> {
        let offset = self.cursor.position();

        let len = match self.cursor.read_exact(size_of::<u32>())? {
            Chunk::Full(&[b0, b1, b2, b3]) => u32::from_be_bytes([b0, b1, b2, b3]),
            Chunk::Full(_) | Chunk::Short(_) => {
                warn!("stream truncated at byte {offset} inside a message length");
                return Ok(None);
            }
        };

        let len = usize::try_from(len).unwrap_or(usize::MAX);

        if len > packet::MAX_MESSAGE_LEN {
            warn!("message at byte {offset} declares {len} bytes, treating as end of stream");
            return Ok(None);
        }

        match self.cursor.read_exact(len)? {
            Chunk::Full(payload) => Ok(Some(payload.to_vec())),
            Chunk::Short(n) => {
                warn!(
                    "stream truncated at byte {offset}: message declares {len} bytes, \
                    discarding the {n} left"
                );
                Ok(None)
            }
        }
    }
}

/// Iterates over groups until the stream ends or the source fails.
impl<R: io::Read> Iterator for GroupReader<R> {
    type Item = io::Result<Group>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.read_group() {
            Ok(group) => group.map(Ok),
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
