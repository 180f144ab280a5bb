//! Assembling received messages into stored groups.

use crate::Clock;
use log::{debug, warn};
use oscreplay_network::GroupListener;
use oscreplay_proto::{Group, RawMessage, Timetag};
use oscreplay_stream::GroupWriter;
use std::io;

/// Counters kept while recording.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordingStats {
    /// Groups written to storage.
    pub groups: u64,
    pub messages: u64,
}

/// Turns transport events into groups, and appends them to a stream.
///
/// Messages received between a group start and its end are collected into one
/// group. Groups nested in other groups are flattened into the outermost one,
/// which keeps the outermost timestamp. A message received outside of any group
/// is stored on its own, in a group stamped with its arrival time. Immediate
/// timestamps are replaced with the time the group started.
///
/// Every group is flushed as soon as it is complete.
pub struct GroupAggregator<W: io::Write, C> {
    writer: GroupWriter<W>,
    clock: C,
    current: Option<Group>,
    // number of group starts not yet matched by an end
    depth: usize,
}

impl<W: io::Write, C: Clock> GroupAggregator<W, C> {
    #[inline(always)]
    pub fn new(writer: GroupWriter<W>, clock: C) -> Self {
        Self {
            writer,
            clock,
            current: None,
            depth: 0,
        }
    }

    /// Returns `true` while a group is open.
    #[inline(always)]
    pub const fn inside_group(&self) -> bool {
        self.current.is_some()
    }

    #[inline]
    pub fn stats(&self) -> RecordingStats {
        let stats = self.writer.stats();

        RecordingStats {
            groups: stats.groups,
            messages: stats.messages,
        }
    }

    /// Discards the open group, if any, and flushes the stream.
    pub fn finish(mut self) -> io::Result<(RecordingStats, W)> {
        if let Some(group) = self.current.take() {
            warn!(
                "discarding unfinished group {} ({} message(s))",
                group.timestamp,
                group.len()
            );
        }

        self.writer.flush()?;

        let stats = self.stats();

        Ok((stats, self.writer.into_inner()))
    }

    fn store(&mut self, group: &Group) -> io::Result<()> {
        let n = self.writer.write_group(group)?;

        debug!(
            "stored group {} with {} message(s), {n} bytes",
            group.timestamp,
            group.len()
        );

        Ok(())
    }
}

impl<W: io::Write, C: Clock> GroupListener for GroupAggregator<W, C> {
    fn on_group_start(&mut self, timestamp: Timetag) -> io::Result<()> {
        if self.depth == 0 {
            let timestamp = if timestamp.is_immediate() {
                self.clock.now()
            } else {
                timestamp
            };

            self.current = Some(Group::new(timestamp));
        }

        self.depth = self.depth.strict_add(1);

        Ok(())
    }

    fn on_message(&mut self, address: &str, payload: &[u8]) -> io::Result<()> {
        let message = match RawMessage::decode(payload) {
            Ok(message) => message,
            Err(e) => {
                warn!("dropping malformed message to {address}: {e}");
                return Ok(());
            }
        };

        match &mut self.current {
            Some(group) => {
                group.push(message);
                Ok(())
            }
            None => {
                let group = Group::with_messages(self.clock.now(), [message]);
                self.store(&group)
            }
        }
    }

    fn on_group_end(&mut self) -> io::Result<()> {
        let Some(depth) = self.depth.checked_sub(1) else {
            warn!("ignoring the end of a group that was never started");
            return Ok(());
        };

        self.depth = depth;

        if depth > 0 {
            return Ok(());
        }

        match self.current.take() {
            Some(group) => self.store(&group),
            None => Ok(()),
        }
    }
}
