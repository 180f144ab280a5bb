//! Timed playback of stored streams.

use crate::Clock;
use core::time::Duration;
use log::{debug, info, warn};
use oscreplay_network::Destination;
use oscreplay_proto::{Group, Timetag};
use oscreplay_stream::GroupReader;
use std::io;

/// Groups sent later than this behind schedule are counted as late.
const LATE_TOLERANCE_SECS: f64 = 1e-3;

/// Offset mapping recorded timestamps onto the wall clock.
///
/// `offset = now - first + delay`, where the delay is split into fixed point
/// with [`Timetag::from_delay`]. Non-positive delays add nothing.
#[inline]
pub fn compute_offset(first: Timetag, delay_secs: f64, now: Timetag) -> Timetag {
    let offset = now - first;

    if delay_secs > 0. {
        offset + Timetag::from_delay(delay_secs)
    } else {
        offset
    }
}

/// Per-run playback state: the requested delay and, once known, the offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackSession {
    offset: Option<Timetag>,
    delay_secs: f64,
}

impl PlaybackSession {
    #[inline(always)]
    pub const fn new(delay_secs: f64) -> Self {
        Self {
            offset: None,
            delay_secs,
        }
    }

    #[inline(always)]
    pub const fn offset(&self) -> Option<Timetag> {
        self.offset
    }

    #[inline(always)]
    pub const fn delay_secs(&self) -> f64 {
        self.delay_secs
    }

    /// Maps a recorded timestamp to its send time.
    ///
    /// The first call fixes the offset, using `now` and `recorded` as the anchor.
    /// Every later call reuses it.
    #[inline]
    pub fn send_time(&mut self, recorded: Timetag, now: Timetag) -> Timetag {
        let &mut offset = self
            .offset
            .get_or_insert_with(|| compute_offset(recorded, self.delay_secs, now));

        recorded + offset
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlaybackState {
    #[default]
    AwaitingFirstGroup,
    Streaming,
    Done,
}

/// Counters kept during playback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackStats {
    /// Groups handed to the transport.
    pub groups: u64,
    pub messages: u64,
    /// Groups that were already overdue when their turn came.
    pub late_groups: u64,
}

/// Receives groups once they are due.
///
/// The timestamp of a dispatched group is its send time, or
/// [`Timetag::IMMEDIATE`].
pub trait Dispatch {
    fn dispatch(&mut self, group: &Group) -> io::Result<()>;
}

impl<D: Dispatch + ?Sized> Dispatch for &mut D {
    #[inline(always)]
    fn dispatch(&mut self, group: &Group) -> io::Result<()> {
        (**self).dispatch(group)
    }
}

/// How groups are put on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DispatchMode {
    /// One bundle datagram per group.
    #[default]
    Bundle,
    /// One datagram per message, sent back to back.
    Messages,
}

/// Sends groups to a [`Destination`].
#[derive(Debug)]
pub struct Output {
    destination: Destination,
    mode: DispatchMode,
}

impl Output {
    #[inline(always)]
    pub fn new(destination: Destination, mode: DispatchMode) -> Self {
        Self { destination, mode }
    }
}

impl Dispatch for Output {
    fn dispatch(&mut self, group: &Group) -> io::Result<()> {
        match self.mode {
            DispatchMode::Bundle => self.destination.send_group(group),
            DispatchMode::Messages => {
                let mut res = Ok(());

                // a failed send doesn't hold back the rest of the group
                for message in &group.messages {
                    if let Err(e) = self.destination.send_message(message) {
                        warn!("failed to send {}: {e}", message.address());
                        res = res.and(Err(e));
                    }
                }

                res
            }
        }
    }
}

/// Reads groups in order, waits until each one is due, and dispatches it.
///
/// Sleeping is the only suspension point. Groups that are already overdue are
/// sent at once, nothing is skipped to catch up.
pub struct PlaybackScheduler<C> {
    clock: C,
    session: PlaybackSession,
    state: PlaybackState,
    stats: PlaybackStats,
}

impl<C: Clock> PlaybackScheduler<C> {
    #[inline(always)]
    pub fn new(clock: C, delay_secs: f64) -> Self {
        Self {
            clock,
            session: PlaybackSession::new(delay_secs),
            state: PlaybackState::AwaitingFirstGroup,
            stats: PlaybackStats::default(),
        }
    }

    #[inline(always)]
    pub const fn state(&self) -> PlaybackState {
        self.state
    }

    #[inline(always)]
    pub const fn session(&self) -> &PlaybackSession {
        &self.session
    }

    #[inline(always)]
    pub const fn stats(&self) -> PlaybackStats {
        self.stats
    }

    #[inline(always)]
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Plays `reader` to the end.
    ///
    /// Only failures of the underlying source are returned, transport errors
    /// are logged and playback moves on.
    pub fn run<R: io::Read>(
        &mut self,
        reader: &mut GroupReader<R>,
        out: &mut impl Dispatch,
    ) -> io::Result<PlaybackStats> {
        while self.step(reader, out)? != PlaybackState::Done {}

        let read = reader.stats();

        info!(
            "playback done: {} group(s), {} message(s) sent, {} late group(s), {} message(s) skipped",
            self.stats.groups, self.stats.messages, self.stats.late_groups, read.skipped_messages,
        );

        Ok(self.stats)
    }

    /// Reads and plays a single group, returning the new state.
    pub fn step<R: io::Read>(
        &mut self,
        reader: &mut GroupReader<R>,
        out: &mut impl Dispatch,
    ) -> io::Result<PlaybackState> {
        if self.state == PlaybackState::Done {
            return Ok(self.state);
        }

        match reader.read_group() {
            Ok(Some(group)) => self.play(group, out),
            Ok(None) => self.state = PlaybackState::Done,
            Err(e) => {
                self.state = PlaybackState::Done;
                return Err(e);
            }
        }

        Ok(self.state)
    }

    /// Waits until `group` is due, then dispatches it.
    pub fn play(&mut self, group: Group, out: &mut impl Dispatch) {
        let Group {
            timestamp,
            messages,
        } = group;

        if timestamp.is_immediate() {
            debug!("sending immediate group");
            self.dispatch(Group::with_messages(Timetag::IMMEDIATE, messages), out);
            return;
        }

        let now = self.clock.now();
        let send_time = self.session.send_time(timestamp, now);

        if self.state == PlaybackState::AwaitingFirstGroup {
            if let Some(offset) = self.session.offset() {
                debug!("playback offset is {offset}");
            }
            self.state = PlaybackState::Streaming;
        }

        if messages.is_empty() {
            debug!("skipping empty group {timestamp}");
            return;
        }

        let diff = send_time.diff_seconds(now);

        if diff > 0. {
            self.clock.sleep(Duration::from_secs_f64(diff));
        } else if diff < -LATE_TOLERANCE_SECS {
            debug!("group {timestamp} is {:.3}s late", -diff);
            self.stats.late_groups += 1;
        }

        self.dispatch(Group::with_messages(send_time, messages), out);
    }

    #[inline]
    fn dispatch(&mut self, group: Group, out: &mut impl Dispatch) {
        if group.is_empty() {
            return;
        }

        // counted even on failure: the group had its turn
        self.stats.groups += 1;
        self.stats.messages += group.len() as u64;

        if let Err(e) = out.dispatch(&group) {
            warn!("failed to send group {}: {e}", group.timestamp);
        }
    }
}
