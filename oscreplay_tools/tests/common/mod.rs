#![allow(dead_code)]

use core::{cell::Cell, time::Duration};
use oscreplay_tools::{
    Clock, Dispatch,
    proto::{Group, RawMessage, Timetag},
    stream::GroupWriter,
};
use std::{io, rc::Rc};

/// A clock that only moves when slept on, or when told to.
#[derive(Debug, Clone)]
pub struct ManualClock(Rc<Cell<Timetag>>);

impl ManualClock {
    pub fn new(start: Timetag) -> Self {
        Self(Rc::new(Cell::new(start)))
    }

    pub fn advance(&self, by: Duration) {
        self.0.set(self.0.get() + Timetag::from_duration(by));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timetag {
        self.0.get()
    }

    fn sleep(&mut self, duration: Duration) {
        self.advance(duration);
    }
}

/// Remembers every dispatched group, along with the clock time it was dispatched at.
pub struct Capture {
    pub clock: ManualClock,
    pub sent: Vec<(Timetag, Group)>,
    /// Time spent by every dispatch, for simulating a slow transport.
    pub cost: Duration,
}

impl Capture {
    pub fn new(clock: ManualClock) -> Self {
        Self {
            clock,
            sent: Vec::new(),
            cost: Duration::ZERO,
        }
    }

    pub fn times(&self) -> Vec<Timetag> {
        self.sent.iter().map(|&(at, _)| at).collect()
    }
}

impl Dispatch for Capture {
    fn dispatch(&mut self, group: &Group) -> io::Result<()> {
        self.sent.push((self.clock.now(), group.clone()));
        self.clock.advance(self.cost);
        Ok(())
    }
}

pub fn msg(address: &str, value: i32) -> RawMessage {
    RawMessage::new(address, "i", &value.to_be_bytes()).unwrap()
}

pub fn encode(groups: &[Group]) -> Vec<u8> {
    let mut writer = GroupWriter::new(Vec::new());
    for group in groups {
        writer.write_group(group).unwrap();
    }
    writer.into_inner()
}

#[track_caller]
pub fn assert_close(actual: Timetag, expected: Timetag) {
    let error = actual.diff_seconds(expected).abs();
    assert!(error < 1e-6, "{actual} is {error}s away from {expected}");
}
