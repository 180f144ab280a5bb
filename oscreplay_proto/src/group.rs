//! Timestamped groups of messages.

use crate::{RawMessage, Timetag};
use serde::{Deserialize, Serialize};

/// An ordered sequence of messages dispatched together at one logical instant.
///
/// The timestamp applies to every message in the group. Message order is
/// significant and is preserved through storage and replay.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Group {
    pub timestamp: Timetag,
    pub messages: Vec<RawMessage>,
}

impl Group {
    /// Creates an empty group.
    #[inline(always)]
    pub const fn new(timestamp: Timetag) -> Self {
        Self {
            timestamp,
            messages: Vec::new(),
        }
    }

    #[inline(always)]
    pub fn with_messages(
        timestamp: Timetag,
        messages: impl IntoIterator<Item = RawMessage>,
    ) -> Self {
        Self {
            timestamp,
            messages: messages.into_iter().collect(),
        }
    }

    #[inline(always)]
    pub fn push(&mut self, message: RawMessage) {
        self.messages.push(message);
    }

    /// Number of messages in the group.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Size of the group's wire form, in bytes.
    pub fn encoded_len(&self) -> usize {
        self.messages
            .iter()
            .map(|m| size_of::<u32>() + m.len())
            .fold(crate::GROUP_HEADER_SIZE, usize::strict_add)
    }
}
