//! Stored streams of timestamped message groups.
//!
//! A stream is the concatenation of group records, each one being the bundle wire
//! form described in `oscreplay_proto`. There is no file header, index or
//! trailer: streams are appended to by the recorder, one flushed group at a time,
//! and read strictly front to back by the player. This makes them usable through
//! pipes as well as regular files.
//!
//! ## Reading
//!
//! [`GroupReader`] fails soft. Damaged data ends the stream (or, for a single bad
//! message, is skipped) with a logged warning rather than an error, since
//! recordings are assumed trustworthy and a partial replay beats no replay.
//!
//! ## Writing
//!
//! [`GroupWriter`] flushes after every group, bounding what an abrupt termination
//! can lose to the group being written.

pub mod reader;
pub mod writer;

pub use reader::{GroupReader, ReadStats};
pub use writer::{GroupWriter, WriteStats};
