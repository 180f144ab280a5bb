//! Data model for recording and replaying timestamped OSC message streams.
//!
//! This crate defines the values exchanged between the recorder, the stream
//! codec and the player, independently of any file or socket.
//!
//! ## Time
//!
//! Every group of messages carries a [`Timetag`]: a 64-bit fixed-point value made
//! of 32 bits of whole seconds and 32 bits of fractional seconds, counted from the
//! OSC epoch (1900-01-01). The reserved value [`Timetag::IMMEDIATE`] means
//! "dispatch now".
//!
//! All arithmetic on timetags is exact modulo 2^32 per field, and carries (or
//! borrows) between the fraction and the seconds exactly once per operation.
//!
//! ## Messages and groups
//!
//! A [`RawMessage`] is an encoded OSC message kept as opaque bytes, along with the
//! address pattern extracted from it. Argument bytes are never interpreted here.
//!
//! A [`Group`] is an ordered list of messages sharing one timestamp. Its wire form
//! is an OSC bundle:
//!
//! ```text
//! "#bundle\0" | seconds (u32 BE) | fraction (u32 BE) | ([len: u32 BE][message])*
//! ```
//!
//! which is also exactly one record of a stored stream.
//!
//! The types in this crate implement `serde`'s `Serialize` and `Deserialize`
//! traits, for the user to conveniently plug into other `serde` backends.

pub mod group;
pub mod message;
pub mod packet;
pub mod timetag;

pub use group::Group;
pub use message::{MessageError, RawMessage};
pub use packet::{BUNDLE_MARKER, GROUP_HEADER_SIZE, Packet, PacketError};
pub use timetag::Timetag;
