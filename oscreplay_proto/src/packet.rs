//! Bundle wire form, shared by stored streams and datagrams.

use crate::{Group, Timetag};

/// Literal tag opening every group.
pub const BUNDLE_MARKER: [u8; 8] = *b"#bundle\0";

/// Size of the marker and timestamp preceding a group's messages.
pub const GROUP_HEADER_SIZE: usize = BUNDLE_MARKER.len() + Timetag::SIZE;

/// Messages larger than this are treated as corrupt framing.
pub const MAX_MESSAGE_LEN: usize = 16 << 20;

/// Structural errors in the bundle framing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PacketError {
    #[error("packet of {0} bytes is shorter than a group header")]
    TruncatedHeader(usize),
    #[error("missing \"#bundle\" marker")]
    BadMarker,
    #[error("element length field is cut short")]
    TruncatedLength,
    #[error("element declares {declared} bytes, only {available} available")]
    TruncatedElement { declared: usize, available: usize },
    #[error("element of {0} bytes exceeds the size limit")]
    Oversized(usize),
}

/// Returns `true` if `packet` starts with the bundle marker.
#[inline(always)]
pub fn is_bundle(packet: &[u8]) -> bool {
    packet.starts_with(&BUNDLE_MARKER)
}

/// Returns `true` if `byte` could be the start of a bundle marker.
///
/// Used for one-byte look-ahead when scanning a stream.
#[inline(always)]
pub fn starts_bundle_marker(byte: u8) -> bool {
    byte == BUNDLE_MARKER[0]
}

/// Encodes a message length prefix.
#[inline]
pub fn length_prefix(len: usize) -> Result<[u8; 4], PacketError> {
    if len > MAX_MESSAGE_LEN {
        return Err(PacketError::Oversized(len));
    }

    // MAX_MESSAGE_LEN fits in a u32
    Ok((len as u32).to_be_bytes())
}

/// Writes the wire form of `group` into `w`, returning the number of bytes written.
///
/// Nothing is written if one of the messages is oversized.
pub fn write_group(group: &Group, w: &mut impl std::io::Write) -> std::io::Result<usize> {
    let prefixes = group
        .messages
        .iter()
        .map(|m| length_prefix(m.len()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

    let mut header = arrayvec::ArrayVec::<u8, GROUP_HEADER_SIZE>::new_const();

    header.try_extend_from_slice(&BUNDLE_MARKER).unwrap();
    header
        .try_extend_from_slice(&group.timestamp.to_bytes())
        .unwrap();

    assert_eq!(header.len(), header.capacity(), "ERROR: missing fields");

    w.write_all(&header)?;

    for (message, prefix) in group.messages.iter().zip(prefixes) {
        w.write_all(&prefix)?;
        w.write_all(message.payload())?;
    }

    Ok(group.encoded_len())
}

/// Clears `buf`, then encodes `group` into it.
#[inline]
pub fn encode_group(group: &Group, buf: &mut Vec<u8>) -> std::io::Result<usize> {
    buf.clear();
    write_group(group, buf)
}

/// A decoded datagram.
#[derive(Debug, Clone)]
pub enum Packet<'a> {
    /// A single encoded message, not yet validated.
    Message(&'a [u8]),
    /// A bundle's timestamp and elements. Each element is itself a packet.
    Bundle(Timetag, Elements<'a>),
}

impl<'a> Packet<'a> {
    /// Classifies `bytes` as a bundle or a message.
    ///
    /// Bundle elements are left undecoded, callers recurse through
    /// [`Packet::decode`] as they walk them.
    pub fn decode(bytes: &'a [u8]) -> Result<Self, PacketError> {
        if starts_bundle_marker(*bytes.first().ok_or(PacketError::TruncatedHeader(0))?) {
            let (timestamp, elements) = split_bundle(bytes)?;
            Ok(Self::Bundle(timestamp, elements))
        } else {
            Ok(Self::Message(bytes))
        }
    }
}

/// Splits a bundle into its timestamp and an iterator over its raw elements.
///
/// Elements may themselves be bundles.
pub fn split_bundle(packet: &[u8]) -> Result<(Timetag, Elements<'_>), PacketError> {
    let (&header, rem) = packet
        .split_first_chunk::<GROUP_HEADER_SIZE>()
        .ok_or(PacketError::TruncatedHeader(packet.len()))?;

    let (marker, timestamp) = split_group_header(&header);

    if marker != BUNDLE_MARKER {
        return Err(PacketError::BadMarker);
    }

    Ok((timestamp, Elements { rem }))
}

/// Splits a group header into its (unchecked) marker and its timestamp.
#[inline]
pub fn split_group_header(header: &[u8; GROUP_HEADER_SIZE]) -> (&[u8], Timetag) {
    let (marker, timestamp) = header.split_at(BUNDLE_MARKER.len());

    let mut timestamp_bytes = [0; Timetag::SIZE];
    timestamp_bytes.copy_from_slice(timestamp);

    (marker, Timetag::from_bytes(timestamp_bytes))
}

/// Iterator over the length-prefixed elements of a bundle.
///
/// Stops after yielding the first framing error.
#[derive(Debug, Clone)]
pub struct Elements<'a> {
    rem: &'a [u8],
}

impl<'a> Iterator for Elements<'a> {
    type Item = Result<&'a [u8], PacketError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rem.is_empty() {
            return None;
        }

        let res = self.split_element();

        if res.is_err() {
            self.rem = &[];
        }

        Some(res)
    }
}

impl<'a> Elements<'a> {
    #[inline]
    fn split_element(&mut self) -> Result<&'a [u8], PacketError> {
        let (&len, rem) = self
            .rem
            .split_first_chunk()
            .ok_or(PacketError::TruncatedLength)?;

        let len = usize::try_from(u32::from_be_bytes(len)).unwrap_or(usize::MAX);

        if len > MAX_MESSAGE_LEN {
            return Err(PacketError::Oversized(len));
        }

        let (element, rem) = rem
            .split_at_checked(len)
            .ok_or(PacketError::TruncatedElement {
                declared: len,
                available: rem.len(),
            })?;

        self.rem = rem;

        Ok(element)
    }
}
