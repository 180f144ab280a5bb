//! Opaque OSC messages.

use serde::{Deserialize, Serialize};

/// Reasons an encoded message is rejected by [`RawMessage::decode`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MessageError {
    #[error("empty message")]
    Empty,
    #[error("string is not NUL terminated")]
    Unterminated,
    #[error("string padding runs past the end of the message")]
    Truncated,
    #[error("string is not valid UTF-8")]
    NotUtf8,
    #[error("address pattern {0:?} does not start with '/'")]
    BadAddress(String),
    #[error("type tag string {0:?} does not start with ','")]
    BadTypeTags(String),
    #[error("{0:?} contains a NUL byte")]
    InteriorNul(String),
}

/// An encoded OSC message, along with its address pattern.
///
/// The payload always holds the complete message as it travels on the wire
/// (address pattern, type tags and arguments), byte for byte.
///
/// Only the payload is serialized. Deserializing goes through
/// [`decode`](Self::decode), so the address always matches the payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct RawMessage {
    address: String,
    payload: Vec<u8>,
}

impl RawMessage {
    /// Checks that `payload` looks like an OSC message and extracts its address.
    ///
    /// Only the address pattern and the leading `,` of the type tag string are
    /// validated, argument bytes are kept as they are. A message with no type tag
    /// string at all is accepted, as some older senders omit it.
    pub fn decode(payload: impl Into<Vec<u8>>) -> Result<Self, MessageError> {
        let payload = payload.into();

        if payload.is_empty() {
            return Err(MessageError::Empty);
        }

        let (address, rem) = split_osc_string(&payload)?;

        if !address.starts_with('/') {
            return Err(MessageError::BadAddress(address.to_owned()));
        }

        if !rem.is_empty() {
            let (type_tags, _args) = split_osc_string(rem)?;

            if !type_tags.starts_with(',') {
                return Err(MessageError::BadTypeTags(type_tags.to_owned()));
            }
        }

        let address = address.to_owned();

        Ok(Self { address, payload })
    }

    /// Encodes a message from its address, type tags (without the leading `,`)
    /// and already encoded argument bytes.
    pub fn new(address: &str, type_tags: &str, args: &[u8]) -> Result<Self, MessageError> {
        if !address.starts_with('/') {
            return Err(MessageError::BadAddress(address.to_owned()));
        }

        for s in [address, type_tags] {
            if s.contains('\0') {
                return Err(MessageError::InteriorNul(s.to_owned()));
            }
        }

        let mut payload = Vec::with_capacity(
            padded_len(address.len()) + padded_len(type_tags.len() + 1) + args.len(),
        );

        push_osc_string(&mut payload, address.as_bytes());

        let mut tags = Vec::with_capacity(type_tags.len() + 1);
        tags.push(b',');
        tags.extend_from_slice(type_tags.as_bytes());
        push_osc_string(&mut payload, &tags);

        payload.extend_from_slice(args);

        Ok(Self {
            address: address.to_owned(),
            payload,
        })
    }

    #[inline(always)]
    pub fn address(&self) -> &str {
        &self.address
    }

    #[inline(always)]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    #[inline(always)]
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    /// Length of the encoded message, in bytes.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Always `false` for messages built through [`decode`](Self::decode) or
    /// [`new`](Self::new).
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

impl TryFrom<Vec<u8>> for RawMessage {
    type Error = MessageError;

    #[inline(always)]
    fn try_from(payload: Vec<u8>) -> Result<Self, Self::Error> {
        Self::decode(payload)
    }
}

impl From<RawMessage> for Vec<u8> {
    #[inline(always)]
    fn from(message: RawMessage) -> Self {
        message.into_payload()
    }
}

/// OSC strings are NUL terminated and zero padded to a multiple of 4 bytes.
#[inline(always)]
const fn padded_len(len: usize) -> usize {
    (len + 4) & !3
}

fn push_osc_string(buf: &mut Vec<u8>, s: &[u8]) {
    let start = buf.len();
    buf.extend_from_slice(s);
    buf.resize(start + padded_len(s.len()), 0);
}

/// Splits an OSC string off the front of `bytes`, returning it and the bytes
/// following its padding.
fn split_osc_string(bytes: &[u8]) -> Result<(&str, &[u8]), MessageError> {
    let len = bytes
        .iter()
        .position(|&b| b == 0)
        .ok_or(MessageError::Unterminated)?;

    let (s, rem) = bytes
        .split_at_checked(padded_len(len))
        .ok_or(MessageError::Truncated)?;

    let s = core::str::from_utf8(&s[..len]).map_err(|_| MessageError::NotUtf8)?;

    Ok((s, rem))
}
