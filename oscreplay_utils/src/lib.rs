//! Utilities for parsing sequential byte streams.
//!
//! Recorded streams are read strictly front to back, from files or pipes, with
//! no seeking. The [`ByteCursor`] in this crate buffers such a source and offers
//! bounds-checked reads along with single byte look-ahead, so framing code never
//! does manual index arithmetic over raw buffers.

use std::io;

const READ_CHUNK: usize = 8 * 1024;

/// Result of [`ByteCursor::read_exact`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chunk<'a> {
    /// All the requested bytes.
    Full(&'a [u8]),
    /// The source ended after this many bytes. They have been consumed.
    Short(usize),
}

/// A cursor-like reader over a growable buffer, filled on demand from a
/// [`std::io::Read`] source.
///
/// # Purpose
///
/// Conceptually similar to [`std::io::BufReader`], but reads are all-or-nothing
/// and consumed bytes can be handed back with [`push_back`](Self::push_back),
/// which allows peeking at the next byte of a non-seekable source.
pub struct ByteCursor<R> {
    inner: R,
    buf: Vec<u8>,
    pos: usize,
    consumed: u64,
    eof: bool,
    // invariants: pos <= buf.len()
    //             buf[pos..] are the bytes not yet consumed, in order
}

impl<R: io::Read> ByteCursor<R> {
    #[inline(always)]
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: Vec::new(),
            pos: 0,
            consumed: 0,
            eof: false,
        }
    }

    /// Number of bytes consumed so far, net of pushed back bytes.
    #[inline(always)]
    pub const fn position(&self) -> u64 {
        self.consumed
    }

    #[inline(always)]
    fn available(&self) -> usize {
        self.buf.len().strict_sub(self.pos)
    }

    /// Reads from the source until at least `n` bytes are buffered, or the source ends.
    fn fill(&mut self, n: usize) -> io::Result<()> {
        if self.available() >= n {
            return Ok(());
        }

        // drop consumed bytes before growing
        if self.pos > 0 {
            self.buf.drain(..self.pos);
            self.pos = 0;
        }

        while self.buf.len() < n && !self.eof {
            let start = self.buf.len();
            let want = n.strict_sub(start).max(READ_CHUNK);
            self.buf.resize(start.strict_add(want), 0);

            let res = self.inner.read(&mut self.buf[start..]);

            let read = match res {
                Ok(0) => {
                    self.eof = true;
                    0
                }
                Ok(read) => read,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => 0,
                Err(e) => {
                    self.buf.truncate(start);
                    return Err(e);
                }
            };

            self.buf.truncate(start.strict_add(read));
        }

        Ok(())
    }

    /// Consumes exactly `n` bytes.
    ///
    /// If the source ends first, whatever was left is consumed and discarded,
    /// and its length is reported as [`Chunk::Short`].
    pub fn read_exact(&mut self, n: usize) -> io::Result<Chunk<'_>> {
        self.fill(n)?;

        let available = self.available();

        if available < n {
            self.pos = self.buf.len();
            self.consumed = self.consumed.strict_add(available as u64);
            return Ok(Chunk::Short(available));
        }

        let start = self.pos;
        self.pos = start.strict_add(n);
        self.consumed = self.consumed.strict_add(n as u64);

        Ok(Chunk::Full(&self.buf[start..self.pos]))
    }

    /// Consumes a single byte, `None` at the end of the source.
    #[inline]
    pub fn read_byte(&mut self) -> io::Result<Option<u8>> {
        Ok(match self.read_exact(1)? {
            Chunk::Full(&[byte]) => Some(byte),
            _ => None,
        })
    }

    /// Returns the next byte without consuming it, `None` at the end of the source.
    #[inline]
    pub fn peek_byte(&mut self) -> io::Result<Option<u8>> {
        let byte = self.read_byte()?;

        if let Some(byte) = byte {
            self.push_back(byte);
        }

        Ok(byte)
    }

    /// Makes `byte` the next byte to be read.
    pub fn push_back(&mut self, byte: u8) {
        if let Some(pos) = self.pos.checked_sub(1) {
            self.pos = pos;
            self.buf[pos] = byte;
        } else {
            self.buf.insert(0, byte);
        }

        self.consumed = self.consumed.saturating_sub(1);
    }

    /// Returns `true` once every byte of the source has been consumed.
    #[inline]
    pub fn is_exhausted(&mut self) -> io::Result<bool> {
        self.fill(1)?;
        Ok(self.available() == 0)
    }
}
