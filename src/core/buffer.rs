//! # Buffer Cursors and the Bufferable Contract
//!
//! Sequential read/write views over payload bytes, and the save/restore
//! capability every payload value type implements.
//!
//! ## Wire conventions
//! - All multi-byte integers are big-endian.
//! - Strings are `[len: u16][len bytes of UTF-8]`. The length `0xFFFF` is a
//!   sentinel meaning *null* and is expressed as `Option<String>`; an empty
//!   string (`len 0`) is a different value from null.
//! - `Vec<T>` is `[count: u16][count elements]`.
//!
//! ## Failure reporting
//! Every failed read produces [`WireError::MalformedPayload`] carrying the
//! cursor position at the point of failure, so the connection layer can log
//! exactly which byte of a peer's payload was inconsistent.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Result, WireError};

/// Length-prefix sentinel for a null string.
pub const NULL_STRING_SENTINEL: u16 = u16::MAX;

/// A position-tracking read view over a byte buffer.
///
/// Reads advance the position; none of them over-read into bytes beyond the
/// buffer, and a short buffer yields an error carrying the current position.
#[derive(Debug)]
pub struct ReadCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ReadCursor<'a> {
    /// Create a cursor at the start of `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current position from the start of the buffer.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to read.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Whether all bytes have been consumed.
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.pos == self.buf.len()
    }

    /// Consume exactly `n` bytes and return them.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(WireError::malformed(
                self.pos,
                format!("need {n} bytes, {} remaining", self.remaining()),
            ));
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    /// Read one byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        let b = self.take(1)?;
        Ok(b[0])
    }

    /// Read a big-endian u16.
    pub fn read_u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    /// Read a big-endian u32.
    pub fn read_u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Read a big-endian u64.
    pub fn read_u64(&mut self) -> Result<u64> {
        let b = self.take(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(b);
        Ok(u64::from_be_bytes(raw))
    }
}

/// A growable write view producing one payload's bytes.
///
/// Writes are infallible for fixed-width values; length-prefixed values
/// validate that their length fits the prefix.
#[derive(Debug, Default)]
pub struct WriteCursor {
    buf: BytesMut,
}

impl WriteCursor {
    /// Create an empty cursor.
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(64),
        }
    }

    /// Bytes written so far.
    #[inline]
    pub fn position(&self) -> usize {
        self.buf.len()
    }

    /// View of the bytes written so far.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Finish writing and take the produced bytes.
    pub fn freeze(self) -> Bytes {
        self.buf.freeze()
    }

    /// Append raw bytes.
    pub fn put_slice(&mut self, bytes: &[u8]) {
        self.buf.put_slice(bytes);
    }

    /// Write one byte.
    pub fn put_u8(&mut self, v: u8) {
        self.buf.put_u8(v);
    }

    /// Write a big-endian u16.
    pub fn put_u16(&mut self, v: u16) {
        self.buf.put_u16(v);
    }

    /// Write a big-endian u32.
    pub fn put_u32(&mut self, v: u32) {
        self.buf.put_u32(v);
    }

    /// Write a big-endian u64.
    pub fn put_u64(&mut self, v: u64) {
        self.buf.put_u64(v);
    }
}

/// The serialize/restore capability attached to payload value types.
///
/// Composable: a packet struct implements `Bufferable` by saving and
/// restoring its fields in order. The contract is that `restore` consumes
/// exactly the bytes `save` wrote, so values pack back-to-back without
/// delimiters, and that `restore(save(v))` observably equals `v`.
///
/// ```
/// use game_protocol::core::buffer::{Bufferable, ReadCursor, WriteCursor};
/// use game_protocol::error::Result;
///
/// #[derive(Debug, PartialEq)]
/// struct ChatLine {
///     channel: u8,
///     text: Option<String>,
/// }
///
/// impl Bufferable for ChatLine {
///     fn save(&self, out: &mut WriteCursor) -> Result<()> {
///         self.channel.save(out)?;
///         self.text.save(out)
///     }
///
///     fn restore(cur: &mut ReadCursor<'_>) -> Result<Self> {
///         Ok(Self {
///             channel: u8::restore(cur)?,
///             text: Option::<String>::restore(cur)?,
///         })
///     }
/// }
///
/// # fn main() -> Result<()> {
/// let line = ChatLine { channel: 3, text: None };
/// let mut out = WriteCursor::new();
/// line.save(&mut out)?;
/// let bytes = out.freeze();
/// assert_eq!(ChatLine::restore(&mut ReadCursor::new(&bytes))?, line);
/// # Ok(())
/// # }
/// ```
pub trait Bufferable: Sized {
    /// Write this value's bytes to the cursor.
    fn save(&self, out: &mut WriteCursor) -> Result<()>;

    /// Reconstruct a value by reading exactly the bytes `save` wrote.
    fn restore(cur: &mut ReadCursor<'_>) -> Result<Self>;
}

macro_rules! int_bufferable {
    ($($ty:ty => $put:ident / $read:ident as $wide:ty),* $(,)?) => {
        $(
            impl Bufferable for $ty {
                fn save(&self, out: &mut WriteCursor) -> Result<()> {
                    out.$put(*self as $wide);
                    Ok(())
                }

                fn restore(cur: &mut ReadCursor<'_>) -> Result<Self> {
                    Ok(cur.$read()? as $ty)
                }
            }
        )*
    };
}

int_bufferable! {
    u8  => put_u8  / read_u8  as u8,
    i8  => put_u8  / read_u8  as u8,
    u16 => put_u16 / read_u16 as u16,
    i16 => put_u16 / read_u16 as u16,
    u32 => put_u32 / read_u32 as u32,
    i32 => put_u32 / read_u32 as u32,
    u64 => put_u64 / read_u64 as u64,
    i64 => put_u64 / read_u64 as u64,
}

impl Bufferable for f32 {
    fn save(&self, out: &mut WriteCursor) -> Result<()> {
        out.put_u32(self.to_bits());
        Ok(())
    }

    fn restore(cur: &mut ReadCursor<'_>) -> Result<Self> {
        Ok(f32::from_bits(cur.read_u32()?))
    }
}

impl Bufferable for f64 {
    fn save(&self, out: &mut WriteCursor) -> Result<()> {
        out.put_u64(self.to_bits());
        Ok(())
    }

    fn restore(cur: &mut ReadCursor<'_>) -> Result<Self> {
        Ok(f64::from_bits(cur.read_u64()?))
    }
}

impl Bufferable for bool {
    fn save(&self, out: &mut WriteCursor) -> Result<()> {
        out.put_u8(u8::from(*self));
        Ok(())
    }

    fn restore(cur: &mut ReadCursor<'_>) -> Result<Self> {
        let at = cur.position();
        match cur.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(WireError::malformed(
                at,
                format!("invalid bool byte {other:#04x}"),
            )),
        }
    }
}

impl Bufferable for String {
    fn save(&self, out: &mut WriteCursor) -> Result<()> {
        let bytes = self.as_bytes();
        if bytes.len() >= NULL_STRING_SENTINEL as usize {
            return Err(WireError::malformed(
                out.position(),
                format!("string of {} bytes exceeds the u16 length prefix", bytes.len()),
            ));
        }
        out.put_u16(bytes.len() as u16);
        out.put_slice(bytes);
        Ok(())
    }

    fn restore(cur: &mut ReadCursor<'_>) -> Result<Self> {
        let at = cur.position();
        let len = cur.read_u16()?;
        if len == NULL_STRING_SENTINEL {
            return Err(WireError::malformed(
                at,
                "null string where a value is required",
            ));
        }
        let at = cur.position();
        let raw = cur.take(len as usize)?;
        String::from_utf8(raw.to_vec())
            .map_err(|e| WireError::malformed(at + e.utf8_error().valid_up_to(), "invalid UTF-8"))
    }
}

/// Nullable string. `None` serializes to the [`NULL_STRING_SENTINEL`] length
/// and restores to `None`, never to an empty string, and never by reading
/// past the sentinel.
impl Bufferable for Option<String> {
    fn save(&self, out: &mut WriteCursor) -> Result<()> {
        match self {
            Some(s) => s.save(out),
            None => {
                out.put_u16(NULL_STRING_SENTINEL);
                Ok(())
            }
        }
    }

    fn restore(cur: &mut ReadCursor<'_>) -> Result<Self> {
        let at = cur.position();
        let len = cur.read_u16()?;
        if len == NULL_STRING_SENTINEL {
            return Ok(None);
        }
        let raw = cur.take(len as usize)?;
        let s = String::from_utf8(raw.to_vec())
            .map_err(|e| WireError::malformed(at + 2 + e.utf8_error().valid_up_to(), "invalid UTF-8"))?;
        Ok(Some(s))
    }
}

impl<T: Bufferable> Bufferable for Vec<T> {
    fn save(&self, out: &mut WriteCursor) -> Result<()> {
        if self.len() > u16::MAX as usize {
            return Err(WireError::malformed(
                out.position(),
                format!("sequence of {} elements exceeds the u16 count prefix", self.len()),
            ));
        }
        out.put_u16(self.len() as u16);
        for item in self {
            item.save(out)?;
        }
        Ok(())
    }

    fn restore(cur: &mut ReadCursor<'_>) -> Result<Self> {
        let count = cur.read_u16()? as usize;
        let mut items = Vec::with_capacity(count.min(cur.remaining()));
        for _ in 0..count {
            items.push(T::restore(cur)?);
        }
        Ok(items)
    }
}
