//! # Offpack
//!
//! A small, bounded TLV serialization layer for message-passing boundaries.
//!
//! ## Format
//!
//! - **Scalars**: `[Tag: 1b][Data: N]`
//! - **Blobs**: `[Tag: 1b][Len: 4b][Data: Len]`
//! - **Containers**: `[Tag: 1b][Len: 4b][Body: Len]`
//!
//! All integers are Little-Endian. The `[Tag][Length?][Value]` structure lets
//! a decoder skip fields it does not recognize, so frame headers can grow
//! without breaking older readers.
//!
//! The `Encoder` tracks open container scopes explicitly and back-patches
//! length headers on close. The `Decoder` is a zero-copy, bounds-checked view.

#[cfg(test)]
mod tests;

/// Offpack serialization and deserialization errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Byte does not correspond to a valid offpack `Tag`.
    InvalidTag(u8),
    /// String data is not valid UTF-8.
    InvalidUtf8,
    /// Closing a scope that does not match the active scope stack.
    ScopeMismatch { expected: Scope, actual: Scope },
    /// Attempted to close a scope when only the Root remains.
    ScopeUnderflow,
    /// Attempted to finalize the buffer with open scopes.
    ScopeStillOpen,
    /// Buffer exhausted while reading.
    UnexpectedEnd,
    /// Blob or container length exceeds `u32::MAX`.
    BlobTooLarge(usize),
    /// Attempted to write more than one item into a strict scope (Result/Variant).
    TooManyItems(Scope),
    /// Attempted to close a strict scope (Result/Variant) without a payload.
    EmptyScope(Scope),
    /// Attempted to write a non-Variant directly into a Map.
    InvalidMapEntry,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidTag(b) => write!(f, "Invalid tag byte: {:#04x}", b),
            Error::ScopeMismatch { expected, actual } => {
                write!(f, "Scope mismatch: expected {:?}, found {:?}", expected, actual)
            }
            Error::TooManyItems(s) => write!(f, "Too many items in scope {:?}; expected exactly 1", s),
            Error::EmptyScope(s) => write!(f, "Empty scope {:?}; expected exactly 1 item", s),
            _ => write!(f, "{:?}", self),
        }
    }
}

impl std::error::Error for Error {}

/// Specialized `Result` for offpack operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Identifies the type of the encoded value.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    // Fixed-width scalars
    BoolFalse = 0x01,
    BoolTrue = 0x02,
    U64 = 0x03,
    S64 = 0x04,
    F64 = 0x05,

    /// Unit / Void.
    Unit = 0x06,

    // Blobs (Tag + u32 Len + Bytes)
    String = 0x10,

    // Containers (Tag + u32 Len + Body)
    List = 0x20,
    Map = 0x21,
    Variant = 0x22,
    ResultOk = 0x30,
    ResultErr = 0x31,
}

impl Tag {
    /// Returns the Tag variant for a given byte, or `None` if invalid.
    pub fn from_u8(b: u8) -> Option<Self> {
        match b {
            0x01 => Some(Tag::BoolFalse),
            0x02 => Some(Tag::BoolTrue),
            0x03 => Some(Tag::U64),
            0x04 => Some(Tag::S64),
            0x05 => Some(Tag::F64),
            0x06 => Some(Tag::Unit),
            0x10 => Some(Tag::String),
            0x20 => Some(Tag::List),
            0x21 => Some(Tag::Map),
            0x22 => Some(Tag::Variant),
            0x30 => Some(Tag::ResultOk),
            0x31 => Some(Tag::ResultErr),
            _ => None,
        }
    }
}

/// Internal state tracking for the `Encoder` stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// The virtual root; allows any item.
    Root,
    /// Ordered sequence; allows any number of items.
    List,
    /// Key-Value container; strictly allows only `Tag::Variant` items.
    Map,
    /// Strict container; allows exactly one item.
    Result,
    /// Strict container; allows exactly one item (the payload) after the name.
    Variant,
}

/// An active container scope on the `Encoder` stack.
struct Frame {
    start: usize,
    scope: Scope,
    count: usize,
}

/// A bounded, state-machine driven encoder.
///
/// # Structural Invariants
///
/// All write methods validate the operation against the current `Scope`:
///
/// 1. **Map scopes**: only `Tag::Variant` items may be written.
/// 2. **Strict scopes (Result, Variant)**: exactly one payload item must be
///    written before closing.
/// 3. **Root scope**: the encoder must end in the Root scope to finalize.
pub struct Encoder {
    buf: Vec<u8>,
    /// Bottom is always `Scope::Root`.
    stack: Vec<Frame>,
}

impl Encoder {
    /// Creates a new encoder with default capacity.
    pub fn new() -> Self {
        let mut enc = Self {
            buf: Vec::with_capacity(256),
            stack: Vec::with_capacity(8),
        };
        enc.stack.push(Frame { start: 0, scope: Scope::Root, count: 0 });
        enc
    }

    /// Consumes the encoder and returns the final byte vector.
    ///
    /// # Errors
    /// Returns `Error::ScopeStillOpen` if any container is still open.
    pub fn into_bytes(self) -> Result<Vec<u8>> {
        if self.stack.len() > 1 {
            return Err(Error::ScopeStillOpen);
        }
        Ok(self.buf)
    }

    fn current_frame(&mut self) -> &mut Frame {
        self.stack.last_mut().expect("encoder stack always holds the Root frame")
    }

    fn check_write(&mut self, tag: Tag) -> Result<()> {
        let frame = self.current_frame();
        match frame.scope {
            Scope::Root | Scope::List => Ok(()),
            Scope::Map => {
                if tag != Tag::Variant {
                    Err(Error::InvalidMapEntry)
                } else {
                    Ok(())
                }
            }
            Scope::Result | Scope::Variant => {
                if frame.count >= 1 {
                    Err(Error::TooManyItems(frame.scope))
                } else {
                    Ok(())
                }
            }
        }
    }

    fn on_item_written(&mut self) {
        self.current_frame().count += 1;
    }

    fn write_tag(&mut self, tag: Tag) -> Result<()> {
        self.check_write(tag)?;
        self.buf.push(tag as u8);
        Ok(())
    }

    fn begin_scope(&mut self, tag: Tag, scope: Scope) -> Result<()> {
        self.check_write(tag)?;

        self.buf.push(tag as u8);
        self.buf.extend_from_slice(&[0, 0, 0, 0]); // Length placeholder

        self.stack.push(Frame {
            start: self.buf.len(), // Body starts after Length
            scope,
            count: 0,
        });
        Ok(())
    }

    fn end_scope(&mut self, expected: Scope) -> Result<()> {
        if self.stack.len() <= 1 {
            return Err(Error::ScopeUnderflow);
        }

        {
            let frame = self.current_frame();
            if frame.scope != expected {
                return Err(Error::ScopeMismatch { expected, actual: frame.scope });
            }
            match frame.scope {
                Scope::Result | Scope::Variant => {
                    if frame.count == 0 {
                        return Err(Error::EmptyScope(frame.scope));
                    }
                }
                _ => {}
            }
        }

        // Pop and patch the length header.
        let frame = self.stack.pop().expect("stack depth checked above");
        let body_len = self.buf.len() - frame.start;

        if body_len > u32::MAX as usize {
            return Err(Error::BlobTooLarge(body_len));
        }

        let len_bytes = (body_len as u32).to_le_bytes();
        let len_pos = frame.start - 4;
        self.buf[len_pos..frame.start].copy_from_slice(&len_bytes);

        self.on_item_written();
        Ok(())
    }

    /// Encodes a boolean value.
    pub fn bool(&mut self, v: bool) -> Result<()> {
        self.write_tag(if v { Tag::BoolTrue } else { Tag::BoolFalse })?;
        self.on_item_written();
        Ok(())
    }

    /// Encodes an unsigned 64-bit integer (LE).
    pub fn u64(&mut self, v: u64) -> Result<()> {
        self.write_tag(Tag::U64)?;
        self.buf.extend_from_slice(&v.to_le_bytes());
        self.on_item_written();
        Ok(())
    }

    /// Encodes a signed 64-bit integer (LE).
    pub fn s64(&mut self, v: i64) -> Result<()> {
        self.write_tag(Tag::S64)?;
        self.buf.extend_from_slice(&v.to_le_bytes());
        self.on_item_written();
        Ok(())
    }

    /// Encodes a 64-bit float (LE bit pattern, lossless).
    pub fn f64(&mut self, v: f64) -> Result<()> {
        self.write_tag(Tag::F64)?;
        self.buf.extend_from_slice(&v.to_le_bytes());
        self.on_item_written();
        Ok(())
    }

    /// Encodes Unit `()`.
    pub fn unit(&mut self) -> Result<()> {
        self.write_tag(Tag::Unit)?;
        self.on_item_written();
        Ok(())
    }

    /// Encodes a UTF-8 string blob.
    pub fn str(&mut self, v: &str) -> Result<()> {
        let len = v.len();
        if len > u32::MAX as usize {
            return Err(Error::BlobTooLarge(len));
        }
        self.write_tag(Tag::String)?;
        self.buf.extend_from_slice(&(len as u32).to_le_bytes());
        self.buf.extend_from_slice(v.as_bytes());
        self.on_item_written();
        Ok(())
    }

    /// Begins a List container. Must be closed via `list_end()`.
    pub fn list_begin(&mut self) -> Result<()> {
        self.begin_scope(Tag::List, Scope::List)
    }

    /// Ends a List container.
    pub fn list_end(&mut self) -> Result<()> {
        self.end_scope(Scope::List)
    }

    /// Begins a Map container.
    ///
    /// # Invariants
    /// - Must be closed via `map_end()`.
    /// - **Strict:** only `variant_begin()` (key/value pair) is allowed as a
    ///   direct child.
    pub fn map_begin(&mut self) -> Result<()> {
        self.begin_scope(Tag::Map, Scope::Map)
    }

    /// Ends a Map container.
    pub fn map_end(&mut self) -> Result<()> {
        self.end_scope(Scope::Map)
    }

    /// Begins a `Result::Ok` container. Requires exactly one payload item.
    pub fn result_ok_begin(&mut self) -> Result<()> {
        self.begin_scope(Tag::ResultOk, Scope::Result)
    }

    /// Ends a `Result::Ok` container.
    pub fn result_ok_end(&mut self) -> Result<()> {
        self.end_scope(Scope::Result)
    }

    /// Begins a `Result::Err` container. Requires exactly one payload item.
    pub fn result_err_begin(&mut self) -> Result<()> {
        self.begin_scope(Tag::ResultErr, Scope::Result)
    }

    /// Ends a `Result::Err` container.
    pub fn result_err_end(&mut self) -> Result<()> {
        self.end_scope(Scope::Result)
    }

    /// Begins a Variant (named payload). Encodes the name immediately.
    ///
    /// # Invariants
    /// - Must be closed via `variant_end()`.
    /// - **Strict:** requires exactly one payload item after this call.
    pub fn variant_begin(&mut self, name: &str) -> Result<()> {
        self.begin_scope(Tag::Variant, Scope::Variant)?;
        // Write the name (metadata, not payload).
        self.str(name)?;
        // Reset count; the caller must write exactly one payload item next.
        self.current_frame().count = 0;
        Ok(())
    }

    /// Ends a Variant.
    pub fn variant_end(&mut self) -> Result<()> {
        self.end_scope(Scope::Variant)
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

/// A zero-copy, bounds-checked cursor over a byte slice.
///
/// Reading advances the internal cursor. Container reads return new `Decoder`
/// instances restricted to the container's body.
///
/// # Errors
/// All read operations return `Error::UnexpectedEnd` if the buffer is exhausted.
#[derive(Debug, Clone)]
pub struct Decoder<'a> {
    buf: &'a [u8],
}

impl<'a> Decoder<'a> {
    /// Creates a decoder over the slice.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    /// Returns the remaining bytes in the view.
    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    /// Peeks the next Tag without advancing.
    pub fn peek_tag(&self) -> Result<Tag> {
        if self.buf.is_empty() {
            return Err(Error::UnexpectedEnd);
        }
        Tag::from_u8(self.buf[0]).ok_or(Error::InvalidTag(self.buf[0]))
    }

    fn consume(&mut self, n: usize) -> Result<()> {
        if n > self.buf.len() {
            return Err(Error::UnexpectedEnd);
        }
        self.buf = &self.buf[n..];
        Ok(())
    }

    fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.buf.len() {
            return Err(Error::UnexpectedEnd);
        }
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    fn read_len(&mut self) -> Result<usize> {
        let bytes = self.read_bytes(4)?;
        let mut raw = [0u8; 4];
        raw.copy_from_slice(bytes);
        Ok(u32::from_le_bytes(raw) as usize)
    }

    fn read_slice(&mut self, n: usize) -> Result<Decoder<'a>> {
        let bytes = self.read_bytes(n)?;
        Ok(Decoder::new(bytes))
    }

    fn check_tag(&mut self, expected: Tag) -> Result<()> {
        let tag = self.peek_tag()?;
        if tag == expected {
            self.consume(1)
        } else {
            Err(Error::InvalidTag(tag as u8))
        }
    }

    /// Skips the next item and its nested children.
    pub fn skip(&mut self) -> Result<()> {
        let tag = self.peek_tag()?;
        self.consume(1)?;

        match tag {
            Tag::BoolTrue | Tag::BoolFalse | Tag::Unit => {}
            Tag::U64 | Tag::S64 | Tag::F64 => {
                self.consume(8)?;
            }
            // Variable length: [Length: u32][Body: Length]
            Tag::String | Tag::List | Tag::Map | Tag::Variant | Tag::ResultOk | Tag::ResultErr => {
                let len = self.read_len()?;
                self.consume(len)?;
            }
        }
        Ok(())
    }

    /// Decodes a bool.
    pub fn bool(&mut self) -> Result<bool> {
        let tag = self.peek_tag()?;
        match tag {
            Tag::BoolTrue => {
                self.consume(1)?;
                Ok(true)
            }
            Tag::BoolFalse => {
                self.consume(1)?;
                Ok(false)
            }
            _ => Err(Error::InvalidTag(tag as u8)),
        }
    }

    /// Decodes u64 (LE).
    pub fn u64(&mut self) -> Result<u64> {
        self.check_tag(Tag::U64)?;
        let bytes = self.read_bytes(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Ok(u64::from_le_bytes(raw))
    }

    /// Decodes s64 (LE).
    pub fn s64(&mut self) -> Result<i64> {
        self.check_tag(Tag::S64)?;
        let bytes = self.read_bytes(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Ok(i64::from_le_bytes(raw))
    }

    /// Decodes f64 (LE bit pattern).
    pub fn f64(&mut self) -> Result<f64> {
        self.check_tag(Tag::F64)?;
        let bytes = self.read_bytes(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Ok(f64::from_le_bytes(raw))
    }

    /// Decodes Unit `()`.
    pub fn unit(&mut self) -> Result<()> {
        self.check_tag(Tag::Unit)
    }

    /// Decodes a string slice (UTF-8).
    pub fn str(&mut self) -> Result<&'a str> {
        self.check_tag(Tag::String)?;
        let len = self.read_len()?;
        let bytes = self.read_bytes(len)?;
        str::from_utf8(bytes).map_err(|_| Error::InvalidUtf8)
    }

    fn enter_container(&mut self, expected: Tag) -> Result<Decoder<'a>> {
        self.check_tag(expected)?;
        let len = self.read_len()?;
        self.read_slice(len)
    }

    /// Decodes a List into an iterator.
    pub fn list(&mut self) -> Result<ListIter<'a>> {
        Ok(ListIter { dec: self.enter_container(Tag::List)? })
    }

    /// Decodes a Map into an iterator.
    pub fn map(&mut self) -> Result<MapIter<'a>> {
        Ok(MapIter { dec: self.enter_container(Tag::Map)? })
    }

    /// Decodes a Result.
    ///
    /// Returns `Ok(Decoder)` or `Err(Decoder)` for the respective payloads.
    pub fn result(&mut self) -> Result<std::result::Result<Decoder<'a>, Decoder<'a>>> {
        let tag = self.peek_tag()?;
        match tag {
            Tag::ResultOk => Ok(Ok(self.enter_container(Tag::ResultOk)?)),
            Tag::ResultErr => Ok(Err(self.enter_container(Tag::ResultErr)?)),
            _ => Err(Error::InvalidTag(tag as u8)),
        }
    }

    /// Decodes a Variant.
    ///
    /// Returns `(Name, PayloadDecoder)`.
    pub fn variant(&mut self) -> Result<(&'a str, Decoder<'a>)> {
        let mut inner = self.enter_container(Tag::Variant)?;
        let name = inner.str()?;
        Ok((name, inner))
    }
}

/// Iterator for items within a List.
#[derive(Debug)]
pub struct ListIter<'a> {
    dec: Decoder<'a>,
}

impl<'a> ListIter<'a> {
    /// Returns a Decoder for the next item, or `None`.
    pub fn next(&mut self) -> Option<Decoder<'a>> {
        if self.dec.remaining() == 0 {
            return None;
        }
        let mut probe = self.dec.clone();
        if probe.skip().is_err() {
            return None;
        }
        let len = self.dec.remaining() - probe.remaining();
        self.dec.read_slice(len).ok()
    }
}

/// Iterator for key-value pairs (Variants) within a Map.
#[derive(Debug)]
pub struct MapIter<'a> {
    dec: Decoder<'a>,
}

impl<'a> MapIter<'a> {
    /// Returns `(Key, ValueDecoder)` for the next item, or `None`.
    pub fn next(&mut self) -> Result<Option<(&'a str, Decoder<'a>)>> {
        if self.dec.remaining() == 0 {
            return Ok(None);
        }
        if self.dec.peek_tag()? != Tag::Variant {
            return Err(Error::InvalidTag(self.dec.peek_tag()? as u8));
        }
        let (name, val) = self.dec.variant()?;
        Ok(Some((name, val)))
    }
}
