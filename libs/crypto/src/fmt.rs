//! Byte and text encodings for key material and digests.
use anyhow::Context as _;

/// Text being parsed by [`TextFmt::decode`]. Tracks the consumed prefix so
/// that parsing errors can point at the offending position.
pub struct Text<'a> {
    full: &'a str,
    rest: &'a str,
}

impl<'a> Text<'a> {
    /// Wraps a string for parsing.
    pub fn new(s: &'a str) -> Self {
        Self { full: s, rest: s }
    }

    fn consumed(&self) -> &'a str {
        &self.full[..self.full.len() - self.rest.len()]
    }

    /// Strips a fixed prefix (typically a type tag like `validator:secret:`).
    pub fn strip(mut self, prefix: &str) -> anyhow::Result<Self> {
        let Some(rest) = self.rest.strip_prefix(prefix) else {
            anyhow::bail!("{}: expected {} got {}", self.consumed(), prefix, self.rest);
        };
        self.rest = rest;
        Ok(self)
    }

    /// Parses the remaining text as hex and decodes the bytes with [`ByteFmt`].
    pub fn decode_hex<T: ByteFmt>(self) -> anyhow::Result<T> {
        let raw = hex::decode(self.rest).with_context(|| self.consumed().to_owned())?;
        ByteFmt::decode(&raw).with_context(|| self.consumed().to_owned())
    }

    /// Shorthand for `<T as TextFmt>::decode(text)`.
    pub fn decode<T: TextFmt>(self) -> anyhow::Result<T> {
        TextFmt::decode(self)
    }
}

/// Human-readable encoding, used for keys in config files.
///
/// `decode(encode(x)) == x` must hold, and encodings of different key types
/// must not parse as each other.
pub trait TextFmt: Sized {
    /// Decodes the object from a text representation.
    fn decode(text: Text) -> anyhow::Result<Self>;
    /// Encodes the object to a text representation.
    fn encode(&self) -> String;
}

/// Binary encoding with a stable, well defined layout. Signed data is built from it.
pub trait ByteFmt: Sized {
    /// Decodes the object from the byte representation.
    fn decode(bytes: &[u8]) -> anyhow::Result<Self>;
    /// Encodes the object to the byte representation.
    fn encode(&self) -> Vec<u8>;
}
